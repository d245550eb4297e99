//! Defines command-line interface options using `clap` for the CubeVista application.

use clap::Parser;
use cube_vista::config::DataVariant;
use cube_vista::loader::DataSource;
use std::path::PathBuf;

/// A CLI tool for displaying UM and LFRic model output as 3D globes
#[derive(Parser, Debug)]
#[command(
    author = "CubeVista developers",
    version = "0.3.0",
    name = "CubeVista",
    about = "App for displaying UM and LFRic NetCDF output as 3D geospatial meshes"
)]
pub struct Args {
    /// Base directory holding the dataset files
    #[arg(short, long, default_value = "../example_data")]
    pub data_dir: PathBuf,

    /// Dataset layout variant (c48 or c192)
    #[arg(long, default_value = "c48", value_parser = parse_variant)]
    pub variant: DataVariant,

    /// Source file to read: um, lfric, or lfric-latlon
    #[arg(short, long, default_value = "um", value_parser = parse_source)]
    pub source: DataSource,

    /// Variable to display (name, standard_name, or long_name)
    #[arg(short = 'n', long)]
    pub variable: Option<String>,

    /// Take the first time-index slice before plotting
    #[arg(long, default_value_t = false)]
    pub single_time: bool,

    /// List all variables and dimensions in the source file
    #[arg(long)]
    pub list_vars: bool,

    /// Print quick statistics (min/mean/max) for a variable instead of plotting
    #[arg(long)]
    pub summary: Option<String>,

    /// Show UM and LFRic fields side by side, formatted as <um_var>:<lfric_var>
    #[arg(long, value_parser = parse_compare)]
    pub compare: Option<(String, String)>,

    /// Render once off-screen to this PNG instead of opening a window
    #[arg(long)]
    pub screenshot: Option<PathBuf>,

    /// Skip the coastline overlay
    #[arg(long, default_value_t = false)]
    pub no_coastlines: bool,

    /// Draw the base imagery layer in comparison views
    #[arg(long, default_value_t = false)]
    pub base_layer: bool,
}

fn parse_variant(s: &str) -> Result<DataVariant, String> {
    match s {
        "c48" => Ok(DataVariant::C48),
        "c192" => Ok(DataVariant::C192),
        _ => Err("Invalid variant: Expected 'c48' or 'c192'.".to_string()),
    }
}

fn parse_source(s: &str) -> Result<DataSource, String> {
    match s {
        "um" => Ok(DataSource::UmLatLon),
        "lfric" => Ok(DataSource::LfricUgrid),
        "lfric-latlon" => Ok(DataSource::LfricLatLon),
        _ => Err("Invalid source: Expected 'um', 'lfric', or 'lfric-latlon'.".to_string()),
    }
}

fn parse_compare(s: &str) -> Result<(String, String), String> {
    let parts: Vec<&str> = s.split(':').collect();
    match parts.as_slice() {
        [um, lfric] => Ok((um.to_string(), lfric.to_string())),
        _ => Err("Invalid format: Expected '<um_var>:<lfric_var>'.".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_documented_flags() {
        let args = Args::parse_from([
            "CubeVista",
            "--data-dir",
            "/data",
            "--variant",
            "c192",
            "--source",
            "lfric",
            "--variable",
            "relative_humidity_at_screen_level",
            "--single-time",
            "--no-coastlines",
        ]);
        assert_eq!(args.data_dir, PathBuf::from("/data"));
        assert_eq!(args.variant, DataVariant::C192);
        assert_eq!(args.source, DataSource::LfricUgrid);
        assert!(args.single_time);
        assert!(args.no_coastlines);
        assert!(!args.base_layer);
    }

    #[test]
    fn compare_flag_splits_on_the_colon() {
        let args = Args::parse_from([
            "CubeVista",
            "--compare",
            "relative_humidity:relative_humidity_at_screen_level",
        ]);
        let (um, lfric) = args.compare.unwrap();
        assert_eq!(um, "relative_humidity");
        assert_eq!(lfric, "relative_humidity_at_screen_level");
    }

    #[test]
    fn bad_source_is_rejected() {
        assert!(Args::try_parse_from(["CubeVista", "--source", "grib"]).is_err());
    }
}
