//! Dataset layout configuration
//!
//! The UM and LFRic test datasets come as matched file pairs under a single
//! base directory with fixed filename suffixes. `DatasetPaths` resolves a
//! base directory and a layout variant to the concrete file paths once, as an
//! immutable value handed to each loader, so reconfiguration is a plain
//! re-construction rather than a mutation of shared state.

use std::path::{Path, PathBuf};

/// Which of the predefined dataset layouts to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataVariant {
    /// The newer, smaller C48 cubed-sphere run (the default).
    #[default]
    C48,
    /// The older C192 run.
    C192,
}

impl DataVariant {
    /// Run identifier used as the filename prefix.
    pub const fn run_id(self) -> &'static str {
        match self {
            DataVariant::C48 => "u-ct674_20210324T0000Z",
            DataVariant::C192 => "u-cf075_20200128T0000Z",
        }
    }
}

/// Resolved file locations for one UM/LFRic dataset pairing.
///
/// Immutable once constructed; all fields are resolved together so a reader
/// can never observe a half-updated layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetPaths {
    /// Base data directory.
    pub data_path: PathBuf,
    /// UM output regridded to a regular latitude/longitude grid.
    pub um_filepath: PathBuf,
    /// LFRic output on the native UGRID cubed-sphere mesh.
    pub lfric_filepath: PathBuf,
    /// LFRic ancillary fields (orography) on a latitude/longitude grid.
    pub lfric_latlon_filepath: PathBuf,
    /// Optional coastline GeoJSON used by the plot overlay.
    pub coastlines_filepath: PathBuf,
    /// Optional equirectangular world image used by the base layer.
    pub base_layer_filepath: PathBuf,
}

impl DatasetPaths {
    /// Resolve all file paths for `variant` under `data_path`.
    pub fn for_variant(data_path: impl Into<PathBuf>, variant: DataVariant) -> Self {
        let data_path = data_path.into();
        let run = variant.run_id();
        Self {
            um_filepath: data_path.join(format!("{run}_um_latlon.nc")),
            lfric_filepath: data_path.join(format!("{run}_lf_ugrid.nc")),
            lfric_latlon_filepath: data_path.join(format!("{run}_lf_latlon.nc")),
            coastlines_filepath: data_path.join("ne_110m_coastline.geojson"),
            base_layer_filepath: data_path.join("natural_earth_1.png"),
            data_path,
        }
    }

    /// The default layout: the smaller C48 data under `../example_data/`.
    pub fn example_data() -> Self {
        Self::for_variant("../example_data", DataVariant::C48)
    }

    /// Base directory this layout was resolved against.
    pub fn data_dir(&self) -> &Path {
        &self.data_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_resolve_against_base_directory() {
        let paths = DatasetPaths::for_variant("/data/runs", DataVariant::C48);
        assert_eq!(
            paths.um_filepath,
            PathBuf::from("/data/runs/u-ct674_20210324T0000Z_um_latlon.nc")
        );
        assert_eq!(
            paths.lfric_filepath,
            PathBuf::from("/data/runs/u-ct674_20210324T0000Z_lf_ugrid.nc")
        );
        assert_eq!(
            paths.lfric_latlon_filepath,
            PathBuf::from("/data/runs/u-ct674_20210324T0000Z_lf_latlon.nc")
        );
    }

    #[test]
    fn variants_resolve_to_distinct_runs() {
        let c48 = DatasetPaths::for_variant("/d", DataVariant::C48);
        let c192 = DatasetPaths::for_variant("/d", DataVariant::C192);
        assert_ne!(c48.um_filepath, c192.um_filepath);
        assert_ne!(c48.lfric_filepath, c192.lfric_filepath);
    }
}
