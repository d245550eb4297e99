//! Entry point for the CubeVista application.
//! Handles CLI parsing, data loading, and dispatches between listing, summaries,
//! single-mesh display and linked side-by-side comparison.

use clap::Parser;
use std::path::PathBuf;

mod cli;

use cli::Args;
use cube_vista::config::DatasetPaths;
use cube_vista::cube::Cube;
use cube_vista::loader::{DataSource, Loader};
use cube_vista::mesh::Mesh;
use cube_vista::metadata::{list_variables_and_dimensions, print_metadata, print_summary};
use cube_vista::plot::{dual_view, single_view, DualViewOptions, GeoPlotter};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command-line arguments
    let args = Args::parse();

    println!(
        r#"
------------------------------------------------------------------
     ___      _         __   ___     _
    / __\   _| |__   ___\ \ / (_)___| |_ __ _
   / / | | | | '_ \ / _ \ V /| / __| __/ _` |
  / /__| |_| | |_) |  __/| | | \__ \ || (_| |
  \____/\__,_|_.__/ \___||_| |_|___/\__\__,_|
            UM & LFRic output on the 3D globe
------------------------------------------------------------------
"#
    );

    let paths = DatasetPaths::for_variant(&args.data_dir, args.variant);
    let loader = Loader::new(paths.clone());

    if args.list_vars {
        let file = netcdf::open(args.source.filepath(&paths))?;
        println!(
            "Successfully opened NetCDF file: {}",
            args.source.filepath(&paths).display()
        );
        list_variables_and_dimensions(&file)?;
        return Ok(());
    }

    if let Some(var) = &args.summary {
        let cube = loader.load_named(args.source, var, false)?;
        print_summary(&cube.name, &cube.units, &cube.summary());
        return Ok(());
    }

    if let Some((um_name, lfric_name)) = &args.compare {
        let um_cube = reduce_to_plottable(loader.load_named(DataSource::UmLatLon, um_name, false)?)?;
        let lfric_cube =
            reduce_to_plottable(loader.load_named(DataSource::LfricUgrid, lfric_name, false)?)?;
        let left = Mesh::from_cube(&um_cube)?;
        let right = Mesh::from_cube(&lfric_cube)?;
        let plotter = dual_view(
            &left,
            &right,
            &paths,
            DualViewOptions {
                show_coastlines: !args.no_coastlines,
                show_baselayer: args.base_layer,
            },
        )?;
        return Ok(display(plotter, args.screenshot)?);
    }

    let Some(variable) = &args.variable else {
        // No operation requested: show what the file contains.
        let file = netcdf::open(args.source.filepath(&paths))?;
        print_metadata(&file)?;
        return Ok(());
    };

    let mut cube = loader.load_named(args.source, variable, args.single_time)?;
    cube = reduce_to_plottable(cube)?;
    let mesh = Mesh::from_cube(&cube)?;
    let plotter = single_view(&mesh, &paths, None)?;
    Ok(display(plotter, args.screenshot)?)
}

/// Slice leading dimensions away until the cube is a single horizontal
/// field: 2D for grids, 1D for mesh-located data.
fn reduce_to_plottable(mut cube: Cube) -> cube_vista::errors::Result<Cube> {
    let target = if cube.mesh.is_some() { 1 } else { 2 };
    while cube.ndim() > target {
        cube = cube.slice_first_time()?;
    }
    Ok(cube)
}

fn display(plotter: GeoPlotter, screenshot: Option<PathBuf>) -> cube_vista::errors::Result<()> {
    match screenshot {
        Some(path) => {
            plotter.screenshot(&path, 1280, 720)?;
            println!("Saved screenshot to {}", path.display());
            Ok(())
        }
        None => plotter.show(),
    }
}
