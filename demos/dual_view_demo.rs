//! Side-by-side comparison demo.
//!
//! Loads the same physical field from the UM lat-lon file and the LFRic
//! UGRID file (run `create_demo_netcdf` first) and shows both renditions
//! with linked cameras: dragging or zooming either globe moves both.

use cube_vista::prelude::*;

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let data_dir = std::env::args().nth(1).unwrap_or_else(|| "./example_data".to_string());
    let paths = DatasetPaths::for_variant(data_dir, DataVariant::C48);
    let loader = Loader::new(paths.clone());

    let um = loader.um_rh_singletime_2d()?;
    let lfric = loader.lfric_rh_singletime_2d()?;
    println!(
        "Loaded '{}' from UM ({:?}) and LFRic ({:?})",
        um.name,
        um.shape(),
        lfric.shape()
    );

    let left = Mesh::from_cube(&um)?.threshold();
    let right = Mesh::from_cube(&lfric)?.threshold();

    let plotter = dual_view(&left, &right, &paths, DualViewOptions::default())?;
    plotter.show()?;
    Ok(())
}
