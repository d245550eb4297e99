//! CubeVista: UM and LFRic model output on the 3D globe
//!
//! A Rust library for loading climate-model output files as in-memory data
//! cubes and displaying them as 3D geospatial meshes. CubeVista reads both
//! the regular latitude/longitude grids written by the UM and the
//! unstructured UGRID cubed-sphere meshes written by LFRic, converts either
//! into a common unit-sphere polygon mesh, and renders the result in an
//! interactive window with coastlines, base imagery and linked side-by-side
//! views.
//!
//! ## Key Features
//!
//! - **Dual-source loading**: regular lat-lon grids and UGRID face meshes
//!   behind one cube type
//! - **Mesh conversion**: cell-bounds quads or face-node connectivity to a
//!   common sphere mesh, with bounds inference and NaN-face thresholding
//! - **Interactive display**: drag-rotate, scroll-zoom, linked dual views,
//!   coastline and base-imagery overlays
//! - **Headless rendering**: one-shot off-screen screenshots
//!
//! ## Module Organization
//!
//! - [`config`]: dataset layout resolution
//! - [`loader`]: reading variables into cubes
//! - [`cube`]: the labeled-array data model
//! - [`ugrid`]: UGRID mesh-topology parsing
//! - [`mesh`]: cube-to-mesh conversion
//! - [`colormap`] / [`coastlines`]: display ingredients
//! - [`plot`]: plot composition, cameras and view linking
//! - [`metadata`]: NetCDF file inspection
//! - [`errors`]: centralized error handling
//!
//! ## Usage
//!
//! ```rust,no_run
//! use cube_vista::prelude::*;
//!
//! let paths = DatasetPaths::for_variant("../example_data", DataVariant::C48);
//! let loader = Loader::new(paths.clone());
//!
//! // Side-by-side comparison of the same field from both models.
//! let um = loader.um_rh_singletime_2d().unwrap();
//! let lfric = loader.lfric_rh_singletime_2d().unwrap();
//! let left = Mesh::from_cube(&um).unwrap();
//! let right = Mesh::from_cube(&lfric).unwrap();
//! let plotter = dual_view(&left, &right, &paths, DualViewOptions::default()).unwrap();
//! plotter.show().unwrap();
//! ```

// Core modules
pub mod coastlines;
pub mod colormap;
pub mod config;
pub mod cube;
pub mod errors;
pub mod loader;
pub mod mesh;
pub mod metadata;
pub mod plot;
pub mod ugrid;

// GPU details stay behind the plot layer.
mod render;

// Direct re-exports for the public API
pub use coastlines::*;
pub use colormap::*;
pub use config::*;
pub use cube::*;
pub use errors::*;
pub use loader::*;
pub use mesh::*;
pub use metadata::*;
pub use plot::*;
pub use ugrid::*;

// High-level convenience API
pub mod prelude {
    //! Commonly used imports for convenience
    pub use crate::config::{DataVariant, DatasetPaths};
    pub use crate::cube::Cube;
    pub use crate::errors::{CubeVistaError, Result};
    pub use crate::loader::{DataSource, Loader};
    pub use crate::mesh::Mesh;
    pub use crate::plot::{dual_view, single_view, DualViewOptions, GeoPlotter, MeshOptions};
}
