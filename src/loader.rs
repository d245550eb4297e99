//! Loading UM and LFRic output files as cubes
//!
//! The [`Loader`] resolves a [`DataSource`] against an immutable
//! [`DatasetPaths`] value and reads whole variables into [`Cube`]s. Every
//! call re-opens and re-reads the backing file; cubes are independent and
//! never shared or cached.
//!
//! Loading from the unstructured LFRic file needs the UGRID metadata to be
//! parsed alongside the data. That mode is activated through an RAII guard
//! for the duration of the call only, and restored on every exit path.

use crate::config::DatasetPaths;
use crate::cube::{Coord, Cube};
use crate::errors::{CubeVistaError, Result};
use crate::ugrid::{self, MeshTopology, ParseModeGuard};
use ndarray::{Array1, Array2, ArrayD};
use netcdf::{AttributeValue, File, Variable};
use std::cell::Cell;
use std::collections::HashSet;
use std::path::Path;

/// Logical source within a dataset pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    /// UM output on a regular latitude/longitude grid.
    UmLatLon,
    /// LFRic output on the native unstructured cubed-sphere mesh.
    LfricUgrid,
    /// LFRic ancillary fields regridded to latitude/longitude.
    LfricLatLon,
}

impl DataSource {
    /// Concrete file this source resolves to under `paths`.
    pub fn filepath(self, paths: &DatasetPaths) -> &Path {
        match self {
            DataSource::UmLatLon => &paths.um_filepath,
            DataSource::LfricUgrid => &paths.lfric_filepath,
            DataSource::LfricLatLon => &paths.lfric_latlon_filepath,
        }
    }

    /// Whether loading from this source needs mesh-metadata parsing.
    pub fn requires_mesh_parsing(self) -> bool {
        matches!(self, DataSource::LfricUgrid)
    }
}

/// Reads cubes out of one dataset pairing.
pub struct Loader {
    paths: DatasetPaths,
    ugrid_mode: Cell<bool>,
}

impl Loader {
    pub fn new(paths: DatasetPaths) -> Self {
        Self {
            paths,
            ugrid_mode: Cell::new(false),
        }
    }

    pub fn paths(&self) -> &DatasetPaths {
        &self.paths
    }

    /// Whether mesh-metadata parsing is currently active. Outside a load
    /// call this is always false.
    pub fn ugrid_mode_active(&self) -> bool {
        self.ugrid_mode.get()
    }

    /// Load every physical variable from `source`, in file order.
    ///
    /// Coordinate variables, cell-bounds variables and the UGRID topology
    /// description are not physical variables and are skipped.
    pub fn load_all(&self, source: DataSource) -> Result<Vec<Cube>> {
        let file = netcdf::open(source.filepath(&self.paths))?;
        let _guard = source
            .requires_mesh_parsing()
            .then(|| ParseModeGuard::activate(&self.ugrid_mode));
        let topology = if self.ugrid_mode.get() {
            Some(ugrid::parse_mesh_topology(&file)?)
        } else {
            None
        };

        let support = support_variable_names(&file);
        let mut cubes = Vec::new();
        for var in file.variables() {
            if !is_physical(&var, &support) {
                continue;
            }
            cubes.push(cube_from_var(&file, &var, topology.as_ref())?);
        }
        Ok(cubes)
    }

    /// Load one variable by name.
    ///
    /// The name is matched against each physical variable's name, then its
    /// `standard_name`, then its `long_name`. A lookup that matches nothing
    /// fails with `VariableNotFound`; one that matches more than one
    /// variable fails with `AmbiguousVariable` rather than silently picking
    /// a winner.
    ///
    /// With `time_reduced`, only the first time-index slice is returned.
    /// This discards every other time step by fixed policy; it is not a
    /// statistical reduction.
    pub fn load_named(&self, source: DataSource, name: &str, time_reduced: bool) -> Result<Cube> {
        let file = netcdf::open(source.filepath(&self.paths))?;
        let _guard = source
            .requires_mesh_parsing()
            .then(|| ParseModeGuard::activate(&self.ugrid_mode));
        let topology = if self.ugrid_mode.get() {
            Some(ugrid::parse_mesh_topology(&file)?)
        } else {
            None
        };

        let support = support_variable_names(&file);
        let matches: Vec<String> = file
            .variables()
            .filter(|v| is_physical(v, &support))
            .filter(|v| {
                v.name() == name
                    || ugrid::attr_string(v, "standard_name").as_deref() == Some(name)
                    || ugrid::attr_string(v, "long_name").as_deref() == Some(name)
            })
            .map(|v| v.name().to_string())
            .collect();

        let var_name = match matches.len() {
            0 => {
                return Err(CubeVistaError::VariableNotFound {
                    var: name.to_string(),
                })
            }
            1 => matches[0].clone(),
            _ => {
                return Err(CubeVistaError::AmbiguousVariable {
                    name: name.to_string(),
                    matches,
                })
            }
        };

        let var = file
            .variable(&var_name)
            .ok_or_else(|| CubeVistaError::VariableNotFound {
                var: var_name.clone(),
            })?;
        let cube = cube_from_var(&file, &var, topology.as_ref())?;
        if time_reduced {
            cube.slice_first_time()
        } else {
            Ok(cube)
        }
    }

    // Named accessors for the matched demo datasets. The two sources name
    // their fields differently; these spellings are fixed by the files.

    pub fn um_all_datacubes(&self) -> Result<Vec<Cube>> {
        self.load_all(DataSource::UmLatLon)
    }

    pub fn um_orography(&self) -> Result<Cube> {
        self.load_named(DataSource::LfricLatLon, "surface_altitude", true)
    }

    pub fn um_temperature(&self) -> Result<Cube> {
        self.load_named(DataSource::UmLatLon, "air_temperature_0", false)
    }

    pub fn um_rh_alltimes_3d(&self) -> Result<Cube> {
        self.load_named(DataSource::UmLatLon, "relative_humidity", false)
    }

    pub fn um_rh_singletime_2d(&self) -> Result<Cube> {
        self.load_named(DataSource::UmLatLon, "relative_humidity", true)
    }

    pub fn lfric_all_datacubes(&self) -> Result<Vec<Cube>> {
        self.load_all(DataSource::LfricUgrid)
    }

    pub fn lfric_orography(&self) -> Result<Cube> {
        self.load_named(DataSource::LfricUgrid, "surface_altitude", true)
    }

    pub fn lfric_temperature(&self) -> Result<Cube> {
        self.load_named(DataSource::LfricUgrid, "air_temperature", false)
    }

    pub fn lfric_rh_alltimes_3d(&self) -> Result<Cube> {
        self.load_named(DataSource::LfricUgrid, "relative_humidity_at_screen_level", false)
    }

    pub fn lfric_rh_singletime_2d(&self) -> Result<Cube> {
        self.load_named(DataSource::LfricUgrid, "relative_humidity_at_screen_level", true)
    }
}

/// Names of support variables: dimension coordinates, cell bounds,
/// auxiliary coordinates and the UGRID mesh description.
fn support_variable_names(file: &File) -> HashSet<String> {
    let mut names: HashSet<String> = ugrid::topology_variable_names(file).into_iter().collect();
    for var in file.variables() {
        for attr in ["bounds", "coordinates"] {
            if let Some(referenced) = ugrid::attr_string(&var, attr) {
                names.extend(referenced.split_whitespace().map(str::to_string));
            }
        }
    }
    names
}

fn is_physical(var: &Variable, support: &HashSet<String>) -> bool {
    let name = var.name();
    if support.contains(&name) {
        return false;
    }
    // A variable named after one of its own dimensions is a coordinate.
    if var.dimensions().iter().any(|d| d.name() == name) {
        return false;
    }
    if name.ends_with("_bnds") || name.ends_with("_bounds") {
        return false;
    }
    if var.attribute("cf_role").is_some() {
        return false;
    }
    true
}

fn attr_f64(var: &Variable, name: &str) -> Option<f64> {
    match var.attribute(name)?.value().ok()? {
        AttributeValue::Float(v) => Some(v as f64),
        AttributeValue::Double(v) => Some(v),
        AttributeValue::Short(v) => Some(v as f64),
        AttributeValue::Int(v) => Some(v as f64),
        _ => None,
    }
}

/// Read one variable as a cube, mapping its fill value to NaN and attaching
/// dimension coordinates and, for mesh variables, the parsed topology.
fn cube_from_var(file: &File, var: &Variable, topology: Option<&MeshTopology>) -> Result<Cube> {
    let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
    let mut values = var.get_values::<f64, _>(..)?;
    if let Some(fill) = attr_f64(var, "_FillValue") {
        for v in values.iter_mut() {
            if *v == fill {
                *v = f64::NAN;
            }
        }
    }
    let data = ArrayD::from_shape_vec(shape, values)?;

    let dim_names: Vec<String> = var
        .dimensions()
        .iter()
        .map(|d| d.name().to_string())
        .collect();

    let mut coords = Vec::new();
    for dim in &dim_names {
        let Some(coord_var) = file.variable(dim) else {
            continue;
        };
        let points = Array1::from(coord_var.get_values::<f64, _>(..)?);
        let units = ugrid::attr_string(&coord_var, "units").unwrap_or_default();
        let mut coord = Coord::new(dim.clone(), units, points);
        if let Some(bounds_name) = ugrid::attr_string(&coord_var, "bounds") {
            if let Some(bounds_var) = file.variable(&bounds_name) {
                let n = coord.len();
                let bounds_values = bounds_var.get_values::<f64, _>(..)?;
                coord.bounds = Some(Array2::from_shape_vec((n, 2), bounds_values)?);
            }
        }
        coords.push(coord);
    }

    let name = ugrid::attr_string(var, "standard_name").unwrap_or_else(|| var.name().to_string());
    let units = ugrid::attr_string(var, "units").unwrap_or_default();

    let (mesh, location) = match (topology, ugrid::mesh_name_of(var)) {
        (Some(topo), Some(_)) => (Some(topo.clone()), ugrid::location_of(var)),
        _ => (None, None),
    };

    Ok(Cube {
        name,
        units,
        dim_names,
        data,
        coords,
        mesh,
        location,
    })
}
