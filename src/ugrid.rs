//! UGRID mesh-topology parsing
//!
//! LFRic writes its cubed-sphere mesh using the CF-UGRID conventions: a
//! dummy variable with `cf_role = "mesh_topology"` names the node coordinate
//! variables and the face-node connectivity variable, and each data variable
//! declares which mesh element (`location`) its values are attached to.
//!
//! Parsing this metadata is only meaningful for the unstructured source
//! files, so the loader activates it through a [`ParseModeGuard`] scoped to
//! a single load call and restored on every exit path.

use crate::errors::{CubeVistaError, Result};
use ndarray::{Array1, Array2};
use netcdf::{AttributeValue, File, Variable};
use std::cell::Cell;

/// Mesh element that a variable's values are attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataLocation {
    Face,
    Node,
    Edge,
}

impl DataLocation {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "face" => Some(DataLocation::Face),
            "node" => Some(DataLocation::Node),
            "edge" => Some(DataLocation::Edge),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            DataLocation::Face => "face",
            DataLocation::Node => "node",
            DataLocation::Edge => "edge",
        }
    }
}

/// Node coordinates and face-node connectivity of an unstructured mesh.
///
/// The connectivity is kept exactly as declared in the file, including its
/// start index; resolving indices against the node arrays is the mesh
/// builder's job.
#[derive(Debug, Clone)]
pub struct MeshTopology {
    /// Node longitudes in degrees east.
    pub node_lon: Array1<f64>,
    /// Node latitudes in degrees north.
    pub node_lat: Array1<f64>,
    /// `(n_faces, n_verts_per_face)` node indices.
    pub face_node: Array2<i64>,
    /// Declared start-index convention: 0 or 1.
    pub start_index: i64,
}

impl MeshTopology {
    pub fn n_nodes(&self) -> usize {
        self.node_lon.len()
    }

    pub fn n_faces(&self) -> usize {
        self.face_node.nrows()
    }

    pub fn verts_per_face(&self) -> usize {
        self.face_node.ncols()
    }

    /// Validate internal consistency: matching coordinate lengths, a legal
    /// start index, and connectivity entries that stay within the node
    /// array under the declared convention.
    pub fn validate(&self) -> Result<()> {
        if self.node_lon.len() != self.node_lat.len() {
            return Err(CubeVistaError::InvalidMesh {
                message: format!(
                    "node coordinate lengths differ: {} lon vs {} lat",
                    self.node_lon.len(),
                    self.node_lat.len()
                ),
            });
        }
        if self.start_index != 0 && self.start_index != 1 {
            return Err(CubeVistaError::InvalidMesh {
                message: format!("start_index must be 0 or 1, got {}", self.start_index),
            });
        }
        let n = self.n_nodes() as i64;
        for &idx in self.face_node.iter() {
            if idx < self.start_index || idx - self.start_index >= n {
                return Err(CubeVistaError::InvalidMesh {
                    message: format!(
                        "connectivity index {} outside node range (start_index {}, {} nodes)",
                        idx, self.start_index, n
                    ),
                });
            }
        }
        Ok(())
    }
}

/// RAII activation of mesh-metadata parsing.
///
/// The previous state is captured at activation and restored on drop, so
/// the mode cannot leak past the load call even when parsing fails.
pub struct ParseModeGuard<'a> {
    flag: &'a Cell<bool>,
    previous: bool,
}

impl<'a> ParseModeGuard<'a> {
    pub fn activate(flag: &'a Cell<bool>) -> Self {
        let previous = flag.get();
        flag.set(true);
        Self { flag, previous }
    }
}

impl Drop for ParseModeGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(self.previous);
    }
}

/// Read a string attribute off a variable.
pub(crate) fn attr_string(var: &Variable, name: &str) -> Option<String> {
    match var.attribute(name)?.value().ok()? {
        AttributeValue::Str(s) => Some(s),
        _ => None,
    }
}

fn attr_int(var: &Variable, name: &str) -> Option<i64> {
    match var.attribute(name)?.value().ok()? {
        AttributeValue::Schar(v) => Some(v as i64),
        AttributeValue::Short(v) => Some(v as i64),
        AttributeValue::Int(v) => Some(v as i64),
        AttributeValue::Longlong(v) => Some(v),
        _ => None,
    }
}

/// The `location` attribute of a data variable, where declared.
pub fn location_of(var: &Variable) -> Option<DataLocation> {
    attr_string(var, "location").and_then(|s| DataLocation::parse(&s))
}

/// Name of the mesh a data variable belongs to, where declared.
pub fn mesh_name_of(var: &Variable) -> Option<String> {
    attr_string(var, "mesh")
}

/// Names of the variables that make up the mesh description itself
/// (topology dummy, node coordinates, connectivity). These are not physical
/// variables and are skipped by `load_all`.
pub fn topology_variable_names(file: &File) -> Vec<String> {
    let mut names = Vec::new();
    for var in file.variables() {
        if attr_string(&var, "cf_role").as_deref() == Some("mesh_topology") {
            names.push(var.name().to_string());
            if let Some(coords) = attr_string(&var, "node_coordinates") {
                names.extend(coords.split_whitespace().map(str::to_string));
            }
            if let Some(conn) = attr_string(&var, "face_node_connectivity") {
                names.push(conn);
            }
        }
    }
    names
}

/// Parse the mesh topology declared in `file`.
pub fn parse_mesh_topology(file: &File) -> Result<MeshTopology> {
    let mesh_var = file
        .variables()
        .find(|v| attr_string(v, "cf_role").as_deref() == Some("mesh_topology"))
        .ok_or_else(|| CubeVistaError::InvalidMesh {
            message: "file declares no mesh_topology variable".to_string(),
        })?;

    let node_coords = attr_string(&mesh_var, "node_coordinates").ok_or_else(|| {
        CubeVistaError::InvalidMesh {
            message: format!(
                "mesh '{}' declares no node_coordinates attribute",
                mesh_var.name()
            ),
        }
    })?;
    let conn_name = attr_string(&mesh_var, "face_node_connectivity").ok_or_else(|| {
        CubeVistaError::InvalidMesh {
            message: format!(
                "mesh '{}' declares no face_node_connectivity attribute",
                mesh_var.name()
            ),
        }
    })?;

    // Identify lon vs lat among the node coordinate variables by units.
    let mut node_lon = None;
    let mut node_lat = None;
    for coord_name in node_coords.split_whitespace() {
        let var = file
            .variable(coord_name)
            .ok_or_else(|| CubeVistaError::VariableNotFound {
                var: coord_name.to_string(),
            })?;
        let values = Array1::from(var.get_values::<f64, _>(..)?);
        match attr_string(&var, "units").as_deref() {
            Some("degrees_east") => node_lon = Some(values),
            Some("degrees_north") => node_lat = Some(values),
            _ => {
                // Fall back on the conventional `_x`/`_y` naming.
                if coord_name.ends_with('x') || coord_name.contains("lon") {
                    node_lon = Some(values);
                } else {
                    node_lat = Some(values);
                }
            }
        }
    }
    let (node_lon, node_lat) = match (node_lon, node_lat) {
        (Some(lon), Some(lat)) => (lon, lat),
        _ => {
            return Err(CubeVistaError::InvalidMesh {
                message: format!("mesh node coordinates '{}' are incomplete", node_coords),
            })
        }
    };

    let conn_var = file
        .variable(&conn_name)
        .ok_or_else(|| CubeVistaError::VariableNotFound {
            var: conn_name.clone(),
        })?;
    let conn_shape: Vec<usize> = conn_var.dimensions().iter().map(|d| d.len()).collect();
    if conn_shape.len() != 2 {
        return Err(CubeVistaError::InvalidMesh {
            message: format!(
                "connectivity '{}' must be 2-dimensional, got shape {:?}",
                conn_name, conn_shape
            ),
        });
    }
    let conn_values = conn_var.get_values::<i64, _>(..)?;
    let face_node = Array2::from_shape_vec((conn_shape[0], conn_shape[1]), conn_values)
        .map_err(CubeVistaError::from)?;

    // Mixed-size faces are padded with the fill value; the cubed-sphere
    // sources are pure quads, so reject padding outright.
    if let Some(fill) = attr_int(&conn_var, "_FillValue") {
        if face_node.iter().any(|&v| v == fill) {
            return Err(CubeVistaError::InvalidMesh {
                message: format!(
                    "connectivity '{}' contains fill-padded faces, which are not supported",
                    conn_name
                ),
            });
        }
    }

    let start_index = attr_int(&conn_var, "start_index").unwrap_or(0);

    let topology = MeshTopology {
        node_lon,
        node_lat,
        face_node,
        start_index,
    };
    topology.validate()?;
    Ok(topology)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn quad_topology(start_index: i64) -> MeshTopology {
        MeshTopology {
            node_lon: array![0.0, 90.0, 90.0, 0.0, 180.0, 180.0],
            node_lat: array![-45.0, -45.0, 45.0, 45.0, -45.0, 45.0],
            face_node: array![[0, 1, 2, 3], [1, 4, 5, 2]] + start_index,
            start_index,
        }
    }

    #[test]
    fn valid_topologies_pass_validation() {
        quad_topology(0).validate().unwrap();
        quad_topology(1).validate().unwrap();
    }

    #[test]
    fn start_index_outside_convention_is_rejected() {
        let mut topo = quad_topology(0);
        topo.start_index = 2;
        assert!(matches!(
            topo.validate().unwrap_err(),
            CubeVistaError::InvalidMesh { .. }
        ));
    }

    #[test]
    fn out_of_range_connectivity_is_rejected() {
        let mut topo = quad_topology(0);
        topo.face_node[[0, 0]] = 6;
        assert!(topo.validate().is_err());
        // With one-based indexing, index 0 points before the node array.
        let mut topo = quad_topology(1);
        topo.face_node[[1, 3]] = 0;
        assert!(topo.validate().is_err());
    }

    #[test]
    fn parse_mode_guard_restores_on_drop() {
        let flag = Cell::new(false);
        {
            let _guard = ParseModeGuard::activate(&flag);
            assert!(flag.get());
        }
        assert!(!flag.get());

        // Restores even when the scope unwinds early.
        let result: std::result::Result<(), ()> = (|| {
            let _guard = ParseModeGuard::activate(&flag);
            Err(())
        })();
        assert!(result.is_err());
        assert!(!flag.get());
    }
}
