//! Converting cubes to plottable sphere meshes
//!
//! Both source conventions end up in the same [`Mesh`] representation:
//! unit-sphere vertex positions, a flat fixed-arity face-node index list and
//! one scalar per face or per node. Structured lat-lon cubes become quad
//! grids built from cell bounds; unstructured cubes pass their node
//! coordinates and connectivity through unchanged, with the declared start
//! index resolved here when indexing the node array.
//!
//! Conversion is a pure transformation: NaN-face removal (`threshold`) is a
//! separate step applied by the plot layer.

use crate::cube::{Coord, Cube};
use crate::errors::{CubeVistaError, Result};
use crate::ugrid::DataLocation;
use glam::Vec3;
use ndarray::Ix2;
use rayon::prelude::*;

/// Project a longitude/latitude position (degrees) onto the unit sphere.
///
/// Longitude 0 lies on +x, longitude 90E on +y, the north pole on +z.
pub fn lonlat_to_xyz(lon_deg: f64, lat_deg: f64) -> Vec3 {
    let lon = lon_deg.to_radians();
    let lat = lat_deg.to_radians();
    Vec3::new(
        (lat.cos() * lon.cos()) as f32,
        (lat.cos() * lon.sin()) as f32,
        lat.sin() as f32,
    )
}

/// Which mesh element the scalar field is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarLocation {
    Face,
    Node,
}

/// A polygonal surface on the unit sphere with one scalar field.
#[derive(Debug, Clone)]
pub struct Mesh {
    pub name: String,
    pub units: String,
    /// Vertex positions.
    pub points: Vec<Vec3>,
    /// Flat face-node index list, `verts_per_face` entries per face.
    pub faces: Vec<u32>,
    pub verts_per_face: usize,
    /// One value per face or per node, depending on `scalar_location`.
    pub scalars: Vec<f64>,
    pub scalar_location: ScalarLocation,
}

impl Mesh {
    pub fn n_points(&self) -> usize {
        self.points.len()
    }

    pub fn n_faces(&self) -> usize {
        if self.verts_per_face == 0 {
            0
        } else {
            self.faces.len() / self.verts_per_face
        }
    }

    /// Node indices of one face.
    pub fn face(&self, i: usize) -> &[u32] {
        &self.faces[i * self.verts_per_face..(i + 1) * self.verts_per_face]
    }

    /// Finite minimum and maximum of the scalar field.
    pub fn scalar_range(&self) -> Option<(f64, f64)> {
        let mut range: Option<(f64, f64)> = None;
        for &v in &self.scalars {
            if v.is_finite() {
                range = Some(match range {
                    Some((lo, hi)) => (lo.min(v), hi.max(v)),
                    None => (v, v),
                });
            }
        }
        range
    }

    fn validated(self) -> Result<Self> {
        let expected = match self.scalar_location {
            ScalarLocation::Face => self.n_faces(),
            ScalarLocation::Node => self.n_points(),
        };
        if self.scalars.len() != expected {
            return Err(CubeVistaError::InvalidMesh {
                message: format!(
                    "scalar field has {} values but the mesh has {} faces and {} nodes",
                    self.scalars.len(),
                    self.n_faces(),
                    self.n_points()
                ),
            });
        }
        let n_points = self.points.len() as u32;
        if self.faces.iter().any(|&i| i >= n_points) {
            return Err(CubeVistaError::InvalidMesh {
                message: "face connectivity indexes past the vertex array".to_string(),
            });
        }
        Ok(self)
    }

    /// Convert any supported cube, dispatching on its source kind: a cube
    /// carrying mesh topology is unstructured, anything else is treated as
    /// a structured lat-lon grid.
    pub fn from_cube(cube: &Cube) -> Result<Mesh> {
        if cube.mesh.is_some() {
            Mesh::from_unstructured(cube)
        } else {
            Mesh::from_structured_cube(cube)
        }
    }

    /// Convert a 2D structured lat-lon cube.
    pub fn from_structured_cube(cube: &Cube) -> Result<Mesh> {
        let x = cube.x_coord()?;
        let y = cube.y_coord()?;
        let data = cube
            .data
            .view()
            .into_dimensionality::<Ix2>()
            .map_err(|_| CubeVistaError::UnsupportedGeometry {
                message: format!(
                    "structured conversion needs a 2D cube, got shape {:?}",
                    cube.shape()
                ),
            })?;

        // Dim order decides orientation; the converter wants (y, x).
        let x_first = cube
            .dim_names
            .iter()
            .position(|d| *d == x.name)
            .zip(cube.dim_names.iter().position(|d| *d == y.name))
            .map(|(xi, yi)| xi < yi)
            .unwrap_or(false);
        let data = if x_first { data.reversed_axes() } else { data };

        Self::from_structured_grid(x, y, &data.to_owned(), &cube.name, &cube.units)
    }

    /// Build a quad mesh from x/y cell bounds and per-cell data.
    ///
    /// Coordinates without bounds get them inferred by expansion from
    /// centers; an axis too short for inference fails with
    /// `UnsupportedGeometry`. `data` is `(ny, nx)`.
    pub fn from_structured_grid(
        x: &Coord,
        y: &Coord,
        data: &ndarray::Array2<f64>,
        name: &str,
        units: &str,
    ) -> Result<Mesh> {
        let mut x = x.clone();
        let mut y = y.clone();
        if !x.has_bounds() {
            x.guess_bounds()?;
        }
        if !y.has_bounds() {
            y.guess_bounds()?;
        }
        let x_edges = x.contiguous_edges()?;
        let y_edges = y.contiguous_edges()?;
        let nx = x_edges.len() - 1;
        let ny = y_edges.len() - 1;

        if data.nrows() != ny || data.ncols() != nx {
            return Err(CubeVistaError::InvalidMesh {
                message: format!(
                    "data shape ({}, {}) does not match the ({}, {}) cell grid",
                    data.nrows(),
                    data.ncols(),
                    ny,
                    nx
                ),
            });
        }

        // Vertex grid is (ny + 1) x (nx + 1), row-major.
        let cols = nx + 1;
        let points: Vec<Vec3> = (0..(ny + 1) * cols)
            .into_par_iter()
            .map(|i| {
                let iy = i / cols;
                let ix = i % cols;
                lonlat_to_xyz(x_edges[ix], y_edges[iy])
            })
            .collect();

        let mut faces = Vec::with_capacity(ny * nx * 4);
        for iy in 0..ny {
            for ix in 0..nx {
                let base = (iy * cols + ix) as u32;
                faces.extend_from_slice(&[
                    base,
                    base + 1,
                    base + 1 + cols as u32,
                    base + cols as u32,
                ]);
            }
        }

        let scalars: Vec<f64> = data.iter().copied().collect();

        Mesh {
            name: name.to_string(),
            units: units.to_string(),
            points,
            faces,
            verts_per_face: 4,
            scalars,
            scalar_location: ScalarLocation::Face,
        }
        .validated()
    }

    /// Convert an unstructured face-located cube.
    ///
    /// Connectivity semantics differ for node- and edge-located data, so
    /// anything but face location is refused.
    pub fn from_unstructured(cube: &Cube) -> Result<Mesh> {
        let topology = cube
            .mesh
            .as_ref()
            .ok_or_else(|| CubeVistaError::InvalidMesh {
                message: format!("cube '{}' carries no mesh topology", cube.name),
            })?;
        match cube.location {
            Some(DataLocation::Face) => {}
            Some(other) => {
                return Err(CubeVistaError::UnsupportedLocation {
                    location: other.as_str().to_string(),
                })
            }
            None => {
                return Err(CubeVistaError::UnsupportedLocation {
                    location: "undeclared".to_string(),
                })
            }
        }

        let points: Vec<Vec3> = (0..topology.n_nodes())
            .into_par_iter()
            .map(|i| lonlat_to_xyz(topology.node_lon[i], topology.node_lat[i]))
            .collect();

        // The declared start index is resolved here, against the node array.
        let start = topology.start_index;
        let faces: Vec<u32> = topology.face_node.iter().map(|&i| (i - start) as u32).collect();

        let scalars: Vec<f64> = cube.data.iter().copied().collect();

        Mesh {
            name: cube.name.clone(),
            units: cube.units.clone(),
            points,
            faces,
            verts_per_face: topology.verts_per_face(),
            scalars,
            scalar_location: ScalarLocation::Face,
        }
        .validated()
    }

    /// Remove faces whose scalar value is undefined.
    ///
    /// Face-located meshes drop faces with a NaN scalar; node-located
    /// meshes drop faces touching any NaN node. Points are left untouched.
    pub fn threshold(&self) -> Mesh {
        let keep = |face_idx: usize| -> bool {
            match self.scalar_location {
                ScalarLocation::Face => self.scalars[face_idx].is_finite(),
                ScalarLocation::Node => self
                    .face(face_idx)
                    .iter()
                    .all(|&n| self.scalars[n as usize].is_finite()),
            }
        };

        let mut faces = Vec::new();
        let mut scalars = Vec::new();
        for f in 0..self.n_faces() {
            if keep(f) {
                faces.extend_from_slice(self.face(f));
                if self.scalar_location == ScalarLocation::Face {
                    scalars.push(self.scalars[f]);
                }
            }
        }
        if self.scalar_location == ScalarLocation::Node {
            scalars = self.scalars.clone();
        }

        Mesh {
            name: self.name.clone(),
            units: self.units.clone(),
            points: self.points.clone(),
            faces,
            verts_per_face: self.verts_per_face,
            scalars,
            scalar_location: self.scalar_location,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ugrid::MeshTopology;
    use ndarray::{array, Array2, ArrayD};

    fn structured_cube(nt: usize, ny: usize, nx: usize) -> Cube {
        let data = ArrayD::from_shape_vec(
            vec![nt, ny, nx],
            (0..nt * ny * nx).map(|i| i as f64).collect(),
        )
        .unwrap();
        let lats: Vec<f64> = (0..ny).map(|i| -60.0 + 15.0 * i as f64).collect();
        let lons: Vec<f64> = (0..nx).map(|i| 10.0 * i as f64).collect();
        Cube {
            name: "relative_humidity".to_string(),
            units: "%".to_string(),
            dim_names: vec!["time".to_string(), "lat".to_string(), "lon".to_string()],
            data,
            coords: vec![
                Coord::new("lat", "degrees_north", lats.into()),
                Coord::new("lon", "degrees_east", lons.into()),
            ],
            mesh: None,
            location: None,
        }
    }

    fn unstructured_cube(start_index: i64, location: DataLocation) -> Cube {
        let topology = MeshTopology {
            node_lon: array![0.0, 90.0, 90.0, 0.0, 180.0, 180.0],
            node_lat: array![-45.0, -45.0, 45.0, 45.0, -45.0, 45.0],
            face_node: array![[0, 1, 2, 3], [1, 4, 5, 2]] + start_index,
            start_index,
        };
        let data = ArrayD::from_shape_vec(vec![2], vec![10.0, 20.0]).unwrap();
        Cube {
            name: "air_temperature".to_string(),
            units: "K".to_string(),
            dim_names: vec!["nMesh2d_face".to_string()],
            data,
            coords: vec![],
            mesh: Some(topology),
            location: Some(location),
        }
    }

    #[test]
    fn projection_lands_on_the_unit_sphere() {
        for (lon, lat) in [(0.0, 0.0), (90.0, 0.0), (0.0, 90.0), (123.0, -37.5)] {
            let p = lonlat_to_xyz(lon, lat);
            assert!((p.length() - 1.0).abs() < 1e-6, "({lon}, {lat}) -> {p:?}");
        }
        assert!((lonlat_to_xyz(0.0, 90.0) - Vec3::Z).length() < 1e-6);
        assert!((lonlat_to_xyz(0.0, 0.0) - Vec3::X).length() < 1e-6);
        assert!((lonlat_to_xyz(90.0, 0.0) - Vec3::Y).length() < 1e-6);
    }

    #[test]
    fn structured_face_count_matches_bounds() {
        let cube = structured_cube(1, 9, 8).slice_first_time().unwrap();
        let mesh = Mesh::from_cube(&cube).unwrap();
        // Bounds are inferred, so each axis has len + 1 edges.
        assert_eq!(mesh.n_faces(), 9 * 8);
        assert_eq!(mesh.n_points(), 10 * 9);
        assert_eq!(mesh.verts_per_face, 4);
    }

    #[test]
    fn structured_scalars_round_trip_per_cell_data() {
        let cube = structured_cube(1, 3, 4).slice_first_time().unwrap();
        let mesh = Mesh::from_cube(&cube).unwrap();
        let flat: Vec<f64> = cube.data.iter().copied().collect();
        assert_eq!(mesh.scalars, flat);
    }

    #[test]
    fn structured_conversion_handles_transposed_dims() {
        let mut cube = structured_cube(1, 3, 4).slice_first_time().unwrap();
        // Present the same data as (lon, lat).
        cube.data = cube
            .data
            .view()
            .into_dimensionality::<Ix2>()
            .unwrap()
            .reversed_axes()
            .to_owned()
            .into_dyn();
        cube.dim_names = vec!["lon".to_string(), "lat".to_string()];
        let mesh = Mesh::from_cube(&cube).unwrap();
        assert_eq!(mesh.n_faces(), 3 * 4);
        assert_eq!(mesh.scalars[1], 1.0);
    }

    #[test]
    fn single_point_axis_cannot_infer_bounds() {
        let x = Coord::new("lon", "degrees_east", array![0.0]);
        let y = Coord::new("lat", "degrees_north", array![0.0, 10.0]);
        let data = Array2::zeros((2, 1));
        let err = Mesh::from_structured_grid(&x, &y, &data, "t", "K").unwrap_err();
        assert!(matches!(err, CubeVistaError::UnsupportedGeometry { .. }));
    }

    #[test]
    fn bounded_coords_are_used_as_given() {
        let mut x = Coord::new("lon", "degrees_east", array![5.0, 15.0]);
        x.bounds = Some(array![[0.0, 10.0], [10.0, 20.0]]);
        let mut y = Coord::new("lat", "degrees_north", array![-5.0, 5.0]);
        y.bounds = Some(array![[-10.0, 0.0], [0.0, 10.0]]);
        let data = array![[1.0, 2.0], [3.0, 4.0]];
        let mesh = Mesh::from_structured_grid(&x, &y, &data, "t", "K").unwrap();
        assert_eq!(mesh.n_faces(), 4);
        // First vertex sits at the lower-left bound corner.
        assert!((mesh.points[0] - lonlat_to_xyz(0.0, -10.0)).length() < 1e-6);
    }

    #[test]
    fn unstructured_counts_match_topology() {
        let cube = unstructured_cube(0, DataLocation::Face);
        let mesh = Mesh::from_unstructured(&cube).unwrap();
        assert_eq!(mesh.n_faces(), 2);
        assert_eq!(mesh.n_points(), 6);
        assert_eq!(mesh.scalars, vec![10.0, 20.0]);
    }

    #[test]
    fn one_based_connectivity_resolves_to_same_nodes() {
        let zero = Mesh::from_unstructured(&unstructured_cube(0, DataLocation::Face)).unwrap();
        let one = Mesh::from_unstructured(&unstructured_cube(1, DataLocation::Face)).unwrap();
        assert_eq!(zero.faces, one.faces);
        assert_eq!(zero.points.len(), one.points.len());
    }

    #[test]
    fn node_located_data_is_refused() {
        let cube = unstructured_cube(0, DataLocation::Node);
        let err = Mesh::from_unstructured(&cube).unwrap_err();
        match err {
            CubeVistaError::UnsupportedLocation { location } => assert_eq!(location, "node"),
            other => panic!("expected UnsupportedLocation, got {other:?}"),
        }
    }

    #[test]
    fn scalar_length_mismatch_is_a_validation_failure() {
        let mut cube = unstructured_cube(0, DataLocation::Face);
        cube.data = ArrayD::from_shape_vec(vec![3], vec![1.0, 2.0, 3.0]).unwrap();
        let err = Mesh::from_unstructured(&cube).unwrap_err();
        assert!(matches!(err, CubeVistaError::InvalidMesh { .. }));
    }

    #[test]
    fn threshold_drops_exactly_the_nan_faces() {
        let mut cube = structured_cube(1, 2, 3).slice_first_time().unwrap();
        cube.data[[0, 1]] = f64::NAN;
        cube.data[[1, 2]] = f64::NAN;
        let mesh = Mesh::from_cube(&cube).unwrap();
        let filtered = mesh.threshold();
        assert_eq!(mesh.n_faces(), 6);
        assert_eq!(filtered.n_faces(), 4);
        assert_eq!(filtered.scalars.len(), 4);
        assert!(filtered.scalars.iter().all(|v| v.is_finite()));
        // Points are untouched.
        assert_eq!(filtered.n_points(), mesh.n_points());
    }
}
