//! The in-memory data cube model
//!
//! A [`Cube`] is a labeled N-dimensional array: data values plus named
//! dimensions, per-dimension coordinates (with optional cell bounds), a
//! variable name and physical units. Cubes loaded from the unstructured
//! LFRic source additionally carry the UGRID mesh topology and the mesh
//! location their data is attached to.

use crate::errors::{CubeVistaError, Result};
use crate::ugrid::{DataLocation, MeshTopology};
use ndarray::{Array1, Array2, ArrayD, Axis};

/// A dimension coordinate: point values along one axis, with optional
/// `(n, 2)` cell bounds.
#[derive(Debug, Clone)]
pub struct Coord {
    pub name: String,
    pub units: String,
    pub points: Array1<f64>,
    pub bounds: Option<Array2<f64>>,
}

impl Coord {
    pub fn new(name: impl Into<String>, units: impl Into<String>, points: Array1<f64>) -> Self {
        Self {
            name: name.into(),
            units: units.into(),
            points,
            bounds: None,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn has_bounds(&self) -> bool {
        self.bounds.is_some()
    }

    /// Whether this coordinate describes the horizontal x axis (longitude).
    pub fn is_x_axis(&self) -> bool {
        self.units == "degrees_east"
            || matches!(self.name.as_str(), "lon" | "longitude" | "grid_longitude")
    }

    /// Whether this coordinate describes the horizontal y axis (latitude).
    pub fn is_y_axis(&self) -> bool {
        self.units == "degrees_north"
            || matches!(self.name.as_str(), "lat" | "latitude" | "grid_latitude")
    }

    /// Whether this coordinate describes time.
    pub fn is_time(&self) -> bool {
        self.name == "time" || self.units.contains(" since ")
    }

    /// Infer cell bounds by expanding from point centers.
    ///
    /// Interior edges fall midway between neighboring points; the two end
    /// cells extrapolate their outer edge by half the adjacent spacing.
    /// Fails when the axis has fewer than two points, since no spacing can
    /// be derived.
    pub fn guess_bounds(&mut self) -> Result<()> {
        let n = self.points.len();
        if n < 2 {
            return Err(CubeVistaError::UnsupportedGeometry {
                message: format!(
                    "cannot infer bounds for coordinate '{}' with {} point(s)",
                    self.name, n
                ),
            });
        }

        let p = &self.points;
        let mut edges = Array1::zeros(n + 1);
        edges[0] = p[0] - (p[1] - p[0]) / 2.0;
        for i in 1..n {
            edges[i] = (p[i - 1] + p[i]) / 2.0;
        }
        edges[n] = p[n - 1] + (p[n - 1] - p[n - 2]) / 2.0;

        let mut bounds = Array2::zeros((n, 2));
        for i in 0..n {
            bounds[[i, 0]] = edges[i];
            bounds[[i, 1]] = edges[i + 1];
        }
        self.bounds = Some(bounds);
        Ok(())
    }

    /// The `n + 1` contiguous cell edges, requiring bounds to be present.
    pub fn contiguous_edges(&self) -> Result<Array1<f64>> {
        let bounds = self
            .bounds
            .as_ref()
            .ok_or_else(|| CubeVistaError::UnsupportedGeometry {
                message: format!("coordinate '{}' has no cell bounds", self.name),
            })?;
        let n = bounds.nrows();
        let mut edges = Array1::zeros(n + 1);
        for i in 0..n {
            edges[i] = bounds[[i, 0]];
        }
        edges[n] = bounds[[n - 1, 1]];
        Ok(edges)
    }
}

/// Basic per-variable statistics over the finite data values.
#[derive(Debug, Clone, Copy)]
pub struct CubeSummary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub valid: usize,
    pub total: usize,
}

/// An in-memory labeled N-dimensional data array.
#[derive(Debug, Clone)]
pub struct Cube {
    /// Variable name (the `standard_name` where the file declares one).
    pub name: String,
    /// Physical units as declared in the file.
    pub units: String,
    /// Dimension names, in data order.
    pub dim_names: Vec<String>,
    /// The data values. Fill values are mapped to NaN at load time.
    pub data: ArrayD<f64>,
    /// Dimension coordinates, where the file provides them.
    pub coords: Vec<Coord>,
    /// UGRID topology, for cubes loaded from an unstructured source.
    pub mesh: Option<MeshTopology>,
    /// Mesh location the data is attached to, for unstructured cubes.
    pub location: Option<DataLocation>,
}

impl Cube {
    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn ndim(&self) -> usize {
        self.data.ndim()
    }

    /// Scalar-bar style label, `"{name} / {units}"`.
    pub fn label(&self) -> String {
        format!("{} / {}", self.name, self.units)
    }

    /// Look up a dimension coordinate by name.
    pub fn coord(&self, name: &str) -> Option<&Coord> {
        self.coords.iter().find(|c| c.name == name)
    }

    /// The longitude coordinate of a structured cube.
    pub fn x_coord(&self) -> Result<&Coord> {
        self.coords
            .iter()
            .find(|c| c.is_x_axis())
            .ok_or_else(|| CubeVistaError::UnsupportedGeometry {
                message: format!("cube '{}' has no x (longitude) coordinate", self.name),
            })
    }

    /// The latitude coordinate of a structured cube.
    pub fn y_coord(&self) -> Result<&Coord> {
        self.coords
            .iter()
            .find(|c| c.is_y_axis())
            .ok_or_else(|| CubeVistaError::UnsupportedGeometry {
                message: format!("cube '{}' has no y (latitude) coordinate", self.name),
            })
    }

    /// Position of the time dimension, if one can be identified.
    pub fn time_axis(&self) -> Option<usize> {
        if let Some(i) = self.dim_names.iter().position(|d| d == "time") {
            return Some(i);
        }
        self.coords
            .iter()
            .find(|c| c.is_time())
            .and_then(|c| self.dim_names.iter().position(|d| *d == c.name))
    }

    /// Take the first time-index slice, dropping the time dimension.
    ///
    /// This is a fixed "take index 0" policy, not a reduction: every other
    /// time step is discarded. When no time dimension is identifiable the
    /// leading dimension is sliced, matching plain `cube[0]` indexing.
    pub fn slice_first_time(&self) -> Result<Cube> {
        if self.ndim() == 0 {
            return Err(CubeVistaError::Generic(format!(
                "cube '{}' is scalar and cannot be sliced",
                self.name
            )));
        }
        let axis = self.time_axis().unwrap_or(0);
        let dropped = self.dim_names[axis].clone();
        let data = self.data.index_axis(Axis(axis), 0).to_owned();

        let mut dim_names = self.dim_names.clone();
        dim_names.remove(axis);
        let coords = self
            .coords
            .iter()
            .filter(|c| c.name != dropped)
            .cloned()
            .collect();

        Ok(Cube {
            name: self.name.clone(),
            units: self.units.clone(),
            dim_names,
            data,
            coords,
            mesh: self.mesh.clone(),
            location: self.location,
        })
    }

    /// Quick min/mean/max over the finite data values.
    pub fn summary(&self) -> CubeSummary {
        let total = self.data.len();
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        let mut valid = 0usize;
        for &v in self.data.iter() {
            if v.is_finite() {
                min = min.min(v);
                max = max.max(v);
                sum += v;
                valid += 1;
            }
        }
        let mean = if valid > 0 { sum / valid as f64 } else { f64::NAN };
        CubeSummary {
            min,
            max,
            mean,
            valid,
            total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn latlon_cube() -> Cube {
        let data = ArrayD::from_shape_vec(
            vec![2, 2, 3],
            (0..12).map(|i| i as f64).collect(),
        )
        .unwrap();
        Cube {
            name: "air_temperature".to_string(),
            units: "K".to_string(),
            dim_names: vec!["time".to_string(), "lat".to_string(), "lon".to_string()],
            data,
            coords: vec![
                Coord::new("time", "hours since 2021-03-24", array![0.0, 6.0]),
                Coord::new("lat", "degrees_north", array![-45.0, 45.0]),
                Coord::new("lon", "degrees_east", array![0.0, 120.0, 240.0]),
            ],
            mesh: None,
            location: None,
        }
    }

    #[test]
    fn guess_bounds_expands_from_centers() {
        let mut coord = Coord::new("lon", "degrees_east", array![0.0, 1.0, 2.0]);
        coord.guess_bounds().unwrap();
        let edges = coord.contiguous_edges().unwrap();
        assert_eq!(edges, array![-0.5, 0.5, 1.5, 2.5]);
    }

    #[test]
    fn guess_bounds_rejects_single_point_axis() {
        let mut coord = Coord::new("lon", "degrees_east", array![10.0]);
        let err = coord.guess_bounds().unwrap_err();
        assert!(matches!(
            err,
            CubeVistaError::UnsupportedGeometry { .. }
        ));
    }

    #[test]
    fn slice_first_time_drops_time_dimension() {
        let cube = latlon_cube();
        let sliced = cube.slice_first_time().unwrap();
        assert_eq!(sliced.ndim(), cube.ndim() - 1);
        assert_eq!(sliced.dim_names, vec!["lat", "lon"]);
        assert!(sliced.coord("time").is_none());
        // Data equals the index-0 slice of the full series.
        assert_eq!(sliced.data[[0, 0]], cube.data[[0, 0, 0]]);
        assert_eq!(sliced.data[[1, 2]], cube.data[[0, 1, 2]]);
    }

    #[test]
    fn axis_lookup_uses_units() {
        let cube = latlon_cube();
        assert_eq!(cube.x_coord().unwrap().name, "lon");
        assert_eq!(cube.y_coord().unwrap().name, "lat");
        assert_eq!(cube.time_axis(), Some(0));
    }

    #[test]
    fn summary_skips_non_finite_values() {
        let mut cube = latlon_cube();
        cube.data[[0, 0, 0]] = f64::NAN;
        let summary = cube.summary();
        assert_eq!(summary.total, 12);
        assert_eq!(summary.valid, 11);
        assert_eq!(summary.min, 1.0);
        assert_eq!(summary.max, 11.0);
    }
}
