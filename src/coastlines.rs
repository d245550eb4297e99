//! Coastline overlay geometry
//!
//! Coastlines come from a Natural Earth GeoJSON file kept alongside the
//! datasets. Only `LineString` and `MultiLineString` geometries are used;
//! everything else in the file is ignored. Vertices are projected onto a
//! sphere fractionally larger than the data sphere so the lines stay
//! visible on top of the mesh.

use crate::errors::{CubeVistaError, Result};
use crate::mesh::lonlat_to_xyz;
use glam::Vec3;
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Radius factor keeping overlay lines clear of the data surface.
pub const OVERLAY_RADIUS: f32 = 1.003;

/// Coastline polylines projected onto the sphere.
#[derive(Debug, Clone, Default)]
pub struct CoastlineSet {
    pub polylines: Vec<Vec<Vec3>>,
}

impl CoastlineSet {
    pub fn n_polylines(&self) -> usize {
        self.polylines.len()
    }

    pub fn n_vertices(&self) -> usize {
        self.polylines.iter().map(Vec::len).sum()
    }

    /// Expand the polylines into independent line segments for drawing.
    pub fn segments(&self) -> Vec<(Vec3, Vec3)> {
        let mut out = Vec::new();
        for line in &self.polylines {
            for pair in line.windows(2) {
                out.push((pair[0], pair[1]));
            }
        }
        out
    }
}

/// Load coastlines from a GeoJSON file.
pub fn load_geojson(path: &Path) -> Result<CoastlineSet> {
    let text = fs::read_to_string(path)?;
    parse_geojson(&text)
}

/// Parse coastlines out of GeoJSON text.
pub fn parse_geojson(text: &str) -> Result<CoastlineSet> {
    let root: Value = serde_json::from_str(text)?;
    let mut set = CoastlineSet::default();

    match root.get("type").and_then(Value::as_str) {
        Some("FeatureCollection") => {
            let features = root
                .get("features")
                .and_then(Value::as_array)
                .ok_or_else(|| CubeVistaError::Generic(
                    "FeatureCollection without a features array".to_string(),
                ))?;
            for feature in features {
                if let Some(geometry) = feature.get("geometry") {
                    collect_geometry(geometry, &mut set);
                }
            }
        }
        Some("Feature") => {
            if let Some(geometry) = root.get("geometry") {
                collect_geometry(geometry, &mut set);
            }
        }
        Some(_) => collect_geometry(&root, &mut set),
        None => {
            return Err(CubeVistaError::Generic(
                "GeoJSON root has no type field".to_string(),
            ))
        }
    }

    Ok(set)
}

fn collect_geometry(geometry: &Value, set: &mut CoastlineSet) {
    let Some(kind) = geometry.get("type").and_then(Value::as_str) else {
        return;
    };
    let Some(coords) = geometry.get("coordinates").and_then(Value::as_array) else {
        return;
    };
    match kind {
        "LineString" => {
            if let Some(line) = project_line(coords) {
                set.polylines.push(line);
            }
        }
        "MultiLineString" => {
            for part in coords {
                if let Some(line) = part.as_array().and_then(|p| project_line(p)) {
                    set.polylines.push(line);
                }
            }
        }
        _ => {}
    }
}

fn project_line(coords: &[Value]) -> Option<Vec<Vec3>> {
    let mut line = Vec::with_capacity(coords.len());
    for position in coords {
        let pair = position.as_array()?;
        let lon = pair.first()?.as_f64()?;
        let lat = pair.get(1)?.as_f64()?;
        line.push(lonlat_to_xyz(lon, lat) * OVERLAY_RADIUS);
    }
    (line.len() >= 2).then_some(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": {"featurecla": "Coastline"},
                "geometry": {
                    "type": "LineString",
                    "coordinates": [[0.0, 0.0], [10.0, 0.0], [10.0, 10.0]]
                }
            },
            {
                "type": "Feature",
                "properties": {},
                "geometry": {
                    "type": "MultiLineString",
                    "coordinates": [
                        [[100.0, -10.0], [110.0, -10.0]],
                        [[120.0, 20.0], [125.0, 25.0], [130.0, 30.0]]
                    ]
                }
            },
            {
                "type": "Feature",
                "properties": {},
                "geometry": {"type": "Point", "coordinates": [1.0, 2.0]}
            }
        ]
    }"#;

    #[test]
    fn parses_line_and_multiline_features() {
        let set = parse_geojson(SAMPLE).unwrap();
        assert_eq!(set.n_polylines(), 3);
        assert_eq!(set.n_vertices(), 3 + 2 + 3);
        // Two-point polylines become one segment, three-point become two.
        assert_eq!(set.segments().len(), 2 + 1 + 2);
    }

    #[test]
    fn vertices_sit_just_above_the_unit_sphere() {
        let set = parse_geojson(SAMPLE).unwrap();
        for line in &set.polylines {
            for v in line {
                assert!((v.length() - OVERLAY_RADIUS).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(parse_geojson("{not json").is_err());
        assert!(parse_geojson(r#"{"no": "type"}"#).is_err());
    }
}
