//! Scalar-to-color mapping
//!
//! Perceptually-uniform colormaps stored as anchor tables and linearly
//! interpolated on lookup. A [`ScalarMapper`] pairs a colormap with a fixed
//! scalar range; dual-view plots build one mapper over the combined range of
//! both meshes so the two panels share a color scheme.

use crate::mesh::Mesh;

type Anchor = [f32; 3];

const MAGMA: [Anchor; 9] = [
    [0.001462, 0.000466, 0.013866],
    [0.078815, 0.054184, 0.211667],
    [0.232077, 0.059889, 0.437695],
    [0.390384, 0.100379, 0.501864],
    [0.550287, 0.161158, 0.505719],
    [0.716387, 0.214982, 0.475290],
    [0.944006, 0.377643, 0.365136],
    [0.996369, 0.620505, 0.424268],
    [0.987053, 0.991438, 0.749504],
];

const VIRIDIS: [Anchor; 9] = [
    [0.267004, 0.004874, 0.329415],
    [0.282623, 0.140926, 0.457517],
    [0.253935, 0.265254, 0.529983],
    [0.206756, 0.371758, 0.553117],
    [0.163625, 0.471133, 0.558148],
    [0.127568, 0.566949, 0.550556],
    [0.134692, 0.658636, 0.517649],
    [0.477504, 0.821444, 0.318195],
    [0.993248, 0.906157, 0.143936],
];

/// Color shown for undefined (NaN) scalars that survive thresholding.
pub const UNDEFINED_COLOR: Anchor = [0.65, 0.65, 0.65];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMap {
    #[default]
    Magma,
    Viridis,
}

impl ColorMap {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "magma" => Some(ColorMap::Magma),
            "viridis" => Some(ColorMap::Viridis),
            _ => None,
        }
    }

    fn anchors(self) -> &'static [Anchor; 9] {
        match self {
            ColorMap::Magma => &MAGMA,
            ColorMap::Viridis => &VIRIDIS,
        }
    }

    /// Sample the colormap at `t` in `[0, 1]` (clamped).
    pub fn sample(self, t: f32) -> Anchor {
        let anchors = self.anchors();
        let t = t.clamp(0.0, 1.0) * (anchors.len() - 1) as f32;
        let lo = (t.floor() as usize).min(anchors.len() - 2);
        let frac = t - lo as f32;
        let a = anchors[lo];
        let b = anchors[lo + 1];
        [
            a[0] + (b[0] - a[0]) * frac,
            a[1] + (b[1] - a[1]) * frac,
            a[2] + (b[2] - a[2]) * frac,
        ]
    }
}

/// A colormap fixed to a scalar range.
#[derive(Debug, Clone, Copy)]
pub struct ScalarMapper {
    pub cmap: ColorMap,
    pub min: f64,
    pub max: f64,
}

impl ScalarMapper {
    pub fn new(cmap: ColorMap, range: (f64, f64)) -> Self {
        Self {
            cmap,
            min: range.0,
            max: range.1,
        }
    }

    /// A mapper spanning the combined finite range of all `meshes`, so
    /// every mesh drawn with it shares one color scheme.
    pub fn shared(cmap: ColorMap, meshes: &[&Mesh]) -> Self {
        let mut range: Option<(f64, f64)> = None;
        for mesh in meshes {
            if let Some((lo, hi)) = mesh.scalar_range() {
                range = Some(match range {
                    Some((a, b)) => (a.min(lo), b.max(hi)),
                    None => (lo, hi),
                });
            }
        }
        Self::new(cmap, range.unwrap_or((0.0, 1.0)))
    }

    pub fn color(&self, value: f64) -> Anchor {
        if !value.is_finite() {
            return UNDEFINED_COLOR;
        }
        let span = self.max - self.min;
        let t = if span > 0.0 {
            ((value - self.min) / span) as f32
        } else {
            0.5
        };
        self.cmap.sample(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::ScalarLocation;
    use glam::Vec3;

    fn mesh_with_scalars(scalars: Vec<f64>) -> Mesh {
        let n = scalars.len();
        Mesh {
            name: "t".to_string(),
            units: "K".to_string(),
            points: vec![Vec3::X; 4],
            faces: (0..n).flat_map(|_| [0u32, 1, 2, 3]).collect(),
            verts_per_face: 4,
            scalars,
            scalar_location: ScalarLocation::Face,
        }
    }

    #[test]
    fn endpoints_hit_first_and_last_anchor() {
        let mapper = ScalarMapper::new(ColorMap::Magma, (10.0, 20.0));
        assert_eq!(mapper.color(10.0), MAGMA[0]);
        assert_eq!(mapper.color(20.0), MAGMA[8]);
    }

    #[test]
    fn out_of_range_values_clamp() {
        let mapper = ScalarMapper::new(ColorMap::Viridis, (0.0, 1.0));
        assert_eq!(mapper.color(-5.0), VIRIDIS[0]);
        assert_eq!(mapper.color(9.0), VIRIDIS[8]);
    }

    #[test]
    fn nan_maps_to_the_undefined_color() {
        let mapper = ScalarMapper::new(ColorMap::Magma, (0.0, 1.0));
        assert_eq!(mapper.color(f64::NAN), UNDEFINED_COLOR);
    }

    #[test]
    fn shared_range_spans_both_meshes() {
        let left = mesh_with_scalars(vec![1.0, 5.0]);
        let right = mesh_with_scalars(vec![-3.0, 2.0]);
        let mapper = ScalarMapper::shared(ColorMap::Magma, &[&left, &right]);
        assert_eq!(mapper.min, -3.0);
        assert_eq!(mapper.max, 5.0);
    }

    #[test]
    fn degenerate_range_still_produces_a_color() {
        let mapper = ScalarMapper::new(ColorMap::Magma, (4.0, 4.0));
        let c = mapper.color(4.0);
        assert!(c.iter().all(|v| v.is_finite()));
    }
}
