//! Plot composition
//!
//! A [`GeoPlotter`] is a display session: one or two subplot regions, each
//! holding meshes, optional overlays and an orbit camera. Composition is
//! separate from display; [`GeoPlotter::show`] hands the finished session to
//! the rendering surface and blocks until the window closes, while
//! [`GeoPlotter::screenshot`] renders once off-screen for headless use.
//!
//! [`single_view`] and [`dual_view`] assemble the two standard layouts.

use crate::coastlines::{self, CoastlineSet};
use crate::colormap::{ColorMap, ScalarMapper};
use crate::config::DatasetPaths;
use crate::errors::Result;
use crate::mesh::Mesh;
use crate::render;
use glam::{Mat4, Vec3};
use image::RgbaImage;
use std::path::Path;

/// Orbit camera about the globe center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitCamera {
    /// Rotation about +z, radians. Zero looks down the +x axis.
    pub azimuth: f32,
    /// Angle above the equatorial plane, radians.
    pub elevation: f32,
    /// Eye distance from the origin.
    pub distance: f32,
}

impl OrbitCamera {
    const MIN_DISTANCE: f32 = 1.2;
    const MAX_DISTANCE: f32 = 20.0;
    const MAX_ELEVATION: f32 = std::f32::consts::FRAC_PI_2 - 0.01;

    /// The fixed initial orientation: eye on -y, +z up, so the x-z plane
    /// faces the viewer.
    pub fn view_xz() -> Self {
        Self {
            azimuth: -std::f32::consts::FRAC_PI_2,
            elevation: 0.0,
            distance: 3.0,
        }
    }

    pub fn eye(&self) -> Vec3 {
        Vec3::new(
            self.distance * self.elevation.cos() * self.azimuth.cos(),
            self.distance * self.elevation.cos() * self.azimuth.sin(),
            self.distance * self.elevation.sin(),
        )
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye(), Vec3::ZERO, Vec3::Z)
    }

    pub fn view_proj(&self, aspect: f32) -> Mat4 {
        let proj = Mat4::perspective_rh(45f32.to_radians(), aspect.max(0.01), 0.05, 100.0);
        proj * self.view_matrix()
    }

    /// Rotation-only transform, used by the orientation axes widget.
    pub fn rotation_only(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye().normalize() * 3.0, Vec3::ZERO, Vec3::Z)
    }

    pub fn orbit(&mut self, d_azimuth: f32, d_elevation: f32) {
        self.azimuth += d_azimuth;
        self.elevation =
            (self.elevation + d_elevation).clamp(-Self::MAX_ELEVATION, Self::MAX_ELEVATION);
    }

    pub fn zoom(&mut self, factor: f32) {
        self.distance = (self.distance * factor).clamp(Self::MIN_DISTANCE, Self::MAX_DISTANCE);
    }
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::view_xz()
    }
}

/// Per-mesh display options.
#[derive(Debug, Clone, Copy)]
pub struct MeshOptions {
    pub show_edges: bool,
    pub cmap: ColorMap,
    /// Explicit scalar range; defaults to the mesh's own range.
    pub clim: Option<(f64, f64)>,
}

impl Default for MeshOptions {
    fn default() -> Self {
        Self {
            show_edges: true,
            cmap: ColorMap::default(),
            clim: None,
        }
    }
}

/// A mesh plus its resolved color mapping.
pub struct MeshLayer {
    pub mesh: Mesh,
    pub show_edges: bool,
    pub mapper: ScalarMapper,
}

/// One subplot region.
pub struct Subplot {
    pub meshes: Vec<MeshLayer>,
    pub coastlines: Option<CoastlineSet>,
    pub base_layer: Option<RgbaImage>,
    pub show_base_layer: bool,
    pub show_axes: bool,
    pub camera: OrbitCamera,
}

impl Subplot {
    fn new() -> Self {
        Self {
            meshes: Vec::new(),
            coastlines: None,
            base_layer: None,
            show_base_layer: false,
            show_axes: false,
            camera: OrbitCamera::default(),
        }
    }
}

/// An assembled, displayable plotting session.
pub struct GeoPlotter {
    shape: (usize, usize),
    subplots: Vec<Subplot>,
    active: usize,
    linked: bool,
    title: Option<String>,
}

impl GeoPlotter {
    /// Single-subplot plotter.
    pub fn new() -> Self {
        Self::with_shape(1, 1)
    }

    /// Plotter with a `rows x cols` subplot grid.
    pub fn with_shape(rows: usize, cols: usize) -> Self {
        let count = rows.max(1) * cols.max(1);
        Self {
            shape: (rows.max(1), cols.max(1)),
            subplots: (0..count).map(|_| Subplot::new()).collect(),
            active: 0,
            linked: false,
            title: None,
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    pub fn n_subplots(&self) -> usize {
        self.subplots.len()
    }

    pub fn subplots(&self) -> &[Subplot] {
        &self.subplots
    }

    pub fn is_linked(&self) -> bool {
        self.linked
    }

    /// Select the subplot that subsequent `add_*` calls target.
    pub fn subplot(&mut self, row: usize, col: usize) -> &mut Self {
        let idx = row * self.shape.1 + col;
        assert!(idx < self.subplots.len(), "subplot ({row}, {col}) out of range");
        self.active = idx;
        self
    }

    /// Add a mesh to the active subplot.
    pub fn add_mesh(&mut self, mesh: Mesh, opts: MeshOptions) -> &mut Self {
        let range = opts
            .clim
            .or_else(|| mesh.scalar_range())
            .unwrap_or((0.0, 1.0));
        let mapper = ScalarMapper::new(opts.cmap, range);
        self.subplots[self.active].meshes.push(MeshLayer {
            mesh,
            show_edges: opts.show_edges,
            mapper,
        });
        self
    }

    /// Add a coastline overlay to the active subplot.
    pub fn add_coastlines(&mut self, set: CoastlineSet) -> &mut Self {
        self.subplots[self.active].coastlines = Some(set);
        self
    }

    /// Load the coastline overlay from the dataset layout, if the file is
    /// present; a missing overlay file is noted and skipped.
    pub fn add_coastlines_from(&mut self, paths: &DatasetPaths) -> Result<&mut Self> {
        if paths.coastlines_filepath.exists() {
            let set = coastlines::load_geojson(&paths.coastlines_filepath)?;
            self.add_coastlines(set);
        } else {
            println!(
                "No coastline file at {}; skipping overlay",
                paths.coastlines_filepath.display()
            );
        }
        Ok(self)
    }

    /// Add the base imagery layer to the active subplot. With no texture a
    /// plain shaded globe is drawn, which still stops the far side of the
    /// data showing through.
    pub fn add_base_layer(&mut self, texture: Option<RgbaImage>) -> &mut Self {
        let subplot = &mut self.subplots[self.active];
        subplot.base_layer = texture;
        subplot.show_base_layer = true;
        self
    }

    /// Orientation axes for the active subplot.
    pub fn add_axes(&mut self) -> &mut Self {
        self.subplots[self.active].show_axes = true;
        self
    }

    /// Window title text.
    pub fn add_text(&mut self, title: impl Into<String>) -> &mut Self {
        self.title = Some(title.into());
        self
    }

    /// Force all subplot cameras to move together under interaction.
    pub fn link_views(&mut self) -> &mut Self {
        self.linked = true;
        let camera = self.subplots[0].camera;
        for subplot in &mut self.subplots {
            subplot.camera = camera;
        }
        self
    }

    /// Reset every camera to the fixed initial orientation.
    pub fn view_xz(&mut self) -> &mut Self {
        for subplot in &mut self.subplots {
            subplot.camera = OrbitCamera::view_xz();
        }
        self
    }

    pub fn camera(&self, subplot: usize) -> &OrbitCamera {
        &self.subplots[subplot].camera
    }

    /// Rotate one subplot's camera; linked views write through to all.
    pub fn rotate_camera(&mut self, subplot: usize, d_azimuth: f32, d_elevation: f32) {
        if self.linked {
            for s in &mut self.subplots {
                s.camera.orbit(d_azimuth, d_elevation);
            }
        } else {
            self.subplots[subplot].camera.orbit(d_azimuth, d_elevation);
        }
    }

    /// Zoom one subplot's camera; linked views write through to all.
    pub fn zoom_camera(&mut self, subplot: usize, factor: f32) {
        if self.linked {
            for s in &mut self.subplots {
                s.camera.zoom(factor);
            }
        } else {
            self.subplots[subplot].camera.zoom(factor);
        }
    }

    /// Effective window title.
    pub fn title(&self) -> String {
        if let Some(title) = &self.title {
            return title.clone();
        }
        self.subplots
            .iter()
            .flat_map(|s| s.meshes.first())
            .next()
            .map(|layer| format!("{} / {}", layer.mesh.name, layer.mesh.units))
            .unwrap_or_else(|| "CubeVista".to_string())
    }

    /// Open the interactive window. Blocks the calling thread until the
    /// window is closed by the user.
    pub fn show(self) -> Result<()> {
        render::run_window(self)
    }

    /// Render the session once off-screen and write a PNG.
    pub fn screenshot(&self, path: &Path, width: u32, height: u32) -> Result<()> {
        render::render_offscreen(self, path, width, height)
    }
}

impl Default for GeoPlotter {
    fn default() -> Self {
        Self::new()
    }
}

/// Load the equirectangular base-layer image from the dataset layout, if
/// present.
pub fn natural_earth_texture(paths: &DatasetPaths) -> Option<RgbaImage> {
    if !paths.base_layer_filepath.exists() {
        return None;
    }
    match image::open(&paths.base_layer_filepath) {
        Ok(img) => Some(img.to_rgba8()),
        Err(e) => {
            println!(
                "Could not read base layer {}: {}",
                paths.base_layer_filepath.display(),
                e
            );
            None
        }
    }
}

/// Quick display composition for one mesh: thresholded data over a base
/// layer, with coastlines, orientation axes and a title defaulting to
/// `"{name} / {units}"`.
pub fn single_view(mesh: &Mesh, paths: &DatasetPaths, title: Option<&str>) -> Result<GeoPlotter> {
    let label = format!("{} / {}", mesh.name, mesh.units);
    let mut plotter = GeoPlotter::new();
    plotter.add_mesh(mesh.threshold(), MeshOptions::default());
    plotter.add_base_layer(natural_earth_texture(paths));
    plotter.add_coastlines_from(paths)?;
    plotter.add_axes();
    plotter.add_text(title.unwrap_or(&label));
    Ok(plotter)
}

/// Options for [`dual_view`].
#[derive(Debug, Clone, Copy)]
pub struct DualViewOptions {
    pub show_coastlines: bool,
    pub show_baselayer: bool,
}

impl Default for DualViewOptions {
    fn default() -> Self {
        Self {
            show_coastlines: true,
            show_baselayer: false,
        }
    }
}

/// Plot two meshes alongside each other with the same controls: shared
/// color mapping, linked cameras and a fixed initial orientation. Returns
/// the plotter ready to display.
pub fn dual_view(
    mesh_left: &Mesh,
    mesh_right: &Mesh,
    paths: &DatasetPaths,
    opts: DualViewOptions,
) -> Result<GeoPlotter> {
    let shared = ScalarMapper::shared(ColorMap::Magma, &[mesh_left, mesh_right]);
    let mesh_opts = MeshOptions {
        show_edges: true,
        cmap: ColorMap::Magma,
        clim: Some((shared.min, shared.max)),
    };

    let mut plotter = GeoPlotter::with_shape(1, 2);
    for (col, mesh) in [mesh_left, mesh_right].into_iter().enumerate() {
        plotter.subplot(0, col);
        if opts.show_coastlines {
            plotter.add_coastlines_from(paths)?;
        }
        if opts.show_baselayer {
            plotter.add_base_layer(natural_earth_texture(paths));
        }
        plotter.add_mesh(mesh.clone(), mesh_opts);
    }

    // Make left and right move together.
    plotter.link_views();
    plotter.view_xz();
    Ok(plotter)
}
