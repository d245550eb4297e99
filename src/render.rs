//! The interactive plotting surface
//!
//! Turns an assembled [`GeoPlotter`] session into pixels: an interactive
//! winit window with drag-rotate and scroll-zoom, or a one-shot off-screen
//! render for headless use. Each subplot draws into its own viewport strip;
//! linked sessions route interaction through the plotter so cameras stay
//! identical.
//!
//! Everything GPU-specific lives in this module. The rest of the crate only
//! ever hands over meshes, overlays and cameras.

use crate::errors::{CubeVistaError, Result};
use crate::mesh::ScalarLocation;
use crate::plot::{GeoPlotter, Subplot};
use glam::{Mat4, Vec2, Vec3};
use std::path::Path;
use wgpu::util::DeviceExt;
use winit::{
    application::ApplicationHandler,
    dpi::{PhysicalSize, Size},
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::EventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::{WindowAttributes, WindowId},
};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const BACKGROUND: wgpu::Color = wgpu::Color {
    r: 0.016,
    g: 0.016,
    b: 0.024,
    a: 1.0,
};

/// Radius of the base-layer globe, kept under the data surface.
const BASE_LAYER_RADIUS: f32 = 0.985;
/// Lift applied to face-edge lines so they win the depth test.
const EDGE_LIFT: f32 = 1.0015;

const EDGE_COLOR: [f32; 3] = [0.12, 0.12, 0.12];
const COASTLINE_COLOR: [f32; 3] = [0.05, 0.05, 0.05];
const PLAIN_GLOBE_COLOR: [f32; 3] = [0.28, 0.33, 0.42];

#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
    position: [f32; 3],
    color: [f32; 3],
}

const VERTEX_ATTRS: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

fn vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &VERTEX_ATTRS,
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct Uniforms {
    view_proj: [[f32; 4]; 4],
    eye: [f32; 4],
}

/// Surface colors arrive as sRGB values (colormap tables, texture bytes)
/// and the render target is an sRGB format, so convert once here.
fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_color(rgb: [f32; 3]) -> [f32; 3] {
    [
        srgb_to_linear(rgb[0]),
        srgb_to_linear(rgb[1]),
        srgb_to_linear(rgb[2]),
    ]
}

/// CPU-side geometry for one subplot, ready for upload.
struct SubplotScene {
    triangles: Vec<Vertex>,
    lines: Vec<Vertex>,
    show_axes: bool,
}

/// Triangulate a subplot's meshes and overlays.
fn build_subplot_scene(subplot: &Subplot) -> SubplotScene {
    let mut triangles = Vec::new();
    let mut lines = Vec::new();

    if subplot.show_base_layer {
        push_base_layer(subplot, &mut triangles);
    }

    for layer in &subplot.meshes {
        let mesh = &layer.mesh;
        for f in 0..mesh.n_faces() {
            let face = mesh.face(f);
            let corner_color = |v: u32| -> [f32; 3] {
                let rgb = match mesh.scalar_location {
                    ScalarLocation::Face => layer.mapper.color(mesh.scalars[f]),
                    ScalarLocation::Node => layer.mapper.color(mesh.scalars[v as usize]),
                };
                linear_color(rgb)
            };
            // Fan triangulation; faces are convex polygons on the sphere.
            for i in 1..face.len() - 1 {
                for &v in &[face[0], face[i], face[i + 1]] {
                    triangles.push(Vertex {
                        position: mesh.points[v as usize].into(),
                        color: corner_color(v),
                    });
                }
            }
            if layer.show_edges {
                let edge = linear_color(EDGE_COLOR);
                for i in 0..face.len() {
                    let a = mesh.points[face[i] as usize] * EDGE_LIFT;
                    let b = mesh.points[face[(i + 1) % face.len()] as usize] * EDGE_LIFT;
                    lines.push(Vertex {
                        position: a.into(),
                        color: edge,
                    });
                    lines.push(Vertex {
                        position: b.into(),
                        color: edge,
                    });
                }
            }
        }
    }

    if let Some(coastlines) = &subplot.coastlines {
        let color = linear_color(COASTLINE_COLOR);
        for (a, b) in coastlines.segments() {
            lines.push(Vertex {
                position: a.into(),
                color,
            });
            lines.push(Vertex {
                position: b.into(),
                color,
            });
        }
    }

    SubplotScene {
        triangles,
        lines,
        show_axes: subplot.show_axes,
    }
}

/// A lat-lon sphere under the data, colored from the equirectangular
/// texture when one is present.
fn push_base_layer(subplot: &Subplot, triangles: &mut Vec<Vertex>) {
    const STACKS: usize = 48;
    const SLICES: usize = 96;

    let sample = |lon_deg: f32, lat_deg: f32| -> [f32; 3] {
        match &subplot.base_layer {
            Some(img) => {
                let (w, h) = img.dimensions();
                let u = ((lon_deg + 180.0) / 360.0).rem_euclid(1.0);
                let v = ((90.0 - lat_deg) / 180.0).clamp(0.0, 1.0);
                let px = img.get_pixel(
                    ((u * (w - 1) as f32) as u32).min(w - 1),
                    ((v * (h - 1) as f32) as u32).min(h - 1),
                );
                linear_color([
                    px[0] as f32 / 255.0,
                    px[1] as f32 / 255.0,
                    px[2] as f32 / 255.0,
                ])
            }
            None => linear_color(PLAIN_GLOBE_COLOR),
        }
    };

    let point = |slice: usize, stack: usize| -> (Vec3, f32, f32) {
        let lon = -180.0 + 360.0 * slice as f32 / SLICES as f32;
        let lat = -90.0 + 180.0 * stack as f32 / STACKS as f32;
        let p = crate::mesh::lonlat_to_xyz(lon as f64, lat as f64) * BASE_LAYER_RADIUS;
        (p, lon, lat)
    };

    for stack in 0..STACKS {
        for slice in 0..SLICES {
            let quad = [
                point(slice, stack),
                point(slice + 1, stack),
                point(slice + 1, stack + 1),
                point(slice, stack + 1),
            ];
            for &[a, b, c] in &[[quad[0], quad[1], quad[2]], [quad[0], quad[2], quad[3]]] {
                for (p, lon, lat) in [a, b, c] {
                    triangles.push(Vertex {
                        position: p.into(),
                        color: sample(lon, lat),
                    });
                }
            }
        }
    }
}

/// Orientation triad drawn in a corner inset: +x red, +y green, +z blue.
fn axes_vertices() -> Vec<Vertex> {
    let mut lines = Vec::new();
    for (dir, color) in [
        (Vec3::X, [0.8, 0.1, 0.1]),
        (Vec3::Y, [0.1, 0.8, 0.1]),
        (Vec3::Z, [0.1, 0.1, 0.8]),
    ] {
        lines.push(Vertex {
            position: [0.0, 0.0, 0.0],
            color,
        });
        lines.push(Vertex {
            position: (dir * 1.1).into(),
            color,
        });
    }
    lines
}

const SHADER_WGSL: &str = r#"
struct Uniforms {
  view_proj: mat4x4<f32>,
  eye: vec4<f32>,
};

@group(0) @binding(0) var<uniform> u: Uniforms;

struct VsOut {
  @builtin(position) pos: vec4<f32>,
  @location(0) color: vec3<f32>,
  @location(1) world: vec3<f32>,
};

@vertex
fn vs_main(@location(0) position: vec3<f32>, @location(1) color: vec3<f32>) -> VsOut {
  var out: VsOut;
  out.pos = u.view_proj * vec4<f32>(position, 1.0);
  out.color = color;
  out.world = position;
  return out;
}

// Headlight shading; all geometry sits on a sphere about the origin, so the
// normalized world position doubles as the surface normal.
@fragment
fn fs_mesh(in: VsOut) -> @location(0) vec4<f32> {
  let n = normalize(in.world);
  let l = normalize(u.eye.xyz);
  let shade = 0.35 + 0.65 * max(dot(n, l), 0.0);
  return vec4<f32>(in.color * shade, 1.0);
}

@fragment
fn fs_line(in: VsOut) -> @location(0) vec4<f32> {
  return vec4<f32>(in.color, 1.0);
}
"#;

/// Uploaded geometry and per-subplot uniform state.
struct SubplotGpu {
    tri_buf: wgpu::Buffer,
    tri_count: u32,
    line_buf: wgpu::Buffer,
    line_count: u32,
    axes_buf: Option<wgpu::Buffer>,
    scene_uniform: wgpu::Buffer,
    scene_bind: wgpu::BindGroup,
    axes_uniform: wgpu::Buffer,
    axes_bind: wgpu::BindGroup,
}

struct Pipelines {
    mesh: wgpu::RenderPipeline,
    line: wgpu::RenderPipeline,
    overlay_line: wgpu::RenderPipeline,
    bind_layout: wgpu::BindGroupLayout,
}

fn create_pipelines(device: &wgpu::Device, format: wgpu::TextureFormat) -> Pipelines {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("cube-vista-shader"),
        source: wgpu::ShaderSource::Wgsl(SHADER_WGSL.into()),
    });

    let bind_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("cube-vista-bgl"),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: Some(
                    std::num::NonZeroU64::new(std::mem::size_of::<Uniforms>() as u64).unwrap(),
                ),
            },
            count: None,
        }],
    });

    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("cube-vista-pipeline-layout"),
        bind_group_layouts: &[&bind_layout],
        push_constant_ranges: &[],
    });

    let make = |topology: wgpu::PrimitiveTopology,
                fs_entry: &str,
                depth_compare: wgpu::CompareFunction,
                depth_write: bool| {
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("cube-vista-pipeline"),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[vertex_layout()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some(fs_entry),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: depth_write,
                depth_compare,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        })
    };

    let mesh = make(
        wgpu::PrimitiveTopology::TriangleList,
        "fs_mesh",
        wgpu::CompareFunction::Less,
        true,
    );
    let line = make(
        wgpu::PrimitiveTopology::LineList,
        "fs_line",
        wgpu::CompareFunction::Less,
        true,
    );
    // Orientation axes draw over everything in their inset.
    let overlay_line = make(
        wgpu::PrimitiveTopology::LineList,
        "fs_line",
        wgpu::CompareFunction::Always,
        false,
    );

    Pipelines {
        mesh,
        line,
        overlay_line,
        bind_layout,
    }
}

fn upload_scenes(
    device: &wgpu::Device,
    pipelines: &Pipelines,
    scenes: &[SubplotScene],
) -> Vec<SubplotGpu> {
    scenes
        .iter()
        .map(|scene| {
            let tri_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("subplot-triangles"),
                contents: bytemuck::cast_slice(&scene.triangles),
                usage: wgpu::BufferUsages::VERTEX,
            });
            let line_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("subplot-lines"),
                contents: bytemuck::cast_slice(&scene.lines),
                usage: wgpu::BufferUsages::VERTEX,
            });
            let axes_buf = scene.show_axes.then(|| {
                device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("subplot-axes"),
                    contents: bytemuck::cast_slice(&axes_vertices()),
                    usage: wgpu::BufferUsages::VERTEX,
                })
            });

            let make_uniform = |label: &str| {
                device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(label),
                    contents: bytemuck::bytes_of(&Uniforms {
                        view_proj: Mat4::IDENTITY.to_cols_array_2d(),
                        eye: [0.0, 0.0, 0.0, 1.0],
                    }),
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                })
            };
            let scene_uniform = make_uniform("subplot-uniforms");
            let axes_uniform = make_uniform("axes-uniforms");

            let make_bind = |buffer: &wgpu::Buffer| {
                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("subplot-bind-group"),
                    layout: &pipelines.bind_layout,
                    entries: &[wgpu::BindGroupEntry {
                        binding: 0,
                        resource: buffer.as_entire_binding(),
                    }],
                })
            };
            let scene_bind = make_bind(&scene_uniform);
            let axes_bind = make_bind(&axes_uniform);

            SubplotGpu {
                tri_buf,
                tri_count: scene.triangles.len() as u32,
                line_buf,
                line_count: scene.lines.len() as u32,
                axes_buf,
                scene_uniform,
                scene_bind,
                axes_uniform,
                axes_bind,
            }
        })
        .collect()
}

fn create_depth_texture(
    device: &wgpu::Device,
    width: u32,
    height: u32,
) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("cube-vista-depth"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

/// Update per-subplot camera uniforms and record one full frame.
fn encode_frame(
    queue: &wgpu::Queue,
    encoder: &mut wgpu::CommandEncoder,
    target: &wgpu::TextureView,
    depth: &wgpu::TextureView,
    pipelines: &Pipelines,
    plotter: &GeoPlotter,
    gpu: &[SubplotGpu],
    width: u32,
    height: u32,
) {
    let n = gpu.len().max(1) as u32;
    let strip = (width / n).max(1);

    for (i, subplot_gpu) in gpu.iter().enumerate() {
        let camera = plotter.camera(i);
        let aspect = strip as f32 / height.max(1) as f32;
        queue.write_buffer(
            &subplot_gpu.scene_uniform,
            0,
            bytemuck::bytes_of(&Uniforms {
                view_proj: camera.view_proj(aspect).to_cols_array_2d(),
                eye: camera.eye().extend(1.0).to_array(),
            }),
        );
        let axes_proj = Mat4::perspective_rh(45f32.to_radians(), 1.0, 0.05, 100.0);
        queue.write_buffer(
            &subplot_gpu.axes_uniform,
            0,
            bytemuck::bytes_of(&Uniforms {
                view_proj: (axes_proj * camera.rotation_only()).to_cols_array_2d(),
                eye: camera.eye().extend(1.0).to_array(),
            }),
        );
    }

    let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("cube-vista-pass"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: target,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(BACKGROUND),
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
            view: depth,
            depth_ops: Some(wgpu::Operations {
                load: wgpu::LoadOp::Clear(1.0),
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: None,
        }),
        timestamp_writes: None,
        occlusion_query_set: None,
    });

    for (i, subplot_gpu) in gpu.iter().enumerate() {
        let x = i as u32 * strip;
        if x + strip > width || height == 0 {
            continue;
        }
        rpass.set_viewport(x as f32, 0.0, strip as f32, height as f32, 0.0, 1.0);
        rpass.set_scissor_rect(x, 0, strip, height);

        if subplot_gpu.tri_count > 0 {
            rpass.set_pipeline(&pipelines.mesh);
            rpass.set_bind_group(0, &subplot_gpu.scene_bind, &[]);
            rpass.set_vertex_buffer(0, subplot_gpu.tri_buf.slice(..));
            rpass.draw(0..subplot_gpu.tri_count, 0..1);
        }
        if subplot_gpu.line_count > 0 {
            rpass.set_pipeline(&pipelines.line);
            rpass.set_bind_group(0, &subplot_gpu.scene_bind, &[]);
            rpass.set_vertex_buffer(0, subplot_gpu.line_buf.slice(..));
            rpass.draw(0..subplot_gpu.line_count, 0..1);
        }
        if let Some(axes_buf) = &subplot_gpu.axes_buf {
            // Small inset in the subplot's lower-left corner.
            let inset = (strip.min(height) / 5).max(40);
            if strip < inset + 20 || height < inset + 20 {
                continue;
            }
            rpass.set_viewport(
                (x + 10) as f32,
                (height.saturating_sub(inset + 10)) as f32,
                inset as f32,
                inset as f32,
                0.0,
                1.0,
            );
            rpass.set_scissor_rect(x + 10, height.saturating_sub(inset + 10), inset, inset);
            rpass.set_pipeline(&pipelines.overlay_line);
            rpass.set_bind_group(0, &subplot_gpu.axes_bind, &[]);
            rpass.set_vertex_buffer(0, axes_buf.slice(..));
            rpass.draw(0..6, 0..1);
        }
    }
}

struct GpuState {
    window_size: PhysicalSize<u32>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    depth: wgpu::TextureView,
    pipelines: Pipelines,
    subplots: Vec<SubplotGpu>,
}

impl GpuState {
    async fn new(
        window: &'static winit::window::Window,
        scenes: &[SubplotScene],
    ) -> Result<Self> {
        let window_size = window.inner_size();
        let instance = wgpu::Instance::default();
        let surface = instance
            .create_surface(window)
            .map_err(|e| CubeVistaError::RenderError(e.to_string()))?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| CubeVistaError::RenderError("no suitable GPU adapter".to_string()))?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("cube-vista-device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await
            .map_err(|e| CubeVistaError::RenderError(e.to_string()))?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: window_size.width.max(1),
            height: window_size.height.max(1),
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let depth = create_depth_texture(&device, config.width, config.height);
        let pipelines = create_pipelines(&device, surface_format);
        let subplots = upload_scenes(&device, &pipelines, scenes);

        Ok(Self {
            window_size,
            surface,
            device,
            queue,
            config,
            depth,
            pipelines,
            subplots,
        })
    }

    fn reconfigure_surface(&mut self) {
        self.config.width = self.window_size.width.max(1);
        self.config.height = self.window_size.height.max(1);
        self.surface.configure(&self.device, &self.config);
        self.depth = create_depth_texture(&self.device, self.config.width, self.config.height);
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        self.window_size = size;
        self.reconfigure_surface();
    }

    fn render(&mut self, plotter: &GeoPlotter) -> std::result::Result<(), wgpu::SurfaceError> {
        let frame = self.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("cube-vista-encoder"),
            });
        encode_frame(
            &self.queue,
            &mut encoder,
            &view,
            &self.depth,
            &self.pipelines,
            plotter,
            &self.subplots,
            self.config.width,
            self.config.height,
        );
        self.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }
}

struct App {
    plotter: GeoPlotter,
    scenes: Vec<SubplotScene>,

    window: Option<&'static winit::window::Window>,
    window_id: Option<WindowId>,
    state: Option<GpuState>,

    dragging: bool,
    last_cursor: Option<Vec2>,
}

/// Which subplot strip the cursor is over.
fn subplot_under(n_subplots: usize, surface_width: u32, cursor: Vec2) -> usize {
    let strip = (surface_width / n_subplots.max(1) as u32).max(1);
    ((cursor.x.max(0.0) as u32 / strip) as usize).min(n_subplots.saturating_sub(1))
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &winit::event_loop::ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let width = 640 * self.plotter.n_subplots() as u32;
        let window = event_loop
            .create_window(
                WindowAttributes::default()
                    .with_title(self.plotter.title())
                    .with_inner_size(Size::Physical(PhysicalSize::new(width, 540u32))),
            )
            .expect("failed to create window");

        // Leak the window so we can hold a `'static` reference for wgpu surface lifetime.
        let window: &'static winit::window::Window = Box::leak(Box::new(window));
        self.window_id = Some(window.id());
        self.window = Some(window);

        let gpu = pollster::block_on(GpuState::new(window, &self.scenes))
            .expect("failed to initialize GPU state");
        self.state = Some(gpu);
    }

    fn window_event(
        &mut self,
        event_loop: &winit::event_loop::ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if Some(window_id) != self.window_id {
            return;
        }
        let Some(state) = self.state.as_mut() else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => state.resize(size),
            WindowEvent::RedrawRequested => {
                if let Err(e) = state.render(&self.plotter) {
                    match e {
                        wgpu::SurfaceError::Lost => state.reconfigure_surface(),
                        wgpu::SurfaceError::OutOfMemory => event_loop.exit(),
                        _ => {}
                    }
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state == ElementState::Pressed
                    && event.physical_key == PhysicalKey::Code(KeyCode::Escape)
                {
                    event_loop.exit();
                }
            }
            WindowEvent::MouseInput {
                state: s,
                button: MouseButton::Left,
                ..
            } => {
                self.dragging = s == ElementState::Pressed;
                if !self.dragging {
                    self.last_cursor = None;
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                let pos = Vec2::new(position.x as f32, position.y as f32);
                if self.dragging {
                    if let Some(prev) = self.last_cursor {
                        let delta = pos - prev;
                        let subplot =
                            subplot_under(self.plotter.n_subplots(), state.config.width, pos);
                        self.plotter
                            .rotate_camera(subplot, -delta.x * 0.008, delta.y * 0.008);
                    }
                }
                self.last_cursor = Some(pos);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let scroll_y = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(p) => (p.y as f32) / 120.0,
                };
                if scroll_y.abs() > 0.0001 {
                    let subplot = self
                        .last_cursor
                        .map(|c| subplot_under(self.plotter.n_subplots(), state.config.width, c))
                        .unwrap_or(0);
                    self.plotter.zoom_camera(subplot, 0.9f32.powf(scroll_y));
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &winit::event_loop::ActiveEventLoop) {
        if let Some(w) = self.window {
            w.request_redraw();
        }
    }
}

/// Open the interactive window for a finished session and block until the
/// user closes it.
pub(crate) fn run_window(plotter: GeoPlotter) -> Result<()> {
    let scenes: Vec<SubplotScene> = plotter.subplots().iter().map(build_subplot_scene).collect();
    let event_loop =
        EventLoop::new().map_err(|e| CubeVistaError::RenderError(e.to_string()))?;

    let mut app = App {
        plotter,
        scenes,
        window: None,
        window_id: None,
        state: None,
        dragging: false,
        last_cursor: None,
    };
    event_loop
        .run_app(&mut app)
        .map_err(|e| CubeVistaError::RenderError(e.to_string()))?;
    Ok(())
}

/// Render one frame off-screen and write it to `path` as PNG.
pub(crate) fn render_offscreen(
    plotter: &GeoPlotter,
    path: &Path,
    width: u32,
    height: u32,
) -> Result<()> {
    let scenes: Vec<SubplotScene> = plotter.subplots().iter().map(build_subplot_scene).collect();

    pollster::block_on(async {
        let instance = wgpu::Instance::default();
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| CubeVistaError::RenderError("no suitable GPU adapter".to_string()))?;
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("cube-vista-offscreen"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await
            .map_err(|e| CubeVistaError::RenderError(e.to_string()))?;

        let format = wgpu::TextureFormat::Rgba8UnormSrgb;
        let target = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("offscreen-target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let target_view = target.create_view(&wgpu::TextureViewDescriptor::default());
        let depth = create_depth_texture(&device, width, height);

        let pipelines = create_pipelines(&device, format);
        let gpu = upload_scenes(&device, &pipelines, &scenes);

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("offscreen-encoder"),
        });
        encode_frame(
            &queue,
            &mut encoder,
            &target_view,
            &depth,
            &pipelines,
            plotter,
            &gpu,
            width,
            height,
        );

        // Read the frame back through a padded staging buffer.
        let bytes_per_row = (width * 4 + 255) & !255;
        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("offscreen-staging"),
            size: (bytes_per_row * height) as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: &target,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &staging,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        queue.submit(Some(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        let _ = device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|_| CubeVistaError::RenderError("staging map dropped".to_string()))?
            .map_err(|e| CubeVistaError::RenderError(e.to_string()))?;

        let data = slice.get_mapped_range();
        let mut pixels = Vec::with_capacity((width * height * 4) as usize);
        for row in 0..height {
            let start = (row * bytes_per_row) as usize;
            pixels.extend_from_slice(&data[start..start + (width * 4) as usize]);
        }
        drop(data);
        staging.unmap();

        let img = image::RgbaImage::from_raw(width, height, pixels).ok_or_else(|| {
            CubeVistaError::RenderError("screenshot buffer has the wrong size".to_string())
        })?;
        img.save(path)?;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colormap::{ColorMap, ScalarMapper};
    use crate::mesh::Mesh;
    use crate::plot::{GeoPlotter, MeshOptions};

    fn quad_mesh() -> Mesh {
        Mesh {
            name: "t".to_string(),
            units: "K".to_string(),
            points: vec![Vec3::X, Vec3::Y, Vec3::Z, Vec3::NEG_X],
            faces: vec![0, 1, 2, 3],
            verts_per_face: 4,
            scalars: vec![5.0],
            scalar_location: ScalarLocation::Face,
        }
    }

    #[test]
    fn quads_fan_into_two_triangles() {
        let mut plotter = GeoPlotter::new();
        plotter.add_mesh(
            quad_mesh(),
            MeshOptions {
                show_edges: false,
                cmap: ColorMap::Magma,
                clim: None,
            },
        );
        let scene = build_subplot_scene(&plotter.subplots()[0]);
        assert_eq!(scene.triangles.len(), 6);
        assert_eq!(scene.lines.len(), 0);
    }

    #[test]
    fn edges_add_one_segment_per_face_side() {
        let mut plotter = GeoPlotter::new();
        plotter.add_mesh(quad_mesh(), MeshOptions::default());
        let scene = build_subplot_scene(&plotter.subplots()[0]);
        assert_eq!(scene.lines.len(), 8);
    }

    #[test]
    fn face_scalars_color_all_corners_alike() {
        let mut plotter = GeoPlotter::new();
        plotter.add_mesh(
            quad_mesh(),
            MeshOptions {
                show_edges: false,
                cmap: ColorMap::Magma,
                clim: Some((0.0, 10.0)),
            },
        );
        let scene = build_subplot_scene(&plotter.subplots()[0]);
        let expected = linear_color(ScalarMapper::new(ColorMap::Magma, (0.0, 10.0)).color(5.0));
        assert!(scene.triangles.iter().all(|v| v.color == expected));
    }

    #[test]
    fn base_layer_globe_is_generated_without_a_texture() {
        let mut plotter = GeoPlotter::new();
        plotter.add_base_layer(None);
        let scene = build_subplot_scene(&plotter.subplots()[0]);
        assert!(!scene.triangles.is_empty());
        // Every base-layer vertex sits under the data surface.
        for v in &scene.triangles {
            let r = Vec3::from(v.position).length();
            assert!(r <= BASE_LAYER_RADIUS + 1e-4);
        }
    }

    #[test]
    fn srgb_conversion_is_monotonic_and_bounded() {
        assert_eq!(srgb_to_linear(0.0), 0.0);
        assert!((srgb_to_linear(1.0) - 1.0).abs() < 1e-6);
        assert!(srgb_to_linear(0.2) < srgb_to_linear(0.8));
    }
}
