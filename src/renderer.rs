// renderer.rs — wgpu backend: video texture, screen meshes, shuttle buttons, flat fallback and egui overlay

use std::sync::Arc;

use anyhow::Context as _;
use glam::{Mat3, Mat4, Vec3};
use wgpu::util::DeviceExt;
use winit::window::Window;

use vr_player::camera::EyeView;
use vr_player::controls::{ShuttleButton, ShuttleSphere};
use vr_player::error::RenderError;
use vr_player::host::VideoFrame;
use vr_player::mesh::{build_sphere, ScreenMesh, SphereParams, UvWarp};
use vr_player::render_loop::RenderBackend;

/// Side-by-side stereo is the most views a frame ever has.
const MAX_VIEWS: usize = 2;

/// Two shuttle buttons and the highlight shell.
const MAX_MARKERS: usize = 3;

const MARKER_DETAIL: i32 = 12;
const HIGHLIGHT_SCALE: f32 = 1.1;
const HIGHLIGHT_COLOR: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
    position: [f32; 3],
    uv: [f32; 2],
}

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x2];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct MeshUniform {
    mvp: [[f32; 4]; 4],
    // mat3x3 columns are padded to 16 bytes
    uv_map: [[f32; 4]; 3],
    face_video: [f32; 4],
    params: [f32; 4],
}

impl MeshUniform {
    fn new(mvp: Mat4, warp: &UvWarp) -> Self {
        let (map, face_video, params) = match *warp {
            UvWarp::Linear => (Mat3::IDENTITY, [0.0; 4], [0.0; 4]),
            UvWarp::EquiAngular {
                map,
                face_size,
                video_size,
                inset_px,
            } => (
                map,
                [face_size.x, face_size.y, video_size.x, video_size.y],
                [1.0, inset_px, 0.0, 0.0],
            ),
        };
        let col = |c: glam::Vec3| [c.x, c.y, c.z, 0.0];
        Self {
            mvp: mvp.to_cols_array_2d(),
            uv_map: [col(map.x_axis), col(map.y_axis), col(map.z_axis)],
            face_video,
            params,
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct FlatUniform {
    scale: [f32; 4],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct MarkerUniform {
    mvp: [[f32; 4]; 4],
    color: [f32; 4],
}

fn shuttle_color(button: ShuttleButton) -> [f32; 4] {
    match button {
        ShuttleButton::PlayPause => [0.0, 1.0, 1.0, 1.0],
        ShuttleButton::Exit => [1.0, 0.0, 0.0, 1.0],
    }
}

/// Model matrix and color per marker, highlight shell first so the
/// button it surrounds is drawn over it.
fn marker_instances(shuttle: &[ShuttleSphere]) -> Vec<(Mat4, [f32; 4])> {
    let place = |center: Vec3, radius: f32| Mat4::from_translation(center) * Mat4::from_scale(Vec3::splat(radius));
    let highlight = shuttle
        .iter()
        .filter(|sphere| sphere.highlighted)
        .map(|sphere| (place(sphere.center, sphere.radius * HIGHLIGHT_SCALE), HIGHLIGHT_COLOR));
    let buttons = shuttle
        .iter()
        .map(|sphere| (place(sphere.center, sphere.radius), shuttle_color(sphere.button)));
    highlight.chain(buttons).take(MAX_MARKERS).collect()
}

/// The unit sphere every marker is drawn with, plus one uniform per
/// marker and view.
struct Markers {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    uniforms: Vec<wgpu::Buffer>,
    bind_groups: Vec<wgpu::BindGroup>,
    /// Markers written by the last `draw`.
    count: usize,
}

impl Markers {
    fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout) -> Self {
        let sphere = build_sphere(&SphereParams::full(1.0, MARKER_DETAIL));
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Marker Vertex Buffer"),
            contents: bytemuck::cast_slice(&sphere.positions),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Marker Index Buffer"),
            contents: bytemuck::cast_slice(&sphere.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        let uniforms: Vec<wgpu::Buffer> = (0..MAX_MARKERS * MAX_VIEWS)
            .map(|_| {
                device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("Marker Uniform Buffer"),
                    size: std::mem::size_of::<MarkerUniform>() as wgpu::BufferAddress,
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                })
            })
            .collect();
        let bind_groups = uniforms
            .iter()
            .map(|buffer| {
                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    layout,
                    entries: &[wgpu::BindGroupEntry {
                        binding: 0,
                        resource: buffer.as_entire_binding(),
                    }],
                    label: Some("marker_bind_group"),
                })
            })
            .collect();

        Self {
            vertex_buffer,
            index_buffer,
            index_count: sphere.indices.len() as u32,
            uniforms,
            bind_groups,
            count: 0,
        }
    }

    fn slot(marker: usize, view: usize) -> usize {
        marker * MAX_VIEWS + view
    }
}

/// One attached screen mesh with a uniform buffer per view.
struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    transform: Mat4,
    warp: UvWarp,
    layer_bit: u32,
    uniforms: Vec<wgpu::Buffer>,
    bind_groups: Vec<wgpu::BindGroup>,
}

pub struct Renderer {
    surface: wgpu::Surface,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    pub size: winit::dpi::PhysicalSize<u32>,
    screen_pipeline: wgpu::RenderPipeline,
    flat_pipeline: wgpu::RenderPipeline,
    marker_pipeline: wgpu::RenderPipeline,

    // video texture
    bind_group_layout: wgpu::BindGroupLayout,
    texture: wgpu::Texture,
    texture_view: wgpu::TextureView,
    texture_size: (u32, u32),
    has_frame: bool,
    sampler: wgpu::Sampler,

    // flat fallback
    flat_buffer: wgpu::Buffer,
    flat_bind_group: wgpu::BindGroup,

    // attached scene
    meshes: Vec<GpuMesh>,
    attached: bool,
    views: Vec<EyeView>,
    markers: Markers,

    // UI
    pub egui_ctx: egui::Context,
    pub egui_state: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
}

impl Renderer {
    pub async fn new(window: Arc<Window>) -> anyhow::Result<Self> {
        let size = window.inner_size();
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        // SAFETY: the window is kept alive by the event loop for as long as the surface.
        let surface = unsafe { instance.create_surface(window.as_ref()) }.context("creating the window surface")?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no GPU adapter can present to this window")?;
        log::info!("using GPU adapter {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    features: wgpu::Features::empty(),
                    limits: wgpu::Limits::default().using_resolution(adapter.limits()),
                    label: None,
                },
                None,
            )
            .await
            .context("requesting a GPU device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("the surface reports no formats")?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        // Placeholder until the first frame arrives.
        let (texture, texture_view) = create_video_texture(&device, 1, 1);
        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &[0, 0, 0, 255],
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4),
                rows_per_image: Some(1),
            },
            wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
        );

        // Packed layouts must not bleed across their outer edges.
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
            label: Some("video_bind_group_layout"),
        });

        let flat_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Flat Uniform Buffer"),
            contents: bytemuck::cast_slice(&[FlatUniform { scale: [1.0; 4] }]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let flat_bind_group = create_bind_group(&device, &bind_group_layout, &flat_buffer, &texture_view, &sampler);

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Render Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let screen_shader = device.create_shader_module(wgpu::include_wgsl!("shader_screen.wgsl"));
        let screen_pipeline = create_pipeline(
            &device,
            &pipeline_layout,
            &screen_shader,
            config.format,
            &[Vertex::layout()],
            "Screen Pipeline",
        );

        let flat_shader = device.create_shader_module(wgpu::include_wgsl!("shader_flat.wgsl"));
        let flat_pipeline = create_pipeline(&device, &pipeline_layout, &flat_shader, config.format, &[], "Flat Pipeline");

        let marker_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some("marker_bind_group_layout"),
        });
        let marker_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Marker Pipeline Layout"),
            bind_group_layouts: &[&marker_layout],
            push_constant_ranges: &[],
        });
        let marker_shader = device.create_shader_module(wgpu::include_wgsl!("shader_marker.wgsl"));
        let marker_pipeline = create_pipeline(
            &device,
            &marker_pipeline_layout,
            &marker_shader,
            config.format,
            &[marker_vertex_layout()],
            "Marker Pipeline",
        );
        let markers = Markers::new(&device, &marker_layout);

        let egui_ctx = egui::Context::default();
        let mut egui_state = egui_winit::State::new(window.as_ref());
        egui_state.set_pixels_per_point(window.scale_factor() as f32);
        let egui_renderer = egui_wgpu::Renderer::new(&device, config.format, None, 1);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            size,
            screen_pipeline,
            flat_pipeline,
            marker_pipeline,
            bind_group_layout,
            texture,
            texture_view,
            texture_size: (1, 1),
            has_frame: false,
            sampler,
            flat_buffer,
            flat_bind_group,
            meshes: Vec::new(),
            attached: false,
            views: Vec::new(),
            markers,
            egui_ctx,
            egui_state,
            egui_renderer,
        })
    }

    /// Largest frame edge the GPU accepts; the media loader scales to fit.
    pub fn max_texture_dimension(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }

    pub fn recover_surface(&mut self) {
        self.surface.configure(&self.device, &self.config);
    }

    fn upload_mesh(&self, mesh: &ScreenMesh) -> GpuMesh {
        let vertices: Vec<Vertex> = mesh
            .geometry
            .positions
            .iter()
            .zip(&mesh.geometry.uvs)
            .map(|(&position, &uv)| Vertex { position, uv })
            .collect();

        let vertex_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Screen Vertex Buffer"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Screen Index Buffer"),
            contents: bytemuck::cast_slice(&mesh.geometry.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        let initial = MeshUniform::new(mesh.transform, &mesh.warp);
        let uniforms: Vec<wgpu::Buffer> = (0..MAX_VIEWS)
            .map(|_| {
                self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Screen Uniform Buffer"),
                    contents: bytemuck::cast_slice(&[initial]),
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                })
            })
            .collect();
        let bind_groups = uniforms
            .iter()
            .map(|buffer| create_bind_group(&self.device, &self.bind_group_layout, buffer, &self.texture_view, &self.sampler))
            .collect();

        GpuMesh {
            vertex_buffer,
            index_buffer,
            index_count: mesh.geometry.indices.len() as u32,
            transform: mesh.transform,
            warp: mesh.warp,
            layer_bit: mesh.layer_bit(),
            uniforms,
            bind_groups,
        }
    }

    /// Every bind group samples the video texture; rebuild them after it is replaced.
    fn rebind_texture(&mut self) {
        self.flat_bind_group = create_bind_group(
            &self.device,
            &self.bind_group_layout,
            &self.flat_buffer,
            &self.texture_view,
            &self.sampler,
        );
        for mesh in &mut self.meshes {
            mesh.bind_groups = mesh
                .uniforms
                .iter()
                .map(|buffer| create_bind_group(&self.device, &self.bind_group_layout, buffer, &self.texture_view, &self.sampler))
                .collect();
        }
    }

    fn update_flat_scale(&self) {
        let (tw, th) = self.texture_size;
        let (sw, sh) = (self.config.width as f32, self.config.height as f32);
        let video_aspect = tw as f32 / th.max(1) as f32;
        let surface_aspect = sw / sh.max(1.0);
        let scale = if video_aspect > surface_aspect {
            [1.0, surface_aspect / video_aspect, 0.0, 0.0]
        } else {
            [video_aspect / surface_aspect, 1.0, 0.0, 0.0]
        };
        self.queue
            .write_buffer(&self.flat_buffer, 0, bytemuck::cast_slice(&[FlatUniform { scale }]));
    }

    pub fn render_with_ui(
        &mut self,
        window: &Window,
        run_ui: impl FnOnce(&egui::Context),
    ) -> Result<(), RenderError> {
        let output = self.surface.get_current_texture().map_err(|err| match err {
            wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => RenderError::SurfaceLost,
            wgpu::SurfaceError::OutOfMemory => RenderError::OutOfMemory,
            other => RenderError::Backend(other.to_string()),
        })?;
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });

        // 1. Scene: screen meshes per eye, or the flat video
        if !self.attached {
            self.update_flat_scale();
        }
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: true,
                    },
                })],
                depth_stencil_attachment: None,
            });

            if self.attached {
                let (w, h) = (self.config.width as f32, self.config.height as f32);
                for (slot, eye) in self.views.iter().enumerate().take(MAX_VIEWS) {
                    let [x, y, vw, vh] = eye.viewport;
                    render_pass.set_viewport(x * w, y * h, vw * w, vh * h, 0.0, 1.0);
                    render_pass.set_pipeline(&self.screen_pipeline);
                    for mesh in self.meshes.iter().filter(|m| eye.layers & m.layer_bit != 0) {
                        render_pass.set_bind_group(0, &mesh.bind_groups[slot], &[]);
                        render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                        render_pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                        render_pass.draw_indexed(0..mesh.index_count, 0, 0..1);
                    }

                    // shuttle buttons sit in front of the screen; painter's order
                    if self.markers.count > 0 {
                        render_pass.set_pipeline(&self.marker_pipeline);
                        render_pass.set_vertex_buffer(0, self.markers.vertex_buffer.slice(..));
                        render_pass
                            .set_index_buffer(self.markers.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                        for marker in 0..self.markers.count {
                            let bind_group = &self.markers.bind_groups[Markers::slot(marker, slot)];
                            render_pass.set_bind_group(0, bind_group, &[]);
                            render_pass.draw_indexed(0..self.markers.index_count, 0, 0..1);
                        }
                    }
                }
            } else if self.has_frame {
                render_pass.set_pipeline(&self.flat_pipeline);
                render_pass.set_bind_group(0, &self.flat_bind_group, &[]);
                render_pass.draw(0..3, 0..1);
            }
        }

        // 2. UI
        let raw_input = self.egui_state.take_egui_input(window);
        let full_output = self.egui_ctx.run(raw_input, run_ui);

        self.egui_state
            .handle_platform_output(window, &self.egui_ctx, full_output.platform_output);
        let clipped_primitives = self.egui_ctx.tessellate(full_output.shapes);

        let screen_descriptor = egui_wgpu::renderer::ScreenDescriptor {
            size_in_pixels: [self.config.width, self.config.height],
            pixels_per_point: window.scale_factor() as f32,
        };

        for (id, delta) in &full_output.textures_delta.set {
            self.egui_renderer.update_texture(&self.device, &self.queue, *id, delta);
        }

        self.egui_renderer.update_buffers(
            &self.device,
            &self.queue,
            &mut encoder,
            &clipped_primitives,
            &screen_descriptor,
        );

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Egui Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: true,
                    },
                })],
                depth_stencil_attachment: None,
            });
            self.egui_renderer
                .render(&mut render_pass, &clipped_primitives, &screen_descriptor);
        }

        for id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}

impl RenderBackend for Renderer {
    fn attach(&mut self, meshes: &[ScreenMesh]) -> Result<(), RenderError> {
        if meshes.is_empty() {
            return Err(RenderError::Backend("no screen meshes to attach".into()));
        }
        self.meshes = meshes.iter().map(|mesh| self.upload_mesh(mesh)).collect();
        self.attached = true;
        log::debug!(
            "attached {} screen mesh(es), {} triangles",
            self.meshes.len(),
            self.meshes.iter().map(|m| m.index_count / 3).sum::<u32>()
        );
        Ok(())
    }

    fn detach(&mut self) {
        self.meshes.clear();
        self.views.clear();
        self.markers.count = 0;
        self.attached = false;
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 || (width == self.config.width && height == self.config.height) {
            return;
        }
        self.size = winit::dpi::PhysicalSize::new(width, height);
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
    }

    fn upload_frame(&mut self, frame: &VideoFrame<'_>) -> Result<(), RenderError> {
        if !frame.is_well_formed() {
            return Err(RenderError::TextureBlocked(format!(
                "{}x{} frame carries {} bytes",
                frame.width,
                frame.height,
                frame.rgba.len()
            )));
        }
        let max = self.max_texture_dimension();
        if frame.width > max || frame.height > max {
            return Err(RenderError::Backend(format!(
                "{}x{} frame exceeds the GPU limit of {max}",
                frame.width, frame.height
            )));
        }

        if self.texture_size != (frame.width, frame.height) {
            let (texture, view) = create_video_texture(&self.device, frame.width, frame.height);
            self.texture = texture;
            self.texture_view = view;
            self.texture_size = (frame.width, frame.height);
            self.rebind_texture();
            log::debug!("video texture resized to {}x{}", frame.width, frame.height);
        }

        self.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            frame.rgba,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * frame.width),
                rows_per_image: Some(frame.height),
            },
            wgpu::Extent3d {
                width: frame.width,
                height: frame.height,
                depth_or_array_layers: 1,
            },
        );
        self.has_frame = true;
        Ok(())
    }

    fn draw(&mut self, views: &[EyeView], shuttle: &[ShuttleSphere]) -> Result<(), RenderError> {
        if !self.attached {
            return Err(RenderError::Backend("draw without attached meshes".into()));
        }
        for mesh in &self.meshes {
            for (slot, eye) in views.iter().enumerate().take(MAX_VIEWS) {
                let uniform = MeshUniform::new(eye.view_proj * mesh.transform, &mesh.warp);
                self.queue
                    .write_buffer(&mesh.uniforms[slot], 0, bytemuck::cast_slice(&[uniform]));
            }
        }

        let instances = marker_instances(shuttle);
        for (marker, (model, color)) in instances.iter().enumerate() {
            for (slot, eye) in views.iter().enumerate().take(MAX_VIEWS) {
                let uniform = MarkerUniform {
                    mvp: (eye.view_proj * *model).to_cols_array_2d(),
                    color: *color,
                };
                self.queue.write_buffer(
                    &self.markers.uniforms[Markers::slot(marker, slot)],
                    0,
                    bytemuck::cast_slice(&[uniform]),
                );
            }
        }
        self.markers.count = instances.len();

        self.views = views.to_vec();
        Ok(())
    }
}

fn marker_vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    const ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &ATTRIBUTES,
    }
}

fn create_video_texture(device: &wgpu::Device, width: u32, height: u32) -> (wgpu::Texture, wgpu::TextureView) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        label: Some("video_texture"),
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}

fn create_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    uniform: &wgpu::Buffer,
    texture_view: &wgpu::TextureView,
    sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(texture_view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
        label: Some("video_bind_group"),
    })
}

fn create_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
    buffers: &[wgpu::VertexBufferLayout<'_>],
    label: &str,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: "vs_main",
            buffers,
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: "fs_main",
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            // the camera sits inside the screen and the transforms mirror it
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sphere(button: ShuttleButton, x: f32, highlighted: bool) -> ShuttleSphere {
        ShuttleSphere {
            button,
            center: Vec3::new(x, -2.0, -4.0),
            radius: 0.1,
            highlighted,
        }
    }

    #[test]
    fn highlight_shell_is_drawn_first_and_larger() {
        let instances = marker_instances(&[
            sphere(ShuttleButton::PlayPause, -0.4, false),
            sphere(ShuttleButton::Exit, 0.4, true),
        ]);
        assert_eq!(instances.len(), MAX_MARKERS);

        let (shell, color) = instances[0];
        assert_eq!(color, HIGHLIGHT_COLOR);
        assert_eq!(shell.w_axis.truncate(), Vec3::new(0.4, -2.0, -4.0));
        assert!((shell.x_axis.x - 0.11).abs() < 1e-6);

        assert_eq!(instances[1].1, shuttle_color(ShuttleButton::PlayPause));
        assert_eq!(instances[2].1, shuttle_color(ShuttleButton::Exit));
    }

    #[test]
    fn hidden_shuttle_draws_nothing() {
        assert!(marker_instances(&[]).is_empty());
    }
}
