// renderer.rs — 核心渲染器 (背景球 + 投影表面 + egui)

use glam::Mat4;
use image::RgbaImage;
use std::f32::consts::PI;
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::error::ViewerError;
use crate::material::{
    srgb_to_linear, FaceSides, BACKGROUND_BOTTOM_COLOR, BACKGROUND_EXPONENT, BACKGROUND_OFFSET,
    BACKGROUND_RADIUS, BACKGROUND_TOP_COLOR, DOME_HORIZON_COLOR, DOME_ZENITH_COLOR,
    FLAT_FALLBACK_COLOR,
};
use crate::mesh::{build_sphere_cap, SurfaceMesh};
use crate::runtime::FrameState;

fn setup_egui_ui_fonts(ctx: &egui::Context) {
    // CJK 回退字体: 只在系统里找得到时追加, 拉丁字母仍用 egui 自带字体。
    // ab_glyph 对 .ttc 支持不稳定, 这里只挑 .ttf/.otf。
    fn try_load_font(path: &std::path::Path) -> Option<Vec<u8>> {
        let bytes = std::fs::read(path).ok()?;
        ab_glyph::FontArc::try_from_vec(bytes.clone()).ok()?;
        Some(bytes)
    }

    let mut candidates: Vec<std::path::PathBuf> = Vec::new();
    if cfg!(windows) {
        let win_fonts = std::path::PathBuf::from(r"C:\Windows\Fonts");
        candidates.push(win_fonts.join("msyh.ttf"));
        candidates.push(win_fonts.join("simhei.ttf"));
    } else if cfg!(target_os = "macos") {
        candidates.push("/System/Library/Fonts/Supplemental/Arial Unicode.ttf".into());
        candidates.push("/Library/Fonts/Arial Unicode.ttf".into());
    } else {
        candidates.push("/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.otf".into());
        candidates.push("/usr/share/fonts/truetype/wqy/wqy-microhei.ttf".into());
        candidates.push("/usr/share/fonts/truetype/droid/DroidSansFallbackFull.ttf".into());
    }
    candidates.push(std::path::PathBuf::from("assets").join("NotoSansSC-Regular.otf"));

    let Some((font_path, font_bytes)) = candidates
        .into_iter()
        .find_map(|p| try_load_font(&p).map(|bytes| (p, bytes)))
    else {
        log::info!("{}", crate::i18n::tr("font.not_found"));
        return;
    };

    log::info!(
        "{}",
        crate::i18n::tr_with("font.using", &[("path", font_path.display().to_string())])
    );

    let mut fonts = egui::FontDefinitions::default();
    fonts
        .font_data
        .insert("cjk".to_owned(), egui::FontData::from_owned(font_bytes));
    for family in [egui::FontFamily::Proportional, egui::FontFamily::Monospace] {
        if let Some(list) = fonts.families.get_mut(&family) {
            list.push("cjk".to_owned());
        }
    }
    ctx.set_fonts(fonts);
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
    position: [f32; 3],
    uv: [f32; 2],
}

impl Vertex {
    const ATTRIBS: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x2];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct SurfaceUniform {
    view_proj: [[f32; 4]; 4],
    model: [[f32; 4]; 4],
    zenith_color: [f32; 4],
    horizon_color: [f32; 4],
    flat_color: [f32; 4],
    params: [u32; 4], // x = MaterialKind::shader_index
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct BackgroundUniform {
    view_proj: [[f32; 4]; 4],
    model: [[f32; 4]; 4],
    top_color: [f32; 4],
    bottom_color: [f32; 4],
    shape: [f32; 4], // x = offset, y = exponent
}

const _: () = assert!(std::mem::size_of::<SurfaceUniform>() == 192);
const _: () = assert!(std::mem::size_of::<BackgroundUniform>() == 176);

struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

impl GpuMesh {
    fn upload(device: &wgpu::Device, mesh: &SurfaceMesh, label: &str) -> Self {
        let vertices: Vec<Vertex> = mesh
            .positions
            .iter()
            .zip(&mesh.uvs)
            .map(|(position, uv)| Vertex {
                position: *position,
                uv: *uv,
            })
            .collect();

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            vertex_buffer,
            index_buffer,
            index_count: mesh.indices.len() as u32,
        }
    }

    fn draw<'a>(&'a self, pass: &mut wgpu::RenderPass<'a>) {
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}

fn uniform_bind_group_layout(device: &wgpu::Device, label: &str) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some(label),
    })
}

fn mesh_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
    cull_mode: Option<wgpu::Face>,
    label: &str,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: "vs_main",
            buffers: &[Vertex::layout()],
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
            // 网格正面朝内
            front_face: wgpu::FrontFace::Ccw,
            cull_mode,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        // 只有背景和单个表面, 按绘制顺序覆盖即可
        depth_stencil: None,
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
    })
}

fn present_mode(vsync: bool) -> wgpu::PresentMode {
    if vsync {
        wgpu::PresentMode::Fifo
    } else {
        wgpu::PresentMode::AutoNoVsync
    }
}

pub struct Renderer {
    surface: wgpu::Surface,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    pub size: winit::dpi::PhysicalSize<u32>,

    background_pipeline: wgpu::RenderPipeline,
    interior_pipeline: wgpu::RenderPipeline,
    double_sided_pipeline: wgpu::RenderPipeline,

    // Uniform 资源
    surface_buffer: wgpu::Buffer,
    surface_bind_group: wgpu::BindGroup,
    background_buffer: wgpu::Buffer,
    background_bind_group: wgpu::BindGroup,

    // 帧纹理资源
    frame_bind_group_layout: wgpu::BindGroupLayout,
    frame_bind_group: wgpu::BindGroup,
    frame_texture: wgpu::Texture,
    sampler: wgpu::Sampler,
    has_frame: bool,

    background_mesh: GpuMesh,
    surface_mesh: Option<GpuMesh>,
    surface_generation: Option<u64>,

    // UI
    pub egui_ctx: egui::Context,
    pub egui_state: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
}

impl Renderer {
    pub async fn new(window: std::sync::Arc<Window>, vsync: bool) -> Result<Self, ViewerError> {
        let size = window.inner_size();
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        // SAFETY: the window is kept alive by the Arc held in main for as long
        // as the renderer exists.
        let surface = unsafe { instance.create_surface(window.as_ref()) }?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| ViewerError::Gpu("no compatible adapter".to_string()))?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    features: wgpu::Features::empty(),
                    limits: if cfg!(target_arch = "wasm32") {
                        wgpu::Limits::downlevel_webgl2_defaults()
                    } else {
                        wgpu::Limits::default().using_resolution(adapter.limits())
                    },
                    label: None,
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| ViewerError::Gpu("surface reports no formats".to_string()))?;
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
            present_mode: present_mode(vsync),
            alpha_mode,
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        // --- 1. Frame texture (1x1 placeholder until a source is bound) ---
        let frame_texture = Self::create_frame_texture(&device, 1, 1);
        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &frame_texture,
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

        // 视频帧: 线性过滤, 无 mipmap
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let frame_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            multisampled: false,
                            view_dimension: wgpu::TextureViewDimension::D2,
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
                label: Some("frame_bind_group_layout"),
            });
        let frame_bind_group =
            Self::create_frame_bind_group(&device, &frame_bind_group_layout, &frame_texture, &sampler);

        // --- 2. Uniforms ---
        let uniform_layout = uniform_bind_group_layout(&device, "uniform_bind_group_layout");

        let surface_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Surface Uniform Buffer"),
            size: std::mem::size_of::<SurfaceUniform>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let background_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Background Uniform Buffer"),
            size: std::mem::size_of::<BackgroundUniform>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let surface_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: surface_buffer.as_entire_binding(),
            }],
            label: Some("surface_bind_group"),
        });
        let background_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: background_buffer.as_entire_binding(),
            }],
            label: Some("background_bind_group"),
        });

        // --- 3. Pipelines ---
        let surface_shader = device.create_shader_module(wgpu::include_wgsl!("shaders/surface.wgsl"));
        let background_shader =
            device.create_shader_module(wgpu::include_wgsl!("shaders/background.wgsl"));

        let surface_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Surface Pipeline Layout"),
            bind_group_layouts: &[&uniform_layout, &frame_bind_group_layout],
            push_constant_ranges: &[],
        });
        let background_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Background Pipeline Layout"),
            bind_group_layouts: &[&uniform_layout],
            push_constant_ranges: &[],
        });

        let background_pipeline = mesh_pipeline(
            &device,
            &background_layout,
            &background_shader,
            config.format,
            Some(wgpu::Face::Back),
            "Background Pipeline",
        );
        let interior_pipeline = mesh_pipeline(
            &device,
            &surface_layout,
            &surface_shader,
            config.format,
            Some(wgpu::Face::Back),
            "Dome Interior Pipeline",
        );
        let double_sided_pipeline = mesh_pipeline(
            &device,
            &surface_layout,
            &surface_shader,
            config.format,
            None,
            "Double Sided Pipeline",
        );

        let background_mesh = GpuMesh::upload(
            &device,
            &build_sphere_cap(1.0, 48, 24, PI),
            "background_sphere",
        );

        // --- 4. Egui ---
        let egui_ctx = egui::Context::default();
        setup_egui_ui_fonts(&egui_ctx);

        let mut egui_state = egui_winit::State::new(window.as_ref());
        egui_state.set_pixels_per_point(window.scale_factor() as f32);

        let egui_renderer = egui_wgpu::Renderer::new(&device, config.format, None, 1);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            size,
            background_pipeline,
            interior_pipeline,
            double_sided_pipeline,
            surface_buffer,
            surface_bind_group,
            background_buffer,
            background_bind_group,
            frame_bind_group_layout,
            frame_bind_group,
            frame_texture,
            sampler,
            has_frame: false,
            background_mesh,
            surface_mesh: None,
            surface_generation: None,
            egui_ctx,
            egui_state,
            egui_renderer,
        })
    }

    fn create_frame_texture(device: &wgpu::Device, width: u32, height: u32) -> wgpu::Texture {
        device.create_texture(&wgpu::TextureDescriptor {
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
            label: Some("frame_texture"),
            view_formats: &[],
        })
    }

    fn create_frame_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        texture: &wgpu::Texture,
        sampler: &wgpu::Sampler,
    ) -> wgpu::BindGroup {
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
            label: Some("frame_bind_group"),
        })
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    pub fn set_vsync(&mut self, vsync: bool) {
        let mode = present_mode(vsync);
        if self.config.present_mode != mode {
            self.config.present_mode = mode;
            self.surface.configure(&self.device, &self.config);
            log::debug!("present mode -> {mode:?}");
        }
    }

    pub fn has_frame(&self) -> bool {
        self.has_frame
    }

    /// Re-upload the surface mesh when the scene rebuilt it.
    pub fn sync_surface_mesh(&mut self, mesh: &SurfaceMesh, generation: u64) {
        if self.surface_generation == Some(generation) {
            return;
        }
        self.surface_mesh = Some(GpuMesh::upload(&self.device, mesh, "surface_mesh"));
        self.surface_generation = Some(generation);
        log::debug!(
            "surface mesh uploaded: {} vertices, {} indices",
            mesh.positions.len(),
            mesh.indices.len()
        );
    }

    /// Bind a decoded frame as the surface texture.
    pub fn upload_frame(&mut self, img: RgbaImage) {
        // GPU 纹理尺寸限制
        let max_texture_dimension = self.device.limits().max_texture_dimension_2d;
        let (src_w, src_h) = img.dimensions();

        let img = if src_w > max_texture_dimension || src_h > max_texture_dimension {
            let scale = (max_texture_dimension as f32 / src_w.max(src_h) as f32).min(1.0);
            let new_w = ((src_w as f32 * scale) as u32).max(1);
            let new_h = ((src_h as f32 * scale) as u32).max(1);
            log::warn!(
                "{}",
                crate::i18n::tr_with(
                    "gpu.image_too_large_scaled",
                    &[
                        ("src_w", src_w.to_string()),
                        ("src_h", src_h.to_string()),
                        ("max", max_texture_dimension.to_string()),
                        ("new_w", new_w.to_string()),
                        ("new_h", new_h.to_string())
                    ]
                )
            );
            image::DynamicImage::ImageRgba8(img)
                .resize(new_w, new_h, image::imageops::FilterType::Lanczos3)
                .to_rgba8()
        } else {
            img
        };

        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            return;
        }

        self.frame_texture = Self::create_frame_texture(&self.device, width, height);
        self.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &self.frame_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &img,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );

        self.frame_bind_group = Self::create_frame_bind_group(
            &self.device,
            &self.frame_bind_group_layout,
            &self.frame_texture,
            &self.sampler,
        );
        self.has_frame = true;
    }

    /// Drop the bound frame; the surface falls back to its procedural look.
    pub fn clear_frame(&mut self) {
        self.has_frame = false;
    }

    fn write_uniforms(&self, frame: &FrameState) {
        let aspect = self.config.width as f32 / self.config.height.max(1) as f32;
        let view_proj = frame.pose.view_proj(aspect).to_cols_array_2d();

        let surface = SurfaceUniform {
            view_proj,
            model: frame.surface_model.to_cols_array_2d(),
            zenith_color: srgb_to_linear(DOME_ZENITH_COLOR),
            horizon_color: srgb_to_linear(DOME_HORIZON_COLOR),
            flat_color: srgb_to_linear(FLAT_FALLBACK_COLOR),
            params: [frame.material.kind.shader_index(), 0, 0, 0],
        };
        let background = BackgroundUniform {
            view_proj,
            model: Mat4::from_scale(glam::Vec3::splat(BACKGROUND_RADIUS)).to_cols_array_2d(),
            top_color: srgb_to_linear(BACKGROUND_TOP_COLOR),
            bottom_color: srgb_to_linear(BACKGROUND_BOTTOM_COLOR),
            shape: [BACKGROUND_OFFSET, BACKGROUND_EXPONENT, 0.0, 0.0],
        };

        self.queue
            .write_buffer(&self.surface_buffer, 0, bytemuck::cast_slice(&[surface]));
        self.queue
            .write_buffer(&self.background_buffer, 0, bytemuck::cast_slice(&[background]));
    }

    pub fn render_with_ui(
        &mut self,
        window: &Window,
        frame: &FrameState,
        run_ui: impl FnOnce(&egui::Context),
    ) -> Result<(), wgpu::SurfaceError> {
        self.write_uniforms(frame);

        let output = self.surface.get_current_texture()?;
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });

        // 1. Background sphere, then the projection surface on top
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

            render_pass.set_pipeline(&self.background_pipeline);
            render_pass.set_bind_group(0, &self.background_bind_group, &[]);
            self.background_mesh.draw(&mut render_pass);

            if let Some(mesh) = &self.surface_mesh {
                let pipeline = match frame.material.sides {
                    FaceSides::Interior => &self.interior_pipeline,
                    FaceSides::Double => &self.double_sided_pipeline,
                };
                render_pass.set_pipeline(pipeline);
                render_pass.set_bind_group(0, &self.surface_bind_group, &[]);
                render_pass.set_bind_group(1, &self.frame_bind_group, &[]);
                mesh.draw(&mut render_pass);
            }
        }

        // 2. Render UI
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
            self.egui_renderer
                .update_texture(&self.device, &self.queue, *id, delta);
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
