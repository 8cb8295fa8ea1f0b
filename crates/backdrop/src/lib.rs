//! Procedural background renderer for the arcfx presentation layer.
//!
//! The crate owns a deliberately tiny scene: one full-screen triangle, one
//! shader program, and a single std140 uniform block. An external game loop
//! drives it once per frame:
//!
//! ```text
//!   game loop ──▶ update(dt) / set_pointer(x, y) / resize(w, h)
//!                           │
//!                           ▼
//!                  BackdropUniforms (CPU) ──▶ render() ──▶ GPU UBO ──▶ surface
//! ```
//!
//! [`Backdrop`] owns every GPU resource (surface, device, pipeline, uniform
//! buffer); the shader source is embedded so construction never depends on
//! asset loading. The visual itself is an aspect-corrected two-colour
//! gradient, distorted by a damped ripple travelling out of the pointer
//! position and darkened towards the edges by a radial vignette.

mod shader;
mod uniforms;

pub use wgpu::SurfaceError;

use anyhow::{anyhow, Context, Result};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use wgpu::util::DeviceExt;
use wgpu::TextureFormatFeatureFlags;
use winit::dpi::PhysicalSize;

use crate::shader::{compile_fragment_shader, compile_vertex_shader};
use crate::uniforms::BackdropUniforms;

/// Gradient endpoints for the backdrop colour field, linear RGB.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    /// Colour at the bottom of the viewport.
    pub bottom: [f32; 3],
    /// Colour at the top of the viewport.
    pub top: [f32; 3],
}

impl Default for Palette {
    /// Deep space blue fading into violet, the stock arcade sky.
    fn default() -> Self {
        Self {
            bottom: [0.02, 0.03, 0.10],
            top: [0.30, 0.06, 0.36],
        }
    }
}

/// Anti-aliasing policy for the render pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Antialiasing {
    /// Pick the highest sample count supported by the surface format.
    Auto,
    /// Disable MSAA and render directly into the swapchain.
    Off,
    /// Request a specific MSAA sample count (clamped to what the device supports).
    Samples(u32),
}

impl Default for Antialiasing {
    fn default() -> Self {
        Self::Off
    }
}

/// Immutable configuration passed to the renderer at start-up.
#[derive(Debug, Clone)]
pub struct BackdropConfig {
    /// Initial surface size in physical pixels.
    pub surface_size: (u32, u32),
    /// Gradient endpoints, fixed for the renderer's lifetime.
    pub palette: Palette,
    /// Anti-aliasing mode requested by the caller.
    pub antialiasing: Antialiasing,
}

impl Default for BackdropConfig {
    fn default() -> Self {
        Self {
            surface_size: (1280, 720),
            palette: Palette::default(),
            antialiasing: Antialiasing::default(),
        }
    }
}

/// Full-screen animated backdrop bound to one rendering surface.
///
/// All four operations mutate or read a single CPU-side uniform mirror;
/// [`Backdrop::render`] uploads whatever the mirror holds at that instant,
/// so within a frame the last write always wins and no state is buffered.
pub struct Backdrop {
    gpu: GpuState,
}

impl Backdrop {
    /// Builds the renderer against the supplied window/display handles.
    ///
    /// Fails when no surface, adapter, or device can be acquired; there is
    /// no degraded mode, the caller is expected to abort start-up.
    pub fn new<T>(target: &T, config: &BackdropConfig) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let size = PhysicalSize::new(config.surface_size.0, config.surface_size.1);
        let gpu = GpuState::new(target, size, &config.palette, config.antialiasing)?;
        Ok(Self { gpu })
    }

    /// Advances the animation clock by `dt` seconds (`dt < 0` is ignored).
    pub fn update(&mut self, dt: f32) {
        self.gpu.uniforms.advance(dt);
    }

    /// Reconfigures the swapchain and records the new viewport size.
    ///
    /// Callable at any time, including before the first [`Backdrop::render`];
    /// the next frame renders aspect-correct for the new dimensions.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.gpu.resize(new_size);
    }

    /// Records the latest pointer position in normalized [0,1] coordinates,
    /// origin bottom-left. Out-of-range values are passed through verbatim.
    pub fn set_pointer(&mut self, x: f32, y: f32) {
        self.gpu.uniforms.set_pointer(x, y);
    }

    /// Uploads the current uniform state and draws one frame.
    pub fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        self.gpu.render_frame()
    }

    /// Current surface size in physical pixels.
    pub fn size(&self) -> PhysicalSize<u32> {
        self.gpu.size
    }

    /// Accumulated animation time in seconds.
    pub fn time(&self) -> f32 {
        self.gpu.uniforms.time
    }
}

/// Aggregates every GPU resource needed to present a frame.
struct GpuState {
    /// `wgpu` instance that produced the surface; kept alive for the surface lifetime.
    _instance: wgpu::Instance,
    /// Limits advertised by the adapter; used to validate resize requests.
    limits: wgpu::Limits,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
    sample_count: u32,
    multisample_target: Option<MultisampleTarget>,
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    /// CPU copy of the uniform data mirrored into the buffer each frame.
    uniforms: BackdropUniforms,
}

impl GpuState {
    fn new<T>(
        target: &T,
        initial_size: PhysicalSize<u32>,
        palette: &Palette,
        antialiasing: Antialiasing,
    ) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let instance = wgpu::Instance::default();
        let window_handle = target
            .window_handle()
            .map_err(|err| anyhow!("failed to acquire window handle: {err}"))?;
        let display_handle = target
            .display_handle()
            .map_err(|err| anyhow!("failed to acquire display handle: {err}"))?;
        let surface = unsafe {
            instance.create_surface_unsafe(wgpu::SurfaceTargetUnsafe::RawHandle {
                raw_display_handle: display_handle.as_raw(),
                raw_window_handle: window_handle.as_raw(),
            })
        }
        .context("failed to create rendering surface")?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context("failed to find a suitable GPU adapter")?;

        let limits = adapter.limits();
        let max_dimension = limits.max_texture_dimension_2d;
        let width = initial_size.width.max(1);
        let height = initial_size.height.max(1);
        if width > max_dimension || height > max_dimension {
            anyhow::bail!(
                "GPU max texture dimension is {max_dimension}, requested surface is {width}x{height}"
            );
        }

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|format| format.is_srgb())
            .unwrap_or(surface_caps.formats[0]);

        let sample_count = resolve_sample_count(&adapter, surface_format, antialiasing);
        tracing::info!(?antialiasing, sample_count, "resolved MSAA configuration");

        let device_descriptor = wgpu::DeviceDescriptor {
            label: Some("backdrop device"),
            required_features: wgpu::Features::empty(),
            required_limits: limits.clone(),
            memory_hints: wgpu::MemoryHints::default(),
            trace: wgpu::Trace::default(),
        };
        let (device, queue) = pollster::block_on(adapter.request_device(&device_descriptor))
            .context("failed to create GPU device")?;

        let size = PhysicalSize::new(width, height);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 1,
        };
        surface.configure(&device, &config);

        let vertex_module = compile_vertex_shader(&device)?;
        let fragment_module =
            compile_fragment_shader(&device).context("failed to compile backdrop fragment")?;

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("backdrop uniform layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("backdrop pipeline layout"),
            bind_group_layouts: &[&uniform_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("backdrop pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &vertex_module,
                entry_point: Some("main"),
                buffers: &[],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState {
                count: sample_count,
                ..wgpu::MultisampleState::default()
            },
            fragment: Some(wgpu::FragmentState {
                module: &fragment_module,
                entry_point: Some("main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview: None,
            cache: None,
        });

        let uniforms = BackdropUniforms::new(size.width, size.height, palette);
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("backdrop uniform buffer"),
            contents: bytemuck::bytes_of(&uniforms),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("backdrop uniform bind group"),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let multisample_target = (sample_count > 1)
            .then(|| MultisampleTarget::new(&device, surface_format, size, sample_count));

        tracing::info!(
            "initialised backdrop surface {}x{}, format {:?}",
            size.width,
            size.height,
            surface_format
        );

        Ok(Self {
            _instance: instance,
            limits,
            surface,
            device,
            queue,
            config,
            size,
            sample_count,
            multisample_target,
            pipeline,
            uniform_buffer,
            uniform_bind_group,
            uniforms,
        })
    }

    /// Reconfigures the swapchain to match the new size.
    fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }

        let max_dimension = self.limits.max_texture_dimension_2d;
        if new_size.width > max_dimension || new_size.height > max_dimension {
            tracing::warn!(
                width = new_size.width,
                height = new_size.height,
                max_dimension,
                "resize exceeds GPU max texture dimension; keeping previous size"
            );
            return;
        }

        self.size = new_size;
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
        self.multisample_target = (self.sample_count > 1).then(|| {
            MultisampleTarget::new(&self.device, self.config.format, new_size, self.sample_count)
        });
        self.uniforms
            .set_resolution(new_size.width as f32, new_size.height as f32);
    }

    /// Uploads the uniform mirror, records one render pass, and presents.
    fn render_frame(&mut self) -> Result<(), wgpu::SurfaceError> {
        self.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&self.uniforms));

        let frame = self.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("backdrop encoder"),
            });

        let (attachment_view, resolve_target) = match self.multisample_target.as_ref() {
            Some(msaa) => (&msaa.view, Some(&view)),
            None => (&view, None),
        };

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("backdrop pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: attachment_view,
                    depth_slice: None,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            render_pass.set_pipeline(&self.pipeline);
            render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            render_pass.draw(0..3, 0..1);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        tracing::trace!(
            time = self.uniforms.time,
            "presented frame {}x{}",
            self.size.width,
            self.size.height
        );
        Ok(())
    }
}

/// Negotiates an MSAA sample count the surface format actually supports.
fn resolve_sample_count(
    adapter: &wgpu::Adapter,
    surface_format: wgpu::TextureFormat,
    antialiasing: Antialiasing,
) -> u32 {
    let format_features = adapter.get_texture_format_features(surface_format);
    let mut supported = format_features.flags.supported_sample_counts();
    if !supported.contains(&1) {
        supported.push(1);
    }
    supported.sort_unstable();
    supported.dedup();
    // Requesting more than 4 samples needs adapter-specific format features
    // we do not ask for, so cap negotiation there.
    supported.retain(|&count| count <= 4);

    let sample_count = match antialiasing {
        Antialiasing::Auto => *supported.last().unwrap_or(&1),
        Antialiasing::Off => 1,
        Antialiasing::Samples(requested) => {
            if supported.contains(&requested) {
                requested
            } else {
                let fallback = supported
                    .iter()
                    .copied()
                    .filter(|&count| count <= requested)
                    .max()
                    .unwrap_or(1);
                tracing::warn!(
                    requested,
                    fallback,
                    ?supported,
                    "requested MSAA sample count not supported; falling back"
                );
                fallback
            }
        }
    };

    if sample_count > 1
        && !format_features
            .flags
            .contains(TextureFormatFeatureFlags::MULTISAMPLE_RESOLVE)
    {
        tracing::warn!(
            ?surface_format,
            "surface format does not support MSAA resolve; disabling MSAA"
        );
        return 1;
    }

    sample_count
}

struct MultisampleTarget {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl MultisampleTarget {
    fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        size: PhysicalSize<u32>,
        sample_count: u32,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("backdrop msaa color"),
            size: wgpu::Extent3d {
                width: size.width.max(1),
                height: size.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }
}
