//! wgpu-based render backend (Metal / Vulkan / DX12).
//!
//! Draw calls are recorded per frame and replayed into a caller-supplied
//! texture view by [`WgpuBackend::present`]. Text is not rasterized here;
//! runs are queued for the host to draw on top.

use std::collections::HashMap;
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use tracing::{debug, info};
use wgpu::util::DeviceExt;

use super::{
    BlendMode, Capabilities, Color, Filter, LineStyle, ProgramId, Rect, RenderBackend, ShaderId,
    ShaderStage, TextureId, UniformValue,
};
use crate::error::{Result, TileviewError};
use crate::shader::validate::{has_entry_point, validate_wgsl, EntryPoint};
use crate::source::sample::read_sample;
use crate::texture::format::{PixelLayout, TextureFormat, UploadType};
use crate::transform::Affine2;

const DASH_LENGTH: f32 = 4.0;

const PASSTHROUGH_WGSL: &str = r"
struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) texcoord: vec2<f32>,
}

@group(0) @binding(1) var imgtex: texture_2d<f32>;
@group(0) @binding(2) var imgsampler: sampler;

@vertex
fn vs_main(@location(0) position: vec2<f32>, @location(1) texcoord: vec2<f32>) -> VertexOutput {
    var out: VertexOutput;
    out.position = vec4<f32>(position, 0.0, 1.0);
    out.texcoord = texcoord;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return textureSample(imgtex, imgsampler, in.texcoord);
}
";

const SOLID_WGSL: &str = r"
struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) color: vec4<f32>,
}

@vertex
fn vs_main(@location(0) position: vec2<f32>, @location(2) color: vec4<f32>) -> VertexOutput {
    var out: VertexOutput;
    out.position = vec4<f32>(position, 0.0, 1.0);
    out.color = color;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return in.color;
}
";

/// Must match `ViewUniforms` in the fragment preamble.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
struct ViewUniforms {
    gain: f32,
    gamma: f32,
    startchannel: i32,
    colormode: i32,
    imgchannels: i32,
    pixelview: i32,
    linearinterp: i32,
    width: i32,
    height: i32,
    _pad: [i32; 3],
}

impl ViewUniforms {
    fn set(&mut self, name: &str, value: UniformValue) {
        let as_int = |v: UniformValue| match v {
            UniformValue::Int(i) => i,
            UniformValue::Float(f) => f as i32,
        };
        let as_float = |v: UniformValue| match v {
            UniformValue::Int(i) => i as f32,
            UniformValue::Float(f) => f,
        };
        match name {
            "gain" => self.gain = as_float(value),
            "gamma" => self.gamma = as_float(value),
            "startchannel" => self.startchannel = as_int(value),
            "colormode" => self.colormode = as_int(value),
            "imgchannels" => self.imgchannels = as_int(value),
            "pixelview" => self.pixelview = as_int(value),
            "linearinterp" => self.linearinterp = as_int(value),
            "width" => self.width = as_int(value),
            "height" => self.height = as_int(value),
            _ => {}
        }
    }
}

/// Window-space vertex; positions are mapped to clip space at present time.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct Vertex {
    position: [f32; 2],
    texcoord: [f32; 2],
    color: [f32; 4],
}

const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 3] =
    wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2, 2 => Float32x4];

fn vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &VERTEX_ATTRIBUTES,
    }
}

/// A text run for the host to draw, in window pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct TextRun {
    pub x: f32,
    pub y: f32,
    pub text: String,
    pub color: Color,
}

struct GpuTexture {
    texture: Option<wgpu::Texture>,
    view: Option<wgpu::TextureView>,
    width: u32,
    height: u32,
    filter: Filter,
}

struct ShaderModule {
    stage: ShaderStage,
    module: wgpu::ShaderModule,
    entry_points: Vec<EntryPoint>,
}

struct Program {
    pipeline: wgpu::RenderPipeline,
    uniforms: ViewUniforms,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SolidKind {
    Fill,
    Line,
    InvertLine,
}

enum DrawKind {
    Program(ProgramId, wgpu::BindGroup),
    Passthrough(wgpu::BindGroup),
    Solid(SolidKind),
}

struct Draw {
    kind: DrawKind,
    first: u32,
    count: u32,
}

struct StagingBuffer {
    buffer: wgpu::Buffer,
    size: u64,
}

pub struct WgpuBackend {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    adapter_name: String,
    caps: Capabilities,
    target_format: wgpu::TextureFormat,
    texture_layout: wgpu::BindGroupLayout,
    program_layout: wgpu::PipelineLayout,
    nearest_sampler: wgpu::Sampler,
    linear_sampler: wgpu::Sampler,
    passthrough_pipeline: wgpu::RenderPipeline,
    fill_pipeline: wgpu::RenderPipeline,
    line_pipeline: wgpu::RenderPipeline,
    invert_line_pipeline: wgpu::RenderPipeline,
    staging: [Option<StagingBuffer>; 2],
    textures: HashMap<TextureId, GpuTexture>,
    shaders: HashMap<ShaderId, ShaderModule>,
    programs: HashMap<ProgramId, Program>,
    current_program: Option<ProgramId>,
    transform: Affine2,
    clear_color: Option<[f32; 4]>,
    vertices: Vec<Vertex>,
    draws: Vec<Draw>,
    text_runs: Vec<TextRun>,
    next_id: u32,
}

impl WgpuBackend {
    /// Open the default adapter and build pipelines rendering into
    /// `target_format` views.
    pub fn new(target_format: wgpu::TextureFormat) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| TileviewError::GpuError(format!("No suitable GPU adapter found: {e}")))?;

        let adapter_name = adapter.get_info().name.clone();
        info!("GPU adapter: {adapter_name}");

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("tileview"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            ..Default::default()
        }))
        .map_err(|e| TileviewError::GpuError(format!("Failed to create GPU device: {e}")))?;

        let device: Arc<wgpu::Device> = Arc::new(device);
        let queue: Arc<wgpu::Queue> = Arc::new(queue);

        let caps = Capabilities {
            shaders: true,
            srgb: true,
            half_float: true,
            float: true,
            max_texture_size: device.limits().max_texture_dimension_2d,
        };

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("tileview.texture.layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
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
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
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
        });

        let program_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("tileview.program.layout"),
            bind_group_layouts: &[&texture_layout],
            immediate_size: 0,
        });
        let solid_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("tileview.solid.layout"),
            bind_group_layouts: &[],
            immediate_size: 0,
        });

        let sampler = |filter: wgpu::FilterMode| {
            device.create_sampler(&wgpu::SamplerDescriptor {
                label: None,
                address_mode_u: wgpu::AddressMode::ClampToEdge,
                address_mode_v: wgpu::AddressMode::ClampToEdge,
                mag_filter: filter,
                min_filter: filter,
                mipmap_filter: wgpu::MipmapFilterMode::Nearest,
                ..Default::default()
            })
        };
        let nearest_sampler = sampler(wgpu::FilterMode::Nearest);
        let linear_sampler = sampler(wgpu::FilterMode::Linear);

        let mk = |label, src: &str| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(src.into()),
            })
        };
        let passthrough_mod = mk("passthrough", PASSTHROUGH_WGSL);
        let solid_mod = mk("solid", SOLID_WGSL);

        let alpha = Some(wgpu::BlendState::ALPHA_BLENDING);
        let invert = Some(wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::OneMinusDst,
                dst_factor: wgpu::BlendFactor::Zero,
                operation: wgpu::BlendOperation::Add,
            },
            alpha: wgpu::BlendComponent::OVER,
        });
        let triangles = wgpu::PrimitiveTopology::TriangleList;
        let lines = wgpu::PrimitiveTopology::LineList;

        let passthrough_pipeline = build_pipeline(
            &device,
            "passthrough",
            &program_layout,
            (&passthrough_mod, &passthrough_mod),
            target_format,
            alpha,
            triangles,
        );
        let fill_pipeline = build_pipeline(
            &device,
            "fill",
            &solid_layout,
            (&solid_mod, &solid_mod),
            target_format,
            alpha,
            triangles,
        );
        let line_pipeline = build_pipeline(
            &device,
            "line",
            &solid_layout,
            (&solid_mod, &solid_mod),
            target_format,
            alpha,
            lines,
        );
        let invert_line_pipeline = build_pipeline(
            &device,
            "invert_line",
            &solid_layout,
            (&solid_mod, &solid_mod),
            target_format,
            invert,
            lines,
        );

        Ok(Self {
            adapter_name,
            caps,
            target_format,
            texture_layout,
            program_layout,
            nearest_sampler,
            linear_sampler,
            passthrough_pipeline,
            fill_pipeline,
            line_pipeline,
            invert_line_pipeline,
            staging: [None, None],
            textures: HashMap::new(),
            shaders: HashMap::new(),
            programs: HashMap::new(),
            current_program: None,
            transform: Affine2::IDENTITY,
            clear_color: None,
            vertices: Vec::new(),
            draws: Vec::new(),
            text_runs: Vec::new(),
            next_id: 1,
            device,
            queue,
        })
    }

    pub fn adapter_name(&self) -> &str {
        &self.adapter_name
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Text queued since the last [`present`](Self::present).
    pub fn take_text_runs(&mut self) -> Vec<TextRun> {
        std::mem::take(&mut self.text_runs)
    }

    /// Replay the recorded frame into `view`, a `width` x `height` target of
    /// the format given at construction.
    pub fn present(&mut self, view: &wgpu::TextureView, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(TileviewError::InvalidDimensions { width, height });
        }
        let (w, h) = (width as f32, height as f32);
        let clip: Vec<Vertex> = self
            .vertices
            .iter()
            .map(|v| Vertex {
                position: [v.position[0] / w * 2.0 - 1.0, 1.0 - v.position[1] / h * 2.0],
                ..*v
            })
            .collect();

        let vertex_buffer = (!clip.is_empty()).then(|| {
            self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("tileview.vertices"),
                contents: bytemuck::cast_slice(&clip),
                usage: wgpu::BufferUsages::VERTEX,
            })
        });

        let load = match self.clear_color {
            Some([r, g, b, a]) => wgpu::LoadOp::Clear(wgpu::Color {
                r: r as f64,
                g: g as f64,
                b: b as f64,
                a: a as f64,
            }),
            None => wgpu::LoadOp::Load,
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("tileview.frame"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("tileview.frame.pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            if let Some(buffer) = &vertex_buffer {
                pass.set_vertex_buffer(0, buffer.slice(..));
                for draw in &self.draws {
                    match &draw.kind {
                        DrawKind::Program(program, bind_group) => {
                            let Some(program) = self.programs.get(program) else {
                                continue;
                            };
                            pass.set_pipeline(&program.pipeline);
                            pass.set_bind_group(0, bind_group, &[]);
                        }
                        DrawKind::Passthrough(bind_group) => {
                            pass.set_pipeline(&self.passthrough_pipeline);
                            pass.set_bind_group(0, bind_group, &[]);
                        }
                        DrawKind::Solid(kind) => pass.set_pipeline(match kind {
                            SolidKind::Fill => &self.fill_pipeline,
                            SolidKind::Line => &self.line_pipeline,
                            SolidKind::InvertLine => &self.invert_line_pipeline,
                        }),
                    }
                    pass.draw(draw.first..draw.first + draw.count, 0..1);
                }
            }
        }
        self.queue.submit(std::iter::once(encoder.finish()));

        debug!("Presented {} draws ({} vertices)", self.draws.len(), clip.len());
        self.vertices.clear();
        self.draws.clear();
        self.clear_color = None;
        Ok(())
    }

    fn next_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn sampler(&self, filter: Filter) -> &wgpu::Sampler {
        match filter {
            Filter::Nearest => &self.nearest_sampler,
            Filter::Linear => &self.linear_sampler,
        }
    }

    fn texture_bind_group(
        &self,
        view: &wgpu::TextureView,
        filter: Filter,
        uniforms: &ViewUniforms,
    ) -> wgpu::BindGroup {
        let uniform_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("tileview.uniforms"),
            contents: bytemuck::bytes_of(uniforms),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: None,
            layout: &self.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(self.sampler(filter)),
                },
            ],
        })
    }

    fn push_draw(&mut self, kind: DrawKind, vertices: &[Vertex]) {
        if vertices.is_empty() {
            return;
        }
        self.draws.push(Draw {
            kind,
            first: self.vertices.len() as u32,
            count: vertices.len() as u32,
        });
        self.vertices.extend_from_slice(vertices);
    }

    fn quad(&self, rect: Rect, uv: Rect, color: [f32; 4]) -> [Vertex; 6] {
        let corner = |x: f32, y: f32, u: f32, v: f32| Vertex {
            position: self.transform.apply((x, y)).into(),
            texcoord: [u, v],
            color,
        };
        let tl = corner(rect.x0, rect.y0, uv.x0, uv.y0);
        let tr = corner(rect.x1, rect.y0, uv.x1, uv.y0);
        let br = corner(rect.x1, rect.y1, uv.x1, uv.y1);
        let bl = corner(rect.x0, rect.y1, uv.x0, uv.y1);
        [tl, tr, br, tl, br, bl]
    }

    /// Upload buffer for `slot`, grown when `size` no longer fits.
    fn staging_buffer(&mut self, slot: usize, size: u64) -> wgpu::Buffer {
        let slot = slot % self.staging.len();
        if let Some(staging) = &self.staging[slot] {
            if staging.size >= size {
                return staging.buffer.clone();
            }
        }
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tileview.staging"),
            size,
            usage: wgpu::BufferUsages::COPY_SRC | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        self.staging[slot] = Some(StagingBuffer {
            buffer: buffer.clone(),
            size,
        });
        buffer
    }
}

fn build_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    (vertex, fragment): (&wgpu::ShaderModule, &wgpu::ShaderModule),
    format: wgpu::TextureFormat,
    blend: Option<wgpu::BlendState>,
    topology: wgpu::PrimitiveTopology,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: vertex,
            entry_point: Some("vs_main"),
            buffers: &[vertex_layout()],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: fragment,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    })
}

/// GPU storage for a texture format. Rows are always expanded to four
/// components; everything wider than 8 bits lands in half floats, which are
/// filterable on every adapter.
fn storage_format(format: &TextureFormat) -> wgpu::TextureFormat {
    match (format.upload, format.storage.srgb) {
        (UploadType::U8, true) => wgpu::TextureFormat::Rgba8UnormSrgb,
        (UploadType::U8, false) => wgpu::TextureFormat::Rgba8Unorm,
        _ => wgpu::TextureFormat::Rgba16Float,
    }
}

/// Expand `layout` samples to RGBA the way the shader expects them:
/// luminance as `(l, l, l, 1)` and luminance-alpha as `(l, l, l, a)`.
fn expand_rgba<T: Copy>(src: &[T], layout: PixelLayout, opaque: T) -> [T; 4] {
    match layout {
        PixelLayout::Luminance => [src[0], src[0], src[0], opaque],
        PixelLayout::LuminanceAlpha => [src[0], src[0], src[0], src[1]],
        PixelLayout::Rgb => [src[0], src[1], src[2], opaque],
        PixelLayout::Rgba | PixelLayout::Invalid => [src[0], src[1], src[2], src[3]],
    }
}

/// Tightly packed rows of `format` to RGBA rows padded to `padded_row` bytes.
fn expand_rows(
    data: &[u8],
    width: u32,
    height: u32,
    format: &TextureFormat,
    padded_row: usize,
) -> Vec<u8> {
    let pixel_bytes = format.bytes_per_pixel();
    let sample_bytes = format.fetch.size();
    let channels = format.channels();
    let mut out = vec![0u8; padded_row * height as usize];
    let mut samples = [0u16; 4];

    let rows = data.chunks_exact(width as usize * pixel_bytes).take(height as usize);
    for (y, row) in rows.enumerate() {
        let dst_row = &mut out[y * padded_row..];
        for (x, pixel) in row.chunks_exact(pixel_bytes).enumerate() {
            if format.upload == UploadType::U8 {
                let rgba = expand_rgba(pixel, format.layout, u8::MAX);
                dst_row[x * 4..x * 4 + 4].copy_from_slice(&rgba);
            } else {
                for (c, sample) in samples.iter_mut().take(channels).enumerate() {
                    let value = read_sample(format.fetch, &pixel[c * sample_bytes..]);
                    *sample = half::f16::from_f64(value).to_bits();
                }
                let rgba = expand_rgba(&samples, format.layout, half::f16::ONE.to_bits());
                for (c, bits) in rgba.iter().enumerate() {
                    dst_row[x * 8 + c * 2..x * 8 + c * 2 + 2].copy_from_slice(&bits.to_ne_bytes());
                }
            }
        }
    }
    out
}

impl RenderBackend for WgpuBackend {
    fn capabilities(&self) -> Capabilities {
        self.caps
    }

    fn create_texture(&mut self, filter: Filter) -> Result<TextureId> {
        let id = TextureId(self.next_id());
        self.textures.insert(
            id,
            GpuTexture {
                texture: None,
                view: None,
                width: 0,
                height: 0,
                filter,
            },
        );
        Ok(id)
    }

    fn allocate_texture(
        &mut self,
        texture: TextureId,
        width: u32,
        height: u32,
        format: &TextureFormat,
    ) -> Result<()> {
        if !format.is_valid() {
            return Err(TileviewError::UnsupportedChannelCount(format.channels()));
        }
        let max = self.caps.max_texture_size;
        if width == 0 || height == 0 || width > max || height > max {
            return Err(TileviewError::InvalidDimensions { width, height });
        }
        let gpu_format = storage_format(format);
        let record = self
            .textures
            .get_mut(&texture)
            .ok_or(TileviewError::UnknownTexture(texture.0))?;

        let tex = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("tileview.tile"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: gpu_format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        record.view = Some(tex.create_view(&wgpu::TextureViewDescriptor::default()));
        record.texture = Some(tex);
        record.width = width;
        record.height = height;
        debug!("Allocated {width}x{height} {gpu_format:?} texture {}", texture.0);
        Ok(())
    }

    fn upload_texture(
        &mut self,
        texture: TextureId,
        width: u32,
        height: u32,
        format: &TextureFormat,
        staging_slot: usize,
        data: &[u8],
    ) -> Result<()> {
        if !format.is_valid() {
            return Err(TileviewError::UnsupportedChannelCount(format.channels()));
        }
        let needed = width as usize * height as usize * format.bytes_per_pixel();
        if data.len() < needed {
            return Err(TileviewError::BufferTooSmall {
                needed,
                actual: data.len(),
            });
        }
        let (tex_width, tex_height) = {
            let record = self
                .textures
                .get(&texture)
                .ok_or(TileviewError::UnknownTexture(texture.0))?;
            (record.width, record.height)
        };
        if width > tex_width || height > tex_height {
            return Err(TileviewError::InvalidDimensions { width, height });
        }
        if width == 0 || height == 0 {
            return Ok(());
        }

        let texel_bytes = match format.upload {
            UploadType::U8 => 4,
            _ => 8,
        };
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT as usize;
        let padded_row = (width as usize * texel_bytes).div_ceil(align) * align;
        let rows = expand_rows(data, width, height, format, padded_row);

        let staging = self.staging_buffer(staging_slot, rows.len() as u64);
        self.queue.write_buffer(&staging, 0, &rows);

        let Some(gpu_texture) = self.textures.get(&texture).and_then(|r| r.texture.as_ref()) else {
            return Err(TileviewError::UnknownTexture(texture.0));
        };
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("tileview.upload"),
            });
        encoder.copy_buffer_to_texture(
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row as u32),
                    rows_per_image: Some(height),
                },
            },
            wgpu::TexelCopyTextureInfo {
                texture: gpu_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn set_texture_filter(&mut self, texture: TextureId, filter: Filter) -> Result<()> {
        let record = self
            .textures
            .get_mut(&texture)
            .ok_or(TileviewError::UnknownTexture(texture.0))?;
        record.filter = filter;
        Ok(())
    }

    fn delete_texture(&mut self, texture: TextureId) {
        self.textures.remove(&texture);
    }

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderId> {
        let entry_points = validate_wgsl(source).map_err(|log| TileviewError::ShaderCompile {
            stage: stage.to_string(),
            log,
        })?;
        let module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(match stage {
                ShaderStage::Vertex => "tileview.vertex",
                ShaderStage::Fragment => "tileview.fragment",
            }),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });
        let id = ShaderId(self.next_id());
        self.shaders.insert(
            id,
            ShaderModule {
                stage,
                module,
                entry_points,
            },
        );
        Ok(id)
    }

    fn link_program(&mut self, vertex: ShaderId, fragment: ShaderId) -> Result<ProgramId> {
        let (Some(vs), Some(fs)) = (self.shaders.get(&vertex), self.shaders.get(&fragment)) else {
            return Err(TileviewError::ShaderLink("unknown shader object".into()));
        };
        if vs.stage != ShaderStage::Vertex
            || !has_entry_point(&vs.entry_points, "vs_main", naga::ShaderStage::Vertex)
        {
            return Err(TileviewError::ShaderLink(
                "vertex stage has no vs_main entry point".into(),
            ));
        }
        if fs.stage != ShaderStage::Fragment
            || !has_entry_point(&fs.entry_points, "fs_main", naga::ShaderStage::Fragment)
        {
            return Err(TileviewError::ShaderLink(
                "fragment stage has no fs_main entry point".into(),
            ));
        }

        let pipeline = build_pipeline(
            &self.device,
            "tileview.program",
            &self.program_layout,
            (&vs.module, &fs.module),
            self.target_format,
            Some(wgpu::BlendState::ALPHA_BLENDING),
            wgpu::PrimitiveTopology::TriangleList,
        );
        let id = ProgramId(self.next_id());
        self.programs.insert(
            id,
            Program {
                pipeline,
                uniforms: ViewUniforms {
                    gain: 1.0,
                    gamma: 1.0,
                    ..Default::default()
                },
            },
        );
        Ok(id)
    }

    // Pipelines own their modules once linked.
    fn detach_shader(&mut self, _program: ProgramId, _shader: ShaderId) {}

    fn delete_shader(&mut self, shader: ShaderId) {
        self.shaders.remove(&shader);
    }

    fn delete_program(&mut self, program: ProgramId) {
        self.programs.remove(&program);
        if self.current_program == Some(program) {
            self.current_program = None;
        }
    }

    fn use_program(&mut self, program: Option<ProgramId>) {
        self.current_program = program.filter(|p| self.programs.contains_key(p));
    }

    fn set_uniform(&mut self, program: ProgramId, name: &str, value: UniformValue) {
        if let Some(program) = self.programs.get_mut(&program) {
            program.uniforms.set(name, value);
        }
    }

    fn clear(&mut self, color: [f32; 4]) {
        self.clear_color = Some(color);
        self.vertices.clear();
        self.draws.clear();
        self.text_runs.clear();
    }

    fn set_transform(&mut self, transform: Affine2) {
        self.transform = transform;
    }

    fn draw_textured_quad(&mut self, texture: TextureId, rect: Rect, uv: Rect) {
        let Some(record) = self.textures.get(&texture) else {
            return;
        };
        let Some(view) = record.view.as_ref() else {
            return;
        };
        let filter = record.filter;
        let current = self
            .current_program
            .and_then(|p| self.programs.get(&p).map(|prog| (p, prog)));
        let kind = match current {
            Some((id, program)) => {
                DrawKind::Program(id, self.texture_bind_group(view, filter, &program.uniforms))
            }
            None => {
                let uniforms = ViewUniforms::default();
                DrawKind::Passthrough(self.texture_bind_group(view, filter, &uniforms))
            }
        };
        let vertices = self.quad(rect, uv, [1.0; 4]);
        self.push_draw(kind, &vertices);
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        let vertices = self.quad(rect, Rect::UNIT, color.to_f32());
        self.push_draw(DrawKind::Solid(SolidKind::Fill), &vertices);
    }

    fn stroke_rect(&mut self, rect: Rect, style: LineStyle, blend: BlendMode, color: Color) {
        let corners = [
            (rect.x0, rect.y0),
            (rect.x1, rect.y0),
            (rect.x1, rect.y1),
            (rect.x0, rect.y1),
        ]
        .map(|p| self.transform.apply(p));
        let (kind, color) = match blend {
            BlendMode::Normal => (SolidKind::Line, color.to_f32()),
            BlendMode::Invert => (SolidKind::InvertLine, [1.0; 4]),
        };

        let mut vertices = Vec::new();
        for i in 0..4 {
            let (a, b) = (corners[i], corners[(i + 1) % 4]);
            match style {
                LineStyle::Solid => push_segment(&mut vertices, a, b, color),
                LineStyle::Dashed => {
                    let length = ((b.0 - a.0).powi(2) + (b.1 - a.1).powi(2)).sqrt();
                    let dashes = (length / (2.0 * DASH_LENGTH)).ceil() as usize;
                    for d in 0..dashes {
                        let t0 = (2 * d) as f32 * DASH_LENGTH / length;
                        let t1 = (((2 * d + 1) as f32 * DASH_LENGTH) / length).min(1.0);
                        let lerp = |t: f32| (a.0 + (b.0 - a.0) * t, a.1 + (b.1 - a.1) * t);
                        push_segment(&mut vertices, lerp(t0), lerp(t1), color);
                    }
                }
            }
        }
        self.push_draw(DrawKind::Solid(kind), &vertices);
    }

    fn draw_line(&mut self, from: (f32, f32), to: (f32, f32), color: Color) {
        let mut vertices = Vec::with_capacity(2);
        push_segment(
            &mut vertices,
            self.transform.apply(from),
            self.transform.apply(to),
            color.to_f32(),
        );
        self.push_draw(DrawKind::Solid(SolidKind::Line), &vertices);
    }

    fn draw_text(&mut self, x: f32, y: f32, text: &str, color: Color) {
        let (x, y) = self.transform.apply((x, y));
        self.text_runs.push(TextRun {
            x,
            y,
            text: text.to_string(),
            color,
        });
    }
}

fn push_segment(vertices: &mut Vec<Vertex>, a: (f32, f32), b: (f32, f32), color: [f32; 4]) {
    for p in [a, b] {
        vertices.push(Vertex {
            position: [p.0, p.1],
            texcoord: [0.0, 0.0],
            color,
        });
    }
}
