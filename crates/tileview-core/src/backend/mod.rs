//! Graphics API abstraction.
//!
//! The viewer drives a [`RenderBackend`] with a small set of primitives:
//! texture objects, shader objects, and immediate-style drawing. One
//! implementation exists per graphics API, chosen once at initialization.

pub mod display_list;
#[cfg(feature = "gpu")]
pub mod wgpu_backend;

pub use display_list::{DisplayListBackend, DrawCommand};

use crate::error::Result;
use crate::texture::format::TextureFormat;
use crate::transform::Affine2;

/// What the graphics context can do, probed once at initialization.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Capabilities {
    pub shaders: bool,
    pub srgb: bool,
    pub half_float: bool,
    pub float: bool,
    pub max_texture_size: u32,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            shaders: true,
            srgb: true,
            half_float: true,
            float: true,
            max_texture_size: 8192,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShaderStage::Vertex => write!(f, "vertex"),
            ShaderStage::Fragment => write!(f, "fragment"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Filter {
    Nearest,
    Linear,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LineStyle {
    Solid,
    Dashed,
}

/// How outlines combine with what is already drawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlendMode {
    Normal,
    /// Invert the destination, so the outline stays visible on any content.
    Invert,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UniformValue {
    Int(i32),
    Float(f32),
}

/// 8-bit RGBA colour.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    pub fn to_f32(self) -> [f32; 4] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            self.a as f32 / 255.0,
        ]
    }
}

/// Axis-aligned rectangle given by two corners.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Rect {
    pub const UNIT: Rect = Rect {
        x0: 0.0,
        y0: 0.0,
        x1: 1.0,
        y1: 1.0,
    };

    pub const fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn from_size(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self::new(x, y, x + width, y + height)
    }

    /// Same rectangle with corners ordered min then max.
    pub fn normalized(self) -> Self {
        Self::new(
            self.x0.min(self.x1),
            self.y0.min(self.y1),
            self.x0.max(self.x1),
            self.y0.max(self.y1),
        )
    }

    pub fn width(&self) -> f32 {
        (self.x1 - self.x0).abs()
    }

    pub fn height(&self) -> f32 {
        (self.y1 - self.y0).abs()
    }
}

/// Primitives the viewer needs from a graphics API.
///
/// Coordinates passed to drawing calls are mapped through the current
/// transform into window pixels (origin top-left, y down). Failures that
/// the caller can degrade around are reported as errors; drawing calls
/// themselves are infallible.
pub trait RenderBackend {
    fn capabilities(&self) -> Capabilities;

    // --- Textures ---

    fn create_texture(&mut self, filter: Filter) -> Result<TextureId>;

    /// (Re)allocate storage. Previous contents become undefined.
    fn allocate_texture(
        &mut self,
        texture: TextureId,
        width: u32,
        height: u32,
        format: &TextureFormat,
    ) -> Result<()>;

    /// Replace the `width` x `height` block at the texture origin with tightly
    /// packed rows of `format`. `staging_slot` names the upload buffer to use.
    fn upload_texture(
        &mut self,
        texture: TextureId,
        width: u32,
        height: u32,
        format: &TextureFormat,
        staging_slot: usize,
        data: &[u8],
    ) -> Result<()>;

    fn set_texture_filter(&mut self, texture: TextureId, filter: Filter) -> Result<()>;

    fn delete_texture(&mut self, texture: TextureId);

    // --- Shaders ---

    /// Compile one stage. The error carries the compiler log.
    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderId>;

    /// Link a vertex and fragment stage. The error carries the link log.
    fn link_program(&mut self, vertex: ShaderId, fragment: ShaderId) -> Result<ProgramId>;

    fn detach_shader(&mut self, program: ProgramId, shader: ShaderId);

    fn delete_shader(&mut self, shader: ShaderId);

    fn delete_program(&mut self, program: ProgramId);

    /// Bind a program, or the fixed-function path with `None`.
    fn use_program(&mut self, program: Option<ProgramId>);

    /// Set a uniform by name on `program`. Unknown names are ignored.
    fn set_uniform(&mut self, program: ProgramId, name: &str, value: UniformValue);

    // --- Drawing ---

    fn clear(&mut self, color: [f32; 4]);

    fn set_transform(&mut self, transform: Affine2);

    fn draw_textured_quad(&mut self, texture: TextureId, rect: Rect, uv: Rect);

    /// Translucent untextured fill, drawn without the bound program.
    fn fill_rect(&mut self, rect: Rect, color: Color);

    fn stroke_rect(&mut self, rect: Rect, style: LineStyle, blend: BlendMode, color: Color);

    fn draw_line(&mut self, from: (f32, f32), to: (f32, f32), color: Color);

    fn draw_text(&mut self, x: f32, y: f32, text: &str, color: Color);
}
