//! Backend that records draw calls instead of executing them.
//!
//! Textures keep their uploaded bytes and shaders are validated with naga,
//! so everything above the graphics API runs unchanged in headless hosts
//! and tests.

use std::collections::HashMap;

use tracing::debug;

use super::{
    BlendMode, Capabilities, Color, Filter, LineStyle, ProgramId, Rect, RenderBackend, ShaderId,
    ShaderStage, TextureId, UniformValue,
};
use crate::error::{Result, TileviewError};
use crate::shader::validate::{has_entry_point, validate_wgsl, EntryPoint};
use crate::texture::format::TextureFormat;
use crate::transform::Affine2;

/// One recorded backend call.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    Clear([f32; 4]),
    SetTransform(Affine2),
    UseProgram(Option<ProgramId>),
    SetUniform {
        program: ProgramId,
        name: String,
        value: UniformValue,
    },
    SetFilter {
        texture: TextureId,
        filter: Filter,
    },
    Upload {
        texture: TextureId,
        width: u32,
        height: u32,
        staging_slot: usize,
    },
    TexturedQuad {
        texture: TextureId,
        rect: Rect,
        uv: Rect,
    },
    FillRect {
        rect: Rect,
        color: Color,
    },
    StrokeRect {
        rect: Rect,
        style: LineStyle,
        blend: BlendMode,
        color: Color,
    },
    Line {
        from: (f32, f32),
        to: (f32, f32),
        color: Color,
    },
    Text {
        x: f32,
        y: f32,
        text: String,
        color: Color,
    },
}

/// State of one texture object.
#[derive(Clone, Debug)]
pub struct TextureRecord {
    pub width: u32,
    pub height: u32,
    pub format: Option<TextureFormat>,
    pub filter: Filter,
    /// Bytes of the last upload.
    pub data: Vec<u8>,
}

#[derive(Clone, Debug)]
struct ShaderRecord {
    stage: ShaderStage,
    entry_points: Vec<EntryPoint>,
}

#[derive(Clone, Debug)]
struct ProgramRecord {
    attached: Vec<ShaderId>,
}

/// Recording backend with configurable capabilities.
#[derive(Debug)]
pub struct DisplayListBackend {
    caps: Capabilities,
    commands: Vec<DrawCommand>,
    textures: HashMap<TextureId, TextureRecord>,
    shaders: HashMap<ShaderId, ShaderRecord>,
    programs: HashMap<ProgramId, ProgramRecord>,
    current_program: Option<ProgramId>,
    next_id: u32,
    uploads: usize,
    uniform_sets: usize,
}

impl Default for DisplayListBackend {
    fn default() -> Self {
        Self::new(Capabilities::default())
    }
}

impl DisplayListBackend {
    pub fn new(caps: Capabilities) -> Self {
        Self {
            caps,
            commands: Vec::new(),
            textures: HashMap::new(),
            shaders: HashMap::new(),
            programs: HashMap::new(),
            current_program: None,
            next_id: 1,
            uploads: 0,
            uniform_sets: 0,
        }
    }

    /// Commands recorded since the last [`DisplayListBackend::take_commands`].
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn texture(&self, texture: TextureId) -> Option<&TextureRecord> {
        self.textures.get(&texture)
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    pub fn program_count(&self) -> usize {
        self.programs.len()
    }

    pub fn shader_count(&self) -> usize {
        self.shaders.len()
    }

    pub fn current_program(&self) -> Option<ProgramId> {
        self.current_program
    }

    /// Total texture uploads since creation.
    pub fn upload_count(&self) -> usize {
        self.uploads
    }

    /// Total uniform sets since creation.
    pub fn uniform_set_count(&self) -> usize {
        self.uniform_sets
    }

    fn next_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn texture_mut(&mut self, texture: TextureId) -> Result<&mut TextureRecord> {
        self.textures
            .get_mut(&texture)
            .ok_or(TileviewError::UnknownTexture(texture.0))
    }
}

impl RenderBackend for DisplayListBackend {
    fn capabilities(&self) -> Capabilities {
        self.caps
    }

    fn create_texture(&mut self, filter: Filter) -> Result<TextureId> {
        let id = TextureId(self.next_id());
        self.textures.insert(
            id,
            TextureRecord {
                width: 1,
                height: 1,
                format: None,
                filter,
                data: Vec::new(),
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
        let max = self.caps.max_texture_size;
        if width > max || height > max {
            return Err(TileviewError::GpuError(format!(
                "texture {width}x{height} exceeds maximum dimension {max}"
            )));
        }
        let record = self.texture_mut(texture)?;
        record.width = width;
        record.height = height;
        record.format = Some(*format);
        record.data.clear();
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
        let needed = width as usize * height as usize * format.bytes_per_pixel();
        if data.len() < needed {
            return Err(TileviewError::BufferTooSmall {
                needed,
                actual: data.len(),
            });
        }
        let record = self.texture_mut(texture)?;
        if width > record.width || height > record.height {
            return Err(TileviewError::GpuError(format!(
                "upload {width}x{height} larger than texture {}x{}",
                record.width, record.height
            )));
        }
        record.data.clear();
        record.data.extend_from_slice(&data[..needed]);
        self.uploads += 1;
        self.commands.push(DrawCommand::Upload {
            texture,
            width,
            height,
            staging_slot,
        });
        Ok(())
    }

    fn set_texture_filter(&mut self, texture: TextureId, filter: Filter) -> Result<()> {
        self.texture_mut(texture)?.filter = filter;
        self.commands.push(DrawCommand::SetFilter { texture, filter });
        Ok(())
    }

    fn delete_texture(&mut self, texture: TextureId) {
        self.textures.remove(&texture);
    }

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderId> {
        if !self.caps.shaders {
            return Err(TileviewError::ShaderCompile {
                stage: stage.to_string(),
                log: "shaders are not supported by this context".to_string(),
            });
        }
        let entry_points = validate_wgsl(source).map_err(|log| TileviewError::ShaderCompile {
            stage: stage.to_string(),
            log,
        })?;
        let id = ShaderId(self.next_id());
        debug!("Compiled {stage} shader {}", id.0);
        self.shaders.insert(id, ShaderRecord { stage, entry_points });
        Ok(id)
    }

    fn link_program(&mut self, vertex: ShaderId, fragment: ShaderId) -> Result<ProgramId> {
        let vs = self.shaders.get(&vertex).ok_or_else(|| {
            TileviewError::ShaderLink(format!("unknown vertex shader {}", vertex.0))
        })?;
        if vs.stage != ShaderStage::Vertex
            || !has_entry_point(&vs.entry_points, "vs_main", naga::ShaderStage::Vertex)
        {
            return Err(TileviewError::ShaderLink(
                "vertex stage has no vs_main entry point".to_string(),
            ));
        }
        let fs = self.shaders.get(&fragment).ok_or_else(|| {
            TileviewError::ShaderLink(format!("unknown fragment shader {}", fragment.0))
        })?;
        if fs.stage != ShaderStage::Fragment
            || !has_entry_point(&fs.entry_points, "fs_main", naga::ShaderStage::Fragment)
        {
            return Err(TileviewError::ShaderLink(
                "fragment stage has no fs_main entry point".to_string(),
            ));
        }
        let id = ProgramId(self.next_id());
        self.programs.insert(
            id,
            ProgramRecord {
                attached: vec![vertex, fragment],
            },
        );
        Ok(id)
    }

    fn detach_shader(&mut self, program: ProgramId, shader: ShaderId) {
        if let Some(record) = self.programs.get_mut(&program) {
            record.attached.retain(|s| *s != shader);
        }
    }

    fn delete_shader(&mut self, shader: ShaderId) {
        let attached = self.programs.values().any(|p| p.attached.contains(&shader));
        if !attached {
            self.shaders.remove(&shader);
        }
    }

    fn delete_program(&mut self, program: ProgramId) {
        self.programs.remove(&program);
        if self.current_program == Some(program) {
            self.current_program = None;
        }
    }

    fn use_program(&mut self, program: Option<ProgramId>) {
        self.current_program = program;
        self.commands.push(DrawCommand::UseProgram(program));
    }

    fn set_uniform(&mut self, program: ProgramId, name: &str, value: UniformValue) {
        if !self.programs.contains_key(&program) {
            return;
        }
        self.uniform_sets += 1;
        self.commands.push(DrawCommand::SetUniform {
            program,
            name: name.to_string(),
            value,
        });
    }

    fn clear(&mut self, color: [f32; 4]) {
        self.commands.push(DrawCommand::Clear(color));
    }

    fn set_transform(&mut self, transform: Affine2) {
        self.commands.push(DrawCommand::SetTransform(transform));
    }

    fn draw_textured_quad(&mut self, texture: TextureId, rect: Rect, uv: Rect) {
        self.commands.push(DrawCommand::TexturedQuad { texture, rect, uv });
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.commands.push(DrawCommand::FillRect { rect, color });
    }

    fn stroke_rect(&mut self, rect: Rect, style: LineStyle, blend: BlendMode, color: Color) {
        self.commands.push(DrawCommand::StrokeRect {
            rect,
            style,
            blend,
            color,
        });
    }

    fn draw_line(&mut self, from: (f32, f32), to: (f32, f32), color: Color) {
        self.commands.push(DrawCommand::Line { from, to, color });
    }

    fn draw_text(&mut self, x: f32, y: f32, text: &str, color: Color) {
        self.commands.push(DrawCommand::Text {
            x,
            y,
            text: text.to_string(),
            color,
        });
    }
}
