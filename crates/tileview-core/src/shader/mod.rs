//! Colour-remapping shader program and its lifecycle.

pub mod source;
pub mod validate;

use tracing::{debug, error, warn};

use crate::backend::{ProgramId, RenderBackend, ShaderId, ShaderStage, UniformValue};
use crate::render::settings::FrameContext;
use crate::source::ImageSource;

pub use source::DEFAULT_COLOR_FUNCTION;

/// Lifecycle of the shader program. `Failed` is terminal for the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineState {
    Uncompiled,
    Compiled,
    Linked,
    Failed,
}

/// Which of the two colour paths draws the image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorPath {
    /// Colour modes, exposure and gamma applied by the fragment program.
    Shader,
    /// Textures drawn as-is with a nearest/linear filter.
    FixedFunction,
}

impl std::fmt::Display for ColorPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColorPath::Shader => write!(f, "shader"),
            ColorPath::FixedFunction => write!(f, "fixed-function"),
        }
    }
}

/// Owns the vertex stage, the linked program and the colour-function text it
/// was built from.
#[derive(Debug)]
pub struct ShaderPipeline {
    supported: bool,
    state: PipelineState,
    vertex: Option<ShaderId>,
    program: Option<ProgramId>,
    linked_color_function: Option<String>,
}

impl ShaderPipeline {
    pub fn new(supported: bool) -> Self {
        Self {
            supported,
            state: PipelineState::Uncompiled,
            vertex: None,
            program: None,
            linked_color_function: None,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn program(&self) -> Option<ProgramId> {
        self.program
    }

    pub fn path(&self) -> ColorPath {
        if self.supported && self.state != PipelineState::Failed {
            ColorPath::Shader
        } else {
            ColorPath::FixedFunction
        }
    }

    /// Make sure a program built from `color_function` is linked. A different
    /// colour function tears down the current program first. Any compile or
    /// link failure moves the pipeline to `Failed` for good.
    pub fn build<B: RenderBackend + ?Sized>(&mut self, backend: &mut B, color_function: &str) {
        if !self.supported || self.state == PipelineState::Failed {
            return;
        }

        if self.linked_color_function.as_deref() != Some(color_function) {
            if let Some(program) = self.program.take() {
                debug!("Colour function changed, rebuilding shader program");
                if let Some(vertex) = self.vertex {
                    backend.detach_shader(program, vertex);
                }
                backend.use_program(None);
                backend.delete_program(program);
                self.linked_color_function = None;
                self.state = if self.vertex.is_some() {
                    PipelineState::Compiled
                } else {
                    PipelineState::Uncompiled
                };
            }
        }

        if self.state == PipelineState::Linked {
            return;
        }

        let vertex = match self.vertex {
            Some(vertex) => vertex,
            None => match backend.compile_shader(ShaderStage::Vertex, source::VERTEX_SOURCE) {
                Ok(vertex) => {
                    self.vertex = Some(vertex);
                    vertex
                }
                Err(e) => {
                    error!("Vertex shader failed to compile: {e}");
                    self.abort(backend, None);
                    return;
                }
            },
        };

        let fragment_source = source::fragment_source(color_function);
        let fragment = match backend.compile_shader(ShaderStage::Fragment, &fragment_source) {
            Ok(fragment) => fragment,
            Err(e) => {
                error!("Fragment shader failed to compile: {e}");
                self.abort(backend, None);
                return;
            }
        };
        self.state = PipelineState::Compiled;

        match backend.link_program(vertex, fragment) {
            Ok(program) => {
                backend.detach_shader(program, fragment);
                backend.delete_shader(fragment);
                self.program = Some(program);
                self.linked_color_function = Some(color_function.to_string());
                self.state = PipelineState::Linked;
                debug!("Shader program linked");
            }
            Err(e) => {
                error!("Shader program failed to link: {e}");
                self.abort(backend, Some(fragment));
            }
        }
    }

    fn abort<B: RenderBackend + ?Sized>(&mut self, backend: &mut B, fragment: Option<ShaderId>) {
        backend.use_program(None);
        if let Some(program) = self.program.take() {
            backend.delete_program(program);
        }
        if let Some(vertex) = self.vertex.take() {
            backend.delete_shader(vertex);
        }
        if let Some(fragment) = fragment {
            backend.delete_shader(fragment);
        }
        self.linked_color_function = None;
        self.state = PipelineState::Failed;
        warn!("Shaders disabled for this session, using the fixed-function path");
    }

    /// Bind the program and set every uniform for drawing a texture of
    /// `tex_width` x `tex_height`. When the current channel is past the last
    /// image channel only `startchannel = -1` is set.
    pub fn apply_uniforms<B: RenderBackend + ?Sized>(
        &self,
        backend: &mut B,
        image: &dyn ImageSource,
        ctx: &FrameContext,
        tex_width: i32,
        tex_height: i32,
        pixelview: bool,
    ) {
        let Some(program) = self.program else {
            return;
        };
        backend.use_program(Some(program));

        let spec = image.spec();
        let settings = &ctx.settings;
        if settings.current_channel >= spec.nchannels {
            backend.set_uniform(program, "startchannel", UniformValue::Int(-1));
            return;
        }
        // Only channels from the current one onwards are uploaded.
        backend.set_uniform(program, "startchannel", UniformValue::Int(0));
        backend.set_uniform(program, "imgtex", UniformValue::Int(0));
        backend.set_uniform(program, "gain", UniformValue::Float(2f32.powf(image.exposure())));
        backend.set_uniform(program, "gamma", UniformValue::Float(image.gamma()));
        backend.set_uniform(program, "colormode", UniformValue::Int(settings.color_mode.index()));
        backend.set_uniform(program, "imgchannels", UniformValue::Int(spec.nchannels as i32));
        backend.set_uniform(program, "pixelview", UniformValue::Int(pixelview as i32));
        backend.set_uniform(
            program,
            "linearinterp",
            UniformValue::Int(settings.linear_interpolation as i32),
        );
        backend.set_uniform(program, "width", UniformValue::Int(tex_width));
        backend.set_uniform(program, "height", UniformValue::Int(tex_height));
    }
}
