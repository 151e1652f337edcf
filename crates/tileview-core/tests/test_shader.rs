mod common;

use tileview_core::backend::{Capabilities, DisplayListBackend, DrawCommand, Filter, UniformValue};
use tileview_core::render::ColorMode;
use tileview_core::shader::{ColorPath, PipelineState, ShaderPipeline, DEFAULT_COLOR_FUNCTION};
use tileview_core::ViewerConfig;

const INVERT_COLOR_FUNCTION: &str = r"
fn color_func(c_in: vec4<f32>) -> vec4<f32> {
    return vec4<f32>(1.0 - c_in.xyz, c_in.w);
}
";

// Returns a vec3 where a vec4 is declared.
const BROKEN_COLOR_FUNCTION: &str = r"
fn color_func(c_in: vec4<f32>) -> vec4<f32> {
    return c_in.xyz;
}
";

fn uniform_value(commands: &[DrawCommand], wanted: &str) -> Option<UniformValue> {
    commands.iter().rev().find_map(|c| match c {
        DrawCommand::SetUniform { name, value, .. } if name == wanted => Some(*value),
        _ => None,
    })
}

// ---------------------------------------------------------------------------
// Pipeline lifecycle
// ---------------------------------------------------------------------------

#[test]
fn test_default_program_links() {
    let mut backend = DisplayListBackend::default();
    let mut pipeline = ShaderPipeline::new(true);
    assert_eq!(pipeline.state(), PipelineState::Uncompiled);

    pipeline.build(&mut backend, DEFAULT_COLOR_FUNCTION);
    assert_eq!(pipeline.state(), PipelineState::Linked);
    assert_eq!(pipeline.path(), ColorPath::Shader);
    assert!(pipeline.program().is_some());
    assert_eq!(backend.program_count(), 1);
}

#[test]
fn test_build_is_idempotent() {
    let mut backend = DisplayListBackend::default();
    let mut pipeline = ShaderPipeline::new(true);
    pipeline.build(&mut backend, DEFAULT_COLOR_FUNCTION);
    let program = pipeline.program();
    pipeline.build(&mut backend, DEFAULT_COLOR_FUNCTION);
    assert_eq!(pipeline.program(), program);
    assert_eq!(backend.program_count(), 1);
}

#[test]
fn test_new_color_function_replaces_program() {
    let mut backend = DisplayListBackend::default();
    let mut pipeline = ShaderPipeline::new(true);
    pipeline.build(&mut backend, DEFAULT_COLOR_FUNCTION);
    let old = pipeline.program();

    pipeline.build(&mut backend, INVERT_COLOR_FUNCTION);
    assert_eq!(pipeline.state(), PipelineState::Linked);
    assert_ne!(pipeline.program(), old);
    assert_eq!(backend.program_count(), 1);
}

#[test]
fn test_compile_failure_is_terminal() {
    let mut backend = DisplayListBackend::default();
    let mut pipeline = ShaderPipeline::new(true);
    pipeline.build(&mut backend, BROKEN_COLOR_FUNCTION);
    assert_eq!(pipeline.state(), PipelineState::Failed);
    assert_eq!(pipeline.path(), ColorPath::FixedFunction);
    assert!(pipeline.program().is_none());
    // The vertex stage compiled before the failure and is released.
    assert_eq!(backend.shader_count(), 0);
    assert_eq!(backend.program_count(), 0);

    pipeline.build(&mut backend, DEFAULT_COLOR_FUNCTION);
    assert_eq!(pipeline.state(), PipelineState::Failed);
    assert_eq!(backend.program_count(), 0);
}

#[test]
fn test_unsupported_context_never_compiles() {
    let mut backend = DisplayListBackend::new(Capabilities {
        shaders: false,
        ..Capabilities::default()
    });
    let mut pipeline = ShaderPipeline::new(false);
    pipeline.build(&mut backend, DEFAULT_COLOR_FUNCTION);
    assert_eq!(pipeline.state(), PipelineState::Uncompiled);
    assert_eq!(pipeline.path(), ColorPath::FixedFunction);
    assert_eq!(backend.shader_count(), 0);
}

// ---------------------------------------------------------------------------
// Through the viewer
// ---------------------------------------------------------------------------

#[test]
fn test_frame_sets_every_uniform() {
    let mut viewer = common::viewer_with(common::ramp_u8(64, 64, 3), 100, 100);
    let report = viewer.render();
    assert_eq!(report.color_path, ColorPath::Shader);

    let commands = viewer.backend_mut().take_commands();
    let names = common::uniform_names(&commands);
    for name in [
        "startchannel",
        "imgtex",
        "gain",
        "gamma",
        "colormode",
        "imgchannels",
        "pixelview",
        "linearinterp",
        "width",
        "height",
    ] {
        assert!(names.iter().any(|n| n == name), "missing uniform {name}");
    }
    assert_eq!(uniform_value(&commands, "gain"), Some(UniformValue::Float(1.0)));
    assert_eq!(uniform_value(&commands, "imgchannels"), Some(UniformValue::Int(3)));
    assert_eq!(uniform_value(&commands, "width"), Some(UniformValue::Int(64)));
    assert_eq!(uniform_value(&commands, "pixelview"), Some(UniformValue::Int(0)));
}

#[test]
fn test_exposure_sets_gain() {
    let image = common::ramp_u8(16, 16, 1);
    image.set_exposure(2.0);
    let mut viewer = common::viewer_with(image, 100, 100);
    viewer.render();
    let commands = viewer.backend_mut().take_commands();
    assert_eq!(uniform_value(&commands, "gain"), Some(UniformValue::Float(4.0)));
}

#[test]
fn test_channel_past_last_sets_sentinel_only() {
    let mut viewer = common::viewer_with(common::ramp_u8(16, 16, 3), 100, 100);
    viewer.settings_mut().current_channel = 5;
    let report = viewer.render();

    let commands = viewer.backend_mut().take_commands();
    assert_eq!(common::uniform_names(&commands), vec!["startchannel".to_string()]);
    assert_eq!(uniform_value(&commands, "startchannel"), Some(UniformValue::Int(-1)));
    assert_eq!(report.tiles_drawn, 0);
}

#[test]
fn test_single_channel_past_last_reads_no_pixels() {
    let mut viewer = common::viewer_with(common::ramp_u8(16, 16, 3), 100, 100);
    viewer.settings_mut().color_mode = ColorMode::SingleChannel;
    viewer.settings_mut().current_channel = 5;

    for _ in 0..3 {
        let report = viewer.render();
        assert_eq!((report.tiles_drawn, report.tiles_uploaded), (0, 0));
        assert!(!report.wait_cursor);
    }
    assert_eq!(viewer.tile_cache().fetch_count(), 0);
}

#[test]
fn test_failed_shader_falls_back_without_uniforms() {
    let mut viewer =
        tileview_core::Viewer::new(DisplayListBackend::default(), &ViewerConfig::default());
    viewer.set_color_function(BROKEN_COLOR_FUNCTION);
    viewer.resize(100, 100, 1.0);
    viewer.bind_image(Some(std::rc::Rc::new(common::ramp_u8(16, 16, 3))));
    viewer.settings_mut().linear_interpolation = false;

    let report = viewer.render();
    assert_eq!(viewer.shader_state(), PipelineState::Failed);
    assert_eq!(report.color_path, ColorPath::FixedFunction);
    assert_eq!(report.tiles_drawn, 1);
    assert_eq!(viewer.backend().uniform_set_count(), 0);
    assert!(viewer
        .backend()
        .commands()
        .iter()
        .any(|c| matches!(c, DrawCommand::SetFilter { filter: Filter::Nearest, .. })));

    // A valid colour function does not revive the program.
    viewer.set_color_function(DEFAULT_COLOR_FUNCTION);
    viewer.render();
    assert_eq!(viewer.shader_state(), PipelineState::Failed);
    assert_eq!(viewer.backend().uniform_set_count(), 0);
}

#[test]
fn test_fixed_function_uploads_every_channel() {
    let caps = Capabilities {
        shaders: false,
        ..Capabilities::default()
    };
    let config = ViewerConfig::default();
    let image = common::ramp_u8(16, 16, 4);
    let mut viewer = common::viewer_with_config(image, 100, 100, &config, caps);
    viewer.settings_mut().current_channel = 2;
    viewer.render();
    assert_eq!(viewer.tile_cache().channels().count, 4);
    assert_eq!(viewer.color_path(), ColorPath::FixedFunction);
}

#[test]
fn test_shader_path_uploads_displayed_channels_only() {
    let mut viewer = common::viewer_with(common::ramp_u8(16, 16, 4), 100, 100);
    viewer.settings_mut().current_channel = 1;
    viewer.settings_mut().color_mode = ColorMode::SingleChannel;
    viewer.render();
    let window = viewer.tile_cache().channels();
    assert_eq!((window.begin, window.count), (1, 1));
}
