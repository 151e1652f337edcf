mod common;

use std::rc::Rc;

use approx::assert_abs_diff_eq;
use tileview_core::backend::{
    BlendMode, Capabilities, DisplayListBackend, DrawCommand, Filter, LineStyle,
};
use tileview_core::render::{Modifiers, MouseMode, PointerButton, TileCacheConfig};
use tileview_core::source::{BaseType, ImageSource, ImageSpec, Roi};
use tileview_core::{TileviewError, Viewer, ViewerConfig};

/// Image whose bulk reads always fail.
struct FailingImage {
    spec: ImageSpec,
}

impl ImageSource for FailingImage {
    fn spec(&self) -> &ImageSpec {
        &self.spec
    }

    fn exposure(&self) -> f32 {
        0.0
    }

    fn gamma(&self) -> f32 {
        1.0
    }

    fn get_pixels(
        &self,
        roi: Roi,
        _format: BaseType,
        _out: &mut [u8],
    ) -> tileview_core::Result<()> {
        Err(TileviewError::RegionOutOfBounds {
            xbegin: roi.xbegin,
            xend: roi.xend,
            ybegin: roi.ybegin,
            yend: roi.yend,
        })
    }

    fn get_pixel(&self, _x: i32, _y: i32, out: &mut [f32]) {
        out.fill(0.0);
    }
}

fn big_viewer() -> Viewer<DisplayListBackend> {
    let mut viewer = common::viewer_with(common::ramp_u8(1000, 1000, 3), 200, 200);
    viewer.set_view(500.0, 500.0, 1.0, false);
    viewer
}

// ---------------------------------------------------------------------------
// Frames
// ---------------------------------------------------------------------------

#[test]
fn test_blank_frame_without_image() {
    let mut viewer = Viewer::new(DisplayListBackend::default(), &ViewerConfig::default());
    viewer.resize(200, 200, 1.0);
    let report = viewer.render();
    assert!(!report.image_drawn);
    assert_eq!(report.tiles_drawn, 0);
    assert!(viewer
        .backend()
        .commands()
        .iter()
        .any(|c| matches!(c, DrawCommand::Clear(_))));
    assert!(!viewer
        .backend()
        .commands()
        .iter()
        .any(|c| matches!(c, DrawCommand::TexturedQuad { .. })));
}

#[test]
fn test_small_image_draws_one_tile() {
    let mut viewer = common::viewer_with(common::ramp_u8(100, 100, 3), 200, 200);
    let report = viewer.render();
    assert!(report.image_drawn);
    assert_eq!((report.tiles_drawn, report.tiles_uploaded, report.tiles_skipped), (1, 1, 0));
    assert!(report.wait_cursor);
}

#[test]
fn test_second_frame_hits_cache() {
    let config = ViewerConfig {
        tiles: TileCacheConfig {
            texture_size_ceiling: 128,
            ..TileCacheConfig::default()
        },
        ..ViewerConfig::default()
    };
    let mut viewer = common::viewer_with_config(
        common::ramp_u8(200, 200, 3),
        400,
        400,
        &config,
        Capabilities::default(),
    );

    let first = viewer.render();
    assert_eq!((first.tiles_drawn, first.tiles_uploaded), (4, 4));
    let second = viewer.render();
    assert_eq!((second.tiles_drawn, second.tiles_uploaded), (4, 0));
    assert!(!second.wait_cursor);
}

#[test]
fn test_teardown_frees_textures_until_next_frame() {
    let mut viewer = common::viewer_with(common::ramp_u8(100, 100, 3), 200, 200);
    viewer.render();
    assert_eq!(viewer.backend().texture_count(), 5);

    viewer.teardown();
    assert_eq!(viewer.backend().texture_count(), 0);
    assert!(viewer.tile_cache().tiles().is_empty());

    let report = viewer.render();
    assert_eq!(viewer.backend().texture_count(), 5);
    assert_eq!((report.tiles_drawn, report.tiles_uploaded), (1, 1));
}

#[test]
fn test_failed_tile_is_skipped() {
    let image: Rc<dyn ImageSource> = Rc::new(FailingImage {
        spec: ImageSpec::new(16, 16, 3, BaseType::U8),
    });
    let mut viewer = Viewer::new(DisplayListBackend::default(), &ViewerConfig::default());
    viewer.resize(100, 100, 1.0);
    viewer.bind_image(Some(image));

    let report = viewer.render();
    assert_eq!((report.tiles_drawn, report.tiles_skipped), (0, 1));
    assert_eq!(report.tiles_uploaded, 0);
    assert!(!report.wait_cursor);
    assert_eq!(viewer.tile_cache().tiles()[0].width, 0);
}

#[test]
fn test_redraw_flag_is_consumed() {
    let mut viewer = common::viewer_with(common::ramp_u8(16, 16, 1), 100, 100);
    assert!(viewer.take_redraw_request());
    assert!(!viewer.take_redraw_request());
    viewer.settings_mut().window_guides = true;
    assert!(viewer.take_redraw_request());
}

#[test]
fn test_window_guides_are_inverting_outlines() {
    let mut viewer = common::viewer_with(common::ramp_u8(16, 16, 1), 100, 100);
    viewer.settings_mut().window_guides = true;
    viewer.render();

    let strokes: Vec<(LineStyle, BlendMode)> = viewer
        .backend()
        .commands()
        .iter()
        .filter_map(|c| match c {
            DrawCommand::StrokeRect { style, blend, .. } => Some((*style, *blend)),
            _ => None,
        })
        .collect();
    assert_eq!(
        strokes,
        vec![(LineStyle::Solid, BlendMode::Invert), (LineStyle::Dashed, BlendMode::Invert)]
    );
}

#[test]
fn test_fixed_function_filter_follows_interpolation() {
    let caps = Capabilities {
        shaders: false,
        ..Capabilities::default()
    };
    let config = ViewerConfig::default();
    let image = common::ramp_u8(16, 16, 3);
    let mut viewer = common::viewer_with_config(image, 100, 100, &config, caps);
    viewer.settings_mut().linear_interpolation = false;
    viewer.render();
    let filters: Vec<Filter> = viewer
        .backend()
        .commands()
        .iter()
        .filter_map(|c| match c {
            DrawCommand::SetFilter { filter, .. } => Some(*filter),
            _ => None,
        })
        .collect();
    assert_eq!(filters.len(), 4);
    assert!(filters.iter().all(|f| *f == Filter::Nearest));
}

// ---------------------------------------------------------------------------
// Pointer and wheel
// ---------------------------------------------------------------------------

#[test]
fn test_pan_drag_moves_centre_against_pointer() {
    let mut viewer = big_viewer();
    viewer.settings_mut().mouse_mode = MouseMode::Pan;
    viewer.on_pointer_down(100, 100, PointerButton::Left, Modifiers::NONE);
    viewer.on_pointer_move(110, 100, Modifiers::NONE);
    viewer.on_pointer_up(110, 100, PointerButton::Left, Modifiers::NONE);
    assert_eq!((viewer.view().center_x, viewer.view().center_y), (490.0, 500.0));
}

#[test]
fn test_alt_left_drag_pans_in_zoom_mode() {
    let mut viewer = big_viewer();
    viewer.on_pointer_down(100, 100, PointerButton::Left, Modifiers::ALT);
    viewer.on_pointer_move(100, 120, Modifiers::ALT);
    assert_eq!(viewer.view().center_y, 480.0);
    assert_eq!(viewer.view().zoom, 1.0);
}

#[test]
fn test_zoom_clicks_step_powers_of_two() {
    let mut viewer = big_viewer();
    viewer.on_pointer_down(100, 100, PointerButton::Left, Modifiers::NONE);
    assert_eq!(viewer.view().zoom, 2.0);

    let mut viewer = big_viewer();
    viewer.on_pointer_down(100, 100, PointerButton::Right, Modifiers::NONE);
    assert_eq!(viewer.view().zoom, 0.5);
}

#[test]
fn test_click_after_focus_loss_only_activates() {
    let mut viewer = big_viewer();
    viewer.focus_out();
    viewer.on_pointer_down(100, 100, PointerButton::Left, Modifiers::NONE);
    assert_eq!(viewer.view().zoom, 1.0);
    viewer.on_pointer_down(100, 100, PointerButton::Left, Modifiers::NONE);
    assert_eq!(viewer.view().zoom, 2.0);
}

#[test]
fn test_scroll_zooms_only_on_clear_vertical_motion() {
    let mut viewer = big_viewer();
    viewer.on_scroll(0.0, 1.0);
    assert_eq!(viewer.view().zoom, 1.0);
    viewer.on_scroll(10.0, 5.0);
    assert_eq!(viewer.view().zoom, 1.0);
    viewer.on_scroll(0.0, 5.0);
    assert_eq!(viewer.view().zoom, 2.0);
    viewer.on_scroll(0.0, -5.0);
    assert_eq!(viewer.view().zoom, 1.0);
}

#[test]
fn test_alt_right_drag_zooms_continuously() {
    let mut viewer = big_viewer();
    viewer.on_pointer_down(100, 100, PointerButton::Right, Modifiers::ALT);
    assert_eq!(viewer.view().zoom, 1.0);
    viewer.on_pointer_move(110, 110, Modifiers::ALT);
    assert_abs_diff_eq!(viewer.view().zoom, 1.1, epsilon = 1e-5);
}

#[test]
fn test_zoom_in_keeps_pixel_under_pointer() {
    let mut viewer = big_viewer();
    viewer.on_pointer_move(150, 100, Modifiers::NONE);
    let before = viewer.view().window_to_image(150, 100);
    viewer.zoom_in();
    assert_eq!(viewer.view().window_to_image(150, 100), before);
}
