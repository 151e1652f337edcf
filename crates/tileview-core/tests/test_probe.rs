mod common;

use approx::assert_abs_diff_eq;
use tileview_core::backend::{DisplayListBackend, DrawCommand};
use tileview_core::probe::{area_stats, format_stats, placeholder_text};
use tileview_core::render::overlay::SELECTION_COLOR;
use tileview_core::render::{Modifiers, PointerButton};
use tileview_core::source::{ImageSource, MemoryImage};
use tileview_core::transform::Orientation;
use tileview_core::Viewer;

fn probing_viewer(image: MemoryImage) -> Viewer<DisplayListBackend> {
    let mut viewer = common::viewer_with(image, 200, 200);
    viewer.settings_mut().area_sample_mode = true;
    viewer.settings_mut().probeview = true;
    viewer
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

#[test]
fn test_uniform_image_stats() {
    let image = common::uniform_u8(10, 10, 3, 128);
    let stats = area_stats(&image, (2, 2), (7, 7));
    assert_eq!(stats.len(), 3);
    for s in stats {
        assert_abs_diff_eq!(s.min, 128.0 / 255.0);
        assert_abs_diff_eq!(s.max, 128.0 / 255.0);
        assert_abs_diff_eq!(s.avg, 128.0 / 255.0, epsilon = 1e-6);
    }
}

#[test]
fn test_reversed_and_out_of_range_corners_cover_image() {
    let image = common::ramp_u8(10, 10, 1);
    let stats = area_stats(&image, (20, 20), (-5, -5));
    assert_eq!(stats[0].min, 0.0);
    assert_abs_diff_eq!(stats[0].max, 99.0 / 255.0);
    assert_abs_diff_eq!(stats[0].avg, 49.5 / 255.0, epsilon = 1e-6);
}

#[test]
fn test_single_pixel_box_is_inclusive() {
    let image = common::ramp_u8(10, 10, 1);
    let stats = area_stats(&image, (3, 4), (3, 4));
    assert_abs_diff_eq!(stats[0].avg, 43.0 / 255.0);
}

#[test]
fn test_format_stats_line() {
    let image = common::uniform_u8(4, 4, 3, 128);
    let stats = area_stats(&image, (0, 0), (3, 3));
    let text = format_stats(image.spec(), &stats);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "Area Probe:");
    assert_eq!(lines[1], "R    : [min:  0.502  max:  0.502  avg:  0.502]");
    assert_eq!(lines.len(), 4);
}

#[test]
fn test_placeholder_has_dashes() {
    let image = common::uniform_u8(4, 4, 1, 0);
    let text = placeholder_text(image.spec());
    assert_eq!(text, "Area Probe:\nY:   [min:  -----, max:  -----, avg:  -----]\n");
}

// ---------------------------------------------------------------------------
// Through the viewer
// ---------------------------------------------------------------------------

#[test]
fn test_drag_selection_updates_probe() {
    let mut viewer = probing_viewer(common::uniform_u8(10, 10, 3, 128));

    viewer.on_pointer_down(95, 95, PointerButton::Left, Modifiers::NONE);
    viewer.on_pointer_move(105, 105, Modifiers::NONE);
    assert!(viewer.pointer().selecting);
    viewer.render();
    let selection = viewer.backend().commands().iter().find_map(|c| match c {
        DrawCommand::FillRect { rect, color } if *color == SELECTION_COLOR => Some(*rect),
        _ => None,
    });
    let rect = selection.unwrap();
    assert_eq!((rect.x0, rect.y0, rect.x1, rect.y1), (95.0, 95.0, 105.0, 105.0));

    viewer.on_pointer_up(105, 105, PointerButton::Left, Modifiers::NONE);
    assert!(!viewer.pointer().selecting);
    viewer.render();
    assert!(viewer
        .probe_text()
        .lines()
        .any(|l| l == "R    : [min:  0.502  max:  0.502  avg:  0.502]"));
}

#[test]
fn test_selection_moves_do_not_measure() {
    let mut viewer = probing_viewer(common::ramp_u8(10, 10, 1));
    viewer.render();
    let placeholder = viewer.probe_text().to_string();
    assert!(placeholder.contains("-----"));

    viewer.on_pointer_down(95, 95, PointerButton::Left, Modifiers::NONE);
    viewer.on_pointer_move(100, 100, Modifiers::NONE);
    viewer.render();
    assert_eq!(viewer.probe_text(), placeholder);
}

#[test]
fn test_placeholder_shown_after_first_frame() {
    let mut viewer = probing_viewer(common::uniform_u8(10, 10, 3, 0));
    assert!(viewer.probe_text().is_empty());
    viewer.render();
    assert!(viewer.probe_text().starts_with("Area Probe:\nR:"));
    assert!(viewer
        .backend()
        .commands()
        .iter()
        .any(|c| matches!(c, DrawCommand::Text { text, .. } if text == "Area Probe:")));
}

#[test]
fn test_binding_new_image_clears_probe() {
    let mut viewer = probing_viewer(common::uniform_u8(10, 10, 3, 128));
    viewer.on_pointer_down(95, 95, PointerButton::Left, Modifiers::NONE);
    viewer.on_pointer_up(105, 105, PointerButton::Left, Modifiers::NONE);
    assert!(!viewer.probe_text().is_empty());

    viewer.bind_image(Some(std::rc::Rc::new(common::uniform_u8(4, 4, 1, 0))));
    assert!(viewer.probe_text().is_empty());
}

#[test]
fn test_hidden_probe_clears_text() {
    let mut viewer = probing_viewer(common::uniform_u8(10, 10, 3, 128));
    viewer.render();
    viewer.settings_mut().probeview = false;
    viewer.render();
    assert!(viewer.probe_text().is_empty());
}

#[test]
fn test_click_selection_measures_inspected_pixel_with_offset_origin() {
    for orientation in Orientation::ALL {
        let image = common::ramp_u8(8, 8, 1)
            .with_origin(50, 20)
            .with_display_window(50, 20, 8, 8)
            .with_orientation(orientation);
        let mut viewer = probing_viewer(image);
        viewer.zoom_to(16.0, true);
        viewer.settings_mut().pixelview = true;

        viewer.on_pointer_down(100, 100, PointerButton::Left, Modifiers::NONE);
        viewer.on_pointer_up(100, 100, PointerButton::Left, Modifiers::NONE);
        let report = viewer.render().inspector.unwrap();

        let (px, py) = report.pixel;
        let v = (py * 8 + px) as f32 / 255.0;
        let expected = format!("Y    : [min: {v:6.3}  max: {v:6.3}  avg: {v:6.3}]");
        assert!(
            viewer.probe_text().lines().any(|l| l == expected),
            "{orientation:?}: {}",
            viewer.probe_text()
        );
    }
}
