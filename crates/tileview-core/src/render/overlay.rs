//! Overlays drawn on top of the image tiles.

use crate::backend::{BlendMode, Color, LineStyle, Rect, RenderBackend};
use crate::source::ImageSpec;

pub const SELECTION_COLOR: Color = Color::rgba(51, 128, 255, 77);
const GUIDE_COLOR: Color = Color::rgb(255, 255, 255);

/// Translucent fill between two window positions. Expects a window-space
/// transform.
pub fn paint_selection<B: RenderBackend + ?Sized>(
    backend: &mut B,
    start: (i32, i32),
    end: (i32, i32),
) {
    let rect = Rect::new(start.0 as f32, start.1 as f32, end.0 as f32, end.1 as f32).normalized();
    backend.use_program(None);
    backend.fill_rect(rect, SELECTION_COLOR);
}

/// Inverting outlines of the data window (solid) and the display window
/// (dashed). Expects the image-space transform.
pub fn paint_window_guides<B: RenderBackend + ?Sized>(backend: &mut B, spec: &ImageSpec) {
    backend.use_program(None);
    let data = Rect::from_size(spec.x as f32, spec.y as f32, spec.width as f32, spec.height as f32);
    backend.stroke_rect(data, LineStyle::Solid, BlendMode::Invert, GUIDE_COLOR);
    let display = Rect::from_size(
        spec.full_x as f32,
        spec.full_y as f32,
        spec.full_width as f32,
        spec.full_height as f32,
    );
    backend.stroke_rect(display, LineStyle::Dashed, BlendMode::Invert, GUIDE_COLOR);
}
