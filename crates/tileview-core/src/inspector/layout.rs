//! Where the magnifier, its text block and the pixel markers go on screen.
//!
//! All positions are window pixels, origin top-left, y down.

use crate::backend::Rect;
use crate::consts::{
    CLOSEUP_WINDOW_SIZE, CORNER_MARGIN, FOLLOW_MOUSE_OFFSET, STATUS_BAR_HEIGHT, TEXT_LINE_HEIGHT,
};

/// Height of the statistics block: two header lines plus one per channel.
pub fn total_text_height(nchannels: usize) -> f32 {
    (nchannels as f32 + 2.0) * TEXT_LINE_HEIGHT + 4.0
}

/// Magnifier placement for one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CloseupLayout {
    /// Centre of the magnifier square.
    pub center: (f32, f32),
    /// Baseline origin of the first text line.
    pub text_origin: (f32, f32),
    /// Top-left of the centre-pixel marker before edge corrections.
    pub marker_origin: (f32, f32),
    pub on_left: bool,
    pub above: bool,
}

impl CloseupLayout {
    pub fn closeup_rect(&self) -> Rect {
        let half = 0.5 * CLOSEUP_WINDOW_SIZE;
        Rect::new(
            self.center.0 - half,
            self.center.1 - half,
            self.center.0 + half,
            self.center.1 + half,
        )
    }

    /// Backdrop behind the magnifier and the text block.
    pub fn backdrop_rect(&self, nchannels: usize) -> Rect {
        let rect = self.closeup_rect();
        Rect::new(rect.x0, rect.y0, rect.x1, rect.y1 + total_text_height(nchannels))
    }
}

/// Docking state of the magnifier when it does not follow the pointer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Corner {
    #[default]
    UpperLeft,
    UpperRight,
}

impl Corner {
    /// The corner to use from the next frame on, flipping when the pointer
    /// would sit under the magnifier.
    pub fn toggled_for(self, mouse: (i32, i32), window_width: i32, nchannels: usize) -> Corner {
        let reach = CLOSEUP_WINDOW_SIZE + CORNER_MARGIN;
        let (mx, my) = (mouse.0 as f32, mouse.1 as f32);
        let below_text = my < reach + total_text_height(nchannels);
        match self {
            Corner::UpperLeft if mx < reach && below_text => Corner::UpperRight,
            Corner::UpperRight if mx > window_width as f32 - reach && below_text => {
                Corner::UpperLeft
            }
            other => other,
        }
    }
}

/// Place the magnifier for a pointer at `mouse` in a `window` sized viewport.
///
/// `closeup_pixels` source pixels span the magnifier; it sets the size of the
/// centre-pixel marker.
pub fn place_closeup(
    mouse: (i32, i32),
    window: (i32, i32),
    nchannels: usize,
    follow_mouse: bool,
    corner: Corner,
    closeup_pixels: u32,
) -> CloseupLayout {
    let size = CLOSEUP_WINDOW_SIZE;
    let half = 0.5 * size;
    let follow = FOLLOW_MOUSE_OFFSET;
    let text_height = total_text_height(nchannels);
    let (mx, my) = (mouse.0 as f32, mouse.1 as f32);
    let (w, h) = (window.0 as f32, window.1 as f32);

    let pixel_size = size / closeup_pixels.max(1) as f32 - 1.0;
    let marker_offset = half - pixel_size / 2.0 + CORNER_MARGIN;

    if follow_mouse {
        let on_left = mx + size + follow > w;
        let above = my + size + follow + text_height + STATUS_BAR_HEIGHT > h;
        let dx = if on_left { size + 2.0 * follow } else { 0.0 };
        let dy = if above { size + text_height + 2.0 * follow + 8.0 } else { 0.0 };
        return CloseupLayout {
            center: (mx + half + 4.0 + follow - dx, my + half + 4.0 + follow - dy),
            text_origin: (mx + 8.0 + follow - dx, my + size + TEXT_LINE_HEIGHT + follow - dy),
            marker_origin: (mx + marker_offset + follow - dx, my + marker_offset + follow - dy),
            on_left,
            above,
        };
    }

    match corner {
        Corner::UpperLeft => CloseupLayout {
            center: (half + CORNER_MARGIN, half + CORNER_MARGIN),
            text_origin: (9.0, size + TEXT_LINE_HEIGHT),
            marker_origin: (marker_offset + 1.0, marker_offset + 1.0),
            on_left: true,
            above: false,
        },
        Corner::UpperRight => CloseupLayout {
            center: (w - half - CORNER_MARGIN, half + CORNER_MARGIN),
            text_origin: (w - size - 1.0, size + TEXT_LINE_HEIGHT),
            marker_origin: (w - marker_offset - pixel_size, marker_offset + 1.0),
            on_left: false,
            above: false,
        },
    }
}

/// Marker rectangles around the centre pixel and the averaging window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Markers {
    pub center: Rect,
    pub average: Option<Rect>,
}

/// Compute the marker rectangles.
///
/// `pixel` is the stored-image pixel under the pointer relative to the data
/// window, `extent` the data window size. Near an image edge the magnified
/// block stops following the pointer, so the centre marker shifts towards
/// that edge. The averaging marker stays centred.
pub fn markers(
    origin: (f32, f32),
    closeup_pixels: u32,
    closeup_avg_pixels: u32,
    pixel: (i32, i32),
    extent: (i32, i32),
) -> Markers {
    let n = closeup_pixels.max(1);
    let cell = CLOSEUP_WINDOW_SIZE / n as f32;
    let pixel_size = cell - 1.0;
    let (mut x1, mut y1) = origin;

    let avg_offset = (n - closeup_avg_pixels.min(n)) / 2;
    let average = (avg_offset > 0).then(|| {
        let reach = (n / 2 - avg_offset) as f32;
        Rect::new(
            x1 - reach * cell,
            y1 - reach * cell,
            x1 + (reach + 1.0) * cell,
            y1 + (reach + 1.0) * cell,
        )
    });

    let half = (n / 2) as f32;
    let (px, py) = (pixel.0 as f32, pixel.1 as f32);
    let to_right = (extent.0 - pixel.0) as f32;
    let to_bottom = (extent.1 - pixel.1) as f32;
    if to_right <= half {
        x1 += (half - to_right + 1.0) * cell + 1.0;
    }
    if to_bottom <= half {
        y1 += (half - to_bottom + 1.0) * cell + 1.0;
    }
    if px <= half {
        x1 -= (half - px) * cell + 1.0;
    }
    if py <= half {
        y1 -= (half - py) * cell + 1.0;
    }

    Markers {
        center: Rect::new(x1, y1, x1 + pixel_size, y1 + pixel_size),
        average,
    }
}

/// The eight short segments of an L-bracket at each corner of `rect`.
pub fn corner_segments(rect: Rect, size: f32) -> [((f32, f32), (f32, f32)); 8] {
    let Rect { x0, y0, x1, y1 } = rect;
    [
        ((x0, y0), (x0 + size, y0)),
        ((x0, y0), (x0, y0 + size)),
        ((x1 - size, y0), (x1, y0)),
        ((x1, y0), (x1, y0 + size)),
        ((x0, y1 - size), (x0, y1)),
        ((x0, y1), (x0 + size, y1)),
        ((x1 - size, y1), (x1, y1)),
        ((x1, y1 - size), (x1, y1)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_follow_mouse_mirrors_near_edges() {
        let layout = place_closeup((10, 10), (1000, 1000), 3, true, Corner::UpperLeft, 13);
        assert!(!layout.on_left && !layout.above);
        assert_eq!(layout.center, (10.0 + 128.0 + 4.0 + 15.0, 10.0 + 128.0 + 4.0 + 15.0));

        let layout = place_closeup((900, 900), (1000, 1000), 3, true, Corner::UpperLeft, 13);
        assert!(layout.on_left && layout.above);
        assert!(layout.closeup_rect().x1 <= 900.0);
    }

    #[test]
    fn test_corner_flips_when_pointer_is_underneath() {
        assert_eq!(Corner::UpperLeft.toggled_for((20, 20), 800, 4), Corner::UpperRight);
        assert_eq!(Corner::UpperLeft.toggled_for((400, 20), 800, 4), Corner::UpperLeft);
        assert_eq!(Corner::UpperRight.toggled_for((790, 20), 800, 4), Corner::UpperLeft);
        assert_eq!(Corner::UpperRight.toggled_for((790, 700), 800, 4), Corner::UpperRight);
    }

    #[test]
    fn test_center_marker_shifts_at_left_edge() {
        let interior = markers((100.0, 100.0), 13, 11, (50, 50), (100, 100));
        let edge = markers((100.0, 100.0), 13, 11, (0, 50), (100, 100));
        assert!(edge.center.x0 < interior.center.x0);
        assert_eq!(edge.center.y0, interior.center.y0);
        assert_eq!(edge.average, interior.average);
    }

    #[test]
    fn test_no_average_marker_when_windows_match() {
        assert!(markers((0.0, 0.0), 13, 13, (50, 50), (100, 100)).average.is_none());
    }
}
