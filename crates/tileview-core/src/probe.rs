//! Area probe: min / max / mean of every channel over a dragged rectangle.

use std::fmt::Write as _;

use crate::backend::{Color, Rect, RenderBackend};
use crate::consts::CLOSEUP_WINDOW_SIZE;
use crate::render::settings::FrameContext;
use crate::source::{ImageSource, ImageSpec};
use crate::transform::{Affine2, ViewState};

const PANEL_COLOR: Color = Color::rgba(26, 26, 26, 128);
const TEXT_COLOR: Color = Color::rgb(255, 255, 255);
const STATUS_BAR_OFFSET: f32 = 35.0;
const LINE_SPACING: f32 = 15.0;

/// Float statistics of one channel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProbeStats {
    pub min: f32,
    pub max: f32,
    pub avg: f32,
}

/// Scan the inclusive box spanned by two stored-image pixels (relative to the
/// data window), one pixel read at a time. Corners are clamped to the image.
pub fn area_stats(image: &dyn ImageSource, a: (i32, i32), b: (i32, i32)) -> Vec<ProbeStats> {
    let spec = image.spec();
    let n = spec.nchannels;
    if spec.width <= 0 || spec.height <= 0 {
        return vec![
            ProbeStats {
                min: 0.0,
                max: 0.0,
                avg: 0.0
            };
            n
        ];
    }
    let cx = |x: i32| x.clamp(0, spec.width - 1);
    let cy = |y: i32| y.clamp(0, spec.height - 1);
    let (xmin, xmax) = (cx(a.0).min(cx(b.0)), cx(a.0).max(cx(b.0)));
    let (ymin, ymax) = (cy(a.1).min(cy(b.1)), cy(a.1).max(cy(b.1)));

    let mut mins = vec![f32::MAX; n];
    let mut maxs = vec![f32::MIN; n];
    let mut sums = vec![0.0f64; n];
    let mut count = 0usize;
    let mut pixel = vec![0.0f32; n];
    for y in ymin..=ymax {
        for x in xmin..=xmax {
            image.get_pixel(x + spec.x, y + spec.y, &mut pixel);
            for c in 0..n {
                mins[c] = mins[c].min(pixel[c]);
                maxs[c] = maxs[c].max(pixel[c]);
                sums[c] += pixel[c] as f64;
            }
            count += 1;
        }
    }

    (0..n)
        .map(|c| ProbeStats {
            min: mins[c],
            max: maxs[c],
            avg: if count > 0 { (sums[c] / count as f64) as f32 } else { 0.0 },
        })
        .collect()
}

/// Text shown before any selection has been made.
pub fn placeholder_text(spec: &ImageSpec) -> String {
    let mut text = String::from("Area Probe:\n");
    for c in 0..spec.nchannels {
        let _ = writeln!(
            text,
            "{}:   [min:  -----, max:  -----, avg:  -----]",
            spec.channel_name(c)
        );
    }
    text
}

pub fn format_stats(spec: &ImageSpec, stats: &[ProbeStats]) -> String {
    let mut text = String::from("Area Probe:\n");
    for (c, s) in stats.iter().enumerate() {
        let _ = writeln!(
            text,
            "{:<5}: [min: {:6.3}  max: {:6.3}  avg: {:6.3}]",
            spec.channel_name(c),
            s.min,
            s.max,
            s.avg
        );
    }
    text
}

/// Holds the probe text between frames.
#[derive(Debug, Default)]
pub struct AreaProbe {
    text: String,
}

impl AreaProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }

    /// Recompute the text for a selection between two window positions.
    pub fn update(
        &mut self,
        image: &dyn ImageSource,
        view: &ViewState,
        start: (i32, i32),
        end: (i32, i32),
    ) {
        let spec = image.spec();
        let to_stored = |(wx, wy): (i32, i32)| {
            let (ix, iy) = view.window_to_image(wx, wy);
            let (x, y) = spec.display_to_stored((ix as f32, iy as f32), true);
            (x as i32, y as i32)
        };
        let stats = area_stats(image, to_stored(start), to_stored(end));
        self.text = format_stats(spec, &stats);
    }

    /// Draw the probe panel in the lower-left corner.
    pub fn paint<B: RenderBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        spec: &ImageSpec,
        ctx: &FrameContext,
    ) {
        if self.text.is_empty() {
            self.text = placeholder_text(spec);
        }

        let h = ctx.window_height as f32;
        let nch = spec.nchannels as f32;
        let panel_width = CLOSEUP_WINDOW_SIZE * 1.3;
        let panel_height = CLOSEUP_WINDOW_SIZE * 0.06 * (nch + 1.0);
        let extra = 10.0 * (1.0 + nch) + 4.0;
        let bottom = h - STATUS_BAR_OFFSET;

        backend.use_program(None);
        backend.set_transform(Affine2::scale(ctx.device_pixel_ratio, ctx.device_pixel_ratio));
        backend.fill_rect(
            Rect::new(3.0, bottom - panel_height - 12.0, panel_width + 7.0, bottom + extra),
            PANEL_COLOR,
        );

        let mut y = h - panel_height - 30.0;
        for line in self.text.lines() {
            backend.draw_text(9.0, y, line, TEXT_COLOR);
            y += LINE_SPACING;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::BaseType;

    #[test]
    fn test_placeholder_lists_every_channel() {
        let spec = ImageSpec::new(4, 4, 3, BaseType::U8);
        let text = placeholder_text(&spec);
        assert_eq!(text.lines().count(), 4);
        assert_eq!(text.lines().nth(1), Some("R:   [min:  -----, max:  -----, avg:  -----]"));
    }

    #[test]
    fn test_format_pads_names_and_values() {
        let spec = ImageSpec::new(4, 4, 1, BaseType::F32);
        let text = format_stats(
            &spec,
            &[ProbeStats {
                min: 0.5,
                max: 1.0,
                avg: 0.75,
            }],
        );
        assert_eq!(text, "Area Probe:\nY    : [min:  0.500  max:  1.000  avg:  0.750]\n");
    }
}
