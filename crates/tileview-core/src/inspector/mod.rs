//! Pixel inspector: magnified closeup of the pixels under the pointer and a
//! per-channel statistics table.

pub mod layout;
pub mod stats;
pub mod table;

use std::fmt::Display;

use tracing::warn;

use self::layout::{corner_segments, markers, place_closeup, CloseupLayout, Corner};
use self::stats::{native_pixel, region_stats, Sample};
use self::table::{column_widths, format_float, truncate_name};
use crate::backend::{Color, Rect, RenderBackend};
use crate::consts::{
    CLOSEUP_WINDOW_SIZE, CORNER_MARKER_SIZE, MAX_CHANNEL_NAME_LENGTH, TEXT_LINE_HEIGHT,
};
use crate::error::Result;
use crate::render::settings::{FrameContext, ViewerSettings};
use crate::shader::{ColorPath, ShaderPipeline};
use crate::source::{BaseType, ImageSource, ImageSpec, Roi};
use crate::texture::TileCache;
use crate::transform::{Affine2, ViewState};

pub const CENTER_COLOR: Color = Color::rgba(0, 255, 255, 125);
pub const AVERAGE_COLOR: Color = Color::rgba(255, 255, 0, 125);
const TEXT_ALPHA: u8 = 200;
const NORMAL_TEXT_COLOR: Color = Color::rgb(200, 200, 200);
const BACKDROP_COLOR: Color = Color::rgba(26, 26, 26, 179);
const EMPTY_CLOSEUP_COLOR: Color = Color::rgb(26, 26, 26);

/// The block of stored-image pixels shown in the magnifier, relative to the
/// data window origin. All zero when the pointer is off the image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CloseupRegion {
    pub xbegin: i32,
    pub xend: i32,
    pub ybegin: i32,
    pub yend: i32,
}

impl CloseupRegion {
    /// `n` x `n` block around `pixel`, held inside a `width` x `height` data
    /// window. Smaller images yield the whole image.
    pub fn around(pixel: (i32, i32), n: u32, width: i32, height: i32) -> Self {
        let half = (n / 2) as i32;
        let axis = |p: i32, extent: i32| {
            let (lo, hi) = (half, extent - half - 1);
            let centre = if p >= lo { p.min(hi) } else { lo };
            ((centre - half).max(0), (centre + half + 1).min(extent))
        };
        let (xbegin, xend) = axis(pixel.0, width);
        let (ybegin, yend) = axis(pixel.1, height);
        Self {
            xbegin,
            xend,
            ybegin,
            yend,
        }
    }

    /// False only for the empty region of an off-image pointer.
    pub fn is_inside_data_window(&self) -> bool {
        self.ybegin > 0 || self.yend > 0 || self.xbegin > 0 || self.xend > 0
    }

    pub fn width(&self) -> i32 {
        self.xend - self.xbegin
    }

    pub fn height(&self) -> i32 {
        self.yend - self.ybegin
    }

    /// The region in absolute stored-image coordinates, shrunk by `inset` on
    /// every side.
    pub fn to_roi(&self, spec: &ImageSpec, inset: i32) -> Roi {
        Roi::new(
            spec.x + self.xbegin + inset,
            spec.x + self.xend - inset,
            spec.y + self.ybegin + inset,
            spec.y + self.yend - inset,
        )
    }
}

/// Formatted statistics of one channel.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StatsRow {
    pub name: String,
    pub center: String,
    /// Empty for float formats.
    pub normalized: String,
    pub min: String,
    pub max: String,
    pub avg: String,
}

impl StatsRow {
    fn cells(&self) -> Vec<&str> {
        vec![
            self.name.as_str(),
            self.center.as_str(),
            self.normalized.as_str(),
            self.min.as_str(),
            self.max.as_str(),
            self.avg.as_str(),
        ]
    }

    pub fn color(&self) -> Color {
        match self.name.chars().next() {
            Some('R') => Color::rgb(250, 94, 143),
            Some('G') => Color::rgb(135, 203, 124),
            Some('B') => Color::rgb(107, 188, 255),
            _ => NORMAL_TEXT_COLOR,
        }
    }
}

/// One text run of the statistics block. Runs sharing a `line` overlap.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextLine {
    pub line: usize,
    pub text: String,
    pub color: Color,
}

/// What the inspector showed in a frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InspectorReport {
    /// Stored-image pixel under the pointer, relative to the data window.
    pub pixel: (i32, i32),
    pub inside_image: bool,
    pub region: CloseupRegion,
    pub rows: Vec<StatsRow>,
    pub lines: Vec<TextLine>,
}

/// Per-channel rows for the stats table.
///
/// `pixel` is relative to the data window; statistics cover `region` shrunk
/// to the averaging window.
pub fn channel_rows(
    image: &dyn ImageSource,
    settings: &ViewerSettings,
    pixel: (i32, i32),
    region: CloseupRegion,
) -> Result<Vec<StatsRow>> {
    let spec = image.spec();
    let avg_pixels = settings.closeup_avg_pixels.min(settings.closeup_pixels);
    let inset = ((settings.closeup_pixels - avg_pixels) / 2) as i32;
    let avg_roi = region.to_roi(spec, inset);
    let inside = region.is_inside_data_window();
    let (px, py) = (pixel.0 + spec.x, pixel.1 + spec.y);

    let mut fpixel = vec![0.0f32; spec.nchannels];
    image.get_pixel(px, py, &mut fpixel);

    match spec.format {
        BaseType::U8 => integer_rows::<u8>(image, avg_roi, inside, (px, py), &fpixel, 3, 5),
        BaseType::U16 => integer_rows::<u16>(image, avg_roi, inside, (px, py), &fpixel, 5, 2),
        _ => {
            let stats = region_stats::<f32>(image, avg_roi, spec.nchannels, inside)?;
            Ok(stats
                .iter()
                .enumerate()
                .map(|(c, s)| StatsRow {
                    name: truncate_name(spec.channel_name(c)),
                    center: format_float(fpixel[c]),
                    normalized: String::new(),
                    min: format_float(s.min),
                    max: format_float(s.max),
                    avg: format_float(s.avg),
                })
                .collect())
        }
    }
}

fn integer_rows<T: Sample + Display>(
    image: &dyn ImageSource,
    avg_roi: Roi,
    inside: bool,
    pixel: (i32, i32),
    fpixel: &[f32],
    width: usize,
    gap: usize,
) -> Result<Vec<StatsRow>> {
    let spec = image.spec();
    let stats = region_stats::<T>(image, avg_roi, spec.nchannels, inside)?;
    let center = native_pixel::<T>(image, pixel.0, pixel.1)?;
    let spaces = " ".repeat(gap);
    Ok(stats
        .iter()
        .enumerate()
        .map(|(c, s)| StatsRow {
            name: truncate_name(spec.channel_name(c)),
            center: format!("{:<width$}", center[c]),
            normalized: format!("{:3.3}{spaces}", fpixel[c]),
            min: format!("{:<width$}", s.min),
            max: format!("{:<width$}", s.max),
            avg: format!("{:<width$}", s.avg),
        })
        .collect())
}

/// Lay the rows out as text: the pointer position, a two-colour column
/// header and one line per channel.
pub fn table_lines(rows: &[StatsRow], pixel: (i32, i32)) -> Vec<TextLine> {
    let center_text = CENTER_COLOR.with_alpha(TEXT_ALPHA);
    let average_text = AVERAGE_COLOR.with_alpha(TEXT_ALPHA);

    let matrix: Vec<Vec<&str>> = rows.iter().map(StatsRow::cells).collect();
    let widths = column_widths(&matrix);
    let width = |col: usize| widths.get(col).copied().unwrap_or(0);
    let (wn, wc, wnorm) = (width(0), width(1), width(2));
    let (wmin, wmax, wavg) = (width(3), width(4), width(5));

    let float_spaces = " ".repeat(MAX_CHANNEL_NAME_LENGTH.saturating_sub(wn));
    let (norm_header, empty_norm_header) = if wnorm > 0 {
        (format!("{:<wnorm$}  ", "Norm"), format!("{:<wnorm$}  ", "    "))
    } else {
        (float_spaces.clone(), float_spaces.clone())
    };

    let mut lines = vec![
        TextLine {
            line: 0,
            text: format!("              ({},{})", pixel.0, pixel.1),
            color: center_text,
        },
        TextLine {
            line: 1,
            text: format!(
                "{:<wn$}  {:<wc$}  {norm_header}{:<wmin$}  {:<wmax$}  {:<wavg$}  ",
                " ", "Val", "   ", "   ", "   "
            ),
            color: center_text,
        },
        TextLine {
            line: 1,
            text: format!(
                "{:<wn$}  {:<wc$}  {empty_norm_header}{:<wmin$}  {:<wmax$}  {:<wavg$}  ",
                " ", "   ", "Min", "Max", "Avg"
            ),
            color: average_text,
        },
    ];

    for (i, row) in rows.iter().enumerate() {
        let norm_col = if wnorm > 0 {
            format!("{:<wnorm$}  ", row.normalized)
        } else {
            float_spaces.clone()
        };
        lines.push(TextLine {
            line: i + 2,
            text: format!(
                "{:<wn$}: {:<wc$}  {norm_col}{:<wmin$}  {:<wmax$}  {:<wavg$}  ",
                row.name, row.center, row.min, row.max, row.avg
            ),
            color: row.color(),
        });
    }
    lines
}

/// Draws the magnifier and its statistics. Remembers which corner it is
/// docked to between frames.
#[derive(Debug, Default)]
pub struct Inspector {
    corner: Corner,
}

impl Inspector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn corner(&self) -> Corner {
        self.corner
    }

    /// Draw the inspector for a pointer at window position `mouse`.
    #[allow(clippy::too_many_arguments)]
    pub fn paint<B: RenderBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        cache: &mut TileCache,
        shader: &ShaderPipeline,
        image: &dyn ImageSource,
        view: &ViewState,
        ctx: &FrameContext,
        mouse: (i32, i32),
    ) -> InspectorReport {
        let spec = image.spec();
        let settings = &ctx.settings;
        let window = (ctx.window_width, ctx.window_height);
        let layout = place_closeup(
            mouse,
            window,
            spec.nchannels,
            settings.pixelview_follows_mouse,
            self.corner,
            settings.closeup_pixels,
        );

        let (ix, iy) = view.window_to_image(mouse.0, mouse.1);
        let display = (ix - spec.oriented_x(), iy - spec.oriented_y());
        let inside_image = display.0 >= 0
            && display.0 < spec.oriented_width()
            && display.1 >= 0
            && display.1 < spec.oriented_height();
        let (sx, sy) = spec.display_to_stored((ix as f32, iy as f32), true);
        let pixel = (sx as i32, sy as i32);
        let region = if inside_image {
            CloseupRegion::around(pixel, settings.closeup_pixels, spec.width, spec.height)
        } else {
            CloseupRegion::default()
        };

        let dpr = ctx.device_pixel_ratio;
        let window_space = Affine2::scale(dpr, dpr);
        backend.use_program(None);
        backend.set_transform(window_space);
        backend.fill_rect(layout.backdrop_rect(spec.nchannels), BACKDROP_COLOR);

        self.paint_closeup(backend, cache, shader, image, ctx, &layout, region);

        backend.use_program(None);
        backend.set_transform(window_space);

        let rows = channel_rows(image, settings, pixel, region).unwrap_or_else(|e| {
            warn!("Pixel statistics unavailable: {e}");
            Vec::new()
        });
        let lines = table_lines(&rows, pixel);
        let (tx, ty) = layout.text_origin;
        for line in &lines {
            backend.draw_text(tx, ty + line.line as f32 * TEXT_LINE_HEIGHT, &line.text, line.color);
        }

        if inside_image {
            let marks = markers(
                layout.marker_origin,
                settings.closeup_pixels,
                settings.closeup_avg_pixels,
                pixel,
                (spec.width, spec.height),
            );
            if let Some(average) = marks.average {
                for (from, to) in corner_segments(average, CORNER_MARKER_SIZE) {
                    backend.draw_line(from, to, AVERAGE_COLOR);
                }
            }
            for (from, to) in corner_segments(marks.center, CORNER_MARKER_SIZE) {
                backend.draw_line(from, to, CENTER_COLOR);
            }
        }

        if !settings.pixelview_follows_mouse {
            self.corner = self.corner.toggled_for(mouse, ctx.window_width, spec.nchannels);
        }

        InspectorReport {
            pixel,
            inside_image,
            region,
            rows,
            lines,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn paint_closeup<B: RenderBackend + ?Sized>(
        &self,
        backend: &mut B,
        cache: &mut TileCache,
        shader: &ShaderPipeline,
        image: &dyn ImageSource,
        ctx: &FrameContext,
        layout: &CloseupLayout,
        region: CloseupRegion,
    ) {
        let spec = image.spec();
        let dpr = ctx.device_pixel_ratio;
        let half = 0.5 * CLOSEUP_WINDOW_SIZE;
        let quad = Rect::new(-half, -half, half, half);
        backend.set_transform(
            spec.orientation
                .upright()
                .then(Affine2::translate(layout.center.0, layout.center.1))
                .then(Affine2::scale(dpr, dpr)),
        );

        let texture = if region.is_inside_data_window() {
            cache
                .upload_closeup(backend, image, region.to_roi(spec, 0))
                .unwrap_or_else(|e| {
                    warn!("Closeup upload failed: {e}");
                    None
                })
        } else {
            None
        };

        match texture {
            Some(texture) => {
                let side = cache.closeup_texture_size() as i32;
                match shader.path() {
                    ColorPath::Shader => {
                        shader.apply_uniforms(backend, image, ctx, side, side, true)
                    }
                    ColorPath::FixedFunction => backend.use_program(None),
                }
                let side = side as f32;
                let uv = Rect::new(
                    0.0,
                    0.0,
                    region.width() as f32 / side,
                    region.height() as f32 / side,
                );
                backend.draw_textured_quad(texture, quad, uv);
            }
            None => {
                backend.use_program(None);
                backend.fill_rect(quad, EMPTY_CLOSEUP_COLOR);
            }
        }
    }
}
