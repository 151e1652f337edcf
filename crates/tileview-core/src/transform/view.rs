use super::affine::Affine2;
use crate::consts::{MAX_STEP_ZOOM, MIN_STEP_ZOOM};
use crate::source::ImageSpec;

/// Zoom, pan centre (display-space image pixels) and window size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewState {
    pub zoom: f32,
    pub center_x: f32,
    pub center_y: f32,
    pub window_width: i32,
    pub window_height: i32,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            center_x: 0.0,
            center_y: 0.0,
            window_width: 1,
            window_height: 1,
        }
    }
}

/// One tile-aligned cell of the visible rectangle, in stored-image pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TileCell {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    /// Fraction of the tile texture that holds valid data.
    pub smax: f32,
    pub tmax: f32,
}

/// The visible stored-image rectangle snapped outward to tile boundaries and
/// clipped to the data window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VisibleTiles {
    pub xbegin: i32,
    pub xend: i32,
    pub ybegin: i32,
    pub yend: i32,
    pub tile_width: i32,
    pub tile_height: i32,
}

impl VisibleTiles {
    /// Cells in raster order.
    pub fn cells(&self) -> Vec<TileCell> {
        let mut cells = Vec::new();
        if self.tile_width <= 0 || self.tile_height <= 0 {
            return cells;
        }
        let mut y = self.ybegin;
        while y < self.yend {
            let height = (self.yend - y).min(self.tile_height);
            let mut x = self.xbegin;
            while x < self.xend {
                let width = (self.xend - x).min(self.tile_width);
                cells.push(TileCell {
                    x,
                    y,
                    width,
                    height,
                    smax: width as f32 / self.tile_width as f32,
                    tmax: height as f32 / self.tile_height as f32,
                });
                x += self.tile_width;
            }
            y += self.tile_height;
        }
        cells
    }
}

impl ViewState {
    pub fn new(window_width: i32, window_height: i32) -> Self {
        Self {
            window_width,
            window_height,
            ..Self::default()
        }
    }

    fn window_size(&self) -> (f32, f32) {
        (self.window_width.max(1) as f32, self.window_height.max(1) as f32)
    }

    /// Left, top, right and bottom edges of the window in display space.
    pub fn visible_bounds(&self) -> (f32, f32, f32, f32) {
        let (w, h) = self.window_size();
        let half_w = 0.5 * w / self.zoom;
        let half_h = 0.5 * h / self.zoom;
        (
            self.center_x - half_w,
            self.center_y - half_h,
            self.center_x + half_w,
            self.center_y + half_h,
        )
    }

    /// Continuous display-space position under a window pixel, sampled at the
    /// pixel centre.
    pub fn window_to_image_f(&self, window_x: f32, window_y: f32) -> (f32, f32) {
        let (w, h) = self.window_size();
        let (left, top, right, bottom) = self.visible_bounds();
        let norm_x = (window_x + 0.5) / w;
        let norm_y = (window_y + 0.5) / h;
        (
            left + (right - left) * norm_x,
            top + (bottom - top) * norm_y,
        )
    }

    /// Display-space pixel index under a window pixel.
    pub fn window_to_image(&self, window_x: i32, window_y: i32) -> (i32, i32) {
        let (x, y) = self.window_to_image_f(window_x as f32, window_y as f32);
        (x.floor() as i32, y.floor() as i32)
    }

    /// Keep the view over the union of the data and display windows, or
    /// centre an axis on the display window when the zoomed content is
    /// narrower than the viewport.
    pub fn clamp_to_image(&mut self, spec: &ImageSpec) {
        let (w, h) = self.window_size();
        let zoomed_width = self.zoom * spec.oriented_full_width() as f32;
        let zoomed_height = self.zoom * spec.oriented_full_height() as f32;

        let xmin = spec.oriented_x().min(spec.oriented_full_x()) as f32;
        let xmax = (spec.oriented_x() + spec.oriented_width())
            .max(spec.oriented_full_x() + spec.oriented_full_width()) as f32;
        let ymin = spec.oriented_y().min(spec.oriented_full_y()) as f32;
        let ymax = (spec.oriented_y() + spec.oriented_height())
            .max(spec.oriented_full_y() + spec.oriented_full_height()) as f32;

        if zoomed_width >= w {
            let half = 0.5 * w / self.zoom;
            self.center_x = self.center_x.max(xmin + half).min(xmax - half);
        } else {
            self.center_x =
                spec.oriented_full_x() as f32 + spec.oriented_full_width() as f32 * 0.5;
        }

        if zoomed_height >= h {
            let half = 0.5 * h / self.zoom;
            self.center_y = self.center_y.max(ymin + half).min(ymax - half);
        } else {
            self.center_y =
                spec.oriented_full_y() as f32 + spec.oriented_full_height() as f32 * 0.5;
        }
    }

    /// The pan centre mapped into absolute stored-image space.
    pub fn stored_center(&self, spec: &ImageSpec) -> (f32, f32) {
        let (x, y) = spec.display_to_stored((self.center_x, self.center_y), false);
        (x + spec.x as f32, y + spec.y as f32)
    }

    /// Transform from absolute stored-image pixels to window pixels (origin
    /// top-left, y down).
    pub fn image_to_window(&self, spec: &ImageSpec) -> Affine2 {
        let (w, h) = self.window_size();
        let (cx, cy) = self.stored_center(spec);
        Affine2::translate(-cx, -cy)
            .then(spec.orientation.upright())
            .then(Affine2::scale(self.zoom, self.zoom))
            .then(Affine2::translate(w * 0.5, h * 0.5))
    }

    /// Visible rectangle in stored-image space, snapped to whole tiles.
    pub fn visible_tiles(
        &self,
        spec: &ImageSpec,
        tile_width: i32,
        tile_height: i32,
    ) -> VisibleTiles {
        let tile_width = tile_width.max(1);
        let tile_height = tile_height.max(1);
        let (w, h) = self.window_size();
        let mut half_x = (w / (2.0 * self.zoom)).ceil() as i32;
        let mut half_y = (h / (2.0 * self.zoom)).ceil() as i32;
        if spec.orientation.swaps_axes() {
            std::mem::swap(&mut half_x, &mut half_y);
        }

        let (cx, cy) = self.stored_center(spec);
        let (cx, cy) = (cx.floor() as i32, cy.floor() as i32);

        let xbegin = cx - half_x;
        let xbegin = spec.x.max(xbegin - xbegin % tile_width);
        let ybegin = cy - half_y;
        let ybegin = spec.y.max(ybegin - ybegin % tile_height);
        let xend = cx + half_x;
        let xend = (spec.x + spec.width).min(xend + tile_width - xend % tile_width);
        let yend = cy + half_y;
        let yend = (spec.y + spec.height).min(yend + tile_height - yend % tile_height);

        VisibleTiles {
            xbegin,
            xend,
            ybegin,
            yend,
            tile_width,
            tile_height,
        }
    }

    /// Change zoom while keeping the pixel under the cursor fixed.
    pub fn zoom_to_cursor(&mut self, new_zoom: f32, window_x: i32, window_y: i32) {
        let (xm, ym) = self.window_to_image(window_x, window_y);
        let (xm, ym) = (xm as f32, ym as f32);
        let ratio = new_zoom / self.zoom;
        self.center_x = xm + (self.center_x - xm) / ratio;
        self.center_y = ym + (self.center_y - ym) / ratio;
        self.zoom = new_zoom;
    }

    /// Largest zoom at which the whole oriented data window fits `w` x `h`.
    pub fn zoom_needed_to_fit(spec: &ImageSpec, w: i32, h: i32) -> f32 {
        let zw = w as f32 / spec.oriented_width().max(1) as f32;
        let zh = h as f32 / spec.oriented_height().max(1) as f32;
        zw.min(zh)
    }

    pub fn fit_to_window(&mut self, spec: &ImageSpec) {
        self.zoom = Self::zoom_needed_to_fit(spec, self.window_width, self.window_height);
    }

    /// Zoom 1, centred on the display window.
    pub fn normal_size(&mut self, spec: &ImageSpec) {
        self.center_x = spec.oriented_full_x() as f32 + 0.5 * spec.oriented_full_width() as f32;
        self.center_y = spec.oriented_full_y() as f32 + 0.5 * spec.oriented_full_height() as f32;
        self.zoom = 1.0;
    }
}

/// Next power of two strictly above `zoom`, or `None` at the step limit.
pub fn next_zoom_in(zoom: f32) -> Option<f32> {
    if zoom >= MAX_STEP_ZOOM {
        return None;
    }
    Some(2f32.powf(zoom.log2().floor() + 1.0).min(MAX_STEP_ZOOM))
}

/// Previous power of two strictly below `zoom`, or `None` at the step limit.
pub fn next_zoom_out(zoom: f32) -> Option<f32> {
    if zoom <= MIN_STEP_ZOOM {
        return None;
    }
    Some(2f32.powf(zoom.log2().ceil() - 1.0).max(MIN_STEP_ZOOM))
}

/// Whether showing `width` x `height` pixels at once needs more tiles than
/// the cache holds.
pub fn is_too_big(width: f32, height: f32, max_texture_size: u32, tile_count: usize) -> bool {
    let side = max_texture_size.max(1) as f32;
    let tiles = (width / side).ceil() * (height / side).ceil();
    tiles as usize > tile_count
}
