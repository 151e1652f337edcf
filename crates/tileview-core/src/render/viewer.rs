use std::rc::Rc;

use tracing::{debug, info, warn};

use super::input::PointerState;
use super::overlay::{paint_selection, paint_window_guides};
use super::settings::{ColorMode, FrameContext, ViewerConfig, ViewerSettings};
use crate::backend::{Filter, Rect, RenderBackend};
use crate::consts::CLEAR_COLOR;
use crate::error::Result;
use crate::inspector::{Inspector, InspectorReport};
use crate::probe::AreaProbe;
use crate::shader::{ColorPath, PipelineState, ShaderPipeline, DEFAULT_COLOR_FUNCTION};
use crate::source::ImageSource;
use crate::texture::{displayed_channels, ChannelWindow, TileCache};
use crate::transform::{self, Affine2, ViewState};

/// What a call to [`Viewer::render`] drew.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameReport {
    /// False for the blank frame drawn without an image.
    pub image_drawn: bool,
    pub tiles_drawn: usize,
    /// Tiles that missed the cache and were fetched.
    pub tiles_uploaded: usize,
    /// Tiles left undrawn because loading failed or no format was usable.
    pub tiles_skipped: usize,
    pub color_path: ColorPath,
    /// Set when the frame had to wait on pixel fetches.
    pub wait_cursor: bool,
    pub inspector: Option<InspectorReport>,
}

impl FrameReport {
    fn blank(color_path: ColorPath) -> Self {
        Self {
            image_drawn: false,
            tiles_drawn: 0,
            tiles_uploaded: 0,
            tiles_skipped: 0,
            color_path,
            wait_cursor: false,
            inspector: None,
        }
    }
}

/// Inputs the tile format was last built from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct FormatKey {
    generation: u64,
    current_channel: usize,
    color_mode: ColorMode,
    path: ColorPath,
}

/// An image view over one graphics backend.
///
/// The host forwards surface and input callbacks, then calls
/// [`Viewer::render`] whenever [`Viewer::take_redraw_request`] reports a
/// pending redraw.
pub struct Viewer<B: RenderBackend> {
    pub(super) backend: B,
    pub(super) settings: ViewerSettings,
    pub(super) view: ViewState,
    cache: TileCache,
    shader: ShaderPipeline,
    color_function: String,
    pub(super) image: Option<Rc<dyn ImageSource>>,
    generation: u64,
    format_key: Option<FormatKey>,
    device_pixel_ratio: f32,
    redraw_requested: bool,
    initialized: bool,
    pub(super) pointer: PointerState,
    inspector: Inspector,
    pub(super) probe: AreaProbe,
}

impl<B: RenderBackend> Viewer<B> {
    pub fn new(backend: B, config: &ViewerConfig) -> Self {
        let supported = backend.capabilities().shaders;
        Self {
            backend,
            settings: config.settings.clone(),
            view: ViewState::default(),
            cache: TileCache::new(config.tiles),
            shader: ShaderPipeline::new(supported),
            color_function: DEFAULT_COLOR_FUNCTION.to_string(),
            image: None,
            generation: 0,
            format_key: None,
            device_pixel_ratio: 1.0,
            redraw_requested: false,
            initialized: false,
            pointer: PointerState::default(),
            inspector: Inspector::new(),
            probe: AreaProbe::new(),
        }
    }

    /// Allocate GPU resources and build the shader program. No-op once done.
    pub fn initialize(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }
        let caps = self.backend.capabilities();
        info!(
            "Backend capabilities: shaders={}, srgb={}, half_float={}, float={}, max texture {}",
            caps.shaders, caps.srgb, caps.half_float, caps.float, caps.max_texture_size
        );
        self.cache.ensure_tiles(&mut self.backend)?;
        self.shader.build(&mut self.backend, &self.color_function);
        info!("Colour path: {}", self.shader.path());
        self.initialized = true;
        Ok(())
    }

    /// Free the tile and closeup textures ahead of losing the graphics
    /// context. The next [`Viewer::render`] allocates them again.
    pub fn teardown(&mut self) {
        self.cache.release(&mut self.backend);
        self.format_key = None;
        self.initialized = false;
    }

    /// New surface size in logical pixels.
    pub fn resize(&mut self, width: i32, height: i32, device_pixel_ratio: f32) {
        self.view.window_width = width.max(1);
        self.view.window_height = height.max(1);
        self.device_pixel_ratio = if device_pixel_ratio > 0.0 { device_pixel_ratio } else { 1.0 };
        self.clamp_view();
        self.request_redraw();
    }

    /// Show `image`, or nothing with `None`. The view keeps its zoom and is
    /// clamped to the new image.
    pub fn bind_image(&mut self, image: Option<Rc<dyn ImageSource>>) {
        if let Some(image) = &image {
            let spec = image.spec();
            info!(
                "Bound {}x{} image, {} channels of {:?}, orientation {}",
                spec.width,
                spec.height,
                spec.nchannels,
                spec.format,
                spec.orientation.tag()
            );
        }
        self.image = image;
        self.generation += 1;
        self.format_key = None;
        self.probe.clear();
        self.clamp_view();
        self.request_redraw();
    }

    pub fn image(&self) -> Option<&Rc<dyn ImageSource>> {
        self.image.as_ref()
    }

    pub fn set_view(&mut self, center_x: f32, center_y: f32, zoom: f32, redraw: bool) {
        self.view.center_x = center_x;
        self.view.center_y = center_y;
        if zoom > 0.0 {
            self.view.zoom = zoom;
        }
        self.clamp_view();
        if redraw {
            self.request_redraw();
        }
    }

    pub fn zoom_to(&mut self, zoom: f32, redraw: bool) {
        self.set_view(self.view.center_x, self.view.center_y, zoom, redraw);
    }

    pub fn center_on(&mut self, x: f32, y: f32, redraw: bool) {
        self.set_view(x, y, self.view.zoom, redraw);
    }

    /// Move the pan centre by `(dx, dy)` image pixels.
    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.center_on(self.view.center_x + dx, self.view.center_y + dy, true);
    }

    /// Zoom to the next power of two, keeping the pixel under the pointer
    /// in place.
    pub fn zoom_in(&mut self) {
        if self.image.is_none() {
            return;
        }
        if let Some(zoom) = transform::next_zoom_in(self.view.zoom) {
            self.zoom_to_cursor(zoom);
        }
    }

    pub fn zoom_out(&mut self) {
        if self.image.is_none() {
            return;
        }
        if let Some(zoom) = transform::next_zoom_out(self.view.zoom) {
            self.zoom_to_cursor(zoom);
        }
    }

    fn zoom_to_cursor(&mut self, zoom: f32) {
        let (x, y) = self.pointer.position;
        self.view.zoom_to_cursor(zoom, x, y);
        self.clamp_view();
        self.request_redraw();
    }

    /// Largest zoom showing the whole image in a `width` x `height` window.
    pub fn zoom_needed_to_fit(&self, width: i32, height: i32) -> f32 {
        match &self.image {
            Some(image) => ViewState::zoom_needed_to_fit(image.spec(), width, height),
            None => 1.0,
        }
    }

    pub fn fit_to_window(&mut self) {
        let zoom = self.zoom_needed_to_fit(self.view.window_width, self.view.window_height);
        self.zoom_to(zoom, true);
    }

    /// Zoom 1, centred on the display window.
    pub fn normal_size(&mut self) {
        let Some(image) = self.image.clone() else {
            return;
        };
        self.view.normal_size(image.spec());
        self.clamp_view();
        self.request_redraw();
    }

    /// Whether `width` x `height` pixels need more tiles than the cache has.
    pub fn is_too_big(&self, width: f32, height: f32) -> bool {
        let tile_count = self.cache.tiles().len();
        transform::is_too_big(width, height, self.cache.max_texture_size(), tile_count)
    }

    pub fn settings(&self) -> &ViewerSettings {
        &self.settings
    }

    /// Mutable settings. Any change is shown on the next frame.
    pub fn settings_mut(&mut self) -> &mut ViewerSettings {
        self.request_redraw();
        &mut self.settings
    }

    pub fn set_settings(&mut self, settings: ViewerSettings) {
        self.settings = settings;
        self.request_redraw();
    }

    /// Replace the WGSL colour function. The program is rebuilt lazily.
    pub fn set_color_function(&mut self, source: &str) {
        if self.color_function != source {
            self.color_function = source.to_string();
            self.request_redraw();
        }
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn tile_cache(&self) -> &TileCache {
        &self.cache
    }

    pub fn shader_state(&self) -> PipelineState {
        self.shader.state()
    }

    pub fn color_path(&self) -> ColorPath {
        self.shader.path()
    }

    pub fn pointer(&self) -> &PointerState {
        &self.pointer
    }

    /// Current area-probe text, empty until the probe panel is first drawn.
    pub fn probe_text(&self) -> &str {
        self.probe.text()
    }

    pub fn request_redraw(&mut self) {
        self.redraw_requested = true;
    }

    /// Whether a redraw was requested since the last call.
    pub fn take_redraw_request(&mut self) -> bool {
        std::mem::take(&mut self.redraw_requested)
    }

    pub(super) fn clamp_view(&mut self) {
        if let Some(image) = &self.image {
            self.view.clamp_to_image(image.spec());
        }
    }

    /// Draw one frame.
    pub fn render(&mut self) -> FrameReport {
        if let Err(e) = self.initialize() {
            warn!("Viewer initialization failed: {e}");
        }
        let ctx = FrameContext::capture(
            &self.settings,
            self.view.window_width,
            self.view.window_height,
            self.device_pixel_ratio,
        );
        let dpr = ctx.device_pixel_ratio;
        let window_space = Affine2::scale(dpr, dpr);

        self.backend.set_transform(window_space);
        self.backend.clear(CLEAR_COLOR);
        let Some(image) = self.image.clone() else {
            return FrameReport::blank(self.shader.path());
        };
        let image: &dyn ImageSource = &*image;
        let spec = image.spec();

        self.shader.build(&mut self.backend, &self.color_function);
        self.sync_tile_format(image, &ctx);
        let path = self.shader.path();

        self.backend.set_transform(self.view.image_to_window(spec).then(window_space));
        let (tile_width, tile_height) = self.cache.tile_size();
        self.apply_color_path(image, &ctx, tile_width, tile_height);

        let mut report = FrameReport::blank(path);
        report.image_drawn = true;
        for cell in self.view.visible_tiles(spec, tile_width, tile_height).cells() {
            let fetches = self.cache.fetch_count();
            let loaded = self
                .cache
                .load_tile(&mut self.backend, image, cell.x, cell.y, cell.width, cell.height);
            match loaded {
                Ok(Some(texture)) => {
                    if self.cache.fetch_count() != fetches {
                        report.tiles_uploaded += 1;
                    }
                    let rect = Rect::from_size(
                        cell.x as f32,
                        cell.y as f32,
                        cell.width as f32,
                        cell.height as f32,
                    );
                    let uv = Rect::new(0.0, 0.0, cell.smax, cell.tmax);
                    self.backend.draw_textured_quad(texture, rect, uv);
                    report.tiles_drawn += 1;
                }
                Ok(None) => report.tiles_skipped += 1,
                Err(e) => {
                    warn!("Skipping tile at ({},{}): {e}", cell.x, cell.y);
                    report.tiles_skipped += 1;
                }
            }
        }
        report.wait_cursor = report.tiles_uploaded > 0;

        if self.pointer.selecting {
            self.backend.set_transform(window_space);
            paint_selection(&mut self.backend, self.pointer.select_start, self.pointer.select_end);
        }

        if ctx.settings.window_guides {
            self.backend.set_transform(self.view.image_to_window(spec).then(window_space));
            paint_window_guides(&mut self.backend, spec);
        }

        if ctx.settings.pixelview {
            report.inspector = Some(self.inspector.paint(
                &mut self.backend,
                &mut self.cache,
                &self.shader,
                image,
                &self.view,
                &ctx,
                self.pointer.position,
            ));
        }

        if ctx.settings.probeview {
            self.probe.paint(&mut self.backend, spec, &ctx);
        } else {
            self.probe.clear();
        }

        debug!(
            "Frame: {} tiles drawn, {} uploaded, {} skipped",
            report.tiles_drawn, report.tiles_uploaded, report.tiles_skipped
        );
        report
    }

    /// Rebuild tile storage when the image, the displayed channels or the
    /// colour path changed since the last frame.
    fn sync_tile_format(&mut self, image: &dyn ImageSource, ctx: &FrameContext) {
        let path = self.shader.path();
        let key = FormatKey {
            generation: self.generation,
            current_channel: ctx.settings.current_channel,
            color_mode: ctx.settings.color_mode,
            path,
        };
        if self.format_key == Some(key) {
            return;
        }
        self.format_key = Some(key);

        let nchannels = image.spec().nchannels;
        let window = match path {
            ColorPath::Shader => ChannelWindow {
                begin: key.current_channel.min(nchannels),
                count: displayed_channels(key.current_channel, nchannels, key.color_mode),
            },
            ColorPath::FixedFunction => ChannelWindow {
                begin: 0,
                count: nchannels,
            },
        };
        if let Err(e) = self.cache.reset_tile_format(&mut self.backend, image.spec(), window) {
            warn!("Tile format reset failed: {e}");
        }
    }

    fn apply_color_path(
        &mut self,
        image: &dyn ImageSource,
        ctx: &FrameContext,
        tex_width: i32,
        tex_height: i32,
    ) {
        match self.shader.path() {
            ColorPath::Shader => {
                self.shader
                    .apply_uniforms(&mut self.backend, image, ctx, tex_width, tex_height, false);
            }
            ColorPath::FixedFunction => {
                self.backend.use_program(None);
                let filter = if ctx.settings.linear_interpolation {
                    Filter::Linear
                } else {
                    Filter::Nearest
                };
                for tile in self.cache.tiles() {
                    if let Err(e) = self.backend.set_texture_filter(tile.texture, filter) {
                        warn!("Could not set tile filter: {e}");
                    }
                }
            }
        }
    }
}
