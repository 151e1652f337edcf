pub mod config;
pub mod info;
pub mod inspect;
pub mod probe;
pub mod render;

use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use tileview_core::backend::RenderBackend;
use tileview_core::render::ColorMode;
use tileview_core::source::{ImageSource, MemoryImage};
use tileview_core::{Viewer, ViewerConfig};
use tracing::debug;

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ColorModeArg {
    Rgba,
    Rgb,
    Single,
    Luminance,
    Heatmap,
}

impl From<ColorModeArg> for ColorMode {
    fn from(arg: ColorModeArg) -> Self {
        match arg {
            ColorModeArg::Rgba => ColorMode::Rgba,
            ColorModeArg::Rgb => ColorMode::Rgb,
            ColorModeArg::Single => ColorMode::SingleChannel,
            ColorModeArg::Luminance => ColorMode::Luminance,
            ColorModeArg::Heatmap => ColorMode::Heatmap,
        }
    }
}

/// Viewport and settings shared by every command that renders a frame.
#[derive(Args)]
pub struct ViewerArgs {
    /// Viewer config file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Window width in pixels
    #[arg(long, default_value = "800")]
    pub width: i32,

    /// Window height in pixels
    #[arg(long, default_value = "600")]
    pub height: i32,

    /// Zoom factor (default: fit the image to the window)
    #[arg(long)]
    pub zoom: Option<f32>,

    /// First displayed channel
    #[arg(long)]
    pub channel: Option<usize>,

    /// Channel-to-colour mapping
    #[arg(long, value_enum)]
    pub color_mode: Option<ColorModeArg>,

    /// Exposure in stops
    #[arg(long)]
    pub exposure: Option<f32>,

    /// Display gamma
    #[arg(long)]
    pub gamma: Option<f32>,

    /// Nearest-neighbour sampling instead of linear
    #[arg(long)]
    pub nearest: bool,

    /// Draw data and display window outlines
    #[arg(long)]
    pub guides: bool,
}

impl ViewerArgs {
    /// The config file, if any, with command-line overrides applied.
    pub fn viewer_config(&self) -> Result<ViewerConfig> {
        let mut config = match &self.config {
            Some(path) => ViewerConfig::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => ViewerConfig::default(),
        };
        let settings = &mut config.settings;
        if let Some(channel) = self.channel {
            settings.current_channel = channel;
        }
        if let Some(mode) = self.color_mode {
            settings.color_mode = mode.into();
        }
        if self.nearest {
            settings.linear_interpolation = false;
        }
        if self.guides {
            settings.window_guides = true;
        }
        Ok(config)
    }
}

pub fn open_image(path: &Path) -> Result<MemoryImage> {
    MemoryImage::open(path).with_context(|| format!("Failed to load {}", path.display()))
}

/// A viewer over `backend` with `image` bound and the view set up from `args`.
pub fn build_viewer<B: RenderBackend>(
    backend: B,
    image: MemoryImage,
    config: &ViewerConfig,
    args: &ViewerArgs,
) -> Result<Viewer<B>> {
    if let Some(stops) = args.exposure {
        image.set_exposure(stops);
    }
    if let Some(gamma) = args.gamma {
        image.set_gamma(gamma);
    }

    let mut viewer = Viewer::new(backend, config);
    viewer.initialize().context("Failed to initialize viewer")?;
    viewer.resize(args.width, args.height, 1.0);
    let image: Rc<dyn ImageSource> = Rc::new(image);
    viewer.bind_image(Some(image));
    match args.zoom {
        Some(zoom) => viewer.zoom_to(zoom, true),
        None => viewer.fit_to_window(),
    }
    debug!(
        "Viewer ready: {}x{} window, zoom {}",
        args.width,
        args.height,
        viewer.view().zoom
    );
    Ok(viewer)
}
