use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::{CLOSEUP_TEXTURE_SIZE, DEFAULT_TILE_COUNT, TEXTURE_SIZE_CEILING};
use crate::error::{Result, TileviewError};

/// How image channels map to the displayed colour.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColorMode {
    #[default]
    Rgba,
    Rgb,
    SingleChannel,
    Luminance,
    Heatmap,
}

impl ColorMode {
    /// Value of the `colormode` uniform.
    pub fn index(self) -> i32 {
        match self {
            ColorMode::Rgba => 0,
            ColorMode::Rgb => 1,
            ColorMode::SingleChannel => 2,
            ColorMode::Luminance => 3,
            ColorMode::Heatmap => 4,
        }
    }
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorMode::Rgba => write!(f, "RGBA"),
            ColorMode::Rgb => write!(f, "RGB"),
            ColorMode::SingleChannel => write!(f, "Single channel"),
            ColorMode::Luminance => write!(f, "Luminance"),
            ColorMode::Heatmap => write!(f, "Heatmap"),
        }
    }
}

/// What pointer drags do.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseMode {
    #[default]
    Zoom,
    Pan,
    Wipe,
    Select,
    Annotate,
}

impl fmt::Display for MouseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MouseMode::Zoom => write!(f, "Zoom"),
            MouseMode::Pan => write!(f, "Pan"),
            MouseMode::Wipe => write!(f, "Wipe"),
            MouseMode::Select => write!(f, "Select"),
            MouseMode::Annotate => write!(f, "Annotate"),
        }
    }
}

/// Viewer-wide settings owned by the host application.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerSettings {
    pub current_channel: usize,
    pub color_mode: ColorMode,
    pub linear_interpolation: bool,
    /// Source pixels across the magnifier (odd).
    pub closeup_pixels: u32,
    /// Source pixels across the averaging window (odd, at most `closeup_pixels`).
    pub closeup_avg_pixels: u32,
    pub pixelview: bool,
    pub pixelview_follows_mouse: bool,
    pub window_guides: bool,
    pub area_sample_mode: bool,
    pub probeview: bool,
    pub mouse_mode: MouseMode,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            current_channel: 0,
            color_mode: ColorMode::Rgba,
            linear_interpolation: true,
            closeup_pixels: 13,
            closeup_avg_pixels: 11,
            pixelview: false,
            pixelview_follows_mouse: false,
            window_guides: false,
            area_sample_mode: false,
            probeview: false,
            mouse_mode: MouseMode::Zoom,
        }
    }
}

impl ViewerSettings {
    /// Copy with both closeup sizes odd and at least 1, and the averaging
    /// window no larger than the magnifier.
    pub fn normalized(&self) -> Self {
        let odd = |n: u32| if n % 2 == 0 { n + 1 } else { n };
        let closeup_pixels = odd(self.closeup_pixels.max(1));
        let closeup_avg_pixels = odd(self.closeup_avg_pixels.max(1)).min(closeup_pixels);
        Self {
            closeup_pixels,
            closeup_avg_pixels,
            ..self.clone()
        }
    }
}

/// Texture budget of the tile cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileCacheConfig {
    pub tile_count: usize,
    /// Cap applied on top of the reported maximum texture size.
    pub texture_size_ceiling: u32,
    pub closeup_texture_size: u32,
}

impl Default for TileCacheConfig {
    fn default() -> Self {
        Self {
            tile_count: DEFAULT_TILE_COUNT,
            texture_size_ceiling: TEXTURE_SIZE_CEILING,
            closeup_texture_size: CLOSEUP_TEXTURE_SIZE,
        }
    }
}

/// Everything a host can configure, loadable from TOML.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewerConfig {
    #[serde(default)]
    pub settings: ViewerSettings,
    #[serde(default)]
    pub tiles: TileCacheConfig,
}

impl ViewerConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: ViewerConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tiles.tile_count == 0 {
            return Err(TileviewError::InvalidSettings("tile_count must be at least 1".into()));
        }
        if self.tiles.texture_size_ceiling == 0 {
            return Err(TileviewError::InvalidSettings(
                "texture_size_ceiling must be at least 1".into(),
            ));
        }
        let closeup = self.settings.normalized().closeup_pixels;
        if self.tiles.closeup_texture_size < closeup {
            return Err(TileviewError::InvalidSettings(format!(
                "closeup_texture_size {} is smaller than closeup_pixels {closeup}",
                self.tiles.closeup_texture_size
            )));
        }
        Ok(())
    }
}

/// Settings and viewport captured once at the start of a frame.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameContext {
    pub settings: ViewerSettings,
    pub window_width: i32,
    pub window_height: i32,
    pub device_pixel_ratio: f32,
}

impl FrameContext {
    pub fn capture(
        settings: &ViewerSettings,
        window_width: i32,
        window_height: i32,
        device_pixel_ratio: f32,
    ) -> Self {
        Self {
            settings: settings.normalized(),
            window_width,
            window_height,
            device_pixel_ratio,
        }
    }
}
