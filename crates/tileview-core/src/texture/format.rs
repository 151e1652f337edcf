//! Mapping from image sample layout to GPU texture formats.

use crate::backend::Capabilities;
use crate::render::ColorMode;
use crate::source::{BaseType, ColorSpace};

/// Component layout of uploaded pixel rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelLayout {
    /// Sampled as `(l, l, l, 1)`.
    Luminance,
    /// Sampled as `(l, l, l, a)`.
    LuminanceAlpha,
    Rgb,
    Rgba,
    Invalid,
}

impl PixelLayout {
    pub fn from_channels(nchannels: usize) -> Self {
        match nchannels {
            1 => PixelLayout::Luminance,
            2 => PixelLayout::LuminanceAlpha,
            3 => PixelLayout::Rgb,
            4 => PixelLayout::Rgba,
            _ => PixelLayout::Invalid,
        }
    }

    pub fn components(self) -> usize {
        match self {
            PixelLayout::Luminance => 1,
            PixelLayout::LuminanceAlpha => 2,
            PixelLayout::Rgb => 3,
            PixelLayout::Rgba => 4,
            PixelLayout::Invalid => 0,
        }
    }
}

/// Numeric type of uploaded samples.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UploadType {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    F16,
    F32,
    Invalid,
}

impl UploadType {
    pub fn size(self) -> usize {
        match self {
            UploadType::U8 | UploadType::I8 => 1,
            UploadType::U16 | UploadType::I16 | UploadType::F16 => 2,
            UploadType::U32 | UploadType::I32 | UploadType::F32 => 4,
            UploadType::Invalid => 0,
        }
    }
}

/// Precision of the GPU-side storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Precision {
    /// Driver's choice for the component count.
    Generic,
    Unorm8,
    Unorm16,
    Float16,
    Float32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StorageFormat {
    pub layout: PixelLayout,
    pub precision: Precision,
    pub srgb: bool,
}

/// Everything needed to allocate a texture and upload rows into it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureFormat {
    pub upload: UploadType,
    pub layout: PixelLayout,
    pub storage: StorageFormat,
    /// Sample type requested from the image source for uploads.
    pub fetch: BaseType,
}

impl TextureFormat {
    pub fn is_valid(&self) -> bool {
        self.upload != UploadType::Invalid && self.layout != PixelLayout::Invalid
    }

    pub fn channels(&self) -> usize {
        self.layout.components()
    }

    pub fn bytes_per_pixel(&self) -> usize {
        self.channels() * self.fetch.size()
    }
}

/// Select upload and storage formats for `nchannels` channels of `format`.
///
/// Half-float data on hardware without half-float textures yields an invalid
/// upload type and channel counts outside 1-4 an invalid layout; callers skip
/// such textures.
pub fn select_format(
    format: BaseType,
    color_space: ColorSpace,
    nchannels: usize,
    caps: &Capabilities,
) -> TextureFormat {
    let (upload, fetch) = match format {
        BaseType::U8 => (UploadType::U8, BaseType::U8),
        BaseType::I8 => (UploadType::I8, BaseType::I8),
        BaseType::U16 => (UploadType::U16, BaseType::U16),
        BaseType::I16 => (UploadType::I16, BaseType::I16),
        BaseType::U32 => (UploadType::U32, BaseType::U32),
        BaseType::I32 => (UploadType::I32, BaseType::I32),
        BaseType::F16 if caps.half_float => (UploadType::F16, BaseType::F16),
        BaseType::F16 => (UploadType::Invalid, BaseType::F16),
        BaseType::F32 => (UploadType::F32, BaseType::F32),
        // No double textures; narrow on fetch.
        BaseType::F64 => (UploadType::F32, BaseType::F32),
    };

    let layout = PixelLayout::from_channels(nchannels);
    let srgb = caps.srgb && color_space == ColorSpace::Srgb;
    let precision = if srgb {
        if format == BaseType::U8 {
            Precision::Unorm8
        } else {
            Precision::Generic
        }
    } else {
        match format {
            BaseType::U8 => Precision::Unorm8,
            BaseType::U16 => Precision::Unorm16,
            BaseType::F32 | BaseType::F64 if caps.float => Precision::Float32,
            BaseType::F16 if caps.float => Precision::Float16,
            _ => Precision::Generic,
        }
    };

    TextureFormat {
        upload,
        layout,
        storage: StorageFormat {
            layout,
            precision,
            srgb,
        },
        fetch,
    }
}

/// Channels uploaded per pixel on the shader path, counted from
/// `current_channel`: only what the colour mode displays. Zero once
/// `current_channel` is past the last channel.
pub fn displayed_channels(current_channel: usize, nchannels: usize, mode: ColorMode) -> usize {
    let remaining = nchannels.saturating_sub(current_channel);
    match mode {
        ColorMode::Rgba => remaining.min(4),
        ColorMode::Rgb | ColorMode::Luminance => remaining.min(3),
        ColorMode::SingleChannel | ColorMode::Heatmap => remaining.min(1),
    }
}
