pub mod memory;
pub mod sample;

pub use memory::MemoryImage;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::transform::Orientation;

/// Numeric type of the samples stored by an image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BaseType {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    F16,
    F32,
    F64,
}

impl BaseType {
    /// Size of one sample in bytes.
    pub fn size(self) -> usize {
        match self {
            BaseType::U8 | BaseType::I8 => 1,
            BaseType::U16 | BaseType::I16 | BaseType::F16 => 2,
            BaseType::U32 | BaseType::I32 | BaseType::F32 => 4,
            BaseType::F64 => 8,
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, BaseType::F16 | BaseType::F32 | BaseType::F64)
    }

    /// Nominal dynamic range used to normalize integer samples to [0, 1].
    /// Float types are already normalized and return `None`.
    pub fn nominal_max(self) -> Option<f64> {
        match self {
            BaseType::U8 => Some(u8::MAX as f64),
            BaseType::I8 => Some(i8::MAX as f64),
            BaseType::U16 => Some(u16::MAX as f64),
            BaseType::I16 => Some(i16::MAX as f64),
            BaseType::U32 => Some(u32::MAX as f64),
            BaseType::I32 => Some(i32::MAX as f64),
            BaseType::F16 | BaseType::F32 | BaseType::F64 => None,
        }
    }
}

/// Colour space declared by the image metadata.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorSpace {
    #[default]
    Linear,
    Srgb,
    Unknown,
}

/// Rectangular region of interest in absolute pixel coordinates, with an
/// optional channel sub-range. Bounds are half-open.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Roi {
    pub xbegin: i32,
    pub xend: i32,
    pub ybegin: i32,
    pub yend: i32,
    pub channels: Option<(usize, usize)>,
}

impl Roi {
    pub fn new(xbegin: i32, xend: i32, ybegin: i32, yend: i32) -> Self {
        Self {
            xbegin,
            xend,
            ybegin,
            yend,
            channels: None,
        }
    }

    pub fn with_channels(mut self, begin: usize, end: usize) -> Self {
        self.channels = Some((begin, end));
        self
    }

    pub fn width(&self) -> i32 {
        self.xend - self.xbegin
    }

    pub fn height(&self) -> i32 {
        self.yend - self.ybegin
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }

    pub fn npixels(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            self.width() as usize * self.height() as usize
        }
    }

    /// Resolve the channel range against an image with `nchannels` channels.
    pub fn channel_range(&self, nchannels: usize) -> (usize, usize) {
        self.channels.unwrap_or((0, nchannels))
    }
}

/// Description of an image: data window, display window, channels, sample
/// format, orientation and colour space.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageSpec {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub full_x: i32,
    pub full_y: i32,
    pub full_width: i32,
    pub full_height: i32,
    pub nchannels: usize,
    pub channel_names: Vec<String>,
    pub format: BaseType,
    pub orientation: Orientation,
    pub color_space: ColorSpace,
}

impl ImageSpec {
    /// A spec whose display window equals its data window at the origin.
    pub fn new(width: i32, height: i32, nchannels: usize, format: BaseType) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
            full_x: 0,
            full_y: 0,
            full_width: width,
            full_height: height,
            nchannels,
            channel_names: default_channel_names(nchannels),
            format,
            orientation: Orientation::Normal,
            color_space: ColorSpace::Linear,
        }
    }

    pub fn channel_bytes(&self) -> usize {
        self.format.size()
    }

    pub fn pixel_bytes(&self) -> usize {
        self.nchannels * self.format.size()
    }

    pub fn channel_name(&self, channel: usize) -> &str {
        self.channel_names
            .get(channel)
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn data_roi(&self) -> Roi {
        Roi::new(self.x, self.x + self.width, self.y, self.y + self.height)
    }

    pub fn contains(&self, roi: &Roi) -> bool {
        roi.xbegin >= self.x
            && roi.ybegin >= self.y
            && roi.xend <= self.x + self.width
            && roi.yend <= self.y + self.height
    }

    pub fn oriented_x(&self) -> i32 {
        if self.orientation.swaps_axes() { self.y } else { self.x }
    }

    pub fn oriented_y(&self) -> i32 {
        if self.orientation.swaps_axes() { self.x } else { self.y }
    }

    pub fn oriented_width(&self) -> i32 {
        if self.orientation.swaps_axes() { self.height } else { self.width }
    }

    pub fn oriented_height(&self) -> i32 {
        if self.orientation.swaps_axes() { self.width } else { self.height }
    }

    pub fn oriented_full_x(&self) -> i32 {
        if self.orientation.swaps_axes() { self.full_y } else { self.full_x }
    }

    pub fn oriented_full_y(&self) -> i32 {
        if self.orientation.swaps_axes() { self.full_x } else { self.full_y }
    }

    pub fn oriented_full_width(&self) -> i32 {
        if self.orientation.swaps_axes() { self.full_height } else { self.full_width }
    }

    pub fn oriented_full_height(&self) -> i32 {
        if self.orientation.swaps_axes() { self.full_width } else { self.full_height }
    }

    /// Map a display-space point to stored pixels relative to the data
    /// window origin. The renderer, inspector and area probe all resolve
    /// positions through here.
    pub fn display_to_stored(&self, point: (f32, f32), pixel: bool) -> (f32, f32) {
        let relative = (
            point.0 - self.oriented_x() as f32,
            point.1 - self.oriented_y() as f32,
        );
        self.orientation.apply(self.width, self.height, relative, pixel).point
    }
}

/// Conventional channel names for 1-4 channel images; generic names beyond.
pub fn default_channel_names(nchannels: usize) -> Vec<String> {
    let names: &[&str] = match nchannels {
        1 => &["Y"],
        2 => &["Y", "A"],
        3 => &["R", "G", "B"],
        4 => &["R", "G", "B", "A"],
        _ => &[],
    };
    if names.is_empty() {
        (0..nchannels).map(|c| format!("channel{c}")).collect()
    } else {
        names.iter().map(|s| s.to_string()).collect()
    }
}

/// Read-only access to the pixels of the image currently on display.
///
/// The viewer never mutates the image; it pulls sub-regions on demand for
/// tile uploads, the closeup magnifier and the statistics scans.
pub trait ImageSource {
    fn spec(&self) -> &ImageSpec;

    /// Exposure in stops; the shader gain is `2^exposure`.
    fn exposure(&self) -> f32;

    fn gamma(&self) -> f32;

    /// Fill `out` with `roi` samples converted to `format`, raster order,
    /// channels interleaved. Fails if the region is not fully inside the
    /// data window or `out` is too small.
    fn get_pixels(&self, roi: Roi, format: BaseType, out: &mut [u8]) -> Result<()>;

    /// Read one pixel as floats. Pixels outside the data window read as zero.
    fn get_pixel(&self, x: i32, y: i32, out: &mut [f32]);
}
