use std::cell::Cell;
use std::path::Path;

use ::image::{DynamicImage, ImageDecoder, ImageReader};
use byteorder::{ByteOrder, NativeEndian};
use half::f16;
use tracing::info;

use super::sample::write_sample;
use super::{BaseType, ColorSpace, ImageSource, ImageSpec, Roi};
use crate::error::{Result, TileviewError};
use crate::transform::Orientation;

/// Native sample storage, interleaved channels, row-major over the data window.
#[derive(Clone, Debug)]
enum Samples {
    U8(Vec<u8>),
    U16(Vec<u16>),
    F16(Vec<f16>),
    F32(Vec<f32>),
}

impl Samples {
    fn len(&self) -> usize {
        match self {
            Samples::U8(v) => v.len(),
            Samples::U16(v) => v.len(),
            Samples::F16(v) => v.len(),
            Samples::F32(v) => v.len(),
        }
    }

    fn base_type(&self) -> BaseType {
        match self {
            Samples::U8(_) => BaseType::U8,
            Samples::U16(_) => BaseType::U16,
            Samples::F16(_) => BaseType::F16,
            Samples::F32(_) => BaseType::F32,
        }
    }

    fn read_f64(&self, index: usize) -> f64 {
        match self {
            Samples::U8(v) => v[index] as f64 / u8::MAX as f64,
            Samples::U16(v) => v[index] as f64 / u16::MAX as f64,
            Samples::F16(v) => v[index].to_f64(),
            Samples::F32(v) => v[index] as f64,
        }
    }

    /// Copy one sample in its own type, bit-exact.
    fn write_native(&self, index: usize, dst: &mut [u8]) {
        match self {
            Samples::U8(v) => dst[0] = v[index],
            Samples::U16(v) => NativeEndian::write_u16(dst, v[index]),
            Samples::F16(v) => NativeEndian::write_u16(dst, v[index].to_bits()),
            Samples::F32(v) => NativeEndian::write_f32(dst, v[index]),
        }
    }
}

/// An image held entirely in memory.
///
/// Exposure and gamma live in cells so the host can adjust them while the
/// viewer holds a shared handle.
#[derive(Debug)]
pub struct MemoryImage {
    spec: ImageSpec,
    samples: Samples,
    exposure: Cell<f32>,
    gamma: Cell<f32>,
}

impl MemoryImage {
    pub fn from_u8(width: i32, height: i32, nchannels: usize, data: Vec<u8>) -> Result<Self> {
        Self::build(width, height, nchannels, Samples::U8(data))
    }

    pub fn from_u16(width: i32, height: i32, nchannels: usize, data: Vec<u16>) -> Result<Self> {
        Self::build(width, height, nchannels, Samples::U16(data))
    }

    pub fn from_f16(width: i32, height: i32, nchannels: usize, data: Vec<f16>) -> Result<Self> {
        Self::build(width, height, nchannels, Samples::F16(data))
    }

    pub fn from_f32(width: i32, height: i32, nchannels: usize, data: Vec<f32>) -> Result<Self> {
        Self::build(width, height, nchannels, Samples::F32(data))
    }

    fn build(width: i32, height: i32, nchannels: usize, samples: Samples) -> Result<Self> {
        if width <= 0 || height <= 0 {
            return Err(TileviewError::InvalidDimensions {
                width: width.max(0) as u32,
                height: height.max(0) as u32,
            });
        }
        if nchannels == 0 {
            return Err(TileviewError::UnsupportedChannelCount(nchannels));
        }
        let needed = width as usize * height as usize * nchannels;
        if samples.len() != needed {
            return Err(TileviewError::BufferTooSmall {
                needed,
                actual: samples.len(),
            });
        }
        Ok(Self {
            spec: ImageSpec::new(width, height, nchannels, samples.base_type()),
            samples,
            exposure: Cell::new(0.0),
            gamma: Cell::new(1.0),
        })
    }

    /// Decode an image file, honouring its EXIF orientation.
    pub fn open(path: &Path) -> Result<Self> {
        let mut decoder = ImageReader::open(path)?
            .with_guessed_format()?
            .into_decoder()?;
        let orientation = decoder.orientation()?;
        let dynamic = DynamicImage::from_decoder(decoder)?;
        let image =
            Self::from_dynamic(dynamic)?.with_orientation(orientation_from_exif(orientation));
        info!(
            "Opened {} ({}x{}, {} channels, {:?}, orientation {})",
            path.display(),
            image.spec.width,
            image.spec.height,
            image.spec.nchannels,
            image.spec.format,
            image.spec.orientation.tag()
        );
        Ok(image)
    }

    /// Wrap a decoded image. 8- and 16-bit data is tagged sRGB.
    pub fn from_dynamic(dynamic: DynamicImage) -> Result<Self> {
        let (w, h) = (dynamic.width() as i32, dynamic.height() as i32);
        let image = match dynamic {
            DynamicImage::ImageLuma8(b) => Self::from_u8(w, h, 1, b.into_raw())?,
            DynamicImage::ImageLumaA8(b) => Self::from_u8(w, h, 2, b.into_raw())?,
            DynamicImage::ImageRgb8(b) => Self::from_u8(w, h, 3, b.into_raw())?,
            DynamicImage::ImageRgba8(b) => Self::from_u8(w, h, 4, b.into_raw())?,
            DynamicImage::ImageLuma16(b) => Self::from_u16(w, h, 1, b.into_raw())?,
            DynamicImage::ImageLumaA16(b) => Self::from_u16(w, h, 2, b.into_raw())?,
            DynamicImage::ImageRgb16(b) => Self::from_u16(w, h, 3, b.into_raw())?,
            DynamicImage::ImageRgba16(b) => Self::from_u16(w, h, 4, b.into_raw())?,
            DynamicImage::ImageRgb32F(b) => {
                return Self::from_f32(w, h, 3, b.into_raw());
            }
            other => {
                return Self::from_f32(w, h, 4, other.into_rgba32f().into_raw());
            }
        };
        Ok(image.with_color_space(ColorSpace::Srgb))
    }

    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.spec.orientation = orientation;
        self
    }

    pub fn with_color_space(mut self, color_space: ColorSpace) -> Self {
        self.spec.color_space = color_space;
        self
    }

    /// Move the data window origin. The display window is left unchanged.
    pub fn with_origin(mut self, x: i32, y: i32) -> Self {
        self.spec.x = x;
        self.spec.y = y;
        self
    }

    pub fn with_display_window(mut self, x: i32, y: i32, width: i32, height: i32) -> Self {
        self.spec.full_x = x;
        self.spec.full_y = y;
        self.spec.full_width = width;
        self.spec.full_height = height;
        self
    }

    pub fn with_channel_names<S: Into<String>>(
        mut self,
        names: impl IntoIterator<Item = S>,
    ) -> Self {
        let mut names: Vec<String> = names.into_iter().map(Into::into).collect();
        names.resize_with(self.spec.nchannels, String::new);
        self.spec.channel_names = names;
        self
    }

    pub fn set_exposure(&self, stops: f32) {
        self.exposure.set(stops);
    }

    pub fn set_gamma(&self, gamma: f32) {
        self.gamma.set(gamma);
    }

    fn sample_index(&self, x: i32, y: i32, channel: usize) -> usize {
        let col = (x - self.spec.x) as usize;
        let row = (y - self.spec.y) as usize;
        (row * self.spec.width as usize + col) * self.spec.nchannels + channel
    }
}

impl ImageSource for MemoryImage {
    fn spec(&self) -> &ImageSpec {
        &self.spec
    }

    fn exposure(&self) -> f32 {
        self.exposure.get()
    }

    fn gamma(&self) -> f32 {
        self.gamma.get()
    }

    fn get_pixels(&self, roi: Roi, format: BaseType, out: &mut [u8]) -> Result<()> {
        if roi.is_empty() {
            return Ok(());
        }
        if !self.spec.contains(&roi) {
            return Err(TileviewError::RegionOutOfBounds {
                xbegin: roi.xbegin,
                xend: roi.xend,
                ybegin: roi.ybegin,
                yend: roi.yend,
            });
        }
        let (chbegin, chend) = roi.channel_range(self.spec.nchannels);
        if chbegin >= chend || chend > self.spec.nchannels {
            return Err(TileviewError::ChannelRangeOutOfBounds {
                begin: chbegin,
                end: chend,
                nchannels: self.spec.nchannels,
            });
        }

        let size = format.size();
        let needed = roi.npixels() * (chend - chbegin) * size;
        if out.len() < needed {
            return Err(TileviewError::BufferTooSmall {
                needed,
                actual: out.len(),
            });
        }

        let native = format == self.samples.base_type();
        let mut offset = 0;
        for y in roi.ybegin..roi.yend {
            for x in roi.xbegin..roi.xend {
                for c in chbegin..chend {
                    let index = self.sample_index(x, y, c);
                    let dst = &mut out[offset..offset + size];
                    if native {
                        self.samples.write_native(index, dst);
                    } else {
                        write_sample(format, self.samples.read_f64(index), dst);
                    }
                    offset += size;
                }
            }
        }
        Ok(())
    }

    fn get_pixel(&self, x: i32, y: i32, out: &mut [f32]) {
        let inside = x >= self.spec.x
            && y >= self.spec.y
            && x < self.spec.x + self.spec.width
            && y < self.spec.y + self.spec.height;
        for (c, value) in out.iter_mut().enumerate() {
            *value = if inside && c < self.spec.nchannels {
                self.samples.read_f64(self.sample_index(x, y, c)) as f32
            } else {
                0.0
            };
        }
    }
}

fn orientation_from_exif(orientation: ::image::metadata::Orientation) -> Orientation {
    use ::image::metadata::Orientation as Exif;
    match orientation {
        Exif::NoTransforms => Orientation::Normal,
        Exif::FlipHorizontal => Orientation::FlipHorizontal,
        Exif::Rotate180 => Orientation::Rotate180,
        Exif::FlipVertical => Orientation::FlipVertical,
        Exif::Rotate90FlipH => Orientation::Transpose,
        Exif::Rotate90 => Orientation::Rotate90Cw,
        Exif::Rotate270FlipH => Orientation::Transverse,
        Exif::Rotate270 => Orientation::Rotate90Ccw,
    }
}
