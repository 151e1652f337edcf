//! Per-channel min / max / mean over a region, in the image's own sample type.

use byteorder::{ByteOrder, NativeEndian};
use num_traits::{Bounded, NumCast, ToPrimitive};

use crate::error::Result;
use crate::source::{BaseType, ImageSource, Roi};

/// A sample type statistics can be gathered in.
pub trait Sample: Copy + Default + PartialOrd + Bounded + NumCast + ToPrimitive {
    const BASE_TYPE: BaseType;

    fn decode(bytes: &[u8]) -> Self;
}

impl Sample for u8 {
    const BASE_TYPE: BaseType = BaseType::U8;

    fn decode(bytes: &[u8]) -> Self {
        bytes[0]
    }
}

impl Sample for u16 {
    const BASE_TYPE: BaseType = BaseType::U16;

    fn decode(bytes: &[u8]) -> Self {
        NativeEndian::read_u16(bytes)
    }
}

impl Sample for f32 {
    const BASE_TYPE: BaseType = BaseType::F32;

    fn decode(bytes: &[u8]) -> Self {
        NativeEndian::read_f32(bytes)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ChannelStats<T> {
    pub min: T,
    pub max: T,
    /// Mean converted back to `T`; integer types truncate.
    pub avg: T,
}

/// Statistics of every channel over `roi`, from one fetch and one pass.
///
/// Returns zeros for every channel when `inside` is false or the region is
/// empty.
pub fn region_stats<T: Sample>(
    image: &dyn ImageSource,
    roi: Roi,
    nchannels: usize,
    inside: bool,
) -> Result<Vec<ChannelStats<T>>> {
    let count = roi.npixels();
    if !inside || count == 0 || nchannels == 0 {
        return Ok(vec![ChannelStats::default(); nchannels]);
    }

    let size = T::BASE_TYPE.size();
    let mut buf = vec![0u8; count * nchannels * size];
    image.get_pixels(roi.with_channels(0, nchannels), T::BASE_TYPE, &mut buf)?;

    let mut mins = vec![T::max_value(); nchannels];
    let mut maxs = vec![T::min_value(); nchannels];
    let mut sums = vec![0.0f64; nchannels];
    for pixel in buf.chunks_exact(nchannels * size) {
        for (c, bytes) in pixel.chunks_exact(size).enumerate() {
            let v = T::decode(bytes);
            if v < mins[c] {
                mins[c] = v;
            }
            if v > maxs[c] {
                maxs[c] = v;
            }
            sums[c] += v.to_f64().unwrap_or(0.0);
        }
    }

    Ok((0..nchannels)
        .map(|c| ChannelStats {
            min: mins[c],
            max: maxs[c],
            avg: <T as NumCast>::from(sums[c] / count as f64).unwrap_or_default(),
        })
        .collect())
}

/// Every channel of one pixel in its native type. Pixels outside the data
/// window read as zero.
pub fn native_pixel<T: Sample>(image: &dyn ImageSource, x: i32, y: i32) -> Result<Vec<T>> {
    let spec = image.spec();
    let roi = Roi::new(x, x + 1, y, y + 1);
    if !spec.contains(&roi) {
        return Ok(vec![T::default(); spec.nchannels]);
    }
    let size = T::BASE_TYPE.size();
    let mut buf = vec![0u8; spec.nchannels * size];
    image.get_pixels(roi, T::BASE_TYPE, &mut buf)?;
    Ok(buf.chunks_exact(size).map(T::decode).collect())
}
