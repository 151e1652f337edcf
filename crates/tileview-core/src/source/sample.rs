//! Conversion between raw sample bytes and floating-point values.
//!
//! Integer samples map to floats by dividing by the type's nominal maximum,
//! so an 8-bit 255 and a 16-bit 65535 both read as 1.0.

use byteorder::{ByteOrder, NativeEndian};
use half::f16;

use super::BaseType;

/// Decode one native-endian sample of type `format` to a normalized float.
pub fn read_sample(format: BaseType, src: &[u8]) -> f64 {
    match format {
        BaseType::U8 => src[0] as f64 / u8::MAX as f64,
        BaseType::I8 => (src[0] as i8) as f64 / i8::MAX as f64,
        BaseType::U16 => NativeEndian::read_u16(src) as f64 / u16::MAX as f64,
        BaseType::I16 => NativeEndian::read_i16(src) as f64 / i16::MAX as f64,
        BaseType::U32 => NativeEndian::read_u32(src) as f64 / u32::MAX as f64,
        BaseType::I32 => NativeEndian::read_i32(src) as f64 / i32::MAX as f64,
        BaseType::F16 => f16::from_bits(NativeEndian::read_u16(src)).to_f64(),
        BaseType::F32 => NativeEndian::read_f32(src) as f64,
        BaseType::F64 => NativeEndian::read_f64(src),
    }
}

/// Encode a normalized float as one native-endian sample of type `format`.
/// Integer targets clamp to their representable range and round.
pub fn write_sample(format: BaseType, value: f64, dst: &mut [u8]) {
    match format {
        BaseType::U8 => dst[0] = (value.clamp(0.0, 1.0) * u8::MAX as f64).round() as u8,
        BaseType::I8 => dst[0] = (value.clamp(-1.0, 1.0) * i8::MAX as f64).round() as i8 as u8,
        BaseType::U16 => {
            NativeEndian::write_u16(dst, (value.clamp(0.0, 1.0) * u16::MAX as f64).round() as u16)
        }
        BaseType::I16 => {
            NativeEndian::write_i16(dst, (value.clamp(-1.0, 1.0) * i16::MAX as f64).round() as i16)
        }
        BaseType::U32 => {
            NativeEndian::write_u32(dst, (value.clamp(0.0, 1.0) * u32::MAX as f64).round() as u32)
        }
        BaseType::I32 => {
            NativeEndian::write_i32(dst, (value.clamp(-1.0, 1.0) * i32::MAX as f64).round() as i32)
        }
        BaseType::F16 => NativeEndian::write_u16(dst, f16::from_f64(value).to_bits()),
        BaseType::F32 => NativeEndian::write_f32(dst, value as f32),
        BaseType::F64 => NativeEndian::write_f64(dst, value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u8_extremes_normalize() {
        assert_eq!(read_sample(BaseType::U8, &[255]), 1.0);
        assert_eq!(read_sample(BaseType::U8, &[0]), 0.0);
    }

    #[test]
    fn test_u16_write_clamps() {
        let mut buf = [0u8; 2];
        write_sample(BaseType::U16, 2.0, &mut buf);
        assert_eq!(NativeEndian::read_u16(&buf), u16::MAX);
        write_sample(BaseType::U16, -1.0, &mut buf);
        assert_eq!(NativeEndian::read_u16(&buf), 0);
    }

    #[test]
    fn test_f16_preserves_half_values() {
        let mut buf = [0u8; 2];
        write_sample(BaseType::F16, 0.5, &mut buf);
        assert_eq!(read_sample(BaseType::F16, &buf), 0.5);
    }
}
