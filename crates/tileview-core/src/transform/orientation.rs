use serde::{Deserialize, Serialize};

use super::affine::Affine2;

/// EXIF orientation of the stored pixels relative to the intended display.
///
/// Tags 5-8 swap the image axes. Tag 0 (unknown) behaves like tag 1.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    Unknown,
    #[default]
    Normal,
    FlipHorizontal,
    Rotate180,
    FlipVertical,
    Transpose,
    Rotate90Cw,
    Transverse,
    Rotate90Ccw,
}

/// Result of mapping a display-space point into stored-image space, together
/// with the drawing transform that puts the stored image upright.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrientationTransform {
    pub scale_x: f32,
    pub scale_y: f32,
    /// Rotation in degrees, counter-clockwise in a y-up frame.
    pub rotate_z: f32,
    pub point: (f32, f32),
}

impl Orientation {
    pub const ALL: [Orientation; 9] = [
        Orientation::Unknown,
        Orientation::Normal,
        Orientation::FlipHorizontal,
        Orientation::Rotate180,
        Orientation::FlipVertical,
        Orientation::Transpose,
        Orientation::Rotate90Cw,
        Orientation::Transverse,
        Orientation::Rotate90Ccw,
    ];

    /// Map an EXIF tag. Anything outside 0-8 is treated as unknown.
    pub fn from_tag(tag: u32) -> Self {
        Self::ALL.get(tag as usize).copied().unwrap_or(Orientation::Unknown)
    }

    pub fn tag(self) -> u32 {
        self as u32
    }

    pub fn swaps_axes(self) -> bool {
        self.tag() > 4
    }

    /// The orientation whose `apply` undoes this one's. Axis-swapping
    /// orientations must be applied with swapped extents to invert.
    pub fn inverse(self) -> Self {
        match self {
            Orientation::Rotate90Cw => Orientation::Rotate90Ccw,
            Orientation::Rotate90Ccw => Orientation::Rotate90Cw,
            other => other,
        }
    }

    /// Map a display-space point into stored-image space.
    ///
    /// `width` and `height` are the stored image extents. With `pixel` set the
    /// point is a pixel index rather than a continuous coordinate, and every
    /// reflected axis is decremented by one. The renderer and every pixel
    /// probe go through this one function so overlays stay registered with
    /// the drawn image.
    pub fn apply(
        self,
        width: i32,
        height: i32,
        point: (f32, f32),
        pixel: bool,
    ) -> OrientationTransform {
        let (w, h) = (width as f32, height as f32);
        let index = if pixel { 1.0 } else { 0.0 };
        let (x, y) = point;
        let (scale_x, scale_y, rotate_z, point) = match self {
            Orientation::Unknown | Orientation::Normal => (1.0, 1.0, 0.0, (x, y)),
            Orientation::FlipHorizontal => (-1.0, 1.0, 0.0, (w - x - index, y)),
            Orientation::Rotate180 => (-1.0, -1.0, 0.0, (w - x - index, h - y - index)),
            Orientation::FlipVertical => (1.0, -1.0, 0.0, (x, h - y - index)),
            Orientation::Transpose => (-1.0, 1.0, 90.0, (y, x)),
            Orientation::Rotate90Cw => (1.0, 1.0, -270.0, (y, h - x - index)),
            Orientation::Transverse => (-1.0, 1.0, -90.0, (w - y - index, h - x - index)),
            Orientation::Rotate90Ccw => (1.0, 1.0, -90.0, (w - y - index, x)),
        };
        OrientationTransform {
            scale_x,
            scale_y,
            rotate_z,
            point,
        }
    }

    /// Rotation and flips that draw stored pixels upright, about the origin.
    pub fn upright(self) -> Affine2 {
        let t = self.apply(0, 0, (0.0, 0.0), false);
        Affine2::rotate_degrees(t.rotate_z).then(Affine2::scale(t.scale_x, t.scale_y))
    }

    /// Map a stored-image point back to display space. Exact inverse of
    /// [`Orientation::apply`] for the same extents and mode.
    pub fn unapply(self, width: i32, height: i32, point: (f32, f32), pixel: bool) -> (f32, f32) {
        let (w, h) = if self.swaps_axes() { (height, width) } else { (width, height) };
        self.inverse().apply(w, h, point, pixel).point
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_tag_out_of_range_is_unknown() {
        assert_eq!(Orientation::from_tag(42), Orientation::Unknown);
        assert_eq!(Orientation::from_tag(6), Orientation::Rotate90Cw);
    }

    #[test]
    fn test_continuous_flip_does_not_decrement() {
        let t = Orientation::FlipHorizontal.apply(10, 10, (2.0, 3.0), false);
        assert_eq!(t.point, (8.0, 3.0));
        assert_eq!(t.scale_x, -1.0);
    }
}
