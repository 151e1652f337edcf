//! Mappings between window pixels, display space and stored-image space.

pub mod affine;
pub mod orientation;
pub mod view;

pub use affine::Affine2;
pub use orientation::{Orientation, OrientationTransform};
pub use view::{is_too_big, next_zoom_in, next_zoom_out, TileCell, ViewState, VisibleTiles};
