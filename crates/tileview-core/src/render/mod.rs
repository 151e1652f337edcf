//! The viewer: frame rendering, overlays and pointer input.

pub mod input;
pub mod overlay;
pub mod settings;
pub mod viewer;

pub use input::{Modifiers, PointerButton, PointerState};
pub use settings::{
    ColorMode, FrameContext, MouseMode, TileCacheConfig, ViewerConfig, ViewerSettings,
};
pub use viewer::{FrameReport, Viewer};
