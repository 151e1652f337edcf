pub mod backend;
pub mod consts;
pub mod error;
pub mod inspector;
pub mod probe;
pub mod render;
pub mod shader;
pub mod source;
pub mod texture;
pub mod transform;

pub use error::{Result, TileviewError};
pub use render::{FrameReport, Viewer, ViewerConfig, ViewerSettings};
