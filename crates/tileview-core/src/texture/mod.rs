//! GPU texture tiles for streaming large images.

pub mod cache;
pub mod format;

pub use cache::{ChannelWindow, Tile, TileCache};
pub use format::{
    displayed_channels, select_format, PixelLayout, Precision, StorageFormat, TextureFormat,
    UploadType,
};
