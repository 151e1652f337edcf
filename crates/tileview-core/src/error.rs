use thiserror::Error;

#[derive(Error, Debug)]
pub enum TileviewError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image decoding error: {0}")]
    ImageError(#[from] ::image::ImageError),

    #[error("Region [{xbegin},{xend})x[{ybegin},{yend}) lies outside the image data window")]
    RegionOutOfBounds {
        xbegin: i32,
        xend: i32,
        ybegin: i32,
        yend: i32,
    },

    #[error("Channel range {begin}..{end} out of range (image has {nchannels} channels)")]
    ChannelRangeOutOfBounds {
        begin: usize,
        end: usize,
        nchannels: usize,
    },

    #[error("Output buffer too small: need {needed} bytes, got {actual}")]
    BufferTooSmall { needed: usize, actual: usize },

    #[error("Unsupported channel count: {0} (expected 1-4)")]
    UnsupportedChannelCount(usize),

    #[error("Invalid image dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("Shader compile failed ({stage}): {log}")]
    ShaderCompile { stage: String, log: String },

    #[error("Shader link failed: {0}")]
    ShaderLink(String),

    #[error("Unknown texture handle {0}")]
    UnknownTexture(u32),

    #[error("GPU error: {0}")]
    GpuError(String),

    #[error("Config parse error: {0}")]
    Config(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, TileviewError>;
