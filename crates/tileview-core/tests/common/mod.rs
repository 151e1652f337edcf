use std::rc::Rc;

use tileview_core::backend::{Capabilities, DisplayListBackend, DrawCommand};
use tileview_core::source::{ImageSource, MemoryImage};
use tileview_core::{Viewer, ViewerConfig};

/// 8-bit image whose samples count up in raster order, wrapping at 256.
/// Every channel of a pixel holds the same value.
pub fn ramp_u8(width: i32, height: i32, nchannels: usize) -> MemoryImage {
    let data = (0..width * height)
        .flat_map(|i| std::iter::repeat((i % 256) as u8).take(nchannels))
        .collect();
    MemoryImage::from_u8(width, height, nchannels, data).expect("ramp image")
}

/// 8-bit image with every sample set to `value`.
pub fn uniform_u8(width: i32, height: i32, nchannels: usize, value: u8) -> MemoryImage {
    let data = vec![value; (width * height) as usize * nchannels];
    MemoryImage::from_u8(width, height, nchannels, data).expect("uniform image")
}

/// Float image holding `x + y * width` in every channel.
pub fn ramp_f32(width: i32, height: i32, nchannels: usize) -> MemoryImage {
    let data = (0..width * height)
        .flat_map(|i| std::iter::repeat(i as f32).take(nchannels))
        .collect();
    MemoryImage::from_f32(width, height, nchannels, data).expect("float ramp image")
}

/// A viewer over a recording backend with `image` bound, sized to the
/// given window.
pub fn viewer_with(image: MemoryImage, width: i32, height: i32) -> Viewer<DisplayListBackend> {
    viewer_with_config(image, width, height, &ViewerConfig::default(), Capabilities::default())
}

pub fn viewer_with_config(
    image: MemoryImage,
    width: i32,
    height: i32,
    config: &ViewerConfig,
    caps: Capabilities,
) -> Viewer<DisplayListBackend> {
    let mut viewer = Viewer::new(DisplayListBackend::new(caps), config);
    viewer.resize(width, height, 1.0);
    let image: Rc<dyn ImageSource> = Rc::new(image);
    viewer.bind_image(Some(image));
    viewer
}

/// Uniform names set since the backend's command list was last drained.
pub fn uniform_names(commands: &[DrawCommand]) -> Vec<String> {
    commands
        .iter()
        .filter_map(|c| match c {
            DrawCommand::SetUniform { name, .. } => Some(name.clone()),
            _ => None,
        })
        .collect()
}
