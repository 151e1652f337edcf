use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use tileview_core::source::ImageSource;

#[derive(Args)]
pub struct InfoArgs {
    /// Input image file
    pub file: PathBuf,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    let image = super::open_image(&args.file)?;
    let spec = image.spec();

    println!("File:         {}", args.file.display());
    println!("Dimensions:   {}x{}", spec.width, spec.height);
    println!("Data window:  ({},{}) {}x{}", spec.x, spec.y, spec.width, spec.height);
    println!(
        "Display:      ({},{}) {}x{}",
        spec.full_x, spec.full_y, spec.full_width, spec.full_height
    );
    println!("Channels:     {} ({})", spec.nchannels, spec.channel_names.join(", "));
    println!("Format:       {:?}", spec.format);
    println!("Color space:  {:?}", spec.color_space);
    println!("Orientation:  {} ({:?})", spec.orientation.tag(), spec.orientation);

    let bytes = spec.pixel_bytes() * spec.width as usize * spec.height as usize;
    println!("Data size:    {:.1} MB", bytes as f64 / (1024.0 * 1024.0));

    Ok(())
}
