use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use tileview_core::backend::DisplayListBackend;
use tileview_core::render::{Modifiers, PointerButton};

use super::ViewerArgs;

#[derive(Args)]
pub struct ProbeArgs {
    /// Input image file
    pub file: PathBuf,

    /// Selection start x in window pixels
    #[arg(long)]
    pub x0: i32,

    /// Selection start y in window pixels
    #[arg(long)]
    pub y0: i32,

    /// Selection end x in window pixels
    #[arg(long)]
    pub x1: i32,

    /// Selection end y in window pixels
    #[arg(long)]
    pub y1: i32,

    #[command(flatten)]
    pub viewer: ViewerArgs,
}

/// Drag a selection from `(x0, y0)` to `(x1, y1)` and print the probe.
pub fn run(args: &ProbeArgs) -> Result<()> {
    let mut config = args.viewer.viewer_config()?;
    config.settings.area_sample_mode = true;
    config.settings.probeview = true;

    let image = super::open_image(&args.file)?;
    let backend = DisplayListBackend::default();
    let mut viewer = super::build_viewer(backend, image, &config, &args.viewer)?;
    viewer.on_pointer_down(args.x0, args.y0, PointerButton::Left, Modifiers::NONE);
    viewer.on_pointer_move(args.x1, args.y1, Modifiers::NONE);
    viewer.on_pointer_up(args.x1, args.y1, PointerButton::Left, Modifiers::NONE);
    viewer.render();

    crate::summary::print_probe(viewer.probe_text());
    Ok(())
}
