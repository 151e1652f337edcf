use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;
use tileview_core::backend::DisplayListBackend;
use tileview_core::render::Modifiers;

use super::ViewerArgs;

#[derive(Args)]
pub struct InspectArgs {
    /// Input image file
    pub file: PathBuf,

    /// Pointer x in window pixels
    #[arg(long)]
    pub x: i32,

    /// Pointer y in window pixels
    #[arg(long)]
    pub y: i32,

    /// Source pixels across the magnifier (odd)
    #[arg(long)]
    pub closeup: Option<u32>,

    /// Source pixels across the averaging window (odd)
    #[arg(long)]
    pub average: Option<u32>,

    #[command(flatten)]
    pub viewer: ViewerArgs,
}

pub fn run(args: &InspectArgs) -> Result<()> {
    let mut config = args.viewer.viewer_config()?;
    config.settings.pixelview = true;
    if let Some(n) = args.closeup {
        config.settings.closeup_pixels = n;
    }
    if let Some(n) = args.average {
        config.settings.closeup_avg_pixels = n;
    }
    config.validate()?;

    let image = super::open_image(&args.file)?;
    let backend = DisplayListBackend::default();
    let mut viewer = super::build_viewer(backend, image, &config, &args.viewer)?;
    viewer.on_pointer_move(args.x, args.y, Modifiers::NONE);
    let report = viewer.render();

    let Some(inspector) = report.inspector else {
        bail!("Inspector produced no output");
    };
    crate::summary::print_inspector(&inspector);
    Ok(())
}
