use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use tileview_core::backend::{DisplayListBackend, RenderBackend};
use tileview_core::Viewer;

use super::ViewerArgs;

#[derive(Args)]
pub struct RenderArgs {
    /// Input image file
    pub file: PathBuf,

    /// Centre the view on this image x
    #[arg(long)]
    pub center_x: Option<f32>,

    /// Centre the view on this image y
    #[arg(long)]
    pub center_y: Option<f32>,

    /// Render a second frame to show cache reuse
    #[arg(long)]
    pub twice: bool,

    /// Print every recorded draw command
    #[arg(long)]
    pub commands: bool,

    /// Render on the GPU into an offscreen target
    #[cfg(feature = "gpu")]
    #[arg(long)]
    pub gpu: bool,

    #[command(flatten)]
    pub viewer: ViewerArgs,
}

pub fn run(args: &RenderArgs) -> Result<()> {
    #[cfg(feature = "gpu")]
    if args.gpu {
        return gpu::run(args);
    }

    let config = args.viewer.viewer_config()?;
    let image = super::open_image(&args.file)?;
    let backend = DisplayListBackend::default();
    let mut viewer = super::build_viewer(backend, image, &config, &args.viewer)?;
    center_view(&mut viewer, args);

    let first = viewer.render();
    crate::summary::print_frame_report(1, &first, viewer.view());
    if args.twice {
        viewer.backend_mut().take_commands();
        let second = viewer.render();
        crate::summary::print_frame_report(2, &second, viewer.view());
    }
    crate::summary::print_display_list_totals(viewer.backend());

    if args.commands {
        for command in viewer.backend().commands() {
            println!("{command:?}");
        }
    }
    Ok(())
}

fn center_view<B: RenderBackend>(viewer: &mut Viewer<B>, args: &RenderArgs) {
    if args.center_x.is_none() && args.center_y.is_none() {
        return;
    }
    let view = viewer.view();
    let x = args.center_x.unwrap_or(view.center_x);
    let y = args.center_y.unwrap_or(view.center_y);
    viewer.center_on(x, y, true);
}

#[cfg(feature = "gpu")]
mod gpu {
    use anyhow::{Context, Result};
    use tileview_core::backend::wgpu_backend::WgpuBackend;

    use super::RenderArgs;

    const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

    pub fn run(args: &RenderArgs) -> Result<()> {
        let config = args.viewer.viewer_config()?;
        let image = crate::commands::open_image(&args.file)?;
        let backend = WgpuBackend::new(TARGET_FORMAT).context("No usable GPU adapter")?;
        let adapter = backend.adapter_name().to_string();
        let mut viewer = crate::commands::build_viewer(backend, image, &config, &args.viewer)?;
        super::center_view(&mut viewer, args);

        let (width, height) = (args.viewer.width.max(1) as u32, args.viewer.height.max(1) as u32);
        let target = viewer.backend().device().create_texture(&wgpu::TextureDescriptor {
            label: Some("tileview.offscreen"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = target.create_view(&wgpu::TextureViewDescriptor::default());

        let frames = if args.twice { 2 } else { 1 };
        for frame in 1..=frames {
            let report = viewer.render();
            viewer.backend_mut().present(&view, width, height).context("GPU present failed")?;
            let text_runs = viewer.backend_mut().take_text_runs().len();
            crate::summary::print_frame_report(frame, &report, viewer.view());
            crate::summary::print_gpu_frame(&adapter, text_runs);
        }
        viewer.teardown();
        Ok(())
    }
}
