use console::Style;
use tileview_core::backend::DisplayListBackend;
use tileview_core::inspector::InspectorReport;
use tileview_core::transform::ViewState;
use tileview_core::FrameReport;

struct Styles {
    title: Style,
    label: Style,
    value: Style,
    method: Style,
    disabled: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            method: Style::new().green(),
            disabled: Style::new().dim().yellow(),
        }
    }
}

fn print_title(s: &Styles, title: &str) {
    println!();
    println!("  {}", s.title.apply_to(title));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(title.chars().count())));
    println!();
}

pub fn print_frame_report(frame: usize, report: &FrameReport, view: &ViewState) {
    let s = Styles::new();
    print_title(&s, &format!("Frame {frame}"));

    if !report.image_drawn {
        println!("  {:<14}{}", s.label.apply_to("Image"), s.disabled.apply_to("none"));
        println!();
        return;
    }

    println!("  {:<14}{}", s.label.apply_to("Colour path"), s.method.apply_to(report.color_path));
    println!(
        "  {:<14}{}",
        s.label.apply_to("View"),
        s.value.apply_to(format!(
            "centre ({:.1}, {:.1}) zoom {}",
            view.center_x, view.center_y, view.zoom
        ))
    );
    println!("  {:<14}{}", s.label.apply_to("Tiles drawn"), s.value.apply_to(report.tiles_drawn));
    println!("  {:<14}{}", s.label.apply_to("Uploaded"), s.value.apply_to(report.tiles_uploaded));
    if report.tiles_skipped > 0 {
        println!(
            "  {:<14}{}",
            s.label.apply_to("Skipped"),
            s.disabled.apply_to(report.tiles_skipped)
        );
    }
    println!(
        "  {:<14}{}",
        s.label.apply_to("Wait cursor"),
        s.value.apply_to(if report.wait_cursor { "yes" } else { "no" })
    );
    println!();
}

pub fn print_display_list_totals(backend: &DisplayListBackend) {
    let s = Styles::new();
    println!(
        "  {:<14}{}",
        s.label.apply_to("Commands"),
        s.value.apply_to(backend.commands().len())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Totals"),
        s.value.apply_to(format!(
            "{} uploads, {} uniform sets, {} textures",
            backend.upload_count(),
            backend.uniform_set_count(),
            backend.texture_count()
        ))
    );
    println!();
}

#[cfg(feature = "gpu")]
pub fn print_gpu_frame(adapter: &str, text_runs: usize) {
    let s = Styles::new();
    println!("  {:<14}{}", s.label.apply_to("Adapter"), s.method.apply_to(adapter));
    println!("  {:<14}{}", s.label.apply_to("Text runs"), s.value.apply_to(text_runs));
    println!();
}

pub fn print_inspector(report: &InspectorReport) {
    let s = Styles::new();
    print_title(&s, "Pixel Inspector");

    if !report.inside_image {
        println!("  {}", s.disabled.apply_to("pointer is outside the image"));
    }
    let region = report.region;
    println!(
        "  {:<14}{}",
        s.label.apply_to("Region"),
        s.value.apply_to(format!(
            "[{},{}) x [{},{})",
            region.xbegin, region.xend, region.ybegin, region.yend
        ))
    );
    println!();

    let mut merged: Vec<(usize, String)> = Vec::new();
    for run in &report.lines {
        match merged.last_mut() {
            Some((line, text)) if *line == run.line => *text = overlay(text, &run.text),
            _ => merged.push((run.line, run.text.clone())),
        }
    }
    for (_, text) in merged {
        println!("  {}", text.trim_end());
    }
    println!();
}

/// Runs sharing a line are drawn over each other in the viewer. Non-space
/// characters of `top` win.
fn overlay(base: &str, top: &str) -> String {
    let mut out: Vec<char> = base.chars().collect();
    for (i, c) in top.chars().enumerate() {
        if i >= out.len() {
            out.push(c);
        } else if c != ' ' {
            out[i] = c;
        }
    }
    out.into_iter().collect()
}

pub fn print_probe(text: &str) {
    let s = Styles::new();
    print_title(&s, "Area Probe");
    for line in text.lines().skip(1) {
        println!("  {}", s.value.apply_to(line));
    }
    println!();
}
