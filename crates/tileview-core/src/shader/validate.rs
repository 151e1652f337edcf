//! WGSL validation with naga.

/// Entry points found in a validated module.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryPoint {
    pub name: String,
    pub stage: naga::ShaderStage,
}

/// Parse and validate WGSL source. On failure the returned string is a
/// compiler log with the message followed by the numbered source.
pub fn validate_wgsl(source: &str) -> Result<Vec<EntryPoint>, String> {
    let module = naga::front::wgsl::parse_str(source)
        .map_err(|e| format_log(source, &e.emit_to_string(source)))?;

    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
        .validate(&module)
        .map_err(|e| format_log(source, &format!("{e:?}")))?;

    Ok(module
        .entry_points
        .iter()
        .map(|ep| EntryPoint {
            name: ep.name.clone(),
            stage: ep.stage,
        })
        .collect())
}

/// Whether `entry_points` has a function named `name` for `stage`.
pub fn has_entry_point(entry_points: &[EntryPoint], name: &str, stage: naga::ShaderStage) -> bool {
    entry_points.iter().any(|ep| ep.name == name && ep.stage == stage)
}

fn format_log(source: &str, message: &str) -> String {
    let mut log = String::new();
    log.push_str(message.trim_end());
    log.push_str("\n---\n");
    for (line_num, line) in source.lines().enumerate() {
        log.push_str(&format!("{:4} | {}\n", line_num + 1, line));
    }
    log.push_str("---\n");
    log
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_points_reported() {
        let source = r#"
@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(1.0, 0.0, 0.0, 1.0);
}
"#;
        let eps = validate_wgsl(source).unwrap();
        assert!(has_entry_point(&eps, "fs_main", naga::ShaderStage::Fragment));
        assert!(!has_entry_point(&eps, "vs_main", naga::ShaderStage::Vertex));
    }

    #[test]
    fn test_type_error_fails_with_log() {
        let source = "fn f() -> vec4<f32> { let x: vec4<f32> = 1.0; return x; }";
        let log = validate_wgsl(source).unwrap_err();
        assert!(log.contains("   1 | "));
    }
}
