use std::io::Write;

use tileview_core::render::{ColorMode, MouseMode, TileCacheConfig};
use tileview_core::{TileviewError, ViewerConfig, ViewerSettings};

// ---------------------------------------------------------------------------
// Defaults and Display
// ---------------------------------------------------------------------------

#[test]
fn test_default_settings() {
    let s = ViewerSettings::default();
    assert_eq!(s.color_mode, ColorMode::Rgba);
    assert_eq!(s.mouse_mode, MouseMode::Zoom);
    assert_eq!((s.closeup_pixels, s.closeup_avg_pixels), (13, 11));
    assert!(s.linear_interpolation);
    assert!(!s.pixelview && !s.probeview && !s.area_sample_mode);
}

#[test]
fn test_default_tiles() {
    let t = TileCacheConfig::default();
    assert_eq!((t.tile_count, t.texture_size_ceiling, t.closeup_texture_size), (4, 4096, 256));
}

#[test]
fn test_color_mode_display() {
    assert_eq!(format!("{}", ColorMode::SingleChannel), "Single channel");
    assert_eq!(format!("{}", ColorMode::Heatmap), "Heatmap");
}

#[test]
fn test_mouse_mode_display() {
    assert_eq!(format!("{}", MouseMode::Pan), "Pan");
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

#[test]
fn test_normalized_makes_sizes_odd() {
    let s = ViewerSettings {
        closeup_pixels: 12,
        closeup_avg_pixels: 4,
        ..ViewerSettings::default()
    };
    let n = s.normalized();
    assert_eq!((n.closeup_pixels, n.closeup_avg_pixels), (13, 5));
}

#[test]
fn test_normalized_caps_average_window() {
    let s = ViewerSettings {
        closeup_pixels: 5,
        closeup_avg_pixels: 9,
        ..ViewerSettings::default()
    };
    let n = s.normalized();
    assert_eq!((n.closeup_pixels, n.closeup_avg_pixels), (5, 5));

    let zero = ViewerSettings {
        closeup_pixels: 0,
        closeup_avg_pixels: 0,
        ..ViewerSettings::default()
    };
    let n = zero.normalized();
    assert_eq!((n.closeup_pixels, n.closeup_avg_pixels), (1, 1));
}

// ---------------------------------------------------------------------------
// TOML
// ---------------------------------------------------------------------------

#[test]
fn test_default_config_round_trips_through_toml() {
    let config = ViewerConfig::default();
    let text = toml::to_string_pretty(&config).unwrap();
    assert!(text.contains("[settings]"));
    assert!(text.contains("[tiles]"));
    assert_eq!(ViewerConfig::from_toml_str(&text).unwrap(), config);
}

#[test]
fn test_partial_config_fills_defaults() {
    let config = ViewerConfig::from_toml_str("[settings]\ncolor_mode = \"Heatmap\"\n").unwrap();
    assert_eq!(config.settings.color_mode, ColorMode::Heatmap);
    assert_eq!(config.settings.closeup_pixels, 13);
    assert_eq!(config.tiles, TileCacheConfig::default());
}

#[test]
fn test_empty_config_is_default() {
    assert_eq!(ViewerConfig::from_toml_str("").unwrap(), ViewerConfig::default());
}

#[test]
fn test_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[tiles]\ntile_count = 8\n\n[settings]\nmouse_mode = \"Pan\"").unwrap();
    let config = ViewerConfig::load(file.path()).unwrap();
    assert_eq!(config.tiles.tile_count, 8);
    assert_eq!(config.settings.mouse_mode, MouseMode::Pan);
}

#[test]
fn test_load_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = ViewerConfig::load(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, TileviewError::Io(_)));
}

#[test]
fn test_malformed_toml_is_config_error() {
    let err = ViewerConfig::from_toml_str("[settings\ncolor_mode = ").unwrap_err();
    assert!(matches!(err, TileviewError::Config(_)));
}

#[test]
fn test_unknown_color_mode_is_config_error() {
    let err = ViewerConfig::from_toml_str("[settings]\ncolor_mode = \"Sepia\"\n").unwrap_err();
    assert!(matches!(err, TileviewError::Config(_)));
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[test]
fn test_zero_tiles_rejected() {
    let err = ViewerConfig::from_toml_str("[tiles]\ntile_count = 0\n").unwrap_err();
    assert!(matches!(err, TileviewError::InvalidSettings(_)));
}

#[test]
fn test_zero_ceiling_rejected() {
    let config = ViewerConfig {
        tiles: TileCacheConfig {
            texture_size_ceiling: 0,
            ..TileCacheConfig::default()
        },
        ..ViewerConfig::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_closeup_texture_must_hold_closeup() {
    let err = ViewerConfig::from_toml_str("[tiles]\ncloseup_texture_size = 8\n").unwrap_err();
    let message = err.to_string();
    assert!(message.contains("closeup_texture_size 8"), "{message}");

    // 12 normalizes to 13, which still fits.
    let ok = ViewerConfig::from_toml_str(
        "[settings]\ncloseup_pixels = 12\n\n[tiles]\ncloseup_texture_size = 13\n",
    );
    assert!(ok.is_ok());
}
