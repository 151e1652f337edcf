mod common;

use tileview_core::backend::{Capabilities, DisplayListBackend, DrawCommand};
use tileview_core::render::{ColorMode, TileCacheConfig};
use tileview_core::source::{BaseType, ColorSpace, ImageSource};
use tileview_core::texture::{
    displayed_channels, select_format, ChannelWindow, PixelLayout, Precision, TileCache,
    UploadType,
};

fn all_channels(image: &dyn ImageSource) -> ChannelWindow {
    ChannelWindow {
        begin: 0,
        count: image.spec().nchannels,
    }
}

fn ready_cache(
    backend: &mut DisplayListBackend,
    image: &dyn ImageSource,
    config: TileCacheConfig,
) -> TileCache {
    let mut cache = TileCache::new(config);
    cache.ensure_tiles(backend).unwrap();
    cache.reset_tile_format(backend, image.spec(), all_channels(image)).unwrap();
    cache
}

fn staging_slots(commands: &[DrawCommand]) -> Vec<usize> {
    commands
        .iter()
        .filter_map(|c| match c {
            DrawCommand::Upload { staging_slot, .. } => Some(*staging_slot),
            _ => None,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Allocation
// ---------------------------------------------------------------------------

#[test]
fn test_ensure_tiles_is_idempotent() {
    let mut backend = DisplayListBackend::default();
    let mut cache = TileCache::new(TileCacheConfig::default());
    cache.ensure_tiles(&mut backend).unwrap();
    cache.ensure_tiles(&mut backend).unwrap();
    assert_eq!(cache.tiles().len(), 4);
    // Four tiles plus the closeup texture.
    assert_eq!(backend.texture_count(), 5);
}

#[test]
fn test_release_then_ensure_allocates_afresh() {
    let mut backend = DisplayListBackend::default();
    let mut cache = TileCache::new(TileCacheConfig::default());
    cache.ensure_tiles(&mut backend).unwrap();
    cache.release(&mut backend);
    assert_eq!(backend.texture_count(), 0);
    cache.ensure_tiles(&mut backend).unwrap();
    assert_eq!(backend.texture_count(), 5);
}

#[test]
fn test_tile_size_is_next_power_of_two() {
    let image = common::ramp_u8(100, 60, 3);
    let mut backend = DisplayListBackend::default();
    let cache = ready_cache(&mut backend, &image, TileCacheConfig::default());
    assert_eq!(cache.tile_size(), (128, 64));
    let texture = backend.texture(cache.tiles()[0].texture).unwrap();
    assert_eq!((texture.width, texture.height), (128, 64));
}

#[test]
fn test_tile_size_capped_by_ceiling_and_device_limit() {
    let image = common::ramp_u8(300, 300, 1);
    let mut backend = DisplayListBackend::default();
    let config = TileCacheConfig {
        texture_size_ceiling: 128,
        ..TileCacheConfig::default()
    };
    let cache = ready_cache(&mut backend, &image, config);
    assert_eq!(cache.tile_size(), (128, 128));

    let mut small = DisplayListBackend::new(Capabilities {
        max_texture_size: 64,
        ..Capabilities::default()
    });
    let config = TileCacheConfig {
        closeup_texture_size: 64,
        ..TileCacheConfig::default()
    };
    let cache = ready_cache(&mut small, &image, config);
    assert_eq!(cache.max_texture_size(), 64);
    assert_eq!(cache.tile_size(), (64, 64));
}

// ---------------------------------------------------------------------------
// Hits and misses
// ---------------------------------------------------------------------------

#[test]
fn test_repeated_load_is_a_hit() {
    let image = common::ramp_u8(100, 100, 3);
    let mut backend = DisplayListBackend::default();
    let mut cache = ready_cache(&mut backend, &image, TileCacheConfig::default());

    let first = cache.load_tile(&mut backend, &image, 0, 0, 100, 100).unwrap();
    let second = cache.load_tile(&mut backend, &image, 0, 0, 100, 100).unwrap();
    assert!(first.is_some());
    assert_eq!(first, second);
    assert_eq!(cache.fetch_count(), 1);
    assert_eq!(backend.upload_count(), 1);
}

#[test]
fn test_smaller_region_at_same_origin_is_a_hit() {
    let image = common::ramp_u8(100, 100, 1);
    let mut backend = DisplayListBackend::default();
    let mut cache = ready_cache(&mut backend, &image, TileCacheConfig::default());

    cache.load_tile(&mut backend, &image, 0, 0, 64, 64).unwrap();
    cache.load_tile(&mut backend, &image, 0, 0, 32, 16).unwrap();
    assert_eq!(cache.fetch_count(), 1);

    // Same extent, different origin.
    cache.load_tile(&mut backend, &image, 1, 0, 32, 16).unwrap();
    assert_eq!(cache.fetch_count(), 2);
}

#[test]
fn test_ring_overwrites_oldest_slot() {
    let image = common::ramp_u8(100, 100, 1);
    let mut backend = DisplayListBackend::default();
    let mut cache = ready_cache(&mut backend, &image, TileCacheConfig::default());

    let textures: Vec<_> = (0..5)
        .map(|i| cache.load_tile(&mut backend, &image, i, 0, 8, 8).unwrap().unwrap())
        .collect();
    assert_eq!(textures[4], textures[0]);
    assert_eq!(cache.fetch_count(), 5);
    assert!(cache.tiles().len() <= 4);

    // Region 0 was evicted, region 4 is resident.
    cache.load_tile(&mut backend, &image, 4, 0, 8, 8).unwrap();
    assert_eq!(cache.fetch_count(), 5);
    cache.load_tile(&mut backend, &image, 0, 0, 8, 8).unwrap();
    assert_eq!(cache.fetch_count(), 6);
}

#[test]
fn test_uploaded_bytes_match_region() {
    let image = common::ramp_u8(10, 10, 1);
    let mut backend = DisplayListBackend::default();
    let mut cache = ready_cache(&mut backend, &image, TileCacheConfig::default());

    let texture = cache.load_tile(&mut backend, &image, 2, 3, 2, 2).unwrap().unwrap();
    assert_eq!(backend.texture(texture).unwrap().data, vec![32, 33, 42, 43]);
}

#[test]
fn test_channel_window_uploads_only_displayed_channels() {
    let image = common::ramp_f32(4, 4, 4);
    let mut backend = DisplayListBackend::default();
    let mut cache = TileCache::new(TileCacheConfig::default());
    cache.ensure_tiles(&mut backend).unwrap();
    cache
        .reset_tile_format(&mut backend, image.spec(), ChannelWindow { begin: 2, count: 1 })
        .unwrap();

    let texture = cache.load_tile(&mut backend, &image, 0, 0, 2, 1).unwrap().unwrap();
    let data = &backend.texture(texture).unwrap().data;
    assert_eq!(data.len(), 2 * 4);
    assert_eq!(cache.format().unwrap().layout, PixelLayout::Luminance);
}

#[test]
fn test_staging_slots_alternate() {
    let image = common::ramp_u8(100, 100, 1);
    let mut backend = DisplayListBackend::default();
    let mut cache = ready_cache(&mut backend, &image, TileCacheConfig::default());
    backend.take_commands();

    for i in 0..4 {
        cache.load_tile(&mut backend, &image, i, 0, 8, 8).unwrap();
    }
    assert_eq!(staging_slots(backend.commands()), vec![0, 1, 0, 1]);
}

#[test]
fn test_failed_fetch_invalidates_slot() {
    let image = common::ramp_u8(10, 10, 1);
    let mut backend = DisplayListBackend::default();
    let mut cache = ready_cache(&mut backend, &image, TileCacheConfig::default());

    // Extends past the data window.
    assert!(cache.load_tile(&mut backend, &image, 8, 8, 4, 4).is_err());
    assert_eq!(cache.tiles()[0].width, 0);
    assert_eq!(backend.upload_count(), 0);
}

#[test]
fn test_unsupported_channel_count_draws_nothing() {
    let image = common::ramp_u8(8, 8, 5);
    let mut backend = DisplayListBackend::default();
    let mut cache = ready_cache(&mut backend, &image, TileCacheConfig::default());
    assert!(cache.format().is_none());
    assert_eq!(cache.load_tile(&mut backend, &image, 0, 0, 8, 8).unwrap(), None);
}

// ---------------------------------------------------------------------------
// Format selection
// ---------------------------------------------------------------------------

#[test]
fn test_format_u8_srgb() {
    let f = select_format(BaseType::U8, ColorSpace::Srgb, 3, &Capabilities::default());
    assert_eq!(f.upload, UploadType::U8);
    assert_eq!(f.layout, PixelLayout::Rgb);
    assert!(f.storage.srgb);
    assert_eq!(f.storage.precision, Precision::Unorm8);
}

#[test]
fn test_format_u16_linear_is_unorm16() {
    let f = select_format(BaseType::U16, ColorSpace::Linear, 1, &Capabilities::default());
    assert_eq!(f.upload, UploadType::U16);
    assert_eq!(f.storage.precision, Precision::Unorm16);
    assert!(!f.storage.srgb);
}

#[test]
fn test_format_srgb_wide_data_uses_generic_storage() {
    let f = select_format(BaseType::U16, ColorSpace::Srgb, 4, &Capabilities::default());
    assert!(f.storage.srgb);
    assert_eq!(f.storage.precision, Precision::Generic);
}

#[test]
fn test_format_srgb_ignored_without_capability() {
    let caps = Capabilities {
        srgb: false,
        ..Capabilities::default()
    };
    let f = select_format(BaseType::U8, ColorSpace::Srgb, 4, &caps);
    assert!(!f.storage.srgb);
}

#[test]
fn test_format_half_needs_half_float_support() {
    let caps = Capabilities {
        half_float: false,
        ..Capabilities::default()
    };
    let f = select_format(BaseType::F16, ColorSpace::Linear, 3, &caps);
    assert_eq!(f.upload, UploadType::Invalid);
    assert!(!f.is_valid());

    let f = select_format(BaseType::F16, ColorSpace::Linear, 3, &Capabilities::default());
    assert_eq!(f.upload, UploadType::F16);
    assert_eq!(f.storage.precision, Precision::Float16);
}

#[test]
fn test_format_double_narrows_to_float() {
    let f = select_format(BaseType::F64, ColorSpace::Linear, 2, &Capabilities::default());
    assert_eq!(f.upload, UploadType::F32);
    assert_eq!(f.fetch, BaseType::F32);
    assert_eq!(f.layout, PixelLayout::LuminanceAlpha);
    assert_eq!(f.storage.precision, Precision::Float32);
}

#[test]
fn test_format_float_without_float_textures_is_generic() {
    let caps = Capabilities {
        float: false,
        ..Capabilities::default()
    };
    let f = select_format(BaseType::F32, ColorSpace::Linear, 4, &caps);
    assert_eq!(f.storage.precision, Precision::Generic);
    assert!(f.is_valid());
}

#[test]
fn test_format_rejects_five_channels() {
    let f = select_format(BaseType::U8, ColorSpace::Linear, 5, &Capabilities::default());
    assert_eq!(f.layout, PixelLayout::Invalid);
    assert!(!f.is_valid());
}

#[test]
fn test_format_bytes_per_pixel() {
    let f = select_format(BaseType::U16, ColorSpace::Linear, 3, &Capabilities::default());
    assert_eq!(f.bytes_per_pixel(), 6);
}

#[test]
fn test_displayed_channels_follow_colour_mode() {
    assert_eq!(displayed_channels(0, 4, ColorMode::Rgba), 4);
    assert_eq!(displayed_channels(1, 4, ColorMode::Rgb), 3);
    assert_eq!(displayed_channels(2, 3, ColorMode::Luminance), 1);
    assert_eq!(displayed_channels(2, 3, ColorMode::Heatmap), 1);
}

#[test]
fn test_displayed_channels_past_last_channel_is_empty() {
    for mode in [
        ColorMode::Rgba,
        ColorMode::Rgb,
        ColorMode::Luminance,
        ColorMode::SingleChannel,
        ColorMode::Heatmap,
    ] {
        assert_eq!(displayed_channels(5, 3, mode), 0, "{mode:?}");
    }
}

#[test]
fn test_empty_channel_window_loads_nothing() {
    let image = common::ramp_u8(8, 8, 3);
    let mut backend = DisplayListBackend::default();
    let mut cache = TileCache::new(TileCacheConfig::default());
    cache.ensure_tiles(&mut backend).unwrap();
    cache
        .reset_tile_format(&mut backend, image.spec(), ChannelWindow { begin: 3, count: 0 })
        .unwrap();

    assert_eq!(cache.load_tile(&mut backend, &image, 0, 0, 8, 8).unwrap(), None);
    assert_eq!(cache.fetch_count(), 0);
}
