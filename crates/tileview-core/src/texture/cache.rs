use tracing::{debug, warn};

use super::format::{select_format, TextureFormat};
use crate::backend::{Filter, RenderBackend, TextureId};
use crate::consts::STAGING_SLOTS;
use crate::error::{Result, TileviewError};
use crate::render::settings::TileCacheConfig;
use crate::source::{ImageSource, ImageSpec, Roi};

/// One GPU tile and the image region it currently holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tile {
    pub texture: TextureId,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Tile {
    /// Whether this tile already holds the `width` x `height` region at `(x, y)`.
    pub fn covers(&self, x: i32, y: i32, width: i32, height: i32) -> bool {
        self.x == x && self.y == y && self.width >= width && self.height >= height
    }
}

/// Channels uploaded for the current image, as a sub-range of its channels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelWindow {
    pub begin: usize,
    pub count: usize,
}

/// Fixed ring of tile textures plus the closeup texture.
///
/// A miss overwrites the tile under the round-robin write cursor. Tiles are
/// allocated once and live until [`TileCache::release`].
#[derive(Debug)]
pub struct TileCache {
    config: TileCacheConfig,
    tiles: Vec<Tile>,
    next: usize,
    closeup: Option<TextureId>,
    max_texture_size: u32,
    tile_width: i32,
    tile_height: i32,
    format: Option<TextureFormat>,
    channels: ChannelWindow,
    scratch: Vec<u8>,
    closeup_scratch: Vec<u8>,
    staging_slot: usize,
    fetches: usize,
}

impl TileCache {
    pub fn new(config: TileCacheConfig) -> Self {
        Self {
            config,
            tiles: Vec::new(),
            next: 0,
            closeup: None,
            max_texture_size: config.texture_size_ceiling,
            tile_width: 1,
            tile_height: 1,
            format: None,
            channels: ChannelWindow { begin: 0, count: 0 },
            scratch: Vec::new(),
            closeup_scratch: Vec::new(),
            staging_slot: 0,
            fetches: 0,
        }
    }

    /// Allocate the tile ring and the closeup texture. No-op once done.
    pub fn ensure_tiles<B: RenderBackend + ?Sized>(&mut self, backend: &mut B) -> Result<()> {
        if !self.tiles.is_empty() {
            return Ok(());
        }
        let count = self.config.tile_count.max(1);
        self.max_texture_size = backend
            .capabilities()
            .max_texture_size
            .min(self.config.texture_size_ceiling)
            .max(1);
        for _ in 0..count {
            let texture = backend.create_texture(Filter::Linear)?;
            self.tiles.push(Tile {
                texture,
                x: 0,
                y: 0,
                width: 0,
                height: 0,
            });
        }
        self.closeup = Some(backend.create_texture(Filter::Nearest)?);
        debug!(
            "Allocated {count} tiles, max texture size {}",
            self.max_texture_size
        );
        Ok(())
    }

    /// Delete every texture. [`TileCache::ensure_tiles`] allocates afresh.
    pub fn release<B: RenderBackend + ?Sized>(&mut self, backend: &mut B) {
        for tile in self.tiles.drain(..) {
            backend.delete_texture(tile.texture);
        }
        if let Some(closeup) = self.closeup.take() {
            backend.delete_texture(closeup);
        }
        self.next = 0;
        self.format = None;
    }

    /// Size tile storage for `spec` and upload `channels` of every pixel.
    ///
    /// Tile dimensions are the image dimensions rounded up to a power of two,
    /// capped at the maximum texture size. Cached regions are forgotten. A
    /// zero-width channel window or an unsupported format leaves the cache
    /// without a format, and every later load draws nothing.
    pub fn reset_tile_format<B: RenderBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        spec: &ImageSpec,
        channels: ChannelWindow,
    ) -> Result<()> {
        for tile in &mut self.tiles {
            tile.width = 0;
            tile.height = 0;
        }
        self.channels = channels;
        self.format = None;
        if channels.count == 0 {
            return Ok(());
        }

        let caps = backend.capabilities();
        let format = select_format(spec.format, spec.color_space, channels.count, &caps);
        if !format.is_valid() {
            warn!(
                "No texture format for {} {:?} channels, image will not be drawn",
                channels.count, spec.format
            );
            return Ok(());
        }

        let max = self.max_texture_size as i32;
        self.tile_width = ceil_pow2(spec.width).clamp(1, max);
        self.tile_height = ceil_pow2(spec.height).clamp(1, max);

        let (width, height) = (self.tile_width as u32, self.tile_height as u32);
        for tile in &self.tiles {
            backend.allocate_texture(tile.texture, width, height, &format)?;
        }
        if let Some(closeup) = self.closeup {
            let side = self.config.closeup_texture_size;
            backend.allocate_texture(closeup, side, side, &format)?;
        }

        let max_tile_bytes =
            self.tile_width as usize * self.tile_height as usize * format.bytes_per_pixel();
        self.scratch.resize(max_tile_bytes, 0);
        self.format = Some(format);
        debug!(
            "Tile format reset to {}x{} {:?}, channels {}..{}",
            self.tile_width,
            self.tile_height,
            format.storage,
            channels.begin,
            channels.begin + channels.count
        );
        Ok(())
    }

    /// Texture holding the `width` x `height` region at `(x, y)`, uploading it
    /// on a miss. `Ok(None)` when the cache has no usable format.
    pub fn load_tile<B: RenderBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        image: &dyn ImageSource,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    ) -> Result<Option<TextureId>> {
        if let Some(tile) = self.tiles.iter().find(|t| t.covers(x, y, width, height)) {
            debug!("Tile hit at ({x},{y}) {width}x{height}");
            return Ok(Some(tile.texture));
        }
        let Some(format) = self.format else {
            return Ok(None);
        };
        if self.tiles.is_empty() {
            return Ok(None);
        }
        if width > self.tile_width || height > self.tile_height {
            return Err(TileviewError::RegionOutOfBounds {
                xbegin: x,
                xend: x + width,
                ybegin: y,
                yend: y + height,
            });
        }

        let index = self.next;
        self.next = (self.next + 1) % self.tiles.len();
        let texture = self.tiles[index].texture;
        debug!("Tile miss at ({x},{y}) {width}x{height}, loading into slot {index}");

        let roi = Roi::new(x, x + width, y, y + height)
            .with_channels(self.channels.begin, self.channels.begin + self.channels.count);
        let needed = roi.npixels() * format.bytes_per_pixel();
        self.fetches += 1;
        let uploaded = image
            .get_pixels(roi, format.fetch, &mut self.scratch[..needed])
            .and_then(|_| {
                backend.upload_texture(
                    texture,
                    width as u32,
                    height as u32,
                    &format,
                    self.staging_slot,
                    &self.scratch[..needed],
                )
            });
        self.staging_slot = (self.staging_slot + 1) % STAGING_SLOTS;

        let tile = &mut self.tiles[index];
        match uploaded {
            Ok(()) => {
                tile.x = x;
                tile.y = y;
                tile.width = width;
                tile.height = height;
                Ok(Some(texture))
            }
            Err(e) => {
                tile.width = 0;
                tile.height = 0;
                Err(e)
            }
        }
    }

    /// Upload `roi` (stored-image pixels) into the closeup texture. The region
    /// must fit the closeup texture.
    pub fn upload_closeup<B: RenderBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        image: &dyn ImageSource,
        roi: Roi,
    ) -> Result<Option<TextureId>> {
        let (Some(format), Some(closeup)) = (self.format, self.closeup) else {
            return Ok(None);
        };
        let side = self.config.closeup_texture_size as i32;
        if roi.is_empty() || roi.width() > side || roi.height() > side {
            return Ok(None);
        }
        let roi = roi.with_channels(self.channels.begin, self.channels.begin + self.channels.count);
        let needed = roi.npixels() * format.bytes_per_pixel();
        self.closeup_scratch.resize(needed, 0);
        image.get_pixels(roi, format.fetch, &mut self.closeup_scratch)?;
        backend.upload_texture(
            closeup,
            roi.width() as u32,
            roi.height() as u32,
            &format,
            self.staging_slot,
            &self.closeup_scratch,
        )?;
        self.staging_slot = (self.staging_slot + 1) % STAGING_SLOTS;
        Ok(Some(closeup))
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn tile_size(&self) -> (i32, i32) {
        (self.tile_width, self.tile_height)
    }

    pub fn max_texture_size(&self) -> u32 {
        self.max_texture_size
    }

    pub fn closeup_texture(&self) -> Option<TextureId> {
        self.closeup
    }

    pub fn closeup_texture_size(&self) -> u32 {
        self.config.closeup_texture_size
    }

    pub fn format(&self) -> Option<TextureFormat> {
        self.format
    }

    pub fn channels(&self) -> ChannelWindow {
        self.channels
    }

    /// Pixel fetches issued by tile loads since creation.
    pub fn fetch_count(&self) -> usize {
        self.fetches
    }

    /// Staging slot the next upload will use.
    pub fn staging_slot(&self) -> usize {
        self.staging_slot
    }
}

/// Smallest power of two not below `n` (1 for non-positive `n`).
fn ceil_pow2(n: i32) -> i32 {
    if n <= 1 {
        1
    } else {
        (n as u32).next_power_of_two().min(1 << 30) as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ceil_pow2() {
        assert_eq!(ceil_pow2(0), 1);
        assert_eq!(ceil_pow2(100), 128);
        assert_eq!(ceil_pow2(256), 256);
    }
}
