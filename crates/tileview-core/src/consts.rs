/// Number of GPU tiles in the texture ring.
pub const DEFAULT_TILE_COUNT: usize = 4;

/// Hard ceiling on tile dimensions, applied on top of the driver's reported
/// maximum. Systems capable of 8k^2 textures cannot necessarily afford
/// several of them at once.
pub const TEXTURE_SIZE_CEILING: u32 = 4096;

/// Side length of the dedicated closeup texture.
pub const CLOSEUP_TEXTURE_SIZE: u32 = 256;

/// On-screen side length of the magnifier, independent of the pixel count.
pub const CLOSEUP_WINDOW_SIZE: f32 = 256.0;

/// Height of one line of overlay text, in window pixels.
pub const TEXT_LINE_HEIGHT: f32 = 18.0;

/// Distance between the cursor and the magnifier when it follows the mouse.
pub const FOLLOW_MOUSE_OFFSET: f32 = 15.0;

/// Height reserved for the host's status bar below the viewport.
pub const STATUS_BAR_HEIGHT: f32 = 15.0;

/// Gap between the docked magnifier and the viewport corner.
pub const CORNER_MARGIN: f32 = 5.0;

/// Length of each arm of the corner bracket markers.
pub const CORNER_MARKER_SIZE: f32 = 4.0;

/// Channel names longer than this are ellipsized in the stats table.
pub const MAX_CHANNEL_NAME_LENGTH: usize = 10;

/// Zoom limits for step zooming (power-of-two steps).
pub const MAX_STEP_ZOOM: f32 = 64.0;
pub const MIN_STEP_ZOOM: f32 = 1.0 / 64.0;

/// Zoom limits for continuous drag zooming.
pub const MIN_DRAG_ZOOM: f32 = 0.01;
pub const MAX_DRAG_ZOOM: f32 = 256.0;

/// Zoom change per window pixel of drag distance.
pub const DRAG_ZOOM_RATE: f32 = 0.005;

/// Wheel deltas (degrees) at or below this are ignored.
pub const SCROLL_DEADZONE_DEGREES: f32 = 2.0;

/// Background clear colour of the viewport.
pub const CLEAR_COLOR: [f32; 4] = [0.05, 0.05, 0.05, 1.0];

/// Number of staging slots alternated between tile uploads.
pub const STAGING_SLOTS: usize = 2;
