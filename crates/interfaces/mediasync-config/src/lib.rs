//! Central configuration constants for runtime limits and defaults.

/// Default number of candidates buffered between a browser and the driver.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 16;

/// Minimum allowed candidate buffer.
pub const MIN_CHANNEL_CAPACITY: usize = 1;

/// Maximum allowed candidate buffer.
pub const MAX_CHANNEL_CAPACITY: usize = 512;

/// Takeout cuts sidecar file names (including `.json`) to this many characters.
pub const DEFAULT_SIDECAR_NAME_LIMIT: usize = 51;

/// Shortest sidecar stem accepted by the prefix fallback when pairing
/// truncated Takeout names.
pub const DEFAULT_MIN_SIDECAR_PREFIX: usize = 8;

/// Convenience function to clamp a buffer size into the allowed range.
pub fn clamp_channel_capacity(v: usize) -> usize {
    v.clamp(MIN_CHANNEL_CAPACITY, MAX_CHANNEL_CAPACITY)
}
