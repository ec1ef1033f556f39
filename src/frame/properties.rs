//! Frame geometry
//!
//! Width, height, bit depth, and channel count travel on the wire as a
//! comma-separated string (`"640,480,8,3"`). Trailing fields may be omitted
//! and fall back to the defaults, so `"320,240"` is a valid 3-channel 8-bit
//! geometry.

use std::fmt;

/// Pixel geometry of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameProperties {
    /// Width in pixels
    pub width: u16,
    /// Height in pixels
    pub height: u16,
    /// Bits per channel
    pub depth: u8,
    /// Channels per pixel (3 for color, 1 for grayscale)
    pub channels: u8,
}

impl Default for FrameProperties {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            depth: 8,
            channels: 3,
        }
    }
}

impl FrameProperties {
    /// Create properties with the given size and default depth/channels.
    pub fn with_size(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    /// Byte length of one frame with this geometry.
    pub fn frame_size(&self) -> usize {
        let bytes_per_channel = (self.depth as usize).div_ceil(8);
        self.width as usize * self.height as usize * self.channels as usize * bytes_per_channel
    }

    /// Parse the wire form `"width,height,depth,channels"`.
    ///
    /// One to four fields; omitted trailing fields keep their defaults.
    /// Returns `None` for empty input, excess fields, or non-numeric values.
    pub fn parse(s: &str) -> Option<Self> {
        let mut properties = Self::default();
        let mut fields = 0;

        for (i, item) in s.split(',').enumerate() {
            match i {
                0 => properties.width = item.trim().parse().ok()?,
                1 => properties.height = item.trim().parse().ok()?,
                2 => properties.depth = item.trim().parse().ok()?,
                3 => properties.channels = item.trim().parse().ok()?,
                _ => return None,
            }
            fields += 1;
        }

        if fields == 0 {
            return None;
        }
        Some(properties)
    }
}

impl fmt::Display for FrameProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.width, self.height, self.depth, self.channels
        )
    }
}
