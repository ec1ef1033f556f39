//! Frame buffer
//!
//! A [`Frame`] owns one image worth of pixel bytes. Stream handles keep a
//! single `Frame` alive across pulls and overwrite it in place, so the
//! backing allocation happens once per handle and stays stable as long as
//! the geometry does not change.

use super::properties::FrameProperties;

/// One decoded video frame: geometry plus interleaved pixel bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    properties: FrameProperties,
    data: Vec<u8>,
}

impl Frame {
    /// Allocate a zeroed frame with the given geometry.
    pub fn new(properties: FrameProperties) -> Self {
        Self {
            properties,
            data: vec![0; properties.frame_size()],
        }
    }

    /// Build a frame from existing pixel bytes.
    ///
    /// Returns `None` when `data` does not match the geometry's byte length.
    pub fn from_data(properties: FrameProperties, data: Vec<u8>) -> Option<Self> {
        if data.len() != properties.frame_size() {
            return None;
        }
        Some(Self { properties, data })
    }

    /// The frame's geometry.
    pub fn properties(&self) -> FrameProperties {
        self.properties
    }

    /// Width in pixels.
    pub fn width(&self) -> u16 {
        self.properties.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u16 {
        self.properties.height
    }

    /// Channels per pixel.
    pub fn channels(&self) -> u8 {
        self.properties.channels
    }

    /// Pixel bytes, row-major, channels interleaved.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable pixel bytes, for producers filling a frame before sending.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Consume the frame and take its pixel buffer.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Replace this frame's contents in place.
    ///
    /// Reuses the existing allocation whenever capacity allows; a geometry
    /// change only reallocates when the new frame is larger than any this
    /// buffer has held.
    pub(crate) fn overwrite(&mut self, properties: FrameProperties, data: &[u8]) {
        self.properties = properties;
        self.data.clear();
        self.data.extend_from_slice(data);
    }
}
