//! Frames and frame encodings
//!
//! Everything about pixel data: geometry ([`FrameProperties`]), owned pixel
//! buffers ([`Frame`]), encoding names and descriptors, and the chunk
//! reassembly that turns wire payloads back into frames.

pub mod buffer;
pub mod encoding;
pub mod properties;

pub use buffer::Frame;
pub use encoding::{DescriptorError, Encoding, EncodingDescriptor};
pub use properties::FrameProperties;

pub(crate) use encoding::{DecodedFrame, FrameAssembler};
