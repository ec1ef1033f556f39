//! Frame encodings and reassembly
//!
//! Encodings are referenced by descriptor strings of the form
//!
//! ```text
//! <name>:<option>=<value>,<option>=<value>,...
//! ```
//!
//! where only the name is required. The name and option keys are
//! alphanumeric plus `_`; values may contain anything except a comma.
//! Whitespace around tokens is ignored. The descriptor travels to the
//! server verbatim, but the client parses it first so a typo fails
//! locally with a position instead of a server round trip.
//!
//! [`FrameAssembler`] turns the `Data` payload chunks of a stream back into
//! whole frames. Completed frame buffers circulate through a small spare
//! pool: the consumer hands each buffer back after copying it out, so a
//! steady stream settles into zero allocation.

use std::collections::HashMap;
use std::fmt;

use super::properties::FrameProperties;

/// Frame encodings this client can process locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Uncompressed interleaved pixel bytes
    Raw,
}

impl Encoding {
    /// Look up an encoding by name.
    pub fn by_name(name: &str) -> Option<Encoding> {
        match name {
            "raw" => Some(Encoding::Raw),
            _ => None,
        }
    }

    /// The encoding's wire name.
    pub fn name(self) -> &'static str {
        match self {
            Encoding::Raw => "raw",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Descriptor syntax error, pointing at the offending byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorError {
    /// Byte offset where parsing failed
    pub position: usize,
}

impl fmt::Display for DescriptorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bad descriptor syntax at position {}", self.position)
    }
}

impl std::error::Error for DescriptorError {}

/// A parsed encoding descriptor: encoding name plus options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodingDescriptor {
    raw: String,
    name: String,
    options: HashMap<String, String>,
}

impl EncodingDescriptor {
    /// Parse a descriptor string.
    pub fn parse(s: &str) -> Result<EncodingDescriptor, DescriptorError> {
        let b = s.as_bytes();
        let mut pos = 0;

        skip_ws(b, &mut pos);
        let name = identifier(s, &mut pos).ok_or(DescriptorError { position: pos })?;

        let mut options = HashMap::new();
        skip_ws(b, &mut pos);
        if pos < b.len() {
            if b[pos] != b':' {
                return Err(DescriptorError { position: pos });
            }
            pos += 1;

            loop {
                skip_ws(b, &mut pos);
                if pos == b.len() {
                    break;
                }

                let key = identifier(s, &mut pos).ok_or(DescriptorError { position: pos })?;

                skip_ws(b, &mut pos);
                if pos == b.len() || b[pos] != b'=' {
                    return Err(DescriptorError { position: pos });
                }
                pos += 1;

                skip_ws(b, &mut pos);
                let value_start = pos;
                while pos < b.len() && b[pos] != b',' {
                    pos += 1;
                }
                let value = s[value_start..pos].trim_end();
                if value.is_empty() {
                    return Err(DescriptorError {
                        position: value_start,
                    });
                }
                options.insert(key.to_string(), value.to_string());

                if pos == b.len() {
                    break;
                }
                pos += 1; // consume ','

                skip_ws(b, &mut pos);
                if pos == b.len() {
                    // Trailing comma
                    return Err(DescriptorError { position: pos });
                }
            }
        }

        Ok(EncodingDescriptor {
            raw: s.to_string(),
            name: name.to_string(),
            options,
        })
    }

    /// The encoding name the descriptor refers to.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up an option value by key.
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    /// The descriptor exactly as given, for sending to the server.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for EncodingDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn skip_ws(b: &[u8], pos: &mut usize) {
    while *pos < b.len() && b[*pos].is_ascii_whitespace() {
        *pos += 1;
    }
}

/// Scan an identifier (`[A-Za-z0-9_]+`) at `pos`; `None` if empty.
fn identifier<'a>(s: &'a str, pos: &mut usize) -> Option<&'a str> {
    let b = s.as_bytes();
    let start = *pos;
    while *pos < b.len() && (b[*pos].is_ascii_alphanumeric() || b[*pos] == b'_') {
        *pos += 1;
    }
    if *pos == start {
        return None;
    }
    Some(&s[start..*pos])
}

/// One reassembled frame, owning its pixel buffer.
///
/// Hand the buffer back to the assembler through
/// [`FrameAssembler::recycle`] after copying it out.
#[derive(Debug)]
pub(crate) struct DecodedFrame {
    properties: FrameProperties,
    data: Vec<u8>,
}

impl DecodedFrame {
    pub(crate) fn properties(&self) -> FrameProperties {
        self.properties
    }

    pub(crate) fn data(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn into_data(self) -> Vec<u8> {
        self.data
    }
}

/// Spare buffers kept for reuse; beyond this they are dropped.
const SPARE_POOL_MAX: usize = 4;

/// Reassembles fixed-size raw frames from payload chunks.
#[derive(Debug)]
pub(crate) struct FrameAssembler {
    properties: FrameProperties,
    frame_size: usize,
    partial: Vec<u8>,
    spare: Vec<Vec<u8>>,
}

impl FrameAssembler {
    pub(crate) fn new(encoding: Encoding, properties: FrameProperties) -> Self {
        let frame_size = match encoding {
            Encoding::Raw => properties.frame_size(),
        };
        Self {
            properties,
            frame_size,
            partial: Vec::with_capacity(frame_size),
            spare: Vec::new(),
        }
    }

    pub(crate) fn properties(&self) -> FrameProperties {
        self.properties
    }

    /// Feed a payload chunk; returns the newest frame it completed.
    ///
    /// A chunk can complete several frames at once when frames are smaller
    /// than the chunk size. Only the newest is returned; older ones go
    /// straight back to the spare pool, which is where frame dropping under
    /// consumer lag happens.
    pub(crate) fn feed(&mut self, mut data: &[u8]) -> Option<DecodedFrame> {
        if self.frame_size == 0 {
            return None;
        }

        let mut newest = None;
        while !data.is_empty() {
            let need = self.frame_size - self.partial.len();
            let take = need.min(data.len());
            self.partial.extend_from_slice(&data[..take]);
            data = &data[take..];

            if self.partial.len() == self.frame_size {
                let spare = self.take_spare();
                let buf = std::mem::replace(&mut self.partial, spare);
                let frame = DecodedFrame {
                    properties: self.properties,
                    data: buf,
                };
                if let Some(old) = newest.replace(frame) {
                    self.push_spare(old.data);
                }
            }
        }
        newest
    }

    /// Return a consumed frame's buffer to the spare pool.
    pub(crate) fn recycle(&mut self, frame: DecodedFrame) {
        self.push_spare(frame.data);
    }

    fn take_spare(&mut self) -> Vec<u8> {
        self.spare
            .pop()
            .unwrap_or_else(|| Vec::with_capacity(self.frame_size))
    }

    fn push_spare(&mut self, mut buf: Vec<u8>) {
        if self.spare.len() < SPARE_POOL_MAX {
            buf.clear();
            self.spare.push(buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoding_lookup() {
        assert_eq!(Encoding::by_name("raw"), Some(Encoding::Raw));
        assert_eq!(Encoding::by_name("jpeg"), None);
        assert_eq!(Encoding::by_name(""), None);
        assert_eq!(Encoding::Raw.name(), "raw");
    }

    #[test]
    fn test_descriptor_name_only() {
        let desc = EncodingDescriptor::parse("raw").unwrap();

        assert_eq!(desc.name(), "raw");
        assert_eq!(desc.option("quality"), None);
        assert_eq!(desc.as_str(), "raw");
    }

    #[test]
    fn test_descriptor_with_options() {
        let desc = EncodingDescriptor::parse("jpeg:quality=80,progressive=yes").unwrap();

        assert_eq!(desc.name(), "jpeg");
        assert_eq!(desc.option("quality"), Some("80"));
        assert_eq!(desc.option("progressive"), Some("yes"));
        assert_eq!(desc.option("missing"), None);
    }

    #[test]
    fn test_descriptor_tolerates_whitespace() {
        let desc = EncodingDescriptor::parse("  jpeg : quality = 80 , opt = a b ").unwrap();

        assert_eq!(desc.name(), "jpeg");
        assert_eq!(desc.option("quality"), Some("80"));
        // Interior whitespace in values survives; edges are trimmed
        assert_eq!(desc.option("opt"), Some("a b"));
    }

    #[test]
    fn test_descriptor_empty_option_list() {
        // A bare colon with nothing after it parses as name-only
        let desc = EncodingDescriptor::parse("raw:").unwrap();
        assert_eq!(desc.name(), "raw");
    }

    #[test]
    fn test_descriptor_syntax_errors() {
        // Empty input
        assert_eq!(EncodingDescriptor::parse("").unwrap_err().position, 0);

        // Junk after the name where ':' belongs
        assert_eq!(
            EncodingDescriptor::parse("jpeg quality=80").unwrap_err().position,
            5
        );

        // Missing key
        assert_eq!(EncodingDescriptor::parse("raw:=5").unwrap_err().position, 4);

        // Missing value
        assert_eq!(EncodingDescriptor::parse("raw:q=").unwrap_err().position, 6);

        // Trailing comma
        assert_eq!(
            EncodingDescriptor::parse("raw:q=5,").unwrap_err().position,
            8
        );

        // Key without '='
        assert_eq!(
            EncodingDescriptor::parse("raw:quality").unwrap_err().position,
            11
        );
    }

    #[test]
    fn test_descriptor_display_is_verbatim() {
        let raw = "jpeg: quality =80";
        let desc = EncodingDescriptor::parse(raw).unwrap();
        assert_eq!(desc.to_string(), raw);
    }

    fn assembler_4x1() -> FrameAssembler {
        // 4x1x1 @ 8 bits = 4 bytes per frame
        let props = FrameProperties {
            width: 4,
            height: 1,
            depth: 8,
            channels: 1,
        };
        FrameAssembler::new(Encoding::Raw, props)
    }

    #[test]
    fn test_assembler_accumulates_partial_chunks() {
        let mut asm = assembler_4x1();

        assert!(asm.feed(b"\x01\x02").is_none());
        assert!(asm.feed(b"\x03").is_none());

        let frame = asm.feed(b"\x04").unwrap();
        assert_eq!(frame.data(), b"\x01\x02\x03\x04");
        assert_eq!(frame.properties().frame_size(), 4);
    }

    #[test]
    fn test_assembler_keeps_newest_of_burst() {
        let mut asm = assembler_4x1();

        // Two and a half frames in one chunk
        let frame = asm.feed(b"AAAABBBBCC").unwrap();
        assert_eq!(frame.data(), b"BBBB");

        // The leftover half completes with the next chunk
        let frame = asm.feed(b"CC").unwrap();
        assert_eq!(frame.data(), b"CCCC");
    }

    #[test]
    fn test_assembler_recycles_buffers() {
        let mut asm = assembler_4x1();

        let frame = asm.feed(b"AAAA").unwrap();
        let ptr = frame.data().as_ptr();
        asm.recycle(frame);

        // A recycled buffer becomes the accumulation buffer for the frame
        // after next, so the pool settles into steady rotation
        let frame = asm.feed(b"BBBB").unwrap();
        asm.recycle(frame);
        let frame = asm.feed(b"CCCC").unwrap();

        assert_eq!(frame.data().as_ptr(), ptr);
        assert_eq!(frame.data(), b"CCCC");
    }

    #[test]
    fn test_assembler_ignores_zero_size_geometry() {
        let mut asm = FrameAssembler::new(Encoding::Raw, FrameProperties::default());
        assert!(asm.feed(b"anything").is_none());
    }

    #[test]
    fn test_assembler_spare_pool_is_bounded() {
        let mut asm = assembler_4x1();

        for _ in 0..SPARE_POOL_MAX + 3 {
            let frame = asm.feed(b"XXXX").unwrap();
            asm.recycle(frame);
        }
        assert!(asm.spare.len() <= SPARE_POOL_MAX);
    }
}
