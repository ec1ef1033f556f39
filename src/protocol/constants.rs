//! Protocol constants

/// Default TCP port of the relay server
pub const DEFAULT_PORT: u16 = 33560;

/// Fixed message header length in bytes (four big-endian u16 fields)
pub const MESSAGE_HEADER_LEN: usize = 8;

/// Maximum message body length (component bytes including NUL terminators)
pub const MAX_BODY_LEN: usize = u16::MAX as usize;

/// Maximum payload length carried by a single message
pub const MAX_PAYLOAD_LEN: usize = u16::MAX as usize;

/// Maximum number of components in a single message
pub const MAX_COMPONENTS: usize = 64;

/// Payload bytes per Data message when splitting an encoded frame
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Request id marking unsolicited (server-initiated) messages
pub const UNSOLICITED_ID: u16 = 0;

/// Default frame encoding negotiated for new sources
pub const DEFAULT_ENCODING: &str = "raw";

// Reply and push verbs.
pub const VERB_RESPONSE: &str = "Relay.response";
pub const VERB_KICK: &str = "Relay.kick";
pub const VERB_DATA: &str = "Data";
pub const VERB_STREAM_ORPHANED: &str = "Stream.orphaned";

// Stream request verbs.
pub const VERB_STREAM_OPEN: &str = "Stream.open";
pub const VERB_STREAM_ATTACH_SOURCE: &str = "Stream.attachSource";
pub const VERB_STREAM_GET_INFO: &str = "Stream.getInfo";
pub const VERB_STREAM_SET_ENCODING: &str = "Stream.setEncoding";
pub const VERB_STREAM_RESIZE: &str = "Stream.resize";
pub const VERB_STREAM_SET_CHANNELS: &str = "Stream.setChannels";
pub const VERB_STREAM_SET_DROP_RATE: &str = "Stream.setDropRate";
pub const VERB_STREAM_SET_PRIORITY: &str = "Stream.setPriority";
pub const VERB_STREAM_PAUSE: &str = "Stream.pause";
pub const VERB_STREAM_UNPAUSE: &str = "Stream.unpause";
pub const VERB_STREAM_CLOSE: &str = "Stream.close";

// Source request verbs.
pub const VERB_SOURCE_OPEN: &str = "Source.open";
pub const VERB_SOURCE_CLOSE: &str = "Source.close";
pub const VERB_SOURCE_SET_ENCODING: &str = "Source.setEncoding";
pub const VERB_SOURCE_SET_FRAME_PROPERTIES: &str = "Source.setFrameProperties";
pub const VERB_SOURCE_LIST: &str = "Source.list";
pub const VERB_SOURCE_SPAWN: &str = "Source.spawn";
