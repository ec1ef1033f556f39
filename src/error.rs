//! Error types
//!
//! Failures are split by where they originate: transport problems
//! (`ConnectionError`), malformed traffic (`ProtocolError`), and requests the
//! relay server rejected. Rejections carry an [`ErrorCode`] from the server's
//! numeric taxonomy and surface through the domain the request belongs to,
//! so stream operations fail with [`StreamError`] and source operations with
//! [`SourceError`] even when the underlying code is the same.

use std::net::SocketAddr;

/// Convenience result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Numeric rejection codes returned by the relay server.
///
/// Code 0 means success and never appears here; see [`ErrorCode::from_wire`].
/// Codes the client does not recognize map to `Unknown` with the raw value
/// preserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// No stream with the given name
    NoSuchStream,
    /// Encoding name not recognized
    NoSuchEncoding,
    /// No source with the given name
    NoSuchSource,
    /// Width or height rejected
    InvalidDimension,
    /// Name already registered
    NameInUse,
    /// Argument rejected
    InvalidArgument,
    /// Operation not valid in the current state
    InvalidState,
    /// Descriptor or argument failed to parse
    ParseError,
    /// Unrecognized code, raw value preserved
    Unknown(u16),
}

impl ErrorCode {
    /// Map a wire code to an `ErrorCode`.
    ///
    /// Returns `None` for 0 (success). Every other value maps to a variant,
    /// unrecognized codes included, so a response can always be classified.
    pub fn from_wire(code: u16) -> Option<ErrorCode> {
        match code {
            0 => None,
            1 => Some(ErrorCode::NoSuchStream),
            2 => Some(ErrorCode::NoSuchEncoding),
            3 => Some(ErrorCode::NoSuchSource),
            4 => Some(ErrorCode::InvalidDimension),
            5 => Some(ErrorCode::NameInUse),
            6 => Some(ErrorCode::InvalidArgument),
            7 => Some(ErrorCode::InvalidState),
            8 => Some(ErrorCode::ParseError),
            other => Some(ErrorCode::Unknown(other)),
        }
    }

    /// The numeric wire value for this code.
    pub fn code(self) -> u16 {
        match self {
            ErrorCode::NoSuchStream => 1,
            ErrorCode::NoSuchEncoding => 2,
            ErrorCode::NoSuchSource => 3,
            ErrorCode::InvalidDimension => 4,
            ErrorCode::NameInUse => 5,
            ErrorCode::InvalidArgument => 6,
            ErrorCode::InvalidState => 7,
            ErrorCode::ParseError => 8,
            ErrorCode::Unknown(raw) => raw,
        }
    }

    /// Human-readable reason for this code.
    pub fn reason(self) -> &'static str {
        match self {
            ErrorCode::NoSuchStream => "No such stream",
            ErrorCode::NoSuchEncoding => "No such encoding",
            ErrorCode::NoSuchSource => "No such source",
            ErrorCode::InvalidDimension => "Invalid dimension",
            ErrorCode::NameInUse => "Name already in use",
            ErrorCode::InvalidArgument => "Invalid argument",
            ErrorCode::InvalidState => "Invalid state",
            ErrorCode::ParseError => "Parse error",
            ErrorCode::Unknown(_) => "Unknown error",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.reason())
    }
}

/// Error type for stream operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamError {
    /// The server rejected the request
    Rejected(ErrorCode),
    /// The stream's source went away; the stream will deliver no more frames
    Orphaned,
    /// A frame wait ended without a frame (stream paused or connection lost)
    Interrupted,
}

impl std::fmt::Display for StreamError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamError::Rejected(code) => write!(f, "Stream request rejected: {}", code),
            StreamError::Orphaned => write!(f, "Stream orphaned: its source is gone"),
            StreamError::Interrupted => write!(f, "Frame wait interrupted before a frame arrived"),
        }
    }
}

impl std::error::Error for StreamError {}

/// Error type for source operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceError {
    /// The server rejected the request
    Rejected(ErrorCode),
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::Rejected(code) => write!(f, "Source request rejected: {}", code),
        }
    }
}

impl std::error::Error for SourceError {}

/// Error type for connection establishment and lifetime
#[derive(Debug)]
pub enum ConnectionError {
    /// TCP connect to the relay server failed
    Connect {
        /// Server address
        addr: SocketAddr,
        /// Underlying IO error
        source: std::io::Error,
    },
    /// Connect did not complete within the configured timeout
    Timeout(SocketAddr),
    /// The connection is no longer usable (closed, kicked, or IO failure)
    Closed,
}

impl std::fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionError::Connect { addr, source } => {
                write!(f, "Failed to connect to relay server {}: {}", addr, source)
            }
            ConnectionError::Timeout(addr) => {
                write!(f, "Timed out connecting to relay server {}", addr)
            }
            ConnectionError::Closed => write!(f, "Connection to relay server closed"),
        }
    }
}

impl std::error::Error for ConnectionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConnectionError::Connect { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Error type for wire-format violations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Message body exceeds the u16 length field
    BodyTooLarge(usize),
    /// Payload exceeds the u16 length field
    PayloadTooLarge(usize),
    /// Component count exceeds the per-message limit
    TooManyComponents(usize),
    /// A component contains a NUL byte and cannot be framed
    EmbeddedNul,
    /// Message body does not match its component count
    MalformedBody,
    /// A component was not valid UTF-8
    InvalidUtf8,
    /// Response message did not have the expected shape
    MalformedResponse,
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProtocolError::BodyTooLarge(len) => write!(f, "Message body too large: {} bytes", len),
            ProtocolError::PayloadTooLarge(len) => write!(f, "Payload too large: {} bytes", len),
            ProtocolError::TooManyComponents(count) => {
                write!(f, "Too many message components: {}", count)
            }
            ProtocolError::EmbeddedNul => write!(f, "Message component contains a NUL byte"),
            ProtocolError::MalformedBody => {
                write!(f, "Message body does not match its component count")
            }
            ProtocolError::InvalidUtf8 => write!(f, "Message component is not valid UTF-8"),
            ProtocolError::MalformedResponse => write!(f, "Malformed response from server"),
        }
    }
}

impl std::error::Error for ProtocolError {}

/// Top-level error type for all client operations
#[derive(Debug)]
pub enum Error {
    /// IO failure on the underlying socket
    Io(std::io::Error),
    /// Connection establishment or lifetime failure
    Connection(ConnectionError),
    /// Wire-format violation
    Protocol(ProtocolError),
    /// Stream operation failure
    Stream(StreamError),
    /// Source operation failure
    Source(SourceError),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(e) => write!(f, "IO error: {}", e),
            Error::Connection(e) => e.fmt(f),
            Error::Protocol(e) => e.fmt(f),
            Error::Stream(e) => e.fmt(f),
            Error::Source(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Connection(e) => Some(e),
            Error::Protocol(e) => Some(e),
            Error::Stream(e) => Some(e),
            Error::Source(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<ConnectionError> for Error {
    fn from(e: ConnectionError) -> Self {
        Error::Connection(e)
    }
}

impl From<ProtocolError> for Error {
    fn from(e: ProtocolError) -> Self {
        Error::Protocol(e)
    }
}

impl From<StreamError> for Error {
    fn from(e: StreamError) -> Self {
        Error::Stream(e)
    }
}

impl From<SourceError> for Error {
    fn from(e: SourceError) -> Self {
        Error::Source(e)
    }
}

/// Classify a response code for a stream-domain request.
///
/// 0 is success; anything else becomes `Error::Stream(Rejected(..))`.
pub(crate) fn check_stream_code(code: u16) -> Result<()> {
    match ErrorCode::from_wire(code) {
        None => Ok(()),
        Some(code) => Err(Error::Stream(StreamError::Rejected(code))),
    }
}

/// Classify a response code for a source-domain request.
pub(crate) fn check_source_code(code: u16) -> Result<()> {
    match ErrorCode::from_wire(code) {
        None => Ok(()),
        Some(code) => Err(Error::Source(SourceError::Rejected(code))),
    }
}
