//! Relay wire protocol
//!
//! Message framing and verbs for the relay server's TCP protocol. The
//! protocol is request/response with unsolicited pushes: every client request
//! carries a nonzero id the server echoes back, while frame data, orphan
//! notices, and kicks arrive with id 0.

pub mod codec;
pub mod constants;
pub mod message;

pub use message::Message;
