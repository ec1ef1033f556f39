//! Relay message type
//!
//! Every exchange with the relay server is a `Message`: a request id, a list
//! of string components (the first component is the verb), and an optional
//! binary payload for frame data.
//!
//! Request ids pair responses with requests. The client allocates a nonzero
//! id per request and the server echoes it on the reply; id 0 marks
//! unsolicited pushes (`Data`, `Stream.orphaned`, `Relay.kick`).

use bytes::Bytes;

use super::constants::*;
use crate::error::ProtocolError;

/// A single protocol message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Request id; 0 for unsolicited messages
    pub request_id: u16,
    /// String components, verb first
    pub components: Vec<String>,
    /// Binary payload (empty for most messages)
    pub payload: Bytes,
}

impl Message {
    /// Create a message from components, with no payload.
    ///
    /// The request id starts at 0; the connection assigns a real id when the
    /// message is sent as a request.
    pub fn new<I, S>(components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            request_id: UNSOLICITED_ID,
            components: components.into_iter().map(Into::into).collect(),
            payload: Bytes::new(),
        }
    }

    /// Create a message carrying a binary payload.
    pub fn with_payload<I, S>(components: I, payload: Bytes) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            payload,
            ..Self::new(components)
        }
    }

    /// Build a `Relay.response` reply carrying a status code.
    pub fn response(request_id: u16, code: u16) -> Self {
        Self {
            request_id,
            components: vec![VERB_RESPONSE.to_string(), code.to_string()],
            payload: Bytes::new(),
        }
    }

    /// The verb (first component), if any.
    pub fn verb(&self) -> Option<&str> {
        self.components.first().map(String::as_str)
    }

    /// Component at `index` as a borrowed str.
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.components.get(index).map(String::as_str)
    }

    /// True for server-initiated messages (request id 0).
    pub fn is_unsolicited(&self) -> bool {
        self.request_id == UNSOLICITED_ID
    }

    /// Extract the status code from a `Relay.response` message.
    ///
    /// Fails with `MalformedResponse` when the verb or code is not the
    /// expected shape, which also covers servers replying with something
    /// other than a response where one is required.
    pub fn response_code(&self) -> Result<u16, ProtocolError> {
        if self.verb() != Some(VERB_RESPONSE) || self.components.len() != 2 {
            return Err(ProtocolError::MalformedResponse);
        }
        self.components[1]
            .parse()
            .map_err(|_| ProtocolError::MalformedResponse)
    }
}
