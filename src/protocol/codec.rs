//! Wire codec for relay messages
//!
//! A message on the wire is a fixed 8-byte header followed by the component
//! body and the payload:
//!
//! ```text
//!  0               2               4               6               8
//!  +---------------+---------------+---------------+---------------+
//!  | body length   | request id    | count         | payload length|
//!  +---------------+---------------+---------------+---------------+
//!  | count NUL-terminated UTF-8 components (body length bytes)     |
//!  +---------------------------------------------------------------+
//!  | payload (payload length bytes)                                |
//!  +---------------------------------------------------------------+
//! ```
//!
//! All header fields are big-endian u16, so a message body or payload is
//! capped at 65535 bytes. Frame data larger than that is split into multiple
//! `Data` messages before it gets here.
//!
//! [`decode`] is incremental: it consumes nothing until a complete message is
//! buffered, so the reader can `read_buf` into one `BytesMut` and drain
//! messages as they complete.

use bytes::{Buf, BufMut, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::constants::*;
use super::message::Message;
use crate::error::{ProtocolError, Result};

/// Append the wire form of `msg` to `dst`.
///
/// Validates lengths against the u16 header fields; component strings must
/// not contain NUL bytes since NUL is the component terminator.
pub fn encode_into(msg: &Message, dst: &mut BytesMut) -> std::result::Result<(), ProtocolError> {
    if msg.components.len() > MAX_COMPONENTS {
        return Err(ProtocolError::TooManyComponents(msg.components.len()));
    }

    let mut body_len = 0usize;
    for component in &msg.components {
        if component.as_bytes().contains(&0) {
            return Err(ProtocolError::EmbeddedNul);
        }
        body_len += component.len() + 1;
    }

    if body_len > MAX_BODY_LEN {
        return Err(ProtocolError::BodyTooLarge(body_len));
    }
    if msg.payload.len() > MAX_PAYLOAD_LEN {
        return Err(ProtocolError::PayloadTooLarge(msg.payload.len()));
    }

    dst.reserve(MESSAGE_HEADER_LEN + body_len + msg.payload.len());
    dst.put_u16(body_len as u16);
    dst.put_u16(msg.request_id);
    dst.put_u16(msg.components.len() as u16);
    dst.put_u16(msg.payload.len() as u16);

    for component in &msg.components {
        dst.put_slice(component.as_bytes());
        dst.put_u8(0);
    }
    dst.put_slice(&msg.payload);

    Ok(())
}

/// Try to decode one message from the front of `src`.
///
/// Returns `Ok(None)` when `src` does not yet hold a complete message;
/// nothing is consumed in that case. On success the message's bytes are
/// consumed from `src`.
pub fn decode(src: &mut BytesMut) -> std::result::Result<Option<Message>, ProtocolError> {
    if src.len() < MESSAGE_HEADER_LEN {
        return Ok(None);
    }

    let body_len = u16::from_be_bytes([src[0], src[1]]) as usize;
    let request_id = u16::from_be_bytes([src[2], src[3]]);
    let count = u16::from_be_bytes([src[4], src[5]]) as usize;
    let payload_len = u16::from_be_bytes([src[6], src[7]]) as usize;

    if count > MAX_COMPONENTS {
        return Err(ProtocolError::TooManyComponents(count));
    }

    let total = MESSAGE_HEADER_LEN + body_len + payload_len;
    if src.len() < total {
        src.reserve(total - src.len());
        return Ok(None);
    }

    src.advance(MESSAGE_HEADER_LEN);
    let body = src.split_to(body_len);
    let payload = src.split_to(payload_len).freeze();

    let mut components = Vec::with_capacity(count);
    let mut rest: &[u8] = &body;
    for _ in 0..count {
        let nul = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or(ProtocolError::MalformedBody)?;
        let component =
            std::str::from_utf8(&rest[..nul]).map_err(|_| ProtocolError::InvalidUtf8)?;
        components.push(component.to_string());
        rest = &rest[nul + 1..];
    }
    if !rest.is_empty() {
        return Err(ProtocolError::MalformedBody);
    }

    Ok(Some(Message {
        request_id,
        components,
        payload,
    }))
}

/// Read the next message from `io`, buffering through `buf`.
///
/// Returns `Ok(None)` on a clean EOF at a message boundary. EOF in the
/// middle of a message is an `UnexpectedEof` IO error.
pub async fn read_message<R>(io: &mut R, buf: &mut BytesMut) -> Result<Option<Message>>
where
    R: AsyncRead + Unpin,
{
    loop {
        if let Some(msg) = decode(buf)? {
            return Ok(Some(msg));
        }

        if io.read_buf(buf).await? == 0 {
            if buf.is_empty() {
                return Ok(None);
            }
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "connection closed mid-message",
            )
            .into());
        }
    }
}

/// Write one message to `io`, encoding through `scratch`.
///
/// `scratch` is cleared and reused so a steady stream of writes does not
/// reallocate. Flushes after the write; messages are small and latency
/// matters more than batching here.
pub async fn write_message<W>(io: &mut W, scratch: &mut BytesMut, msg: &Message) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    scratch.clear();
    encode_into(msg, scratch)?;
    io.write_all(scratch).await?;
    io.flush().await?;
    Ok(())
}
