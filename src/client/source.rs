//! Source handle
//!
//! The push side of the relay: a named channel this process publishes
//! frames into, for other clients to open streams against.
//!
//! Opening negotiates the default encoding right away. Frame geometry is
//! negotiated lazily from the first frame pushed through
//! [`Source::send_frame`], after which every frame must match it.

use bytes::Bytes;

use crate::error::{check_source_code, Error, ErrorCode, Result, SourceError};
use crate::frame::{Encoding, EncodingDescriptor, Frame, FrameProperties};
use crate::protocol::constants::*;
use crate::protocol::Message;

use super::connection::Connection;

/// Handle to an open source.
///
/// Dropping the handle closes the source on the server, which orphans any
/// streams attached to it.
#[derive(Debug)]
pub struct Source {
    conn: Connection,
    name: String,
    encoding: Option<Encoding>,
    properties: Option<FrameProperties>,
    chunk_size: usize,
    closed: bool,
}

impl Source {
    /// Open a client source named `name`.
    pub(crate) async fn open(conn: Connection, name: &str, chunk_size: usize) -> Result<Source> {
        let open = Message::new([VERB_SOURCE_OPEN, "client", name]);
        check_source_code(conn.request_code(open).await?)?;

        let mut source = Source {
            conn,
            name: name.to_string(),
            encoding: None,
            properties: None,
            chunk_size,
            closed: false,
        };

        // Negotiate the default encoding. A rejection leaves the source
        // open but unable to send until a set_encoding succeeds.
        match source.set_encoding(DEFAULT_ENCODING).await {
            Ok(()) => {}
            Err(Error::Source(SourceError::Rejected(code))) => {
                tracing::warn!(source = %source.name, %code, "Default encoding rejected");
            }
            Err(e) => return Err(e),
        }

        tracing::debug!(source = %source.name, "Source opened");
        Ok(source)
    }

    /// The source's name on the server.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The negotiated encoding, if one has been accepted.
    pub fn encoding(&self) -> Option<Encoding> {
        self.encoding
    }

    /// The negotiated frame geometry, once the first frame has been sent.
    pub fn properties(&self) -> Option<FrameProperties> {
        self.properties
    }

    /// Switch the encoding frames are published in.
    ///
    /// The descriptor is validated locally before anything goes over the
    /// wire: a syntax error fails with `ParseError`, a descriptor naming
    /// an encoding this client cannot produce with `NoSuchEncoding`.
    pub async fn set_encoding(&mut self, descriptor: &str) -> Result<()> {
        let parsed = match EncodingDescriptor::parse(descriptor) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::debug!(descriptor, position = e.position, "Bad encoding descriptor");
                return Err(Error::Source(SourceError::Rejected(ErrorCode::ParseError)));
            }
        };
        let Some(encoding) = Encoding::by_name(parsed.name()) else {
            return Err(Error::Source(SourceError::Rejected(
                ErrorCode::NoSuchEncoding,
            )));
        };

        let msg = Message::new([VERB_SOURCE_SET_ENCODING, self.name.as_str(), descriptor]);
        check_source_code(self.conn.request_code(msg).await?)?;
        self.encoding = Some(encoding);
        Ok(())
    }

    /// Declare the geometry of the frames this source will send.
    ///
    /// `send_frame` derives this from the first frame automatically;
    /// calling it directly just pins the geometry up front.
    pub async fn set_frame_properties(&mut self, properties: FrameProperties) -> Result<()> {
        let props = properties.to_string();
        let msg = Message::new([
            VERB_SOURCE_SET_FRAME_PROPERTIES,
            self.name.as_str(),
            props.as_str(),
        ]);
        check_source_code(self.conn.request_code(msg).await?)?;
        self.properties = Some(properties);
        Ok(())
    }

    /// Publish one frame.
    ///
    /// The frame is only borrowed; its bytes are copied into wire messages
    /// and shipped in chunks. Fails with `InvalidState` before an encoding
    /// is negotiated and with `InvalidArgument` when the frame's geometry
    /// does not match the negotiated one.
    pub async fn send_frame(&mut self, frame: &Frame) -> Result<()> {
        if self.encoding.is_none() {
            return Err(Error::Source(SourceError::Rejected(ErrorCode::InvalidState)));
        }

        match self.properties {
            None => self.set_frame_properties(frame.properties()).await?,
            Some(properties) if properties != frame.properties() => {
                tracing::warn!(
                    source = %self.name,
                    negotiated = %properties,
                    got = %frame.properties(),
                    "Frame geometry changed between sends"
                );
                return Err(Error::Source(SourceError::Rejected(
                    ErrorCode::InvalidArgument,
                )));
            }
            Some(_) => {}
        }

        for chunk in frame.data().chunks(self.chunk_size) {
            let msg = Message::with_payload(
                [VERB_DATA, self.name.as_str()],
                Bytes::copy_from_slice(chunk),
            );
            self.conn.send(msg)?;
        }

        Ok(())
    }

    /// Close the source on the server.
    ///
    /// Streams attached to it are orphaned. Dropping the handle closes it
    /// too, but only an explicit close reports the server's answer.
    pub async fn close(mut self) -> Result<()> {
        self.closed = true;
        let code = self
            .conn
            .request_code(Message::new([VERB_SOURCE_CLOSE, self.name.as_str()]))
            .await?;
        check_source_code(code)
    }
}

impl Drop for Source {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        let _ = self
            .conn
            .send(Message::new([VERB_SOURCE_CLOSE, self.name.as_str()]));
        tracing::debug!(source = %self.name, "Source dropped, close queued");
    }
}
