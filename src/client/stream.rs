//! Stream handle
//!
//! A stream is a named subscription to one source's frames. The server
//! pushes frame data as it arrives; the handle reassembles it and hands
//! out complete frames through [`Stream::get_frame`].
//!
//! Opening a stream is three requests: `Stream.open` claims the name,
//! `Stream.attachSource` binds it to a source, and `Stream.getInfo`
//! fetches the encoding and frame geometry the server settled on. Every
//! configuration change refreshes that info, since the server may adjust
//! more than the one property asked for.

use std::sync::Arc;

use crate::error::{check_stream_code, Error, ErrorCode, ProtocolError, Result, StreamError};
use crate::frame::{Encoding, Frame, FrameProperties};
use crate::protocol::constants::*;
use crate::protocol::Message;

use super::connection::{Connection, StreamSlot};

/// Handle to an open stream.
///
/// Frames are pulled with [`get_frame`](Stream::get_frame); the handle
/// keeps one internal frame buffer and reuses it across pulls, so a
/// steady-state consumer causes no allocation. Dropping the handle closes
/// the stream on the server.
#[derive(Debug)]
pub struct Stream {
    conn: Connection,
    name: String,
    source_name: String,
    slot: Arc<StreamSlot>,
    encoding: Encoding,
    properties: FrameProperties,
    paused: bool,
    frame: Option<Frame>,
    closed: bool,
}

impl Stream {
    /// Open a stream named `name` attached to `source_name`.
    pub(crate) async fn open(conn: Connection, name: String, source_name: &str) -> Result<Stream> {
        // Register before the open request goes out so frames an eager
        // server pushes right away have somewhere to land.
        let slot = conn.register_stream(&name);

        let code = match conn
            .request_code(Message::new([VERB_STREAM_OPEN, name.as_str()]))
            .await
        {
            Ok(code) => code,
            Err(e) => {
                conn.unregister_stream(&name);
                return Err(e);
            }
        };
        if let Err(e) = check_stream_code(code) {
            conn.unregister_stream(&name);
            return Err(e);
        }

        // The server holds stream state from here on; undo it if the rest
        // of the sequence fails.
        match attach_and_fetch(&conn, &name, source_name).await {
            Ok((encoding, properties)) => {
                slot.arm(encoding, properties);
                tracing::debug!(
                    stream = %name,
                    source = %source_name,
                    encoding = %encoding,
                    %properties,
                    "Stream opened"
                );
                Ok(Stream {
                    conn,
                    name,
                    source_name: source_name.to_string(),
                    slot,
                    encoding,
                    properties,
                    paused: false,
                    frame: None,
                    closed: false,
                })
            }
            Err(e) => {
                conn.unregister_stream(&name);
                let _ = conn.send(Message::new([VERB_STREAM_CLOSE, name.as_str()]));
                Err(e)
            }
        }
    }

    /// The stream's name on the server.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The source this stream is attached to.
    pub fn source(&self) -> &str {
        &self.source_name
    }

    /// The encoding frames currently arrive in.
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// The geometry of frames this stream delivers.
    pub fn properties(&self) -> FrameProperties {
        self.properties
    }

    /// Ask the server to deliver this stream in a different encoding.
    ///
    /// `descriptor` uses the option-string syntax, for example
    /// `"raw"`. Validation happens on the server.
    pub async fn set_encoding(&mut self, descriptor: &str) -> Result<()> {
        let msg = Message::new([VERB_STREAM_SET_ENCODING, self.name.as_str(), descriptor]);
        self.configure(msg).await
    }

    /// Ask the server to scale frames to `width` x `height`.
    ///
    /// Values are passed through untouched; the server answers
    /// `InvalidDimension` for sizes it cannot produce.
    pub async fn resize(&mut self, width: i32, height: i32) -> Result<()> {
        let width = width.to_string();
        let height = height.to_string();
        let msg = Message::new([
            VERB_STREAM_RESIZE,
            self.name.as_str(),
            width.as_str(),
            height.as_str(),
        ]);
        self.configure(msg).await
    }

    /// Switch the stream between grayscale and full color delivery.
    pub async fn set_grayscale(&mut self, grayscale: bool) -> Result<()> {
        let flag = if grayscale { "1" } else { "0" };
        let msg = Message::new([VERB_STREAM_SET_CHANNELS, self.name.as_str(), flag]);
        self.configure(msg).await
    }

    /// Set the stream's drop rate: deliver one frame out of every `rate`.
    pub async fn set_drop_rate(&mut self, rate: i32) -> Result<()> {
        let rate = rate.to_string();
        let msg = Message::new([
            VERB_STREAM_SET_DROP_RATE,
            self.name.as_str(),
            rate.as_str(),
        ]);
        self.configure(msg).await
    }

    /// Set the stream's scheduling priority on the server.
    pub async fn set_priority(&mut self, priority: i32) -> Result<()> {
        let priority = priority.to_string();
        let msg = Message::new([
            VERB_STREAM_SET_PRIORITY,
            self.name.as_str(),
            priority.as_str(),
        ]);
        self.configure(msg).await
    }

    /// Send one configuration request and refresh the stream info on
    /// success. A rejection leaves the local state untouched.
    async fn configure(&mut self, msg: Message) -> Result<()> {
        check_stream_code(self.conn.request_code(msg).await?)?;
        self.refresh_info().await
    }

    async fn refresh_info(&mut self) -> Result<()> {
        let (encoding, properties) = fetch_info(&self.conn, &self.name).await?;
        self.encoding = encoding;
        self.properties = properties;
        self.slot.arm(encoding, properties);
        Ok(())
    }

    /// Stop the server from pushing frames for this stream.
    pub async fn pause(&mut self) -> Result<()> {
        let msg = Message::new([VERB_STREAM_PAUSE, self.name.as_str()]);
        check_stream_code(self.conn.request_code(msg).await?)?;
        self.paused = true;
        Ok(())
    }

    /// Resume frame delivery.
    ///
    /// Any partially accumulated frame from before the pause is discarded,
    /// so the first frame delivered afterwards is a clean one.
    pub async fn unpause(&mut self) -> Result<()> {
        self.slot.arm(self.encoding, self.properties);
        let msg = Message::new([VERB_STREAM_UNPAUSE, self.name.as_str()]);
        check_stream_code(self.conn.request_code(msg).await?)?;
        self.paused = false;
        Ok(())
    }

    /// True once the server has reported this stream's source gone.
    ///
    /// The flag is set by a pushed notification, so it can lag the actual
    /// event; a stream may be orphaned before this returns true.
    pub fn is_orphaned(&self) -> bool {
        self.slot.is_orphaned()
    }

    /// Get the newest frame.
    ///
    /// With `wait` set this suspends until a frame arrives and always
    /// returns `Ok(Some(..))` on success; without it, `Ok(None)` means no
    /// frame was pending. The returned reference points at the handle's
    /// internal buffer, which the next pull overwrites.
    ///
    /// Fails with [`StreamError::Orphaned`] once the source is gone, and
    /// with [`StreamError::Interrupted`] when a wait cannot complete
    /// because the stream is paused or the connection is lost.
    pub async fn get_frame(&mut self, wait: bool) -> Result<Option<&Frame>> {
        let slot = Arc::clone(&self.slot);

        let decoded = loop {
            if let Some(frame) = slot.take_latest() {
                break frame;
            }
            if slot.is_orphaned() {
                return Err(Error::Stream(StreamError::Orphaned));
            }
            if !wait {
                return Ok(None);
            }
            if self.paused || self.conn.is_closed() {
                return Err(Error::Stream(StreamError::Interrupted));
            }
            slot.wait().await;
        };

        let frame = self
            .frame
            .get_or_insert_with(|| Frame::new(decoded.properties()));
        frame.overwrite(decoded.properties(), decoded.data());
        slot.recycle(decoded);

        Ok(self.frame.as_ref())
    }

    /// Close the stream on the server.
    ///
    /// Dropping the handle also closes the stream, but only an explicit
    /// close reports whether the server accepted it.
    pub async fn close(mut self) -> Result<()> {
        self.closed = true;
        let code = self
            .conn
            .request_code(Message::new([VERB_STREAM_CLOSE, self.name.as_str()]))
            .await;
        self.conn.unregister_stream(&self.name);
        check_stream_code(code?)
    }
}

impl Drop for Stream {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        self.conn.unregister_stream(&self.name);
        // Fire and forget; if the connection is gone the server has already
        // cleaned this stream up
        let _ = self
            .conn
            .send(Message::new([VERB_STREAM_CLOSE, self.name.as_str()]));
        tracing::debug!(stream = %self.name, "Stream dropped, close queued");
    }
}

/// `Stream.attachSource` followed by the initial info fetch.
async fn attach_and_fetch(
    conn: &Connection,
    name: &str,
    source_name: &str,
) -> Result<(Encoding, FrameProperties)> {
    let attach = Message::new([VERB_STREAM_ATTACH_SOURCE, name, source_name]);
    check_stream_code(conn.request_code(attach).await?)?;
    fetch_info(conn, name).await
}

/// Ask the server for a stream's current encoding and frame geometry.
///
/// A successful reply echoes the verb: `[Stream.getInfo, <name>,
/// <encoding>, <w,h,depth,channels>]`. Anything else must be a
/// `Relay.response` rejection.
async fn fetch_info(conn: &Connection, name: &str) -> Result<(Encoding, FrameProperties)> {
    let response = conn
        .request(Message::new([VERB_STREAM_GET_INFO, name]))
        .await?;

    if response.verb() == Some(VERB_STREAM_GET_INFO) && response.components.len() == 4 {
        let encoding = response
            .arg(2)
            .and_then(Encoding::by_name)
            .ok_or(Error::Stream(StreamError::Rejected(
                ErrorCode::NoSuchEncoding,
            )))?;
        let properties = response
            .arg(3)
            .and_then(FrameProperties::parse)
            .ok_or(Error::Protocol(ProtocolError::MalformedResponse))?;
        return Ok((encoding, properties));
    }

    check_stream_code(response.response_code()?)?;
    // A bare success response carries no info; treat it as malformed
    Err(Error::Protocol(ProtocolError::MalformedResponse))
}

#[cfg(test)]
mod tests {
    use super::super::testutil::TestServer;
    use super::*;

    #[tokio::test]
    async fn test_open_sequence() {
        let (conn, mut server) = TestServer::pair();

        let client =
            tokio::spawn(async move { Stream::open(conn, "stream0".to_string(), "cam").await });

        let open = server.expect(VERB_STREAM_OPEN).await;
        assert_eq!(open.arg(1), Some("stream0"));
        server.respond(open.request_id, 0).await;

        let attach = server.expect(VERB_STREAM_ATTACH_SOURCE).await;
        assert_eq!(attach.arg(1), Some("stream0"));
        assert_eq!(attach.arg(2), Some("cam"));
        server.respond(attach.request_id, 0).await;

        server.serve_get_info("stream0", "raw", "320,240,8,3").await;

        let stream = client.await.unwrap().unwrap();
        assert_eq!(stream.name(), "stream0");
        assert_eq!(stream.source(), "cam");
        assert_eq!(stream.encoding(), Encoding::Raw);
        assert_eq!(stream.properties(), FrameProperties::with_size(320, 240));
        assert!(!stream.is_orphaned());
    }

    #[tokio::test]
    async fn test_open_rejected_leaves_no_stream_behind() {
        let (conn, mut server) = TestServer::pair();

        let client = {
            let conn = conn.clone();
            tokio::spawn(async move { Stream::open(conn, "stream0".to_string(), "cam").await })
        };

        let open = server.expect(VERB_STREAM_OPEN).await;
        server.respond(open.request_id, 5).await;

        let err = client.await.unwrap().unwrap_err();
        assert!(matches!(
            err,
            Error::Stream(StreamError::Rejected(ErrorCode::NameInUse))
        ));

        // The name was never claimed, so no cleanup close goes out: the
        // next message the server sees is this probe
        let probe = {
            let conn = conn.clone();
            tokio::spawn(
                async move { conn.request(Message::new([VERB_STREAM_GET_INFO, "sync"])).await },
            )
        };
        let req = server.recv().await;
        assert_eq!(req.verb(), Some(VERB_STREAM_GET_INFO));
        server.respond(req.request_id, 0).await;
        probe.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_attach_rejection_surfaced_and_cleaned_up() {
        let (conn, mut server) = TestServer::pair();

        let client =
            tokio::spawn(async move { Stream::open(conn, "stream0".to_string(), "nocam").await });

        let open = server.expect(VERB_STREAM_OPEN).await;
        server.respond(open.request_id, 0).await;
        let attach = server.expect(VERB_STREAM_ATTACH_SOURCE).await;
        server.respond(attach.request_id, 3).await;

        let err = client.await.unwrap().unwrap_err();
        assert!(matches!(
            err,
            Error::Stream(StreamError::Rejected(ErrorCode::NoSuchSource))
        ));

        // The half-open stream gets a fire-and-forget close
        let close = server.expect(VERB_STREAM_CLOSE).await;
        assert_eq!(close.request_id, 0);
        assert_eq!(close.arg(1), Some("stream0"));
    }

    #[tokio::test]
    async fn test_open_fails_on_unknown_encoding() {
        let (conn, mut server) = TestServer::pair();

        let client =
            tokio::spawn(async move { Stream::open(conn, "stream0".to_string(), "cam").await });

        let open = server.expect(VERB_STREAM_OPEN).await;
        server.respond(open.request_id, 0).await;
        let attach = server.expect(VERB_STREAM_ATTACH_SOURCE).await;
        server.respond(attach.request_id, 0).await;
        server
            .serve_get_info("stream0", "jpeg", "320,240,8,3")
            .await;

        let err = client.await.unwrap().unwrap_err();
        assert!(matches!(
            err,
            Error::Stream(StreamError::Rejected(ErrorCode::NoSuchEncoding))
        ));
    }

    #[tokio::test]
    async fn test_info_rejection_classified() {
        let (conn, mut server) = TestServer::pair();

        let client =
            tokio::spawn(async move { Stream::open(conn, "stream0".to_string(), "cam").await });

        let open = server.expect(VERB_STREAM_OPEN).await;
        server.respond(open.request_id, 0).await;
        let attach = server.expect(VERB_STREAM_ATTACH_SOURCE).await;
        server.respond(attach.request_id, 0).await;
        let info = server.expect(VERB_STREAM_GET_INFO).await;
        server.respond(info.request_id, 7).await;

        let err = client.await.unwrap().unwrap_err();
        assert!(matches!(
            err,
            Error::Stream(StreamError::Rejected(ErrorCode::InvalidState))
        ));
    }

    #[tokio::test]
    async fn test_resize_refreshes_info() {
        let (conn, mut server) = TestServer::pair();

        let client = tokio::spawn(async move {
            let mut stream = Stream::open(conn, "stream0".to_string(), "cam")
                .await
                .unwrap();
            stream.resize(640, 480).await.unwrap();
            stream.properties()
        });

        server.accept_stream_open("raw", "320,240,8,3").await;

        let resize = server.expect(VERB_STREAM_RESIZE).await;
        assert_eq!(resize.arg(1), Some("stream0"));
        assert_eq!(resize.arg(2), Some("640"));
        assert_eq!(resize.arg(3), Some("480"));
        server.respond(resize.request_id, 0).await;
        server.serve_get_info("stream0", "raw", "640,480,8,3").await;

        assert_eq!(client.await.unwrap(), FrameProperties::with_size(640, 480));
    }

    #[tokio::test]
    async fn test_resize_rejection_keeps_geometry() {
        let (conn, mut server) = TestServer::pair();

        let client = tokio::spawn(async move {
            let mut stream = Stream::open(conn, "stream0".to_string(), "cam")
                .await
                .unwrap();
            let err = stream.resize(-1, 480).await.unwrap_err();
            (err, stream.properties())
        });

        server.accept_stream_open("raw", "320,240,8,3").await;

        // Dimensions go over the wire untouched; the server rejects them
        let resize = server.expect(VERB_STREAM_RESIZE).await;
        assert_eq!(resize.arg(2), Some("-1"));
        server.respond(resize.request_id, 4).await;

        let (err, properties) = client.await.unwrap();
        assert!(matches!(
            err,
            Error::Stream(StreamError::Rejected(ErrorCode::InvalidDimension))
        ));
        assert_eq!(properties, FrameProperties::with_size(320, 240));
    }

    #[tokio::test]
    async fn test_set_grayscale_wire_format() {
        let (conn, mut server) = TestServer::pair();

        let client = tokio::spawn(async move {
            let mut stream = Stream::open(conn, "stream0".to_string(), "cam")
                .await
                .unwrap();
            stream.set_grayscale(true).await.unwrap();
            stream.properties()
        });

        server.accept_stream_open("raw", "320,240,8,3").await;

        let msg = server.expect(VERB_STREAM_SET_CHANNELS).await;
        assert_eq!(msg.arg(2), Some("1"));
        server.respond(msg.request_id, 0).await;
        server.serve_get_info("stream0", "raw", "320,240,8,1").await;

        let properties = client.await.unwrap();
        assert_eq!(properties.channels, 1);
    }

    #[tokio::test]
    async fn test_get_frame_nonblocking_empty() {
        let (conn, mut server) = TestServer::pair();

        let client = tokio::spawn(async move {
            let mut stream = Stream::open(conn, "stream0".to_string(), "cam")
                .await
                .unwrap();
            stream.get_frame(false).await.map(|f| f.is_none())
        });

        server.accept_stream_open("raw", "2,1,8,3").await;

        assert!(client.await.unwrap().unwrap());
    }

    #[tokio::test]
    async fn test_get_frame_reuses_buffer() {
        let (conn, mut server) = TestServer::pair();
        let (pulled_tx, pulled_rx) = tokio::sync::oneshot::channel();

        let client = tokio::spawn(async move {
            let mut stream = Stream::open(conn, "stream0".to_string(), "cam")
                .await
                .unwrap();

            let (ptr1, first) = {
                let frame = stream.get_frame(true).await.unwrap().unwrap();
                (frame.data().as_ptr() as usize, frame.data().to_vec())
            };
            pulled_tx.send(()).unwrap();
            let (ptr2, second) = {
                let frame = stream.get_frame(true).await.unwrap().unwrap();
                (frame.data().as_ptr() as usize, frame.data().to_vec())
            };
            (ptr1, first, ptr2, second)
        });

        server.accept_stream_open("raw", "2,1,8,3").await;
        server.push_data("stream0", b"\x01\x02\x03\x04\x05\x06").await;
        pulled_rx.await.unwrap();
        server.push_data("stream0", b"\x0a\x0b\x0c\x0d\x0e\x0f").await;

        let (ptr1, first, ptr2, second) = client.await.unwrap();
        assert_eq!(first, b"\x01\x02\x03\x04\x05\x06");
        assert_eq!(second, b"\x0a\x0b\x0c\x0d\x0e\x0f");
        assert_eq!(ptr1, ptr2, "cached frame buffer must be reused in place");
    }

    #[tokio::test]
    async fn test_get_frame_orphaned() {
        let (conn, mut server) = TestServer::pair();

        let client = tokio::spawn(async move {
            let mut stream = Stream::open(conn, "stream0".to_string(), "cam")
                .await
                .unwrap();
            let blocking = stream.get_frame(true).await.map(|_| ());
            let nonblocking = stream.get_frame(false).await.map(|_| ());
            (blocking, nonblocking, stream.is_orphaned())
        });

        server.accept_stream_open("raw", "2,1,8,3").await;
        server.push_orphaned("stream0").await;

        let (blocking, nonblocking, orphaned) = client.await.unwrap();
        assert!(matches!(
            blocking.unwrap_err(),
            Error::Stream(StreamError::Orphaned)
        ));
        assert!(matches!(
            nonblocking.unwrap_err(),
            Error::Stream(StreamError::Orphaned)
        ));
        assert!(orphaned);
    }

    #[tokio::test]
    async fn test_pending_frame_delivered_before_orphan_error() {
        let (conn, mut server) = TestServer::pair();

        let client = tokio::spawn(async move {
            let mut stream = Stream::open(conn, "stream0".to_string(), "cam")
                .await
                .unwrap();
            let first = stream.get_frame(true).await.map(|f| f.unwrap().data().to_vec());
            let second = stream.get_frame(true).await.map(|_| ());
            (first, second)
        });

        server.accept_stream_open("raw", "1,1,8,3").await;
        server.push_data("stream0", b"\x07\x08\x09").await;
        server.push_orphaned("stream0").await;

        let (first, second) = client.await.unwrap();
        assert_eq!(first.unwrap(), b"\x07\x08\x09");
        assert!(matches!(
            second.unwrap_err(),
            Error::Stream(StreamError::Orphaned)
        ));
    }

    #[tokio::test]
    async fn test_get_frame_interrupted_on_disconnect() {
        let (conn, mut server) = TestServer::pair();

        let client = tokio::spawn(async move {
            let mut stream = Stream::open(conn, "stream0".to_string(), "cam")
                .await
                .unwrap();
            stream.get_frame(true).await.map(|_| ())
        });

        server.accept_stream_open("raw", "2,1,8,3").await;
        server.hang_up();

        let err = client.await.unwrap().unwrap_err();
        assert!(matches!(err, Error::Stream(StreamError::Interrupted)));
    }

    #[tokio::test]
    async fn test_get_frame_while_paused() {
        let (conn, mut server) = TestServer::pair();

        let client = tokio::spawn(async move {
            let mut stream = Stream::open(conn, "stream0".to_string(), "cam")
                .await
                .unwrap();
            stream.pause().await.unwrap();
            let blocking = stream.get_frame(true).await.map(|_| ());
            let nonblocking = stream.get_frame(false).await.map(|f| f.is_none());
            (blocking, nonblocking)
        });

        server.accept_stream_open("raw", "2,1,8,3").await;
        let pause = server.expect(VERB_STREAM_PAUSE).await;
        server.respond(pause.request_id, 0).await;

        let (blocking, nonblocking) = client.await.unwrap();
        assert!(matches!(
            blocking.unwrap_err(),
            Error::Stream(StreamError::Interrupted)
        ));
        // Nonblocking pull is still a clean "nothing pending"
        assert!(nonblocking.unwrap());
    }

    #[tokio::test]
    async fn test_unpause_discards_partial_frame() {
        let (conn, mut server) = TestServer::pair();
        let conn_probe = conn.clone();
        let (go_tx, go_rx) = tokio::sync::oneshot::channel();

        let client = tokio::spawn(async move {
            let mut stream = Stream::open(conn, "stream0".to_string(), "cam")
                .await
                .unwrap();
            go_rx.await.unwrap();
            stream.pause().await.unwrap();
            stream.unpause().await.unwrap();
            stream
                .get_frame(true)
                .await
                .map(|f| f.unwrap().data().to_vec())
        });

        server.accept_stream_open("raw", "2,1,8,3").await;

        // Half a frame lands, then the stream is paused and resumed
        server.push_data("stream0", b"\x01\x02\x03").await;
        server.sync(&conn_probe).await;
        go_tx.send(()).unwrap();

        let pause = server.expect(VERB_STREAM_PAUSE).await;
        server.respond(pause.request_id, 0).await;
        let unpause = server.expect(VERB_STREAM_UNPAUSE).await;
        server.respond(unpause.request_id, 0).await;

        // The next full frame must come out clean, not glued to the
        // leftover half
        server.push_data("stream0", b"\x0a\x0b\x0c\x0d\x0e\x0f").await;

        assert_eq!(client.await.unwrap().unwrap(), b"\x0a\x0b\x0c\x0d\x0e\x0f");
    }

    #[tokio::test]
    async fn test_close_reports_and_releases_once() {
        let (conn, mut server) = TestServer::pair();
        let conn_probe = conn.clone();

        let client = tokio::spawn(async move {
            let stream = Stream::open(conn, "stream0".to_string(), "cam")
                .await
                .unwrap();
            stream.close().await
        });

        server.accept_stream_open("raw", "320,240,8,3").await;

        let close = server.expect(VERB_STREAM_CLOSE).await;
        assert_ne!(close.request_id, 0);
        server.respond(close.request_id, 0).await;
        client.await.unwrap().unwrap();

        // No second close from Drop: the next message through is the probe
        let probe = tokio::spawn(async move {
            conn_probe
                .request(Message::new([VERB_STREAM_GET_INFO, "sync"]))
                .await
        });
        let req = server.recv().await;
        assert_eq!(req.verb(), Some(VERB_STREAM_GET_INFO));
        server.respond(req.request_id, 0).await;
        probe.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_drop_queues_close() {
        let (conn, mut server) = TestServer::pair();

        let client = tokio::spawn(async move {
            let stream = Stream::open(conn, "stream0".to_string(), "cam")
                .await
                .unwrap();
            drop(stream);
        });

        server.accept_stream_open("raw", "320,240,8,3").await;

        let close = server.expect(VERB_STREAM_CLOSE).await;
        assert_eq!(close.request_id, 0);
        assert_eq!(close.arg(1), Some("stream0"));
        client.await.unwrap();
    }
}
