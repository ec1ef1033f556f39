//! In-memory fake relay server
//!
//! Test-only scripting harness. [`TestServer::pair`] wires a [`Connection`]
//! to one end of a duplex pipe and hands back the other end wrapped in
//! helpers for receiving client requests and scripting server behavior.

use bytes::{Bytes, BytesMut};
use tokio::io::DuplexStream;

use super::config::ClientConfig;
use super::connection::Connection;
use super::relay::RelayClient;
use crate::protocol::codec;
use crate::protocol::constants::*;
use crate::protocol::Message;

pub(crate) struct TestServer {
    io: DuplexStream,
    read_buf: BytesMut,
    scratch: BytesMut,
}

impl TestServer {
    /// A connection talking to a scriptable in-memory server.
    pub(crate) fn pair() -> (Connection, TestServer) {
        let (client_io, server_io) = tokio::io::duplex(1 << 16);
        let conn = Connection::establish(client_io, 8 * 1024);
        (conn, TestServer::new(server_io))
    }

    /// A full client talking to a scriptable in-memory server.
    pub(crate) fn client_pair(config: ClientConfig) -> (RelayClient, TestServer) {
        let (client_io, server_io) = tokio::io::duplex(1 << 16);
        let client = RelayClient::from_io(client_io, config);
        (client, TestServer::new(server_io))
    }

    fn new(io: DuplexStream) -> TestServer {
        TestServer {
            io,
            read_buf: BytesMut::new(),
            scratch: BytesMut::new(),
        }
    }

    /// Read the next message sent by the client.
    pub(crate) async fn recv(&mut self) -> Message {
        codec::read_message(&mut self.io, &mut self.read_buf)
            .await
            .expect("read from client")
            .expect("client closed the connection")
    }

    /// Read the next message and assert its verb.
    pub(crate) async fn expect(&mut self, verb: &str) -> Message {
        let msg = self.recv().await;
        assert_eq!(
            msg.verb(),
            Some(verb),
            "unexpected message: {:?}",
            msg.components
        );
        msg
    }

    pub(crate) async fn send(&mut self, msg: Message) {
        codec::write_message(&mut self.io, &mut self.scratch, &msg)
            .await
            .expect("write to client");
    }

    /// Reply to a request with a bare status code.
    pub(crate) async fn respond(&mut self, request_id: u16, code: u16) {
        self.send(Message::response(request_id, code)).await;
    }

    pub(crate) async fn push_data(&mut self, name: &str, payload: &[u8]) {
        let msg = Message::with_payload([VERB_DATA, name], Bytes::copy_from_slice(payload));
        self.send(msg).await;
    }

    pub(crate) async fn push_orphaned(&mut self, name: &str) {
        self.send(Message::new([VERB_STREAM_ORPHANED, name])).await;
    }

    pub(crate) async fn kick(&mut self, reason: &str) {
        self.send(Message::new([VERB_KICK, reason])).await;
    }

    /// Drop the server end of the pipe.
    pub(crate) fn hang_up(self) {}

    /// Round-trip a throwaway request so everything pushed before it is
    /// known to have been dispatched by the reader task.
    pub(crate) async fn sync(&mut self, conn: &Connection) {
        let conn = conn.clone();
        let probe = tokio::spawn(async move {
            conn.request(Message::new([VERB_STREAM_GET_INFO, "sync"]))
                .await
        });
        let req = self.recv().await;
        self.respond(req.request_id, 0).await;
        probe.await.expect("probe task").expect("probe response");
    }

    /// Serve one stream's three-request open sequence, answering `getInfo`
    /// with the given encoding and properties. Returns the stream name the
    /// client generated.
    pub(crate) async fn accept_stream_open(&mut self, encoding: &str, properties: &str) -> String {
        let open = self.expect(VERB_STREAM_OPEN).await;
        let name = open.arg(1).expect("stream name").to_string();
        self.respond(open.request_id, 0).await;

        let attach = self.expect(VERB_STREAM_ATTACH_SOURCE).await;
        assert_eq!(attach.arg(1), Some(name.as_str()));
        self.respond(attach.request_id, 0).await;

        self.serve_get_info(&name, encoding, properties).await;
        name
    }

    /// Answer one `Stream.getInfo` request.
    pub(crate) async fn serve_get_info(&mut self, name: &str, encoding: &str, properties: &str) {
        let info = self.expect(VERB_STREAM_GET_INFO).await;
        assert_eq!(info.arg(1), Some(name));

        let mut reply = Message::new([VERB_STREAM_GET_INFO, name, encoding, properties]);
        reply.request_id = info.request_id;
        self.send(reply).await;
    }

    /// Serve one source's open sequence: `Source.open client` plus the
    /// default encoding negotiation.
    pub(crate) async fn accept_source_open(&mut self, name: &str) {
        let open = self.expect(VERB_SOURCE_OPEN).await;
        assert_eq!(open.arg(1), Some("client"));
        assert_eq!(open.arg(2), Some(name));
        self.respond(open.request_id, 0).await;

        let enc = self.expect(VERB_SOURCE_SET_ENCODING).await;
        assert_eq!(enc.arg(1), Some(name));
        assert_eq!(enc.arg(2), Some(DEFAULT_ENCODING));
        self.respond(enc.request_id, 0).await;
    }
}
