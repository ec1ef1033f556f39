//! Client entry point
//!
//! [`RelayClient`] owns one connection to a relay server and hands out
//! [`Stream`] and [`Source`] handles over it. The client is cheap to
//! clone; clones share the connection.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

use crate::error::{
    check_source_code, ConnectionError, Error, ErrorCode, ProtocolError, Result, SourceError,
};
use crate::frame::Frame;
use crate::protocol::constants::*;
use crate::protocol::Message;

use super::config::ClientConfig;
use super::connection::Connection;
use super::directory::SourceInfo;
use super::source::Source;
use super::stream::Stream;

/// Client handle for a relay server.
///
/// # Example
/// ```no_run
/// use vidrelay::client::{ClientConfig, RelayClient};
///
/// # async fn example() -> vidrelay::error::Result<()> {
/// let client = RelayClient::connect(ClientConfig::from_env()).await?;
///
/// let mut stream = client.open_stream("forward_camera").await?;
/// stream.resize(640, 480).await?;
///
/// for _ in 0..100 {
///     if let Some(frame) = stream.get_frame(true).await? {
///         println!("frame: {}x{}", frame.width(), frame.height());
///     }
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RelayClient {
    conn: Connection,
    config: ClientConfig,
    stream_counter: Arc<AtomicU64>,
    debug_sources: Arc<Mutex<HashMap<String, Source>>>,
}

impl RelayClient {
    /// Connect to the relay server named in `config`.
    pub async fn connect(config: ClientConfig) -> Result<RelayClient> {
        let addr = config.server_addr;
        let connect = TcpStream::connect(addr);
        let socket = match tokio::time::timeout(config.connect_timeout, connect).await {
            Ok(Ok(socket)) => socket,
            Ok(Err(e)) => {
                return Err(Error::Connection(ConnectionError::Connect {
                    addr,
                    source: e,
                }))
            }
            Err(_) => return Err(Error::Connection(ConnectionError::Timeout(addr))),
        };

        if config.tcp_nodelay {
            socket.set_nodelay(true)?;
        }

        tracing::info!(server = %addr, "Connected to relay server");
        Ok(Self::from_io(socket, config))
    }

    /// Build a client over an already established transport.
    pub(crate) fn from_io<T>(io: T, config: ClientConfig) -> RelayClient
    where
        T: AsyncRead + AsyncWrite + Send + 'static,
    {
        let conn = Connection::establish(io, config.read_buffer_size);
        RelayClient {
            conn,
            config,
            stream_counter: Arc::new(AtomicU64::new(0)),
            debug_sources: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// True while the connection is usable.
    pub fn is_connected(&self) -> bool {
        !self.conn.is_closed()
    }

    /// Disconnect from the server.
    ///
    /// Queued messages are still flushed; open handles stop working and
    /// any blocked frame waits end with an error.
    pub fn disconnect(&self) {
        self.conn.disconnect();
    }

    /// Open a stream over the source named `source_name`.
    ///
    /// Stream names are generated per client, so several streams over the
    /// same source coexist independently.
    pub async fn open_stream(&self, source_name: &str) -> Result<Stream> {
        let name = format!(
            "stream{}",
            self.stream_counter.fetch_add(1, Ordering::Relaxed)
        );
        Stream::open(self.conn.clone(), name, source_name).await
    }

    /// Open a source to publish frames under `name`.
    pub async fn open_source(&self, name: &str) -> Result<Source> {
        Source::open(self.conn.clone(), name, self.config.send_chunk_size).await
    }

    /// Publish a diagnostic frame under `name`.
    ///
    /// The backing source is created on first use and kept for the life
    /// of the client, so call sites can push frames at a stable name
    /// without any setup of their own.
    pub async fn debug(&self, name: &str, frame: &Frame) -> Result<()> {
        let mut sources = self.debug_sources.lock().await;
        let source = match sources.entry(name.to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let source = Source::open(self.conn.clone(), name, self.config.send_chunk_size)
                    .await?;
                entry.insert(source)
            }
        };
        source.send_frame(frame).await
    }

    /// Fetch the directory of live sources.
    pub async fn list_sources(&self) -> Result<Vec<SourceInfo>> {
        let response = self.conn.request(Message::new([VERB_SOURCE_LIST])).await?;

        if response.verb() != Some(VERB_SOURCE_LIST) {
            check_source_code(response.response_code()?)?;
            return Err(Error::Protocol(ProtocolError::MalformedResponse));
        }

        let mut sources = Vec::with_capacity(response.components.len().saturating_sub(1));
        for entry in &response.components[1..] {
            match SourceInfo::parse(entry) {
                Some(info) => sources.push(info),
                None => {
                    tracing::warn!(entry = %entry, "Unparseable source directory entry");
                    return Err(Error::Source(SourceError::Rejected(ErrorCode::ParseError)));
                }
            }
        }
        Ok(sources)
    }

    /// Start a source that runs inside the server, described by an
    /// option string such as `"file:path=/tmp/video.raw"`.
    pub async fn open_server_source(&self, name: &str, descriptor: &str) -> Result<()> {
        let msg = Message::new([VERB_SOURCE_OPEN, "server", name, descriptor]);
        check_source_code(self.conn.request_code(msg).await?)
    }

    /// Stop a server-side source.
    pub async fn close_server_source(&self, name: &str) -> Result<()> {
        let msg = Message::new([VERB_SOURCE_CLOSE, name]);
        check_source_code(self.conn.request_code(msg).await?)
    }

    /// Spawn a server-side source that lives only as long as streams are
    /// attached to it.
    pub async fn spawn_source(&self, name: &str, descriptor: &str) -> Result<()> {
        let msg = Message::new([VERB_SOURCE_SPAWN, name, descriptor]);
        check_source_code(self.conn.request_code(msg).await?)
    }
}
