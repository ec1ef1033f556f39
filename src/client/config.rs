//! Client configuration

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::protocol::constants::*;

/// Environment variable overriding the server address.
pub const SERVER_ENV_VAR: &str = "VIDRELAY_SERVER";

/// Client configuration options
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Relay server address
    pub server_addr: SocketAddr,

    /// Connection timeout (TCP connect must complete within this time)
    pub connect_timeout: Duration,

    /// Enable TCP_NODELAY (disable Nagle's algorithm)
    pub tcp_nodelay: bool,

    /// Payload bytes per Data message when sending frames
    pub send_chunk_size: usize,

    /// Application-level read buffer size
    pub read_buffer_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)),
            connect_timeout: Duration::from_secs(10),
            tcp_nodelay: true, // Important for low latency
            send_chunk_size: DEFAULT_CHUNK_SIZE,
            read_buffer_size: 64 * 1024, // 64KB
        }
    }
}

impl ClientConfig {
    /// Create a config with a custom server address.
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            server_addr: addr,
            ..Default::default()
        }
    }

    /// Create a config from the environment.
    ///
    /// Honors `VIDRELAY_SERVER` as `host:port` or a bare IP address (default
    /// port). An unparseable value is logged and ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(value) = std::env::var(SERVER_ENV_VAR) {
            match parse_server_addr(&value) {
                Some(addr) => {
                    config.server_addr = addr;
                    tracing::info!(
                        server = %addr,
                        "Using relay server from {} environment variable",
                        SERVER_ENV_VAR
                    );
                }
                None => {
                    tracing::warn!(
                        value = %value,
                        "Ignoring unparseable {} environment variable",
                        SERVER_ENV_VAR
                    );
                }
            }
        }

        config
    }

    /// Set the server address.
    pub fn server(mut self, addr: SocketAddr) -> Self {
        self.server_addr = addr;
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set TCP_NODELAY.
    pub fn tcp_nodelay(mut self, enabled: bool) -> Self {
        self.tcp_nodelay = enabled;
        self
    }

    /// Set the payload size frame data is chunked into.
    ///
    /// Capped at the wire format's per-message payload limit.
    pub fn send_chunk_size(mut self, size: usize) -> Self {
        self.send_chunk_size = size.clamp(1, MAX_PAYLOAD_LEN);
        self
    }
}

/// Parse `host:port` or a bare IP address with the default port.
fn parse_server_addr(value: &str) -> Option<SocketAddr> {
    if let Ok(addr) = value.parse::<SocketAddr>() {
        return Some(addr);
    }
    value
        .parse::<IpAddr>()
        .ok()
        .map(|ip| SocketAddr::new(ip, DEFAULT_PORT))
}
