//! Relay client implementation
//!
//! Provides client-side access to a relay server:
//! - Pulling frames from named streams
//! - Publishing frames through named sources
//! - Administering server-side sources
//!
//! Everything runs over one connection, owned by [`RelayClient`].

pub mod config;
pub(crate) mod connection;
pub mod directory;
pub mod relay;
pub mod source;
pub mod stream;

#[cfg(test)]
pub(crate) mod testutil;

pub use config::ClientConfig;
pub use directory::{SourceInfo, SourceKind};
pub use relay::RelayClient;
pub use source::Source;
pub use stream::Stream;
