//! Client library for a frame relay video streaming server.
//!
//! A relay server sits between frame producers and consumers: *sources*
//! push frames in, *streams* pull frames out, and the server fans each
//! source's frames out to the streams attached to it. This crate is the
//! client side of that protocol:
//!
//! - [`RelayClient`](client::RelayClient): one connection to a server,
//!   hands out the other handles
//! - [`Stream`](client::Stream): the pull side, subscribing to a source
//!   and fetching frames with per-stream quality controls
//! - [`Source`](client::Source): the push side, publishing frames under
//!   a name other clients can stream
//!
//! # Example
//! ```no_run
//! use vidrelay::client::{ClientConfig, RelayClient};
//!
//! #[tokio::main]
//! async fn main() -> vidrelay::error::Result<()> {
//!     let client = RelayClient::connect(ClientConfig::from_env()).await?;
//!
//!     let mut stream = client.open_stream("forward_camera").await?;
//!     if let Some(frame) = stream.get_frame(true).await? {
//!         println!("got a {}x{} frame", frame.width(), frame.height());
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;
pub mod frame;
pub mod protocol;

pub use client::{ClientConfig, RelayClient, Source, Stream};
pub use error::{Error, Result};
pub use frame::{Frame, FrameProperties};
