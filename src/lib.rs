//! # wsframe - Server-side WebSocket framing over an upgraded stream
//!
//! `wsframe` takes over a duplex byte stream once an HTTP server has agreed to
//! upgrade it, and speaks RFC 6455 on it: the 101 handshake response, frame
//! decoding and encoding, validation of everything a client sends, automatic
//! pong replies, and the close exchange with the right status code.
//!
//! ## Features
//!
//! - **Bounded decoding**: frame sizes are checked before any allocation
//! - **Strict validation** of client frames with per-violation close codes
//! - **Single writer** per connection, shared by callbacks and outside code
//! - **Connection registry** with connect/disconnect events
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use wsframe::{Config, Event, Server, Upgrade};
//!
//! let mut server = Server::new(Config::default());
//! server.on(Event::Connect, |conn| async move {
//!     conn.on_message(|conn, frame| async move {
//!         let _ = conn.send(&frame).await;
//!     });
//! });
//! let server = Arc::new(server);
//!
//! // For each upgraded stream:
//! let outcome = server.accept(Upgrade::new(stream, key)).await?;
//! ```

pub mod codec;
pub mod config;
pub mod connection;
pub mod error;
pub mod protocol;
pub mod server;
pub mod stream;

pub use codec::FrameCodec;
pub use config::{Config, Limits};
pub use connection::{Connection, ConnectionId, ConnectionState};
pub use error::{Error, Result};
pub use protocol::{
    CloseCode, Frame, FrameValidator, HandshakeRequest, HandshakeResponse, OpCode, WS_GUID,
    compute_accept_key,
};
pub use server::{Disconnect, Event, Server, Upgrade};
pub use stream::ByteStream;
