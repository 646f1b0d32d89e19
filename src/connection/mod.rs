//! Server-side WebSocket connections and their receive loop.
//!
//! ## Connection Lifecycle
//!
//! 1. **Handshaking** - Stream handed over, 101 response not yet written
//! 2. **Open** - Handshake done, frames flow both ways
//! 3. **Closing** - Receive loop ended or close requested
//! 4. **Closed** - Stream released
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use wsframe::{Config, Connection};
//!
//! let conn = Arc::new(Connection::new(stream, key, Config::default()));
//! conn.handshake().await?;
//! conn.on_message(|conn, frame| async move {
//!     let _ = conn.send(&frame).await;
//! });
//! conn.run().await?;
//! ```

mod id;
mod state;

#[allow(clippy::module_inception)]
mod connection;

pub use connection::{BoxFuture, Connection, MessageCallback};
pub use id::ConnectionId;
pub use state::ConnectionState;
