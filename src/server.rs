//! Connection registry and lifecycle events.
//!
//! A [`Server`] takes over upgraded streams, runs the WebSocket handshake and
//! receive loop for each one, and keeps a map of live connections so other
//! tasks can look them up and send to them.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tracing::{debug, trace};

use crate::config::{Config, Limits};
use crate::connection::{BoxFuture, Connection, ConnectionId};
use crate::error::{Error, Result};
use crate::protocol::{CloseCode, HandshakeRequest};

/// Callback fired on connection lifecycle events.
pub type EventCallback<T> = Arc<dyn Fn(Arc<Connection<T>>) -> BoxFuture + Send + Sync>;

/// Connection lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    /// Handshake completed and the connection was registered.
    Connect,
    /// Receive loop ended and the connection was removed.
    Disconnect,
}

/// An upgraded stream ready to be handed to [`Server::accept`].
#[derive(Debug)]
pub struct Upgrade<T> {
    /// The hijacked duplex stream.
    pub stream: T,
    /// The client's `Sec-WebSocket-Key`.
    pub key: String,
}

impl<T> Upgrade<T> {
    /// Bundle a stream with the client's key.
    pub fn new(stream: T, key: impl Into<String>) -> Self {
        Self {
            stream,
            key: key.into(),
        }
    }

    /// Bundle a stream with the key from a parsed upgrade request.
    pub fn from_request(stream: T, request: &HandshakeRequest) -> Self {
        Self::new(stream, request.key.clone())
    }
}

impl<T: AsyncRead + Unpin> Upgrade<T> {
    /// Read and validate an upgrade request from a raw stream.
    ///
    /// For servers that accept plain TCP and have no HTTP layer of their own.
    /// Reads byte by byte up to the blank line so no frame bytes are consumed.
    ///
    /// ## Errors
    ///
    /// - `Error::HandshakeTooLarge` if the head exceeds `limits.max_handshake_size`
    /// - `Error::InvalidHandshake` if the request is not a valid upgrade
    /// - I/O errors, including the stream ending before the head is complete
    pub async fn read_from(mut stream: T, limits: &Limits) -> Result<Self> {
        let mut head = Vec::with_capacity(512);
        while !head.ends_with(b"\r\n\r\n") {
            limits.check_handshake_size(head.len() + 1)?;
            head.push(stream.read_u8().await?);
        }

        let request = HandshakeRequest::parse_with_limit(&head, limits.max_handshake_size)?;
        request.validate()?;
        Ok(Self::from_request(stream, &request))
    }
}

/// Outcome of a connection that was accepted and has since ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disconnect {
    /// Identifier the connection was registered under.
    pub id: ConnectionId,
    /// Close status the connection ended with.
    pub status: CloseCode,
    /// Violation or I/O error that ended the receive loop, if any.
    pub error: Option<Error>,
    /// Failure to deliver the close frame or shut the stream down, if any.
    pub close_error: Option<Error>,
}

/// Registry of live connections.
///
/// Register callbacks with [`Server::on`] before sharing the server (usually
/// behind an `Arc`) across accept tasks.
pub struct Server<T> {
    config: Config,
    connections: Mutex<HashMap<ConnectionId, Arc<Connection<T>>>>,
    on_connect: Option<EventCallback<T>>,
    on_disconnect: Option<EventCallback<T>>,
}

impl<T> Server<T> {
    /// Create a server with the given configuration.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            connections: Mutex::new(HashMap::new()),
            on_connect: None,
            on_disconnect: None,
        }
    }

    /// Get the configuration applied to accepted connections.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Register the callback for `event`, replacing any previous one.
    pub fn on<F, Fut>(&mut self, event: Event, callback: F)
    where
        T: 'static,
        F: Fn(Arc<Connection<T>>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let callback: EventCallback<T> = Arc::new(move |conn| Box::pin(callback(conn)));
        match event {
            Event::Connect => self.on_connect = Some(callback),
            Event::Disconnect => self.on_disconnect = Some(callback),
        }
    }

    /// Look up a live connection.
    pub fn get_connection(&self, id: ConnectionId) -> Option<Arc<Connection<T>>> {
        self.connections.lock().get(&id).cloned()
    }

    /// Snapshot of all live connections.
    pub fn connections(&self) -> Vec<Arc<Connection<T>>> {
        self.connections.lock().values().cloned().collect()
    }

    /// Number of live connections.
    pub fn len(&self) -> usize {
        self.connections.lock().len()
    }

    /// Check if no connections are registered.
    pub fn is_empty(&self) -> bool {
        self.connections.lock().is_empty()
    }

    fn register(&self, conn: &Arc<Connection<T>>) {
        let mut connections = self.connections.lock();
        connections.insert(conn.id(), Arc::clone(conn));
        trace!(connections = connections.len(), "registry grew");
    }

    fn unregister(&self, id: ConnectionId) {
        let mut connections = self.connections.lock();
        connections.remove(&id);
        trace!(connections = connections.len(), "registry shrank");
    }
}

impl<T: AsyncRead + AsyncWrite + Send + 'static> Server<T> {
    /// Take over an upgraded stream and serve it until it ends.
    ///
    /// Writes the handshake response, registers the connection, fires
    /// [`Event::Connect`], and runs the receive loop. When the loop exits the
    /// connection is closed if still needed, removed from the registry, and
    /// [`Event::Disconnect`] fires. Resolves once all of that is done.
    ///
    /// ## Errors
    ///
    /// Returns the handshake error if the upgrade response could not be
    /// written. Nothing is registered and no event fires in that case.
    pub async fn accept(&self, upgrade: Upgrade<T>) -> Result<Disconnect> {
        let conn = Arc::new(Connection::new(upgrade.stream, upgrade.key, self.config.clone()));

        if let Err(err) = conn.handshake().await {
            debug!(id = %conn.id(), error = %err, "handshake failed");
            return Err(err);
        }

        let id = conn.id();
        self.register(&conn);
        debug!(id = %id, "connection opened");

        if let Some(callback) = &self.on_connect {
            callback(Arc::clone(&conn)).await;
        }

        let error = conn.run().await.err();

        if conn.state().is_active() {
            if let Err(err) = conn.close().await {
                debug!(id = %id, error = %err, "close frame not delivered");
            }
        }
        let close_error = conn.close_error();

        self.unregister(id);
        debug!(
            id = %id,
            status = %conn.status(),
            error = ?error,
            close_error = ?close_error,
            "connection closed"
        );

        if let Some(callback) = &self.on_disconnect {
            callback(Arc::clone(&conn)).await;
        }

        Ok(Disconnect {
            id,
            status: conn.status(),
            error,
            close_error,
        })
    }
}

impl<T> Default for Server<T> {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl<T> std::fmt::Debug for Server<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .field("connections", &self.len())
            .finish_non_exhaustive()
    }
}
