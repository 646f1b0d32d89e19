//! Echo servers for concurrency testing.
//!
//! [`TestServer`] wraps a `wsframe::Server` whose connections echo every data
//! frame back, either behind a TCP listener on a random port or over
//! in-memory pipes.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, DuplexStream};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use wsframe::{Config, Connection, Event, Result, Server, Upgrade};

use super::{Metrics, TestClient};

pub struct TestServer<S> {
    server: Arc<Server<S>>,
    events: Metrics,
    accept_loop: Option<JoinHandle<()>>,
}

fn echo_server<S>(config: Config, events: Metrics) -> Server<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let mut server = Server::new(config);

    let connects = events.clone();
    server.on(Event::Connect, move |conn: Arc<Connection<S>>| {
        connects.record_connection();
        conn.on_message(|conn, frame| async move {
            let _ = conn.send(&frame).await;
        });
        async {}
    });

    server.on(Event::Disconnect, move |_: Arc<Connection<S>>| {
        events.record_disconnect();
        async {}
    });

    server
}

async fn serve<S>(server: Arc<Server<S>>, stream: S)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    if let Ok(upgrade) = Upgrade::read_from(stream, &server.config().limits).await {
        let _ = server.accept(upgrade).await;
    }
}

impl TestServer<TcpStream> {
    /// Bind an echo server to a random local port.
    pub async fn spawn() -> (Self, SocketAddr) {
        Self::spawn_with_config(Config::default()).await
    }

    pub async fn spawn_with_config(config: Config) -> (Self, SocketAddr) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let events = Metrics::new();
        let server = Arc::new(echo_server(config, events.clone()));

        let accept_loop = tokio::spawn({
            let server = server.clone();
            async move {
                while let Ok((stream, _)) = listener.accept().await {
                    let _ = stream.set_nodelay(true);
                    tokio::spawn(serve(server.clone(), stream));
                }
            }
        });

        let test_server = Self {
            server,
            events,
            accept_loop: Some(accept_loop),
        };
        (test_server, addr)
    }
}

impl TestServer<DuplexStream> {
    /// Echo server reached through in-memory pipes.
    pub fn in_memory() -> Self {
        Self::in_memory_with_config(Config::default())
    }

    pub fn in_memory_with_config(config: Config) -> Self {
        let events = Metrics::new();
        Self {
            server: Arc::new(echo_server(config, events.clone())),
            events,
            accept_loop: None,
        }
    }

    /// Open a pipe to the server and complete the handshake on it.
    pub async fn connect(&self, id: usize) -> Result<TestClient<DuplexStream>> {
        let (client, stream) = tokio::io::duplex(64 * 1024);
        tokio::spawn(serve(self.server.clone(), stream));
        TestClient::handshake(client, id).await
    }
}

impl<S> TestServer<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    pub fn server(&self) -> &Arc<Server<S>> {
        &self.server
    }

    pub fn connects(&self) -> usize {
        self.events.connections_total()
    }

    pub fn disconnects(&self) -> usize {
        self.events.disconnects()
    }

    /// Wait until every accepted connection has been torn down.
    pub async fn wait_idle(&self) {
        let idle = async {
            while !self.server.is_empty() || self.connects() != self.disconnects() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        };
        if tokio::time::timeout(Duration::from_secs(10), idle).await.is_err() {
            panic!(
                "server not idle: {} registered, {} connects, {} disconnects",
                self.server.len(),
                self.connects(),
                self.disconnects()
            );
        }
    }

    /// Stop accepting and close whatever is still open.
    pub async fn shutdown(mut self) {
        if let Some(accept_loop) = self.accept_loop.take() {
            accept_loop.abort();
        }
        for conn in self.server.connections() {
            let _ = conn.close().await;
        }
    }
}
