//! Simple WebSocket echo server example.
//!
//! Run with: cargo run --example echo_server
//! Then connect with any WebSocket client to ws://127.0.0.1:9001/
//!
//! Set `RUST_LOG=wsframe=debug` to see connection events.

use std::error::Error;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tracing_subscriber::EnvFilter;
use wsframe::{Config, Connection, Event, OpCode, Server, Upgrade};

const ADDR: &str = "127.0.0.1:9001";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut server = Server::new(Config::default());

    server.on(Event::Connect, |conn: Arc<Connection<TcpStream>>| {
        println!("  {} connected", conn.id());
        conn.on_message(|conn, frame| async move {
            match frame.opcode {
                OpCode::Text => println!("  {} text: {}", conn.id(), frame.text_payload().unwrap_or("")),
                _ => println!("  {} {}: {} bytes", conn.id(), frame.opcode, frame.length),
            }
            if let Err(e) = conn.send(&frame).await {
                eprintln!("  {} echo failed: {}", conn.id(), e);
            }
        });
        async {}
    });

    server.on(Event::Disconnect, |conn: Arc<Connection<TcpStream>>| {
        println!("  {} disconnected with {}", conn.id(), conn.status());
        async {}
    });

    let server = Arc::new(server);
    let listener = TcpListener::bind(ADDR).await?;
    println!("WebSocket Echo Server listening on {}", ADDR);

    loop {
        let (stream, addr) = listener.accept().await?;
        println!("New connection from: {}", addr);

        let server = server.clone();
        tokio::spawn(async move {
            let upgrade = match Upgrade::read_from(stream, &server.config().limits).await {
                Ok(upgrade) => upgrade,
                Err(e) => {
                    eprintln!("Bad upgrade request from {}: {}", addr, e);
                    return;
                }
            };

            match server.accept(upgrade).await {
                Ok(outcome) => println!("Session {} ended: {}", outcome.id, outcome.status),
                Err(e) => eprintln!("Handshake with {} failed: {}", addr, e),
            }
        });
    }
}
