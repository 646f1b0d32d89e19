//! WebSocket test client for concurrency testing.
//!
//! Speaks the client side of the protocol: sends the upgrade request, masks
//! every frame it sends, and decodes the server's unmasked frames.

use std::net::SocketAddr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use wsframe::codec::encode_to_vec;
use wsframe::protocol::apply_mask;
use wsframe::{ByteStream, CloseCode, Error, Frame, FrameCodec, Limits, OpCode, Result};

pub struct TestClient<S = TcpStream> {
    stream: ByteStream<S>,
    codec: FrameCodec,
    id: usize,
    sent: u32,
}

impl TestClient<TcpStream> {
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        Self::connect_with_id(addr, 0).await
    }

    pub async fn connect_with_id(addr: SocketAddr, id: usize) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        Self::handshake(stream, id).await
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> TestClient<S> {
    /// Send the upgrade request on `stream` and check the 101 response.
    pub async fn handshake(stream: S, id: usize) -> Result<Self> {
        let key = BASE64.encode((id as u128).to_be_bytes());
        let request = format!(
            "GET /client/{id} HTTP/1.1\r\n\
             Host: localhost\r\n\
             Upgrade: websocket\r\n\
             Connection: Upgrade\r\n\
             Sec-WebSocket-Key: {key}\r\n\
             Sec-WebSocket-Version: 13\r\n\r\n"
        );

        let mut stream = ByteStream::new(stream);
        stream.write_all(request.as_bytes()).await?;

        let mut head = Vec::new();
        while !head.ends_with(b"\r\n\r\n") {
            let [byte] = stream.read_array::<1>().await?;
            head.push(byte);
        }

        let head = String::from_utf8_lossy(&head);
        let accept = wsframe::compute_accept_key(&key);
        if !head.starts_with("HTTP/1.1 101") || !head.contains(&accept) {
            return Err(Error::InvalidHandshake(format!("unexpected response: {head}")));
        }

        Ok(Self {
            stream,
            codec: FrameCodec::new(Limits::default(), 0),
            id,
            sent: 0,
        })
    }

    pub fn id(&self) -> usize {
        self.id
    }

    fn next_mask(&mut self) -> [u8; 4] {
        self.sent = self.sent.wrapping_add(1);
        ((self.id as u32) ^ self.sent.rotate_left(16) ^ 0xa5a5_5a5a).to_be_bytes()
    }

    /// Masked wire form of `frame`.
    pub fn mask_frame(&mut self, frame: &Frame) -> Vec<u8> {
        let mask = self.next_mask();
        let plain = encode_to_vec(frame);
        let header_len = plain.len() - frame.payload.len();

        let mut out = Vec::with_capacity(plain.len() + 4);
        out.extend_from_slice(&plain[..header_len]);
        out[1] |= 0x80;
        out.extend_from_slice(&mask);
        let start = out.len();
        out.extend_from_slice(&frame.payload);
        apply_mask(&mut out[start..], mask);
        out
    }

    pub async fn send_frame(&mut self, frame: &Frame) -> Result<()> {
        let bytes = self.mask_frame(frame);
        self.stream.write_all(&bytes).await
    }

    /// Write bytes exactly as given, bypassing masking.
    pub async fn send_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.stream.write_all(bytes).await
    }

    pub async fn send_text(&mut self, text: &str) -> Result<()> {
        self.send_frame(&Frame::text(text)).await
    }

    pub async fn send_binary(&mut self, data: &[u8]) -> Result<()> {
        self.send_frame(&Frame::binary(data.to_vec())).await
    }

    pub async fn send_ping(&mut self, data: &[u8]) -> Result<()> {
        self.send_frame(&Frame::ping(data.to_vec())).await
    }

    pub async fn recv_frame(&mut self) -> Result<Frame> {
        self.codec.decode(&mut self.stream).await
    }

    /// Receive the next text message, skipping pongs. `None` on close.
    pub async fn recv_text(&mut self) -> Result<Option<String>> {
        loop {
            let frame = self.recv_frame().await?;
            match frame.opcode {
                OpCode::Text => {
                    return String::from_utf8(frame.into_payload())
                        .map(Some)
                        .map_err(|_| Error::InvalidUtf8);
                }
                OpCode::Close => return Ok(None),
                _ => {}
            }
        }
    }

    /// Wait for the server's close frame and return its status code.
    pub async fn recv_close(&mut self) -> Result<Option<u16>> {
        loop {
            let frame = self.recv_frame().await?;
            if frame.opcode == OpCode::Close {
                return Ok(frame.close_code());
            }
        }
    }

    /// Perform the close exchange. Returns the status the server replied with.
    pub async fn close(&mut self) -> Result<Option<u16>> {
        self.send_frame(&Frame::close(CloseCode::NormalClosure, "")).await?;
        self.recv_close().await
    }

    /// Whether the server has shut its side of the stream.
    pub async fn is_eof(&mut self) -> bool {
        matches!(self.stream.read_array::<1>().await, Err(Error::Io(_)))
    }
}
