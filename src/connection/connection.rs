use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU16, Ordering};

use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncWrite, ReadHalf, WriteHalf};
use tokio::sync::watch;

use crate::codec::FrameCodec;
use crate::config::Config;
use crate::connection::{ConnectionId, ConnectionState};
use crate::error::{Error, Result};
use crate::protocol::{CloseCode, Frame, FrameValidator, HandshakeResponse, OpCode};
use crate::stream::ByteStream;

/// Boxed future returned by connection callbacks.
pub type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Callback invoked for every valid data frame received on a connection.
pub type MessageCallback<T> = Arc<dyn Fn(Arc<Connection<T>>, Frame) -> BoxFuture + Send + Sync>;

struct Writer<T> {
    stream: ByteStream<WriteHalf<T>>,
    codec: FrameCodec,
}

impl<T: AsyncWrite> Writer<T> {
    async fn send(&mut self, frame: &Frame) -> Result<()> {
        self.stream.write_all(self.codec.encode(frame)).await
    }
}

/// A server-side WebSocket connection over an upgraded stream.
///
/// The connection owns both halves of the stream. Only the receive loop
/// ([`Connection::run`]) reads; every write (handshake response, pong, close,
/// and any [`Connection::send`] from callbacks or other tasks) goes through a
/// single guarded writer, so frames are never interleaved on the wire.
///
/// ## Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use wsframe::{Config, Connection};
///
/// let conn = Arc::new(Connection::new(stream, key, Config::default()));
/// conn.handshake().await?;
/// conn.on_message(|conn, frame| async move {
///     let _ = conn.send(&frame).await;
/// });
/// conn.run().await?;
/// ```
pub struct Connection<T> {
    id: ConnectionId,
    key: String,
    config: Config,
    validator: FrameValidator,
    decoder: FrameCodec,
    state: Mutex<ConnectionState>,
    status: AtomicU16,
    reader: tokio::sync::Mutex<Option<ByteStream<ReadHalf<T>>>>,
    writer: tokio::sync::Mutex<Option<Writer<T>>>,
    on_message: Mutex<Option<MessageCallback<T>>>,
    closing: watch::Sender<bool>,
    close_error: Mutex<Option<Error>>,
}

impl<T> Connection<T> {
    /// Get the connection identifier.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Get the client's `Sec-WebSocket-Key`.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Get the connection configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    /// Check if the connection is in an open state.
    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Close status that will be reported when the connection closes.
    ///
    /// Starts as Normal Closure and tracks the most recent violation.
    pub fn status(&self) -> CloseCode {
        CloseCode::from_u16(self.status.load(Ordering::Acquire))
    }

    fn set_status(&self, status: CloseCode) {
        if status != self.status() {
            self.status.store(status.as_u16(), Ordering::Release);
        }
    }

    fn set_state(&self, state: ConnectionState) {
        *self.state.lock() = state;
    }

    /// Failure from writing the close frame or shutting the stream down, if
    /// the last close attempt hit one.
    pub fn close_error(&self) -> Option<Error> {
        self.close_error.lock().clone()
    }

    /// Register the callback that receives valid data frames.
    ///
    /// Replaces any previously registered callback.
    pub fn on_message<F, Fut>(&self, callback: F)
    where
        T: 'static,
        F: Fn(Arc<Connection<T>>, Frame) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let callback: MessageCallback<T> = Arc::new(move |conn, frame| Box::pin(callback(conn, frame)));
        *self.on_message.lock() = Some(callback);
    }
}

impl<T: AsyncRead + AsyncWrite> Connection<T> {
    /// Create a connection over an already-upgraded stream.
    ///
    /// `key` is the `Sec-WebSocket-Key` value from the upgrade request. The
    /// connection starts in [`ConnectionState::Handshaking`].
    pub fn new(io: T, key: impl Into<String>, config: Config) -> Self {
        let (read, write) = ByteStream::new(io).split();
        let writer = Writer {
            stream: write,
            codec: FrameCodec::new(config.limits.clone(), config.write_buffer_size),
        };
        Self {
            id: ConnectionId::next(),
            key: key.into(),
            validator: FrameValidator::new(),
            decoder: FrameCodec::new(config.limits.clone(), 0),
            config,
            state: Mutex::new(ConnectionState::Handshaking),
            status: AtomicU16::new(CloseCode::NormalClosure.as_u16()),
            reader: tokio::sync::Mutex::new(Some(read)),
            writer: tokio::sync::Mutex::new(Some(writer)),
            on_message: Mutex::new(None),
            closing: watch::channel(false).0,
            close_error: Mutex::new(None),
        }
    }
}

impl<T: AsyncRead + AsyncWrite + Send + 'static> Connection<T> {
    /// Write the 101 upgrade response and move to `Open`.
    ///
    /// On failure the state is left untouched and the connection should be
    /// discarded.
    ///
    /// ## Errors
    ///
    /// - `Error::InvalidState` if the handshake already ran
    /// - `Error::InvalidHandshake` if the key is empty or malformed
    /// - I/O errors from the underlying stream
    pub async fn handshake(&self) -> Result<()> {
        let state = self.state();
        if state != ConnectionState::Handshaking {
            return Err(Error::InvalidState(state));
        }

        let response = HandshakeResponse::for_key(&self.key, &self.config.server_name)?;

        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(Error::ConnectionClosed)?;
        writer.stream.write_all(&response.to_bytes()).await?;
        drop(guard);

        self.set_state(ConnectionState::Open);
        Ok(())
    }

    /// Send a frame to the peer.
    ///
    /// ## Errors
    ///
    /// - `Error::InvalidState` unless the connection is `Open`
    /// - `Error::ConnectionClosed` if the stream was already released
    /// - I/O errors from the underlying stream
    pub async fn send(&self, frame: &Frame) -> Result<()> {
        let state = self.state();
        if !state.can_send() {
            return Err(Error::InvalidState(state));
        }

        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(Error::ConnectionClosed)?;
        writer.send(frame).await
    }

    /// Send a text frame.
    pub async fn send_text(&self, text: impl Into<String>) -> Result<()> {
        self.send(&Frame::text(text)).await
    }

    /// Send a binary frame.
    pub async fn send_binary(&self, data: impl Into<Vec<u8>>) -> Result<()> {
        self.send(&Frame::binary(data)).await
    }

    /// Read and validate the next frame, updating the close status.
    ///
    /// Gives up with `Error::ConnectionClosed` as soon as a local close
    /// starts, even if the peer never sends anything again.
    async fn next_frame(&self) -> Result<Frame> {
        let mut closing = self.closing.subscribe();
        let mut guard = self.reader.lock().await;
        let stream = guard.as_mut().ok_or(Error::ConnectionClosed)?;

        let decoded = tokio::select! {
            decoded = self.decoder.decode(stream) => decoded,
            _ = closing.wait_for(|closing| *closing) => return Err(Error::ConnectionClosed),
        };

        let frame = match decoded {
            Ok(frame) => frame,
            Err(err) => {
                if let Some(status) = err.close_code() {
                    self.set_status(status);
                }
                return Err(err);
            }
        };

        let (status, result) = self.validator.validate(&frame, self.status());
        self.set_status(status);
        result.map(|()| frame)
    }

    async fn dispatch(self: &Arc<Self>, frame: Frame) {
        let callback = self.on_message.lock().clone();
        if let Some(callback) = callback {
            callback(Arc::clone(self), frame).await;
        }
    }

    /// Run the receive loop until the connection ends.
    ///
    /// Pings are answered with a pong carrying the same payload. Valid data
    /// frames are handed to the message callback, which runs to completion
    /// before the next frame is read. A close frame, a protocol violation, or
    /// an I/O error ends the loop; the connection then closes with its
    /// current status, except after an I/O error where the stream is torn
    /// down without a close frame.
    ///
    /// Returns `Ok(())` when the peer closed cleanly or the connection had
    /// already been closed locally.
    ///
    /// ## Errors
    ///
    /// - `Error::InvalidState` if the connection is not `Open`
    /// - The protocol violation or I/O error that ended the loop
    pub async fn run(self: &Arc<Self>) -> Result<()> {
        let state = self.state();
        if !state.can_receive() {
            return Err(Error::InvalidState(state));
        }

        let outcome = loop {
            let frame = match self.next_frame().await {
                Ok(frame) => frame,
                Err(err) => break Err(err),
            };

            match frame.opcode {
                OpCode::Close => break Ok(()),
                OpCode::Ping => {
                    if let Err(err) = self.send(&frame.into_pong()).await {
                        break Err(err);
                    }
                }
                OpCode::Pong => {}
                op if op.is_data() => self.dispatch(frame).await,
                _ => {}
            }
        };

        // Closed locally while the loop was waiting on the peer.
        if !self.state().can_receive() {
            self.reader.lock().await.take();
            return Ok(());
        }

        self.reader.lock().await.take();

        match outcome {
            Err(err) if err.is_io() => {
                self.abort().await;
                Err(err)
            }
            Err(err) => {
                // A failed close write is recorded in `close_error`.
                let _ = self.close().await;
                Err(err)
            }
            Ok(()) => self.close().await,
        }
    }

    /// Send a close frame carrying the current status and release the stream.
    ///
    /// Idempotent: calls after the first (or while another close is in
    /// progress) return `Ok(())` without writing anything.
    ///
    /// ## Errors
    ///
    /// I/O errors from writing the close frame or shutting the stream down.
    /// The stream is released and the state is `Closed` either way.
    pub async fn close(&self) -> Result<()> {
        let previous = {
            let mut state = self.state.lock();
            let previous = *state;
            if matches!(previous, ConnectionState::Closing | ConnectionState::Closed) {
                return Ok(());
            }
            *state = ConnectionState::Closing;
            previous
        };
        self.closing.send_replace(true);

        let result = match self.writer.lock().await.take() {
            Some(mut writer) => {
                let sent = if previous == ConnectionState::Open {
                    writer.send(&Frame::close(self.status(), "")).await
                } else {
                    Ok(())
                };
                let shutdown = writer.stream.close().await;
                sent.and(shutdown)
            }
            None => Ok(()),
        };

        if let Err(err) = &result {
            *self.close_error.lock() = Some(err.clone());
        }
        self.set_state(ConnectionState::Closed);
        result
    }

    /// Release the stream without attempting a close handshake.
    async fn abort(&self) {
        self.set_state(ConnectionState::Closing);
        self.closing.send_replace(true);
        if let Some(mut writer) = self.writer.lock().await.take() {
            let _ = writer.stream.close().await;
        }
        self.set_state(ConnectionState::Closed);
    }
}

impl<T> std::fmt::Debug for Connection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}
