//! Error types for the WebSocket server core.
//!
//! Three families of failure are distinguished: I/O errors on the underlying
//! stream, protocol violations detected in received frames, and handshake
//! failures. Protocol violations carry the close status they report to the
//! peer, see [`Error::close_code`].

use thiserror::Error;

use crate::connection::ConnectionState;
use crate::protocol::CloseCode;

/// Result type alias for WebSocket operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during WebSocket operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// I/O error on the underlying stream, including unexpected end of stream.
    #[error("I/O error: {0}")]
    Io(String),

    /// The stream has already been released.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Declared payload length exceeds the configured maximum.
    #[error("Frame too large: {size} bytes (max: {max})")]
    FrameTooLarge {
        /// Declared payload length.
        size: u64,
        /// Maximum allowed size.
        max: u64,
    },

    /// Client frame without the MASK bit.
    #[error("Protocol violation: unmasked client frame")]
    UnmaskedClientFrame,

    /// Control frame with FIN clear.
    #[error("Protocol violation: control frames cannot be fragmented")]
    FragmentedControlFrame,

    /// Control frame payload above 125 bytes.
    #[error("Protocol violation: control frame payload too large: {0} bytes (max: 125)")]
    ControlFrameTooLarge(u64),

    /// Opcode 0x3-0x7 or 0xB-0xF.
    #[error("Protocol violation: opcode {0:#x} is reserved")]
    ReservedOpcode(u8),

    /// RSV bits set without a negotiated extension.
    #[error("Protocol violation: RSV {0:#x} is reserved")]
    ReservedBitsSet(u8),

    /// Text payload or close reason is not valid UTF-8.
    #[error("Invalid UTF-8 payload")]
    InvalidUtf8,

    /// Close frame payload of exactly one byte.
    #[error("Protocol violation: close payload cannot be a single byte")]
    InvalidClosePayload,

    /// Close code that is unassigned or out of range.
    #[error("Protocol violation: invalid close code {0}")]
    InvalidCloseCode(u16),

    /// Handshake could not be negotiated.
    #[error("Invalid handshake: {0}")]
    InvalidHandshake(String),

    /// Handshake request exceeds the configured maximum.
    #[error("Handshake too large: {size} bytes (max: {max})")]
    HandshakeTooLarge {
        /// Actual size.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// Operation not allowed in the connection's current state.
    #[error("Operation not allowed in state {0}")]
    InvalidState(ConnectionState),
}

impl Error {
    /// Close status reported to the peer for this error.
    ///
    /// Returns `None` for I/O, state and handshake errors, which never produce
    /// a close frame of their own.
    #[must_use]
    pub const fn close_code(&self) -> Option<CloseCode> {
        match self {
            Error::UnmaskedClientFrame
            | Error::FragmentedControlFrame
            | Error::ControlFrameTooLarge(_)
            | Error::ReservedOpcode(_)
            | Error::ReservedBitsSet(_)
            | Error::InvalidClosePayload
            | Error::InvalidCloseCode(_) => Some(CloseCode::ProtocolError),
            Error::InvalidUtf8 => Some(CloseCode::InvalidFramePayloadData),
            Error::FrameTooLarge { .. } => Some(CloseCode::MessageTooBig),
            _ => None,
        }
    }

    /// Returns `true` if the stream can no longer be used.
    #[must_use]
    pub const fn is_io(&self) -> bool {
        matches!(self, Error::Io(_) | Error::ConnectionClosed)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<std::str::Utf8Error> for Error {
    fn from(_: std::str::Utf8Error) -> Self {
        Error::InvalidUtf8
    }
}
