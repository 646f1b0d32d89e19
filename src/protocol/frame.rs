//! WebSocket frame representation (RFC 6455).

use crate::protocol::{CloseCode, OpCode};

/// Maximum payload size for control frames (RFC 6455).
pub const MAX_CONTROL_FRAME_PAYLOAD: u64 = 125;

/// A single WebSocket frame as it appeared on the wire, after unmasking.
///
/// ## Frame Structure
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-------+-+-------------+-------------------------------+
/// |F|R|R|R| opcode |M| Payload len |    Extended payload length    |
/// |I|S|S|S|  (4)   |A|     (7)     |             (16/64)           |
/// |N|V|V|V|       |S|             |   (if payload len==126/127)   |
/// | |1|2|3|       |K|             |                               |
/// +-+-+-+-+-------+-+-------------+-------------------------------+
/// |                         Masking key (if present)              |
/// +---------------------------------------------------------------+
/// |                     Payload data                              |
/// +---------------------------------------------------------------+
/// ```
///
/// Fields mirror the header rather than a validated view: a decoded frame may
/// carry reserved bits or a reserved opcode, which the
/// [`FrameValidator`](crate::protocol::FrameValidator) rejects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// FIN bit clear: more fragments of this message follow.
    pub is_fragment: bool,
    /// Frame opcode.
    pub opcode: OpCode,
    /// RSV1..RSV3 as a 3-bit value (RSV1 is the high bit).
    pub reserved_bits: u8,
    /// Whether the payload was masked on the wire.
    pub is_masked: bool,
    /// Declared payload length.
    pub length: u64,
    /// Unmasked payload, `length` bytes long.
    pub payload: Vec<u8>,
}

impl Frame {
    /// Create a final, unmasked frame with the given opcode and payload.
    #[must_use]
    pub fn new(opcode: OpCode, payload: Vec<u8>) -> Self {
        Self {
            is_fragment: false,
            opcode,
            reserved_bits: 0,
            is_masked: false,
            length: payload.len() as u64,
            payload,
        }
    }

    /// Create a text frame.
    #[must_use]
    pub fn text(data: impl Into<String>) -> Self {
        Self::new(OpCode::Text, data.into().into_bytes())
    }

    /// Create a binary frame.
    #[must_use]
    pub fn binary(data: impl Into<Vec<u8>>) -> Self {
        Self::new(OpCode::Binary, data.into())
    }

    /// Create a close frame carrying a 2-byte status code and optional reason.
    #[must_use]
    pub fn close(code: CloseCode, reason: &str) -> Self {
        let mut payload = code.as_u16().to_be_bytes().to_vec();
        payload.extend_from_slice(reason.as_bytes());
        Self::new(OpCode::Close, payload)
    }

    /// Create a ping frame.
    #[must_use]
    pub fn ping(data: impl Into<Vec<u8>>) -> Self {
        Self::new(OpCode::Ping, data.into())
    }

    /// Create a pong frame.
    #[must_use]
    pub fn pong(data: impl Into<Vec<u8>>) -> Self {
        Self::new(OpCode::Pong, data.into())
    }

    /// Mark this frame as a non-final fragment.
    #[must_use]
    pub fn fragment(mut self) -> Self {
        self.is_fragment = true;
        self
    }

    /// Turn this frame into a pong carrying the same payload.
    #[must_use]
    pub fn into_pong(mut self) -> Self {
        self.opcode = OpCode::Pong;
        self
    }

    /// Check if this is a control frame.
    #[inline]
    #[must_use]
    pub const fn is_control(&self) -> bool {
        self.opcode.is_control()
    }

    /// Get the payload bytes.
    #[inline]
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Take ownership of the payload.
    #[must_use]
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    /// The payload as UTF-8 text, if it is valid.
    #[must_use]
    pub fn text_payload(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }

    /// Raw close code of a close frame, if the payload carries one.
    #[must_use]
    pub fn close_code(&self) -> Option<u16> {
        match self.payload.as_slice() {
            [hi, lo, ..] => Some(u16::from_be_bytes([*hi, *lo])),
            _ => None,
        }
    }

    /// Reason bytes following the close code (empty when absent).
    #[must_use]
    pub fn close_reason(&self) -> &[u8] {
        self.payload.get(2..).unwrap_or_default()
    }
}
