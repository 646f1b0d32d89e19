//! Protocol-conformance checks for received frames (RFC 6455).
//!
//! The validator runs after a frame has been decoded and decides whether the
//! connection may continue. Rules are applied in a fixed order and the first
//! failure wins:
//!
//! 1. Client frames must be masked.
//! 2. Control frames carry at most 125 bytes and are never fragmented.
//! 3. Reserved opcodes are rejected.
//! 4. RSV bits must be zero (no extensions are negotiated).
//! 5. Unfragmented text frames must be valid UTF-8.
//! 6. Close payloads are empty or hold an acceptable code plus a UTF-8 reason.

use crate::error::{Error, Result};
use crate::protocol::frame::MAX_CONTROL_FRAME_PAYLOAD;
use crate::protocol::{CloseCode, Frame, OpCode};

/// Frame validator for frames received from clients.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameValidator;

impl FrameValidator {
    /// Create a new frame validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validate a frame and compute the close status that follows from it.
    ///
    /// On success the returned status is `current`, unchanged. On failure it
    /// is the status the violation reports to the peer.
    pub fn validate(&self, frame: &Frame, current: CloseCode) -> (CloseCode, Result<()>) {
        match self.check(frame) {
            Ok(()) => (current, Ok(())),
            Err(err) => (err.close_code().unwrap_or(current), Err(err)),
        }
    }

    /// Apply the conformance rules, returning the first violation.
    ///
    /// # Errors
    ///
    /// - `Error::UnmaskedClientFrame` - MASK bit clear
    /// - `Error::ControlFrameTooLarge` / `Error::FragmentedControlFrame` - control frame rules
    /// - `Error::ReservedOpcode` - opcode 0x3-0x7 or 0xB-0xF
    /// - `Error::ReservedBitsSet` - any RSV bit set
    /// - `Error::InvalidUtf8` - bad text payload or close reason
    /// - `Error::InvalidClosePayload` / `Error::InvalidCloseCode` - malformed close payload
    pub fn check(&self, frame: &Frame) -> Result<()> {
        if !frame.is_masked {
            return Err(Error::UnmaskedClientFrame);
        }

        self.check_control(frame)?;

        if let OpCode::Reserved(code) = frame.opcode {
            return Err(Error::ReservedOpcode(code));
        }

        if frame.reserved_bits != 0 {
            return Err(Error::ReservedBitsSet(frame.reserved_bits));
        }

        // Fragmented text may split a code point across frames.
        if frame.opcode == OpCode::Text && !frame.is_fragment {
            std::str::from_utf8(frame.payload())?;
        }

        if frame.opcode == OpCode::Close {
            self.check_close_payload(frame)?;
        }

        Ok(())
    }

    fn check_control(&self, frame: &Frame) -> Result<()> {
        if !frame.is_control() {
            return Ok(());
        }
        if frame.length > MAX_CONTROL_FRAME_PAYLOAD {
            return Err(Error::ControlFrameTooLarge(frame.length));
        }
        if frame.is_fragment {
            return Err(Error::FragmentedControlFrame);
        }
        Ok(())
    }

    fn check_close_payload(&self, frame: &Frame) -> Result<()> {
        match frame.length {
            0 => Ok(()),
            1 => Err(Error::InvalidClosePayload),
            len => {
                let code = frame.close_code().ok_or(Error::InvalidClosePayload)?;
                if !CloseCode::is_acceptable(code) {
                    return Err(Error::InvalidCloseCode(code));
                }
                if len > 2 {
                    std::str::from_utf8(frame.close_reason())?;
                }
                Ok(())
            }
        }
    }
}
