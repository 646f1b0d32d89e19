use bytes::{BufMut, BytesMut};
use tokio::io::AsyncRead;

use crate::config::Limits;
use crate::error::{Error, Result};
use crate::protocol::mask::apply_mask_fast;
use crate::protocol::{Frame, OpCode};
use crate::stream::ByteStream;

/// Encodes frames to wire bytes and decodes them from a [`ByteStream`].
///
/// The mask key is read only when the MASK bit is set, so unmasked frames
/// decode with their payload intact and are left for the validator to reject.
#[derive(Debug)]
pub struct FrameCodec {
    limits: Limits,
    write_buf: BytesMut,
}

impl FrameCodec {
    #[must_use]
    pub fn new(limits: Limits, write_buffer_size: usize) -> Self {
        Self {
            limits,
            write_buf: BytesMut::with_capacity(write_buffer_size),
        }
    }

    #[must_use]
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Read one frame from the stream.
    ///
    /// # Errors
    ///
    /// - `Error::Io` on a short read or stream failure
    /// - `Error::FrameTooLarge` if the declared length exceeds `max_frame_size`;
    ///   nothing is allocated for the payload in that case
    pub async fn decode<R: AsyncRead + Unpin>(&self, stream: &mut ByteStream<R>) -> Result<Frame> {
        let [byte0, byte1] = stream.read_array::<2>().await?;

        let is_fragment = byte0 & 0x80 == 0;
        let reserved_bits = (byte0 >> 4) & 0x07;
        let opcode = OpCode::from_u8(byte0);
        let is_masked = byte1 & 0x80 != 0;

        let length = match byte1 & 0x7F {
            126 => u64::from(u16::from_be_bytes(stream.read_array::<2>().await?)),
            127 => u64::from_be_bytes(stream.read_array::<8>().await?),
            len => u64::from(len),
        };

        self.limits.check_frame_size(length)?;
        let payload_len = usize::try_from(length).map_err(|_| Error::FrameTooLarge {
            size: length,
            max: self.limits.max_frame_size,
        })?;

        let mask = if is_masked {
            Some(stream.read_array::<4>().await?)
        } else {
            None
        };

        let mut payload = stream.read_exact(payload_len).await?;
        if let Some(mask) = mask {
            apply_mask_fast(&mut payload, mask);
        }

        Ok(Frame {
            is_fragment,
            opcode,
            reserved_bits,
            is_masked,
            length,
            payload,
        })
    }

    /// Encode a frame into the codec's buffer and return the wire bytes.
    ///
    /// Server frames are never masked.
    pub fn encode(&mut self, frame: &Frame) -> &[u8] {
        self.write_buf.clear();
        encode_into(frame, &mut self.write_buf);
        &self.write_buf
    }
}

/// Calculate the number of wire bytes for an unmasked frame.
#[must_use]
pub fn wire_size(frame: &Frame) -> usize {
    let payload_len = frame.payload.len();
    let extended_len_size = if payload_len <= 125 {
        0
    } else if payload_len <= 0xFFFF {
        2
    } else {
        8
    };
    2 + extended_len_size + payload_len
}

/// Append the unmasked wire form of `frame` to `dst`.
///
/// The length field is taken from the payload actually written, so the
/// header always agrees with the bytes that follow it.
pub fn encode_into(frame: &Frame, dst: &mut BytesMut) {
    dst.reserve(wire_size(frame));

    // RSV bits are never set: no extension is negotiated.
    let mut byte0 = 0x80 | frame.opcode.as_u8();
    if frame.is_fragment {
        byte0 &= 0x7F;
    }
    dst.put_u8(byte0);

    let payload_len = frame.payload.len();
    if payload_len <= 125 {
        dst.put_u8(payload_len as u8);
    } else if payload_len <= 0xFFFF {
        dst.put_u8(126);
        dst.put_u16(payload_len as u16);
    } else {
        dst.put_u8(127);
        dst.put_u64(payload_len as u64);
    }

    dst.put_slice(&frame.payload);
}

/// Encode a frame into a freshly allocated buffer.
#[must_use]
pub fn encode_to_vec(frame: &Frame) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(wire_size(frame));
    encode_into(frame, &mut buf);
    buf.to_vec()
}
