//! Frame codec over a [`ByteStream`](crate::stream::ByteStream).
//!
//! Decoding pulls exactly the bytes of one frame from the stream; encoding
//! produces the unmasked server wire form.

mod framed;

pub use framed::{FrameCodec, encode_into, encode_to_vec, wire_size};
