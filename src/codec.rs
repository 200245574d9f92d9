//! Primitive wire codec for command bodies.
//!
//! Command bodies are a flat sequence of primitives written in a fixed
//! order: 4-byte integers, length-prefixed strings and raw octet runs. The
//! byte order of every multi-byte field follows the marker announced in the
//! frame header (see [`crate::byte_order`]).
//!
//! ```text
//! i32 / u32   4 bytes in the announced byte order
//! string      u32 length, then `length` raw bytes (no terminator)
//! blob        u32 length, then `length` raw octets
//! ```
//!
//! Payload types implement [`Encode`] and [`Decode`]; both sides must visit
//! fields in the same order. Decoding never reads past the end of the body:
//! every read checks the remaining length and fails with
//! [`DecodeError::Truncated`] instead.

use bytes::Bytes;

use crate::byte_order::ByteOrder;

pub mod error;
mod reader;
mod writer;

pub use error::DecodeError;
pub use reader::WireReader;
pub use writer::WireWriter;

/// Encoded size of a 4-byte integer field.
pub const INT_SIZE: usize = 4;

/// Encoded size of a length-prefixed string holding `len` bytes.
#[must_use]
pub const fn string_size(len: usize) -> usize { INT_SIZE + len }

/// Values that can be written onto a [`WireWriter`].
pub trait Encode {
    /// Append the fields of `self` to `out` in declaration order.
    fn encode(&self, out: &mut WireWriter);

    /// Number of bytes [`Encode::encode`] appends.
    ///
    /// Used to pre-size output buffers; it must never under-report.
    fn wire_size(&self) -> usize;
}

/// Values that can be read back from a [`WireReader`].
pub trait Decode: Sized {
    /// Read the fields of `Self` from `input` in declaration order.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] if the input ends early or a field is
    /// malformed.
    fn decode(input: &mut WireReader) -> Result<Self, DecodeError>;
}

/// Encode `value` into a freshly allocated buffer.
///
/// ```
/// use agentlink::{
///     byte_order::ByteOrder,
///     codec::encode_to_bytes,
///     payload::Identity,
/// };
///
/// let bytes = encode_to_bytes(&Identity::new("fe"), ByteOrder::Big);
/// assert_eq!(&bytes[..], &[0, 0, 0, 2, b'f', b'e']);
/// ```
#[must_use]
pub fn encode_to_bytes<T: Encode + ?Sized>(value: &T, order: ByteOrder) -> Bytes {
    let mut out = WireWriter::with_capacity(value.wire_size(), order);
    value.encode(&mut out);
    out.freeze()
}

/// Decode a `T` from `bytes`, ignoring any trailing bytes.
///
/// # Errors
///
/// Returns a [`DecodeError`] if `bytes` does not hold a complete `T`.
pub fn decode_from_bytes<T: Decode>(bytes: Bytes, order: ByteOrder) -> Result<T, DecodeError> {
    let mut input = WireReader::new(bytes, order);
    T::decode(&mut input)
}

#[cfg(test)]
mod tests;
