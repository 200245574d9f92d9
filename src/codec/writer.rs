//! Growable output buffer for command bodies.

use bytes::{BufMut, Bytes, BytesMut};

use crate::byte_order::ByteOrder;

/// Output buffer that appends primitives in a fixed byte order.
#[derive(Debug)]
pub struct WireWriter {
    buf: BytesMut,
    order: ByteOrder,
}

impl WireWriter {
    /// Create an empty writer.
    #[must_use]
    pub fn new(order: ByteOrder) -> Self { Self::with_capacity(0, order) }

    /// Create a writer with room for `capacity` bytes.
    #[must_use]
    pub fn with_capacity(capacity: usize, order: ByteOrder) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
            order,
        }
    }

    /// Byte order used for multi-byte fields.
    #[must_use]
    pub const fn order(&self) -> ByteOrder { self.order }

    /// Number of bytes written so far.
    #[must_use]
    pub fn len(&self) -> usize { self.buf.len() }

    /// Whether nothing has been written yet.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.buf.is_empty() }

    /// Append a 4-byte signed integer.
    pub fn put_i32(&mut self, value: i32) { self.buf.put_slice(&self.order.write_i32(value)); }

    /// Append a 4-byte unsigned integer.
    pub fn put_u32(&mut self, value: u32) { self.buf.put_slice(&self.order.write_u32(value)); }

    /// Append raw octets without a length prefix.
    pub fn put_octets(&mut self, bytes: &[u8]) { self.buf.put_slice(bytes); }

    /// Append a string as a `u32` length followed by its bytes.
    pub fn put_string(&mut self, value: &str) { self.put_len_prefixed(value.as_bytes()); }

    /// Append an octet run as a `u32` length followed by the octets.
    pub fn put_blob(&mut self, bytes: &[u8]) { self.put_len_prefixed(bytes); }

    fn put_len_prefixed(&mut self, bytes: &[u8]) {
        // Frames are capped far below 4 GiB, so the clamp only guards the cast.
        let len = u32::try_from(bytes.len()).unwrap_or(u32::MAX);
        let body = bytes.get(..len as usize).unwrap_or(bytes);
        self.put_u32(len);
        self.put_octets(body);
    }

    /// Consume the writer and return the encoded bytes.
    #[must_use]
    pub fn freeze(self) -> Bytes { self.buf.freeze() }
}
