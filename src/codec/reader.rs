//! Cursor over a received command body.

use bytes::{Buf, Bytes};

use super::DecodeError;
use crate::byte_order::ByteOrder;

/// Input cursor that reads primitives in the byte order of its frame.
///
/// Reads consume the underlying [`Bytes`] without copying octet runs.
#[derive(Clone, Debug)]
pub struct WireReader {
    buf: Bytes,
    order: ByteOrder,
}

impl WireReader {
    /// Wrap `buf`, interpreting multi-byte fields with `order`.
    #[must_use]
    pub fn new(buf: Bytes, order: ByteOrder) -> Self { Self { buf, order } }

    /// Byte order announced by the frame.
    #[must_use]
    pub const fn order(&self) -> ByteOrder { self.order }

    /// Bytes not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize { self.buf.remaining() }

    fn ensure(&self, field: &'static str, needed: usize) -> Result<(), DecodeError> {
        let remaining = self.buf.remaining();
        if remaining < needed {
            return Err(DecodeError::Truncated {
                field,
                needed,
                remaining,
            });
        }
        Ok(())
    }

    fn take_word(&mut self, field: &'static str) -> Result<[u8; 4], DecodeError> {
        self.ensure(field, 4)?;
        let mut word = [0u8; 4];
        self.buf.copy_to_slice(&mut word);
        Ok(word)
    }

    /// Read a 4-byte signed integer.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Truncated`] if fewer than four bytes remain.
    pub fn get_i32(&mut self) -> Result<i32, DecodeError> {
        self.take_word("i32").map(|word| self.order.read_i32(word))
    }

    /// Read a 4-byte unsigned integer.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Truncated`] if fewer than four bytes remain.
    pub fn get_u32(&mut self) -> Result<u32, DecodeError> {
        self.take_word("u32").map(|word| self.order.read_u32(word))
    }

    /// Read exactly `len` raw octets.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Truncated`] if fewer than `len` bytes remain.
    pub fn get_octets(&mut self, len: usize) -> Result<Bytes, DecodeError> {
        self.ensure("octets", len)?;
        Ok(self.buf.split_to(len))
    }

    /// Read a `u32` length followed by that many octets.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Truncated`] if the length or the octets are
    /// missing.
    pub fn get_blob(&mut self) -> Result<Bytes, DecodeError> {
        let len = self.get_u32()? as usize;
        self.get_octets(len)
    }

    /// Read a length-prefixed UTF-8 string.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Truncated`] if the body ends early and
    /// [`DecodeError::InvalidUtf8`] if the bytes are not UTF-8.
    pub fn get_string(&mut self) -> Result<String, DecodeError> {
        let len = self.get_u32()? as usize;
        self.ensure("string", len)?;
        let bytes = self.buf.split_to(len);
        String::from_utf8(bytes.to_vec()).map_err(|_| DecodeError::InvalidUtf8)
    }
}
