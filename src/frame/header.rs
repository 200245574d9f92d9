//! Fixed 8-byte frame header.

use bytes::{BufMut, BytesMut};

use crate::byte_order::ByteOrder;

/// Size of the frame header in bytes.
pub const HEADER_SIZE: usize = 8;

/// Decoded frame header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameHeader {
    /// Byte order of the length and body fields.
    pub byte_order: ByteOrder,
    /// Owning subsystem.
    pub message_type: u8,
    /// Correlation tag, `0` when uncorrelated.
    pub tag: u8,
    /// Body length in bytes.
    pub length: u32,
}

impl FrameHeader {
    /// Parse a header from its wire form.
    ///
    /// An unknown byte-order marker is logged and read as big-endian. The
    /// reserved octet is ignored.
    ///
    /// ```
    /// use agentlink::{byte_order::ByteOrder, frame::FrameHeader};
    ///
    /// let header = FrameHeader::parse([1, b'c', 7, 0, 12, 0, 0, 0]);
    /// assert_eq!(header.byte_order, ByteOrder::Little);
    /// assert_eq!(header.tag, 7);
    /// assert_eq!(header.length, 12);
    /// ```
    #[must_use]
    pub fn parse(bytes: [u8; HEADER_SIZE]) -> Self {
        let [marker, message_type, tag, _reserved, l0, l1, l2, l3] = bytes;
        let byte_order = ByteOrder::from_marker(marker).unwrap_or_else(|| {
            tracing::warn!(marker, "unknown byte-order marker, reading frame as big-endian");
            ByteOrder::Big
        });
        Self {
            byte_order,
            message_type,
            tag,
            length: byte_order.read_u32([l0, l1, l2, l3]),
        }
    }

    /// Serialise the header into its 8-byte wire form.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let [l0, l1, l2, l3] = self.byte_order.write_u32(self.length);
        [
            self.byte_order.marker(),
            self.message_type,
            self.tag,
            0,
            l0,
            l1,
            l2,
            l3,
        ]
    }

    /// Append the header to `dst`.
    pub fn write(&self, dst: &mut BytesMut) { dst.put_slice(&self.to_bytes()); }
}
