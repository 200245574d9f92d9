//! Byte-order handling for frames on the wire.
//!
//! Each frame announces the byte order of its multi-byte fields in the first
//! header octet, CDR style: `0` for big-endian and `1` for little-endian. The
//! helpers here keep the conversion points in one place so the codec and the
//! framing layer never call `to_*_bytes` directly.

/// Byte order announced by a frame header.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ByteOrder {
    /// Most significant byte first (network order). Marker `0`.
    #[default]
    Big,
    /// Least significant byte first. Marker `1`.
    Little,
}

impl ByteOrder {
    /// Byte order of the host running this process.
    #[must_use]
    pub const fn native() -> Self {
        if cfg!(target_endian = "little") {
            Self::Little
        } else {
            Self::Big
        }
    }

    /// Header marker octet announcing this byte order.
    ///
    /// ```
    /// use agentlink::byte_order::ByteOrder;
    ///
    /// assert_eq!(ByteOrder::Big.marker(), 0);
    /// assert_eq!(ByteOrder::Little.marker(), 1);
    /// ```
    #[must_use]
    pub const fn marker(self) -> u8 {
        match self {
            Self::Big => 0,
            Self::Little => 1,
        }
    }

    /// Interpret a header marker octet, returning `None` for values other
    /// than `0` and `1`.
    #[must_use]
    pub const fn from_marker(marker: u8) -> Option<Self> {
        match marker {
            0 => Some(Self::Big),
            1 => Some(Self::Little),
            _ => None,
        }
    }

    /// Serialise a `u32` in this byte order.
    ///
    /// ```
    /// use agentlink::byte_order::ByteOrder;
    ///
    /// assert_eq!(ByteOrder::Big.write_u32(0x1234_5678), [0x12, 0x34, 0x56, 0x78]);
    /// assert_eq!(ByteOrder::Little.write_u32(0x1234_5678), [0x78, 0x56, 0x34, 0x12]);
    /// ```
    #[must_use]
    pub const fn write_u32(self, value: u32) -> [u8; 4] {
        match self {
            Self::Big => value.to_be_bytes(),
            Self::Little => value.to_le_bytes(),
        }
    }

    /// Parse a `u32` stored in this byte order.
    #[must_use]
    pub const fn read_u32(self, bytes: [u8; 4]) -> u32 {
        match self {
            Self::Big => u32::from_be_bytes(bytes),
            Self::Little => u32::from_le_bytes(bytes),
        }
    }

    /// Serialise an `i32` in this byte order.
    #[must_use]
    pub const fn write_i32(self, value: i32) -> [u8; 4] {
        match self {
            Self::Big => value.to_be_bytes(),
            Self::Little => value.to_le_bytes(),
        }
    }

    /// Parse an `i32` stored in this byte order.
    #[must_use]
    pub const fn read_i32(self, bytes: [u8; 4]) -> i32 {
        match self {
            Self::Big => i32::from_be_bytes(bytes),
            Self::Little => i32::from_le_bytes(bytes),
        }
    }
}
