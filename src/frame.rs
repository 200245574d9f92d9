//! Message framing for agent links.
//!
//! Every message travels as an 8-byte header followed by a body:
//!
//! ```text
//! +------------+--------------+-------------+----------+----------------+
//! | byte order | message type | message tag | reserved | body length    |
//! |   u8       |     u8       |     u8      |   u8     | u32 (in order) |
//! +------------+--------------+-------------+----------+----------------+
//! ```
//!
//! The byte-order marker applies to the length and to every multi-byte field
//! of the body. Command frames use message type [`MESSAGE_TYPE_COMMAND`]; the
//! tag byte carries the correlation identifier of request/reply pairs.
//!
//! [`CommandFrameCodec`] splits a byte stream into [`Frame`]s and
//! [`FrameTransport`] drives it over any `AsyncRead + AsyncWrite` stream.

use bytes::Bytes;

use crate::byte_order::ByteOrder;

mod codec;
pub mod error;
mod header;
mod transport;

pub use codec::CommandFrameCodec;
pub use error::{EofError, FramingError, TransportError};
pub use header::{FrameHeader, HEADER_SIZE};
pub use transport::FrameTransport;

/// Message type owned by the command subsystem (`'c'`).
pub const MESSAGE_TYPE_COMMAND: u8 = b'c';

/// Smallest accepted maximum body length.
pub const MIN_FRAME_LENGTH: usize = 64;

/// Largest accepted maximum body length (256 MiB).
pub const MAX_FRAME_LENGTH: usize = 256 * 1024 * 1024;

/// Maximum body length used when none is configured (16 MiB).
pub const DEFAULT_MAX_FRAME_LENGTH: usize = 16 * 1024 * 1024;

pub(crate) fn clamp_frame_length(value: usize) -> usize {
    value.clamp(MIN_FRAME_LENGTH, MAX_FRAME_LENGTH)
}

/// A single message read from or written to the stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    byte_order: ByteOrder,
    message_type: u8,
    tag: u8,
    payload: Bytes,
}

impl Frame {
    /// Build a frame of any message type.
    #[must_use]
    pub fn new(byte_order: ByteOrder, message_type: u8, tag: u8, payload: Bytes) -> Self {
        Self {
            byte_order,
            message_type,
            tag,
            payload,
        }
    }

    /// Build a command frame carrying `payload`.
    #[must_use]
    pub fn command(byte_order: ByteOrder, tag: u8, payload: Bytes) -> Self {
        Self::new(byte_order, MESSAGE_TYPE_COMMAND, tag, payload)
    }

    /// Byte order of the body.
    #[must_use]
    pub const fn byte_order(&self) -> ByteOrder { self.byte_order }

    /// Owning subsystem of the message.
    #[must_use]
    pub const fn message_type(&self) -> u8 { self.message_type }

    /// Whether the frame belongs to the command subsystem.
    #[must_use]
    pub const fn is_command(&self) -> bool { self.message_type == MESSAGE_TYPE_COMMAND }

    /// Header tag byte. `0` means uncorrelated.
    #[must_use]
    pub const fn tag(&self) -> u8 { self.tag }

    pub(crate) fn set_tag(&mut self, tag: u8) { self.tag = tag; }

    /// Frame body.
    #[must_use]
    pub fn payload(&self) -> &Bytes { &self.payload }

    /// Consume the frame and return its body.
    #[must_use]
    pub fn into_payload(self) -> Bytes { self.payload }

    /// Header describing this frame.
    ///
    /// Bodies longer than `u32::MAX` never pass the codec, so the length is
    /// saturated rather than reported as an error.
    #[must_use]
    pub fn header(&self) -> FrameHeader {
        FrameHeader {
            byte_order: self.byte_order,
            message_type: self.message_type,
            tag: self.tag,
            length: u32::try_from(self.payload.len()).unwrap_or(u32::MAX),
        }
    }
}
