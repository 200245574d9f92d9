//! Incremental decoder and encoder for header-prefixed frames.

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use super::{
    DEFAULT_MAX_FRAME_LENGTH,
    EofError,
    Frame,
    FrameHeader,
    FramingError,
    HEADER_SIZE,
    TransportError,
    clamp_frame_length,
};
use crate::codec::INT_SIZE;

/// Splits a byte stream into [`Frame`]s and writes frames back out.
///
/// Decoding keeps partial input buffered, so the same frames come out
/// however the stream is chunked.
#[derive(Clone, Copy, Debug)]
pub struct CommandFrameCodec {
    max_frame_length: usize,
}

impl CommandFrameCodec {
    /// Create a codec accepting bodies up to `max_frame_length` bytes.
    ///
    /// The limit is clamped between
    /// [`MIN_FRAME_LENGTH`](super::MIN_FRAME_LENGTH) and
    /// [`MAX_FRAME_LENGTH`](super::MAX_FRAME_LENGTH).
    #[must_use]
    pub fn new(max_frame_length: usize) -> Self {
        Self {
            max_frame_length: clamp_frame_length(max_frame_length),
        }
    }

    /// Maximum accepted body length.
    #[must_use]
    pub const fn max_frame_length(&self) -> usize { self.max_frame_length }

    fn check_length(&self, size: usize) -> Result<(), FramingError> {
        if size > self.max_frame_length {
            return Err(FramingError::OversizedFrame {
                size,
                max: self.max_frame_length,
            });
        }
        Ok(())
    }
}

impl Default for CommandFrameCodec {
    fn default() -> Self { Self::new(DEFAULT_MAX_FRAME_LENGTH) }
}

fn peek_header(src: &BytesMut) -> Option<FrameHeader> {
    src.get(..HEADER_SIZE)
        .and_then(|slice| <[u8; HEADER_SIZE]>::try_from(slice).ok())
        .map(FrameHeader::parse)
}

impl Decoder for CommandFrameCodec {
    type Item = Frame;
    type Error = TransportError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(header) = peek_header(src) else {
            src.reserve(HEADER_SIZE.saturating_sub(src.len()));
            return Ok(None);
        };
        let length = header.length as usize;
        self.check_length(length)?;

        let total = HEADER_SIZE + length;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        let mut bytes = src.split_to(total);
        bytes.advance(HEADER_SIZE);
        Ok(Some(Frame::new(
            header.byte_order,
            header.message_type,
            header.tag,
            bytes.freeze(),
        )))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // Clean close at a frame boundary.
        if src.is_empty() {
            return Ok(None);
        }
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None => Err(build_eof_error(src).into()),
        }
    }
}

/// Classify an EOF that left `src` holding a partial frame.
fn build_eof_error(src: &BytesMut) -> EofError {
    let bytes_received = src.len();
    match peek_header(src) {
        Some(header) => EofError::MidFrame {
            bytes_received: bytes_received.saturating_sub(HEADER_SIZE),
            expected: header.length as usize,
        },
        None => EofError::MidHeader {
            bytes_received,
            header_size: HEADER_SIZE,
        },
    }
}

impl Encoder<Frame> for CommandFrameCodec {
    type Error = TransportError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let size = item.payload().len();
        self.check_length(size)?;
        if item.is_command() && size < INT_SIZE {
            return Err(FramingError::EmptyCommandFrame { size }.into());
        }
        dst.reserve(HEADER_SIZE + size);
        item.header().write(dst);
        dst.extend_from_slice(item.payload());
        Ok(())
    }
}
