//! Framed stream used by a single connection.

use std::time::Duration;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;

use super::{CommandFrameCodec, Frame, TransportError};
use crate::byte_order::ByteOrder;

/// Sends and receives whole frames over a byte stream.
///
/// Outgoing frames use the configured byte order; incoming frames are read
/// in whatever order their header announces.
pub struct FrameTransport<T> {
    framed: Framed<T, CommandFrameCodec>,
    byte_order: ByteOrder,
    read_timeout: Option<Duration>,
}

impl<T> FrameTransport<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap `stream` with `codec`, writing frames in `byte_order`.
    pub fn new(stream: T, codec: CommandFrameCodec, byte_order: ByteOrder) -> Self {
        Self {
            framed: Framed::new(stream, codec),
            byte_order,
            read_timeout: None,
        }
    }

    /// Fail reads that wait longer than `timeout` for a frame.
    #[must_use]
    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Byte order used for outgoing frames.
    pub fn byte_order(&self) -> ByteOrder { self.byte_order }

    /// Write one frame and flush it.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Framing`] if the frame is rejected before
    /// any byte is written, or [`TransportError::Io`] if the stream fails.
    pub async fn send_frame(
        &mut self,
        message_type: u8,
        tag: u8,
        payload: Bytes,
    ) -> Result<(), TransportError> {
        let frame = Frame::new(self.byte_order, message_type, tag, payload);
        self.send(frame).await
    }

    /// Write a prepared frame and flush it.
    ///
    /// # Errors
    ///
    /// See [`FrameTransport::send_frame`].
    pub async fn send(&mut self, frame: Frame) -> Result<(), TransportError> {
        tracing::trace!(
            message_type = frame.message_type(),
            tag = frame.tag(),
            len = frame.payload().len(),
            "sending frame"
        );
        self.framed.send(frame).await
    }

    /// Wait for the next complete frame.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Closed`] when the peer closes at a frame
    /// boundary, [`TransportError::Eof`] when it closes inside a frame and
    /// [`TransportError::Timeout`] when the read timeout elapses.
    pub async fn receive_frame(&mut self) -> Result<Frame, TransportError> {
        let next = match self.read_timeout {
            Some(limit) => tokio::time::timeout(limit, self.framed.next())
                .await
                .map_err(|_| TransportError::Timeout(limit))?,
            None => self.framed.next().await,
        };
        next.unwrap_or(Err(TransportError::Closed))
    }

    /// Flush pending output and shut down the write half.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Io`] if flushing or shutdown fails.
    pub async fn close(&mut self) -> Result<(), TransportError> {
        SinkExt::<Frame>::close(&mut self.framed).await
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T { self.framed.get_ref() }

    /// Release the underlying stream.
    ///
    /// Buffered but unread input is discarded.
    pub fn into_inner(self) -> T { self.framed.into_inner() }
}
