//! Errors surfaced by agent connections.

use std::{io, time::Duration};

use thiserror::Error;

use crate::{
    command::CommandCode,
    frame::{EofError, FramingError, TransportError},
};

/// Failure of a connection operation.
///
/// Single malformed frames are not errors: they are dropped and reported as
/// [`crate::connection::Dispatch::Dropped`].
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The peer closed the stream, or the connection was already closed.
    #[error("connection closed")]
    Closed,

    /// The underlying stream failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The frame structure can no longer be trusted.
    #[error("framing error: {0}")]
    Framing(#[from] FramingError),

    /// An outgoing frame was refused by the encoder and never written.
    #[error("frame rejected: {0}")]
    FrameRejected(FramingError),

    /// The peer closed the stream inside a frame.
    #[error("EOF: {0}")]
    Eof(#[from] EofError),

    /// No frame or reply arrived in time.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// A reply correlated with our request carried a different command.
    #[error("unexpected reply: expected {expected}, received {received}")]
    UnexpectedReply {
        /// Reply code that was awaited.
        expected: CommandCode,
        /// Command code that arrived.
        received: CommandCode,
    },

    /// Too many consecutive frames failed to decode.
    #[error("{0} consecutive frames failed to decode")]
    TooManyDecodeFailures(usize),
}

impl ConnectionError {
    /// Whether the connection remains usable after this error.
    ///
    /// ```
    /// use std::time::Duration;
    ///
    /// use agentlink::{error::ConnectionError, frame::FramingError};
    ///
    /// assert!(ConnectionError::Timeout(Duration::from_secs(1)).is_recoverable());
    /// assert!(!ConnectionError::Closed.is_recoverable());
    ///
    /// let rejected = FramingError::OversizedFrame { size: 108, max: 64 };
    /// assert!(ConnectionError::FrameRejected(rejected).is_recoverable());
    /// ```
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_) | Self::UnexpectedReply { .. } | Self::FrameRejected(_)
        )
    }

    /// Whether this error is an orderly close by the peer.
    #[must_use]
    pub fn is_clean_close(&self) -> bool { matches!(self, Self::Closed) }
}

impl From<TransportError> for ConnectionError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Io(e) => Self::Io(e),
            TransportError::Closed => Self::Closed,
            TransportError::Eof(e) => Self::Eof(e),
            TransportError::Framing(e) => Self::Framing(e),
            TransportError::Timeout(limit) => Self::Timeout(limit),
        }
    }
}
