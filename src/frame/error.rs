//! Error types for the framing layer.
//!
//! - [`FramingError`]: the header or body violates the frame contract.
//! - [`EofError`]: the peer closed the stream part way through a frame.
//! - [`TransportError`]: everything a [`super::FrameTransport`] can report.

use std::{io, time::Duration};

use thiserror::Error;

/// Wire-level violations of the frame structure.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FramingError {
    /// Body length exceeds the configured maximum.
    #[error("frame exceeds max length: {size} > {max}")]
    OversizedFrame {
        /// Body length announced by the header or offered for sending.
        size: usize,
        /// Maximum allowed body length.
        max: usize,
    },

    /// Command frame without room for a command code.
    #[error("command frame body of {size} bytes cannot hold a command code")]
    EmptyCommandFrame {
        /// Body length offered for sending.
        size: usize,
    },
}

/// Premature end of stream.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum EofError {
    /// Stream ended while the header was being read.
    #[error("premature EOF during header: {bytes_received} of {header_size} header bytes")]
    MidHeader {
        /// Header bytes received before EOF.
        bytes_received: usize,
        /// Size of a complete header.
        header_size: usize,
    },

    /// Stream ended while the body was being read.
    #[error("premature EOF: {bytes_received} bytes of {expected} byte body received")]
    MidFrame {
        /// Body bytes received before EOF.
        bytes_received: usize,
        /// Body length announced by the header.
        expected: usize,
    },
}

/// Errors reported by [`super::FrameTransport`] and [`super::CommandFrameCodec`].
#[derive(Debug, Error)]
pub enum TransportError {
    /// Underlying stream failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Peer closed the stream at a frame boundary.
    #[error("connection closed by peer")]
    Closed,

    /// Peer closed the stream inside a frame.
    #[error("EOF: {0}")]
    Eof(#[from] EofError),

    /// Frame structure cannot be trusted.
    #[error("framing error: {0}")]
    Framing(#[from] FramingError),

    /// No frame arrived within the read timeout.
    #[error("no frame received within {0:?}")]
    Timeout(Duration),
}
