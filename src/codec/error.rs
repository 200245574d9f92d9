//! Errors raised while decoding command bodies.

use thiserror::Error;

/// Failure to decode a single command body.
///
/// Decode errors are local to one frame: the connection drops the frame,
/// logs the error and keeps reading.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// Fewer bytes remain than the field requires.
    #[error("truncated {field}: need {needed} bytes, {remaining} remaining")]
    Truncated {
        /// Kind of field being read.
        field: &'static str,
        /// Bytes the field needs.
        needed: usize,
        /// Bytes left in the body.
        remaining: usize,
    },

    /// A string field does not hold valid UTF-8.
    #[error("string field is not valid UTF-8")]
    InvalidUtf8,

    /// A length field is negative or above the permitted capacity.
    #[error("invalid {field} length {length} (limit {limit})")]
    InvalidLength {
        /// Field carrying the length.
        field: &'static str,
        /// Length found on the wire.
        length: i64,
        /// Largest accepted length.
        limit: usize,
    },
}
