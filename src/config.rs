//! Per-connection configuration.

use std::time::Duration;

use crate::{
    byte_order::ByteOrder,
    frame::{DEFAULT_MAX_FRAME_LENGTH, clamp_frame_length},
};

/// Default time `init` waits for the INIT reply.
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of consecutive undecodable frames tolerated.
pub const DEFAULT_MAX_DECODE_FAILURES: usize = 10;

/// Tunables for one agent connection.
///
/// ```
/// use std::time::Duration;
///
/// use agentlink::{byte_order::ByteOrder, config::ConnectionConfig};
///
/// let config = ConnectionConfig::default()
///     .max_frame_length(1 << 20)
///     .read_timeout(Some(Duration::from_secs(5)))
///     .byte_order(ByteOrder::Little);
/// assert_eq!(config.get_max_frame_length(), 1 << 20);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConnectionConfig {
    max_frame_length: usize,
    read_timeout: Option<Duration>,
    reply_timeout: Duration,
    max_decode_failures: usize,
    byte_order: ByteOrder,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
            read_timeout: None,
            reply_timeout: DEFAULT_REPLY_TIMEOUT,
            max_decode_failures: DEFAULT_MAX_DECODE_FAILURES,
            byte_order: ByteOrder::Big,
        }
    }
}

impl ConnectionConfig {
    /// Largest accepted frame body. Clamped to the framing limits.
    #[must_use]
    pub fn max_frame_length(mut self, value: usize) -> Self {
        self.max_frame_length = clamp_frame_length(value);
        self
    }

    /// Fail a read after waiting `timeout` for a frame. `None` waits forever.
    ///
    /// A verb awaiting a reply keeps reading until the
    /// [reply timeout](Self::reply_timeout) instead.
    #[must_use]
    pub fn read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// How long verbs wait for an expected reply.
    #[must_use]
    pub fn reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = timeout;
        self
    }

    /// Consecutive undecodable frames tolerated before the connection is
    /// abandoned. A value of `0` is raised to `1`.
    #[must_use]
    pub fn max_decode_failures(mut self, value: usize) -> Self {
        self.max_decode_failures = value.max(1);
        self
    }

    /// Byte order of outgoing frames.
    #[must_use]
    pub fn byte_order(mut self, order: ByteOrder) -> Self {
        self.byte_order = order;
        self
    }

    /// Configured maximum frame body length.
    #[must_use]
    pub fn get_max_frame_length(&self) -> usize { self.max_frame_length }

    /// Configured read timeout.
    #[must_use]
    pub fn get_read_timeout(&self) -> Option<Duration> { self.read_timeout }

    /// Configured reply timeout.
    #[must_use]
    pub fn get_reply_timeout(&self) -> Duration { self.reply_timeout }

    /// Configured decode failure limit.
    #[must_use]
    pub fn get_max_decode_failures(&self) -> usize { self.max_decode_failures }

    /// Configured outgoing byte order.
    #[must_use]
    pub fn get_byte_order(&self) -> ByteOrder { self.byte_order }
}
