//! Metric helpers for `agentlink`.
//!
//! This module defines metric names and helper functions wrapping the
//! [`metrics`](https://docs.rs/metrics) crate. With the `metrics` feature
//! disabled the helpers compile to no-ops.

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

/// Name of the gauge tracking open agent connections.
pub const CONNECTIONS_ACTIVE: &str = "agentlink_connections_active";
/// Name of the counter tracking command frames.
pub const FRAMES_PROCESSED: &str = "agentlink_frames_processed_total";
/// Name of the counter tracking frames with unknown command codes.
pub const UNKNOWN_COMMANDS: &str = "agentlink_unknown_commands_total";
/// Name of the counter tracking frames dropped because they failed to decode.
pub const DECODE_FAILURES: &str = "agentlink_decode_failures_total";
/// Name of the counter tracking panics in connection tasks.
pub const CONNECTION_PANICS: &str = "agentlink_connection_panics_total";

/// Direction of frame processing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Frames received from the peer.
    Inbound,
    /// Frames sent to the peer.
    Outbound,
}

impl Direction {
    #[cfg_attr(not(feature = "metrics"), expect(dead_code, reason = "used only for labels"))]
    fn as_str(self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
        }
    }
}

/// Increment the active connections gauge.
pub fn inc_connections() {
    #[cfg(feature = "metrics")]
    gauge!(CONNECTIONS_ACTIVE).increment(1.0);
}

/// Decrement the active connections gauge.
pub fn dec_connections() {
    #[cfg(feature = "metrics")]
    gauge!(CONNECTIONS_ACTIVE).decrement(1.0);
}

/// Record a command frame moving in `direction`.
pub fn inc_frames(direction: Direction, command: &'static str) {
    #[cfg(feature = "metrics")]
    counter!(
        FRAMES_PROCESSED,
        "direction" => direction.as_str(),
        "command" => command
    )
    .increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = (direction, command);
}

/// Record a frame carrying an unknown command code.
pub fn inc_unknown_commands() {
    #[cfg(feature = "metrics")]
    counter!(UNKNOWN_COMMANDS).increment(1);
}

/// Record a frame dropped because its body failed to decode.
pub fn inc_decode_failures() {
    #[cfg(feature = "metrics")]
    counter!(DECODE_FAILURES).increment(1);
}

/// Record a panic in a connection task.
pub fn inc_connection_panics() {
    #[cfg(feature = "metrics")]
    counter!(CONNECTION_PANICS).increment(1);
}
