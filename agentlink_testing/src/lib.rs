//! Utilities for exercising [`agentlink`] connections in tests.
//!
//! Helpers build raw command frames, feed bytes to a connection in small
//! chunks, record protocol callbacks and wire two connections together over
//! an in-memory `tokio::io::duplex` stream.
//!
//! ```rust
//! use agentlink::{byte_order::ByteOrder, command::Command, payload::Empty};
//! use agentlink_testing::encode_command;
//!
//! let bytes = encode_command(ByteOrder::Big, 0, Command::Check.request_code(), &Empty);
//! assert_eq!(bytes, [0, b'c', 0, 0, 0, 0, 0, 4, 0, 0, 0, 10]);
//! ```

pub mod chunked;
pub mod frames;
pub mod pair;
pub mod recording;

pub use chunked::ChunkedStream;
pub use frames::{command_body, command_frame, encode_command, encode_frame, raw_frame};
pub use pair::{Peer, connected_pair, raw_peer, unused_listener};
pub use recording::{Recorded, RecordingProtocol, recorder};
