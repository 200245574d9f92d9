#![doc(html_root_url = "https://docs.rs/agentlink/latest")]
//! Command/reply communication layer for distributed tuning agents.
//!
//! A frontend and a tree of analysis agents talk over persistent byte
//! streams. Every message is a frame with an 8-byte header followed by a
//! command body: a 32-bit command code and a typed payload. Eighteen command
//! pairs are defined; each has a request code `2·i` and a reply code
//! `2·i + 1`.
//!
//! - [`frame`] reads and writes frames.
//! - [`codec`] and [`payload`] encode the typed command bodies.
//! - [`command`] holds the static dispatch table.
//! - [`handler`] runs the per-command request/reply state machine.
//! - [`connection`] owns a stream and exposes one verb per command pair.
//! - [`server`] accepts TCP peers and serves each with a connection.
//!
//! Collaborators plug in by implementing [`hooks::AgentProtocol`].

pub mod byte_order;
pub mod codec;
pub mod command;
pub mod config;
pub mod connection;
pub mod correlation;
pub mod error;
pub mod frame;
pub mod handler;
pub mod hooks;
pub mod lifecycle;
pub mod metrics;
pub mod payload;
pub mod server;

pub use byte_order::ByteOrder;
pub use command::{Command, CommandCode, DISPATCH_TABLE, DispatchTable};
pub use config::ConnectionConfig;
pub use connection::{AgentConnection, ConnectionBuilder, Dispatch, NotHandled};
pub use error::ConnectionError;
pub use frame::Frame;
pub use hooks::{AgentProtocol, Outcome, ProtocolHooks, SessionContext};
pub use lifecycle::{CloseReason, LifecycleEvent, LifecycleObserver};
pub use server::{AgentServer, BackoffConfig, ServerError};
