//! Errors raised by [`AgentServer`](super::AgentServer) operations.

use std::io;

use thiserror::Error;

/// Failure to set up or run the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listener could not be bound or registered.
    #[error("bind error: {0}")]
    Bind(#[source] io::Error),

    /// Accepting a connection failed.
    #[error("accept error: {0}")]
    Accept(#[from] io::Error),
}
