//! Agent connection orchestration.
//!
//! [`AgentConnection`] owns the framed stream and one handler per command
//! pair. It routes every incoming command frame through the dispatch table
//! to the matching handler and exposes one verb per command pair.
//!
//! Requests are stamped with a correlation tag (see [`crate::correlation`]).
//! A verb that expects a reply keeps dispatching unrelated frames until the
//! correlated reply arrives, so a peer may interleave its own requests.

mod builder;
mod counter;
mod dispatch;
mod verbs;

use std::net::SocketAddr;

pub use builder::ConnectionBuilder;
use counter::ActiveConnection;
pub use counter::active_connection_count;
pub use dispatch::{Dispatch, NotHandled};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::{
    command::CommandCode,
    config::ConnectionConfig,
    correlation::CorrelationGenerator,
    error::ConnectionError,
    frame::{FrameTransport, TransportError},
    handler::Handlers,
    hooks::{ProtocolHooks, SessionContext},
    lifecycle::{CloseReason, Lifecycle, LifecycleEvent, LifecycleObserver},
};

/// Connection-level state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    /// Frames may be sent and received.
    Connected,
    /// The connection was torn down; every operation fails with
    /// [`ConnectionError::Closed`].
    Closed,
}

/// One end of an agent link.
///
/// All operations take `&mut self`, so at most one verb or
/// [`handle_one_message`](Self::handle_one_message) runs at a time.
pub struct AgentConnection<T> {
    transport: FrameTransport<T>,
    hooks: ProtocolHooks,
    ctx: SessionContext,
    config: ConnectionConfig,
    correlation: CorrelationGenerator,
    lifecycle: Lifecycle,
    last_command: Option<CommandCode>,
    decode_failures: usize,
    _counter: ActiveConnection,
}

impl AgentConnection<()> {
    /// Start building a connection that identifies itself as `ident`.
    #[must_use]
    pub fn builder(ident: impl Into<String>) -> ConnectionBuilder { ConnectionBuilder::new(ident) }
}

impl<T> AgentConnection<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    pub(crate) fn new(
        transport: FrameTransport<T>,
        hooks: ProtocolHooks,
        ctx: SessionContext,
        config: ConnectionConfig,
    ) -> Self {
        tracing::debug!(
            ident = ctx.my_ident(),
            peer_addr = ?ctx.peer_addr(),
            "agent connection established"
        );
        Self {
            transport,
            hooks,
            ctx,
            config,
            correlation: CorrelationGenerator::default(),
            lifecycle: Lifecycle::new(),
            last_command: None,
            decode_failures: 0,
            _counter: ActiveConnection::new(),
        }
    }

    /// Code of the last recognised command frame received.
    #[must_use]
    pub fn last_command(&self) -> Option<CommandCode> { self.last_command }

    /// Identity announced by this side.
    #[must_use]
    pub fn my_ident(&self) -> &str { self.ctx.my_ident() }

    /// Identity announced by the peer during INIT, if known.
    #[must_use]
    pub fn peer_ident(&self) -> Option<&str> { self.ctx.peer_ident() }

    /// Context passed to callbacks.
    #[must_use]
    pub fn context(&self) -> &SessionContext { &self.ctx }

    /// Configuration in effect.
    #[must_use]
    pub fn config(&self) -> &ConnectionConfig { &self.config }

    /// Per-command handlers, for inspecting the last request and reply.
    #[must_use]
    pub fn handlers(&self) -> &Handlers { &self.hooks.handlers }

    /// Per-command handlers, for registering callbacks after construction.
    pub fn handlers_mut(&mut self) -> &mut Handlers { &mut self.hooks.handlers }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        if self.lifecycle.is_closed() {
            ConnectionState::Closed
        } else {
            ConnectionState::Connected
        }
    }

    /// Subscribe to lifecycle events of this connection.
    #[must_use]
    pub fn lifecycle(&self) -> LifecycleObserver { self.lifecycle.subscribe() }

    /// Reason the connection closed, once it has.
    #[must_use]
    pub fn close_reason(&self) -> Option<CloseReason> {
        match self.lifecycle.subscribe().current() {
            LifecycleEvent::Closed(reason) => Some(reason),
            LifecycleEvent::Connected => None,
        }
    }

    /// Borrow the underlying stream.
    #[must_use]
    pub fn get_ref(&self) -> &T { self.transport.get_ref() }

    /// Remote address, if the stream has one.
    #[must_use]
    pub fn peer_addr(&self) -> Option<SocketAddr> { self.ctx.peer_addr() }

    /// Process incoming frames until the connection closes.
    ///
    /// Read timeouts and frames rejected on the way out are logged and
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns the [`ConnectionError`] that tore the connection down, unless
    /// the close was orderly.
    pub async fn run(&mut self) -> Result<CloseReason, ConnectionError> {
        loop {
            match self.handle_one_message().await {
                Ok(_) => {
                    if let Some(reason) = self.close_reason() {
                        return Ok(reason);
                    }
                }
                Err(ConnectionError::Closed) => {
                    return Ok(self.close_reason().unwrap_or(CloseReason::PeerClosed));
                }
                Err(err) if err.is_recoverable() => {
                    tracing::debug!(error = %err, "continuing after recoverable error");
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn ensure_connected(&self) -> Result<(), ConnectionError> {
        if self.lifecycle.is_closed() {
            return Err(ConnectionError::Closed);
        }
        Ok(())
    }

    /// Close this side without notifying the peer.
    ///
    /// Observers see [`CloseReason::Requested`]. Does nothing if already
    /// closed.
    pub async fn shutdown(&mut self) { self.close(CloseReason::Requested).await; }

    /// Move to [`ConnectionState::Closed`], shut the stream down and notify
    /// observers. Does nothing if already closed.
    async fn close(&mut self, reason: CloseReason) {
        if !self.lifecycle.close(reason.clone()) {
            return;
        }
        tracing::debug!(?reason, peer = ?self.ctx.peer_ident(), "agent connection closed");
        if let Err(err) = self.transport.close().await {
            tracing::debug!(error = %err, "error shutting down stream");
        }
        self.hooks.on_connection_closed(&self.ctx, &reason);
    }

    /// Close after a fatal error and hand the error back.
    async fn fail(&mut self, err: ConnectionError) -> ConnectionError {
        let reason = match &err {
            ConnectionError::Closed => CloseReason::PeerClosed,
            other => {
                tracing::error!(
                    error = %other,
                    peer = ?self.ctx.peer_ident(),
                    "agent connection failed"
                );
                CloseReason::Failed(other.to_string())
            }
        };
        self.close(reason).await;
        err
    }

    /// Map a read failure. Timeouts leave the connection open.
    async fn receive_error(&mut self, err: TransportError) -> ConnectionError {
        match err {
            TransportError::Timeout(limit) => ConnectionError::Timeout(limit),
            other => self.fail(other.into()).await,
        }
    }

    /// Map a write failure. Frames rejected by the encoder never reach the
    /// stream, so they leave the connection open.
    async fn send_error(&mut self, err: TransportError) -> ConnectionError {
        match err {
            TransportError::Framing(framing) => {
                tracing::warn!(error = %framing, "outgoing frame rejected");
                ConnectionError::FrameRejected(framing)
            }
            other => self.fail(other.into()).await,
        }
    }
}

#[cfg(test)]
mod tests;
