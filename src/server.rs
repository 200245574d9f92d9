//! TCP listener serving agent connections.
//!
//! [`AgentServer`] accepts TCP peers and drives each one with an
//! [`AgentConnection`](crate::connection::AgentConnection) built by a
//! factory closure. Every connection runs in its own task until the peer
//! quits, the stream fails or the server shuts down.

mod accept;
mod backoff;
mod binding;
mod error;
mod registry;
mod runtime;

use std::sync::Arc;

pub use backoff::BackoffConfig;
pub use error::ServerError;
pub use registry::{ConnectionId, PeerEntry, PeerRegistry};
use tokio::{net::TcpListener, sync::oneshot};

use crate::connection::ConnectionBuilder;

/// Creates the builder for each accepted connection.
pub trait ConnectionFactory: Fn() -> ConnectionBuilder + Send + Sync + Clone + 'static {}

impl<F> ConnectionFactory for F where
    F: Fn() -> ConnectionBuilder + Send + Sync + Clone + 'static
{
}

/// Accept loop for agent connections.
///
/// New servers start [`Unbound`]; [`bind`](AgentServer::bind) yields a
/// [`Bound`] server that can run.
///
/// ```no_run
/// use std::sync::Arc;
///
/// use agentlink::{
///     connection::AgentConnection,
///     hooks::AgentProtocol,
///     server::{AgentServer, ServerError},
/// };
///
/// struct Frontend;
/// impl AgentProtocol for Frontend {}
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), ServerError> {
/// let protocol = Arc::new(Frontend);
/// let server = AgentServer::new(move || {
///     AgentConnection::builder("frontend").protocol(Arc::clone(&protocol))
/// })
/// .bind(([127, 0, 0, 1], 7777).into())?;
/// server.run().await
/// # }
/// ```
pub struct AgentServer<F, S = Unbound>
where
    F: ConnectionFactory,
    S: ServerState,
{
    pub(crate) factory: F,
    pub(crate) backoff_config: BackoffConfig,
    pub(crate) ready_tx: Option<oneshot::Sender<()>>,
    pub(crate) registry: Arc<PeerRegistry>,
    pub(crate) state: S,
}

/// Marker for a server without a listener.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unbound;

/// Marker for a server bound to a TCP listener.
#[derive(Debug, Clone)]
pub struct Bound {
    pub(crate) listener: Arc<TcpListener>,
}

/// Binding state of an [`AgentServer`].
pub trait ServerState: sealed::Sealed {}

impl ServerState for Unbound {}
impl ServerState for Bound {}

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Unbound {}
    impl Sealed for super::Bound {}
}

impl<F> AgentServer<F, Unbound>
where
    F: ConnectionFactory,
{
    /// Create an unbound server that builds each connection with `factory`.
    #[must_use]
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            backoff_config: BackoffConfig::default(),
            ready_tx: None,
            registry: Arc::new(PeerRegistry::default()),
            state: Unbound,
        }
    }
}

impl<F, S> AgentServer<F, S>
where
    F: ConnectionFactory,
    S: ServerState,
{
    /// Retry failed accepts with `config`. The value is normalized first.
    #[must_use]
    pub fn accept_backoff(mut self, config: BackoffConfig) -> Self {
        self.backoff_config = config.normalized();
        self
    }

    /// Notify `tx` once the accept loop is running.
    #[must_use]
    pub fn ready_signal(mut self, tx: oneshot::Sender<()>) -> Self {
        self.ready_tx = Some(tx);
        self
    }

    /// Registry of the peers currently connected.
    #[must_use]
    pub fn registry(&self) -> Arc<PeerRegistry> { Arc::clone(&self.registry) }
}
