//! Listener binding for [`AgentServer`].

use std::{
    net::{SocketAddr, TcpListener as StdTcpListener},
    sync::Arc,
};

use tokio::net::TcpListener;

use super::{AgentServer, Bound, ConnectionFactory, ServerError, ServerState, Unbound};

impl<F, S> AgentServer<F, S>
where
    F: ConnectionFactory,
    S: ServerState,
{
    fn bind_to_listener(
        self,
        std_listener: StdTcpListener,
    ) -> Result<AgentServer<F, Bound>, ServerError> {
        let AgentServer {
            factory,
            backoff_config,
            ready_tx,
            registry,
            ..
        } = self;

        std_listener
            .set_nonblocking(true)
            .map_err(ServerError::Bind)?;
        let listener = TcpListener::from_std(std_listener).map_err(ServerError::Bind)?;

        Ok(AgentServer {
            factory,
            backoff_config,
            ready_tx,
            registry,
            state: Bound {
                listener: Arc::new(listener),
            },
        })
    }

    /// Bind to `addr`.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the address cannot be bound.
    pub fn bind(self, addr: SocketAddr) -> Result<AgentServer<F, Bound>, ServerError> {
        let std_listener = StdTcpListener::bind(addr).map_err(ServerError::Bind)?;
        self.bind_to_listener(std_listener)
    }

    /// Serve connections from an already bound listener.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the listener cannot be registered
    /// with the runtime.
    pub fn bind_existing_listener(
        self,
        std_listener: StdTcpListener,
    ) -> Result<AgentServer<F, Bound>, ServerError> {
        self.bind_to_listener(std_listener)
    }
}

impl<F> AgentServer<F, Unbound>
where
    F: ConnectionFactory,
{
    /// Unbound servers have no address.
    #[must_use]
    pub const fn local_addr(&self) -> Option<SocketAddr> { None }
}

impl<F> AgentServer<F, Bound>
where
    F: ConnectionFactory,
{
    /// Address the listener is bound to.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> { self.state.listener.local_addr().ok() }
}
