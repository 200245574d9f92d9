//! Builder for [`AgentConnection`].

use std::{net::SocketAddr, sync::Arc};

use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::{TcpSocket, TcpStream},
};

use super::AgentConnection;
use crate::{
    command::Command,
    config::ConnectionConfig,
    error::ConnectionError,
    frame::{CommandFrameCodec, FrameTransport},
    hooks::{AgentProtocol, ProtocolHooks, SessionContext},
};

/// Configures and creates an [`AgentConnection`].
///
/// ```
/// use std::sync::Arc;
///
/// use agentlink::{
///     command::Command,
///     connection::AgentConnection,
///     hooks::AgentProtocol,
/// };
///
/// struct Quiet;
/// impl AgentProtocol for Quiet {}
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let (stream, _peer) = tokio::io::duplex(1024);
/// let conn = AgentConnection::builder("frontend")
///     .protocol(Arc::new(Quiet))
///     .reply_to(Command::Check, true)
///     .build(stream);
/// assert_eq!(conn.my_ident(), "frontend");
/// # }
/// ```
pub struct ConnectionBuilder {
    ident: String,
    config: ConnectionConfig,
    hooks: ProtocolHooks,
    reply_overrides: Vec<(Command, bool)>,
}

impl ConnectionBuilder {
    /// Start a builder for a connection identifying itself as `ident`.
    #[must_use]
    pub fn new(ident: impl Into<String>) -> Self {
        Self {
            ident: ident.into(),
            config: ConnectionConfig::default(),
            hooks: ProtocolHooks::default(),
            reply_overrides: Vec::new(),
        }
    }

    /// Use `config` for the connection.
    #[must_use]
    pub fn config(mut self, config: ConnectionConfig) -> Self {
        self.config = config;
        self
    }

    /// Drive callbacks from `protocol`. Replaces any hooks set before.
    #[must_use]
    pub fn protocol<P>(mut self, protocol: Arc<P>) -> Self
    where
        P: AgentProtocol + ?Sized,
    {
        self.hooks = ProtocolHooks::from_protocol(&protocol);
        self
    }

    /// Use a prepared callback table. Replaces any protocol set before.
    #[must_use]
    pub fn hooks(mut self, hooks: ProtocolHooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Enable or disable the reply sent for incoming `command` requests.
    ///
    /// Overrides survive a later [`protocol`](Self::protocol) or
    /// [`hooks`](Self::hooks) call.
    #[must_use]
    pub fn reply_to(mut self, command: Command, enabled: bool) -> Self {
        self.reply_overrides.push((command, enabled));
        self
    }

    /// Wrap an established stream.
    #[must_use]
    pub fn build<T>(self, stream: T) -> AgentConnection<T>
    where
        T: AsyncRead + AsyncWrite + Unpin,
    {
        self.build_with_peer(stream, None)
    }

    /// Wrap an established stream whose remote address is known.
    #[must_use]
    pub fn build_with_peer<T>(
        self,
        stream: T,
        peer_addr: Option<SocketAddr>,
    ) -> AgentConnection<T>
    where
        T: AsyncRead + AsyncWrite + Unpin,
    {
        let Self {
            ident,
            config,
            mut hooks,
            reply_overrides,
        } = self;
        for (command, enabled) in reply_overrides {
            hooks.set_reply_enabled(command, enabled);
        }
        let codec = CommandFrameCodec::new(config.get_max_frame_length());
        let transport = FrameTransport::new(stream, codec, config.get_byte_order())
            .with_read_timeout(config.get_read_timeout());
        let ctx = SessionContext::new(ident, peer_addr);
        AgentConnection::new(transport, hooks, ctx, config)
    }

    /// Connect to `addr` over TCP.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::Io`] if the socket cannot be created or
    /// the connection is refused.
    ///
    /// ```no_run
    /// use std::net::SocketAddr;
    ///
    /// use agentlink::{connection::AgentConnection, error::ConnectionError};
    ///
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), ConnectionError> {
    /// let addr: SocketAddr = "127.0.0.1:7777".parse().expect("valid socket address");
    /// let mut conn = AgentConnection::builder("frontend").connect(addr).await?;
    /// conn.init().await?;
    /// conn.quit().await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect(
        self,
        addr: SocketAddr,
    ) -> Result<AgentConnection<TcpStream>, ConnectionError> {
        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };
        let stream = socket.connect(addr).await?;
        stream.set_nodelay(true)?;
        let peer_addr = stream.peer_addr().ok();
        Ok(self.build_with_peer(stream, peer_addr))
    }
}
