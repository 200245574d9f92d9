//! Connected endpoints over in-memory streams.

use std::{
    net::{Ipv4Addr, SocketAddr, TcpListener as StdTcpListener},
    sync::Arc,
};

use agentlink::{
    byte_order::ByteOrder,
    config::ConnectionConfig,
    connection::AgentConnection,
    frame::{CommandFrameCodec, FrameTransport},
    hooks::AgentProtocol,
};
use tokio::io::{DuplexStream, duplex};

const CAPACITY: usize = 64 * 1024;

/// Raw frame-level view of the far end of a connection.
pub type Peer = FrameTransport<DuplexStream>;

/// Two connections wired to each other.
///
/// The first identifies as `left` and runs `left_protocol`; the second as
/// `right` with `right_protocol`.
#[must_use]
pub fn connected_pair<L, R>(
    left: &str,
    left_protocol: Arc<L>,
    right: &str,
    right_protocol: Arc<R>,
) -> (AgentConnection<DuplexStream>, AgentConnection<DuplexStream>)
where
    L: AgentProtocol,
    R: AgentProtocol,
{
    let (a, b) = duplex(CAPACITY);
    let left = AgentConnection::builder(left)
        .protocol(left_protocol)
        .build(a);
    let right = AgentConnection::builder(right)
        .protocol(right_protocol)
        .build(b);
    (left, right)
}

/// A connection and a raw frame transport standing in for its peer.
///
/// The peer writes big-endian frames.
#[must_use]
pub fn raw_peer<P>(
    ident: &str,
    protocol: Arc<P>,
    config: ConnectionConfig,
) -> (AgentConnection<DuplexStream>, Peer)
where
    P: AgentProtocol,
{
    let (a, b) = duplex(CAPACITY);
    let conn = AgentConnection::builder(ident)
        .config(config)
        .protocol(protocol)
        .build(a);
    let peer = FrameTransport::new(b, CommandFrameCodec::default(), ByteOrder::Big);
    (conn, peer)
}

/// Create a TCP listener bound to a free local port.
///
/// # Errors
///
/// Returns any IO error encountered while binding.
pub fn unused_listener() -> std::io::Result<StdTcpListener> {
    let addr = SocketAddr::new(Ipv4Addr::LOCALHOST.into(), 0);
    StdTcpListener::bind(addr)
}
