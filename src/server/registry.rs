//! Registry of peers connected to a server.
//!
//! Each accepted connection is entered under a fresh [`ConnectionId`] and
//! removed when its task ends. The peer identity is filled in once INIT has
//! been exchanged.

use std::{
    fmt,
    net::SocketAddr,
    sync::atomic::{AtomicU64, Ordering},
};

use dashmap::DashMap;

/// Identifier assigned to an accepted connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Wrap a raw identifier.
    #[must_use]
    pub const fn new(id: u64) -> Self { Self(id) }

    /// Raw identifier.
    #[must_use]
    pub const fn as_u64(self) -> u64 { self.0 }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "conn-{}", self.0) }
}

/// What the server knows about a connected peer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PeerEntry {
    /// Remote socket address.
    pub addr: SocketAddr,
    /// Identity announced during INIT, once known.
    pub ident: Option<String>,
}

/// Concurrent map of live connections.
#[derive(Debug, Default)]
pub struct PeerRegistry {
    peers: DashMap<ConnectionId, PeerEntry>,
    next_id: AtomicU64,
}

impl PeerRegistry {
    /// Enter a new connection from `addr` and return its id.
    pub fn register(&self, addr: SocketAddr) -> ConnectionId {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.peers.insert(id, PeerEntry { addr, ident: None });
        id
    }

    /// Record the identity announced by connection `id`.
    pub fn set_ident(&self, id: ConnectionId, ident: impl Into<String>) {
        if let Some(mut entry) = self.peers.get_mut(&id) {
            entry.ident = Some(ident.into());
        }
    }

    /// Remove connection `id`, returning its entry.
    pub fn remove(&self, id: ConnectionId) -> Option<PeerEntry> {
        self.peers.remove(&id).map(|(_, entry)| entry)
    }

    /// Entry for connection `id`.
    #[must_use]
    pub fn get(&self, id: ConnectionId) -> Option<PeerEntry> {
        self.peers.get(&id).map(|entry| entry.clone())
    }

    /// Find the connection whose peer announced `ident`.
    #[must_use]
    pub fn find_by_ident(&self, ident: &str) -> Option<ConnectionId> {
        self.peers
            .iter()
            .find(|entry| entry.ident.as_deref() == Some(ident))
            .map(|entry| *entry.key())
    }

    /// Ids of all live connections, sorted.
    #[must_use]
    pub fn active_ids(&self) -> Vec<ConnectionId> {
        let mut ids: Vec<_> = self.peers.iter().map(|entry| *entry.key()).collect();
        ids.sort_unstable();
        ids
    }

    /// Number of live connections.
    #[must_use]
    pub fn len(&self) -> usize { self.peers.len() }

    /// Whether no connection is live.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.peers.is_empty() }
}

#[cfg(test)]
mod tests {
    use std::net::{Ipv4Addr, SocketAddr};

    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn addr() -> SocketAddr { SocketAddr::new(Ipv4Addr::LOCALHOST.into(), 4000) }

    #[rstest]
    fn ids_are_unique(addr: SocketAddr) {
        let registry = PeerRegistry::default();
        let first = registry.register(addr);
        let second = registry.register(addr);
        assert_ne!(first, second);
        assert_eq!(registry.active_ids(), vec![first, second]);
    }

    #[rstest]
    fn ident_lookup_and_removal(addr: SocketAddr) {
        let registry = PeerRegistry::default();
        let id = registry.register(addr);
        registry.set_ident(id, "agent-4");
        assert_eq!(registry.find_by_ident("agent-4"), Some(id));
        assert_eq!(
            registry.remove(id),
            Some(PeerEntry {
                addr,
                ident: Some("agent-4".into()),
            })
        );
        assert!(registry.is_empty());
        assert_eq!(registry.get(id), None);
    }
}
