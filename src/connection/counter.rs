//! Process-wide tally of agent links.

use std::sync::atomic::{AtomicU64, Ordering};

static LIVE_LINKS: AtomicU64 = AtomicU64::new(0);

/// Held by each [`super::AgentConnection`]. Construction registers the link
/// with the tally and the connections gauge; drop releases it.
pub(super) struct ActiveConnection;

impl ActiveConnection {
    pub(super) fn new() -> Self {
        LIVE_LINKS.fetch_add(1, Ordering::Relaxed);
        crate::metrics::inc_connections();
        Self
    }
}

impl Drop for ActiveConnection {
    fn drop(&mut self) {
        LIVE_LINKS.fetch_sub(1, Ordering::Relaxed);
        crate::metrics::dec_connections();
    }
}

/// Number of [`super::AgentConnection`] values currently alive in this
/// process. A closed link counts until it is dropped.
#[must_use]
pub fn active_connection_count() -> u64 { LIVE_LINKS.load(Ordering::Relaxed) }
