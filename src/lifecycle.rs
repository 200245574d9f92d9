//! Connection lifecycle notifications.
//!
//! A connection publishes its state on a [`tokio::sync::watch`] channel.
//! Observers see [`LifecycleEvent::Connected`] until the connection closes,
//! then exactly one [`LifecycleEvent::Closed`] carrying the reason.

use tokio::sync::watch;

/// Why a connection closed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CloseReason {
    /// This side called `quit`.
    Quit,
    /// A callback asked for the connection to close.
    Requested,
    /// The peer closed the stream at a frame boundary.
    PeerClosed,
    /// The stream failed or can no longer be trusted.
    Failed(String),
}

/// Connection state as seen by observers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The connection is usable.
    Connected,
    /// The connection closed for the given reason.
    Closed(CloseReason),
}

/// Receiving half of a connection's lifecycle channel.
#[derive(Clone, Debug)]
pub struct LifecycleObserver {
    rx: watch::Receiver<LifecycleEvent>,
}

impl LifecycleObserver {
    /// Latest published event.
    #[must_use]
    pub fn current(&self) -> LifecycleEvent { self.rx.borrow().clone() }

    /// Wait until the connection closes and return the reason.
    ///
    /// If the connection is dropped without closing, the reason is
    /// [`CloseReason::Failed`].
    pub async fn closed(&mut self) -> CloseReason {
        match self
            .rx
            .wait_for(|event| matches!(event, LifecycleEvent::Closed(_)))
            .await
        {
            Ok(event) => match &*event {
                LifecycleEvent::Closed(reason) => reason.clone(),
                LifecycleEvent::Connected => CloseReason::Failed("connection dropped".into()),
            },
            Err(_) => CloseReason::Failed("connection dropped".into()),
        }
    }
}

/// Sending half owned by the connection.
#[derive(Debug)]
pub(crate) struct Lifecycle {
    tx: watch::Sender<LifecycleEvent>,
}

impl Lifecycle {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(LifecycleEvent::Connected);
        Self { tx }
    }

    pub(crate) fn subscribe(&self) -> LifecycleObserver {
        LifecycleObserver {
            rx: self.tx.subscribe(),
        }
    }

    /// Publish the close event. Returns `false` if already closed.
    pub(crate) fn close(&self, reason: CloseReason) -> bool {
        self.tx.send_if_modified(|event| {
            if matches!(event, LifecycleEvent::Connected) {
                *event = LifecycleEvent::Closed(reason);
                true
            } else {
                false
            }
        })
    }

    pub(crate) fn is_closed(&self) -> bool {
        matches!(*self.tx.borrow(), LifecycleEvent::Closed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn close_is_published_once() {
        let lifecycle = Lifecycle::new();
        let mut observer = lifecycle.subscribe();
        assert_eq!(observer.current(), LifecycleEvent::Connected);

        assert!(lifecycle.close(CloseReason::PeerClosed));
        assert!(!lifecycle.close(CloseReason::Quit));
        assert!(lifecycle.is_closed());
        assert_eq!(observer.closed().await, CloseReason::PeerClosed);
    }

    #[tokio::test]
    async fn dropped_connection_reports_failure() {
        let lifecycle = Lifecycle::new();
        let mut observer = lifecycle.subscribe();
        drop(lifecycle);
        assert!(matches!(observer.closed().await, CloseReason::Failed(_)));
    }
}
