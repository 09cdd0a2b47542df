//! Connectivity monitor: online/offline transitions as a watch channel.
//!
//! The engine watches for the offline-to-online edge and triggers an
//! immediate recovery sync, bypassing the debounce window. The monitor
//! itself only models the signal; in the browser it would be fed by the
//! platform's online/offline events, in tests and the CLI harness by
//! `ConnectivityHandle::set_online`.

use tokio::sync::watch;

/// Observable online/offline state.
#[derive(Debug)]
pub struct ConnectivityMonitor {
    tx: watch::Sender<bool>,
}

impl ConnectivityMonitor {
    /// Start in the given state (`true` = online).
    #[must_use]
    pub fn new(online: bool) -> Self {
        let (tx, _) = watch::channel(online);
        Self { tx }
    }

    /// Feed side: whatever observes the platform's connectivity events.
    #[must_use]
    pub fn handle(&self) -> ConnectivityHandle {
        ConnectivityHandle {
            tx: self.tx.clone(),
        }
    }

    /// Observe side: one receiver per engine.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    #[must_use]
    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Write handle for connectivity transitions.
#[derive(Debug, Clone)]
pub struct ConnectivityHandle {
    tx: watch::Sender<bool>,
}

impl ConnectivityHandle {
    /// Publish a transition. Redundant updates (online while online) are
    /// suppressed so watchers only wake on real edges.
    pub fn set_online(&self, online: bool) {
        self.tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn watchers_observe_the_offline_to_online_edge() {
        let monitor = ConnectivityMonitor::new(false);
        let mut rx = monitor.watch();
        let handle = monitor.handle();

        handle.set_online(true);
        rx.changed().await.unwrap();
        assert!(*rx.borrow());
    }

    #[tokio::test]
    async fn redundant_updates_do_not_wake_watchers() {
        let monitor = ConnectivityMonitor::new(true);
        let mut rx = monitor.watch();
        monitor.handle().set_online(true);

        assert!(!rx.has_changed().unwrap());
    }
}
