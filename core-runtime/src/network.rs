//! Network status observation.
//!
//! Connectivity used to be an ambient flag the UI polled. Here it is an
//! explicit handle: the host reports status changes through
//! [`NetworkStateHandle::set`], and interested parties observe them through
//! a `watch` subscription (and, when wired by the host, as
//! [`NetworkEvent`](crate::events::NetworkEvent)s on the bus).

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::debug;

/// Observed connectivity status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum NetworkStatus {
    /// Connectivity has not been reported yet.
    #[default]
    Unknown,
    /// The device has a usable network path.
    Connected,
    /// The device reports no connectivity.
    Disconnected,
}

impl NetworkStatus {
    /// Whether requests are worth attempting.
    ///
    /// `Unknown` counts as online: the transport finds out soon enough, and
    /// failing eagerly on startup would be wrong.
    pub fn is_online(&self) -> bool {
        !matches!(self, NetworkStatus::Disconnected)
    }
}

/// Shared, observable connectivity state.
///
/// Cloning the handle shares the underlying channel; any clone may report,
/// all observers see the change.
#[derive(Clone)]
pub struct NetworkStateHandle {
    sender: watch::Sender<NetworkStatus>,
}

impl NetworkStateHandle {
    /// Creates a handle with the given initial status.
    pub fn new(initial: NetworkStatus) -> Self {
        let (sender, _) = watch::channel(initial);
        Self { sender }
    }

    /// Reports a status change. No-op when the status is unchanged.
    pub fn set(&self, status: NetworkStatus) {
        self.sender.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                debug!(?status, "Network status changed");
                *current = status;
                true
            }
        });
    }

    /// Returns the current status.
    pub fn current(&self) -> NetworkStatus {
        *self.sender.borrow()
    }

    /// Subscribes to status changes.
    pub fn observe(&self) -> watch::Receiver<NetworkStatus> {
        self.sender.subscribe()
    }
}

impl Default for NetworkStateHandle {
    fn default() -> Self {
        Self::new(NetworkStatus::Unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_initial_status() {
        let handle = NetworkStateHandle::default();
        assert_eq!(handle.current(), NetworkStatus::Unknown);
        assert!(handle.current().is_online());
    }

    #[tokio::test]
    async fn test_set_and_observe() {
        let handle = NetworkStateHandle::new(NetworkStatus::Connected);
        let mut rx = handle.observe();

        handle.set(NetworkStatus::Disconnected);

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), NetworkStatus::Disconnected);
        assert!(!handle.current().is_online());
    }

    #[tokio::test]
    async fn test_unchanged_status_does_not_notify() {
        let handle = NetworkStateHandle::new(NetworkStatus::Connected);
        let mut rx = handle.observe();
        rx.borrow_and_update();

        handle.set(NetworkStatus::Connected);
        assert!(!rx.has_changed().unwrap());
    }
}
