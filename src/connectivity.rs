use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::debug;

use crate::model::NetworkStatus;

/// Reachability classification as delivered by the platform.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkAccess {
    Internet,
    ConstrainedInternet,
    Local,
    None,
    Unknown,
}

impl NetworkAccess {
    /// Only full internet access counts as online.
    #[must_use]
    pub const fn classify(self) -> NetworkStatus {
        match self {
            Self::Internet => NetworkStatus::Online,
            Self::ConstrainedInternet | Self::Local | Self::None | Self::Unknown => {
                NetworkStatus::Offline
            }
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectivitySnapshot {
    pub status: NetworkStatus,
    /// False until the platform has reported at least once.
    pub determined: bool,
}

impl Default for ConnectivitySnapshot {
    fn default() -> Self {
        Self {
            status: NetworkStatus::Offline,
            determined: false,
        }
    }
}

impl ConnectivitySnapshot {
    #[must_use]
    pub fn label(&self) -> &'static str {
        if self.determined {
            self.status.as_str()
        } else {
            "Checking..."
        }
    }
}

/// Event-driven pass-through over platform reachability with a cached
/// last-known value. `report` may be called from any thread.
#[derive(Debug)]
pub struct ConnectivityMonitor {
    tx: watch::Sender<ConnectivitySnapshot>,
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectivityMonitor {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ConnectivitySnapshot::default());
        Self { tx }
    }

    pub fn current_status(&self) -> NetworkStatus {
        self.tx.borrow().status
    }

    pub fn snapshot(&self) -> ConnectivitySnapshot {
        *self.tx.borrow()
    }

    pub fn report(&self, access: NetworkAccess) -> bool {
        self.report_status(access.classify())
    }

    /// Returns whether observers were notified.
    pub fn report_status(&self, status: NetworkStatus) -> bool {
        let changed = self.tx.send_if_modified(|snapshot| {
            if snapshot.determined && snapshot.status == status {
                return false;
            }
            snapshot.status = status;
            snapshot.determined = true;
            true
        });
        if changed {
            debug!(status = %status, "connectivity changed");
        }
        changed
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectivitySnapshot> {
        self.tx.subscribe()
    }
}
