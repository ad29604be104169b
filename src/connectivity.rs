// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.

//! Connectivity signal adapter.
//!
//! The platform's network monitor reports two inputs: link-level
//! connectivity and internet reachability. They fold into a single online
//! boolean broadcast on a watch channel, so the sync engine sees only
//! offline→online transitions.

use tokio::sync::watch;
use tracing::info;

/// One raw report from the platform network monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkReport {
    /// Link-level connectivity (wifi/cellular association)
    pub connected: bool,
    /// Internet reachability probe; `None` while undetermined
    pub internet_reachable: Option<bool>,
}

impl LinkReport {
    /// Online means: link connected, and reachability either confirmed or
    /// still unknown. A confirmed-unreachable link counts as offline.
    #[must_use]
    pub fn is_online(&self) -> bool {
        self.connected && self.internet_reachable.unwrap_or(true)
    }
}

/// Folds raw link reports into an online/offline watch channel.
pub struct NetworkMonitor {
    tx: watch::Sender<bool>,
}

impl NetworkMonitor {
    #[must_use]
    pub fn new(initially_online: bool) -> Self {
        let (tx, _) = watch::channel(initially_online);
        Self { tx }
    }

    /// Feed one platform report into the monitor.
    pub fn report(&self, report: LinkReport) {
        self.set_online(report.is_online());
    }

    /// Force the online flag (manual override, tests).
    pub fn set_online(&self, online: bool) {
        let changed = self.tx.send_if_modified(|current| {
            if *current != online {
                *current = online;
                true
            } else {
                false
            }
        });
        if changed {
            info!(online, "Connectivity changed");
        }
    }

    /// Current online flag.
    #[must_use]
    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    /// Receiver for the engine's run loop.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}
