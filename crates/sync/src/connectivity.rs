// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Edge-triggered reachability signal.

use tokio::sync::watch;

/// Tracks host-reported reachability and publishes transitions.
///
/// Repeated identical reports are absorbed, so subscribers wake once per
/// transition rather than once per poll. The signal is a heuristic trigger
/// only: the sync engine treats delivery failures as authoritative even when
/// the monitor is optimistic.
#[derive(Debug)]
pub struct ConnectivityMonitor {
    tx: watch::Sender<bool>,
}

impl ConnectivityMonitor {
    /// Creates a monitor with the given initial reachability.
    pub fn new(initially_online: bool) -> Self {
        let (tx, _) = watch::channel(initially_online);
        ConnectivityMonitor { tx }
    }

    /// Current reachability.
    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    /// Reports the current reachability from the host environment.
    ///
    /// Returns `true` when this report is a transition; duplicate reports
    /// return `false` and wake nobody.
    pub fn set_online(&self, online: bool) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        })
    }

    /// Subscribes to transitions. The receiver wakes once per edge.
    pub fn watch(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        ConnectivityMonitor::new(true)
    }
}

#[cfg(test)]
#[path = "connectivity_tests.rs"]
mod tests;
