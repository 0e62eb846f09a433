// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Sync engine: drains the durable queue through the transport.
//!
//! One drain cycle attempts every operation queued at its start, oldest
//! first. Delivery success removes the entry; failure increments its retry
//! count, dropping it once the budget is exhausted. Only one cycle runs at a
//! time; requests arriving mid-cycle are coalesced into it.
//!
//! The run loop owns the queue store outright and serializes all mutations,
//! waking on connectivity edges, the retry timer, and handle commands.

use std::time::Duration;

use chrono::{DateTime, Utc};
use outbox_core::{
    KeyValueStore, NewOperation, PendingOperation, QueueStats, QueueStore, RetryOutcome,
};
use tokio::sync::{broadcast, mpsc, watch};

use crate::handle::{Command, QueueHandle};
use crate::scheduler::{BackoffPolicy, RetryScheduler, BASE_DELAY, MAX_DELAY};
use crate::transport::Transport;

/// Configuration for the sync engine.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Backoff delay before the first retry.
    pub base_delay: Duration,
    /// Backoff ceiling.
    pub max_delay: Duration,
    /// Capacity of the event broadcast channel.
    pub event_capacity: usize,
    /// Capacity of the command channel behind [`QueueHandle`].
    pub command_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            base_delay: BASE_DELAY,
            max_delay: MAX_DELAY,
            event_capacity: 64,
            command_capacity: 32,
        }
    }
}

/// Events observable by consumers of the queue.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// A drain cycle delivered at least one operation.
    SyncCompleted {
        at: DateTime<Utc>,
        delivered: usize,
    },
    /// A drain cycle aborted before attempting every entry.
    SyncFailed { reason: String },
    /// An operation exhausted its retry budget and was discarded.
    ///
    /// Carries the full operation so a host can offer a re-submit path;
    /// this is the only way an accepted operation is ever lost.
    OperationDropped { op: PendingOperation },
}

/// Drain-cycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainState {
    Idle,
    Draining,
}

/// Outcome of a single drain request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Every entry queued at the start of the cycle was attempted.
    Completed {
        delivered: usize,
        failed: usize,
        dropped: usize,
    },
    /// The cycle stopped early; remaining entries were left queued.
    Aborted { delivered: usize },
    /// Another cycle was already in flight; nothing was attempted.
    Coalesced,
}

enum Wake {
    Command(Option<Command>),
    /// Connectivity edge; `false` means the monitor went away.
    Connectivity(bool),
    Timer,
}

/// Replays queued operations against the transport.
pub struct SyncEngine<T: Transport, S: KeyValueStore> {
    store: QueueStore<S>,
    transport: T,
    conn: watch::Receiver<bool>,
    conn_open: bool,
    scheduler: RetryScheduler,
    commands: mpsc::Receiver<Command>,
    events: broadcast::Sender<SyncEvent>,
    state: DrainState,
    last_sync: Option<DateTime<Utc>>,
}

impl<T: Transport, S: KeyValueStore> SyncEngine<T, S> {
    /// Creates an engine and the handle that feeds it.
    ///
    /// The connectivity receiver usually comes from
    /// [`ConnectivityMonitor::watch`](crate::ConnectivityMonitor::watch).
    pub fn new(
        store: QueueStore<S>,
        transport: T,
        connectivity: watch::Receiver<bool>,
        config: SyncConfig,
    ) -> (Self, QueueHandle) {
        let (command_tx, command_rx) = mpsc::channel(config.command_capacity);
        let (event_tx, _) = broadcast::channel(config.event_capacity);

        let policy = BackoffPolicy {
            base: config.base_delay,
            max: config.max_delay,
        };

        let engine = SyncEngine {
            store,
            transport,
            conn: connectivity,
            conn_open: true,
            scheduler: RetryScheduler::new(policy),
            commands: command_rx,
            events: event_tx.clone(),
            state: DrainState::Idle,
            last_sync: None,
        };
        let handle = QueueHandle {
            commands: command_tx,
            events: event_tx,
        };
        (engine, handle)
    }

    /// Subscribes to sync events.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    /// Whether the monitor currently reports the backend reachable.
    pub fn is_online(&self) -> bool {
        *self.conn.borrow()
    }

    /// Timestamp of the last drain cycle that delivered something.
    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        self.last_sync
    }

    /// Current drain-cycle state.
    pub fn state(&self) -> DrainState {
        self.state
    }

    /// Admits an operation without requesting a drain.
    pub fn enqueue(&mut self, op: NewOperation) -> outbox_core::Result<PendingOperation> {
        self.store.enqueue(op)
    }

    /// Snapshot of all queued operations in enqueue order.
    pub fn list_all(&self) -> Vec<PendingOperation> {
        self.store.list_all()
    }

    /// Aggregate counts over the queue.
    pub fn stats(&self) -> QueueStats {
        self.store.stats()
    }

    /// Runs the engine until every handle has been dropped.
    ///
    /// Entries persisted by an earlier process are drained right away when
    /// the monitor already reports online.
    pub async fn run(mut self) {
        tracing::info!("sync engine started, {} pending", self.store.len());
        if self.is_online() && !self.store.is_empty() {
            self.drain().await;
        }

        loop {
            let wake = tokio::select! {
                cmd = self.commands.recv() => Wake::Command(cmd),
                res = self.conn.changed(), if self.conn_open => Wake::Connectivity(res.is_ok()),
                _ = self.scheduler.wait() => Wake::Timer,
            };

            match wake {
                Wake::Command(None) => break,
                Wake::Command(Some(cmd)) => self.handle_command(cmd).await,
                Wake::Connectivity(false) => {
                    // Monitor dropped; timers and commands still drive drains.
                    self.conn_open = false;
                }
                Wake::Connectivity(true) => {
                    let online = *self.conn.borrow_and_update();
                    if online {
                        tracing::info!("connectivity restored");
                        self.drain().await;
                    } else {
                        tracing::info!("connectivity lost");
                    }
                }
                Wake::Timer => {
                    self.scheduler.disarm();
                    // While offline the timer stays disarmed; the online
                    // edge re-triggers the drain.
                    if self.is_online() {
                        self.drain().await;
                    }
                }
            }
        }

        tracing::info!("sync engine stopped");
    }

    async fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Enqueue { op, reply } => {
                let admitted = self.store.enqueue(op);
                let drain_now = admitted.is_ok() && self.is_online();
                let _ = reply.send(admitted);
                if drain_now {
                    self.drain().await;
                }
            }
            Command::SyncNow { reply } => {
                let outcome = self.drain().await;
                let _ = reply.send(outcome);
            }
            Command::ListAll { reply } => {
                let _ = reply.send(self.store.list_all());
            }
            Command::Stats { reply } => {
                let _ = reply.send(self.store.stats());
            }
            Command::LastSync { reply } => {
                let _ = reply.send(self.last_sync);
            }
            Command::Clear { reply } => {
                let cleared = self.store.clear();
                if cleared.is_ok() {
                    self.scheduler.disarm();
                }
                let _ = reply.send(cleared);
            }
        }
    }

    /// Attempts delivery of every queued operation, oldest first.
    ///
    /// Single-flight: a request arriving while a cycle is in flight is
    /// coalesced into it. Operations enqueued after the cycle's snapshot was
    /// taken wait for the next cycle.
    pub async fn drain(&mut self) -> DrainOutcome {
        if self.state == DrainState::Draining {
            tracing::debug!("drain requested while draining, coalesced");
            return DrainOutcome::Coalesced;
        }

        self.state = DrainState::Draining;
        let outcome = self.drain_cycle().await;
        self.state = DrainState::Idle;

        let delivered = match outcome {
            DrainOutcome::Completed { delivered, .. } | DrainOutcome::Aborted { delivered } => {
                delivered
            }
            DrainOutcome::Coalesced => 0,
        };
        if delivered > 0 {
            let at = Utc::now();
            self.last_sync = Some(at);
            self.emit(SyncEvent::SyncCompleted { at, delivered });
        }

        self.reschedule();
        outcome
    }

    async fn drain_cycle(&mut self) -> DrainOutcome {
        let snapshot = self.store.list_all();
        if snapshot.is_empty() {
            return DrainOutcome::Completed {
                delivered: 0,
                failed: 0,
                dropped: 0,
            };
        }

        tracing::info!("drain started, {} pending", snapshot.len());
        let mut delivered = 0;
        let mut failed = 0;
        let mut dropped = 0;

        for op in snapshot {
            // The monitor is only a heuristic, but once it reports offline
            // there is no point attempting the rest of the cycle.
            if !self.is_online() {
                tracing::warn!("connectivity lost mid-drain, {} entries left", self.store.len());
                self.emit(SyncEvent::SyncFailed {
                    reason: "connectivity lost".to_string(),
                });
                return DrainOutcome::Aborted { delivered };
            }

            let result = self.transport.deliver(&op).await;
            match result {
                Ok(()) => {
                    if let Err(e) = self.store.remove(op.id) {
                        return self.abort_on_store_error(e, delivered);
                    }
                    delivered += 1;
                }
                Err(e) => {
                    tracing::debug!("delivery of {} failed: {}", op.id, e);
                    failed += 1;
                    match self.store.increment_retry(op.id) {
                        Ok(RetryOutcome::Dropped(entry)) => {
                            dropped += 1;
                            self.emit(SyncEvent::OperationDropped { op: entry });
                        }
                        Ok(_) => {}
                        Err(e) => return self.abort_on_store_error(e, delivered),
                    }
                }
            }
        }

        tracing::info!(
            "drain finished: {} delivered, {} failed, {} dropped",
            delivered,
            failed,
            dropped
        );
        DrainOutcome::Completed {
            delivered,
            failed,
            dropped,
        }
    }

    fn abort_on_store_error(&mut self, e: outbox_core::Error, delivered: usize) -> DrainOutcome {
        tracing::error!("queue store failure mid-drain: {}", e);
        self.emit(SyncEvent::SyncFailed {
            reason: format!("queue store failure: {}", e),
        });
        DrainOutcome::Aborted { delivered }
    }

    /// Arms the single retry timer off the oldest entry, or disarms when
    /// the queue is empty.
    fn reschedule(&mut self) {
        match self.store.oldest() {
            Some(op) => {
                let delay = self.scheduler.arm_for(op.retry_count);
                tracing::debug!("next drain attempt in {:?}", delay);
            }
            None => self.scheduler.disarm(),
        }
    }

    fn emit(&self, event: SyncEvent) {
        // Nobody listening is fine.
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
