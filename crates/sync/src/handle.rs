// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Cloneable handle for driving the engine from host code.
//!
//! All queue mutations funnel through a single command channel into the
//! engine task, which serializes them against drain cycles. The handle is
//! cheap to clone and safe to share across tasks.

use chrono::{DateTime, Utc};
use outbox_core::{NewOperation, PendingOperation, QueueStats};
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::engine::{DrainOutcome, SyncEvent};

/// Error type for handle calls.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The engine task has stopped; no further requests can be served.
    #[error("sync engine stopped")]
    EngineStopped,

    /// The queue store failed to persist a mutation.
    #[error(transparent)]
    Store(#[from] outbox_core::Error),
}

/// Result type for handle calls.
pub type SyncResult<T> = Result<T, SyncError>;

/// Requests served by the engine task.
pub(crate) enum Command {
    Enqueue {
        op: NewOperation,
        reply: oneshot::Sender<outbox_core::Result<PendingOperation>>,
    },
    SyncNow {
        reply: oneshot::Sender<DrainOutcome>,
    },
    ListAll {
        reply: oneshot::Sender<Vec<PendingOperation>>,
    },
    Stats {
        reply: oneshot::Sender<QueueStats>,
    },
    LastSync {
        reply: oneshot::Sender<Option<DateTime<Utc>>>,
    },
    Clear {
        reply: oneshot::Sender<outbox_core::Result<()>>,
    },
}

/// Public surface of the queue for UI and other consumers.
#[derive(Debug, Clone)]
pub struct QueueHandle {
    pub(crate) commands: mpsc::Sender<Command>,
    pub(crate) events: broadcast::Sender<SyncEvent>,
}

impl QueueHandle {
    async fn request<R>(
        &self,
        make: impl FnOnce(oneshot::Sender<R>) -> Command,
    ) -> SyncResult<R> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(make(reply))
            .await
            .map_err(|_| SyncError::EngineStopped)?;
        rx.await.map_err(|_| SyncError::EngineStopped)
    }

    /// Admits an operation into the queue.
    ///
    /// The entry is persisted before this returns. When the monitor reports
    /// online, a drain is requested right away.
    pub async fn enqueue(&self, op: NewOperation) -> SyncResult<PendingOperation> {
        let admitted = self.request(|reply| Command::Enqueue { op, reply }).await?;
        Ok(admitted?)
    }

    /// Requests a drain cycle now, regardless of timers.
    pub async fn sync_now(&self) -> SyncResult<DrainOutcome> {
        self.request(|reply| Command::SyncNow { reply }).await
    }

    /// Snapshot of all queued operations in enqueue order.
    pub async fn list_all(&self) -> SyncResult<Vec<PendingOperation>> {
        self.request(|reply| Command::ListAll { reply }).await
    }

    /// Aggregate counts over the queue.
    pub async fn stats(&self) -> SyncResult<QueueStats> {
        self.request(|reply| Command::Stats { reply }).await
    }

    /// Timestamp of the last drain cycle that delivered something.
    pub async fn last_sync(&self) -> SyncResult<Option<DateTime<Utc>>> {
        self.request(|reply| Command::LastSync { reply }).await
    }

    /// Removes every queued operation (administrative reset).
    pub async fn clear(&self) -> SyncResult<()> {
        let cleared = self.request(|reply| Command::Clear { reply }).await?;
        Ok(cleared?)
    }

    /// Subscribes to sync events. A receiver sees events emitted after it
    /// subscribed; it never blocks the engine.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }
}
