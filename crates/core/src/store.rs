// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Durable queue store owning the authoritative pending-operation list.
//!
//! The store keeps the list in memory and mirrors it into the key-value
//! collaborator as a JSON array. Every mutation serializes the new list and
//! persists it before the in-memory copy is swapped, so the two views never
//! diverge across a mutation boundary: a persistence failure leaves both
//! untouched and is surfaced to the caller.
//!
//! Delivery order is FIFO by enqueue time; retries do not reorder entries.

use chrono::Utc;

use crate::error::Result;
use crate::kv::KeyValueStore;
use crate::op::{NewOperation, OpId, PendingOperation};
use crate::stats::QueueStats;

/// Default retry budget: an entry failing this many deliveries is dropped.
pub const DEFAULT_MAX_RETRY: u32 = 3;

/// Key under which the pending-operation list is persisted.
const QUEUE_KEY: &str = "pending_operations";

/// Outcome of recording a failed delivery attempt against an entry.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryOutcome {
    /// Entry stays queued with an incremented retry count.
    Retained(PendingOperation),
    /// Entry reached the retry budget and was removed.
    Dropped(PendingOperation),
    /// No live entry with that id.
    Missing,
}

/// Ordered, persisted collection of pending operations.
pub struct QueueStore<S: KeyValueStore> {
    kv: S,
    ops: Vec<PendingOperation>,
    next_id: u64,
    max_retry: u32,
}

impl<S: KeyValueStore> QueueStore<S> {
    /// Opens the store with the default retry budget, loading any persisted
    /// snapshot.
    pub fn open(kv: S) -> Result<Self> {
        Self::with_max_retry(kv, DEFAULT_MAX_RETRY)
    }

    /// Opens the store with an explicit retry budget.
    ///
    /// Corrupt records in the persisted snapshot are discarded; the store
    /// starts from the largest valid subset. A snapshot that is not readable
    /// at all yields an empty queue. Neither case is fatal.
    pub fn with_max_retry(kv: S, max_retry: u32) -> Result<Self> {
        let ops = Self::load(&kv)?;
        let next_id = ops.iter().map(|op| op.id.0).max().map_or(1, |max| max + 1);
        Ok(QueueStore {
            kv,
            ops,
            next_id,
            max_retry,
        })
    }

    fn load(kv: &S) -> Result<Vec<PendingOperation>> {
        let Some(bytes) = kv.read(QUEUE_KEY)? else {
            return Ok(Vec::new());
        };

        let ops = match serde_json::from_slice::<Vec<PendingOperation>>(&bytes) {
            Ok(ops) => ops,
            Err(_) => Self::salvage(&bytes),
        };

        Ok(Self::dedupe(ops))
    }

    /// Recovers the valid entries from a snapshot that failed to parse as a
    /// whole. Unreadable records are dropped with a warning.
    fn salvage(bytes: &[u8]) -> Vec<PendingOperation> {
        let values: Vec<serde_json::Value> = match serde_json::from_slice(bytes) {
            Ok(values) => values,
            Err(e) => {
                tracing::warn!("queue snapshot unreadable, starting empty: {}", e);
                return Vec::new();
            }
        };

        let total = values.len();
        let ops: Vec<PendingOperation> = values
            .into_iter()
            .filter_map(|value| serde_json::from_value(value).ok())
            .collect();

        tracing::warn!(
            "discarded {} corrupt queue record(s), kept {}",
            total - ops.len(),
            ops.len()
        );
        ops
    }

    /// Drops later duplicates of an id, keeping the first occurrence.
    fn dedupe(ops: Vec<PendingOperation>) -> Vec<PendingOperation> {
        let mut seen = std::collections::HashSet::new();
        let mut unique = Vec::with_capacity(ops.len());
        for op in ops {
            if seen.insert(op.id) {
                unique.push(op);
            } else {
                tracing::warn!("discarded queue record with duplicate id {}", op.id);
            }
        }
        unique
    }

    fn persist(&mut self, ops: &[PendingOperation]) -> Result<()> {
        let bytes = serde_json::to_vec(ops)?;
        self.kv.write(QUEUE_KEY, &bytes)
    }

    /// Admits an operation at the end of the queue.
    ///
    /// Assigns the id and admission timestamp, persists the new list, and
    /// only then returns the admitted entry. A persistence failure leaves the
    /// queue unchanged and is returned to the caller.
    pub fn enqueue(&mut self, op: NewOperation) -> Result<PendingOperation> {
        let entry = PendingOperation::admit(OpId(self.next_id), op, Utc::now());

        let mut next = self.ops.clone();
        next.push(entry.clone());
        self.persist(&next)?;
        self.ops = next;
        self.next_id += 1;

        tracing::debug!("enqueued {} {} as {}", entry.method, entry.target, entry.id);
        Ok(entry)
    }

    /// Removes the entry with the given id. Removing an unknown id is a no-op.
    pub fn remove(&mut self, id: OpId) -> Result<()> {
        if !self.ops.iter().any(|op| op.id == id) {
            return Ok(());
        }

        let next: Vec<PendingOperation> =
            self.ops.iter().filter(|op| op.id != id).cloned().collect();
        self.persist(&next)?;
        self.ops = next;
        Ok(())
    }

    /// Records a failed delivery attempt against the entry with the given id.
    ///
    /// The retry count is incremented; an entry reaching the retry budget is
    /// removed instead and reported as [`RetryOutcome::Dropped`].
    pub fn increment_retry(&mut self, id: OpId) -> Result<RetryOutcome> {
        let Some(pos) = self.ops.iter().position(|op| op.id == id) else {
            return Ok(RetryOutcome::Missing);
        };

        let mut entry = self.ops[pos].clone();
        entry.retry_count += 1;

        let mut next = self.ops.clone();
        if entry.retry_count >= self.max_retry {
            next.remove(pos);
            self.persist(&next)?;
            self.ops = next;
            tracing::warn!(
                "dropping operation {} after {} failed attempts",
                entry.id,
                entry.retry_count
            );
            Ok(RetryOutcome::Dropped(entry))
        } else {
            next[pos] = entry.clone();
            self.persist(&next)?;
            self.ops = next;
            Ok(RetryOutcome::Retained(entry))
        }
    }

    /// Removes all entries.
    pub fn clear(&mut self) -> Result<()> {
        self.persist(&[])?;
        self.ops.clear();
        Ok(())
    }

    /// Returns a snapshot of all entries in enqueue order.
    pub fn list_all(&self) -> Vec<PendingOperation> {
        self.ops.clone()
    }

    /// Returns the oldest entry, if any. Backoff is keyed off its retry count.
    pub fn oldest(&self) -> Option<&PendingOperation> {
        self.ops.first()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// The retry budget this store enforces.
    pub fn max_retry(&self) -> u32 {
        self.max_retry
    }

    /// Aggregate counts over the live entries.
    pub fn stats(&self) -> QueueStats {
        QueueStats::from_ops(&self.ops)
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
