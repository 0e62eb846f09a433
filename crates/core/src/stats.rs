// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Read-only aggregation over the queue for status displays.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::op::{Method, PendingOperation};

/// Aggregate counts over the live queue entries.
///
/// There is no `failed` bucket: an entry that exhausts its retry budget is
/// removed from the store and reported through the dropped-operation event,
/// so it never appears in these counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStats {
    /// Total number of live entries.
    pub total: usize,
    /// Entries that have not yet failed a delivery attempt.
    pub pending: usize,
    /// Entries with at least one failed attempt, awaiting another.
    pub retrying: usize,
    /// Entry counts per request method.
    pub by_method: BTreeMap<Method, usize>,
}

impl QueueStats {
    /// Computes counts over a snapshot of entries.
    pub fn from_ops(ops: &[PendingOperation]) -> Self {
        let mut stats = QueueStats {
            total: ops.len(),
            ..QueueStats::default()
        };

        for op in ops {
            if op.retry_count == 0 {
                stats.pending += 1;
            } else {
                stats.retrying += 1;
            }
            *stats.by_method.entry(op.method).or_insert(0) += 1;
        }

        stats
    }
}

#[cfg(test)]
#[path = "stats_tests.rs"]
mod tests;
