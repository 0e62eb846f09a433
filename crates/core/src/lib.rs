// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! outbox-core: durable offline mutation queue.
//!
//! This crate provides the data model and storage layer for an offline-first
//! mutation queue: state-changing requests that cannot be delivered right
//! away are captured as [`PendingOperation`]s, persisted through a pluggable
//! key-value store, and replayed later by the sync engine in outbox-sync.

pub mod error;
pub mod kv;
pub mod op;
pub mod stats;
pub mod store;

pub use error::{Error, Result};
pub use kv::{FileStore, KeyValueStore, MemoryStore};
pub use op::{Method, NewOperation, OpId, PendingOperation};
pub use stats::QueueStats;
pub use store::{QueueStore, RetryOutcome, DEFAULT_MAX_RETRY};
