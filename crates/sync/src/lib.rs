// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! outbox-sync: replay engine for the offline mutation queue.
//!
//! Drains the durable queue from outbox-core against an injected transport
//! once connectivity returns, with exponential backoff between attempts.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐ commands ┌──────────────┐ deliver ┌──────────────┐
//! │ QueueHandle  │─────────►│  SyncEngine  │────────►│  Transport   │
//! │  (cloneable) │◄─────────│  (run loop)  │◄────────│   (trait)    │
//! └──────────────┘  events  └──────┬───────┘         └──────────────┘
//!                                  │
//!                    ┌─────────────┼─────────────┐
//!                    ▼             ▼             ▼
//!             ┌────────────┐┌────────────┐┌────────────┐
//!             │Connectivity││   Retry    ││ QueueStore │
//!             │  Monitor   ││ Scheduler  ││ (durable)  │
//!             └────────────┘└────────────┘└────────────┘
//! ```
//!
//! # Features
//!
//! - Single-flight FIFO drain cycles against an injectable transport
//! - Edge-triggered connectivity monitor (online/offline transitions)
//! - Exponential backoff with ceiling, one armed timer at a time
//! - Broadcast events: sync completed, sync failed, operation dropped
//! - Cloneable actor-style handle serializing all queue mutations

pub mod connectivity;
pub mod engine;
pub mod handle;
pub mod scheduler;
pub mod transport;

pub use connectivity::ConnectivityMonitor;
pub use engine::{DrainOutcome, DrainState, SyncConfig, SyncEngine, SyncEvent};
pub use handle::{QueueHandle, SyncError, SyncResult};
pub use scheduler::{BackoffPolicy, RetryScheduler, BASE_DELAY, MAX_DELAY};
pub use transport::{Transport, TransportError, TransportResult};

// The queue surface consumers need alongside the engine.
pub use outbox_core::{Method, NewOperation, OpId, PendingOperation, QueueStats, QueueStore};

#[cfg(test)]
mod test_helpers;
