// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Transport abstraction for delivering queued operations.
//!
//! The engine never talks to a backend directly; the host injects a
//! [`Transport`] wrapping its HTTP client (or a mock in tests). Any error is
//! a failed attempt — the engine does not distinguish a network fault from a
//! non-2xx response.

use std::future::Future;
use std::pin::Pin;

use outbox_core::PendingOperation;

/// Error type for delivery attempts.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// The request never reached the backend.
    #[error("network error: {0}")]
    Network(String),

    /// The backend answered with a non-success status.
    #[error("rejected with status {0}")]
    Rejected(u16),
}

/// Result type for delivery attempts.
pub type TransportResult<T> = Result<T, TransportError>;

/// Delivery collaborator for queued operations.
pub trait Transport: Send {
    /// Attempts to deliver one operation to its target.
    fn deliver<'a>(
        &'a mut self,
        op: &'a PendingOperation,
    ) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + 'a>>;
}
