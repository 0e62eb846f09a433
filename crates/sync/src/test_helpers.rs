// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for sync tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use outbox_core::{Method, NewOperation, PendingOperation};

use crate::transport::{Transport, TransportError, TransportResult};

/// Scriptable transport that records every delivery attempt.
///
/// Results are served from a script in order; an exhausted script means
/// success. Clones share state, so a test can keep one clone while the
/// engine owns another.
#[derive(Clone, Default)]
pub struct MockTransport {
    script: Arc<Mutex<VecDeque<TransportResult<()>>>>,
    attempts: Arc<Mutex<Vec<PendingOperation>>>,
    /// Invoked after each attempt; used to flip connectivity mid-drain.
    on_deliver: Arc<Mutex<Option<Box<dyn FnMut() + Send>>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        MockTransport::default()
    }

    /// Scripts the result of the next unscripted delivery.
    pub fn push_result(&self, result: TransportResult<()>) {
        self.script.lock().unwrap().push_back(result);
    }

    /// Scripts `n` consecutive network failures.
    pub fn fail_next(&self, n: usize) {
        for _ in 0..n {
            self.push_result(Err(TransportError::Network("connection refused".into())));
        }
    }

    /// Every operation handed to `deliver`, in order.
    pub fn attempts(&self) -> Vec<PendingOperation> {
        self.attempts.lock().unwrap().clone()
    }

    /// Targets of every delivery attempt, in order.
    pub fn attempted_targets(&self) -> Vec<String> {
        self.attempts().into_iter().map(|op| op.target).collect()
    }

    /// Installs a hook that runs after each delivery attempt.
    pub fn set_on_deliver(&self, hook: impl FnMut() + Send + 'static) {
        *self.on_deliver.lock().unwrap() = Some(Box::new(hook));
    }
}

impl Transport for MockTransport {
    fn deliver<'a>(
        &'a mut self,
        op: &'a PendingOperation,
    ) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + 'a>> {
        Box::pin(async move {
            self.attempts.lock().unwrap().push(op.clone());
            let result = self.script.lock().unwrap().pop_front().unwrap_or(Ok(()));
            if let Some(hook) = self.on_deliver.lock().unwrap().as_mut() {
                hook();
            }
            result
        })
    }
}

/// POST operation against the given target.
pub fn make_op(target: &str) -> NewOperation {
    NewOperation::new(Method::Post, target)
}
