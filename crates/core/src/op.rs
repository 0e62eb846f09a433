// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Pending operations: mutating requests captured for deferred delivery.
//!
//! A caller describes a request as a [`NewOperation`]; admission into the
//! queue turns it into a [`PendingOperation`] with a stable id, an admission
//! timestamp, and a retry counter. Field names in the persisted form are
//! camelCase (`enqueuedAt`, `retryCount`) so snapshots written by earlier
//! hosts remain readable.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Unique identifier for a queued operation.
///
/// Assigned at enqueue time and stable for the operation's lifetime. Ids are
/// unique across all live entries; an id is only reused after every entry
/// carrying a higher or equal id has left the queue and the process restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OpId(pub u64);

impl fmt::Display for OpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Method of a mutating request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl Method {
    /// All methods, in a fixed order (used by stats aggregation).
    pub const ALL: [Method; 5] = [
        Method::Get,
        Method::Post,
        Method::Put,
        Method::Delete,
        Method::Patch,
    ];

    /// Returns the wire representation of this method.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            "PATCH" => Ok(Method::Patch),
            other => Err(Error::InvalidMethod(other.to_string())),
        }
    }
}

/// A mutating request as described by the caller, before admission.
///
/// The target is opaque to the queue; it is handed to the transport verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOperation {
    pub method: Method,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,
}

impl NewOperation {
    /// Creates a new operation description with no payload or headers.
    pub fn new(method: Method, target: impl Into<String>) -> Self {
        NewOperation {
            method,
            target: target.into(),
            payload: None,
            headers: None,
        }
    }

    /// Sets the request body.
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Adds a request header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(HashMap::new)
            .insert(name.into(), value.into());
        self
    }
}

/// A queued mutating request awaiting successful delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingOperation {
    /// Unique identifier, assigned at enqueue time.
    pub id: OpId,
    /// Request method.
    pub method: Method,
    /// Destination address (URL or resource path), opaque to the queue.
    pub target: String,
    /// Optional request body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    /// Optional request headers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,
    /// Timestamp of first admission into the queue.
    pub enqueued_at: DateTime<Utc>,
    /// Number of failed delivery attempts so far.
    pub retry_count: u32,
}

impl PendingOperation {
    /// Admits a caller-described operation into the queue.
    pub(crate) fn admit(id: OpId, op: NewOperation, enqueued_at: DateTime<Utc>) -> Self {
        PendingOperation {
            id,
            method: op.method,
            target: op.target,
            payload: op.payload,
            headers: op.headers,
            enqueued_at,
            retry_count: 0,
        }
    }
}

#[cfg(test)]
#[path = "op_tests.rs"]
mod tests;
