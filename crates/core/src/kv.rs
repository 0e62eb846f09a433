// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Durable key-value collaborators for queue persistence.
//!
//! The queue store serializes its pending-operation list as a single value
//! under one key; this module defines the storage contract and two
//! implementations: an fsync'd file-per-key store for production use and an
//! in-memory store for tests and hosts without a durable medium.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Durable key-value storage contract.
///
/// Keys are short identifiers chosen by the queue store; implementations may
/// assume they contain no path separators.
pub trait KeyValueStore: Send {
    /// Reads the value stored under `key`, or `None` if absent.
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// The value must be durable when this returns.
    fn write(&mut self, key: &str, value: &[u8]) -> Result<()>;

    /// Removes the value stored under `key`. Removing an absent key is a no-op.
    fn delete(&mut self, key: &str) -> Result<()>;
}

/// File-backed store keeping one file per key under a root directory.
///
/// Writes go to a temporary file which is fsynced and then renamed over the
/// target, so a crash mid-write leaves the previous value intact.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Opens a store rooted at `root`, creating the directory if needed.
    pub fn open(root: &Path) -> Result<Self> {
        fs::create_dir_all(root)?;
        Ok(FileStore {
            root: root.to_path_buf(),
        })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

impl KeyValueStore for FileStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&mut self, key: &str, value: &[u8]) -> Result<()> {
        let tmp = self.root.join(format!("{}.tmp", key));
        let mut file = File::create(&tmp)?;
        file.write_all(value)?;
        file.sync_all()?;
        fs::rename(&tmp, self.path_for(key))?;
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory store. Not durable; useful for tests and ephemeral hosts.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, Vec<u8>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        MemoryStore::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &[u8]) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
#[path = "kv_tests.rs"]
mod tests;
