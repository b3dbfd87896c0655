// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Counter storage for the rate limiter.
//!
//! The limiter talks to a shared key-value store through the
//! [`CounterStore`] trait: plain `get`/`put` with a per-key TTL, no atomic
//! increment. The store may sit behind a network and may be replicated
//! with propagation delay, so both operations are fallible and reads can
//! briefly lag writes. [`MemoryStore`] is the bundled backend for
//! single-node deployments and tests; a replicated KV backend plugs in
//! behind the same trait.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::trace;

/// Errors surfaced by a counter store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The underlying store could not be reached. Calls fail fast; the
    /// limiter never retries internally.
    #[error("counter store unavailable: {0}")]
    Unavailable(String),
}

/// Key for one rate-limit counter: a client identifier plus the index of
/// the fixed window the counter belongs to. Distinct windows for the same
/// client are distinct, independent counters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CounterKey {
    pub client_id: String,
    pub window_index: u64,
}

impl CounterKey {
    pub fn new(client_id: impl Into<String>, window_index: u64) -> Self {
        Self {
            client_id: client_id.into(),
            window_index,
        }
    }
}

impl fmt::Display for CounterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rate:{}:{}", self.client_id, self.window_index)
    }
}

/// Shared counter storage with per-key TTL.
///
/// `get` and `put` are independent, non-atomic operations. An absent key
/// must be treated by callers as a count of zero.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Read the counter for `key`, or `None` if no record exists.
    async fn get(&self, key: &CounterKey) -> Result<Option<u64>, StoreError>;

    /// Unconditionally overwrite the counter for `key`, (re)arming its TTL
    /// to `ttl_secs` from now.
    async fn put(&self, key: &CounterKey, value: u64, ttl_secs: u64) -> Result<(), StoreError>;
}

struct Entry {
    value: u64,
    expires_at: Instant,
}

/// In-process [`CounterStore`] backend.
///
/// Entries expire lazily on read; [`MemoryStore::sweep`] removes expired
/// entries outright and is intended to be driven by a periodic task.
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Drop all expired entries. Called periodically so counters for idle
    /// clients do not accumulate.
    pub async fn sweep(&self) {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| e.expires_at > now);
        let removed = before - entries.len();
        if removed > 0 {
            trace!(removed, remaining = entries.len(), "Swept expired counters");
        }
    }

    /// Number of live (non-expired) entries.
    pub async fn live_entries(&self) -> usize {
        let now = Instant::now();
        let entries = self.entries.read().await;
        entries.values().filter(|e| e.expires_at > now).count()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CounterStore for MemoryStore {
    async fn get(&self, key: &CounterKey) -> Result<Option<u64>, StoreError> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(&key.to_string())
            .filter(|e| e.expires_at > Instant::now())
            .map(|e| e.value))
    }

    async fn put(&self, key: &CounterKey, value: u64, ttl_secs: u64) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + Duration::from_secs(ttl_secs),
            },
        );
        Ok(())
    }
}
