// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Fixed-window rate limiter for contact-form submissions.
//!
//! One counter per (client, window) pair, stored in a shared
//! [`CounterStore`] with a TTL equal to the window length, so the store
//! garbage-collects stale counters on its own. The read-then-write in
//! [`RateLimiter::admit`] is deliberately non-atomic: the store exposes no
//! increment-and-fetch, and concurrent checks for the same client may each
//! read the same count and both be admitted near the limit. The guarantee
//! is approximately `max_requests_per_window` per client per window, with
//! over-admission bounded by the number of concurrent racers.

use crate::config::RateLimitConfig;
use crate::store::{CounterKey, CounterStore, StoreError};
use crate::window;
use std::sync::Arc;
use tracing::{debug, trace};

/// Result of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Request may proceed; the counter for the current window has been
    /// incremented and its TTL re-armed.
    Allowed,
    /// Request must be rejected. `retry_after_secs` is the time until the
    /// current window ends, always in `(0, window_secs]`.
    Denied { retry_after_secs: u64 },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }
}

/// Admission control over a shared counter store.
pub struct RateLimiter {
    config: RateLimitConfig,
    store: Arc<dyn CounterStore>,
}

impl RateLimiter {
    /// Create a limiter with the given policy and counter backend.
    pub fn new(config: RateLimitConfig, store: Arc<dyn CounterStore>) -> Self {
        Self { config, store }
    }

    /// Decide whether the request from `client_id` at `now` (Unix seconds)
    /// is admitted, recording it against the current window if so.
    ///
    /// Denied probes perform no write: they neither push the count past
    /// the limit nor re-arm the counter's TTL, so hammering a closed
    /// window cannot extend it.
    pub async fn admit(&self, client_id: &str, now: u64) -> Result<Decision, StoreError> {
        let window_secs = self.config.window_secs;
        let key = CounterKey::new(client_id, window::window_index(now, window_secs));

        let current = self.store.get(&key).await?.unwrap_or(0);
        trace!(key = %key, current, "Checking rate limit");

        if current >= self.config.max_requests_per_window {
            let (_, window_end) = window::window_bounds(now, window_secs);
            let retry_after_secs = window_end - now;
            debug!(
                key = %key,
                current,
                retry_after_secs,
                "Rate limit exceeded"
            );
            return Ok(Decision::Denied { retry_after_secs });
        }

        self.store.put(&key, current + 1, window_secs).await?;
        Ok(Decision::Allowed)
    }
}
