// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Fixed-window time math.
//!
//! Time is partitioned into equal, non-overlapping intervals of
//! `window_secs` seconds. A window is a derived value, never stored:
//! everything is computed from the current Unix timestamp.

/// Index of the fixed window containing `now`.
///
/// `now` is seconds since the Unix epoch, `window_secs` must be positive.
/// Monotonic in `now`: a later instant never maps to an earlier window.
pub fn window_index(now: u64, window_secs: u64) -> u64 {
    now / window_secs
}

/// Half-open bounds `[start, end)` of the window containing `now`.
pub fn window_bounds(now: u64, window_secs: u64) -> (u64, u64) {
    let start = window_index(now, window_secs) * window_secs;
    (start, start + window_secs)
}
