// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the contact gateway.
//!
//! Policy values (window length, per-window request cap) are fixed at
//! deploy time and passed explicitly into the limiter, never read from
//! ambient global state, so the limiter stays testable with arbitrary
//! policies and injected clocks.

use serde::{Deserialize, Serialize};

/// Top-level service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Header carrying the client's forwarded address (default: CF-Connecting-IP).
    /// Requests without it share the `"unknown"` bucket.
    #[serde(default = "default_forwarded_ip_header")]
    pub forwarded_ip_header: String,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Validation configuration
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Outbound relay configuration
    #[serde(default)]
    pub relay: RelayConfig,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Fixed-window rate limiting policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Whether admission control is applied at all (default: true).
    /// Disabling it removes the layer rather than short-circuiting checks.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Maximum admitted requests per client per window (default: 3)
    #[serde(default = "default_max_requests")]
    pub max_requests_per_window: u64,

    /// Window length in seconds (default: 120)
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

/// Validation thresholds for the submission payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Minimum name length in characters (default: 2)
    #[serde(default = "default_min_name_len")]
    pub min_name_len: usize,

    /// Minimum message length in characters (default: 5)
    #[serde(default = "default_min_message_len")]
    pub min_message_len: usize,
}

/// Outbound messaging relay (Telegram bot API).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// API base URL (default: https://api.telegram.org)
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Bot token. No default; must be supplied at deploy time.
    #[serde(default)]
    pub bot_token: String,

    /// Destination chat identifier. No default; must be supplied at deploy time.
    #[serde(default)]
    pub chat_id: String,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable Prometheus metrics endpoint (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics endpoint path (default: /metrics)
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

// Default value functions
fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_forwarded_ip_header() -> String {
    "CF-Connecting-IP".to_string()
}

fn default_max_requests() -> u64 {
    3
}

fn default_window_secs() -> u64 {
    120 // 2 minutes
}

fn default_min_name_len() -> usize {
    2
}

fn default_min_message_len() -> usize {
    5
}

fn default_api_base() -> String {
    "https://api.telegram.org".to_string()
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            forwarded_ip_header: default_forwarded_ip_header(),
            rate_limit: RateLimitConfig::default(),
            validation: ValidationConfig::default(),
            relay: RelayConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            max_requests_per_window: default_max_requests(),
            window_secs: default_window_secs(),
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_name_len: default_min_name_len(),
            min_message_len: default_min_message_len(),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            bot_token: String::new(),
            chat_id: String::new(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            path: default_metrics_path(),
        }
    }
}
