// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Contact Gateway
//!
//! This crate provides an edge-deployed ingress gateway for contact-form
//! submissions:
//!
//! - Fixed-window admission control per client address (3 requests per
//!   120 s default), backed by a shared TTL key-value counter store
//! - Payload shape validation (name, email, message)
//! - One-shot relay of accepted submissions to a Telegram bot endpoint
//! - Permissive CORS for browser-hosted forms
//!
//! The counter store exposes plain `get`/`put` with no atomic increment,
//! so the admission check tolerates a bounded read-then-write race rather
//! than relying on a distributed lock; its guarantee is approximately N
//! requests per window per client.

pub mod config;
pub mod error;
pub mod handlers;
pub mod limiter;
pub mod metrics;
pub mod relay;
pub mod store;
pub mod validator;
pub mod window;

pub use config::Config;
pub use error::GatewayError;
pub use limiter::{Decision, RateLimiter};
pub use relay::{MessageRelay, Submission, TelegramRelay};
pub use store::{CounterKey, CounterStore, MemoryStore, StoreError};
pub use validator::{SubmissionValidator, ValidationResult};
