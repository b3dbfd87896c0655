// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Outbound relay toward the messaging provider.
//!
//! The gateway calls through the [`MessageRelay`] trait so the submission
//! path can be tested without a live provider. [`TelegramRelay`] is the
//! production implementation: one `sendMessage` call per accepted
//! submission, no retries, no durable queueing. A failed delivery is
//! surfaced to the caller and the submission is gone.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

/// Relay failure.
#[derive(Debug, Error, Clone)]
pub enum RelayError {
    /// The provider answered with a non-success status.
    #[error("Telegram API error: {0}")]
    Upstream(String),

    /// The provider could not be reached at all.
    #[error("Telegram API unreachable: {0}")]
    Transport(String),
}

/// An accepted contact-form submission, ready to deliver.
#[derive(Debug, Clone)]
pub struct Submission {
    pub name: String,
    pub email: String,
    pub message: String,
}

impl Submission {
    /// Human-readable notification text sent to the provider.
    pub fn format_text(&self) -> String {
        format!(
            "📩 New Message:\n\n👤 Name: {}\n✉️ Email: {}\n📝 Message:\n {}",
            self.name, self.email, self.message
        )
    }
}

/// Delivery seam for accepted submissions.
#[async_trait]
pub trait MessageRelay: Send + Sync {
    /// Deliver one submission. Exactly one attempt; errors propagate.
    async fn deliver(&self, submission: &Submission) -> Result<(), RelayError>;
}

#[derive(Serialize)]
struct SendMessageBody<'a> {
    chat_id: &'a str,
    text: String,
}

/// Telegram bot API relay.
pub struct TelegramRelay {
    client: reqwest::Client,
    endpoint: String,
    chat_id: String,
}

impl TelegramRelay {
    /// Create a relay for the given bot. `api_base` is normally
    /// `https://api.telegram.org`; tests point it at a local server.
    pub fn new(client: reqwest::Client, api_base: &str, bot_token: &str, chat_id: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}/bot{}/sendMessage", api_base.trim_end_matches('/'), bot_token),
            chat_id: chat_id.to_string(),
        }
    }
}

#[async_trait]
impl MessageRelay for TelegramRelay {
    async fn deliver(&self, submission: &Submission) -> Result<(), RelayError> {
        let body = SendMessageBody {
            chat_id: &self.chat_id,
            text: submission.format_text(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Telegram API unreachable");
                RelayError::Transport(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            // Telegram reports the failure reason in a `description` field.
            let description = response
                .json::<serde_json::Value>()
                .await
                .ok()
                .and_then(|v| {
                    v.get("description")
                        .and_then(|d| d.as_str())
                        .map(str::to_string)
                })
                .unwrap_or_else(|| format!("HTTP {}", status));
            warn!(status = %status, description = %description, "Telegram relay failed");
            return Err(RelayError::Upstream(description));
        }

        debug!("Submission relayed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_text() {
        let submission = Submission {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            message: "Hello there".to_string(),
        };
        assert_eq!(
            submission.format_text(),
            "📩 New Message:\n\n👤 Name: Ada\n✉️ Email: ada@example.com\n📝 Message:\n Hello there"
        );
    }

    #[test]
    fn test_endpoint_construction() {
        let relay = TelegramRelay::new(
            reqwest::Client::new(),
            "https://api.telegram.org/",
            "123:abc",
            "-100200",
        );
        assert_eq!(
            relay.endpoint,
            "https://api.telegram.org/bot123:abc/sendMessage"
        );
        assert_eq!(relay.chat_id, "-100200");
    }
}
