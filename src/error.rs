// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Error types for the contact gateway.
//!
//! Every failure on the submission path maps to a structured JSON response;
//! nothing is swallowed and nothing is retried internally. Counter-store
//! outage fails closed: admission cannot be checked, so the request is
//! rejected with a server error rather than waved through.

use crate::relay::RelayError;
use crate::store::StoreError;
use crate::validator::ValidationError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Gateway error taxonomy.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Submission payload failed shape validation (400).
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Client exhausted its window quota (429).
    #[error("Rate limit exceeded. Please try again later.")]
    RateLimited { retry_after_secs: u64 },

    /// Counter store unreachable (500).
    #[error("{0}")]
    Store(#[from] StoreError),

    /// Messaging provider rejected or failed the relay (500).
    #[error("{0}")]
    Upstream(#[from] RelayError),
}

/// JSON error body. `timeout` is only present on rate-limit rejections.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Validation(_) => StatusCode::BAD_REQUEST,
            GatewayError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::Store(_) | GatewayError::Upstream(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            GatewayError::RateLimited { retry_after_secs } => ErrorResponse {
                message: self.to_string(),
                timeout: Some(*retry_after_secs),
            },
            GatewayError::Store(_) | GatewayError::Upstream(_) => ErrorResponse {
                message: format!("Server error: {}", self),
                timeout: None,
            },
            _ => ErrorResponse {
                message: self.to_string(),
                timeout: None,
            },
        };
        (status, Json(body)).into_response()
    }
}
