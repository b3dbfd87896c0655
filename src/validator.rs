// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Contact submission validator.
//!
//! Shape checks only: minimum name and message lengths plus a plausible
//! email address. All failing fields are collected and reported together
//! so the caller can fix the whole payload in one round trip.

use crate::config::ValidationConfig;
use thiserror::Error;
use tracing::debug;

/// Validation failure covering one or more payload fields.
///
/// Renders as `"name: Name must be at least 2 characters.; email: ..."`,
/// one entry per failing field.
#[derive(Debug, Error, Clone)]
#[error("{}", .errors.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
}

/// A single per-field validation failure.
#[derive(Debug, Error, Clone)]
#[error("{field}: {message}")]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Result of validation.
#[derive(Debug, Clone)]
pub enum ValidationResult {
    /// Payload is valid
    Valid,
    /// Payload is invalid
    Invalid(ValidationError),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }

    pub fn error(&self) -> Option<&ValidationError> {
        match self {
            ValidationResult::Valid => None,
            ValidationResult::Invalid(e) => Some(e),
        }
    }
}

/// Contact submission validator.
pub struct SubmissionValidator {
    config: ValidationConfig,
}

impl SubmissionValidator {
    /// Create a new validator with the given configuration.
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Validate a complete submission, collecting every failing field.
    pub fn validate(&self, name: &str, email: &str, message: &str) -> ValidationResult {
        let mut errors = Vec::new();

        if name.chars().count() < self.config.min_name_len {
            errors.push(FieldError {
                field: "name",
                message: format!(
                    "Name must be at least {} characters.",
                    self.config.min_name_len
                ),
            });
        }

        if !is_plausible_email(email) {
            errors.push(FieldError {
                field: "email",
                message: "Invalid email format.".to_string(),
            });
        }

        if message.chars().count() < self.config.min_message_len {
            errors.push(FieldError {
                field: "message",
                message: format!(
                    "Message must be at least {} characters.",
                    self.config.min_message_len
                ),
            });
        }

        if errors.is_empty() {
            ValidationResult::Valid
        } else {
            debug!(failing_fields = errors.len(), "Submission validation failed");
            ValidationResult::Invalid(ValidationError { errors })
        }
    }
}

/// Conservative address-shape check: exactly one `@`, a non-empty local
/// part, a dotted domain with non-empty labels, and no whitespace.
fn is_plausible_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let mut parts = email.splitn(2, '@');
    let (local, domain) = match (parts.next(), parts.next()) {
        (Some(l), Some(d)) => (l, d),
        _ => return false,
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    domain.contains('.') && domain.split('.').all(|label| !label.is_empty())
}
