// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Prometheus metrics for the gateway.

use prometheus::{Encoder, IntCounter, Registry, TextEncoder};

/// Counters held in application state and served from the metrics endpoint.
pub struct Metrics {
    registry: Registry,
    pub submissions_total: IntCounter,
    pub relayed_total: IntCounter,
    pub rate_limited_total: IntCounter,
    pub validation_failed_total: IntCounter,
    pub store_errors_total: IntCounter,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let submissions_total = IntCounter::new(
            "contact_gateway_submissions_total",
            "Contact form submissions received",
        )
        .unwrap();
        let relayed_total = IntCounter::new(
            "contact_gateway_relayed_total",
            "Submissions successfully relayed upstream",
        )
        .unwrap();
        let rate_limited_total = IntCounter::new(
            "contact_gateway_rate_limited_total",
            "Submissions rejected by admission control",
        )
        .unwrap();
        let validation_failed_total = IntCounter::new(
            "contact_gateway_validation_failed_total",
            "Submissions rejected by payload validation",
        )
        .unwrap();
        let store_errors_total = IntCounter::new(
            "contact_gateway_store_errors_total",
            "Counter store failures on the admission path",
        )
        .unwrap();

        for c in [
            &submissions_total,
            &relayed_total,
            &rate_limited_total,
            &validation_failed_total,
            &store_errors_total,
        ] {
            registry.register(Box::new(c.clone())).unwrap();
        }

        Self {
            registry,
            submissions_total,
            relayed_total,
            rate_limited_total,
            validation_failed_total,
            store_errors_total,
        }
    }

    /// Render all registered metrics in the Prometheus text format.
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let mut buf = Vec::new();
        // Encoding into a Vec cannot fail for the text encoder.
        encoder
            .encode(&self.registry.gather(), &mut buf)
            .unwrap_or_default();
        String::from_utf8(buf).unwrap_or_default()
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_includes_counters() {
        let metrics = Metrics::new();
        metrics.submissions_total.inc();
        metrics.rate_limited_total.inc_by(2);

        let rendered = metrics.render();
        assert!(rendered.contains("contact_gateway_submissions_total 1"));
        assert!(rendered.contains("contact_gateway_rate_limited_total 2"));
    }
}
