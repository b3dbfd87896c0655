// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP surface of the contact gateway.
//!
//! One submission route behind an admission-control middleware, plus
//! health and metrics endpoints. Admission is a composable layer: the
//! router applies it only when `rate_limit.enabled` is set, instead of
//! shipping separate gateway variants with and without rate limiting.

use crate::config::Config;
use crate::error::GatewayError;
use crate::limiter::{Decision, RateLimiter};
use crate::metrics::Metrics;
use crate::relay::{MessageRelay, Submission};
use crate::validator::{SubmissionValidator, ValidationResult};
use axum::{
    extract::{Request, State},
    http::{header, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info, warn};

/// Identifier used when the forwarded-address header is missing. All
/// unidentified clients share this one bucket; that is the documented
/// policy tradeoff, not an oversight.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Wall-clock source for the admission middleware, in Unix seconds.
/// Injectable so tests can pin time the same way the limiter takes `now`
/// as a parameter.
pub type Clock = Arc<dyn Fn() -> u64 + Send + Sync>;

/// Clock reading the actual wall time.
pub fn wall_clock() -> Clock {
    Arc::new(|| Utc::now().timestamp().max(0) as u64)
}

/// Shared application state.
pub struct AppState {
    pub limiter: RateLimiter,
    pub validator: SubmissionValidator,
    pub relay: Arc<dyn MessageRelay>,
    pub metrics: Metrics,
    pub config: Config,
    pub clock: Clock,
}

/// Inbound contact-form payload.
#[derive(Debug, Deserialize)]
pub struct ContactRequest {
    pub name: String,
    pub email: String,
    pub message: String,
}

/// Success / status message body.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Build the gateway router for the given state.
pub fn router(state: Arc<AppState>) -> Router {
    let mut submit_route = post(submit).fallback(method_not_allowed);
    // Admission control is opt-out; without it the gateway is just
    // validation + relay.
    if state.config.rate_limit.enabled {
        submit_route = submit_route.route_layer(middleware::from_fn_with_state(
            state.clone(),
            admission,
        ));
    }

    let mut router = Router::new()
        .route("/", submit_route)
        .route("/health", get(health));

    if state.config.metrics.enabled {
        router = router.route(&state.config.metrics.path, get(metrics));
    }

    router.layer(cors()).with_state(state)
}

/// Permissive CORS for browser-hosted forms. The layer answers preflight
/// OPTIONS requests itself with no body; actual responses carry the
/// allow-origin header.
fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "contact-gateway",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Prometheus metrics endpoint.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
        .into_response()
}

/// JSON 405 for non-POST requests on the submission route. Preflight
/// OPTIONS never reaches here; the CORS layer answers it directly.
pub async fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(MessageResponse {
            message: "Method not allowed".to_string(),
        }),
    )
        .into_response()
}

/// Admission-control middleware.
///
/// Runs before body parsing and validation, so a throttled client costs
/// nothing downstream. A store outage fails closed: with no way
/// to check the quota the request is rejected, not waved through.
pub async fn admission(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, GatewayError> {
    let client_id = request
        .headers()
        .get(state.config.forwarded_ip_header.as_str())
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(UNKNOWN_CLIENT)
        .to_string();

    let now = (state.clock)();

    match state.limiter.admit(&client_id, now).await {
        Ok(Decision::Allowed) => Ok(next.run(request).await),
        Ok(Decision::Denied { retry_after_secs }) => {
            state.metrics.rate_limited_total.inc();
            info!(client = %client_id, retry_after_secs, "Submission rate limited");
            Err(GatewayError::RateLimited { retry_after_secs })
        }
        Err(e) => {
            state.metrics.store_errors_total.inc();
            warn!(client = %client_id, error = %e, "Counter store failure, failing closed");
            Err(GatewayError::Store(e))
        }
    }
}

/// Accept a contact-form submission: validate the payload shape and relay
/// it to the messaging provider.
pub async fn submit(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ContactRequest>,
) -> Result<Json<MessageResponse>, GatewayError> {
    state.metrics.submissions_total.inc();

    if let ValidationResult::Invalid(err) =
        state
            .validator
            .validate(&payload.name, &payload.email, &payload.message)
    {
        state.metrics.validation_failed_total.inc();
        info!(error = %err, "Submission validation failed");
        return Err(GatewayError::Validation(err));
    }

    let submission = Submission {
        name: payload.name,
        email: payload.email,
        message: payload.message,
    };

    state.relay.deliver(&submission).await?;
    state.metrics.relayed_total.inc();
    debug!("Submission accepted and relayed");

    Ok(Json(MessageResponse {
        message: "Message sent successfully!".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RateLimitConfig;
    use crate::relay::RelayError;
    use crate::store::{CounterKey, CounterStore, MemoryStore, StoreError};
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request as HttpRequest};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    struct RecordingRelay {
        delivered: AtomicUsize,
        fail_with: Option<RelayError>,
    }

    impl RecordingRelay {
        fn ok() -> Self {
            Self {
                delivered: AtomicUsize::new(0),
                fail_with: None,
            }
        }

        fn failing(err: RelayError) -> Self {
            Self {
                delivered: AtomicUsize::new(0),
                fail_with: Some(err),
            }
        }
    }

    #[async_trait]
    impl MessageRelay for RecordingRelay {
        async fn deliver(&self, _submission: &Submission) -> Result<(), RelayError> {
            if let Some(err) = &self.fail_with {
                return Err(err.clone());
            }
            self.delivered.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl CounterStore for BrokenStore {
        async fn get(&self, _key: &CounterKey) -> Result<Option<u64>, StoreError> {
            Err(StoreError::Unavailable("kv offline".to_string()))
        }

        async fn put(&self, _key: &CounterKey, _v: u64, _ttl: u64) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("kv offline".to_string()))
        }
    }

    /// Instant the test clock is pinned to: 40 s into window
    /// [6_960, 7_080) for the default 120 s policy.
    const TEST_NOW: u64 = 7_000;

    fn test_state(relay: Arc<dyn MessageRelay>, store: Arc<dyn CounterStore>) -> Arc<AppState> {
        let config = Config {
            rate_limit: RateLimitConfig {
                enabled: true,
                max_requests_per_window: 3,
                window_secs: 120,
            },
            ..Default::default()
        };
        Arc::new(AppState {
            limiter: RateLimiter::new(config.rate_limit.clone(), store),
            validator: SubmissionValidator::new(config.validation.clone()),
            relay,
            metrics: Metrics::new(),
            config,
            clock: Arc::new(|| TEST_NOW),
        })
    }

    fn submission_request(ip: Option<&str>, body: Value) -> HttpRequest<Body> {
        let mut builder = HttpRequest::builder()
            .method(Method::POST)
            .uri("/")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(ip) = ip {
            builder = builder.header("CF-Connecting-IP", ip);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn valid_payload() -> Value {
        json!({"name": "Ada", "email": "ada@example.com", "message": "Hello there"})
    }

    #[tokio::test]
    async fn test_valid_submission_relayed() {
        let relay = Arc::new(RecordingRelay::ok());
        let state = test_state(relay.clone(), Arc::new(MemoryStore::new()));
        let app = router(state);

        let response = app
            .oneshot(submission_request(Some("1.2.3.4"), valid_payload()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Message sent successfully!");
        assert_eq!(relay.delivered.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalid_payload_is_400() {
        let state = test_state(Arc::new(RecordingRelay::ok()), Arc::new(MemoryStore::new()));
        let app = router(state);

        let payload = json!({"name": "A", "email": "nope", "message": "Hi"});
        let response = app
            .oneshot(submission_request(Some("1.2.3.4"), payload))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        let message = body["message"].as_str().unwrap();
        assert!(message.starts_with("Validation failed: "));
        assert!(message.contains("email: Invalid email format."));
    }

    #[tokio::test]
    async fn test_quota_exhaustion_returns_429_with_timeout() {
        let state = test_state(Arc::new(RecordingRelay::ok()), Arc::new(MemoryStore::new()));
        let app = router(state);

        for _ in 0..3 {
            let response = app
                .clone()
                .oneshot(submission_request(Some("9.9.9.9"), valid_payload()))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = app
            .oneshot(submission_request(Some("9.9.9.9"), valid_payload()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        let body = body_json(response).await;
        assert_eq!(body["message"], "Rate limit exceeded. Please try again later.");
        // Clock is pinned 40 s into the window, so the hint is exact.
        assert_eq!(body["timeout"], 80);
    }

    #[tokio::test]
    async fn test_missing_ip_header_uses_shared_bucket() {
        let state = test_state(Arc::new(RecordingRelay::ok()), Arc::new(MemoryStore::new()));
        let app = router(state);

        // No header on any request: they all drain the sentinel bucket.
        for _ in 0..3 {
            let response = app
                .clone()
                .oneshot(submission_request(None, valid_payload()))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = app
            .oneshot(submission_request(None, valid_payload()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_store_outage_fails_closed() {
        let relay = Arc::new(RecordingRelay::ok());
        let state = test_state(relay.clone(), Arc::new(BrokenStore));
        let app = router(state);

        let response = app
            .oneshot(submission_request(Some("1.2.3.4"), valid_payload()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(relay.delivered.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_upstream_failure_is_500_with_description() {
        let relay = Arc::new(RecordingRelay::failing(RelayError::Upstream(
            "chat not found".to_string(),
        )));
        let state = test_state(relay, Arc::new(MemoryStore::new()));
        let app = router(state);

        let response = app
            .oneshot(submission_request(Some("1.2.3.4"), valid_payload()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(
            body["message"],
            "Server error: Telegram API error: chat not found"
        );
    }

    #[tokio::test]
    async fn test_preflight_answered_with_permissive_cors() {
        let state = test_state(Arc::new(RecordingRelay::ok()), Arc::new(MemoryStore::new()));
        let app = router(state);

        let request = HttpRequest::builder()
            .method(Method::OPTIONS)
            .uri("/")
            .header(header::ORIGIN, "https://forms.example.com")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let (parts, body) = response.into_parts();
        assert_eq!(parts.headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");

        let methods = parts.headers[header::ACCESS_CONTROL_ALLOW_METHODS]
            .to_str()
            .unwrap();
        assert!(methods.contains("POST"));
        assert!(methods.contains("OPTIONS"));

        let headers = parts.headers[header::ACCESS_CONTROL_ALLOW_HEADERS]
            .to_str()
            .unwrap()
            .to_lowercase();
        assert!(headers.contains("content-type"));

        let bytes = to_bytes(body, usize::MAX).await.unwrap();
        assert!(bytes.is_empty(), "preflight response carries no body");
    }

    #[tokio::test]
    async fn test_actual_response_carries_allow_origin() {
        let state = test_state(Arc::new(RecordingRelay::ok()), Arc::new(MemoryStore::new()));
        let app = router(state);

        let mut request = submission_request(Some("1.2.3.4"), valid_payload());
        request
            .headers_mut()
            .insert(header::ORIGIN, "https://forms.example.com".parse().unwrap());
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }

    #[tokio::test]
    async fn test_other_methods_are_405() {
        let state = test_state(Arc::new(RecordingRelay::ok()), Arc::new(MemoryStore::new()));
        let app = router(state);

        let request = HttpRequest::builder()
            .method(Method::GET)
            .uri("/")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Method not allowed");
    }

    #[tokio::test]
    async fn test_disabled_rate_limit_skips_admission() {
        let relay = Arc::new(RecordingRelay::ok());
        let config = Config {
            rate_limit: RateLimitConfig {
                enabled: false,
                max_requests_per_window: 1,
                window_secs: 120,
            },
            ..Default::default()
        };
        let state = Arc::new(AppState {
            limiter: RateLimiter::new(config.rate_limit.clone(), Arc::new(BrokenStore)),
            validator: SubmissionValidator::new(config.validation.clone()),
            relay,
            metrics: Metrics::new(),
            config,
            clock: Arc::new(|| TEST_NOW),
        });
        let app = router(state);

        // With the layer off, even a broken store never gets consulted.
        for _ in 0..5 {
            let response = app
                .clone()
                .oneshot(submission_request(Some("1.2.3.4"), valid_payload()))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
    }
}
