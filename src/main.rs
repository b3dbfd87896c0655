// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Contact Gateway Service
//!
//! Edge gateway that accepts contact-form submissions, rate limits them
//! per client address, validates the payload, and relays accepted
//! submissions to a Telegram bot.
//!
//! ## Configuration
//!
//! Configuration is loaded from environment variables:
//!
//! - `BIND_ADDR`: Server bind address (default: 0.0.0.0:8080)
//! - `FORWARDED_IP_HEADER`: Header carrying the client address
//!   (default: CF-Connecting-IP)
//! - `MAX_REQUESTS_PER_WINDOW`: Admitted requests per client per window
//!   (default: 3)
//! - `RATE_WINDOW_SECS`: Window length in seconds (default: 120)
//! - `RATE_LIMIT_ENABLED`: Apply admission control (default: true)
//! - `TELEGRAM_BOT_TOKEN`: Bot token for the outbound relay
//! - `TELEGRAM_CHAT_ID`: Destination chat for relayed submissions

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use contact_gateway::{
    config::Config,
    handlers::{router, wall_clock, AppState},
    limiter::RateLimiter,
    metrics::Metrics,
    relay::TelegramRelay,
    store::MemoryStore,
    validator::SubmissionValidator,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Load configuration
    let config = load_config();
    info!(
        bind_addr = %config.bind_addr,
        rate_limit_enabled = config.rate_limit.enabled,
        max_requests_per_window = config.rate_limit.max_requests_per_window,
        window_secs = config.rate_limit.window_secs,
        "Starting contact gateway"
    );

    // Create application state
    let store = Arc::new(MemoryStore::new());
    let limiter = RateLimiter::new(config.rate_limit.clone(), store.clone());
    let validator = SubmissionValidator::new(config.validation.clone());
    let relay = Arc::new(TelegramRelay::new(
        reqwest::Client::new(),
        &config.relay.api_base,
        &config.relay.bot_token,
        &config.relay.chat_id,
    ));

    let state = Arc::new(AppState {
        limiter,
        validator,
        relay,
        metrics: Metrics::new(),
        config: config.clone(),
        clock: wall_clock(),
    });

    // Spawn counter sweep task. The store expires entries lazily on read;
    // the sweep keeps idle clients from accumulating.
    let sweep_store = store.clone();
    let sweep_interval = Duration::from_secs(config.rate_limit.window_secs);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_interval);
        loop {
            interval.tick().await;
            sweep_store.sweep().await;
        }
    });

    // Build router; CORS is part of the router itself.
    let app = router(state).layer(TraceLayer::new_for_http());

    // Start server
    let addr: SocketAddr = config.bind_addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Load configuration from environment variables.
fn load_config() -> Config {
    Config {
        bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
        forwarded_ip_header: std::env::var("FORWARDED_IP_HEADER")
            .unwrap_or_else(|_| "CF-Connecting-IP".to_string()),
        rate_limit: contact_gateway::config::RateLimitConfig {
            enabled: std::env::var("RATE_LIMIT_ENABLED")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
            max_requests_per_window: std::env::var("MAX_REQUESTS_PER_WINDOW")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3),
            window_secs: std::env::var("RATE_WINDOW_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(120),
        },
        relay: contact_gateway::config::RelayConfig {
            bot_token: std::env::var("TELEGRAM_BOT_TOKEN").unwrap_or_default(),
            chat_id: std::env::var("TELEGRAM_CHAT_ID").unwrap_or_default(),
            ..Default::default()
        },
        ..Default::default()
    }
}
