//! QuickDrop Storefront - ordering API.
//!
//! This binary serves the storefront JSON API on port 3000.
//!
//! # Architecture
//!
//! - Axum web framework, JSON in and out
//! - `PostgreSQL` as the store of record, reached through a lazy pool
//! - An in-process fallback store that keeps customers usable while the
//!   database is unreachable or not yet provisioned
//! - Checkout passcodes stored in `PostgreSQL` and handed to a notifier
//!
//! The server starts even when the database is down; `/health/ready`
//! reports whether it is reachable.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::net::SocketAddr;
use std::sync::Arc;

use quickdrop_storefront::clock::{Clock, SystemClock};
use quickdrop_storefront::config::StorefrontConfig;
use quickdrop_storefront::db::{self, PgStore};
use quickdrop_storefront::fallback::FallbackStore;
use quickdrop_storefront::middleware::RateLimits;
use quickdrop_storefront::routes;
use quickdrop_storefront::services::{
    CodeSource, DataAccess, DataAccessOptions, LogNotifier, OtpService, RandomCodes, Storefront,
    default_catalog,
};
use quickdrop_storefront::state::AppState;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: Some(std::borrow::Cow::Owned(
                config
                    .sentry_environment
                    .clone()
                    .unwrap_or_else(|| config.environment.to_string()),
            )),
            sample_rate: config.sentry_sample_rate,
            traces_sample_rate: config.sentry_traces_sample_rate,
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    // Load configuration from environment (needed for Sentry init)
    let config = StorefrontConfig::from_env().expect("Failed to load configuration");

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    // Defaults to info level for our crate if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "quickdrop_storefront=info,tower_http=debug".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    tracing::info!(environment = %config.environment, "starting storefront");

    // Lazy pool: nothing connects until the first query
    let pool = db::create_pool(&config.database_url, config.store_timeout)
        .expect("Failed to create database pool");

    // NOTE: Migrations are NOT run automatically on startup.
    // Run them explicitly via: cargo run -p quickdrop-cli -- migrate

    let primary = Arc::new(PgStore::new(pool));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let data = DataAccess::new(
        Arc::clone(&primary),
        Arc::new(FallbackStore::new()),
        Arc::clone(&clock),
        DataAccessOptions {
            store_timeout: config.store_timeout,
            allow_unsaved_orders: config.allow_unsaved_orders,
        },
    );
    let otp = OtpService::new(
        primary,
        Arc::new(LogNotifier),
        clock,
        Arc::new(RandomCodes) as Arc<dyn CodeSource>,
        config.store_timeout,
        config.environment.exposes_passcodes(),
    );
    let state = AppState::new(Storefront::new(data, otp, default_catalog()));

    let app = routes::build_router(state, RateLimits::Enabled)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    // Start server
    let addr = config.socket_addr();
    tracing::info!("storefront listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    // Peer addresses feed the per-IP rate limiters
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Server error");
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
