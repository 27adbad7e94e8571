//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness
//! GET  /health/ready           - Readiness (primary store round trip)
//!
//! # Passcodes (strict rate limit)
//! POST /api/otp/send           - Issue a checkout passcode
//! POST /api/otp/verify         - Verify a checkout passcode
//!
//! # API (relaxed rate limit)
//! POST /api/auth/login         - Create or update a customer
//! GET  /api/products           - Product listing
//! POST /api/orders             - Place an order
//! GET  /api/orders             - All orders
//! GET  /api/user               - Customer by ?userId= or ?email=, with order count
//! GET  /api/user/orders        - Orders of one customer
//! ```
//!
//! Every handler is generic over the primary store and notifier so the same
//! router serves `PostgreSQL` in production and the in-memory store in tests.

pub mod auth;
pub mod health;
pub mod orders;
pub mod otp;
pub mod products;
pub mod user;

use axum::{
    Router,
    body::Body,
    extract::{FromRequest, FromRequestParts},
    http::Request,
    middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use tracing::Span;

use quickdrop_core::UserId;

use crate::db::PrimaryStore;
use crate::error::{AppError, Result};
use crate::middleware::{RateLimits, api_rate_limiter, otp_rate_limiter, request_id_middleware};
use crate::services::Notifier;
use crate::state::AppState;

/// JSON body extractor whose rejections render as `InvalidInput`.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Query string extractor whose rejections render as `InvalidInput`.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// Parse a `userId` parameter.
pub(crate) fn parse_user_id(raw: Option<&str>) -> Result<UserId> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::InvalidInput("userId is required".to_string()))?;
    raw.parse()
        .map_err(|_| AppError::InvalidInput(format!("userId {raw} is not a valid id")))
}

/// Create the passcode routes router.
pub fn otp_routes<S: PrimaryStore, N: Notifier>() -> Router<AppState<S, N>> {
    Router::new()
        .route("/api/otp/send", post(otp::send::<S, N>))
        .route("/api/otp/verify", post(otp::verify::<S, N>))
}

/// Create the general API routes router.
pub fn api_routes<S: PrimaryStore, N: Notifier>() -> Router<AppState<S, N>> {
    Router::new()
        .route("/api/auth/login", post(auth::login::<S, N>))
        .route("/api/products", get(products::index::<S, N>))
        .route(
            "/api/orders",
            get(orders::index::<S, N>).post(orders::create::<S, N>),
        )
        .route("/api/user", get(user::show::<S, N>))
        .route("/api/user/orders", get(user::orders::<S, N>))
}

/// Span for one HTTP request. `request_id` is filled in by the request id
/// middleware.
fn request_span(request: &Request<Body>) -> Span {
    tracing::info_span!(
        "http_request",
        method = %request.method(),
        uri = %request.uri(),
        request_id = tracing::field::Empty,
    )
}

/// Build the complete router with state, tracing and request ids.
///
/// Sentry layers are added by the binary.
pub fn build_router<S: PrimaryStore, N: Notifier>(
    state: AppState<S, N>,
    limits: RateLimits,
) -> Router {
    let (otp, api) = match limits {
        RateLimits::Enabled => (
            otp_routes().layer(otp_rate_limiter()),
            api_routes().layer(api_rate_limiter()),
        ),
        RateLimits::Disabled => (otp_routes(), api_routes()),
    };

    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness::<S, N>))
        .merge(otp)
        .merge(api)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .with_state(state)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::http::StatusCode;
    use chrono::Utc;
    use tower::ServiceExt;

    use super::*;
    use crate::clock::{Clock, ManualClock};
    use crate::db::memory::MemoryStore;
    use crate::error::ErrorKind;
    use crate::fallback::FallbackStore;
    use crate::services::notifier::RecordingNotifier;
    use crate::services::{
        CodeSource, DataAccess, DataAccessOptions, OtpService, RandomCodes, Storefront,
        default_catalog,
    };

    fn router(limits: RateLimits) -> Router {
        let store = Arc::new(MemoryStore::new());
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(Utc::now()));
        let data = DataAccess::new(
            Arc::clone(&store),
            Arc::new(FallbackStore::new()),
            Arc::clone(&clock),
            DataAccessOptions::default(),
        );
        let otp = OtpService::new(
            store,
            Arc::new(RecordingNotifier::new()),
            clock,
            Arc::new(RandomCodes) as Arc<dyn CodeSource>,
            Duration::from_secs(1),
            false,
        );
        build_router(
            AppState::new(Storefront::new(data, otp, default_catalog())),
            limits,
        )
    }

    fn send_otp() -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/otp/send")
            .header("content-type", "application/json")
            .header("x-forwarded-for", "203.0.113.7")
            .body(Body::from(r#"{"email":"rate@example.com"}"#))
            .unwrap()
    }

    #[tokio::test]
    async fn test_otp_routes_are_rate_limited() {
        let app = router(RateLimits::Enabled);
        for _ in 0..5 {
            let response = app.clone().oneshot(send_otp()).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
        let response = app.oneshot(send_otp()).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_limits_can_be_disabled() {
        let app = router(RateLimits::Disabled);
        for _ in 0..8 {
            let response = app.clone().oneshot(send_otp()).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
    }

    #[test]
    fn test_parse_user_id() {
        let id = UserId::generate();
        assert_eq!(parse_user_id(Some(&id.to_string())).unwrap(), id);
        assert_eq!(
            parse_user_id(None).unwrap_err().kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(
            parse_user_id(Some("  ")).unwrap_err().kind(),
            ErrorKind::InvalidInput
        );
        assert!(
            parse_user_id(Some("42"))
                .unwrap_err()
                .to_string()
                .contains("not a valid id")
        );
    }
}
