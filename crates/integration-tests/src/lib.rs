//! Integration tests for QuickDrop.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p quickdrop-integration-tests
//! ```
//!
//! The tests drive the real axum router with `tower::ServiceExt::oneshot`
//! over the in-memory primary store, so no database or server is needed.
//! Time, passcodes and notifier delivery are all controlled by the test.
//!
//! # Test Categories
//!
//! - `storefront_api` - Login, catalog, orders and customer lookup
//! - `degraded_store` - Behaviour while the database is down or unprovisioned
//! - `otp_flow` - Passcode issuance, expiry, replay and races

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{HeaderMap, Method, Request, StatusCode};
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use tower::ServiceExt;

use quickdrop_storefront::clock::{Clock, ManualClock};
use quickdrop_storefront::db::memory::MemoryStore;
use quickdrop_storefront::fallback::FallbackStore;
use quickdrop_storefront::middleware::RateLimits;
use quickdrop_storefront::routes::build_router;
use quickdrop_storefront::services::notifier::RecordingNotifier;
use quickdrop_storefront::services::otp::FixedCodes;
use quickdrop_storefront::services::{
    CodeSource, DataAccess, DataAccessOptions, OtpService, Storefront, default_catalog,
};
use quickdrop_storefront::state::AppState;

/// The instant every test clock starts at.
#[must_use]
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0)
        .single()
        .unwrap_or_default()
}

/// Read a money amount, serialized either as a string or a number.
///
/// Returns `None` if `value` holds no decimal.
#[must_use]
pub fn decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.to_string().parse().ok(),
        _ => None,
    }
}

/// A storefront wired over test doubles, plus handles to steer them.
pub struct TestApp {
    router: Router,
    pub store: Arc<MemoryStore>,
    pub fallback: Arc<FallbackStore>,
    pub clock: Arc<ManualClock>,
    pub codes: Arc<FixedCodes>,
    pub notifier: Arc<RecordingNotifier>,
}

/// A decoded response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestApp {
    /// A healthy store seeded with the default catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::with_store(
            MemoryStore::with_products(default_catalog()),
            DataAccessOptions::default(),
        )
    }

    /// Wire the storefront over `store`.
    #[must_use]
    pub fn with_store(store: MemoryStore, options: DataAccessOptions) -> Self {
        let store = Arc::new(store);
        let fallback = Arc::new(FallbackStore::new());
        let clock = Arc::new(ManualClock::new(epoch()));
        let codes = Arc::new(FixedCodes::default());
        let notifier = Arc::new(RecordingNotifier::new());

        let data = DataAccess::new(
            Arc::clone(&store),
            Arc::clone(&fallback),
            Arc::clone(&clock) as Arc<dyn Clock>,
            options,
        );
        let otp = OtpService::new(
            Arc::clone(&store),
            Arc::clone(&notifier),
            Arc::clone(&clock) as Arc<dyn Clock>,
            Arc::clone(&codes) as Arc<dyn CodeSource>,
            options.store_timeout,
            true,
        );
        let state = AppState::new(Storefront::new(data, otp, default_catalog()));

        Self {
            router: build_router(state, RateLimits::Disabled),
            store,
            fallback,
            clock,
            codes,
            notifier,
        }
    }

    /// Send one request through the router.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or the body cannot be read.
    pub async fn request(&self, method: Method, uri: &str, body: Option<&Value>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).expect("request"))
            .await
            .expect("router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// GET `uri`.
    pub async fn get(&self, uri: &str) -> TestResponse {
        self.request(Method::GET, uri, None).await
    }

    /// POST `body` as JSON to `uri`.
    pub async fn post(&self, uri: &str, body: &Value) -> TestResponse {
        self.request(Method::POST, uri, Some(body)).await
    }

    /// Log in and return the customer JSON.
    ///
    /// # Panics
    ///
    /// Panics unless the login succeeds.
    pub async fn login(&self, name: &str, email: &str, phone: &str) -> Value {
        let response = self
            .post(
                "/api/auth/login",
                &serde_json::json!({ "name": name, "email": email, "phone": phone }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
        response.body
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}
