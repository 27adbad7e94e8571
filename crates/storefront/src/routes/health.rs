//! Health check handlers.

use axum::{extract::State, http::StatusCode};

use crate::db::PrimaryStore;
use crate::services::Notifier;
use crate::state::AppState;

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the primary store does not answer in
/// time. The storefront still serves degraded responses in that state.
pub async fn readiness<S: PrimaryStore, N: Notifier>(
    State(state): State<AppState<S, N>>,
) -> StatusCode {
    if state.storefront().data().primary_ready().await {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
