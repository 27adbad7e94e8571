//! Checkout passcode handlers.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use super::ApiJson;
use crate::db::PrimaryStore;
use crate::error::Result;
use crate::services::{Notifier, OtpIssued};
use crate::state::AppState;

/// Request to issue a passcode.
#[derive(Debug, Deserialize)]
pub struct SendRequest {
    #[serde(default)]
    pub email: String,
}

/// Response from issuing a passcode.
#[derive(Debug, Serialize)]
pub struct SendResponse {
    pub sent: bool,
    #[serde(flatten)]
    pub issued: OtpIssued,
}

/// Request to verify a passcode.
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub otp: String,
}

/// Response from a successful verification.
#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub verified: bool,
}

/// Issue a passcode and hand it to the notifier.
///
/// POST /api/otp/send
///
/// `sent` means the passcode was stored; `delivered` reports the notifier.
///
/// # Errors
///
/// Returns `InvalidInput` for a malformed email and `StoreUnavailable` if the
/// passcode could not be stored.
pub async fn send<S: PrimaryStore, N: Notifier>(
    State(state): State<AppState<S, N>>,
    ApiJson(body): ApiJson<SendRequest>,
) -> Result<Json<SendResponse>> {
    let issued = state.storefront().request_otp(&body.email).await?;
    Ok(Json(SendResponse { sent: true, issued }))
}

/// Verify and consume a passcode.
///
/// POST /api/otp/verify
///
/// # Errors
///
/// Returns `InvalidInput` for malformed input, `InvalidOrExpired` for a wrong,
/// expired or used passcode, and `StoreUnavailable` if the store is down.
pub async fn verify<S: PrimaryStore, N: Notifier>(
    State(state): State<AppState<S, N>>,
    ApiJson(body): ApiJson<VerifyRequest>,
) -> Result<Json<VerifyResponse>> {
    state
        .storefront()
        .confirm_otp(&body.email, &body.otp)
        .await?;
    Ok(Json(VerifyResponse { verified: true }))
}
