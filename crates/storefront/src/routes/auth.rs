//! Customer login.
//!
//! There are no passwords or sessions: login resolves the customer record for
//! an email, creating it or refreshing its name and phone.

use axum::{Json, extract::State};
use serde::Deserialize;

use quickdrop_core::User;

use super::ApiJson;
use crate::db::PrimaryStore;
use crate::error::{Result, set_sentry_user};
use crate::services::Notifier;
use crate::state::AppState;

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
}

/// Create or update a customer.
///
/// POST /api/auth/login
///
/// # Errors
///
/// Returns `InvalidInput` for blank fields or a malformed email, and
/// `WriteFailed` if the customer could be saved nowhere.
pub async fn login<S: PrimaryStore, N: Notifier>(
    State(state): State<AppState<S, N>>,
    ApiJson(form): ApiJson<LoginRequest>,
) -> Result<Json<User>> {
    let user = state
        .storefront()
        .login(&form.name, &form.email, &form.phone)
        .await?;

    set_sentry_user(&user.id, Some(user.email.as_str()));
    tracing::info!(user_id = %user.id, "customer logged in");

    Ok(Json(user))
}
