//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server errors to Sentry
//! before responding to the client. All route handlers return
//! `Result<T, AppError>`.
//!
//! Every error renders as JSON:
//!
//! ```json
//! { "kind": "NotFound", "detail": "user not found" }
//! ```
//!
//! A rejected passcode also carries `"verified": false`.

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use quickdrop_core::{AssemblyError, EmailError, OtpCodeError};

use crate::services::data_access::FacadeError;
use crate::services::otp::OtpError;

/// Machine-readable error category returned to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    InvalidOrExpired,
    WriteFailed,
    StoreUnavailable,
}

impl ErrorKind {
    /// HTTP status for this kind.
    #[must_use]
    pub const fn status(self) -> StatusCode {
        match self {
            Self::InvalidInput | Self::InvalidOrExpired => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::WriteFailed | Self::StoreUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed request.
    #[error("{0}")]
    InvalidInput(String),

    /// Resource not found in any store.
    #[error("{0} not found")]
    NotFound(String),

    /// Email failed validation.
    #[error("invalid email: {0}")]
    Email(#[from] EmailError),

    /// Passcode failed validation.
    #[error("invalid passcode: {0}")]
    Code(#[from] OtpCodeError),

    /// Cart could not be turned into an order.
    #[error("invalid cart: {0}")]
    Cart(#[from] AssemblyError),

    /// Passcode operation failed.
    #[error(transparent)]
    Otp(#[from] OtpError),

    /// Data access failed.
    #[error(transparent)]
    Facade(#[from] FacadeError),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidInput(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::InvalidInput(rejection.body_text())
    }
}

/// JSON body of an error response.
#[derive(Debug, Serialize)]
struct ErrorBody {
    kind: ErrorKind,
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    verified: Option<bool>,
}

impl AppError {
    /// The client-facing category.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) | Self::Email(_) | Self::Code(_) | Self::Cart(_) => {
                ErrorKind::InvalidInput
            }
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Otp(OtpError::InvalidOrExpired) => ErrorKind::InvalidOrExpired,
            Self::Otp(OtpError::StoreUnavailable(_)) => ErrorKind::StoreUnavailable,
            Self::Facade(FacadeError::WriteFailed { .. }) => ErrorKind::WriteFailed,
        }
    }

    /// Human-readable detail safe to show clients.
    fn detail(&self) -> String {
        match self {
            Self::Otp(OtpError::StoreUnavailable(_)) => {
                "Passcodes are unavailable right now, please try again".to_string()
            }
            Self::Facade(FacadeError::WriteFailed { entity, .. }) => {
                format!("{entity} could not be saved, please try again")
            }
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let status = kind.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                kind = ?kind,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        let body = ErrorBody {
            kind,
            detail: self.detail(),
            verified: (kind == ErrorKind::InvalidOrExpired).then_some(false),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context.
///
/// Call this once a request has resolved who the customer is.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}
