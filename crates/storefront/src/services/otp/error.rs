//! OTP error types.

use thiserror::Error;

use crate::db::StoreError;

/// Errors from issuing or verifying passcodes.
#[derive(Debug, Error)]
pub enum OtpError {
    /// No unused, unexpired passcode matched.
    #[error("passcode is invalid or expired")]
    InvalidOrExpired,

    /// The passcode table could not be read or written.
    #[error("passcode store unavailable: {0}")]
    StoreUnavailable(#[source] StoreError),
}
