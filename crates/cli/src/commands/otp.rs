//! Passcode maintenance commands.
//!
//! # Usage
//!
//! ```bash
//! qd-cli otp purge
//! qd-cli otp purge --timeout-secs 120
//! ```

use std::sync::Arc;
use std::time::Duration;

use quickdrop_storefront::clock::SystemClock;
use quickdrop_storefront::db::PgStore;
use quickdrop_storefront::services::{LogNotifier, OtpService, RandomCodes};

use super::{CliError, connect};

/// Delete expired passcodes.
///
/// # Returns
///
/// The number of passcodes deleted.
///
/// # Errors
///
/// Returns an error if the database is unreachable or does not answer
/// within `timeout`.
pub async fn purge(timeout: Duration) -> Result<u64, CliError> {
    let pool = connect().await?;

    // Nothing is issued here, so the notifier and code source are inert.
    let otp = OtpService::new(
        Arc::new(PgStore::new(pool)),
        Arc::new(LogNotifier),
        Arc::new(SystemClock),
        Arc::new(RandomCodes),
        timeout,
        false,
    );

    Ok(otp.purge_expired().await?)
}
