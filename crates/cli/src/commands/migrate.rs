//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! qd-cli migrate
//! ```
//!
//! Migrations are embedded from `crates/storefront/migrations/` at build
//! time, so the binary carries the schema it was built with. Applied
//! migrations are skipped.

use quickdrop_storefront::db::MIGRATOR;

use super::{CliError, connect};

/// Run storefront database migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), CliError> {
    let pool = connect().await?;

    tracing::info!(
        available = MIGRATOR.iter().count(),
        "Running storefront migrations..."
    );
    MIGRATOR.run(&pool).await?;

    tracing::info!("Storefront migrations complete!");
    Ok(())
}
