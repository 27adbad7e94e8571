//! Command implementations.
//!
//! Every command reads `STOREFRONT_DATABASE_URL` (or `DATABASE_URL`) and
//! connects eagerly: unlike the server, a maintenance command is useless
//! without the database.

pub mod migrate;
pub mod otp;
pub mod seed;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use thiserror::Error;

use quickdrop_storefront::config::{ConfigError, get_database_url, validate_database_url};
use quickdrop_storefront::db::StoreError;
use quickdrop_storefront::services::OtpError;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration is missing or invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// A migration failed to apply.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A store operation failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// A passcode operation failed.
    #[error(transparent)]
    Otp(#[from] OtpError),
}

/// Connect to the storefront database.
async fn connect() -> Result<PgPool, CliError> {
    dotenvy::dotenv().ok();

    let database_url = get_database_url("STOREFRONT_DATABASE_URL")?;
    validate_database_url(database_url.expose_secret())?;

    tracing::info!("Connecting to storefront database...");
    Ok(PgPool::connect(database_url.expose_secret()).await?)
}
