//! Primary store access for the storefront `PostgreSQL` database.
//!
//! # Tables
//!
//! - `"User"` - customers, unique by email
//! - `"Product"` - catalog, seeded out-of-band (`qd-cli seed`)
//! - `"Order"` / `"OrderItem"` - placed orders and their price snapshots
//! - `"OneTimePasscode"` - checkout passcodes (no fallback storage)
//!
//! # Outcomes
//!
//! Every [`PrimaryStore`] operation returns a [`StoreResult`] instead of a
//! plain `Result`, so callers can tell "the table is not there yet" apart
//! from "the database is down". What each outcome means for a given entity is
//! decided in one place, [`crate::services::policy`].
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p quickdrop-cli -- migrate
//! ```

pub mod orders;
pub mod passcodes;
pub mod postgres;
pub mod products;
pub mod users;

#[cfg(any(test, feature = "test-support"))]
pub mod memory;

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use quickdrop_core::{
    Email, OneTimePasscode, Order, OrderId, OrderItem, OtpCode, PasscodeId, Product, User, UserId,
};

pub use orders::OrderRepository;
pub use passcodes::PasscodeRepository;
pub use postgres::PgStore;
pub use products::ProductRepository;
pub use users::UserRepository;

/// Embedded storefront migrations.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// SQLSTATE for `undefined_table`.
const UNDEFINED_TABLE: &str = "42P01";
/// SQLSTATE for `invalid_schema_name`.
const INVALID_SCHEMA_NAME: &str = "3F000";

/// Errors raised by the primary store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// The call did not finish within the configured bound.
    #[error("primary store timed out after {0:?}")]
    Timeout(Duration),

    /// The store could not be reached at all.
    #[error("primary store unreachable: {0}")]
    Unreachable(String),

    /// A write was rejected by a key or check constraint.
    #[error("constraint violated: {0}")]
    Constraint(String),

    /// The table or schema backing an entity does not exist.
    #[error("{0} is not provisioned")]
    NotProvisioned(String),
}

/// How a store error should be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Schema or table missing: behave as if there were no rows.
    NotProvisioned,
    /// Anything else: connectivity, timeout, constraint, corrupt data.
    HardFailure,
}

/// Classify a store error.
#[must_use]
pub fn classify(error: &StoreError) -> ErrorClass {
    match error {
        StoreError::NotProvisioned(_) => ErrorClass::NotProvisioned,
        StoreError::Database(sqlx::Error::Database(db_err)) => {
            classify_database_error(db_err.code().as_deref(), db_err.message())
        }
        _ => ErrorClass::HardFailure,
    }
}

/// Classify a database-reported error from its SQLSTATE and message.
///
/// A SQLSTATE decides on its own. Messages are only consulted without one,
/// because hosted Postgres gateways report a missing table as a "schema
/// cache" miss without a SQLSTATE.
#[must_use]
pub fn classify_database_error(code: Option<&str>, message: &str) -> ErrorClass {
    match code {
        Some(UNDEFINED_TABLE | INVALID_SCHEMA_NAME) => return ErrorClass::NotProvisioned,
        Some(_) => return ErrorClass::HardFailure,
        None => {}
    }

    // Only a missing relation or schema counts; a missing column
    // (`column "x" of relation "y" does not exist`) is a real failure.
    let message = message.trim().to_ascii_lowercase();
    let missing_relation = (message.starts_with("relation ") || message.starts_with("schema "))
        && message.ends_with("does not exist");
    if missing_relation || message.contains("schema cache") {
        return ErrorClass::NotProvisioned;
    }

    ErrorClass::HardFailure
}

/// Outcome of one primary store operation.
#[derive(Debug)]
#[must_use]
pub enum StoreResult<T> {
    /// The operation ran; `T` is its answer (which may itself be empty).
    Ok(T),
    /// The backing table or schema is not provisioned.
    Absent,
    /// The operation failed for any other reason.
    Failed(StoreError),
}

impl<T> StoreResult<T> {
    /// Returns true for [`StoreResult::Ok`].
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }
}

impl<T> From<Result<T, StoreError>> for StoreResult<T> {
    fn from(result: Result<T, StoreError>) -> Self {
        match result {
            Ok(value) => Self::Ok(value),
            Err(error) => match classify(&error) {
                ErrorClass::NotProvisioned => {
                    tracing::debug!(error = %error, "primary store not provisioned");
                    Self::Absent
                }
                ErrorClass::HardFailure => Self::Failed(error),
            },
        }
    }
}

/// Run a primary store call under a time bound.
///
/// An elapsed bound becomes `Failed(StoreError::Timeout)`, which callers treat
/// like any other hard failure.
pub async fn with_timeout<T>(
    bound: Duration,
    call: impl Future<Output = StoreResult<T>>,
) -> StoreResult<T> {
    match tokio::time::timeout(bound, call).await {
        Ok(outcome) => outcome,
        Err(_) => StoreResult::Failed(StoreError::Timeout(bound)),
    }
}

/// Which orders a listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderScope {
    /// Every order, each joined with its owning user.
    All,
    /// Orders belonging to one user.
    ForUser(UserId),
}

/// The relational store of record.
///
/// Implementations report outcomes, they never fall back themselves.
/// Joined reads return orders newest first with their items (and each item's
/// product) attached.
pub trait PrimaryStore: Send + Sync + 'static {
    /// Look up a user by exact email.
    fn find_user_by_email(
        &self,
        email: &Email,
    ) -> impl Future<Output = StoreResult<Option<User>>> + Send;

    /// Look up a user by id.
    fn get_user_by_id(&self, id: UserId) -> impl Future<Output = StoreResult<Option<User>>> + Send;

    /// Insert a user; on an email conflict the existing row's name and phone
    /// are updated instead and that row is returned.
    fn insert_user(&self, user: &User) -> impl Future<Output = StoreResult<User>> + Send;

    /// Update name and phone of an existing user. `None` if the id is unknown.
    fn update_user(
        &self,
        id: UserId,
        name: &str,
        phone: &str,
    ) -> impl Future<Output = StoreResult<Option<User>>> + Send;

    /// All products, newest first.
    fn list_products(&self) -> impl Future<Output = StoreResult<Vec<Product>>> + Send;

    /// Insert an order header (its `items` are ignored).
    fn insert_order(&self, order: &Order) -> impl Future<Output = StoreResult<()>> + Send;

    /// Insert order items as a single batch: all or none.
    fn insert_order_items(&self, items: &[OrderItem])
    -> impl Future<Output = StoreResult<()>> + Send;

    /// Read one order back with its user, items and products joined.
    fn get_order(&self, id: OrderId) -> impl Future<Output = StoreResult<Option<Order>>> + Send;

    /// List orders with their relations joined.
    fn list_orders(&self, scope: OrderScope)
    -> impl Future<Output = StoreResult<Vec<Order>>> + Send;

    /// Insert a freshly issued passcode.
    fn insert_passcode(
        &self,
        passcode: &OneTimePasscode,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    /// Atomically mark the newest eligible passcode matching `email` and
    /// `code` as used. `None` when nothing was eligible; a concurrent caller
    /// that lost the race also gets `None`.
    fn consume_passcode(
        &self,
        email: &Email,
        code: &OtpCode,
        now: DateTime<Utc>,
    ) -> impl Future<Output = StoreResult<Option<PasscodeId>>> + Send;

    /// Delete passcodes whose validity window closed before `now`.
    fn delete_expired_passcodes(
        &self,
        now: DateTime<Utc>,
    ) -> impl Future<Output = StoreResult<u64>> + Send;

    /// Cheap round trip used by readiness checks.
    fn ping(&self) -> impl Future<Output = StoreResult<()>> + Send;
}

/// Create a `PostgreSQL` connection pool without connecting.
///
/// Connections are opened on first use so the storefront can start (and
/// serve degraded responses) while the database is unreachable. Acquiring a
/// connection gives up after `acquire_timeout`.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection string cannot be parsed.
pub fn create_pool(
    database_url: &secrecy::SecretString,
    acquire_timeout: Duration,
) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(0)
        .acquire_timeout(acquire_timeout)
        .connect_lazy(database_url.expose_secret())
}
