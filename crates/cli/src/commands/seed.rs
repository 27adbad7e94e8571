//! Seed the product table with the default catalog.
//!
//! Products are inserted under their fixed catalog ids; rows that already
//! exist are left untouched, so the command can be re-run safely.

use quickdrop_storefront::db::ProductRepository;
use quickdrop_storefront::services::default_catalog;

use super::{CliError, connect};

/// Insert missing default catalog products.
///
/// # Returns
///
/// The number of products inserted.
///
/// # Errors
///
/// Returns an error if the database is unreachable or the insert fails.
pub async fn catalog() -> Result<u64, CliError> {
    let pool = connect().await?;
    let products = default_catalog();

    let inserted = ProductRepository::new(&pool)
        .insert_missing(&products)
        .await?;

    tracing::info!(
        inserted,
        skipped = (products.len() as u64).saturating_sub(inserted),
        "Default catalog seeded"
    );
    Ok(inserted)
}
