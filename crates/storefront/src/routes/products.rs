//! Product route handlers.

use axum::{Json, extract::State};

use quickdrop_core::Product;

use crate::db::PrimaryStore;
use crate::services::Notifier;
use crate::state::AppState;

/// Product listing.
///
/// GET /api/products
///
/// Never fails: an unavailable or empty product table yields the default
/// catalog.
pub async fn index<S: PrimaryStore, N: Notifier>(
    State(state): State<AppState<S, N>>,
) -> Json<Vec<Product>> {
    Json(state.storefront().list_products().await)
}
