//! Order route handlers.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;

use quickdrop_core::{CartLine, Order};

use super::{ApiJson, parse_user_id};
use crate::db::PrimaryStore;
use crate::error::Result;
use crate::services::Notifier;
use crate::state::AppState;

/// Checkout form data.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub user_id: Option<String>,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub items: Vec<CartLine>,
}

/// Place an order.
///
/// POST /api/orders
///
/// Responds 201 with the order. An order the database could not take comes
/// back with `persisted: false` unless unsaved orders are disabled.
///
/// # Errors
///
/// Returns `InvalidInput` for a missing user id, blank address or bad cart,
/// `NotFound` for an unknown customer and `WriteFailed` if the order could
/// not be saved and unsaved orders are disabled.
pub async fn create<S: PrimaryStore, N: Notifier>(
    State(state): State<AppState<S, N>>,
    ApiJson(form): ApiJson<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<Order>)> {
    let user_id = parse_user_id(form.user_id.as_deref())?;
    let order = state
        .storefront()
        .place_order(user_id, &form.address, &form.items)
        .await?;

    Ok((StatusCode::CREATED, Json(order)))
}

/// Every order, newest first.
///
/// GET /api/orders
pub async fn index<S: PrimaryStore, N: Notifier>(
    State(state): State<AppState<S, N>>,
) -> Json<Vec<Order>> {
    Json(state.storefront().list_all_orders().await)
}
