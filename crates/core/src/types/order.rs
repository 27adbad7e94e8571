//! Order and order item records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{OrderId, OrderItemId, OrderStatus, Price, Product, ProductId, User, UserId};

/// A placed order.
///
/// `total_price` is the sum of the items' `price * quantity` at creation time,
/// computed before the order is written and never recomputed from live
/// product prices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub address: String,
    pub total_price: Price,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    /// Line items, with their products joined when read back from the store.
    #[serde(default)]
    pub items: Vec<OrderItem>,
    /// The owning user, when the read joined it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    /// `false` for a synthetic order that was never written anywhere. Its id
    /// cannot be looked up later.
    pub persisted: bool,
}

/// One line of an order.
///
/// `price` is a snapshot of the unit price at order time, so later catalog
/// price changes never alter historical orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub price: Price,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<Product>,
}

/// An order line before it has been assigned to an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemDraft {
    pub product_id: ProductId,
    pub quantity: u32,
    pub price: Price,
}

impl OrderItemDraft {
    /// Attach this draft to an order under a fresh item id.
    #[must_use]
    pub fn into_item(self, order_id: OrderId) -> OrderItem {
        OrderItem {
            id: OrderItemId::generate(),
            order_id,
            product_id: self.product_id,
            quantity: self.quantity,
            price: self.price,
            product: None,
        }
    }
}
