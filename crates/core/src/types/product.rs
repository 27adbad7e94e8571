//! Catalog records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Price, ProductId};

/// A product in the catalog. Read-only from the storefront's point of view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub category: String,
    pub price: Price,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
}
