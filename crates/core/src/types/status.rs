//! Order status.

use serde::{Deserialize, Serialize};

/// Lifecycle status of an order.
///
/// Orders are created `PLACED`; no further transitions exist yet. Stored as
/// text in the `"Order".status` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Placed,
}

impl OrderStatus {
    /// Text form used in the database and over the wire.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Placed => "PLACED",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PLACED" => Ok(Self::Placed),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}
