//! Order assembly: turns cart lines into priced item snapshots and a total.
//!
//! Pure computation, no I/O. The total is the exact decimal sum of
//! `unit_price * quantity` over every line; nothing is rounded.

use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use crate::types::{OrderItemDraft, Price, ProductId};

/// Errors produced while assembling an order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblyError {
    /// The cart has no lines.
    #[error("order must contain at least one item")]
    EmptyCart,

    /// A line's quantity is zero or negative.
    #[error("quantity for product {product_id} must be positive (got {quantity})")]
    NonPositiveQuantity {
        product_id: ProductId,
        quantity: i64,
    },

    /// A line's quantity does not fit the stored column.
    #[error("quantity for product {product_id} is too large (got {quantity})")]
    QuantityTooLarge {
        product_id: ProductId,
        quantity: i64,
    },

    /// A line's unit price is negative.
    #[error("price for product {product_id} cannot be negative")]
    NegativePrice { product_id: ProductId },

    /// The total does not fit in a decimal.
    #[error("order total overflowed")]
    Overflow,
}

/// One cart line as submitted by the checkout page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: i64,
    #[serde(alias = "unitPrice")]
    pub price: Decimal,
}

/// The result of [`assemble`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledOrder {
    pub items: Vec<OrderItemDraft>,
    pub total_price: Price,
}

/// Validate cart lines and compute the snapshot items and total.
///
/// # Errors
///
/// Returns `AssemblyError::EmptyCart` for an empty slice, and the matching
/// variant for the first line with a non-positive quantity or a negative
/// price.
pub fn assemble(lines: &[CartLine]) -> Result<AssembledOrder, AssemblyError> {
    if lines.is_empty() {
        return Err(AssemblyError::EmptyCart);
    }

    let mut items = Vec::with_capacity(lines.len());
    let mut total = Price::ZERO;

    for line in lines {
        if line.quantity <= 0 {
            return Err(AssemblyError::NonPositiveQuantity {
                product_id: line.product_id,
                quantity: line.quantity,
            });
        }
        // Stored as a Postgres INTEGER.
        let quantity = u32::try_from(line.quantity)
            .ok()
            .filter(|q| i32::try_from(*q).is_ok())
            .ok_or(AssemblyError::QuantityTooLarge {
                product_id: line.product_id,
                quantity: line.quantity,
            })?;
        let price = Price::new(line.price).map_err(|_| AssemblyError::NegativePrice {
            product_id: line.product_id,
        })?;

        let line_total = price.checked_mul(quantity).ok_or(AssemblyError::Overflow)?;
        total = total.checked_add(line_total).ok_or(AssemblyError::Overflow)?;

        items.push(OrderItemDraft {
            product_id: line.product_id,
            quantity,
            price,
        });
    }

    Ok(AssembledOrder {
        items,
        total_price: total,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn line(quantity: i64, price: Decimal) -> CartLine {
        CartLine {
            product_id: ProductId::generate(),
            quantity,
            price,
        }
    }

    #[test]
    fn test_total_is_exact_sum() {
        let lines = [
            line(3, Decimal::new(1999, 2)),
            line(1, Decimal::new(1, 2)),
            line(7, Decimal::new(33, 1)),
        ];
        let assembled = assemble(&lines).unwrap();
        // 59.97 + 0.01 + 23.1
        assert_eq!(assembled.total_price.amount(), Decimal::new(8308, 2));
        assert_eq!(assembled.items.len(), 3);
    }

    #[test]
    fn test_items_snapshot_unit_price_and_quantity() {
        let input = line(2, Decimal::from(49));
        let assembled = assemble(&[input]).unwrap();
        let item = assembled.items.first().unwrap();
        assert_eq!(item.product_id, input.product_id);
        assert_eq!(item.quantity, 2);
        assert_eq!(item.price.amount(), Decimal::from(49));
    }

    #[test]
    fn test_float_drift_does_not_happen() {
        // 0.1 * 3 is not 0.3 in binary floating point.
        let assembled = assemble(&[line(3, Decimal::new(1, 1))]).unwrap();
        assert_eq!(assembled.total_price.amount(), Decimal::new(3, 1));
    }

    #[test]
    fn test_rejects_empty_cart() {
        assert_eq!(assemble(&[]), Err(AssemblyError::EmptyCart));
    }

    #[test]
    fn test_rejects_zero_and_negative_quantity() {
        assert!(matches!(
            assemble(&[line(0, Decimal::ONE)]),
            Err(AssemblyError::NonPositiveQuantity { quantity: 0, .. })
        ));
        assert!(matches!(
            assemble(&[line(-2, Decimal::ONE)]),
            Err(AssemblyError::NonPositiveQuantity { quantity: -2, .. })
        ));
    }

    #[test]
    fn test_rejects_huge_quantity() {
        assert!(matches!(
            assemble(&[line(i64::from(i32::MAX) + 1, Decimal::ONE)]),
            Err(AssemblyError::QuantityTooLarge { .. })
        ));
    }

    #[test]
    fn test_rejects_negative_price_even_after_valid_lines() {
        let bad = line(1, Decimal::new(-1, 0));
        let result = assemble(&[line(1, Decimal::ONE), bad]);
        assert_eq!(
            result,
            Err(AssemblyError::NegativePrice {
                product_id: bad.product_id
            })
        );
    }

    #[test]
    fn test_zero_price_is_allowed() {
        let assembled = assemble(&[line(4, Decimal::ZERO)]).unwrap();
        assert_eq!(assembled.total_price, Price::ZERO);
    }

    #[test]
    fn test_cart_line_accepts_json_numbers() {
        let json = r#"{"productId":"00000000-0000-0000-0000-000000000001","quantity":2,"price":49.5}"#;
        let parsed: CartLine = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.quantity, 2);
        assert_eq!(parsed.price, Decimal::new(495, 1));
    }
}
