//! Built-in product catalog.
//!
//! Served for browsing when the `"Product"` table is empty or unreachable,
//! and inserted by `qd-cli seed`. The storefront itself never writes it back.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use quickdrop_core::{Price, Product, ProductId};

/// `(name, category, price, image)` for each default product.
const DEFAULT_PRODUCTS: [(&str, &str, u32, &str); 12] = [
    ("Fresh Bananas", "Fruits", 49, "photo-1571771894821-ce9b6c11b08e"),
    ("Red Apples", "Fruits", 89, "photo-1560806887-1e4cd0b6cbd6"),
    ("Sweet Mangoes", "Fruits", 120, "photo-1605027990121-1c8e0c5e5e5e"),
    ("Fresh Oranges", "Fruits", 75, "photo-1580052614034-c55d20bfee3b"),
    ("Basmati Rice 1kg", "Groceries", 95, "photo-1586201375761-83865001e31c"),
    ("Toor Dal 1kg", "Groceries", 125, "photo-1596797038530-2c107229654b"),
    ("Wheat Flour 1kg", "Groceries", 45, "photo-1604948501466-4e9c339b9c24"),
    ("Sugar 1kg", "Groceries", 42, "photo-1589924691995-400dc9ecc119"),
    ("Lay's Classic Salted", "Snacks", 20, "photo-1612929633733-8d8c7c9e5b5e"),
    ("Kurkure Masala Munch", "Snacks", 20, "photo-1612929633733-8d8c7c9e5b5e"),
    ("Parle-G Biscuits", "Snacks", 10, "photo-1558961363-fa8fdf82db35"),
    ("Maggi Noodles", "Snacks", 14, "photo-1621996346565-e3dbc646d9a9"),
];

/// 2024-01-01T00:00:00Z
const CATALOG_EPOCH: i64 = 1_704_067_200;

/// The default catalog.
///
/// Ids are stable across calls and processes, so seeded rows and served
/// defaults agree and orders placed against either resolve to the same
/// product.
#[must_use]
pub fn default_catalog() -> Vec<Product> {
    let created_at = DateTime::<Utc>::from_timestamp(CATALOG_EPOCH, 0).unwrap_or_default();

    DEFAULT_PRODUCTS
        .iter()
        .zip(1_u128..)
        .map(|(&(name, category, price, image), n)| Product {
            id: ProductId::new(Uuid::from_u128(n)),
            name: name.to_owned(),
            category: category.to_owned(),
            price: Price::from(price),
            image_url: format!("https://images.unsplash.com/{image}?w=400&h=400&fit=crop"),
            created_at,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn test_catalog_ids_are_unique_and_stable() {
        let first = default_catalog();
        let ids: HashSet<_> = first.iter().map(|p| p.id).collect();
        assert_eq!(ids.len(), 12);
        assert_eq!(first, default_catalog());
    }

    #[test]
    fn test_catalog_covers_three_categories() {
        let categories: HashSet<_> = default_catalog()
            .into_iter()
            .map(|p| p.category)
            .collect();
        assert_eq!(
            categories,
            HashSet::from(["Fruits".to_owned(), "Groceries".to_owned(), "Snacks".to_owned()])
        );
    }

    #[test]
    fn test_catalog_prices() {
        let catalog = default_catalog();
        let bananas = catalog.iter().find(|p| p.name == "Fresh Bananas");
        assert_eq!(bananas.map(|p| p.price.amount()), Some(Decimal::from(49)));
    }
}
