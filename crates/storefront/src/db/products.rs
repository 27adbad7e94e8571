//! Product repository for database operations.
//!
//! The storefront only reads the catalog. Rows are written by
//! `qd-cli seed`, which goes through [`ProductRepository::insert_missing`].

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use quickdrop_core::{Price, Product, ProductId};

use super::StoreError;

/// Internal row type for database queries.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ProductRow {
    id: Uuid,
    name: String,
    category: String,
    price: Decimal,
    #[sqlx(rename = "imageUrl")]
    image_url: String,
    #[sqlx(rename = "createdAt")]
    created_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = StoreError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let price = Price::new(row.price).map_err(|e| {
            StoreError::DataCorruption(format!("invalid price for product {}: {e}", row.id))
        })?;

        Ok(Self {
            id: ProductId::new(row.id),
            name: row.name,
            category: row.category,
            price,
            image_url: row.image_url,
            created_at: row.created_at,
        })
    }
}

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List every product, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` if the query fails.
    /// Returns `StoreError::DataCorruption` if a stored price is negative.
    pub async fn list(&self) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query_as::<_, ProductRow>(
            r#"
            SELECT id, name, category, price, "imageUrl", "createdAt"
            FROM "Product"
            ORDER BY "createdAt" DESC, name ASC
            "#,
        )
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Product::try_from).collect()
    }

    /// Insert products whose id is not in the table yet.
    ///
    /// Returns the number of rows actually inserted.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` if the query fails.
    pub async fn insert_missing(&self, products: &[Product]) -> Result<u64, StoreError> {
        if products.is_empty() {
            return Ok(0);
        }

        let mut builder = sqlx::QueryBuilder::<sqlx::Postgres>::new(
            r#"INSERT INTO "Product" (id, name, category, price, "imageUrl", "createdAt") "#,
        );
        builder.push_values(products, |mut row, product| {
            row.push_bind(product.id)
                .push_bind(&product.name)
                .push_bind(&product.category)
                .push_bind(product.price.amount())
                .push_bind(&product.image_url)
                .push_bind(product.created_at);
        });
        builder.push(" ON CONFLICT (id) DO NOTHING");

        let result = builder.build().execute(self.pool).await?;
        Ok(result.rows_affected())
    }
}
