//! Order repository for database operations.
//!
//! An order is written in two steps: the header row, then all of its items
//! in one multi-row insert. Reads join the owning user, the items and each
//! item's product.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use quickdrop_core::{
    Email, Order, OrderId, OrderItem, OrderItemId, OrderStatus, Price, Product, ProductId, User,
    UserId,
};

use super::{OrderScope, StoreError};

/// Order header joined with its (optional) user.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    #[sqlx(rename = "userId")]
    user_id: Uuid,
    address: String,
    #[sqlx(rename = "totalPrice")]
    total_price: Decimal,
    status: String,
    #[sqlx(rename = "createdAt")]
    created_at: DateTime<Utc>,
    user_name: Option<String>,
    user_email: Option<String>,
    user_phone: Option<String>,
    user_created_at: Option<DateTime<Utc>>,
}

impl OrderRow {
    fn into_order(self, with_user: bool) -> Result<Order, StoreError> {
        let total_price = Price::new(self.total_price).map_err(|e| {
            StoreError::DataCorruption(format!("invalid total for order {}: {e}", self.id))
        })?;
        let status = self
            .status
            .parse::<OrderStatus>()
            .map_err(StoreError::DataCorruption)?;

        let user = match (
            with_user,
            self.user_name,
            self.user_email,
            self.user_phone,
            self.user_created_at,
        ) {
            (true, Some(name), Some(email), Some(phone), Some(created_at)) => {
                let email = Email::parse(&email).map_err(|e| {
                    StoreError::DataCorruption(format!("invalid email in database: {e}"))
                })?;
                Some(User {
                    id: UserId::new(self.user_id),
                    name,
                    email,
                    phone,
                    created_at,
                })
            }
            _ => None,
        };

        Ok(Order {
            id: OrderId::new(self.id),
            user_id: UserId::new(self.user_id),
            address: self.address,
            total_price,
            status,
            created_at: self.created_at,
            items: Vec::new(),
            user,
            persisted: true,
        })
    }
}

/// Order item joined with its (optional) product.
#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    id: Uuid,
    #[sqlx(rename = "orderId")]
    order_id: Uuid,
    #[sqlx(rename = "productId")]
    product_id: Uuid,
    quantity: i32,
    price: Decimal,
    product_name: Option<String>,
    product_category: Option<String>,
    product_price: Option<Decimal>,
    product_image_url: Option<String>,
    product_created_at: Option<DateTime<Utc>>,
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = StoreError;

    fn try_from(row: OrderItemRow) -> Result<Self, Self::Error> {
        let quantity = u32::try_from(row.quantity).map_err(|_| {
            StoreError::DataCorruption(format!(
                "invalid quantity {} for order item {}",
                row.quantity, row.id
            ))
        })?;
        let price = Price::new(row.price).map_err(|e| {
            StoreError::DataCorruption(format!("invalid price for order item {}: {e}", row.id))
        })?;

        let product = match (
            row.product_name,
            row.product_category,
            row.product_price,
            row.product_image_url,
            row.product_created_at,
        ) {
            (Some(name), Some(category), Some(product_price), Some(image_url), Some(created_at)) => {
                let product_price = Price::new(product_price).map_err(|e| {
                    StoreError::DataCorruption(format!(
                        "invalid price for product {}: {e}",
                        row.product_id
                    ))
                })?;
                Some(Product {
                    id: ProductId::new(row.product_id),
                    name,
                    category,
                    price: product_price,
                    image_url,
                    created_at,
                })
            }
            _ => None,
        };

        Ok(Self {
            id: OrderItemId::new(row.id),
            order_id: OrderId::new(row.order_id),
            product_id: ProductId::new(row.product_id),
            quantity,
            price,
            product,
        })
    }
}

const ORDER_SELECT: &str = r#"
    SELECT o.id, o."userId", o.address, o."totalPrice", o.status, o."createdAt",
           u.name AS user_name, u.email AS user_email, u.phone AS user_phone,
           u."createdAt" AS user_created_at
    FROM "Order" o
    LEFT JOIN "User" u ON u.id = o."userId"
"#;

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert an order header. The order's items are not written.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` if the insert fails, including a
    /// foreign key violation when the user row does not exist.
    pub async fn insert_header(&self, order: &Order) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO "Order" (id, "userId", address, "totalPrice", status, "createdAt")
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(order.id)
        .bind(order.user_id)
        .bind(&order.address)
        .bind(order.total_price.amount())
        .bind(order.status.as_str())
        .bind(order.created_at)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Insert order items with a single statement, so either all rows land
    /// or none do.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` if the insert fails.
    /// Returns `StoreError::DataCorruption` if a quantity does not fit the column.
    pub async fn insert_items(&self, items: &[OrderItem]) -> Result<(), StoreError> {
        if items.is_empty() {
            return Ok(());
        }

        let quantities = items
            .iter()
            .map(|item| {
                i32::try_from(item.quantity).map_err(|_| {
                    StoreError::DataCorruption(format!("quantity {} out of range", item.quantity))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut builder = sqlx::QueryBuilder::<sqlx::Postgres>::new(
            r#"INSERT INTO "OrderItem" (id, "orderId", "productId", quantity, price) "#,
        );
        builder.push_values(items.iter().zip(quantities), |mut row, (item, quantity)| {
            row.push_bind(item.id)
                .push_bind(item.order_id)
                .push_bind(item.product_id)
                .push_bind(quantity)
                .push_bind(item.price.amount());
        });

        builder.build().execute(self.pool).await?;
        Ok(())
    }

    /// Get one order with its user, items and products.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` if a query fails.
    /// Returns `StoreError::DataCorruption` if a stored row is invalid.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let query = format!("{ORDER_SELECT} WHERE o.id = $1");
        let row = sqlx::query_as::<_, OrderRow>(&query)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut orders = vec![row.into_order(true)?];
        self.attach_items(&mut orders).await?;
        Ok(orders.pop())
    }

    /// List orders newest first, with items and products attached.
    ///
    /// Listing every order also attaches each order's user.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` if a query fails.
    /// Returns `StoreError::DataCorruption` if a stored row is invalid.
    pub async fn list(&self, scope: OrderScope) -> Result<Vec<Order>, StoreError> {
        let rows = match scope {
            OrderScope::All => {
                let query = format!(r#"{ORDER_SELECT} ORDER BY o."createdAt" DESC"#);
                sqlx::query_as::<_, OrderRow>(&query)
                    .fetch_all(self.pool)
                    .await?
            }
            OrderScope::ForUser(user_id) => {
                let query =
                    format!(r#"{ORDER_SELECT} WHERE o."userId" = $1 ORDER BY o."createdAt" DESC"#);
                sqlx::query_as::<_, OrderRow>(&query)
                    .bind(user_id)
                    .fetch_all(self.pool)
                    .await?
            }
        };

        let with_user = matches!(scope, OrderScope::All);
        let mut orders = rows
            .into_iter()
            .map(|row| row.into_order(with_user))
            .collect::<Result<Vec<_>, _>>()?;
        self.attach_items(&mut orders).await?;
        Ok(orders)
    }

    async fn attach_items(&self, orders: &mut [Order]) -> Result<(), StoreError> {
        if orders.is_empty() {
            return Ok(());
        }

        let ids: Vec<Uuid> = orders.iter().map(|o| o.id.as_uuid()).collect();
        let rows = sqlx::query_as::<_, OrderItemRow>(
            r#"
            SELECT i.id, i."orderId", i."productId", i.quantity, i.price,
                   p.name AS product_name, p.category AS product_category,
                   p.price AS product_price, p."imageUrl" AS product_image_url,
                   p."createdAt" AS product_created_at
            FROM "OrderItem" i
            LEFT JOIN "Product" p ON p.id = i."productId"
            WHERE i."orderId" = ANY($1)
            ORDER BY i.id
            "#,
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        let mut by_order: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        for row in rows {
            let item = OrderItem::try_from(row)?;
            by_order.entry(item.order_id).or_default().push(item);
        }

        for order in orders {
            order.items = by_order.remove(&order.id).unwrap_or_default();
        }

        Ok(())
    }
}
