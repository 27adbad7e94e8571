//! [`PrimaryStore`] backed by a `PostgreSQL` pool.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use quickdrop_core::{
    Email, OneTimePasscode, Order, OrderId, OrderItem, OtpCode, PasscodeId, Product, User, UserId,
};

use super::{
    OrderRepository, OrderScope, PasscodeRepository, PrimaryStore, ProductRepository, StoreError,
    StoreResult, UserRepository,
};

/// The production primary store.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl PrimaryStore for PgStore {
    async fn find_user_by_email(&self, email: &Email) -> StoreResult<Option<User>> {
        UserRepository::new(&self.pool)
            .get_by_email(email)
            .await
            .into()
    }

    async fn get_user_by_id(&self, id: UserId) -> StoreResult<Option<User>> {
        UserRepository::new(&self.pool).get_by_id(id).await.into()
    }

    async fn insert_user(&self, user: &User) -> StoreResult<User> {
        UserRepository::new(&self.pool).upsert(user).await.into()
    }

    async fn update_user(&self, id: UserId, name: &str, phone: &str) -> StoreResult<Option<User>> {
        UserRepository::new(&self.pool)
            .update_profile(id, name, phone)
            .await
            .into()
    }

    async fn list_products(&self) -> StoreResult<Vec<Product>> {
        ProductRepository::new(&self.pool).list().await.into()
    }

    async fn insert_order(&self, order: &Order) -> StoreResult<()> {
        OrderRepository::new(&self.pool)
            .insert_header(order)
            .await
            .into()
    }

    async fn insert_order_items(&self, items: &[OrderItem]) -> StoreResult<()> {
        OrderRepository::new(&self.pool)
            .insert_items(items)
            .await
            .into()
    }

    async fn get_order(&self, id: OrderId) -> StoreResult<Option<Order>> {
        OrderRepository::new(&self.pool).get(id).await.into()
    }

    async fn list_orders(&self, scope: OrderScope) -> StoreResult<Vec<Order>> {
        OrderRepository::new(&self.pool).list(scope).await.into()
    }

    async fn insert_passcode(&self, passcode: &OneTimePasscode) -> StoreResult<()> {
        PasscodeRepository::new(&self.pool)
            .insert(passcode)
            .await
            .into()
    }

    async fn consume_passcode(
        &self,
        email: &Email,
        code: &OtpCode,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<PasscodeId>> {
        PasscodeRepository::new(&self.pool)
            .consume(email, code, now)
            .await
            .into()
    }

    async fn delete_expired_passcodes(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        PasscodeRepository::new(&self.pool)
            .delete_expired(now)
            .await
            .into()
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(StoreError::from)
            .into()
    }
}
