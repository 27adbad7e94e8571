//! In-process [`PrimaryStore`] for tests.
//!
//! Behaves like the `PostgreSQL` schema (unique email, foreign keys, the
//! atomic passcode consume) and can be switched into the failure modes the
//! storefront has to survive.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};

use quickdrop_core::{
    Email, OneTimePasscode, Order, OrderId, OrderItem, OtpCode, PasscodeId, Product, User, UserId,
};

use super::{OrderScope, PrimaryStore, StoreError, StoreResult};

/// Simulated state of the primary database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreHealth {
    /// Everything works.
    #[default]
    Healthy,
    /// Every call fails with a connectivity error.
    Unreachable,
    /// Every table is missing.
    Unprovisioned,
}

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<UserId, User>,
    products: Vec<Product>,
    orders: HashMap<OrderId, Order>,
    items: Vec<OrderItem>,
    passcodes: Vec<OneTimePasscode>,
}

/// Memory-backed primary store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    health: Mutex<StoreHealth>,
    latency: Mutex<Option<Duration>>,
    fail_order_items: AtomicBool,
    fail_user_updates: AtomicBool,
}

impl MemoryStore {
    /// An empty, healthy store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A healthy store whose `"Product"` table holds `products`.
    #[must_use]
    pub fn with_products(products: Vec<Product>) -> Self {
        let store = Self::new();
        store.tables().products = products;
        store
    }

    /// Switch the simulated database state.
    pub fn set_health(&self, health: StoreHealth) {
        *self.health.lock().unwrap_or_else(PoisonError::into_inner) = health;
    }

    /// Delay every call by `latency` before answering.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock().unwrap_or_else(PoisonError::into_inner) = latency;
    }

    /// Make order item batches fail while headers still succeed.
    pub fn fail_order_items(&self, fail: bool) {
        self.fail_order_items.store(fail, Ordering::SeqCst);
    }

    /// Make user updates fail while user reads still succeed.
    pub fn fail_user_updates(&self, fail: bool) {
        self.fail_user_updates.store(fail, Ordering::SeqCst);
    }

    /// Number of stored orders.
    #[must_use]
    pub fn order_count(&self) -> usize {
        self.tables().orders.len()
    }

    /// Number of stored users.
    #[must_use]
    pub fn user_count(&self) -> usize {
        self.tables().users.len()
    }

    /// Snapshot of every stored passcode, oldest first.
    #[must_use]
    pub fn passcodes(&self) -> Vec<OneTimePasscode> {
        self.tables().passcodes.clone()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn gate<T>(&self, table: &str) -> Result<(), StoreResult<T>> {
        let latency = *self.latency.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let health = *self.health.lock().unwrap_or_else(PoisonError::into_inner);
        match health {
            StoreHealth::Healthy => Ok(()),
            StoreHealth::Unreachable => Err(StoreResult::Failed(StoreError::Unreachable(
                "connection refused".to_owned(),
            ))),
            StoreHealth::Unprovisioned => {
                let missing = StoreError::NotProvisioned(format!("relation \"{table}\""));
                Err(StoreResult::from(Err::<T, _>(missing)))
            }
        }
    }

    fn joined(tables: &Tables, order: &Order, with_user: bool) -> Order {
        let mut order = order.clone();
        order.user = if with_user {
            tables.users.get(&order.user_id).cloned()
        } else {
            None
        };
        order.items = tables
            .items
            .iter()
            .filter(|item| item.order_id == order.id)
            .map(|item| {
                let mut item = item.clone();
                item.product = tables
                    .products
                    .iter()
                    .find(|p| p.id == item.product_id)
                    .cloned();
                item
            })
            .collect();
        order
    }
}

impl PrimaryStore for MemoryStore {
    async fn find_user_by_email(&self, email: &Email) -> StoreResult<Option<User>> {
        if let Err(outcome) = self.gate("User").await {
            return outcome;
        }
        let tables = self.tables();
        StoreResult::Ok(tables.users.values().find(|u| &u.email == email).cloned())
    }

    async fn get_user_by_id(&self, id: UserId) -> StoreResult<Option<User>> {
        if let Err(outcome) = self.gate("User").await {
            return outcome;
        }
        StoreResult::Ok(self.tables().users.get(&id).cloned())
    }

    async fn insert_user(&self, user: &User) -> StoreResult<User> {
        if let Err(outcome) = self.gate("User").await {
            return outcome;
        }
        let mut tables = self.tables();
        if let Some(existing) = tables.users.values_mut().find(|u| u.email == user.email) {
            existing.name.clone_from(&user.name);
            existing.phone.clone_from(&user.phone);
            return StoreResult::Ok(existing.clone());
        }
        tables.users.insert(user.id, user.clone());
        StoreResult::Ok(user.clone())
    }

    async fn update_user(&self, id: UserId, name: &str, phone: &str) -> StoreResult<Option<User>> {
        if let Err(outcome) = self.gate("User").await {
            return outcome;
        }
        if self.fail_user_updates.load(Ordering::SeqCst) {
            return StoreResult::Failed(StoreError::Unreachable(
                "connection reset while updating user".to_owned(),
            ));
        }
        let mut tables = self.tables();
        StoreResult::Ok(tables.users.get_mut(&id).map(|user| {
            name.clone_into(&mut user.name);
            phone.clone_into(&mut user.phone);
            user.clone()
        }))
    }

    async fn list_products(&self) -> StoreResult<Vec<Product>> {
        if let Err(outcome) = self.gate("Product").await {
            return outcome;
        }
        let mut products = self.tables().products.clone();
        products.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.name.cmp(&b.name)));
        StoreResult::Ok(products)
    }

    async fn insert_order(&self, order: &Order) -> StoreResult<()> {
        if let Err(outcome) = self.gate("Order").await {
            return outcome;
        }
        let mut tables = self.tables();
        if !tables.users.contains_key(&order.user_id) {
            return StoreResult::Failed(StoreError::Constraint(format!(
                "\"Order\".\"userId\" references unknown user {}",
                order.user_id
            )));
        }
        let mut header = order.clone();
        header.items.clear();
        header.user = None;
        header.persisted = true;
        tables.orders.insert(header.id, header);
        StoreResult::Ok(())
    }

    async fn insert_order_items(&self, items: &[OrderItem]) -> StoreResult<()> {
        if let Err(outcome) = self.gate("OrderItem").await {
            return outcome;
        }
        if self.fail_order_items.load(Ordering::SeqCst) {
            return StoreResult::Failed(StoreError::Unreachable(
                "connection reset while inserting order items".to_owned(),
            ));
        }
        let mut tables = self.tables();
        for item in items {
            if !tables.orders.contains_key(&item.order_id) {
                return StoreResult::Failed(StoreError::Constraint(format!(
                    "\"OrderItem\".\"orderId\" references unknown order {}",
                    item.order_id
                )));
            }
            if !tables.products.iter().any(|p| p.id == item.product_id) {
                return StoreResult::Failed(StoreError::Constraint(format!(
                    "\"OrderItem\".\"productId\" references unknown product {}",
                    item.product_id
                )));
            }
        }
        tables.items.extend(items.iter().cloned().map(|mut item| {
            item.product = None;
            item
        }));
        StoreResult::Ok(())
    }

    async fn get_order(&self, id: OrderId) -> StoreResult<Option<Order>> {
        if let Err(outcome) = self.gate("Order").await {
            return outcome;
        }
        let tables = self.tables();
        StoreResult::Ok(
            tables
                .orders
                .get(&id)
                .map(|order| Self::joined(&tables, order, true)),
        )
    }

    async fn list_orders(&self, scope: OrderScope) -> StoreResult<Vec<Order>> {
        if let Err(outcome) = self.gate("Order").await {
            return outcome;
        }
        let tables = self.tables();
        let mut orders: Vec<Order> = tables
            .orders
            .values()
            .filter(|order| match scope {
                OrderScope::All => true,
                OrderScope::ForUser(user_id) => order.user_id == user_id,
            })
            .map(|order| Self::joined(&tables, order, matches!(scope, OrderScope::All)))
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        StoreResult::Ok(orders)
    }

    async fn insert_passcode(&self, passcode: &OneTimePasscode) -> StoreResult<()> {
        if let Err(outcome) = self.gate("OneTimePasscode").await {
            return outcome;
        }
        self.tables().passcodes.push(passcode.clone());
        StoreResult::Ok(())
    }

    async fn consume_passcode(
        &self,
        email: &Email,
        code: &OtpCode,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<PasscodeId>> {
        if let Err(outcome) = self.gate("OneTimePasscode").await {
            return outcome;
        }
        let mut tables = self.tables();
        let newest = tables
            .passcodes
            .iter_mut()
            .filter(|p| &p.email == email && &p.code == code && p.is_eligible_at(now))
            .max_by_key(|p| p.created_at);
        StoreResult::Ok(newest.map(|passcode| {
            passcode.used = true;
            passcode.id
        }))
    }

    async fn delete_expired_passcodes(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        if let Err(outcome) = self.gate("OneTimePasscode").await {
            return outcome;
        }
        let mut tables = self.tables();
        let before = tables.passcodes.len();
        tables.passcodes.retain(|p| !p.is_expired_at(now));
        StoreResult::Ok(u64::try_from(before - tables.passcodes.len()).unwrap_or(u64::MAX))
    }

    async fn ping(&self) -> StoreResult<()> {
        if let Err(outcome) = self.gate("pg_catalog").await {
            return outcome;
        }
        StoreResult::Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration as ChronoDuration;

    use super::*;

    fn alice() -> User {
        User {
            id: UserId::generate(),
            name: "Alice".to_owned(),
            email: Email::parse("alice@example.com").unwrap(),
            phone: "555-0100".to_owned(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_user_upserts_on_email() {
        let store = MemoryStore::new();
        let first = alice();
        let StoreResult::Ok(saved) = store.insert_user(&first).await else {
            panic!("insert failed");
        };
        assert_eq!(saved.id, first.id);

        let mut second = alice();
        second.name = "Alicia".to_owned();
        let StoreResult::Ok(saved) = store.insert_user(&second).await else {
            panic!("upsert failed");
        };
        assert_eq!(saved.id, first.id);
        assert_eq!(saved.name, "Alicia");
        assert_eq!(store.user_count(), 1);
    }

    #[tokio::test]
    async fn test_health_modes() {
        let store = MemoryStore::new();
        store.set_health(StoreHealth::Unprovisioned);
        assert!(matches!(store.list_products().await, StoreResult::Absent));

        store.set_health(StoreHealth::Unreachable);
        assert!(matches!(
            store.list_products().await,
            StoreResult::Failed(StoreError::Unreachable(_))
        ));
    }

    #[tokio::test]
    async fn test_order_requires_known_user() {
        let store = MemoryStore::new();
        let order = Order {
            id: OrderId::generate(),
            user_id: UserId::generate(),
            address: "1 Main St".to_owned(),
            total_price: quickdrop_core::Price::ZERO,
            status: quickdrop_core::OrderStatus::Placed,
            created_at: Utc::now(),
            items: Vec::new(),
            user: None,
            persisted: true,
        };
        assert!(matches!(
            store.insert_order(&order).await,
            StoreResult::Failed(StoreError::Constraint(_))
        ));
    }

    #[tokio::test]
    async fn test_consume_marks_newest_match_once() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let email = Email::parse("alice@example.com").unwrap();
        let code = OtpCode::parse("123456").unwrap();
        let older = OneTimePasscode::issue(email.clone(), code.clone(), now);
        let newer =
            OneTimePasscode::issue(email.clone(), code.clone(), now + ChronoDuration::minutes(1));
        let _ = store.insert_passcode(&older).await;
        let _ = store.insert_passcode(&newer).await;

        let later = now + ChronoDuration::minutes(2);
        let StoreResult::Ok(first) = store.consume_passcode(&email, &code, later).await else {
            panic!("consume failed");
        };
        assert_eq!(first, Some(newer.id));

        let StoreResult::Ok(second) = store.consume_passcode(&email, &code, later).await else {
            panic!("consume failed");
        };
        assert_eq!(second, Some(older.id));
    }

    #[tokio::test]
    async fn test_delete_expired_keeps_live_rows() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let email = Email::parse("alice@example.com").unwrap();
        let stale = OneTimePasscode::issue(
            email.clone(),
            OtpCode::parse("111111").unwrap(),
            now - ChronoDuration::minutes(30),
        );
        let live = OneTimePasscode::issue(email, OtpCode::parse("222222").unwrap(), now);
        let _ = store.insert_passcode(&stale).await;
        let _ = store.insert_passcode(&live).await;

        assert!(matches!(
            store.delete_expired_passcodes(now).await,
            StoreResult::Ok(1)
        ));
        assert_eq!(store.passcodes(), vec![live]);
    }
}
