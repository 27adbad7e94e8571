//! The data-access facade.
//!
//! Every read and write the storefront makes goes through [`DataAccess`]. It
//! calls the primary store under a time bound and, when the store does not
//! answer, applies the degradation from [`super::policy`]:
//!
//! | Entity | Read | Write |
//! |--------|------|-------|
//! | User | fallback store | fallback store |
//! | Product | empty list | - |
//! | Order | empty list | synthetic unsaved order |
//! | OrderItem | - | carry on without items |
//!
//! Callers never learn which store answered, except through
//! [`Order::persisted`].

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use quickdrop_core::{
    Email, Order, OrderId, OrderItem, OrderItemDraft, OrderStatus, Price, Product, User, UserId,
};

use super::policy::{Access, Degrade, Entity, Resolution, resolve};
use crate::clock::Clock;
use crate::db::{OrderScope, PrimaryStore, StoreError, StoreResult, with_timeout};
use crate::fallback::FallbackStore;

/// Errors surfaced by the facade.
#[derive(Debug, Error)]
pub enum FacadeError {
    /// A write succeeded in no store.
    #[error("{entity} could not be saved: {source}")]
    WriteFailed {
        entity: Entity,
        #[source]
        source: StoreError,
    },
}

/// Construction parameters for [`DataAccess`].
#[derive(Debug, Clone, Copy)]
pub struct DataAccessOptions {
    /// Bound on every primary store call.
    pub store_timeout: Duration,
    /// Whether a failed order write may return a synthetic, unsaved order.
    pub allow_unsaved_orders: bool,
}

impl Default for DataAccessOptions {
    fn default() -> Self {
        Self {
            store_timeout: Duration::from_secs(3),
            allow_unsaved_orders: true,
        }
    }
}

/// Single entry point for stored data.
#[derive(Debug)]
pub struct DataAccess<S> {
    primary: Arc<S>,
    fallback: Arc<FallbackStore>,
    clock: Arc<dyn Clock>,
    options: DataAccessOptions,
}

impl<S: PrimaryStore> DataAccess<S> {
    /// Build a facade over `primary`, degrading user data into `fallback`.
    #[must_use]
    pub fn new(
        primary: Arc<S>,
        fallback: Arc<FallbackStore>,
        clock: Arc<dyn Clock>,
        options: DataAccessOptions,
    ) -> Self {
        Self {
            primary,
            fallback,
            clock,
            options,
        }
    }

    /// The primary store.
    #[must_use]
    pub const fn primary(&self) -> &Arc<S> {
        &self.primary
    }

    /// The fallback store.
    #[must_use]
    pub const fn fallback(&self) -> &Arc<FallbackStore> {
        &self.fallback
    }

    async fn call<T>(&self, call: impl Future<Output = StoreResult<T>>) -> StoreResult<T> {
        with_timeout(self.options.store_timeout, call).await
    }

    /// Whether the primary store answers a round trip in time.
    pub async fn primary_ready(&self) -> bool {
        self.call(self.primary.ping()).await.is_ok()
    }

    /// Find a user by exact email in the primary store, then the fallback.
    #[tracing::instrument(skip_all, fields(email = %email))]
    pub async fn find_user_by_email(&self, email: &Email) -> Option<User> {
        let outcome = self.call(self.primary.find_user_by_email(email)).await;
        match resolve(Entity::User, Access::Read, "find_user_by_email", outcome) {
            Resolution::Value(Some(user)) => Some(user),
            Resolution::Value(None) => self.fallback.find_by_email(email),
            Resolution::Degrade { action, .. } => {
                degraded_user(action, || self.fallback.find_by_email(email))
            }
        }
    }

    /// Get a user by id from the primary store, then the fallback.
    #[tracing::instrument(skip_all, fields(user_id = %id))]
    pub async fn get_user_by_id(&self, id: UserId) -> Option<User> {
        let outcome = self.call(self.primary.get_user_by_id(id)).await;
        match resolve(Entity::User, Access::Read, "get_user_by_id", outcome) {
            Resolution::Value(Some(user)) => Some(user),
            Resolution::Value(None) => self.fallback.get_by_id(id),
            Resolution::Degrade { action, .. } => {
                degraded_user(action, || self.fallback.get_by_id(id))
            }
        }
    }

    /// Create the user for `email`, or update its name and phone.
    ///
    /// Users written to the primary store are mirrored into the fallback
    /// store, so they stay resolvable during a later outage. When the primary
    /// store cannot be read or written the whole operation is served by the
    /// fallback store, keeping the id the primary store already holds.
    ///
    /// # Errors
    ///
    /// Returns `FacadeError::WriteFailed` if no store accepted the write.
    #[tracing::instrument(skip_all, fields(email = %email))]
    pub async fn create_or_update_user(
        &self,
        name: &str,
        email: &Email,
        phone: &str,
    ) -> Result<User, FacadeError> {
        let now = self.clock.now();
        // Identity read from the primary store, kept if the write then fails.
        let mut known = None;

        let write = match self.call(self.primary.find_user_by_email(email)).await {
            StoreResult::Ok(Some(existing)) => {
                let id = existing.id;
                known = Some(existing);
                match self.call(self.primary.update_user(id, name, phone)).await {
                    StoreResult::Ok(Some(user)) => StoreResult::Ok(user),
                    StoreResult::Ok(None) => StoreResult::Failed(StoreError::Constraint(format!(
                        "user {id} disappeared during update"
                    ))),
                    StoreResult::Absent => StoreResult::Absent,
                    StoreResult::Failed(error) => StoreResult::Failed(error),
                }
            }
            StoreResult::Ok(None) => {
                // Reuse an identity minted during an outage.
                let (id, created_at) = self
                    .fallback
                    .find_by_email(email)
                    .map_or_else(|| (UserId::generate(), now), |u| (u.id, u.created_at));
                let user = User {
                    id,
                    name: name.to_owned(),
                    email: email.clone(),
                    phone: phone.to_owned(),
                    created_at,
                };
                self.call(self.primary.insert_user(&user)).await
            }
            StoreResult::Absent => StoreResult::Absent,
            StoreResult::Failed(error) => StoreResult::Failed(error),
        };

        match resolve(Entity::User, Access::Write, "create_or_update_user", write) {
            Resolution::Value(user) => {
                self.fallback.put(user.clone());
                tracing::info!(user_id = %user.id, "user saved");
                Ok(user)
            }
            Resolution::Degrade {
                action: Degrade::UseFallbackStore,
                ..
            } => {
                let user = match known {
                    Some(existing) => {
                        let user = User {
                            name: name.to_owned(),
                            phone: phone.to_owned(),
                            ..existing
                        };
                        self.fallback.put(user.clone());
                        user
                    }
                    None => self.fallback.upsert(name, email, phone, now),
                };
                tracing::info!(user_id = %user.id, "user saved to fallback store");
                Ok(user)
            }
            Resolution::Degrade { error, .. } => Err(FacadeError::WriteFailed {
                entity: Entity::User,
                source: error,
            }),
        }
    }

    /// Every product, or an empty list if the primary store cannot answer.
    pub async fn get_products(&self) -> Vec<Product> {
        let outcome = self.call(self.primary.list_products()).await;
        match resolve(Entity::Product, Access::Read, "get_products", outcome) {
            Resolution::Value(products) => products,
            Resolution::Degrade { .. } => Vec::new(),
        }
    }

    /// Place an order: header, then items as one batch, then a joined re-read.
    ///
    /// A failed item batch keeps the order (its items are left off). A failed
    /// re-read returns what was written. A failed header write returns a
    /// synthetic order with `persisted == false` and no items, unless unsaved
    /// orders are disabled.
    ///
    /// # Errors
    ///
    /// Returns `FacadeError::WriteFailed` if the header could not be written
    /// and unsaved orders are disabled.
    #[tracing::instrument(skip_all, fields(user_id = %user_id, order_id = tracing::field::Empty))]
    pub async fn create_order(
        &self,
        user_id: UserId,
        address: &str,
        drafts: Vec<OrderItemDraft>,
        total_price: Price,
    ) -> Result<Order, FacadeError> {
        let header = Order {
            id: OrderId::generate(),
            user_id,
            address: address.to_owned(),
            total_price,
            status: OrderStatus::Placed,
            created_at: self.clock.now(),
            items: Vec::new(),
            user: None,
            persisted: true,
        };
        tracing::Span::current().record("order_id", tracing::field::display(header.id));

        let items: Vec<OrderItem> = drafts
            .into_iter()
            .map(|draft| draft.into_item(header.id))
            .collect();

        let outcome = self.call(self.primary.insert_order(&header)).await;
        if let Resolution::Degrade { action, error } =
            resolve(Entity::Order, Access::Write, "insert_order", outcome)
        {
            return self.degraded_order(action, error, header);
        }

        let outcome = self.call(self.primary.insert_order_items(&items)).await;
        let items_saved = match resolve(
            Entity::OrderItem,
            Access::Write,
            "insert_order_items",
            outcome,
        ) {
            Resolution::Value(()) => true,
            Resolution::Degrade { .. } => {
                tracing::warn!(
                    order_id = %header.id,
                    item_count = items.len(),
                    "order saved without its items"
                );
                false
            }
        };

        let outcome = self.call(self.primary.get_order(header.id)).await;
        match resolve(Entity::Order, Access::Read, "get_order", outcome) {
            Resolution::Value(Some(order)) => {
                tracing::info!(order_id = %order.id, total = %order.total_price, "order placed");
                Ok(order)
            }
            Resolution::Value(None) | Resolution::Degrade { .. } => {
                let mut order = header;
                if items_saved {
                    order.items = items;
                }
                tracing::info!(order_id = %order.id, total = %order.total_price, "order placed");
                Ok(order)
            }
        }
    }

    fn degraded_order(
        &self,
        action: Degrade,
        error: StoreError,
        header: Order,
    ) -> Result<Order, FacadeError> {
        if action == Degrade::SyntheticOrder && self.options.allow_unsaved_orders {
            tracing::warn!(
                order_id = %header.id,
                user_id = %header.user_id,
                total = %header.total_price,
                error = %error,
                "returning unsaved order"
            );
            sentry::capture_message(
                &format!("order {} returned unsaved: {error}", header.id),
                sentry::Level::Warning,
            );
            return Ok(Order {
                persisted: false,
                ..header
            });
        }

        Err(FacadeError::WriteFailed {
            entity: Entity::Order,
            source: error,
        })
    }

    /// Orders of one user, newest first. Empty if the store cannot answer.
    pub async fn get_user_orders(&self, user_id: UserId) -> Vec<Order> {
        self.list_orders(OrderScope::ForUser(user_id), "get_user_orders")
            .await
    }

    /// Every order, newest first. Empty if the store cannot answer.
    pub async fn get_all_orders(&self) -> Vec<Order> {
        self.list_orders(OrderScope::All, "get_all_orders").await
    }

    async fn list_orders(&self, scope: OrderScope, operation: &'static str) -> Vec<Order> {
        let outcome = self.call(self.primary.list_orders(scope)).await;
        match resolve(Entity::Order, Access::Read, operation, outcome) {
            Resolution::Value(orders) => orders,
            Resolution::Degrade { .. } => Vec::new(),
        }
    }
}

fn degraded_user(action: Degrade, lookup: impl FnOnce() -> Option<User>) -> Option<User> {
    match action {
        Degrade::UseFallbackStore => lookup(),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::*;
    use crate::clock::ManualClock;
    use crate::db::memory::{MemoryStore, StoreHealth};

    fn facade(store: MemoryStore, options: DataAccessOptions) -> DataAccess<MemoryStore> {
        DataAccess::new(
            Arc::new(store),
            Arc::new(FallbackStore::new()),
            Arc::new(ManualClock::new(Utc::now())),
            options,
        )
    }

    fn email(s: &str) -> Email {
        Email::parse(s).unwrap()
    }

    fn product(name: &str, price: i64) -> Product {
        Product {
            id: quickdrop_core::ProductId::generate(),
            name: name.to_owned(),
            category: "Fruits".to_owned(),
            price: Price::new(Decimal::from(price)).unwrap(),
            image_url: String::new(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_login_twice_updates_in_primary() {
        let data = facade(MemoryStore::new(), DataAccessOptions::default());
        let first = data
            .create_or_update_user("Alice", &email("alice@example.com"), "1")
            .await
            .unwrap();
        let second = data
            .create_or_update_user("Alicia", &email("alice@example.com"), "2")
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.name, "Alicia");
        assert_eq!(second.phone, "2");
        assert_eq!(data.primary().user_count(), 1);
    }

    #[tokio::test]
    async fn test_login_while_unreachable_uses_fallback() {
        let store = MemoryStore::new();
        store.set_health(StoreHealth::Unreachable);
        let data = facade(store, DataAccessOptions::default());

        let first = data
            .create_or_update_user("Bob", &email("bob@example.com"), "1")
            .await
            .unwrap();
        let second = data
            .create_or_update_user("Robert", &email("bob@example.com"), "2")
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.name, "Robert");
        assert_eq!(data.fallback().len(), 1);
        assert_eq!(data.get_user_by_id(first.id).await.unwrap().name, "Robert");
    }

    #[tokio::test]
    async fn test_recovered_primary_keeps_outage_identity() {
        let data = facade(MemoryStore::new(), DataAccessOptions::default());
        data.primary().set_health(StoreHealth::Unprovisioned);
        let offline = data
            .create_or_update_user("Cy", &email("cy@example.com"), "1")
            .await
            .unwrap();

        data.primary().set_health(StoreHealth::Healthy);
        let online = data
            .create_or_update_user("Cy", &email("cy@example.com"), "1")
            .await
            .unwrap();
        assert_eq!(offline.id, online.id);
        assert_eq!(data.primary().user_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_update_keeps_primary_identity() {
        let store = MemoryStore::new();
        let existing = User {
            id: UserId::generate(),
            name: "Zed".to_owned(),
            email: email("zed@example.com"),
            phone: "1".to_owned(),
            created_at: Utc::now(),
        };
        assert!(store.insert_user(&existing).await.is_ok());
        store.fail_user_updates(true);
        let data = facade(store, DataAccessOptions::default());

        let user = data
            .create_or_update_user("Zedd", &email("zed@example.com"), "2")
            .await
            .unwrap();

        assert_eq!(user.id, existing.id);
        assert_eq!(user.created_at, existing.created_at);
        assert_eq!(user.name, "Zedd");
        assert_eq!(user.phone, "2");
        assert_eq!(data.fallback().get_by_id(existing.id).unwrap(), user);
        assert_eq!(data.fallback().len(), 1);
    }

    #[tokio::test]
    async fn test_timeout_counts_as_failure() {
        let store = MemoryStore::new();
        store.set_latency(Some(Duration::from_millis(200)));
        let data = facade(
            store,
            DataAccessOptions {
                store_timeout: Duration::from_millis(10),
                ..DataAccessOptions::default()
            },
        );

        let user = data
            .create_or_update_user("Dee", &email("dee@example.com"), "1")
            .await
            .unwrap();
        assert_eq!(data.fallback().get_by_id(user.id).unwrap(), user);
        assert!(data.get_products().await.is_empty());
    }

    #[tokio::test]
    async fn test_order_round_trip_with_items() {
        let apple = product("Apple", 89);
        let data = facade(
            MemoryStore::with_products(vec![apple.clone()]),
            DataAccessOptions::default(),
        );
        let user = data
            .create_or_update_user("Eve", &email("eve@example.com"), "1")
            .await
            .unwrap();

        let drafts = vec![OrderItemDraft {
            product_id: apple.id,
            quantity: 2,
            price: apple.price,
        }];
        let total = Price::new(Decimal::from(178)).unwrap();
        let order = data
            .create_order(user.id, "1 Main St", drafts, total)
            .await
            .unwrap();

        assert!(order.persisted);
        assert_eq!(order.total_price, total);
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].product.as_ref().unwrap().name, "Apple");
        assert_eq!(order.user.unwrap().id, user.id);
        assert_eq!(data.get_user_orders(user.id).await.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_item_batch_keeps_order() {
        let apple = product("Apple", 89);
        let store = MemoryStore::with_products(vec![apple.clone()]);
        store.fail_order_items(true);
        let data = facade(store, DataAccessOptions::default());
        let user = data
            .create_or_update_user("Fay", &email("fay@example.com"), "1")
            .await
            .unwrap();

        let drafts = vec![OrderItemDraft {
            product_id: apple.id,
            quantity: 1,
            price: apple.price,
        }];
        let order = data
            .create_order(user.id, "2 Main St", drafts, apple.price)
            .await
            .unwrap();

        assert!(order.persisted);
        assert!(order.items.is_empty());
        assert_eq!(data.primary().order_count(), 1);
    }

    #[tokio::test]
    async fn test_unwritable_order_is_synthetic() {
        let store = MemoryStore::new();
        store.set_health(StoreHealth::Unreachable);
        let data = facade(store, DataAccessOptions::default());

        let apple = product("Apple", 42);
        let drafts = vec![OrderItemDraft {
            product_id: apple.id,
            quantity: 1,
            price: apple.price,
        }];
        let total = Price::new(Decimal::from(42)).unwrap();
        let order = data
            .create_order(UserId::generate(), "3 Main St", drafts, total)
            .await
            .unwrap();

        assert!(!order.persisted);
        assert!(order.items.is_empty());
        assert_eq!(order.total_price, total);
        assert_eq!(order.address, "3 Main St");
    }

    #[tokio::test]
    async fn test_unwritable_order_fails_when_unsaved_disallowed() {
        let store = MemoryStore::new();
        store.set_health(StoreHealth::Unreachable);
        let data = facade(
            store,
            DataAccessOptions {
                allow_unsaved_orders: false,
                ..DataAccessOptions::default()
            },
        );

        let result = data
            .create_order(UserId::generate(), "4 Main St", Vec::new(), Price::ZERO)
            .await;
        assert!(matches!(
            result,
            Err(FacadeError::WriteFailed {
                entity: Entity::Order,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_reads_degrade_to_empty() {
        let store = MemoryStore::new();
        store.set_health(StoreHealth::Unprovisioned);
        let data = facade(store, DataAccessOptions::default());

        assert!(data.get_products().await.is_empty());
        assert!(data.get_all_orders().await.is_empty());
        assert!(data.get_user_orders(UserId::generate()).await.is_empty());
        assert!(data.find_user_by_email(&email("x@example.com")).await.is_none());
        assert!(!data.primary_ready().await);
    }
}
