//! What to do when the primary store cannot answer.
//!
//! Each `(entity, access)` pair has one [`Policy`] naming the degradation for
//! an unprovisioned table and for a hard failure. Services never decide this
//! inline; they pass the raw [`StoreResult`] through [`resolve`] and act on
//! the returned [`Resolution`].

use std::fmt;

use crate::db::{StoreError, StoreResult};

/// Stored entity kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    User,
    Product,
    Order,
    OrderItem,
    Passcode,
}

impl Entity {
    /// Name of the backing table.
    #[must_use]
    pub const fn table(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Product => "Product",
            Self::Order => "Order",
            Self::OrderItem => "OrderItem",
            Self::Passcode => "OneTimePasscode",
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

/// Kind of access being made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    Read,
    Write,
}

/// Degradation applied when the primary store does not answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Degrade {
    /// Serve the operation from the in-memory fallback store.
    UseFallbackStore,
    /// Answer with nothing (no rows, no record).
    Empty,
    /// Hand back an unsaved order built from the request.
    SyntheticOrder,
    /// Carry on without this write.
    Continue,
    /// Surface the failure to the caller.
    Propagate,
}

/// Degradations for one `(entity, access)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    /// When the backing table is not provisioned.
    pub on_absent: Degrade,
    /// On any other failure, timeouts included.
    pub on_failed: Degrade,
}

impl Policy {
    const fn both(action: Degrade) -> Self {
        Self {
            on_absent: action,
            on_failed: action,
        }
    }
}

/// The policy table.
#[must_use]
pub const fn policy(entity: Entity, access: Access) -> Policy {
    match (entity, access) {
        (Entity::User, _) => Policy::both(Degrade::UseFallbackStore),
        (Entity::Product | Entity::Order, Access::Read) => Policy::both(Degrade::Empty),
        (Entity::Order, Access::Write) => Policy::both(Degrade::SyntheticOrder),
        (Entity::OrderItem, Access::Write) => Policy::both(Degrade::Continue),
        (Entity::OrderItem, Access::Read) => Policy::both(Degrade::Empty),
        (Entity::Passcode | Entity::Product, _) => Policy::both(Degrade::Propagate),
    }
}

/// A store outcome after the policy has been applied.
#[derive(Debug)]
pub enum Resolution<T> {
    /// The primary store answered.
    Value(T),
    /// The primary store did not answer; apply `action`.
    Degrade {
        action: Degrade,
        error: StoreError,
    },
}

/// Apply the policy for `(entity, access)` to a store outcome.
///
/// Degradations are logged here, naming the entity and operation, so callers
/// only need to act on them.
pub fn resolve<T>(
    entity: Entity,
    access: Access,
    operation: &'static str,
    outcome: StoreResult<T>,
) -> Resolution<T> {
    let policy = policy(entity, access);
    match outcome {
        StoreResult::Ok(value) => Resolution::Value(value),
        StoreResult::Absent => {
            tracing::debug!(
                entity = %entity,
                operation,
                action = ?policy.on_absent,
                "table not provisioned, degrading"
            );
            Resolution::Degrade {
                action: policy.on_absent,
                error: StoreError::NotProvisioned(format!("\"{}\"", entity.table())),
            }
        }
        StoreResult::Failed(error) => {
            tracing::warn!(
                entity = %entity,
                operation,
                action = ?policy.on_failed,
                error = %error,
                "primary store failed, degrading"
            );
            Resolution::Degrade {
                action: policy.on_failed,
                error,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_users_always_fall_back() {
        for access in [Access::Read, Access::Write] {
            assert_eq!(
                policy(Entity::User, access),
                Policy::both(Degrade::UseFallbackStore)
            );
        }
    }

    #[test]
    fn test_passcodes_never_degrade() {
        for access in [Access::Read, Access::Write] {
            assert_eq!(
                policy(Entity::Passcode, access),
                Policy::both(Degrade::Propagate)
            );
        }
    }

    #[test]
    fn test_reads_of_catalog_and_orders_go_empty() {
        assert_eq!(policy(Entity::Product, Access::Read).on_failed, Degrade::Empty);
        assert_eq!(policy(Entity::Order, Access::Read).on_absent, Degrade::Empty);
    }

    #[test]
    fn test_order_writes_degrade_to_synthetic_and_items_continue() {
        assert_eq!(
            policy(Entity::Order, Access::Write).on_failed,
            Degrade::SyntheticOrder
        );
        assert_eq!(
            policy(Entity::OrderItem, Access::Write).on_failed,
            Degrade::Continue
        );
    }

    #[test]
    fn test_resolve_passes_values_through() {
        let resolution = resolve(Entity::Product, Access::Read, "list", StoreResult::Ok(3));
        assert!(matches!(resolution, Resolution::Value(3)));
    }

    #[test]
    fn test_resolve_absent_reports_missing_table() {
        let resolution: Resolution<()> =
            resolve(Entity::Order, Access::Read, "list", StoreResult::Absent);
        let Resolution::Degrade { action, error } = resolution else {
            panic!("expected degradation");
        };
        assert_eq!(action, Degrade::Empty);
        assert!(matches!(error, StoreError::NotProvisioned(ref table) if table == "\"Order\""));
    }

    #[test]
    fn test_resolve_failure_keeps_error() {
        let resolution: Resolution<()> = resolve(
            Entity::Passcode,
            Access::Write,
            "insert",
            StoreResult::Failed(StoreError::Timeout(Duration::from_secs(3))),
        );
        assert!(matches!(
            resolution,
            Resolution::Degrade {
                action: Degrade::Propagate,
                error: StoreError::Timeout(_)
            }
        ));
    }
}
