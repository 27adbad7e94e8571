//! Customer lookup handlers.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use quickdrop_core::{Email, Order, User};

use super::{ApiQuery, parse_user_id};
use crate::db::PrimaryStore;
use crate::error::{AppError, Result};
use crate::services::{Notifier, UserLookup};
use crate::state::AppState;

/// Customer lookup parameters. `userId` wins when both are given.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQuery {
    pub user_id: Option<String>,
    pub email: Option<String>,
}

impl UserQuery {
    fn lookup(&self) -> Result<UserLookup> {
        if self.user_id.is_some() {
            return parse_user_id(self.user_id.as_deref()).map(UserLookup::Id);
        }
        match self.email.as_deref().map(str::trim) {
            Some(email) if !email.is_empty() => Ok(UserLookup::Email(Email::parse(email)?)),
            _ => Err(AppError::InvalidInput(
                "userId or email is required".to_string(),
            )),
        }
    }
}

/// A customer with the number of orders on record.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(flatten)]
    pub user: User,
    pub order_count: usize,
}

/// Look up a customer.
///
/// GET /api/user?userId=... or ?email=...
///
/// # Errors
///
/// Returns `InvalidInput` without a usable parameter and `NotFound` if the
/// customer exists in neither store.
pub async fn show<S: PrimaryStore, N: Notifier>(
    State(state): State<AppState<S, N>>,
    ApiQuery(query): ApiQuery<UserQuery>,
) -> Result<Json<UserProfile>> {
    let storefront = state.storefront();
    let user = storefront
        .get_user(&query.lookup()?)
        .await
        .ok_or_else(|| AppError::NotFound("user".to_string()))?;

    let order_count = storefront.list_user_orders(user.id).await.len();
    Ok(Json(UserProfile { user, order_count }))
}

/// Orders of one customer, newest first.
///
/// GET /api/user/orders?userId=...
///
/// # Errors
///
/// Returns `InvalidInput` for a missing or malformed `userId`.
pub async fn orders<S: PrimaryStore, N: Notifier>(
    State(state): State<AppState<S, N>>,
    ApiQuery(query): ApiQuery<UserQuery>,
) -> Result<Json<Vec<Order>>> {
    let user_id = parse_user_id(query.user_id.as_deref())?;
    Ok(Json(state.storefront().list_user_orders(user_id).await))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use quickdrop_core::UserId;

    use super::*;
    use crate::error::ErrorKind;

    fn query(user_id: Option<&str>, email: Option<&str>) -> UserQuery {
        UserQuery {
            user_id: user_id.map(String::from),
            email: email.map(String::from),
        }
    }

    #[test]
    fn test_lookup_prefers_user_id() {
        let id = UserId::generate();
        let lookup = query(Some(&id.to_string()), Some("a@example.com"))
            .lookup()
            .unwrap();
        assert_eq!(lookup, UserLookup::Id(id));
    }

    #[test]
    fn test_lookup_by_email() {
        let lookup = query(None, Some(" a@example.com ")).lookup().unwrap();
        assert_eq!(
            lookup,
            UserLookup::Email(Email::parse("a@example.com").unwrap())
        );
    }

    #[test]
    fn test_lookup_requires_a_parameter() {
        assert_eq!(
            query(None, None).lookup().unwrap_err().kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(
            query(None, Some("nope")).lookup().unwrap_err().kind(),
            ErrorKind::InvalidInput
        );
    }
}
