//! Customer records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Email, UserId};

/// A storefront customer.
///
/// Created on the first login or checkout attempt for an email, then updated
/// (name, phone) on later logins with the same email. Never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub phone: String,
    pub created_at: DateTime<Utc>,
}
