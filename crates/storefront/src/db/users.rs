//! User repository for database operations.
//!
//! Users are keyed by id and unique by exact email. Lookups never normalize
//! case: `Alice@x.com` and `alice@x.com` are different customers.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use quickdrop_core::{Email, User, UserId};

use super::StoreError;

/// Internal row type for database queries.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    phone: String,
    #[sqlx(rename = "createdAt")]
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email)
            .map_err(|e| StoreError::DataCorruption(format!("invalid email in database: {e}")))?;

        Ok(Self {
            id: UserId::new(row.id),
            name: row.name,
            email,
            phone: row.phone,
            created_at: row.created_at,
        })
    }
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by their email address.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` if the query fails.
    /// Returns `StoreError::DataCorruption` if the email in the database is invalid.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, phone, "createdAt"
            FROM "User"
            WHERE email = $1
            "#,
        )
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` if the query fails.
    /// Returns `StoreError::DataCorruption` if the email in the database is invalid.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, phone, "createdAt"
            FROM "User"
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    /// Insert a user, or update name and phone if the email already exists.
    ///
    /// Two first logins for the same email racing each other both end up
    /// with the same row; the id of the first insert wins.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` if the query fails.
    pub async fn upsert(&self, user: &User) -> Result<User, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO "User" (id, name, email, phone, "createdAt")
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (email) DO UPDATE
            SET name = EXCLUDED.name, phone = EXCLUDED.phone
            RETURNING id, name, email, phone, "createdAt"
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(user.email.as_str())
        .bind(&user.phone)
        .bind(user.created_at)
        .fetch_one(self.pool)
        .await?;

        row.try_into()
    }

    /// Update name and phone of an existing user.
    ///
    /// Returns `None` if no user has this id.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` if the query fails.
    pub async fn update_profile(
        &self,
        id: UserId,
        name: &str,
        phone: &str,
    ) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            UPDATE "User"
            SET name = $2, phone = $3
            WHERE id = $1
            RETURNING id, name, email, phone, "createdAt"
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(phone)
        .fetch_optional(self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }
}
