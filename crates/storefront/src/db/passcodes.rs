//! One-time passcode repository for database operations.
//!
//! Passcodes are never stored anywhere else: if this table cannot be
//! reached, issuing and verifying both fail.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use quickdrop_core::{Email, OneTimePasscode, OtpCode, PasscodeId};

use super::StoreError;

/// Repository for passcode database operations.
pub struct PasscodeRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PasscodeRepository<'a> {
    /// Create a new passcode repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a freshly issued passcode.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` if the insert fails.
    pub async fn insert(&self, passcode: &OneTimePasscode) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO "OneTimePasscode" (id, email, code, "expiresAt", used, "createdAt")
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(passcode.id)
        .bind(passcode.email.as_str())
        .bind(passcode.code.as_str())
        .bind(passcode.expires_at)
        .bind(passcode.used)
        .bind(passcode.created_at)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Mark the newest unused, unexpired passcode for `email` + `code` as used.
    ///
    /// Selection and update happen in one statement. The row lock taken by
    /// the subquery plus the `used = FALSE` guard mean that of two concurrent
    /// callers presenting the same code, exactly one gets `Some`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` if the update fails.
    pub async fn consume(
        &self,
        email: &Email,
        code: &OtpCode,
        now: DateTime<Utc>,
    ) -> Result<Option<PasscodeId>, StoreError> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE "OneTimePasscode"
            SET used = TRUE
            WHERE id = (
                SELECT id FROM "OneTimePasscode"
                WHERE email = $1 AND code = $2 AND used = FALSE AND "expiresAt" > $3
                ORDER BY "createdAt" DESC
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            AND used = FALSE
            RETURNING id
            "#,
        )
        .bind(email.as_str())
        .bind(code.as_str())
        .bind(now)
        .fetch_optional(self.pool)
        .await?;

        Ok(id.map(PasscodeId::new))
    }

    /// Delete passcodes that expired before `now`.
    ///
    /// Returns the number of rows deleted.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` if the delete fails.
    pub async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            DELETE FROM "OneTimePasscode"
            WHERE "expiresAt" <= $1
            "#,
        )
        .bind(now)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
