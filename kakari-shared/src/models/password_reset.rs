/// Password reset records
///
/// One outstanding reset per email. Issuing a new token for the same email
/// overwrites the previous record, and consuming a token deletes it.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE password_resets (
///     email TEXT PRIMARY KEY,
///     token_hash TEXT NOT NULL UNIQUE,
///     created_at TIMESTAMPTZ NOT NULL,
///     expires_at TIMESTAMPTZ NOT NULL
/// );
/// ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// Outstanding password reset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PasswordReset {
    /// Email the reset was requested for
    pub email: String,

    /// SHA-256 hex digest of the emailed token
    pub token_hash: String,

    /// When the token was issued
    pub created_at: DateTime<Utc>,

    /// When the token stops being accepted
    pub expires_at: DateTime<Utc>,
}

impl PasswordReset {
    /// Builds a record issued at `now` and valid for `ttl`
    pub fn issued_at(
        email: impl Into<String>,
        token_hash: impl Into<String>,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            email: email.into(),
            token_hash: token_hash.into(),
            created_at: now,
            expires_at: now + ttl,
        }
    }

    /// Whether the token is no longer accepted at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Inserts the record, replacing any existing one for the same email
    pub async fn upsert(pool: &PgPool, reset: &PasswordReset) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO password_resets (email, token_hash, created_at, expires_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (email) DO UPDATE
            SET token_hash = EXCLUDED.token_hash,
                created_at = EXCLUDED.created_at,
                expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(&reset.email)
        .bind(&reset.token_hash)
        .bind(reset.created_at)
        .bind(reset.expires_at)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Finds the record whose token hashes to `token_hash`
    pub async fn find_by_token_hash(
        pool: &PgPool,
        token_hash: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, PasswordReset>(
            r#"
            SELECT email, token_hash, created_at, expires_at
            FROM password_resets
            WHERE token_hash = $1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(pool)
        .await
    }

    /// Deletes the record for `email`
    pub async fn delete(pool: &PgPool, email: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM password_resets WHERE email = $1")
            .bind(email)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_boundary() {
        let now = Utc::now();
        let reset = PasswordReset::issued_at("a@example.com", "hash", now, Duration::minutes(60));

        assert!(!reset.is_expired_at(now));
        assert!(!reset.is_expired_at(now + Duration::minutes(59)));
        assert!(reset.is_expired_at(now + Duration::minutes(60)));
    }
}
