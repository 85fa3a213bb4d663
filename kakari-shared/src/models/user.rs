/// User model and database operations
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY,
///     email TEXT NOT NULL UNIQUE,
///     username TEXT UNIQUE,
///     password_hash TEXT NOT NULL,
///     full_name TEXT,
///     disabled BOOLEAN NOT NULL DEFAULT FALSE,
///     activated BOOLEAN NOT NULL DEFAULT FALSE,
///     roles TEXT[] NOT NULL DEFAULT '{user}',
///     created_at TIMESTAMPTZ NOT NULL,
///     updated_at TIMESTAMPTZ NOT NULL
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use kakari_shared::models::user::User;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// if let Some(user) = User::find_by_email(&pool, "user@example.com").await? {
///     println!("Found user: {}", user.id);
/// }
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// User account
///
/// Passwords are stored as Argon2id hashes, never in plaintext. The hash is
/// skipped when serializing so a `User` can never leak it through a response.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID (UUID v4)
    pub id: Uuid,

    /// Email address, stored lowercase, unique across all users
    pub email: String,

    /// Optional username, unique where present
    pub username: Option<String>,

    /// Argon2id password hash
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    /// Optional display name
    pub full_name: Option<String>,

    /// Disabled accounts cannot use the API
    pub disabled: bool,

    /// Whether the account has been activated
    pub activated: bool,

    /// Role names, e.g. "user" or "admin"
    pub roles: Vec<String>,

    /// When the user account was created
    pub created_at: DateTime<Utc>,

    /// When the user account was last updated
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Inserts a fully populated user row
    ///
    /// # Errors
    ///
    /// Returns a database error carrying the `users_email_key` or
    /// `users_username_key` constraint when the email or username is taken.
    pub async fn insert(pool: &PgPool, user: &User) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, username, password_hash, full_name,
                               disabled, activated, roles, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.full_name)
        .bind(user.disabled)
        .bind(user.activated)
        .bind(&user.roles)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Finds a user by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, username, password_hash, full_name, disabled, activated,
                   roles, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Finds a user by email address
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, username, password_hash, full_name, disabled, activated,
                   roles, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(pool)
        .await
    }

    /// Finds a user by username
    pub async fn find_by_username(
        pool: &PgPool,
        username: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, username, password_hash, full_name, disabled, activated,
                   roles, created_at, updated_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(pool)
        .await
    }

    /// Replaces every mutable column of an existing user
    ///
    /// # Returns
    ///
    /// True if the user existed and was updated
    pub async fn replace(pool: &PgPool, user: &User) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET email = $2,
                username = $3,
                password_hash = $4,
                full_name = $5,
                disabled = $6,
                activated = $7,
                roles = $8,
                updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.full_name)
        .bind(user.disabled)
        .bind(user.activated)
        .bind(&user.roles)
        .bind(user.updated_at)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Input for registering a new user
///
/// Carries the plaintext password; the user directory hashes it before
/// anything reaches the store.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    /// Email address
    pub email: String,

    /// Optional username
    pub username: Option<String>,

    /// Plaintext password
    pub password: String,

    /// Optional display name
    pub full_name: Option<String>,

    /// Roles; `["user"]` when empty
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Partial profile update
///
/// Only fields that are `Some` are applied. `full_name: Some(None)` clears the
/// display name.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    /// New email address
    pub email: Option<String>,

    /// New username
    pub username: Option<String>,

    /// New display name (use Some(None) to clear)
    pub full_name: Option<Option<String>>,

    /// Enable or disable the account (admin only)
    pub disabled: Option<bool>,

    /// Mark the account activated (admin only)
    pub activated: Option<bool>,
}

impl UserUpdate {
    /// Whether the update touches admin-only account flags
    pub fn touches_account_flags(&self) -> bool {
        self.disabled.is_some() || self.activated.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_is_not_serialized() {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: "user@example.com".to_string(),
            username: None,
            password_hash: "$argon2id$secret".to_string(),
            full_name: Some("Jane".to_string()),
            disabled: false,
            activated: true,
            roles: vec!["user".to_string()],
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["email"], "user@example.com");
        assert_eq!(json["roles"][0], "user");
    }

    #[test]
    fn test_user_update_account_flags() {
        assert!(!UserUpdate::default().touches_account_flags());

        let update = UserUpdate {
            disabled: Some(true),
            ..Default::default()
        };
        assert!(update.touches_account_flags());
    }
}
