/// User directory
///
/// Registration, lookup, profile and role updates, password changes and the
/// email-based password reset flow.
///
/// Emails are trimmed and lowercased before they are stored or looked up.
///
/// # Password reset flow
///
/// 1. `request_password_reset(email)` stores the SHA-256 of a fresh token for
///    that email (replacing any earlier one) and mails
///    `{base_url}/reset-password/{token}`.
/// 2. `reset_password(token, new_password)` looks the record up by hash,
///    rejects it if expired, sets the new password and deletes the record.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::authorization::{require_admin, Actor, DEFAULT_ROLE};
use crate::auth::password::{hash_password_with, verify_password, PasswordParams};
use crate::auth::reset_token::{generate_reset_token, hash_reset_token};
use crate::error::{ServiceError, ServiceResult};
use crate::models::password_reset::PasswordReset;
use crate::models::user::{NewUser, User, UserUpdate};
use crate::services::mail::{password_reset_email, Mailer};
use crate::storage::Storage;

/// Tunables for the user directory
#[derive(Debug, Clone)]
pub struct UserDirectorySettings {
    /// Public base URL used to build reset links
    pub base_url: String,

    /// How long a reset token stays valid
    pub reset_token_ttl: Duration,

    /// Argon2 cost for new password hashes
    pub password_params: PasswordParams,
}

impl UserDirectorySettings {
    /// Settings with a 60 minute reset window and default Argon2 cost
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            reset_token_ttl: Duration::minutes(60),
            password_params: PasswordParams::default(),
        }
    }
}

/// Outcome of handing the reset email to the mail transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum DeliveryStatus {
    /// Transport accepted the message
    Sent,

    /// Transport failed; the token is still stored
    Failed(String),
}

/// Result of a password reset request
#[derive(Debug, Clone, Serialize)]
pub struct PasswordResetRequest {
    /// Email the reset was issued for
    pub email: String,

    /// When the emailed token stops working
    pub expires_at: DateTime<Utc>,

    /// Whether the email went out
    pub delivery: DeliveryStatus,
}

/// Service for user accounts
#[derive(Clone)]
pub struct UserDirectory {
    storage: Arc<dyn Storage>,
    mailer: Arc<dyn Mailer>,
    settings: UserDirectorySettings,
}

/// Canonical form of an email address
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl UserDirectory {
    pub fn new(
        storage: Arc<dyn Storage>,
        mailer: Arc<dyn Mailer>,
        settings: UserDirectorySettings,
    ) -> Self {
        Self {
            storage,
            mailer,
            settings,
        }
    }

    /// Registers a new user
    ///
    /// Roles default to `["user"]`.
    ///
    /// # Errors
    ///
    /// - `DuplicateUser` if the email or username is already registered
    /// - `Validation` if the email or password is empty
    pub async fn create_user(&self, new_user: NewUser) -> ServiceResult<User> {
        let email = normalize_email(&new_user.email);
        if email.is_empty() {
            return Err(ServiceError::Validation("email must not be empty".to_string()));
        }
        if new_user.password.is_empty() {
            return Err(ServiceError::Validation("password must not be empty".to_string()));
        }

        if self.storage.find_user_by_email(&email).await?.is_some() {
            return Err(ServiceError::DuplicateUser("email".to_string()));
        }
        if let Some(username) = &new_user.username {
            if self.storage.find_user_by_username(username).await?.is_some() {
                return Err(ServiceError::DuplicateUser("username".to_string()));
            }
        }

        let roles = if new_user.roles.is_empty() {
            vec![DEFAULT_ROLE.to_string()]
        } else {
            new_user.roles
        };

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email,
            username: new_user.username,
            password_hash: hash_password_with(&new_user.password, self.settings.password_params)?,
            full_name: new_user.full_name,
            disabled: false,
            activated: false,
            roles,
            created_at: now,
            updated_at: now,
        };

        // The unique index still guards against a concurrent registration
        self.storage.insert_user(&user).await?;

        info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Checks an email/password pair
    ///
    /// Unknown email and wrong password both yield `Ok(None)`.
    pub async fn authenticate(&self, email: &str, password: &str) -> ServiceResult<Option<User>> {
        let Some(user) = self.storage.find_user_by_email(&normalize_email(email)).await? else {
            debug!("Login attempt for unknown email");
            return Ok(None);
        };

        if verify_password(password, &user.password_hash)? {
            Ok(Some(user))
        } else {
            debug!(user_id = %user.id, "Login attempt with wrong password");
            Ok(None)
        }
    }

    pub async fn get_by_email(&self, email: &str) -> ServiceResult<Option<User>> {
        Ok(self.storage.find_user_by_email(&normalize_email(email)).await?)
    }

    pub async fn get_by_id(&self, id: Uuid) -> ServiceResult<Option<User>> {
        Ok(self.storage.find_user_by_id(id).await?)
    }

    /// Applies a partial profile update
    ///
    /// # Errors
    ///
    /// - `NotFound` if the user does not exist
    /// - `Forbidden` unless the actor is that user or an admin, or if a
    ///   non-admin touches `disabled`/`activated`
    /// - `DuplicateUser` if the new email or username is taken
    pub async fn update_user(&self, id: Uuid, update: UserUpdate, actor: &Actor) -> ServiceResult<User> {
        let mut user = self
            .storage
            .find_user_by_id(id)
            .await?
            .ok_or(ServiceError::NotFound("User"))?;

        if !actor.is(id) && !actor.is_admin() {
            return Err(ServiceError::forbidden());
        }
        if update.touches_account_flags() && !actor.is_admin() {
            return Err(ServiceError::Forbidden(
                "Only admins may change account flags".to_string(),
            ));
        }

        if let Some(email) = update.email {
            let email = normalize_email(&email);
            if email.is_empty() {
                return Err(ServiceError::Validation("email must not be empty".to_string()));
            }
            if email != user.email {
                if self.storage.find_user_by_email(&email).await?.is_some() {
                    return Err(ServiceError::DuplicateUser("email".to_string()));
                }
                user.email = email;
            }
        }
        if let Some(username) = update.username {
            if user.username.as_deref() != Some(username.as_str()) {
                if self.storage.find_user_by_username(&username).await?.is_some() {
                    return Err(ServiceError::DuplicateUser("username".to_string()));
                }
                user.username = Some(username);
            }
        }
        if let Some(full_name) = update.full_name {
            user.full_name = full_name;
        }
        if let Some(disabled) = update.disabled {
            user.disabled = disabled;
        }
        if let Some(activated) = update.activated {
            user.activated = activated;
        }
        user.updated_at = Utc::now();

        self.save(&user).await?;
        debug!(user_id = %user.id, actor = %actor.id, "User updated");
        Ok(user)
    }

    /// Replaces a user's roles
    ///
    /// # Errors
    ///
    /// - `NotFound` if the target user does not exist
    /// - `Unauthorized` unless the actor holds the admin role
    pub async fn update_roles(&self, id: Uuid, roles: Vec<String>, actor: &Actor) -> ServiceResult<User> {
        let mut user = self
            .storage
            .find_user_by_id(id)
            .await?
            .ok_or(ServiceError::NotFound("User"))?;

        require_admin(actor)?;

        let mut unique = Vec::with_capacity(roles.len());
        for role in roles {
            let role = role.trim().to_string();
            if role.is_empty() {
                return Err(ServiceError::Validation("role names must not be empty".to_string()));
            }
            if !unique.contains(&role) {
                unique.push(role);
            }
        }

        user.roles = unique;
        user.updated_at = Utc::now();
        self.save(&user).await?;

        info!(user_id = %user.id, actor = %actor.id, roles = ?user.roles, "User roles updated");
        Ok(user)
    }

    /// Changes a password after checking the current one
    ///
    /// # Errors
    ///
    /// - `NotFound` if the user does not exist
    /// - `IncorrectPassword` if `old_password` does not verify
    pub async fn change_password(
        &self,
        user_id: Uuid,
        old_password: &str,
        new_password: &str,
    ) -> ServiceResult<()> {
        let mut user = self
            .storage
            .find_user_by_id(user_id)
            .await?
            .ok_or(ServiceError::NotFound("User"))?;

        if !verify_password(old_password, &user.password_hash)? {
            return Err(ServiceError::IncorrectPassword);
        }

        self.set_password(&mut user, new_password).await?;
        info!(user_id = %user.id, "Password changed");
        Ok(())
    }

    /// Issues a reset token and emails the reset link
    ///
    /// Mail failures do not fail the call; they are logged and reported in
    /// [`PasswordResetRequest::delivery`].
    ///
    /// # Errors
    ///
    /// `NotFound` if no user has this email.
    pub async fn request_password_reset(&self, email: &str) -> ServiceResult<PasswordResetRequest> {
        let user = self
            .get_by_email(email)
            .await?
            .ok_or(ServiceError::NotFound("User"))?;

        let (token, token_hash) = generate_reset_token();
        let reset = PasswordReset::issued_at(
            user.email.clone(),
            token_hash,
            Utc::now(),
            self.settings.reset_token_ttl,
        );
        self.storage.upsert_password_reset(&reset).await?;

        let message = password_reset_email(&user.email, &self.settings.base_url, &token);
        let delivery = match self.mailer.send(&message).await {
            Ok(()) => {
                info!(user_id = %user.id, "Password reset email sent");
                DeliveryStatus::Sent
            }
            Err(e) => {
                warn!(user_id = %user.id, error = %e, "Password reset email could not be delivered");
                DeliveryStatus::Failed(e.to_string())
            }
        };

        Ok(PasswordResetRequest {
            email: user.email,
            expires_at: reset.expires_at,
            delivery,
        })
    }

    /// Consumes a reset token and sets a new password
    ///
    /// # Errors
    ///
    /// - `InvalidToken` if no outstanding reset matches the token
    /// - `ExpiredToken` if the reset has expired (it is discarded)
    /// - `NotFound` if the reset's email no longer belongs to a user
    pub async fn reset_password(&self, token: &str, new_password: &str) -> ServiceResult<()> {
        let reset = self
            .storage
            .find_password_reset_by_token_hash(&hash_reset_token(token))
            .await?
            .ok_or(ServiceError::InvalidToken)?;

        if reset.is_expired_at(Utc::now()) {
            self.storage.delete_password_reset(&reset.email).await?;
            return Err(ServiceError::ExpiredToken);
        }

        let mut user = self
            .storage
            .find_user_by_email(&reset.email)
            .await?
            .ok_or(ServiceError::NotFound("User"))?;

        self.set_password(&mut user, new_password).await?;
        self.storage.delete_password_reset(&reset.email).await?;

        info!(user_id = %user.id, "Password reset completed");
        Ok(())
    }

    async fn set_password(&self, user: &mut User, new_password: &str) -> ServiceResult<()> {
        if new_password.is_empty() {
            return Err(ServiceError::Validation("password must not be empty".to_string()));
        }
        user.password_hash = hash_password_with(new_password, self.settings.password_params)?;
        user.updated_at = Utc::now();
        self.save(user).await
    }

    async fn save(&self, user: &User) -> ServiceResult<()> {
        if self.storage.update_user(user).await? {
            Ok(())
        } else {
            Err(ServiceError::NotFound("User"))
        }
    }
}
