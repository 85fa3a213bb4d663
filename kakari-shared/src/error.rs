/// Service-level error type
///
/// Every directory operation fails with a [`ServiceError`]. The HTTP layer maps
/// each variant onto a status code; nothing here knows about HTTP.

use crate::auth::authorization::AuthzError;
use crate::auth::password::PasswordError;
use crate::storage::StorageError;

/// Result alias for directory operations
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Failure of a directory operation
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Referenced record does not exist
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Email or username is already registered
    #[error("User with this {0} already exists")]
    DuplicateUser(String),

    /// Role assignment attempted without the admin role
    #[error("Not authorized to perform this action")]
    Unauthorized,

    /// Actor may not modify this resource
    #[error("{0}")]
    Forbidden(String),

    /// Old password did not verify
    #[error("Incorrect password")]
    IncorrectPassword,

    /// Reset token unknown or already used
    #[error("Invalid token")]
    InvalidToken,

    /// Reset token past its expiry
    #[error("Token has expired")]
    ExpiredToken,

    /// Date string could not be parsed
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// Identifier is not a valid UUID
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Input failed a business rule
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Password hashing failed
    #[error(transparent)]
    Password(#[from] PasswordError),

    /// Backing store failed
    #[error(transparent)]
    Storage(StorageError),
}

impl ServiceError {
    /// Forbidden with the default message
    pub fn forbidden() -> Self {
        ServiceError::Forbidden("Not authorized to modify this resource".to_string())
    }
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Duplicate(field) if field == "email" || field == "username" => {
                ServiceError::DuplicateUser(field)
            }
            other => ServiceError::Storage(other),
        }
    }
}

impl From<AuthzError> for ServiceError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::NotOwner => ServiceError::forbidden(),
            AuthzError::NotAdmin => ServiceError::Unauthorized,
        }
    }
}
