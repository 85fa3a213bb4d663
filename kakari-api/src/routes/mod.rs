/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Login and token refresh
/// - `users`: Accounts, roles, passwords and password reset
/// - `tasks`: Tasks, task queries and comments
/// - `projects`: Projects, membership and task linkage

pub mod auth;
pub mod health;
pub mod projects;
pub mod tasks;
pub mod users;

use kakari_shared::error::ServiceError;
use uuid::Uuid;

use crate::error::ApiResult;

/// Parses a path segment as a UUID
///
/// Path ids are taken as strings so a malformed id is a 400 with a JSON body
/// rather than the extractor's plain-text rejection.
pub(crate) fn parse_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| ServiceError::InvalidIdentifier(raw.to_string()).into())
}
