/// User endpoints
///
/// # Endpoints
///
/// - `POST /api/v1/user/create` - Register (public)
/// - `GET  /api/v1/user/me` - Current user
/// - `PUT  /api/v1/user/:user_id` - Update profile (self or admin)
/// - `PUT  /api/v1/user/update-roles/:user_id` - Replace roles (admin)
/// - `POST /api/v1/user/change-password` - Change own password
/// - `POST /api/v1/user/forgot-password/:email` - Email a reset link (public)
/// - `POST /api/v1/user/reset-password/:token` - Consume a reset token (public)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::parse_id,
};
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use kakari_shared::{
    auth::{authorization::Actor, middleware::CurrentUser, reset_token::validate_reset_token_format},
    error::ServiceError,
    models::user::{NewUser, User, UserUpdate},
    services::users::PasswordResetRequest,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Registration request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 5, max = 50, message = "Username must be 5-50 characters"))]
    pub username: Option<String>,

    #[validate(length(min = 6, max = 24, message = "Password must be 6-24 characters"))]
    pub password: String,

    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub full_name: Option<String>,
}

/// Profile update request
///
/// Absent fields are left alone. An empty `full_name` clears it.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    #[validate(length(min = 5, max = 50, message = "Username must be 5-50 characters"))]
    pub username: Option<String>,

    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub full_name: Option<String>,

    pub disabled: Option<bool>,

    pub activated: Option<bool>,
}

impl From<UpdateUserRequest> for UserUpdate {
    fn from(req: UpdateUserRequest) -> Self {
        UserUpdate {
            email: req.email,
            username: req.username,
            full_name: req
                .full_name
                .map(|name| Some(name.trim().to_string()).filter(|name| !name.is_empty())),
            disabled: req.disabled,
            activated: req.activated,
        }
    }
}

/// Role replacement request: a bare list or `{"roles": [...]}`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum UpdateRolesRequest {
    List(Vec<String>),
    Object { roles: Vec<String> },
}

impl UpdateRolesRequest {
    fn into_roles(self) -> Vec<String> {
        match self {
            UpdateRolesRequest::List(roles) | UpdateRolesRequest::Object { roles } => roles,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    pub old_password: String,

    #[validate(length(min = 6, max = 24, message = "Password must be 6-24 characters"))]
    pub new_password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 6, max = 24, message = "Password must be 6-24 characters"))]
    pub new_password: String,
}

/// Plain acknowledgement body
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: &str) -> Json<Self> {
        Json(Self {
            message: message.to_string(),
        })
    }
}

/// Registers a new user
///
/// # Errors
///
/// - `400 Bad Request`: Email or username already registered
/// - `422 Unprocessable Entity`: Validation failed
pub async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> ApiResult<Json<User>> {
    req.validate()?;

    let user = state
        .directories
        .users
        .create_user(NewUser {
            email: req.email,
            username: req.username,
            password: req.password,
            full_name: req.full_name,
            roles: vec![],
        })
        .await?;

    Ok(Json(user))
}

/// Returns the authenticated user
pub async fn me(Extension(CurrentUser(user)): Extension<CurrentUser>) -> Json<User> {
    Json(user)
}

/// Updates a user's profile
///
/// # Errors
///
/// - `400 Bad Request`: Malformed id, or email/username taken
/// - `403 Forbidden`: Not that user and not an admin, or a non-admin touched account flags
/// - `404 Not Found`: No such user
pub async fn update_user(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(user_id): Path<String>,
    Json(req): Json<UpdateUserRequest>,
) -> ApiResult<Json<User>> {
    let user_id = parse_id(&user_id)?;
    req.validate()?;

    let user = state
        .directories
        .users
        .update_user(user_id, req.into(), &actor)
        .await?;
    Ok(Json(user))
}

/// Replaces a user's roles
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not an admin
/// - `404 Not Found`: No such user
pub async fn update_roles(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(user_id): Path<String>,
    Json(req): Json<UpdateRolesRequest>,
) -> ApiResult<Json<User>> {
    let user_id = parse_id(&user_id)?;

    let user = state
        .directories
        .users
        .update_roles(user_id, req.into_roles(), &actor)
        .await?;
    Ok(Json(user))
}

/// Changes the caller's password
///
/// # Errors
///
/// - `400 Bad Request`: Old password is wrong
pub async fn change_password(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(req): Json<ChangePasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    req.validate()?;

    state
        .directories
        .users
        .change_password(user.id, &req.old_password, &req.new_password)
        .await?;
    Ok(MessageResponse::new("Password changed successfully"))
}

/// Emails a password reset link
///
/// Delivery failures are reported in the body, not as an error status.
///
/// # Errors
///
/// - `404 Not Found`: Email does not exist
pub async fn forgot_password(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> ApiResult<Json<PasswordResetRequest>> {
    let request = state.directories.users.request_password_reset(&email).await?;
    Ok(Json(request))
}

/// Sets a new password using an emailed token
///
/// # Errors
///
/// - `400 Bad Request`: Token unknown, used or expired
/// - `422 Unprocessable Entity`: New password fails validation
pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(req): Json<ResetPasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    if !validate_reset_token_format(&token) {
        return Err(ApiError::from(ServiceError::InvalidToken));
    }
    req.validate()?;

    state
        .directories
        .users
        .reset_password(&token, &req.new_password)
        .await?;
    Ok(MessageResponse::new("Password has been reset"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roles_request_shapes() {
        let list: UpdateRolesRequest = serde_json::from_str(r#"["admin"]"#).unwrap();
        let object: UpdateRolesRequest = serde_json::from_str(r#"{"roles":["admin"]}"#).unwrap();

        assert_eq!(list.into_roles(), vec!["admin".to_string()]);
        assert_eq!(object.into_roles(), vec!["admin".to_string()]);
    }

    #[test]
    fn test_empty_full_name_clears() {
        let update: UserUpdate = UpdateUserRequest {
            full_name: Some("  ".to_string()),
            ..Default::default()
        }
        .into();
        assert_eq!(update.full_name, Some(None));

        let update: UserUpdate = UpdateUserRequest {
            full_name: Some("Ada".to_string()),
            ..Default::default()
        }
        .into();
        assert_eq!(update.full_name, Some(Some("Ada".to_string())));
    }

    #[test]
    fn test_create_user_validation() {
        let req = CreateUserRequest {
            email: "not-an-email".to_string(),
            username: Some("abc".to_string()),
            password: "12345".to_string(),
            full_name: None,
        };
        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();

        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("username"));
        assert!(fields.contains_key("password"));
    }
}
