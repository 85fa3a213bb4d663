/// Authentication endpoints
///
/// - `POST /api/v1/auth/login` - Exchange email and password for tokens
/// - `POST /api/v1/auth/refresh` - Exchange a refresh token for a new access token

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    async_trait,
    extract::{FromRequest, Multipart, Request, State},
    http::header,
    response::{IntoResponse, Response},
    Form, Json,
};
use kakari_shared::{
    auth::jwt::{issue_access_token, issue_refresh_token, refresh_access_token},
    models::user::User,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use validator::Validate;

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Email address (`username` is accepted as an alias)
    #[serde(alias = "username")]
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Login credentials from a JSON, urlencoded or multipart body
///
/// OAuth2 password-flow clients post `username`/`password` as form fields;
/// extra form fields such as `grant_type` are ignored.
#[derive(Debug)]
pub struct LoginCredentials(pub LoginRequest);

#[async_trait]
impl<S> FromRequest<S> for LoginCredentials
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(login) = Form::<LoginRequest>::from_request(req, state)
                .await
                .map_err(IntoResponse::into_response)?;
            return Ok(Self(login));
        }

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(IntoResponse::into_response)?;
            return read_multipart(multipart)
                .await
                .map(Self)
                .map_err(IntoResponse::into_response);
        }

        let Json(login) = Json::<LoginRequest>::from_request(req, state)
            .await
            .map_err(IntoResponse::into_response)?;
        Ok(Self(login))
    }
}

async fn read_multipart(mut multipart: Multipart) -> ApiResult<LoginRequest> {
    let malformed = |e: axum::extract::multipart::MultipartError| {
        ApiError::BadRequest(format!("Malformed form data: {}", e))
    };

    let mut login = LoginRequest {
        email: String::new(),
        password: String::new(),
    };
    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("email") | Some("username") => {
                login.email = field.text().await.map_err(malformed)?;
            }
            Some("password") => {
                login.password = field.text().await.map_err(malformed)?;
            }
            _ => {}
        }
    }
    Ok(login)
}

/// Login response
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Access token
    pub access_token: String,

    /// Refresh token
    pub refresh_token: String,

    /// Always "bearer"
    pub token_type: String,

    /// The authenticated user
    pub user: User,
}

/// Refresh token request
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    /// Refresh token
    pub refresh_token: String,
}

/// Refresh token response
#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    /// New access token
    pub access_token: String,

    /// Always "bearer"
    pub token_type: String,
}

/// Login endpoint
///
/// # Endpoint
///
/// ```text
/// POST /api/v1/auth/login
/// Content-Type: application/json
///
/// {
///   "email": "user@example.com",
///   "password": "secret123"
/// }
/// ```
///
/// Form bodies (`username=user%40example.com&password=secret123`) are
/// accepted too, urlencoded or multipart.
///
/// # Errors
///
/// - `400 Bad Request`: Incorrect email or password, or a disabled account
/// - `422 Unprocessable Entity`: Validation failed
pub async fn login(
    State(state): State<AppState>,
    LoginCredentials(req): LoginCredentials,
) -> ApiResult<Json<LoginResponse>> {
    req.validate()?;

    let user = state
        .directories
        .users
        .authenticate(&req.email, &req.password)
        .await?
        .ok_or_else(|| ApiError::BadRequest("Incorrect email or password".to_string()))?;

    if user.disabled {
        warn!(user_id = %user.id, "Login attempt for disabled account");
        return Err(ApiError::BadRequest("Account is disabled".to_string()));
    }

    let access_token = issue_access_token(user.id, &state.keys)?;
    let refresh_token = issue_refresh_token(user.id, &state.keys)?;

    info!(user_id = %user.id, "User logged in");
    Ok(Json(LoginResponse {
        access_token,
        refresh_token,
        token_type: "bearer".to_string(),
        user,
    }))
}

/// Token refresh endpoint
///
/// # Endpoint
///
/// ```text
/// POST /api/v1/auth/refresh
/// Content-Type: application/json
///
/// {
///   "refresh_token": "eyJ..."
/// }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid or expired refresh token, or an access token
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let access_token = refresh_access_token(&req.refresh_token, &state.keys)?;

    Ok(Json(RefreshResponse {
        access_token,
        token_type: "bearer".to_string(),
    }))
}
