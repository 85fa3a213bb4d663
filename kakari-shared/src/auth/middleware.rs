/// Authentication middleware for Axum
///
/// Validates `Authorization: Bearer <access token>` headers, loads the user
/// named by the token subject and adds two request extensions:
///
/// - [`Actor`]: the identity and roles used for permission checks
/// - [`CurrentUser`]: the full user record
///
/// Requests are rejected with 401 when the header is missing or malformed,
/// the token is invalid or expired, or the user no longer exists, and with
/// 403 when the account is disabled.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use axum::{middleware, routing::get, Extension, Router};
/// use kakari_shared::auth::authorization::Actor;
/// use kakari_shared::auth::jwt::TokenKeys;
/// use kakari_shared::auth::middleware::{jwt_auth_middleware, AuthState};
/// use kakari_shared::storage::memory::MemoryStorage;
///
/// async fn whoami(Extension(actor): Extension<Actor>) -> String {
///     actor.id.to_string()
/// }
///
/// let state = AuthState::new(
///     Arc::new(TokenKeys::new("access-secret", "refresh-secret")),
///     Arc::new(MemoryStorage::new()),
/// );
/// let app: Router = Router::new()
///     .route("/me", get(whoami))
///     .layer(middleware::from_fn_with_state(state, jwt_auth_middleware));
/// ```

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, warn};

use super::authorization::Actor;
use super::jwt::{verify_access_token, JwtError, TokenKeys};
use crate::models::user::User;
use crate::storage::Storage;

/// Everything the middleware needs to resolve a token to a user
#[derive(Clone)]
pub struct AuthState {
    pub keys: Arc<TokenKeys>,
    pub storage: Arc<dyn Storage>,
}

impl AuthState {
    pub fn new(keys: Arc<TokenKeys>, storage: Arc<dyn Storage>) -> Self {
        Self { keys, storage }
    }
}

/// The authenticated user, as loaded at request time
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Error type for authentication middleware
#[derive(Debug)]
pub enum AuthError {
    /// Missing authorization header
    MissingCredentials,

    /// Authorization header is not a bearer token
    InvalidFormat(String),

    /// Token validation failed or its subject is unknown
    InvalidToken(String),

    /// User exists but the account is disabled
    Disabled,

    /// User lookup failed
    DatabaseError(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            AuthError::MissingCredentials => (
                StatusCode::UNAUTHORIZED,
                "authentication_error",
                "Missing credentials".to_string(),
            ),
            AuthError::InvalidFormat(msg) | AuthError::InvalidToken(msg) => {
                (StatusCode::UNAUTHORIZED, "authentication_error", msg)
            }
            AuthError::Disabled => (
                StatusCode::FORBIDDEN,
                "authorization_error",
                "Account is disabled".to_string(),
            ),
            AuthError::DatabaseError(msg) => {
                error!(error = %msg, "User lookup failed during authentication");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let mut response = (
            status,
            Json(json!({ "error": error_type, "message": message })),
        )
            .into_response();

        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, header::HeaderValue::from_static("Bearer"));
        }
        response
    }
}

/// Extracts the bearer token from request headers
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))?;

    Ok(token)
}

/// Resolves an access token to an active user
pub async fn authenticate_token(state: &AuthState, token: &str) -> Result<User, AuthError> {
    let user_id = verify_access_token(token, &state.keys).map_err(|e| match e {
        JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
        JwtError::InvalidIssuer => AuthError::InvalidToken("Invalid issuer".to_string()),
        _ => AuthError::InvalidToken("Could not validate credentials".to_string()),
    })?;

    let user = state
        .storage
        .find_user_by_id(user_id)
        .await
        .map_err(|e| AuthError::DatabaseError(e.to_string()))?
        .ok_or_else(|| {
            warn!(user_id = %user_id, "Token subject does not exist");
            AuthError::InvalidToken("Could not find user".to_string())
        })?;

    if user.disabled {
        warn!(user_id = %user.id, "Disabled user attempted to authenticate");
        return Err(AuthError::Disabled);
    }

    Ok(user)
}

/// JWT authentication middleware
///
/// Use with `axum::middleware::from_fn_with_state`.
pub async fn jwt_auth_middleware(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = bearer_token(req.headers())?;
    let user = authenticate_token(&state, token).await?;

    req.extensions_mut().insert(Actor::from_user(&user));
    req.extensions_mut().insert(CurrentUser(user));

    Ok(next.run(req).await)
}
