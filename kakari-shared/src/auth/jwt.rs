/// JWT token generation and validation module
///
/// Access and refresh tokens are both HS256 JWTs carrying the user ID as
/// subject, but they are signed with different secrets and tagged with a
/// `token_type` claim, so one can never stand in for the other.
///
/// # Token Types
///
/// - **Access Token**: Short-lived (15 minutes by default), used for API authentication
/// - **Refresh Token**: Long-lived (7 days by default), used to obtain new access tokens
///
/// # Example
///
/// ```
/// use kakari_shared::auth::jwt::{issue_access_token, verify_access_token, TokenKeys};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let keys = TokenKeys::new("access-secret-at-least-32-bytes-long!", "refresh-secret-at-least-32-bytes-long");
/// let user_id = Uuid::new_v4();
///
/// let token = issue_access_token(user_id, &keys)?;
/// assert_eq!(verify_access_token(&token, &keys)?, user_id);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Issuer written into and required from every token
pub const ISSUER: &str = "kakari";

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Failed to validate token
    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Token carries the wrong `token_type`
    #[error("Expected {expected} token")]
    WrongTokenType { expected: &'static str },

    /// Invalid issuer
    #[error("Invalid token issuer")]
    InvalidIssuer,
}

/// Token type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// Access token
    Access,

    /// Refresh token
    Refresh,
}

impl TokenType {
    /// Gets token type as string
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

/// Signing keys and lifetimes for both token types
#[derive(Debug, Clone)]
pub struct TokenKeys {
    /// Secret for access tokens
    pub access_secret: String,

    /// Secret for refresh tokens
    pub refresh_secret: String,

    /// Access token lifetime
    pub access_ttl: Duration,

    /// Refresh token lifetime
    pub refresh_ttl: Duration,
}

impl TokenKeys {
    /// Creates keys with the default lifetimes (15 minutes / 7 days)
    pub fn new(access_secret: impl Into<String>, refresh_secret: impl Into<String>) -> Self {
        Self {
            access_secret: access_secret.into(),
            refresh_secret: refresh_secret.into(),
            access_ttl: Duration::minutes(15),
            refresh_ttl: Duration::days(7),
        }
    }

    /// Overrides the token lifetimes
    pub fn with_ttls(mut self, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        self.access_ttl = access_ttl;
        self.refresh_ttl = refresh_ttl;
        self
    }

    fn secret(&self, token_type: TokenType) -> &str {
        match token_type {
            TokenType::Access => &self.access_secret,
            TokenType::Refresh => &self.refresh_secret,
        }
    }

    fn ttl(&self, token_type: TokenType) -> Duration {
        match token_type {
            TokenType::Access => self.access_ttl,
            TokenType::Refresh => self.refresh_ttl,
        }
    }
}

/// JWT claims structure
///
/// - `sub`: Subject (user ID)
/// - `iss`: Issuer (always "kakari")
/// - `iat` / `nbf` / `exp`: Unix timestamps
/// - `token_type`: Access or refresh token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - User ID
    pub sub: Uuid,

    /// Issuer
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,

    /// Token type (custom claim)
    pub token_type: TokenType,
}

impl Claims {
    /// Creates claims issued at `now` that expire after `expires_in`
    pub fn issued_at(
        user_id: Uuid,
        token_type: TokenType,
        now: DateTime<Utc>,
        expires_in: Duration,
    ) -> Self {
        Self {
            sub: user_id,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: (now + expires_in).timestamp(),
            nbf: now.timestamp(),
            token_type,
        }
    }

    /// Checks if token has expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

/// Signs claims with the secret matching their token type
pub fn create_token(claims: &Claims, keys: &TokenKeys) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(keys.secret(claims.token_type).as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

fn issue(subject: Uuid, token_type: TokenType, keys: &TokenKeys) -> Result<String, JwtError> {
    let claims = Claims::issued_at(subject, token_type, Utc::now(), keys.ttl(token_type));
    create_token(&claims, keys)
}

/// Issues an access token for `subject`
pub fn issue_access_token(subject: Uuid, keys: &TokenKeys) -> Result<String, JwtError> {
    issue(subject, TokenType::Access, keys)
}

/// Issues a refresh token for `subject`
pub fn issue_refresh_token(subject: Uuid, keys: &TokenKeys) -> Result<String, JwtError> {
    issue(subject, TokenType::Refresh, keys)
}

/// Validates a token of the given type and returns its claims
///
/// Verifies signature, expiration, `nbf`, issuer and the `token_type` claim.
pub fn validate_token(
    token: &str,
    token_type: TokenType,
    keys: &TokenKeys,
) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(keys.secret(token_type).as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = true;
    validation.validate_nbf = true;
    validation.leeway = 0;

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
        jsonwebtoken::errors::ErrorKind::InvalidIssuer => JwtError::InvalidIssuer,
        _ => JwtError::ValidationError(format!("Token validation failed: {}", e)),
    })?;

    if token_data.claims.token_type != token_type {
        return Err(JwtError::WrongTokenType {
            expected: token_type.as_str(),
        });
    }

    Ok(token_data.claims)
}

/// Verifies an access token and returns its subject
pub fn verify_access_token(token: &str, keys: &TokenKeys) -> Result<Uuid, JwtError> {
    validate_token(token, TokenType::Access, keys).map(|claims| claims.sub)
}

/// Verifies a refresh token and returns its subject
pub fn verify_refresh_token(token: &str, keys: &TokenKeys) -> Result<Uuid, JwtError> {
    validate_token(token, TokenType::Refresh, keys).map(|claims| claims.sub)
}

/// Exchanges a valid refresh token for a new access token
pub fn refresh_access_token(refresh_token: &str, keys: &TokenKeys) -> Result<String, JwtError> {
    let subject = verify_refresh_token(refresh_token, keys)?;
    issue_access_token(subject, keys)
}
