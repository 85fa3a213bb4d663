/// Authentication and authorization utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and verification
/// - [`jwt`]: Access/refresh token issuance and validation
/// - [`reset_token`]: Password reset token generation and hashing
/// - [`authorization`]: Actor and ownership/admin checks
/// - [`middleware`]: Axum bearer-token middleware
///
/// # Security Features
///
/// - **Password Hashing**: Argon2id with 64 MB memory, 3 iterations
/// - **JWT Tokens**: HS256, separate secrets for access and refresh tokens
/// - **Reset Tokens**: OS randomness, only SHA-256 digests are stored
///
/// # Example
///
/// ```
/// use kakari_shared::auth::password::{hash_password, verify_password};
/// use kakari_shared::auth::jwt::{issue_access_token, verify_access_token, TokenKeys};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let keys = TokenKeys::new("access-secret", "refresh-secret");
/// let user_id = Uuid::new_v4();
/// let token = issue_access_token(user_id, &keys)?;
/// assert_eq!(verify_access_token(&token, &keys)?, user_id);
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod reset_token;
