/// Configuration management for the API server
///
/// This module loads configuration from environment variables and provides
/// a type-safe configuration struct.
///
/// # Environment Variables
///
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `API_PRODUCTION`: Enables HSTS (default: false)
/// - `CORS_ORIGINS`: Comma separated origins, `*` for any (default: *)
/// - `REQUEST_TIMEOUT_SECS`: Per-request timeout (default: 30)
/// - `DATABASE_URL`: PostgreSQL connection string (optional, in-memory store when unset)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `JWT_SECRET_KEY`: Access token secret (required)
/// - `JWT_REFRESH_SECRET_KEY`: Refresh token secret (required)
/// - `ACCESS_TOKEN_EXPIRATION_MINUTES`: (default: 15)
/// - `REFRESH_TOKEN_EXPIRATION_MINUTES`: (default: 10080)
/// - `PASSWORD_RESET_EXPIRATION_MINUTES`: (default: 60)
/// - `BASE_URL`: Public URL used in password reset links (required)
/// - `MAIL_API_URL`, `MAIL_API_TOKEN`, `MAIL_FROM`: HTTP mail API (log only when unset)
///
/// # Example
///
/// ```no_run
/// use kakari_api::config::Config;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}:{}", config.api.host, config.api.port);
/// # Ok(())
/// # }
/// ```

use anyhow::{bail, Context};
use chrono::Duration;
use kakari_shared::auth::jwt::TokenKeys;
use kakari_shared::services::users::UserDirectorySettings;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// Minimum length for either JWT secret
pub const MIN_SECRET_LENGTH: usize = 32;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Database configuration; `None` selects the in-memory store
    pub database: Option<DatabaseConfig>,

    /// JWT configuration
    pub jwt: JwtConfig,

    /// Account and password reset configuration
    pub accounts: AccountConfig,

    /// Outbound mail configuration
    pub mail: MailConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Production mode (HSTS on)
    pub production: bool,

    /// Allowed CORS origins
    pub cors_origins: Vec<String>,

    /// Requests running longer than this are answered with 408
    pub request_timeout_secs: u64,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// JWT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Secret key for access tokens
    ///
    /// IMPORTANT: This must be kept secret and should be at least 32 bytes.
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,

    /// Secret key for refresh tokens; must differ from `secret`
    pub refresh_secret: String,

    /// Access token lifetime in minutes
    pub access_token_minutes: i64,

    /// Refresh token lifetime in minutes
    pub refresh_token_minutes: i64,
}

/// Account configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Public base URL, used to build reset links
    pub base_url: String,

    /// How long a password reset token stays valid
    pub password_reset_minutes: i64,
}

/// Mail configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    /// Mail API endpoint; `None` logs emails instead of sending them
    pub api_url: Option<String>,

    /// Bearer token for the mail API
    pub api_token: Option<String>,

    /// Sender address
    pub from: String,
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing
    /// - Environment variables have invalid values
    ///
    /// # Example
    ///
    /// ```no_run
    /// use kakari_api::config::Config;
    ///
    /// # fn example() -> anyhow::Result<()> {
    /// let config = Config::from_env()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let required = |key: &str| {
            var(key).ok_or_else(|| anyhow::anyhow!("{} environment variable is required", key))
        };

        let api = ApiConfig {
            host: var("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&var, "API_PORT", 8080)?,
            production: parse_or(&var, "API_PRODUCTION", false)?,
            cors_origins: var("CORS_ORIGINS")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(|origin| origin.trim().to_string())
                        .filter(|origin| !origin.is_empty())
                        .collect()
                })
                .unwrap_or_else(|| vec!["*".to_string()]),
            request_timeout_secs: parse_or(&var, "REQUEST_TIMEOUT_SECS", 30)?,
        };

        let database = match var("DATABASE_URL") {
            Some(url) => Some(DatabaseConfig {
                url,
                max_connections: parse_or(&var, "DATABASE_MAX_CONNECTIONS", 10)?,
            }),
            None => None,
        };

        let jwt = JwtConfig {
            secret: required("JWT_SECRET_KEY")?,
            refresh_secret: required("JWT_REFRESH_SECRET_KEY")?,
            access_token_minutes: parse_or(&var, "ACCESS_TOKEN_EXPIRATION_MINUTES", 15)?,
            refresh_token_minutes: parse_or(&var, "REFRESH_TOKEN_EXPIRATION_MINUTES", 10080)?,
        };

        let accounts = AccountConfig {
            base_url: required("BASE_URL")?.trim_end_matches('/').to_string(),
            password_reset_minutes: parse_or(&var, "PASSWORD_RESET_EXPIRATION_MINUTES", 60)?,
        };

        let mail = MailConfig {
            api_url: var("MAIL_API_URL"),
            api_token: var("MAIL_API_TOKEN"),
            from: var("MAIL_FROM").unwrap_or_else(|| "no-reply@kakari.local".to_string()),
        };

        let config = Self {
            api,
            database,
            jwt,
            accounts,
            mail,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks cross-field constraints
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.jwt.secret.len() < MIN_SECRET_LENGTH {
            bail!("JWT_SECRET_KEY must be at least {} characters long", MIN_SECRET_LENGTH);
        }
        if self.jwt.refresh_secret.len() < MIN_SECRET_LENGTH {
            bail!(
                "JWT_REFRESH_SECRET_KEY must be at least {} characters long",
                MIN_SECRET_LENGTH
            );
        }
        if self.jwt.secret == self.jwt.refresh_secret {
            bail!("JWT_SECRET_KEY and JWT_REFRESH_SECRET_KEY must differ");
        }
        if self.jwt.access_token_minutes <= 0 || self.jwt.refresh_token_minutes <= 0 {
            bail!("Token expiration must be a positive number of minutes");
        }
        if self.accounts.password_reset_minutes <= 0 {
            bail!("PASSWORD_RESET_EXPIRATION_MINUTES must be positive");
        }
        if self.api.request_timeout_secs == 0 {
            bail!("REQUEST_TIMEOUT_SECS must be positive");
        }
        Ok(())
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Signing keys with the configured lifetimes
    pub fn token_keys(&self) -> TokenKeys {
        TokenKeys::new(&self.jwt.secret, &self.jwt.refresh_secret).with_ttls(
            Duration::minutes(self.jwt.access_token_minutes),
            Duration::minutes(self.jwt.refresh_token_minutes),
        )
    }

    /// Settings for the user directory
    pub fn user_settings(&self) -> UserDirectorySettings {
        UserDirectorySettings {
            reset_token_ttl: Duration::minutes(self.accounts.password_reset_minutes),
            ..UserDirectorySettings::new(&self.accounts.base_url)
        }
    }
}

fn parse_or<T, F>(var: &F, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {}", key, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const ACCESS: &str = "access-secret-at-least-32-bytes-long";
    const REFRESH: &str = "refresh-secret-at-least-32-bytes-long";

    fn load(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
        let mut vars: HashMap<String, String> = [
            ("JWT_SECRET_KEY", ACCESS),
            ("JWT_REFRESH_SECRET_KEY", REFRESH),
            ("BASE_URL", "https://kakari.example.com/"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        for (k, v) in pairs {
            vars.insert(k.to_string(), v.to_string());
        }
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert!(!config.api.production);
        assert_eq!(config.api.cors_origins, vec!["*".to_string()]);
        assert_eq!(config.api.request_timeout_secs, 30);
        assert!(config.database.is_none());
        assert_eq!(config.jwt.access_token_minutes, 15);
        assert_eq!(config.jwt.refresh_token_minutes, 10080);
        assert_eq!(config.accounts.password_reset_minutes, 60);
        assert_eq!(config.accounts.base_url, "https://kakari.example.com");
        assert!(config.mail.api_url.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("API_HOST", "127.0.0.1"),
            ("API_PORT", "9000"),
            ("API_PRODUCTION", "true"),
            ("CORS_ORIGINS", "https://a.example.com, https://b.example.com"),
            ("DATABASE_URL", "postgresql://localhost/kakari"),
            ("DATABASE_MAX_CONNECTIONS", "4"),
            ("PASSWORD_RESET_EXPIRATION_MINUTES", "5"),
        ])
        .unwrap();

        assert_eq!(config.bind_address(), "127.0.0.1:9000");
        assert!(config.api.production);
        assert_eq!(config.api.cors_origins.len(), 2);
        assert_eq!(config.database.as_ref().map(|db| db.max_connections), Some(4));
        assert_eq!(config.user_settings().reset_token_ttl, Duration::minutes(5));
    }

    #[test]
    fn test_missing_secret_is_rejected() {
        let result = Config::from_lookup(|key| match key {
            "BASE_URL" => Some("http://localhost".to_string()),
            _ => None,
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_short_or_shared_secrets_are_rejected() {
        assert!(load(&[("JWT_SECRET_KEY", "short")]).is_err());
        assert!(load(&[("JWT_REFRESH_SECRET_KEY", ACCESS)]).is_err());
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        let err = load(&[("API_PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("API_PORT"));
    }

    #[test]
    fn test_token_keys_use_configured_lifetimes() {
        let config = load(&[("ACCESS_TOKEN_EXPIRATION_MINUTES", "5")]).unwrap();
        let keys = config.token_keys();

        assert_eq!(keys.access_ttl, Duration::minutes(5));
        assert_eq!(keys.refresh_ttl, Duration::minutes(10080));
    }
}
