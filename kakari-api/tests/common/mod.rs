//! Common test utilities for API integration tests
//!
//! Builds the full router over `MemoryStorage` with a recording mailer, so
//! every test gets an isolated, empty backend:
//! - Request helpers returning status and parsed JSON
//! - User registration, login and admin promotion
//! - Reset token extraction from sent emails

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use kakari_api::app::{build_router, AppState};
use kakari_api::config::{AccountConfig, ApiConfig, Config, JwtConfig, MailConfig};
use kakari_shared::auth::password::PasswordParams;
use kakari_shared::services::mail::MemoryMailer;
use kakari_shared::services::users::UserDirectorySettings;
use kakari_shared::services::Directories;
use kakari_shared::storage::{memory::MemoryStorage, Storage};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::Service as _;
use uuid::Uuid;

pub const BASE_URL: &str = "https://kakari.test";
pub const PASSWORD: &str = "password123";

/// Test configuration; no environment access
pub fn test_config() -> Config {
    Config {
        api: ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            production: false,
            cors_origins: vec!["*".to_string()],
            request_timeout_secs: 30,
        },
        database: None,
        jwt: JwtConfig {
            secret: "test-access-secret-at-least-32-bytes".to_string(),
            refresh_secret: "test-refresh-secret-at-least-32-bytes".to_string(),
            access_token_minutes: 15,
            refresh_token_minutes: 60,
        },
        accounts: AccountConfig {
            base_url: BASE_URL.to_string(),
            password_reset_minutes: 60,
        },
        mail: MailConfig {
            api_url: None,
            api_token: None,
            from: "no-reply@kakari.test".to_string(),
        },
    }
}

/// Router plus handles into its backend
pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub mailer: Arc<MemoryMailer>,
}

/// A registered, logged-in user
pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub token: String,
}

impl TestApp {
    pub fn new() -> Self {
        let config = test_config();
        let mailer = Arc::new(MemoryMailer::new());
        let settings = UserDirectorySettings {
            password_params: PasswordParams::minimal(),
            ..config.user_settings()
        };
        let directories = Directories::new(Arc::new(MemoryStorage::new()), mailer.clone(), settings);
        let state = AppState::new(directories, config);

        Self {
            app: build_router(state.clone()),
            state,
            mailer,
        }
    }

    /// Sends a request and returns the status and JSON body (`Null` when empty)
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let (status, _, body) = self.request_full(method, uri, token, body).await;
        (status, body)
    }

    /// Like [`request`](Self::request) but also returns the response headers
    pub async fn request_full(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, axum::http::HeaderMap, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().call(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, headers, value)
    }

    /// Sends an unauthenticated POST with a raw body and content type
    pub async fn post_raw(
        &self,
        uri: &str,
        content_type: &str,
        body: impl Into<String>,
    ) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body.into()))
            .unwrap();

        let response = self.app.clone().call(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, Some(token), None).await
    }

    /// Registers `email` through the API and returns the created user JSON
    pub async fn register(&self, email: &str) -> Value {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/v1/user/create",
                None,
                Some(json!({ "email": email, "password": PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "register failed: {}", body);
        body
    }

    /// Logs in and returns the full token response
    pub async fn login(&self, email: &str, password: &str) -> (StatusCode, Value) {
        self.request(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": email, "password": password })),
        )
        .await
    }

    /// Registers and logs in a regular user
    pub async fn user(&self, email: &str) -> TestUser {
        let created = self.register(email).await;
        let (status, body) = self.login(email, PASSWORD).await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);

        TestUser {
            id: created["id"].as_str().unwrap().parse().unwrap(),
            email: email.to_string(),
            token: body["access_token"].as_str().unwrap().to_string(),
        }
    }

    /// Registers a user and grants the admin role directly in storage
    pub async fn admin(&self, email: &str) -> TestUser {
        let user = self.user(email).await;

        let storage = &self.state.directories.storage;
        let mut stored = storage.find_user_by_id(user.id).await.unwrap().unwrap();
        stored.roles.push("admin".to_string());
        assert!(storage.update_user(&stored).await.unwrap());

        user
    }
}

/// Pulls the reset token out of a password reset email body
pub fn token_from_email(body: &str) -> String {
    let marker = "/reset-password/";
    let start = body.find(marker).expect("no reset link in email") + marker.len();
    body[start..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect()
}
