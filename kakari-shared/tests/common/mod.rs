//! Shared helpers for directory integration tests
//!
//! Every test gets a fresh `MemoryStorage`, a `MemoryMailer` it can inspect,
//! and minimal Argon2 parameters so hashing stays fast.

#![allow(dead_code)]

use std::sync::Arc;

use kakari_shared::auth::authorization::Actor;
use kakari_shared::auth::password::PasswordParams;
use kakari_shared::models::user::{NewUser, User};
use kakari_shared::services::mail::MemoryMailer;
use kakari_shared::services::users::UserDirectorySettings;
use kakari_shared::services::Directories;
use kakari_shared::storage::memory::MemoryStorage;

pub const BASE_URL: &str = "https://kakari.test";

pub struct TestContext {
    pub directories: Directories,
    pub mailer: Arc<MemoryMailer>,
}

pub fn settings() -> UserDirectorySettings {
    UserDirectorySettings {
        password_params: PasswordParams::minimal(),
        ..UserDirectorySettings::new(BASE_URL)
    }
}

pub fn context_with_mailer(mailer: MemoryMailer) -> TestContext {
    let mailer = Arc::new(mailer);
    let directories = Directories::new(Arc::new(MemoryStorage::new()), mailer.clone(), settings());
    TestContext {
        directories,
        mailer,
    }
}

pub fn context() -> TestContext {
    context_with_mailer(MemoryMailer::new())
}

pub fn new_user(email: &str) -> NewUser {
    NewUser {
        email: email.to_string(),
        username: None,
        password: "password123".to_string(),
        full_name: None,
        roles: vec![],
    }
}

impl TestContext {
    /// Registers a plain user
    pub async fn user(&self, email: &str) -> (User, Actor) {
        let user = self
            .directories
            .users
            .create_user(new_user(email))
            .await
            .expect("Failed to create user");
        let actor = Actor::from_user(&user);
        (user, actor)
    }

    /// Registers a user holding the admin role
    pub async fn admin(&self, email: &str) -> (User, Actor) {
        let user = self
            .directories
            .users
            .create_user(NewUser {
                roles: vec!["user".to_string(), "admin".to_string()],
                ..new_user(email)
            })
            .await
            .expect("Failed to create admin");
        let actor = Actor::from_user(&user);
        (user, actor)
    }
}

/// Extracts the reset token from the link in a reset email body
pub fn token_from_email(body: &str) -> String {
    let marker = "/reset-password/";
    let start = body.find(marker).expect("Email should contain reset link") + marker.len();
    body[start..]
        .chars()
        .take_while(|c| c.is_ascii_hexdigit())
        .collect()
}
