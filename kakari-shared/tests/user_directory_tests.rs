/// Integration tests for the user directory
///
/// Run against `MemoryStorage`; no database required.

mod common;

use chrono::Duration;
use kakari_shared::auth::authorization::Actor;
use kakari_shared::error::ServiceError;
use kakari_shared::models::password_reset::PasswordReset;
use kakari_shared::models::user::{NewUser, UserUpdate};
use kakari_shared::services::mail::MemoryMailer;
use kakari_shared::services::users::DeliveryStatus;
use kakari_shared::storage::Storage;
use uuid::Uuid;

use common::{context, context_with_mailer, new_user, token_from_email};

#[tokio::test]
async fn test_create_user_defaults() {
    let ctx = context();
    let (user, _) = ctx.user("Alice@Example.com").await;

    assert_eq!(user.email, "alice@example.com");
    assert_eq!(user.roles, vec!["user".to_string()]);
    assert!(!user.disabled);
    assert!(user.password_hash.starts_with("$argon2id$"));
    assert_ne!(user.password_hash, "password123");

    let found = ctx.directories.users.get_by_email("alice@example.com").await.unwrap();
    assert_eq!(found.map(|u| u.id), Some(user.id));

    let by_id = ctx.directories.users.get_by_id(user.id).await.unwrap();
    assert_eq!(by_id.map(|u| u.email), Some("alice@example.com".to_string()));
}

#[tokio::test]
async fn test_duplicate_email_is_rejected() {
    let ctx = context();
    ctx.user("dup@example.com").await;

    let result = ctx.directories.users.create_user(new_user("DUP@example.com")).await;
    assert!(matches!(result, Err(ServiceError::DuplicateUser(field)) if field == "email"));
}

#[tokio::test]
async fn test_duplicate_username_is_rejected() {
    let ctx = context();
    let with_name = |email: &str| NewUser {
        username: Some("jdoe".to_string()),
        ..new_user(email)
    };

    ctx.directories.users.create_user(with_name("a@example.com")).await.unwrap();
    let result = ctx.directories.users.create_user(with_name("b@example.com")).await;
    assert!(matches!(result, Err(ServiceError::DuplicateUser(field)) if field == "username"));
}

#[tokio::test]
async fn test_authenticate() {
    let ctx = context();
    let (user, _) = ctx.user("login@example.com").await;
    let users = &ctx.directories.users;

    let ok = users.authenticate("login@example.com", "password123").await.unwrap();
    assert_eq!(ok.map(|u| u.id), Some(user.id));

    assert!(users.authenticate("login@example.com", "wrong").await.unwrap().is_none());
    assert!(users.authenticate("nobody@example.com", "password123").await.unwrap().is_none());
}

#[tokio::test]
async fn test_update_user_self_and_admin() {
    let ctx = context();
    let (user, actor) = ctx.user("self@example.com").await;
    let (_, stranger) = ctx.user("stranger@example.com").await;
    let (_, admin) = ctx.admin("admin@example.com").await;
    let users = &ctx.directories.users;

    let updated = users
        .update_user(
            user.id,
            UserUpdate {
                full_name: Some(Some("Self Person".to_string())),
                ..Default::default()
            },
            &actor,
        )
        .await
        .unwrap();
    assert_eq!(updated.full_name.as_deref(), Some("Self Person"));
    assert!(updated.updated_at >= updated.created_at);

    let result = users
        .update_user(
            user.id,
            UserUpdate {
                username: Some("hijack".to_string()),
                ..Default::default()
            },
            &stranger,
        )
        .await;
    assert!(matches!(result, Err(ServiceError::Forbidden(_))));

    let disabled = users
        .update_user(
            user.id,
            UserUpdate {
                disabled: Some(true),
                ..Default::default()
            },
            &admin,
        )
        .await
        .unwrap();
    assert!(disabled.disabled);
}

#[tokio::test]
async fn test_only_admin_changes_account_flags() {
    let ctx = context();
    let (user, actor) = ctx.user("flags@example.com").await;

    let result = ctx
        .directories
        .users
        .update_user(
            user.id,
            UserUpdate {
                activated: Some(true),
                ..Default::default()
            },
            &actor,
        )
        .await;

    assert!(matches!(result, Err(ServiceError::Forbidden(_))));
}

#[tokio::test]
async fn test_update_user_email_collision() {
    let ctx = context();
    let (user, actor) = ctx.user("one@example.com").await;
    ctx.user("two@example.com").await;

    let result = ctx
        .directories
        .users
        .update_user(
            user.id,
            UserUpdate {
                email: Some("two@example.com".to_string()),
                ..Default::default()
            },
            &actor,
        )
        .await;

    assert!(matches!(result, Err(ServiceError::DuplicateUser(_))));
}

#[tokio::test]
async fn test_update_missing_user_is_not_found() {
    let ctx = context();
    let (_, admin) = ctx.admin("admin@example.com").await;

    let result = ctx
        .directories
        .users
        .update_user(Uuid::new_v4(), UserUpdate::default(), &admin)
        .await;
    assert!(matches!(result, Err(ServiceError::NotFound(_))));
}

#[tokio::test]
async fn test_update_roles() {
    let ctx = context();
    let (user, actor) = ctx.user("roles@example.com").await;
    let (_, admin) = ctx.admin("admin@example.com").await;
    let users = &ctx.directories.users;

    let result = users
        .update_roles(user.id, vec!["admin".to_string()], &actor)
        .await;
    assert!(matches!(result, Err(ServiceError::Unauthorized)));

    let missing = users
        .update_roles(Uuid::new_v4(), vec!["admin".to_string()], &actor)
        .await;
    assert!(matches!(missing, Err(ServiceError::NotFound(_))));

    let promoted = users
        .update_roles(
            user.id,
            vec!["user".to_string(), "admin".to_string(), "admin".to_string()],
            &admin,
        )
        .await
        .unwrap();
    assert_eq!(promoted.roles, vec!["user".to_string(), "admin".to_string()]);
    assert!(Actor::from_user(&promoted).is_admin());
}

#[tokio::test]
async fn test_change_password() {
    let ctx = context();
    let (user, _) = ctx.user("change@example.com").await;
    let users = &ctx.directories.users;

    let wrong = users.change_password(user.id, "nope", "newpassword").await;
    assert!(matches!(wrong, Err(ServiceError::IncorrectPassword)));

    users
        .change_password(user.id, "password123", "newpassword")
        .await
        .unwrap();

    assert!(users.authenticate("change@example.com", "password123").await.unwrap().is_none());
    assert!(users.authenticate("change@example.com", "newpassword").await.unwrap().is_some());
}

#[tokio::test]
async fn test_password_reset_round_trip() {
    let ctx = context();
    ctx.user("reset@example.com").await;
    let users = &ctx.directories.users;

    let request = users.request_password_reset("reset@example.com").await.unwrap();
    assert_eq!(request.delivery, DeliveryStatus::Sent);
    assert_eq!(request.email, "reset@example.com");

    let sent = ctx.mailer.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "reset@example.com");
    assert!(sent[0].body.contains("https://kakari.test/reset-password/"));

    let token = token_from_email(&sent[0].body);
    assert_eq!(token.len(), 32);

    users.reset_password(&token, "brand-new-pass").await.unwrap();
    assert!(users.authenticate("reset@example.com", "brand-new-pass").await.unwrap().is_some());
    assert!(users.authenticate("reset@example.com", "password123").await.unwrap().is_none());

    // Single use
    let again = users.reset_password(&token, "another-pass").await;
    assert!(matches!(again, Err(ServiceError::InvalidToken)));
}

#[tokio::test]
async fn test_new_reset_request_replaces_old_token() {
    let ctx = context();
    ctx.user("twice@example.com").await;
    let users = &ctx.directories.users;

    users.request_password_reset("twice@example.com").await.unwrap();
    users.request_password_reset("twice@example.com").await.unwrap();

    let sent = ctx.mailer.sent().await;
    let first = token_from_email(&sent[0].body);
    let second = token_from_email(&sent[1].body);

    assert!(matches!(
        users.reset_password(&first, "whatever1").await,
        Err(ServiceError::InvalidToken)
    ));
    users.reset_password(&second, "whatever2").await.unwrap();
}

#[tokio::test]
async fn test_reset_for_unknown_email() {
    let ctx = context();
    let result = ctx.directories.users.request_password_reset("ghost@example.com").await;

    assert!(matches!(result, Err(ServiceError::NotFound(_))));
    assert!(ctx.mailer.sent().await.is_empty());
}

#[tokio::test]
async fn test_reset_with_unknown_token() {
    let ctx = context();
    let result = ctx
        .directories
        .users
        .reset_password("0123456789abcdef0123456789abcdef", "newpass")
        .await;

    assert!(matches!(result, Err(ServiceError::InvalidToken)));
}

#[tokio::test]
async fn test_delivery_failure_is_reported_not_raised() {
    let ctx = context_with_mailer(MemoryMailer::failing("mail server unavailable"));
    ctx.user("offline@example.com").await;

    let request = ctx
        .directories
        .users
        .request_password_reset("offline@example.com")
        .await
        .unwrap();

    assert!(matches!(request.delivery, DeliveryStatus::Failed(reason) if reason.contains("mail server unavailable")));
}

#[tokio::test]
async fn test_expired_reset_token() {
    let ctx = context();
    ctx.user("late@example.com").await;

    let token = "fedcba9876543210fedcba9876543210";
    let issued = chrono::Utc::now() - Duration::hours(2);
    let reset = PasswordReset::issued_at(
        "late@example.com",
        kakari_shared::auth::reset_token::hash_reset_token(token),
        issued,
        Duration::hours(1),
    );
    ctx.directories.storage.upsert_password_reset(&reset).await.unwrap();

    let users = &ctx.directories.users;
    assert!(matches!(
        users.reset_password(token, "newpass").await,
        Err(ServiceError::ExpiredToken)
    ));
    // The expired record is discarded
    assert!(matches!(
        users.reset_password(token, "newpass").await,
        Err(ServiceError::InvalidToken)
    ));
}
