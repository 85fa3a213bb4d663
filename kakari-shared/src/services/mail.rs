/// Outbound email transport
///
/// The user directory sends password reset links through a [`Mailer`].
/// Transports:
///
/// - [`LogMailer`]: writes the message to the log, for development
/// - [`HttpMailer`]: POSTs the message as JSON to a transactional mail API
/// - [`MemoryMailer`]: keeps messages in memory so tests can read them back
///
/// # Example
///
/// ```
/// use kakari_shared::services::mail::{EmailMessage, LogMailer, Mailer};
///
/// # async fn example() -> Result<(), kakari_shared::services::mail::MailError> {
/// let mailer = LogMailer;
/// mailer
///     .send(&EmailMessage::new("user@example.com", "Hello", "Body"))
///     .await?;
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Error type for mail delivery
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    /// Request could not be sent
    #[error("Mail transport error: {0}")]
    Transport(String),

    /// Mail API answered with a non-success status
    #[error("Mail API rejected message with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// A plain-text email
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    /// Recipient address
    pub to: String,

    /// Subject line
    pub subject: String,

    /// Plain-text body
    pub body: String,
}

impl EmailMessage {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }
}

/// Email transport
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Delivers one message
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError>;
}

/// Mailer that only logs messages
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        info!(
            to = %message.to,
            subject = %message.subject,
            body = %message.body,
            "Email (log transport)"
        );
        Ok(())
    }
}

/// Mailer that keeps every message in memory
///
/// Useful where delivery must be observed, such as integration tests.
#[derive(Debug, Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<EmailMessage>>,
    fail_with: Option<String>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mailer whose every send fails with `reason`
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_with: Some(reason.into()),
        }
    }

    /// Messages delivered so far
    pub async fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        if let Some(reason) = &self.fail_with {
            return Err(MailError::Transport(reason.clone()));
        }
        self.sent.lock().await.push(message.clone());
        Ok(())
    }
}

/// JSON payload accepted by the mail API
#[derive(Debug, Serialize)]
struct MailApiPayload<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

/// Mailer that delivers through an HTTP mail API with bearer authentication
#[derive(Debug, Clone)]
pub struct HttpMailer {
    client: reqwest::Client,
    api_url: String,
    api_token: Option<String>,
    from: String,
}

impl HttpMailer {
    /// Creates a mailer posting to `api_url`
    ///
    /// # Errors
    ///
    /// Returns `MailError::Transport` if the HTTP client cannot be built.
    pub fn new(
        api_url: impl Into<String>,
        api_token: Option<String>,
        from: impl Into<String>,
    ) -> Result<Self, MailError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| MailError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            api_url: api_url.into(),
            api_token,
            from: from.into(),
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        let payload = MailApiPayload {
            from: &self.from,
            to: &message.to,
            subject: &message.subject,
            text: &message.body,
        };

        let mut request = self.client.post(&self.api_url).json(&payload);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!(to = %message.to, "Email accepted by mail API");
        Ok(())
    }
}

/// Builds the password reset email for `token`
pub fn password_reset_email(to: &str, base_url: &str, token: &str) -> EmailMessage {
    let link = format!("{}/reset-password/{}", base_url.trim_end_matches('/'), token);
    EmailMessage::new(
        to,
        "Password Reset Request",
        format!(
            "A password reset was requested for your account.\n\n\
             Open the link below to choose a new password:\n{}\n\n\
             If you did not request this, you can ignore this email.",
            link
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_email_contains_link() {
        let message = password_reset_email("a@example.com", "https://app.example.com/", "abc123");

        assert_eq!(message.to, "a@example.com");
        assert_eq!(message.subject, "Password Reset Request");
        assert!(message
            .body
            .contains("https://app.example.com/reset-password/abc123"));
    }

    #[tokio::test]
    async fn test_log_mailer_always_succeeds() {
        let message = EmailMessage::new("a@example.com", "Subject", "Body");
        assert!(LogMailer.send(&message).await.is_ok());
    }

    #[tokio::test]
    async fn test_memory_mailer_records_and_fails() {
        let mailer = MemoryMailer::new();
        let message = EmailMessage::new("a@example.com", "Subject", "Body");
        mailer.send(&message).await.unwrap();
        assert_eq!(mailer.sent().await, vec![message.clone()]);

        let failing = MemoryMailer::failing("smtp down");
        assert!(matches!(
            failing.send(&message).await,
            Err(MailError::Transport(reason)) if reason == "smtp down"
        ));
        assert!(failing.sent().await.is_empty());
    }

    #[test]
    fn test_http_mailer_builds() {
        let mailer = HttpMailer::new("http://localhost:9/send", None, "noreply@example.com");
        assert!(mailer.is_ok());
    }
}
