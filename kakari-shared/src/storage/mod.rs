/// Document store abstraction
///
/// Services talk to persistence only through the [`Storage`] trait. Two
/// implementations ship with the crate:
///
/// - [`postgres::PgStorage`]: PostgreSQL through a sqlx pool
/// - [`memory::MemoryStorage`]: process-local maps, used by tests and by the
///   API when no `DATABASE_URL` is configured
///
/// Most writes are whole-document: services load a record, modify it and hand
/// the full value back. List edits (project members and tasks, task comment
/// IDs) are single atomic operations instead, so concurrent edits to the same
/// list are never lost. There are no multi-document transactions.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use kakari_shared::storage::{memory::MemoryStorage, Storage};
///
/// # async fn example() -> Result<(), kakari_shared::storage::StorageError> {
/// let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
/// storage.health_check().await?;
/// # Ok(())
/// # }
/// ```

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{
    password_reset::PasswordReset,
    project::{Project, ProjectLink},
    task::{Task, TaskFilter},
    task_comment::TaskComment,
    user::User,
};

/// Storage result type
pub type Result<T> = std::result::Result<T, StorageError>;

/// Error type for storage operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// A unique index rejected the write; carries the field name
    #[error("Duplicate value for {0}")]
    Duplicate(String),

    /// The backing database failed
    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.is_unique_violation() {
                let field = match db_err.constraint() {
                    Some("users_email_key") => "email",
                    Some("users_username_key") => "username",
                    Some("password_resets_token_hash_key") => "token_hash",
                    Some(other) => other,
                    None => "unknown",
                };
                return StorageError::Duplicate(field.to_string());
            }
        }
        StorageError::Database(err.to_string())
    }
}

/// Persistence contract used by the directories
///
/// `update_*` and `delete_*` return whether a record with the given key
/// existed.
#[async_trait]
pub trait Storage: Send + Sync {
    // Users

    async fn insert_user(&self, user: &User) -> Result<()>;
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn update_user(&self, user: &User) -> Result<bool>;

    // Password resets

    /// Stores `reset`, replacing any record for the same email
    async fn upsert_password_reset(&self, reset: &PasswordReset) -> Result<()>;
    async fn find_password_reset_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<PasswordReset>>;
    async fn delete_password_reset(&self, email: &str) -> Result<bool>;

    // Tasks

    async fn insert_task(&self, task: &Task) -> Result<()>;
    async fn find_task(&self, id: Uuid) -> Result<Option<Task>>;
    /// Writes every task field except `comment_ids`
    async fn update_task(&self, task: &Task) -> Result<bool>;
    /// Appends to `comment_ids` atomically; false if the task is gone
    async fn append_task_comment(
        &self,
        task_id: Uuid,
        comment_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<bool>;
    /// Deletes a task together with its comments
    async fn delete_task(&self, id: Uuid) -> Result<bool>;
    /// Tasks matching `filter`, ordered by creation time
    async fn find_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>>;

    // Comments

    async fn insert_comment(&self, comment: &TaskComment) -> Result<()>;
    /// Comments of a task, oldest first
    async fn find_comments_for_task(&self, task_id: Uuid) -> Result<Vec<TaskComment>>;

    // Projects

    async fn insert_project(&self, project: &Project) -> Result<()>;
    async fn find_project(&self, id: Uuid) -> Result<Option<Project>>;
    /// All projects, ordered by creation time
    async fn list_projects(&self) -> Result<Vec<Project>>;
    async fn update_project(&self, project: &Project) -> Result<bool>;
    /// Adds `id` to one of the project's lists atomically
    ///
    /// Returns the stored project, or `None` if it does not exist. Adding an
    /// ID that is already present leaves the project untouched.
    async fn link_project(
        &self,
        project_id: Uuid,
        link: ProjectLink,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Project>>;
    /// Removes `id` from one of the project's lists atomically
    async fn unlink_project(
        &self,
        project_id: Uuid,
        link: ProjectLink,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Project>>;
    async fn delete_project(&self, id: Uuid) -> Result<bool>;

    /// Verifies the backend is reachable
    async fn health_check(&self) -> Result<()>;

    /// Short backend name for logs and health output
    fn backend_name(&self) -> &'static str;
}
