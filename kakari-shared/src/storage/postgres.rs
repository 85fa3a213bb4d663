/// PostgreSQL storage backend
///
/// Thin adapter from the [`Storage`] trait onto the per-model query functions
/// in [`crate::models`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use super::{Result, Storage, StorageError};
use crate::db::pool::health_check;
use crate::models::{
    password_reset::PasswordReset,
    project::{Project, ProjectLink},
    task::{Task, TaskFilter},
    task_comment::TaskComment,
    user::User,
};

/// Storage backed by a sqlx PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    /// Wraps an existing pool; migrations must already be applied
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Underlying connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Storage for PgStorage {
    async fn insert_user(&self, user: &User) -> Result<()> {
        debug!(user_id = %user.id, "Inserting user");
        User::insert(&self.pool, user).await.map_err(StorageError::from)
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(User::find_by_id(&self.pool, id).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(User::find_by_email(&self.pool, email).await?)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(User::find_by_username(&self.pool, username).await?)
    }

    async fn update_user(&self, user: &User) -> Result<bool> {
        debug!(user_id = %user.id, "Updating user");
        Ok(User::replace(&self.pool, user).await?)
    }

    async fn upsert_password_reset(&self, reset: &PasswordReset) -> Result<()> {
        Ok(PasswordReset::upsert(&self.pool, reset).await?)
    }

    async fn find_password_reset_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<PasswordReset>> {
        Ok(PasswordReset::find_by_token_hash(&self.pool, token_hash).await?)
    }

    async fn delete_password_reset(&self, email: &str) -> Result<bool> {
        Ok(PasswordReset::delete(&self.pool, email).await?)
    }

    async fn insert_task(&self, task: &Task) -> Result<()> {
        debug!(task_id = %task.id, "Inserting task");
        Ok(Task::insert(&self.pool, task).await?)
    }

    async fn find_task(&self, id: Uuid) -> Result<Option<Task>> {
        Ok(Task::find_by_id(&self.pool, id).await?)
    }

    async fn update_task(&self, task: &Task) -> Result<bool> {
        debug!(task_id = %task.id, "Updating task");
        Ok(Task::replace(&self.pool, task).await?)
    }

    async fn append_task_comment(
        &self,
        task_id: Uuid,
        comment_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        Ok(Task::append_comment(&self.pool, task_id, comment_id, at).await?)
    }

    async fn delete_task(&self, id: Uuid) -> Result<bool> {
        debug!(task_id = %id, "Deleting task");
        Ok(Task::delete(&self.pool, id).await?)
    }

    async fn find_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>> {
        Ok(Task::find_filtered(&self.pool, filter).await?)
    }

    async fn insert_comment(&self, comment: &TaskComment) -> Result<()> {
        Ok(TaskComment::insert(&self.pool, comment).await?)
    }

    async fn find_comments_for_task(&self, task_id: Uuid) -> Result<Vec<TaskComment>> {
        Ok(TaskComment::list_for_task(&self.pool, task_id).await?)
    }

    async fn insert_project(&self, project: &Project) -> Result<()> {
        debug!(project_id = %project.id, "Inserting project");
        Ok(Project::insert(&self.pool, project).await?)
    }

    async fn find_project(&self, id: Uuid) -> Result<Option<Project>> {
        Ok(Project::find_by_id(&self.pool, id).await?)
    }

    async fn list_projects(&self) -> Result<Vec<Project>> {
        Ok(Project::list(&self.pool).await?)
    }

    async fn update_project(&self, project: &Project) -> Result<bool> {
        debug!(project_id = %project.id, "Updating project");
        Ok(Project::replace(&self.pool, project).await?)
    }

    async fn link_project(
        &self,
        project_id: Uuid,
        link: ProjectLink,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Project>> {
        Ok(Project::add_link(&self.pool, project_id, link, id, now).await?)
    }

    async fn unlink_project(
        &self,
        project_id: Uuid,
        link: ProjectLink,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Project>> {
        Ok(Project::remove_link(&self.pool, project_id, link, id, now).await?)
    }

    async fn delete_project(&self, id: Uuid) -> Result<bool> {
        debug!(project_id = %id, "Deleting project");
        Ok(Project::delete(&self.pool, id).await?)
    }

    async fn health_check(&self) -> Result<()> {
        Ok(health_check(&self.pool).await?)
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
