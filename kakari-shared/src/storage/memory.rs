/// In-memory storage backend
///
/// Keeps every collection behind one `tokio::sync::RwLock`; comments stay in
/// insertion order. Unique constraints on user email and username are
/// enforced the same way the PostgreSQL schema enforces them, so services
/// behave identically on both backends.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{Result, Storage, StorageError};
use crate::models::{
    password_reset::PasswordReset,
    project::{Project, ProjectLink},
    task::{Task, TaskFilter},
    task_comment::TaskComment,
    user::User,
};

#[derive(Default)]
struct StorageData {
    users: HashMap<Uuid, User>,
    resets: HashMap<String, PasswordReset>, // email -> reset
    tasks: HashMap<Uuid, Task>,
    comments: Vec<TaskComment>,
    projects: HashMap<Uuid, Project>,
}

impl StorageData {
    /// Rejects `user` if another user already holds its email or username
    fn check_user_unique(&self, user: &User) -> Result<()> {
        for other in self.users.values().filter(|other| other.id != user.id) {
            if other.email == user.email {
                return Err(StorageError::Duplicate("email".to_string()));
            }
            if user.username.is_some() && other.username == user.username {
                return Err(StorageError::Duplicate("username".to_string()));
            }
        }
        Ok(())
    }
}

/// In-memory storage implementation
#[derive(Default)]
pub struct MemoryStorage {
    data: RwLock<StorageData>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn insert_user(&self, user: &User) -> Result<()> {
        let mut data = self.data.write().await;
        data.check_user_unique(user)?;
        if data.users.contains_key(&user.id) {
            return Err(StorageError::Duplicate("id".to_string()));
        }
        data.users.insert(user.id, user.clone());
        debug!(user_id = %user.id, "Inserted user");
        Ok(())
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.data.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let data = self.data.read().await;
        Ok(data.users.values().find(|user| user.email == email).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let data = self.data.read().await;
        Ok(data
            .users
            .values()
            .find(|user| user.username.as_deref() == Some(username))
            .cloned())
    }

    async fn update_user(&self, user: &User) -> Result<bool> {
        let mut data = self.data.write().await;
        if !data.users.contains_key(&user.id) {
            return Ok(false);
        }
        data.check_user_unique(user)?;
        data.users.insert(user.id, user.clone());
        Ok(true)
    }

    async fn upsert_password_reset(&self, reset: &PasswordReset) -> Result<()> {
        let mut data = self.data.write().await;
        data.resets.insert(reset.email.clone(), reset.clone());
        Ok(())
    }

    async fn find_password_reset_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<PasswordReset>> {
        let data = self.data.read().await;
        Ok(data
            .resets
            .values()
            .find(|reset| reset.token_hash == token_hash)
            .cloned())
    }

    async fn delete_password_reset(&self, email: &str) -> Result<bool> {
        Ok(self.data.write().await.resets.remove(email).is_some())
    }

    async fn insert_task(&self, task: &Task) -> Result<()> {
        let mut data = self.data.write().await;
        if data.tasks.contains_key(&task.id) {
            return Err(StorageError::Duplicate("id".to_string()));
        }
        data.tasks.insert(task.id, task.clone());
        debug!(task_id = %task.id, "Inserted task");
        Ok(())
    }

    async fn find_task(&self, id: Uuid) -> Result<Option<Task>> {
        Ok(self.data.read().await.tasks.get(&id).cloned())
    }

    async fn update_task(&self, task: &Task) -> Result<bool> {
        let mut data = self.data.write().await;
        match data.tasks.get_mut(&task.id) {
            Some(existing) => {
                let comment_ids = std::mem::take(&mut existing.comment_ids);
                *existing = Task {
                    comment_ids,
                    ..task.clone()
                };
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn append_task_comment(
        &self,
        task_id: Uuid,
        comment_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let mut data = self.data.write().await;
        match data.tasks.get_mut(&task_id) {
            Some(task) => {
                task.comment_ids.push(comment_id);
                task.updated_at = at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_task(&self, id: Uuid) -> Result<bool> {
        let mut data = self.data.write().await;
        let removed = data.tasks.remove(&id).is_some();
        if removed {
            data.comments.retain(|comment| comment.task_id != id);
            debug!(task_id = %id, "Deleted task");
        }
        Ok(removed)
    }

    async fn find_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>> {
        let data = self.data.read().await;
        let mut tasks: Vec<Task> = data
            .tasks
            .values()
            .filter(|task| filter.matches(task))
            .cloned()
            .collect();
        tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(tasks)
    }

    async fn insert_comment(&self, comment: &TaskComment) -> Result<()> {
        let mut data = self.data.write().await;
        data.comments.push(comment.clone());
        Ok(())
    }

    async fn find_comments_for_task(&self, task_id: Uuid) -> Result<Vec<TaskComment>> {
        let data = self.data.read().await;
        let mut comments: Vec<TaskComment> = data
            .comments
            .iter()
            .filter(|comment| comment.task_id == task_id)
            .cloned()
            .collect();
        comments.sort_by_key(|comment| comment.created_at);
        Ok(comments)
    }

    async fn insert_project(&self, project: &Project) -> Result<()> {
        let mut data = self.data.write().await;
        if data.projects.contains_key(&project.id) {
            return Err(StorageError::Duplicate("id".to_string()));
        }
        data.projects.insert(project.id, project.clone());
        debug!(project_id = %project.id, "Inserted project");
        Ok(())
    }

    async fn find_project(&self, id: Uuid) -> Result<Option<Project>> {
        Ok(self.data.read().await.projects.get(&id).cloned())
    }

    async fn list_projects(&self) -> Result<Vec<Project>> {
        let data = self.data.read().await;
        let mut projects: Vec<Project> = data.projects.values().cloned().collect();
        projects.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(projects)
    }

    async fn update_project(&self, project: &Project) -> Result<bool> {
        let mut data = self.data.write().await;
        match data.projects.get_mut(&project.id) {
            Some(existing) => {
                *existing = project.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn link_project(
        &self,
        project_id: Uuid,
        link: ProjectLink,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Project>> {
        let mut data = self.data.write().await;
        Ok(data.projects.get_mut(&project_id).map(|project| {
            if project.link(link, id) {
                project.updated_at = now;
            }
            project.clone()
        }))
    }

    async fn unlink_project(
        &self,
        project_id: Uuid,
        link: ProjectLink,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Project>> {
        let mut data = self.data.write().await;
        Ok(data.projects.get_mut(&project_id).map(|project| {
            if project.unlink(link, id) {
                project.updated_at = now;
            }
            project.clone()
        }))
    }

    async fn delete_project(&self, id: Uuid) -> Result<bool> {
        Ok(self.data.write().await.projects.remove(&id).is_some())
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
