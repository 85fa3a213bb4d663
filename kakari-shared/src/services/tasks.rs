/// Task directory
///
/// Task CRUD, the query helpers used by the task routes, and task comments.
///
/// Any authenticated user may edit a task, except that moving its due date
/// is reserved for the task's creator and admins.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::authorization::Actor;
use crate::error::{ServiceError, ServiceResult};
use crate::models::task::{NewTask, Task, TaskFilter, TaskStatus, TaskUpdate};
use crate::models::task_comment::TaskComment;
use crate::storage::Storage;

/// Something that names a calendar day (UTC)
///
/// Implemented for `NaiveDate`, `DateTime<Utc>` (its UTC date), and strings in
/// `YYYY-MM-DD` or RFC 3339 form.
pub trait IntoDueDay {
    fn into_due_day(self) -> ServiceResult<NaiveDate>;
}

impl IntoDueDay for NaiveDate {
    fn into_due_day(self) -> ServiceResult<NaiveDate> {
        Ok(self)
    }
}

impl IntoDueDay for DateTime<Utc> {
    fn into_due_day(self) -> ServiceResult<NaiveDate> {
        Ok(self.date_naive())
    }
}

impl IntoDueDay for &str {
    fn into_due_day(self) -> ServiceResult<NaiveDate> {
        let trimmed = self.trim();
        if let Ok(day) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
            return Ok(day);
        }
        DateTime::parse_from_rfc3339(trimmed)
            .map(|instant| instant.with_timezone(&Utc).date_naive())
            .map_err(|_| ServiceError::InvalidDate(self.to_string()))
    }
}

impl IntoDueDay for String {
    fn into_due_day(self) -> ServiceResult<NaiveDate> {
        self.as_str().into_due_day()
    }
}

/// Half-open UTC range `[day 00:00, next day 00:00)`
pub fn day_bounds(day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = day.and_time(NaiveTime::MIN).and_utc();
    (start, start + Duration::days(1))
}

/// Service for tasks and their comments
#[derive(Clone)]
pub struct TaskDirectory {
    storage: Arc<dyn Storage>,
}

impl TaskDirectory {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Creates a task owned by `creator`
    ///
    /// Status starts at `NOT_STARTED`; the due date defaults to now.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the assignee is not a known user
    pub async fn create_task(&self, creator: &Actor, new_task: NewTask) -> ServiceResult<Task> {
        if let Some(assignee_id) = new_task.assignee_id {
            self.require_user(assignee_id).await?;
        }

        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4(),
            title: new_task.title,
            description: new_task.description,
            complete: new_task.complete.unwrap_or(false),
            status: TaskStatus::NotStarted,
            created_at: now,
            updated_at: now,
            due_date: new_task.due_date.unwrap_or(now),
            creator_id: creator.id,
            assignee_id: new_task.assignee_id,
            comment_ids: Vec::new(),
        };

        self.storage.insert_task(&task).await?;
        info!(task_id = %task.id, creator = %creator.id, "Task created");
        Ok(task)
    }

    pub async fn get_by_id(&self, task_id: Uuid) -> ServiceResult<Option<Task>> {
        Ok(self.storage.find_task(task_id).await?)
    }

    /// Applies a partial update
    ///
    /// # Errors
    ///
    /// - `NotFound` if the task does not exist
    /// - `Forbidden` if the update moves the due date and the actor is neither
    ///   the creator nor an admin
    /// - `NotFound` if the new assignee is not a known user
    pub async fn update_task(&self, task_id: Uuid, update: TaskUpdate, actor: &Actor) -> ServiceResult<Task> {
        let mut task = self.require_task(task_id).await?;

        if update.due_date.is_some() && !actor.is(task.creator_id) && !actor.is_admin() {
            return Err(ServiceError::Forbidden(
                "Only the task creator or an admin may change the due date".to_string(),
            ));
        }
        if let Some(Some(assignee_id)) = update.assignee_id {
            self.require_user(assignee_id).await?;
        }

        update.apply(&mut task, Utc::now());
        if !self.storage.update_task(&task).await? {
            return Err(ServiceError::NotFound("Task"));
        }

        debug!(task_id = %task.id, actor = %actor.id, "Task updated");
        Ok(task)
    }

    /// Deletes a task; deleting a missing task succeeds
    pub async fn delete_task(&self, task_id: Uuid) -> ServiceResult<()> {
        if self.storage.delete_task(task_id).await? {
            info!(task_id = %task_id, "Task deleted");
        }
        Ok(())
    }

    pub async fn list_by_creator(&self, user_id: Uuid) -> ServiceResult<Vec<Task>> {
        self.find(TaskFilter::default().created_by(user_id)).await
    }

    pub async fn list_by_assignee(&self, user_id: Uuid) -> ServiceResult<Vec<Task>> {
        self.find(TaskFilter::default().assigned_to(user_id)).await
    }

    /// Tasks due strictly before the current time
    pub async fn list_overdue(&self) -> ServiceResult<Vec<Task>> {
        self.list_overdue_as_of(Utc::now()).await
    }

    /// Tasks due strictly before `now`
    pub async fn list_overdue_as_of(&self, now: DateTime<Utc>) -> ServiceResult<Vec<Task>> {
        self.find(TaskFilter::default().due_before(now)).await
    }

    pub async fn list_overdue_by_assignee(&self, user_id: Uuid) -> ServiceResult<Vec<Task>> {
        self.find(TaskFilter::default().assigned_to(user_id).due_before(Utc::now()))
            .await
    }

    /// Tasks due on the given UTC day
    ///
    /// # Errors
    ///
    /// `InvalidDate` if `day` is a string that is not a date.
    pub async fn list_by_due_date(&self, day: impl IntoDueDay) -> ServiceResult<Vec<Task>> {
        let (start, end) = day_bounds(day.into_due_day()?);
        self.find(TaskFilter::default().due_within(start, end)).await
    }

    pub async fn list_by_due_date_and_assignee(
        &self,
        day: impl IntoDueDay,
        user_id: Uuid,
    ) -> ServiceResult<Vec<Task>> {
        let (start, end) = day_bounds(day.into_due_day()?);
        self.find(TaskFilter::default().assigned_to(user_id).due_within(start, end))
            .await
    }

    /// Adds a comment and appends its ID to the task
    ///
    /// # Errors
    ///
    /// - `NotFound` if the task does not exist
    /// - `Validation` if the content is blank
    pub async fn add_comment(&self, task_id: Uuid, author: &Actor, content: &str) -> ServiceResult<TaskComment> {
        self.require_task(task_id).await?;

        let content = content.trim();
        if content.is_empty() {
            return Err(ServiceError::Validation("comment must not be empty".to_string()));
        }

        let comment = TaskComment {
            id: Uuid::new_v4(),
            task_id,
            content: content.to_string(),
            author_id: author.id,
            created_at: Utc::now(),
        };
        self.storage.insert_comment(&comment).await?;

        if !self
            .storage
            .append_task_comment(task_id, comment.id, comment.created_at)
            .await?
        {
            return Err(ServiceError::NotFound("Task"));
        }

        debug!(task_id = %task_id, comment_id = %comment.id, "Comment added");
        Ok(comment)
    }

    /// Comments on a task, oldest first
    pub async fn list_comments(&self, task_id: Uuid) -> ServiceResult<Vec<TaskComment>> {
        self.require_task(task_id).await?;
        Ok(self.storage.find_comments_for_task(task_id).await?)
    }

    async fn require_user(&self, user_id: Uuid) -> ServiceResult<()> {
        match self.storage.find_user_by_id(user_id).await? {
            Some(_) => Ok(()),
            None => Err(ServiceError::NotFound("User")),
        }
    }

    async fn require_task(&self, task_id: Uuid) -> ServiceResult<Task> {
        self.storage
            .find_task(task_id)
            .await?
            .ok_or(ServiceError::NotFound("Task"))
    }

    async fn find(&self, filter: TaskFilter) -> ServiceResult<Vec<Task>> {
        Ok(self.storage.find_tasks(&filter).await?)
    }
}
