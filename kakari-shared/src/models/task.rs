/// Task model and database operations
///
/// Tasks are units of work created by a user, optionally assigned to another
/// user, and carrying a due date. Comments live in their own table and the
/// task keeps the ordered list of their IDs.
///
/// # Status
///
/// ```text
/// NOT_STARTED → UNDER_PROCESS → COMPLETED
/// ```
///
/// Status is free-form: any value may be set by an update, there is no
/// enforced state machine.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM ('NOT_STARTED', 'UNDER_PROCESS', 'COMPLETED');
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY,
///     title TEXT NOT NULL,
///     description TEXT NOT NULL,
///     complete BOOLEAN NOT NULL DEFAULT FALSE,
///     status task_status NOT NULL DEFAULT 'NOT_STARTED',
///     created_at TIMESTAMPTZ NOT NULL,
///     updated_at TIMESTAMPTZ NOT NULL,
///     due_date TIMESTAMPTZ NOT NULL,
///     creator_id UUID NOT NULL REFERENCES users(id),
///     assignee_id UUID REFERENCES users(id),
///     comment_ids UUID[] NOT NULL DEFAULT '{}'
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use kakari_shared::models::task::{Task, TaskFilter};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, user_id: Uuid) -> Result<(), sqlx::Error> {
/// let mine = Task::find_filtered(&pool, &TaskFilter::default().created_by(user_id)).await?;
/// println!("{} tasks", mine.len());
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Task progress status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// Nobody has started on the task
    #[default]
    #[serde(alias = "Not Started")]
    NotStarted,

    /// Work is in progress
    #[serde(alias = "Under Process")]
    UnderProcess,

    /// Work is done
    #[serde(alias = "Completed")]
    Completed,
}

impl TaskStatus {
    /// Converts status to its stored string form
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "NOT_STARTED",
            TaskStatus::UnderProcess => "UNDER_PROCESS",
            TaskStatus::Completed => "COMPLETED",
        }
    }
}

/// Task model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    /// Unique task ID
    pub id: Uuid,

    /// Short title
    pub title: String,

    /// Free-text description
    pub description: String,

    /// Completion flag, independent of `status`
    pub complete: bool,

    /// Progress status
    pub status: TaskStatus,

    /// When the task was created
    pub created_at: DateTime<Utc>,

    /// When the task was last written
    pub updated_at: DateTime<Utc>,

    /// When the task is due
    pub due_date: DateTime<Utc>,

    /// User who created the task
    pub creator_id: Uuid,

    /// User the task is assigned to
    pub assignee_id: Option<Uuid>,

    /// Comment IDs, oldest first
    pub comment_ids: Vec<Uuid>,
}

impl Task {
    /// Whether the task was due strictly before `now`
    pub fn is_overdue_at(&self, now: DateTime<Utc>) -> bool {
        self.due_date < now
    }

    /// Inserts a fully populated task row
    pub async fn insert(pool: &PgPool, task: &Task) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO tasks (id, title, description, complete, status, created_at,
                               updated_at, due_date, creator_id, assignee_id, comment_ids)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(task.id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.complete)
        .bind(task.status)
        .bind(task.created_at)
        .bind(task.updated_at)
        .bind(task.due_date)
        .bind(task.creator_id)
        .bind(task.assignee_id)
        .bind(&task.comment_ids)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Finds a task by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            SELECT id, title, description, complete, status, created_at, updated_at,
                   due_date, creator_id, assignee_id, comment_ids
            FROM tasks
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Lists tasks matching every predicate set on `filter`
    ///
    /// Results are ordered by creation time.
    pub async fn find_filtered(pool: &PgPool, filter: &TaskFilter) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            SELECT id, title, description, complete, status, created_at, updated_at,
                   due_date, creator_id, assignee_id, comment_ids
            FROM tasks
            WHERE ($1::uuid IS NULL OR creator_id = $1)
              AND ($2::uuid IS NULL OR assignee_id = $2)
              AND ($3::timestamptz IS NULL OR due_date >= $3)
              AND ($4::timestamptz IS NULL OR due_date < $4)
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(filter.creator_id)
        .bind(filter.assignee_id)
        .bind(filter.due_from)
        .bind(filter.due_before)
        .fetch_all(pool)
        .await
    }

    /// Replaces the editable columns of an existing task
    ///
    /// `comment_ids` is left alone; comments go through [`Task::append_comment`].
    ///
    /// # Returns
    ///
    /// True if the task existed and was updated
    pub async fn replace(pool: &PgPool, task: &Task) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET title = $2,
                description = $3,
                complete = $4,
                status = $5,
                updated_at = $6,
                due_date = $7,
                assignee_id = $8
            WHERE id = $1
            "#,
        )
        .bind(task.id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.complete)
        .bind(task.status)
        .bind(task.updated_at)
        .bind(task.due_date)
        .bind(task.assignee_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Appends a comment ID and stamps `updated_at` in one statement
    pub async fn append_comment(
        pool: &PgPool,
        task_id: Uuid,
        comment_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET comment_ids = array_append(comment_ids, $2),
                updated_at = $3
            WHERE id = $1
            "#,
        )
        .bind(task_id)
        .bind(comment_id)
        .bind(at)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes a task (its comments cascade)
    ///
    /// # Returns
    ///
    /// True if a task was deleted
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Predicates for task queries
///
/// Unset fields match everything. The due-date range is half-open:
/// `due_from <= due_date < due_before`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskFilter {
    /// Only tasks created by this user
    pub creator_id: Option<Uuid>,

    /// Only tasks assigned to this user
    pub assignee_id: Option<Uuid>,

    /// Inclusive lower bound on `due_date`
    pub due_from: Option<DateTime<Utc>>,

    /// Exclusive upper bound on `due_date`
    pub due_before: Option<DateTime<Utc>>,
}

impl TaskFilter {
    pub fn created_by(mut self, user_id: Uuid) -> Self {
        self.creator_id = Some(user_id);
        self
    }

    pub fn assigned_to(mut self, user_id: Uuid) -> Self {
        self.assignee_id = Some(user_id);
        self
    }

    pub fn due_before(mut self, instant: DateTime<Utc>) -> Self {
        self.due_before = Some(instant);
        self
    }

    /// Restricts to `[start, end)`
    pub fn due_within(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.due_from = Some(start);
        self.due_before = Some(end);
        self
    }

    /// Evaluates the filter against a task in memory
    pub fn matches(&self, task: &Task) -> bool {
        self.creator_id.map_or(true, |id| task.creator_id == id)
            && self.assignee_id.map_or(true, |id| task.assignee_id == Some(id))
            && self.due_from.map_or(true, |from| task.due_date >= from)
            && self.due_before.map_or(true, |before| task.due_date < before)
    }
}

/// Input for creating a task
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTask {
    /// Task title
    pub title: String,

    /// Task description
    pub description: String,

    /// Initial completion flag (false when absent)
    pub complete: Option<bool>,

    /// Due date (creation time when absent)
    pub due_date: Option<DateTime<Utc>>,

    /// Assignee
    pub assignee_id: Option<Uuid>,
}

/// Partial task update
///
/// Only fields that are `Some` are applied. `assignee_id: Some(None)` clears
/// the assignee.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskUpdate {
    /// New title
    pub title: Option<String>,

    /// New description
    pub description: Option<String>,

    /// New completion flag
    pub complete: Option<bool>,

    /// New status
    pub status: Option<TaskStatus>,

    /// New due date (creator or admin only)
    pub due_date: Option<DateTime<Utc>>,

    /// New assignee (use Some(None) to clear)
    pub assignee_id: Option<Option<Uuid>>,
}

impl TaskUpdate {
    /// Applies the provided fields to `task` and stamps `updated_at`
    pub fn apply(self, task: &mut Task, now: DateTime<Utc>) {
        if let Some(title) = self.title {
            task.title = title;
        }
        if let Some(description) = self.description {
            task.description = description;
        }
        if let Some(complete) = self.complete {
            task.complete = complete;
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
        if let Some(assignee_id) = self.assignee_id {
            task.assignee_id = assignee_id;
        }
        task.updated_at = now;
    }
}
