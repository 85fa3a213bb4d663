/// Task comments
///
/// # Schema
///
/// ```sql
/// CREATE TABLE task_comments (
///     id UUID PRIMARY KEY,
///     task_id UUID NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
///     content TEXT NOT NULL,
///     author_id UUID NOT NULL REFERENCES users(id),
///     created_at TIMESTAMPTZ NOT NULL
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Comment left on a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TaskComment {
    /// Unique comment ID
    pub id: Uuid,

    /// Task the comment belongs to
    pub task_id: Uuid,

    /// Comment body
    pub content: String,

    /// User who wrote the comment
    pub author_id: Uuid,

    /// When the comment was written
    pub created_at: DateTime<Utc>,
}

impl TaskComment {
    pub async fn insert(pool: &PgPool, comment: &TaskComment) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO task_comments (id, task_id, content, author_id, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(comment.id)
        .bind(comment.task_id)
        .bind(&comment.content)
        .bind(comment.author_id)
        .bind(comment.created_at)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Lists the comments of a task, oldest first
    pub async fn list_for_task(pool: &PgPool, task_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, TaskComment>(
            r#"
            SELECT id, task_id, content, author_id, created_at
            FROM task_comments
            WHERE task_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(task_id)
        .fetch_all(pool)
        .await
    }
}
