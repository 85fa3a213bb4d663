/// Project model and database operations
///
/// A project groups tasks and members under one owner. Members and tasks are
/// kept as ID lists; adding an ID that is already present does nothing.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE projects (
///     id UUID PRIMARY KEY,
///     project_name TEXT NOT NULL,
///     description TEXT,
///     owner_id UUID NOT NULL REFERENCES users(id),
///     member_ids UUID[] NOT NULL DEFAULT '{}',
///     task_ids UUID[] NOT NULL DEFAULT '{}',
///     created_at TIMESTAMPTZ NOT NULL,
///     updated_at TIMESTAMPTZ NOT NULL
/// );
///
/// CREATE INDEX idx_projects_project_name ON projects(project_name);
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Project model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    /// Unique project ID
    pub id: Uuid,

    /// Display name (not unique)
    pub project_name: String,

    /// Optional description
    pub description: Option<String>,

    /// Owning user
    pub owner_id: Uuid,

    /// Member user IDs
    pub member_ids: Vec<Uuid>,

    /// Linked task IDs
    pub task_ids: Vec<Uuid>,

    /// When the project was created
    pub created_at: DateTime<Utc>,

    /// When the project was last written
    pub updated_at: DateTime<Utc>,
}

/// One of the two ID lists a project keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectLink {
    Member,
    Task,
}

impl ProjectLink {
    fn column(self) -> &'static str {
        match self {
            ProjectLink::Member => "member_ids",
            ProjectLink::Task => "task_ids",
        }
    }
}

const PROJECT_COLUMNS: &str =
    "id, project_name, description, owner_id, member_ids, task_ids, created_at, updated_at";

impl Project {
    pub fn links_mut(&mut self, link: ProjectLink) -> &mut Vec<Uuid> {
        match link {
            ProjectLink::Member => &mut self.member_ids,
            ProjectLink::Task => &mut self.task_ids,
        }
    }

    /// Appends `id` to a list; returns false if already present
    pub fn link(&mut self, link: ProjectLink, id: Uuid) -> bool {
        push_unique(self.links_mut(link), id)
    }

    /// Removes `id` from a list; returns false if absent
    pub fn unlink(&mut self, link: ProjectLink, id: Uuid) -> bool {
        remove_id(self.links_mut(link), id)
    }

    /// Appends `id` to one list in a single statement
    ///
    /// `updated_at` only moves when the list changes. Returns `None` if the
    /// project does not exist.
    pub async fn add_link(
        pool: &PgPool,
        project_id: Uuid,
        link: ProjectLink,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let column = link.column();
        let query = format!(
            "UPDATE projects
             SET {column} = CASE WHEN $2 = ANY({column}) THEN {column} ELSE array_append({column}, $2) END,
                 updated_at = CASE WHEN $2 = ANY({column}) THEN updated_at ELSE $3 END
             WHERE id = $1
             RETURNING {PROJECT_COLUMNS}"
        );

        sqlx::query_as::<_, Project>(&query)
            .bind(project_id)
            .bind(id)
            .bind(now)
            .fetch_optional(pool)
            .await
    }

    /// Removes `id` from one list in a single statement
    pub async fn remove_link(
        pool: &PgPool,
        project_id: Uuid,
        link: ProjectLink,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let column = link.column();
        let query = format!(
            "UPDATE projects
             SET {column} = array_remove({column}, $2),
                 updated_at = CASE WHEN $2 = ANY({column}) THEN $3 ELSE updated_at END
             WHERE id = $1
             RETURNING {PROJECT_COLUMNS}"
        );

        sqlx::query_as::<_, Project>(&query)
            .bind(project_id)
            .bind(id)
            .bind(now)
            .fetch_optional(pool)
            .await
    }

    /// Inserts a fully populated project row
    pub async fn insert(pool: &PgPool, project: &Project) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO projects (id, project_name, description, owner_id, member_ids,
                                  task_ids, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(project.id)
        .bind(&project.project_name)
        .bind(&project.description)
        .bind(project.owner_id)
        .bind(&project.member_ids)
        .bind(&project.task_ids)
        .bind(project.created_at)
        .bind(project.updated_at)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Finds a project by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Project>(
            r#"
            SELECT id, project_name, description, owner_id, member_ids, task_ids,
                   created_at, updated_at
            FROM projects
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Lists all projects, oldest first
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Project>(
            r#"
            SELECT id, project_name, description, owner_id, member_ids, task_ids,
                   created_at, updated_at
            FROM projects
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .fetch_all(pool)
        .await
    }

    /// Replaces every mutable column of an existing project
    ///
    /// # Returns
    ///
    /// True if the project existed and was updated
    pub async fn replace(pool: &PgPool, project: &Project) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE projects
            SET project_name = $2,
                description = $3,
                member_ids = $4,
                task_ids = $5,
                updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(project.id)
        .bind(&project.project_name)
        .bind(&project.description)
        .bind(&project.member_ids)
        .bind(&project.task_ids)
        .bind(project.updated_at)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes a project
    ///
    /// # Returns
    ///
    /// True if a project was deleted
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn push_unique(ids: &mut Vec<Uuid>, id: Uuid) -> bool {
    if ids.contains(&id) {
        false
    } else {
        ids.push(id);
        true
    }
}

fn remove_id(ids: &mut Vec<Uuid>, id: Uuid) -> bool {
    let before = ids.len();
    ids.retain(|existing| *existing != id);
    ids.len() != before
}

/// Input for creating a project
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewProject {
    /// Project name
    pub project_name: String,

    /// Optional description
    pub description: Option<String>,

    /// Initial members
    #[serde(default)]
    pub member_ids: Vec<Uuid>,

    /// Initial tasks
    #[serde(default)]
    pub task_ids: Vec<Uuid>,
}

/// Partial project update
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectUpdate {
    /// New name
    pub project_name: Option<String>,

    /// New description (use Some(None) to clear)
    pub description: Option<Option<String>>,

    /// Replacement member list
    pub member_ids: Option<Vec<Uuid>>,

    /// Replacement task list
    pub task_ids: Option<Vec<Uuid>>,
}

impl ProjectUpdate {
    /// Applies the provided fields to `project` and stamps `updated_at`
    ///
    /// Replacement lists are de-duplicated, keeping first occurrences.
    pub fn apply(self, project: &mut Project, now: DateTime<Utc>) {
        if let Some(name) = self.project_name {
            project.project_name = name;
        }
        if let Some(description) = self.description {
            project.description = description;
        }
        if let Some(member_ids) = self.member_ids {
            project.member_ids = dedup(member_ids);
        }
        if let Some(task_ids) = self.task_ids {
            project.task_ids = dedup(task_ids);
        }
        project.updated_at = now;
    }
}

/// Removes repeated IDs, keeping the first occurrence of each
pub fn dedup(ids: Vec<Uuid>) -> Vec<Uuid> {
    let mut unique = Vec::with_capacity(ids.len());
    for id in ids {
        push_unique(&mut unique, id);
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> Project {
        let now = Utc::now();
        Project {
            id: Uuid::new_v4(),
            project_name: "Launch".to_string(),
            description: None,
            owner_id: Uuid::new_v4(),
            member_ids: vec![],
            task_ids: vec![],
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_add_member_is_idempotent() {
        let mut project = project();
        let user = Uuid::new_v4();

        assert!(project.link(ProjectLink::Member, user));
        assert!(!project.link(ProjectLink::Member, user));
        assert_eq!(project.member_ids, vec![user]);
        assert!(project.task_ids.is_empty());
    }

    #[test]
    fn test_detach_missing_task() {
        let mut project = project();
        assert!(!project.unlink(ProjectLink::Task, Uuid::new_v4()));

        let task = Uuid::new_v4();
        project.link(ProjectLink::Task, task);
        assert!(project.unlink(ProjectLink::Task, task));
        assert!(project.task_ids.is_empty());
    }

    #[test]
    fn test_update_dedups_lists() {
        let mut project = project();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        ProjectUpdate {
            member_ids: Some(vec![a, b, a]),
            description: Some(Some("Q3 launch".to_string())),
            ..Default::default()
        }
        .apply(&mut project, Utc::now());

        assert_eq!(project.member_ids, vec![a, b]);
        assert_eq!(project.description.as_deref(), Some("Q3 launch"));
        assert_eq!(project.project_name, "Launch");
    }
}
