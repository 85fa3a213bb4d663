/// Data models for Kakari
///
/// Each model carries its PostgreSQL queries as associated functions taking a
/// `&PgPool`. Services never call these directly; they go through the
/// [`Storage`](crate::storage::Storage) trait, whose PostgreSQL implementation
/// delegates here.
///
/// # Models
///
/// - `user`: User accounts and roles
/// - `task`: Tasks, status and query filters
/// - `task_comment`: Comments attached to tasks
/// - `project`: Projects with member and task lists
/// - `password_reset`: Outstanding password reset tokens

pub mod password_reset;
pub mod project;
pub mod task;
pub mod task_comment;
pub mod user;
