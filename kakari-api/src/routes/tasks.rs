/// Task endpoints
///
/// All routes require an access token.
///
/// # Endpoints
///
/// - `POST   /api/v1/task/create`
/// - `GET    /api/v1/task/tasks/:task_id`
/// - `PUT    /api/v1/task/tasks/:task_id` - Only the creator or an admin may move `due_date`
/// - `DELETE /api/v1/task/tasks/:task_id` - Idempotent
/// - `GET    /api/v1/task/tasks/:task_id/comments`
/// - `POST   /api/v1/task/tasks/:task_id/comments`
/// - `GET    /api/v1/task/created/:user_id`
/// - `GET    /api/v1/task/assigned/:user_id`
/// - `GET    /api/v1/task/overdue`
/// - `GET    /api/v1/task/overdue/:assignee_id`
/// - `GET    /api/v1/task/due/:date` - `YYYY-MM-DD` or RFC 3339, whole UTC day
/// - `GET    /api/v1/task/due/:date/:assignee_id`

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::parse_id,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use kakari_shared::{
    auth::authorization::Actor,
    error::ServiceError,
    models::{
        task::{NewTask, Task, TaskStatus, TaskUpdate},
        task_comment::TaskComment,
    },
};
use serde::{Deserialize, Deserializer};
use uuid::Uuid;
use validator::Validate;

/// Task creation request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[validate(length(min = 3, max = 55, message = "Title must be 3-55 characters"))]
    pub title: String,

    #[validate(length(min = 3, max = 755, message = "Description must be 3-755 characters"))]
    pub description: String,

    pub complete: Option<bool>,

    /// Defaults to the creation time
    pub due_date: Option<DateTime<Utc>>,

    #[serde(alias = "task_assignee")]
    pub assignee_id: Option<Uuid>,
}

impl From<CreateTaskRequest> for NewTask {
    fn from(req: CreateTaskRequest) -> Self {
        NewTask {
            title: req.title,
            description: req.description,
            complete: req.complete,
            due_date: req.due_date,
            assignee_id: req.assignee_id,
        }
    }
}

/// Partial task update
///
/// `"assignee_id": null` unassigns; leaving the key out keeps the assignee.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    #[validate(length(min = 3, max = 55, message = "Title must be 3-55 characters"))]
    pub title: Option<String>,

    #[validate(length(min = 3, max = 755, message = "Description must be 3-755 characters"))]
    pub description: Option<String>,

    pub complete: Option<bool>,

    pub status: Option<TaskStatus>,

    pub due_date: Option<DateTime<Utc>>,

    #[serde(default, alias = "task_assignee", deserialize_with = "present")]
    pub assignee_id: Option<Option<Uuid>>,
}

impl From<UpdateTaskRequest> for TaskUpdate {
    fn from(req: UpdateTaskRequest) -> Self {
        TaskUpdate {
            title: req.title,
            description: req.description,
            complete: req.complete,
            status: req.status,
            due_date: req.due_date,
            assignee_id: req.assignee_id,
        }
    }
}

/// Distinguishes an explicit `null` from a missing key
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize, Validate)]
pub struct CommentRequest {
    #[validate(length(min = 1, max = 1000, message = "Comment must be 1-1000 characters"))]
    pub content: String,
}

pub async fn create_task(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<Json<Task>> {
    req.validate()?;
    let task = state.directories.tasks.create_task(&actor, req.into()).await?;
    Ok(Json(task))
}

pub async fn get_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> ApiResult<Json<Task>> {
    let task_id = parse_id(&task_id)?;
    let task = state
        .directories
        .tasks
        .get_by_id(task_id)
        .await?
        .ok_or_else(|| ApiError::from(ServiceError::NotFound("Task")))?;
    Ok(Json(task))
}

/// Updates a task
///
/// # Errors
///
/// - `403 Forbidden`: `due_date` changed by someone other than the creator or an admin
/// - `404 Not Found`: No such task
/// - `422 Unprocessable Entity`: Validation failed
pub async fn update_task(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(task_id): Path<String>,
    Json(req): Json<UpdateTaskRequest>,
) -> ApiResult<Json<Task>> {
    let task_id = parse_id(&task_id)?;
    req.validate()?;

    let task = state
        .directories
        .tasks
        .update_task(task_id, req.into(), &actor)
        .await?;
    Ok(Json(task))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> ApiResult<StatusCode> {
    let task_id = parse_id(&task_id)?;
    state.directories.tasks.delete_task(task_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_comments(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> ApiResult<Json<Vec<TaskComment>>> {
    let task_id = parse_id(&task_id)?;
    Ok(Json(state.directories.tasks.list_comments(task_id).await?))
}

pub async fn add_comment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(task_id): Path<String>,
    Json(req): Json<CommentRequest>,
) -> ApiResult<(StatusCode, Json<TaskComment>)> {
    let task_id = parse_id(&task_id)?;
    req.validate()?;

    let comment = state
        .directories
        .tasks
        .add_comment(task_id, &actor, &req.content)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn list_created(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Vec<Task>>> {
    let user_id = parse_id(&user_id)?;
    Ok(Json(state.directories.tasks.list_by_creator(user_id).await?))
}

pub async fn list_assigned(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Vec<Task>>> {
    let user_id = parse_id(&user_id)?;
    Ok(Json(state.directories.tasks.list_by_assignee(user_id).await?))
}

pub async fn list_overdue(State(state): State<AppState>) -> ApiResult<Json<Vec<Task>>> {
    Ok(Json(state.directories.tasks.list_overdue().await?))
}

pub async fn list_overdue_for_assignee(
    State(state): State<AppState>,
    Path(assignee_id): Path<String>,
) -> ApiResult<Json<Vec<Task>>> {
    let assignee_id = parse_id(&assignee_id)?;
    Ok(Json(
        state
            .directories
            .tasks
            .list_overdue_by_assignee(assignee_id)
            .await?,
    ))
}

pub async fn list_due(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> ApiResult<Json<Vec<Task>>> {
    Ok(Json(state.directories.tasks.list_by_due_date(date).await?))
}

pub async fn list_due_for_assignee(
    State(state): State<AppState>,
    Path((date, assignee_id)): Path<(String, String)>,
) -> ApiResult<Json<Vec<Task>>> {
    let assignee_id = parse_id(&assignee_id)?;
    Ok(Json(
        state
            .directories
            .tasks
            .list_by_due_date_and_assignee(date, assignee_id)
            .await?,
    ))
}
