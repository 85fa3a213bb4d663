/// Project endpoints
///
/// All routes require an access token. Mutations are limited to the
/// project owner and admins; a missing project is reported before a
/// permission failure.
///
/// # Endpoints
///
/// - `GET    /api/v1/project/`
/// - `POST   /api/v1/project/`
/// - `GET    /api/v1/project/:project_id`
/// - `PUT    /api/v1/project/:project_id`
/// - `DELETE /api/v1/project/:project_id` - Idempotent
/// - `GET    /api/v1/project/tasks/:project_id`
/// - `GET    /api/v1/project/members/:project_id`
/// - `POST   /api/v1/project/:project_id/members/:user_id`
/// - `DELETE /api/v1/project/:project_id/members/:user_id`
/// - `POST   /api/v1/project/:project_id/tasks/:task_id`
/// - `DELETE /api/v1/project/:project_id/tasks/:task_id`

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
use kakari_shared::{
    auth::authorization::Actor,
    error::ServiceError,
    models::project::{NewProject, Project, ProjectUpdate},
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

/// Project creation request; the caller becomes the owner
#[derive(Debug, Deserialize, Validate)]
pub struct CreateProjectRequest {
    #[validate(length(min = 3, max = 55, message = "Project name must be 3-55 characters"))]
    pub project_name: String,

    pub description: Option<String>,

    #[serde(default, alias = "project_members")]
    pub member_ids: Vec<Uuid>,

    #[serde(default, alias = "tasks")]
    pub task_ids: Vec<Uuid>,
}

impl From<CreateProjectRequest> for NewProject {
    fn from(req: CreateProjectRequest) -> Self {
        NewProject {
            project_name: req.project_name,
            description: req.description,
            member_ids: req.member_ids,
            task_ids: req.task_ids,
        }
    }
}

/// Partial project update; lists replace the stored ones wholesale
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProjectRequest {
    #[validate(length(min = 3, max = 55, message = "Project name must be 3-55 characters"))]
    pub project_name: Option<String>,

    pub description: Option<String>,

    #[serde(alias = "project_members")]
    pub member_ids: Option<Vec<Uuid>>,

    #[serde(alias = "tasks")]
    pub task_ids: Option<Vec<Uuid>>,
}

impl From<UpdateProjectRequest> for ProjectUpdate {
    fn from(req: UpdateProjectRequest) -> Self {
        ProjectUpdate {
            project_name: req.project_name,
            description: req.description.map(Some),
            member_ids: req.member_ids,
            task_ids: req.task_ids,
        }
    }
}

pub async fn list_projects(State(state): State<AppState>) -> ApiResult<Json<Vec<Project>>> {
    Ok(Json(state.directories.projects.list_projects().await?))
}

pub async fn create_project(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(req): Json<CreateProjectRequest>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    req.validate()?;
    let project = state
        .directories
        .projects
        .create_project(req.into(), &actor)
        .await?;
    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn get_project(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> ApiResult<Json<Project>> {
    let project_id = parse_id(&project_id)?;
    let project = state
        .directories
        .projects
        .get_by_id(project_id)
        .await?
        .ok_or_else(|| ApiError::from(ServiceError::NotFound("Project")))?;
    Ok(Json(project))
}

pub async fn update_project(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(project_id): Path<String>,
    Json(req): Json<UpdateProjectRequest>,
) -> ApiResult<Json<Project>> {
    let project_id = parse_id(&project_id)?;
    req.validate()?;

    let project = state
        .directories
        .projects
        .update_project(project_id, req.into(), &actor)
        .await?;
    Ok(Json(project))
}

pub async fn delete_project(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(project_id): Path<String>,
) -> ApiResult<StatusCode> {
    let project_id = parse_id(&project_id)?;
    state
        .directories
        .projects
        .delete_project(project_id, &actor)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_tasks(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> ApiResult<Json<Vec<Uuid>>> {
    let project_id = parse_id(&project_id)?;
    Ok(Json(state.directories.projects.list_tasks(project_id).await?))
}

pub async fn list_members(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> ApiResult<Json<Vec<Uuid>>> {
    let project_id = parse_id(&project_id)?;
    Ok(Json(state.directories.projects.list_members(project_id).await?))
}

/// Parses the `(project_id, other_id)` pair used by the link routes
fn link_ids((project_id, other_id): (String, String)) -> ApiResult<(Uuid, Uuid)> {
    Ok((parse_id(&project_id)?, parse_id(&other_id)?))
}

pub async fn add_member(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(ids): Path<(String, String)>,
) -> ApiResult<Json<Project>> {
    let (project_id, user_id) = link_ids(ids)?;
    let project = state
        .directories
        .projects
        .add_member(project_id, user_id, &actor)
        .await?;
    Ok(Json(project))
}

pub async fn remove_member(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(ids): Path<(String, String)>,
) -> ApiResult<Json<Project>> {
    let (project_id, user_id) = link_ids(ids)?;
    let project = state
        .directories
        .projects
        .remove_member(project_id, user_id, &actor)
        .await?;
    Ok(Json(project))
}

pub async fn attach_task(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(ids): Path<(String, String)>,
) -> ApiResult<Json<Project>> {
    let (project_id, task_id) = link_ids(ids)?;
    let project = state
        .directories
        .projects
        .attach_task(project_id, task_id, &actor)
        .await?;
    Ok(Json(project))
}

pub async fn detach_task(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(ids): Path<(String, String)>,
) -> ApiResult<Json<Project>> {
    let (project_id, task_id) = link_ids(ids)?;
    let project = state
        .directories
        .projects
        .detach_task(project_id, task_id, &actor)
        .await?;
    Ok(Json(project))
}
