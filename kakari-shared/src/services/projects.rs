/// Project directory
///
/// Projects can be read by any authenticated user. Changing or deleting a
/// project, and editing its member and task lists, is limited to the owner
/// and admins. Existence is always checked before permission.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::authorization::{require_owner_or_admin, Actor};
use crate::error::{ServiceError, ServiceResult};
use crate::models::project::{dedup, NewProject, Project, ProjectLink, ProjectUpdate};
use crate::storage::Storage;

#[derive(Debug, Clone, Copy)]
enum LinkEdit {
    Add(ProjectLink, Uuid),
    Remove(ProjectLink, Uuid),
}

/// Service for projects
#[derive(Clone)]
pub struct ProjectDirectory {
    storage: Arc<dyn Storage>,
}

impl ProjectDirectory {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub async fn list_projects(&self) -> ServiceResult<Vec<Project>> {
        Ok(self.storage.list_projects().await?)
    }

    /// Creates a project owned by `owner`
    pub async fn create_project(&self, new_project: NewProject, owner: &Actor) -> ServiceResult<Project> {
        let now = Utc::now();
        let project = Project {
            id: Uuid::new_v4(),
            project_name: new_project.project_name,
            description: new_project.description,
            owner_id: owner.id,
            member_ids: dedup(new_project.member_ids),
            task_ids: dedup(new_project.task_ids),
            created_at: now,
            updated_at: now,
        };

        self.storage.insert_project(&project).await?;
        info!(project_id = %project.id, owner = %owner.id, "Project created");
        Ok(project)
    }

    pub async fn get_by_id(&self, project_id: Uuid) -> ServiceResult<Option<Project>> {
        Ok(self.storage.find_project(project_id).await?)
    }

    /// Applies a partial update
    ///
    /// # Errors
    ///
    /// - `NotFound` if the project does not exist
    /// - `Forbidden` unless the actor owns the project or is an admin
    pub async fn update_project(
        &self,
        project_id: Uuid,
        update: ProjectUpdate,
        actor: &Actor,
    ) -> ServiceResult<Project> {
        self.modify(project_id, actor, |project, now| {
            update.apply(project, now);
        })
        .await
    }

    /// Deletes a project
    ///
    /// Deleting a project that does not exist succeeds. An existing project
    /// can only be deleted by its owner or an admin.
    pub async fn delete_project(&self, project_id: Uuid, actor: &Actor) -> ServiceResult<()> {
        let Some(project) = self.storage.find_project(project_id).await? else {
            return Ok(());
        };

        require_owner_or_admin(actor, project.owner_id)?;
        self.storage.delete_project(project_id).await?;

        info!(project_id = %project_id, actor = %actor.id, "Project deleted");
        Ok(())
    }

    /// IDs of the tasks linked to a project
    pub async fn list_tasks(&self, project_id: Uuid) -> ServiceResult<Vec<Uuid>> {
        Ok(self.require_project(project_id).await?.task_ids)
    }

    /// IDs of the project's members
    pub async fn list_members(&self, project_id: Uuid) -> ServiceResult<Vec<Uuid>> {
        Ok(self.require_project(project_id).await?.member_ids)
    }

    pub async fn add_member(&self, project_id: Uuid, user_id: Uuid, actor: &Actor) -> ServiceResult<Project> {
        self.edit_link(project_id, actor, LinkEdit::Add(ProjectLink::Member, user_id)).await
    }

    pub async fn remove_member(&self, project_id: Uuid, user_id: Uuid, actor: &Actor) -> ServiceResult<Project> {
        self.edit_link(project_id, actor, LinkEdit::Remove(ProjectLink::Member, user_id)).await
    }

    pub async fn attach_task(&self, project_id: Uuid, task_id: Uuid, actor: &Actor) -> ServiceResult<Project> {
        self.edit_link(project_id, actor, LinkEdit::Add(ProjectLink::Task, task_id)).await
    }

    pub async fn detach_task(&self, project_id: Uuid, task_id: Uuid, actor: &Actor) -> ServiceResult<Project> {
        self.edit_link(project_id, actor, LinkEdit::Remove(ProjectLink::Task, task_id)).await
    }

    /// Authorizes, then applies a single list edit in the store
    async fn edit_link(&self, project_id: Uuid, actor: &Actor, edit: LinkEdit) -> ServiceResult<Project> {
        let project = self.require_project(project_id).await?;
        require_owner_or_admin(actor, project.owner_id)?;

        let now = Utc::now();
        let edited = match edit {
            LinkEdit::Add(link, id) => self.storage.link_project(project_id, link, id, now).await?,
            LinkEdit::Remove(link, id) => self.storage.unlink_project(project_id, link, id, now).await?,
        };

        debug!(project_id = %project_id, actor = %actor.id, ?edit, "Project links edited");
        edited.ok_or(ServiceError::NotFound("Project"))
    }

    /// Loads, authorizes, edits and saves a project
    async fn modify<F>(&self, project_id: Uuid, actor: &Actor, edit: F) -> ServiceResult<Project>
    where
        F: FnOnce(&mut Project, chrono::DateTime<Utc>),
    {
        let mut project = self.require_project(project_id).await?;
        require_owner_or_admin(actor, project.owner_id)?;

        edit(&mut project, Utc::now());
        if !self.storage.update_project(&project).await? {
            return Err(ServiceError::NotFound("Project"));
        }

        debug!(project_id = %project.id, actor = %actor.id, "Project updated");
        Ok(project)
    }

    async fn require_project(&self, project_id: Uuid) -> ServiceResult<Project> {
        self.storage
            .find_project(project_id)
            .await?
            .ok_or(ServiceError::NotFound("Project"))
    }
}
