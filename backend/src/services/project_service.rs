//! Project administration: registration, exclusion and deprecation.

use std::sync::Arc;
use tracing::info;

use crate::artifacts::ArtifactHandlerRegistry;
use crate::error::{AppError, Result};
use crate::models::coordinate::{is_snapshot, Coordinate};
use crate::models::project::{Project, StoredProjectVersion};
use crate::services::dependency_manager::DependencyManager;
use crate::storage::{DepotStores, ProjectStore, ProjectVersionStore};
use crate::validation::{is_valid_project_id, is_valid_version_id, validate_coordinate};

pub struct ProjectService {
    projects: Arc<dyn ProjectStore>,
    versions: Arc<dyn ProjectVersionStore>,
    registry: ArtifactHandlerRegistry,
    dependency_manager: Arc<DependencyManager>,
}

impl ProjectService {
    pub fn new(stores: &DepotStores, registry: ArtifactHandlerRegistry) -> Self {
        Self {
            projects: stores.projects.clone(),
            versions: stores.versions.clone(),
            registry,
            dependency_manager: Arc::new(DependencyManager::new(stores.versions.clone())),
        }
    }

    /// Register a project for a coordinate.
    ///
    /// A coordinate belongs to at most one project.
    pub async fn create_project(
        &self,
        project_id: &str,
        coordinate: &Coordinate,
    ) -> Result<Project> {
        let mut errors = validate_coordinate(coordinate);
        if !is_valid_project_id(project_id) {
            errors.insert(0, format!("Invalid projectId '{}'", project_id));
        }
        if !errors.is_empty() {
            return Err(AppError::Validation(errors.join("; ")));
        }

        if let Some(existing) = self.projects.find(coordinate).await? {
            return Err(AppError::Conflict(format!(
                "Invalid projectId [{}]. Existing project [{}] has same [{}] coordinates",
                project_id, existing.project_id, coordinate
            )));
        }

        let project = self
            .projects
            .create_or_update(Project::new(project_id, coordinate))
            .await?;
        info!(project_id = %project_id, coordinate = %coordinate, "Created project");
        Ok(project)
    }

    pub async fn get_project(&self, coordinate: &Coordinate) -> Result<Project> {
        self.projects.find(coordinate).await?.ok_or_else(|| {
            AppError::NotFound(format!("No Project with coordinates {} found", coordinate))
        })
    }

    /// Exclude a version from ingestion, recording why.
    ///
    /// Stored artifacts of the version are removed, it leaves the project's
    /// version list and its dependants are updated. The version record is
    /// created when it does not exist yet so the exclusion sticks.
    pub async fn exclude_version(
        &self,
        coordinate: &Coordinate,
        version_id: &str,
        reason: &str,
    ) -> Result<StoredProjectVersion> {
        self.get_project(coordinate).await?;
        if !is_valid_version_id(version_id) {
            return Err(AppError::Validation(format!("Invalid version '{}'", version_id)));
        }

        let mut record = self
            .versions
            .find(coordinate, version_id)
            .await?
            .unwrap_or_else(|| StoredProjectVersion::new(coordinate, version_id));
        record.version_data.excluded = true;
        record.version_data.exclusion_reason = Some(reason.to_string());
        record.touch();
        let record = self.versions.create_or_update(record).await?;

        let mut removed = 0;
        for (_, handler) in self.registry.iter() {
            removed += handler.delete(coordinate, version_id).await?;
        }
        if !is_snapshot(version_id) {
            self.projects.remove_version(coordinate, version_id).await?;
        }
        self.dependency_manager
            .refresh_dependants(&coordinate.at(version_id))
            .await?;

        info!(
            version = %coordinate.at(version_id),
            reason,
            artifacts_removed = removed,
            "Excluded version"
        );
        Ok(record)
    }

    /// Lift an exclusion. The version must be refreshed again to be ingested.
    pub async fn include_version(
        &self,
        coordinate: &Coordinate,
        version_id: &str,
    ) -> Result<StoredProjectVersion> {
        let mut record = self.stored_version(coordinate, version_id).await?;
        record.version_data.excluded = false;
        record.version_data.exclusion_reason = None;
        record.touch();
        let record = self.versions.create_or_update(record).await?;
        info!(version = %coordinate.at(version_id), "Included version");
        Ok(record)
    }

    pub async fn deprecate_version(
        &self,
        coordinate: &Coordinate,
        version_id: &str,
        deprecated: bool,
    ) -> Result<StoredProjectVersion> {
        let mut record = self.stored_version(coordinate, version_id).await?;
        record.version_data.deprecated = deprecated;
        record.touch();
        self.versions.create_or_update(record).await
    }

    async fn stored_version(
        &self,
        coordinate: &Coordinate,
        version_id: &str,
    ) -> Result<StoredProjectVersion> {
        self.versions
            .find(coordinate, version_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Version {} not found", coordinate.at(version_id)))
            })
    }
}
