//! Refresh operations exposed to callers and schedulers.
//!
//! Wraps the per-version refresh handler with single-version, per-project
//! and all-project entry points, version deletion and reconciliation.

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{info, warn};

use crate::artifacts::ArtifactHandlerRegistry;
use crate::config::Config;
use crate::error::Result;
use crate::models::coordinate::{is_snapshot, Coordinate};
use crate::models::project::Project;
use crate::models::refresh::{RefreshEvent, RefreshOutcome, RetirementResult, VersionMismatch};
use crate::services::dependency_manager::DependencyManager;
use crate::services::event_bus::NotificationQueue;
use crate::services::reconciliation::{calculate_candidate_versions, VersionReconciliation};
use crate::services::refresh_handler::ProjectVersionRefreshHandler;
use crate::services::repository_client::ArtifactRepositoryClient;
use crate::storage::{DepotStores, ProjectStore, ProjectVersionStore};

/// Options shared by every refresh entry point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshOptions {
    /// Skip the repository existence check and, for bulk refreshes, refresh
    /// every repository version instead of only the missing ones
    pub force_refresh: bool,
    /// Refresh missing dependencies first
    pub transitive: bool,
}

pub struct RefreshService {
    projects: Arc<dyn ProjectStore>,
    versions: Arc<dyn ProjectVersionStore>,
    repository: Arc<dyn ArtifactRepositoryClient>,
    registry: ArtifactHandlerRegistry,
    dependency_manager: Arc<DependencyManager>,
    handler: ProjectVersionRefreshHandler,
    reconciliation: VersionReconciliation,
    refresh_concurrency: usize,
    retain_latest_versions: usize,
}

impl RefreshService {
    /// Wire the refresh pipeline over a set of stores with the built-in
    /// artifact handlers.
    pub fn new(
        stores: &DepotStores,
        repository: Arc<dyn ArtifactRepositoryClient>,
        notifications: Arc<dyn NotificationQueue>,
        config: &Config,
    ) -> Result<Self> {
        let registry = ArtifactHandlerRegistry::standard(
            stores.entities.clone(),
            stores.versioned_entities.clone(),
            stores.file_generations.clone(),
        )?;
        Self::with_registry(stores, repository, registry, notifications, config)
    }

    pub fn with_registry(
        stores: &DepotStores,
        repository: Arc<dyn ArtifactRepositoryClient>,
        registry: ArtifactHandlerRegistry,
        notifications: Arc<dyn NotificationQueue>,
        config: &Config,
    ) -> Result<Self> {
        let dependency_manager = Arc::new(DependencyManager::new(stores.versions.clone()));
        let handler = ProjectVersionRefreshHandler::new(
            stores,
            repository.clone(),
            registry.clone(),
            dependency_manager.clone(),
            notifications,
            config,
        )?;
        let reconciliation = VersionReconciliation::new(
            stores,
            repository.clone(),
            registry.clone(),
            dependency_manager.clone(),
        );

        Ok(Self {
            projects: stores.projects.clone(),
            versions: stores.versions.clone(),
            repository,
            registry,
            dependency_manager,
            handler,
            reconciliation,
            refresh_concurrency: config.refresh_concurrency.max(1),
            retain_latest_versions: config.retain_latest_versions,
        })
    }

    /// The owning project of a coordinate, or the failed outcome to report.
    async fn find_project(
        &self,
        coordinate: &Coordinate,
    ) -> std::result::Result<Project, RefreshOutcome> {
        match self.projects.find(coordinate).await {
            Ok(Some(project)) => Ok(project),
            Ok(None) => Err(RefreshOutcome::failed(format!(
                "No Project with coordinates {} found",
                coordinate
            ))),
            Err(e) => Err(RefreshOutcome::failed(format!(
                "Error loading project {}: {}",
                coordinate, e
            ))),
        }
    }

    pub fn handler(&self) -> &ProjectVersionRefreshHandler {
        &self.handler
    }

    pub fn dependency_manager(&self) -> &DependencyManager {
        &self.dependency_manager
    }

    /// Refresh one version of the project owning `coordinate`.
    pub async fn refresh_project_version(
        &self,
        coordinate: &Coordinate,
        version_id: &str,
        options: RefreshOptions,
    ) -> RefreshOutcome {
        let project = match self.find_project(coordinate).await {
            Ok(project) => project,
            Err(outcome) => return outcome,
        };

        let event = RefreshEvent::new(project.project_id, coordinate, version_id)
            .with_force_refresh(options.force_refresh)
            .with_transitive(options.transitive);
        self.handler.handle_event(&event).await
    }

    /// Refresh the versions of a project the store does not hold yet, or
    /// every repository version when forced.
    ///
    /// Excluded versions are never candidates; a forced refresh still
    /// reports them as rejected.
    ///
    /// Versions are refreshed concurrently; one version failing never stops
    /// the others.
    pub async fn refresh_all_versions_for_project(
        &self,
        coordinate: &Coordinate,
        options: RefreshOptions,
    ) -> RefreshOutcome {
        let project = match self.find_project(coordinate).await {
            Ok(project) => project,
            Err(outcome) => return outcome,
        };
        let repository_versions = match self.repository.find_versions(coordinate).await {
            Ok(versions) => versions,
            Err(e) => {
                return RefreshOutcome::failed(format!(
                    "Error listing versions of {}: {}",
                    coordinate, e
                ))
            }
        };

        let targets = if options.force_refresh {
            repository_versions
        } else {
            let mut settled = project.versions.clone();
            match self.versions.find_versions(coordinate).await {
                Ok(stored) => settled.extend(
                    stored
                        .into_iter()
                        .filter(|r| r.is_excluded())
                        .map(|r| r.version_id),
                ),
                Err(e) => {
                    return RefreshOutcome::failed(format!(
                        "Error loading stored versions of {}: {}",
                        coordinate, e
                    ))
                }
            }
            calculate_candidate_versions(&repository_versions, &settled)
        };
        info!(
            project_id = %project.project_id,
            coordinate = %coordinate,
            versions = targets.len(),
            "Refreshing project versions"
        );

        let outcomes: Vec<RefreshOutcome> = stream::iter(targets.iter())
            .map(|version_id| {
                let event =
                    RefreshEvent::new(project.project_id.clone(), coordinate, version_id.clone())
                        .with_force_refresh(options.force_refresh)
                        .with_transitive(options.transitive);
                async move { self.handler.handle_event(&event).await }
            })
            .buffered(self.refresh_concurrency)
            .collect()
            .await;

        let mut outcome = RefreshOutcome::new();
        let failed = outcomes.iter().filter(|o| !o.is_success()).count();
        for version_outcome in outcomes {
            outcome.merge(version_outcome);
        }
        outcome.add_message(format!(
            "refreshed {} versions of {} ({} failed)",
            targets.len(),
            coordinate,
            failed
        ));
        outcome
    }

    /// Refresh every project in turn.
    pub async fn refresh_all_projects(&self, options: RefreshOptions) -> RefreshOutcome {
        let projects = match self.projects.get_all().await {
            Ok(projects) => projects,
            Err(e) => return RefreshOutcome::failed(format!("Error loading projects: {}", e)),
        };

        let mut outcome = RefreshOutcome::new();
        for project in &projects {
            outcome.merge(
                self.refresh_all_versions_for_project(&project.coordinate(), options)
                    .await,
            );
        }
        outcome.add_message(format!("refreshed {} projects", projects.len()));
        outcome
    }

    /// Remove a version, its artifacts of every type and its entry in the
    /// project's version list, then update its dependants.
    pub async fn delete_version(
        &self,
        coordinate: &Coordinate,
        version_id: &str,
    ) -> RefreshOutcome {
        let mut outcome = RefreshOutcome::new();
        let version = coordinate.at(version_id);

        for (artifact_type, handler) in self.registry.iter() {
            match handler.delete(coordinate, version_id).await {
                Ok(removed) => outcome.add_message(format!(
                    "removed {} {} artifacts for {}",
                    removed, artifact_type, version
                )),
                Err(e) => outcome.add_error(format!(
                    "Error deleting {} artifacts for {}: {}",
                    artifact_type, version, e
                )),
            }
        }

        match self.versions.delete(coordinate, version_id).await {
            Ok(true) => outcome.add_message(format!("removed version record {}", version)),
            Ok(false) => outcome.add_error(format!("Version {} not found in store", version)),
            Err(e) => outcome.add_error(format!("Error deleting version {}: {}", version, e)),
        }

        if !is_snapshot(version_id) {
            if let Err(e) = self.projects.remove_version(coordinate, version_id).await {
                warn!(version = %version, error = %e, "Failed to remove version from project");
            }
        }

        match self.dependency_manager.refresh_dependants(&version).await {
            Ok(0) => {}
            Ok(count) => {
                outcome.add_message(format!("updated {} dependants of {}", count, version))
            }
            Err(e) => {
                outcome.add_error(format!("Error updating dependants of {}: {}", version, e))
            }
        }
        outcome
    }

    /// Retire old released versions, keeping `keep_latest` per project or
    /// the configured default.
    pub async fn retire_old_versions(
        &self,
        keep_latest: Option<usize>,
    ) -> Result<Vec<RetirementResult>> {
        self.reconciliation
            .retire_old_project_versions(keep_latest.unwrap_or(self.retain_latest_versions))
            .await
    }

    pub async fn find_versions_mismatches(&self) -> Result<Vec<VersionMismatch>> {
        self.reconciliation.find_versions_mismatches().await
    }
}
