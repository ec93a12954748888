//! Project version refresh.
//!
//! Ingests one project version end to end. A refresh moves through
//! validation, dependency resolution, artifact extraction and persistence,
//! then publishes a notification. Business-rule failures are accumulated on
//! the returned [`RefreshOutcome`]; they never abort the caller.

use futures::future::{BoxFuture, FutureExt};
use regex::Regex;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::artifacts::ArtifactHandlerRegistry;
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::formats::maven::parse_pom;
use crate::models::coordinate::{is_snapshot, Coordinate, ProjectVersion};
use crate::models::project::StoredProjectVersion;
use crate::models::refresh::{RefreshEvent, RefreshNotification, RefreshOutcome};
use crate::services::dependency_manager::{resolve_dependency, DependencyManager};
use crate::services::event_bus::NotificationQueue;
use crate::services::repository_client::ArtifactRepositoryClient;
use crate::storage::{DepotStores, ProjectStore, ProjectVersionStore};
use crate::validation::is_valid_version_id;

/// Orchestrates the refresh of individual project versions.
pub struct ProjectVersionRefreshHandler {
    projects: Arc<dyn ProjectStore>,
    versions: Arc<dyn ProjectVersionStore>,
    repository: Arc<dyn ArtifactRepositoryClient>,
    registry: ArtifactHandlerRegistry,
    dependency_manager: Arc<DependencyManager>,
    notifications: Arc<dyn NotificationQueue>,
    property_patterns: Vec<Regex>,
    max_snapshot_versions: usize,
}

impl ProjectVersionRefreshHandler {
    pub fn new(
        stores: &DepotStores,
        repository: Arc<dyn ArtifactRepositoryClient>,
        registry: ArtifactHandlerRegistry,
        dependency_manager: Arc<DependencyManager>,
        notifications: Arc<dyn NotificationQueue>,
        config: &Config,
    ) -> Result<Self> {
        Ok(Self {
            projects: stores.projects.clone(),
            versions: stores.versions.clone(),
            repository,
            registry,
            dependency_manager,
            notifications,
            property_patterns: config.compiled_property_patterns()?,
            max_snapshot_versions: config.max_snapshot_versions,
        })
    }

    /// Run the validation checks of a refresh without side effects.
    ///
    /// Returns one message per failed check; an empty list means the event
    /// may proceed.
    pub async fn validate_event(&self, event: &RefreshEvent) -> Result<Vec<String>> {
        let mut errors = Vec::new();
        let coordinate = event.coordinate();

        if !is_valid_version_id(&event.version_id) {
            errors.push(format!("Invalid version '{}'", event.version_id));
        }

        let Some(project) = self.projects.find(&coordinate).await? else {
            errors.push(format!("No Project with coordinates {} found", coordinate));
            return Ok(errors);
        };
        if project.project_id != event.project_id {
            errors.push(format!(
                "Invalid projectId [{}]. Existing project [{}] has same [{}] coordinates",
                event.project_id, project.project_id, coordinate
            ));
        }

        let stored = self.versions.find(&coordinate, &event.version_id).await?;
        if let Some(record) = stored.as_ref().filter(|r| r.is_excluded()) {
            errors.push(format!(
                "Version {} is excluded: {}",
                event.project_version(),
                record
                    .version_data
                    .exclusion_reason
                    .as_deref()
                    .unwrap_or("no reason given")
            ));
        }

        if is_snapshot(&event.version_id) && stored.is_none() {
            let snapshots = self
                .versions
                .find_versions(&coordinate)
                .await?
                .iter()
                .filter(|r| is_snapshot(&r.version_id))
                .count();
            if snapshots >= self.max_snapshot_versions {
                errors.push(format!(
                    "Project {} already has {} snapshot versions, the maximum allowed is {}",
                    coordinate, snapshots, self.max_snapshot_versions
                ));
            }
        }

        Ok(errors)
    }

    /// Refresh one version and publish its outcome.
    ///
    /// With `transitive` set, dependencies missing from the store are
    /// refreshed first through child events.
    pub async fn handle_event(&self, event: &RefreshEvent) -> RefreshOutcome {
        let mut visited = HashSet::new();
        self.process(event.clone(), &mut visited).await
    }

    fn process<'a>(
        &'a self,
        event: RefreshEvent,
        visited: &'a mut HashSet<ProjectVersion>,
    ) -> BoxFuture<'a, RefreshOutcome> {
        async move {
            let version = event.project_version();
            visited.insert(version.clone());
            info!(
                event_id = %event.event_id,
                project_id = %event.project_id,
                version = %version,
                force = event.force_refresh,
                transitive = event.transitive,
                "Refreshing project version"
            );

            let errors = match self.validate_event(&event).await {
                Ok(errors) => errors,
                Err(e) => vec![format!("Error validating {}: {}", version, e)],
            };
            if !errors.is_empty() {
                warn!(version = %version, errors = ?errors, "Refresh rejected");
                let mut outcome = RefreshOutcome::new();
                outcome.add_errors(errors);
                return outcome;
            }

            let mut outcome = match self.refresh_version(&event, visited).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(version = %version, error = %e, "Refresh failed");
                    RefreshOutcome::failed(format!("Error refreshing {}: {}", version, e))
                }
            };

            let notification = RefreshNotification::completed(&event, outcome.clone());
            if let Err(e) = self.notifications.enqueue(notification).await {
                error!(version = %version, error = %e, "Failed to publish refresh notification");
                outcome.add_error(format!("Failed to publish notification for {}: {}", version, e));
            }

            if outcome.is_success() {
                info!(version = %version, "Refresh succeeded");
            } else {
                warn!(version = %version, errors = outcome.errors.len(), "Refresh failed");
            }
            outcome
        }
        .boxed()
    }

    async fn refresh_version(
        &self,
        event: &RefreshEvent,
        visited: &mut HashSet<ProjectVersion>,
    ) -> Result<RefreshOutcome> {
        let coordinate = event.coordinate();
        let version_id = event.version_id.as_str();
        let version = event.project_version();
        let mut outcome = RefreshOutcome::new();

        if !event.force_refresh
            && self
                .repository
                .find_version(&coordinate, version_id)
                .await?
                .is_none()
        {
            outcome.add_error(format!("Version {} not found in artifact repository", version));
            return Ok(outcome);
        }

        // Dependencies are recorded before they are checked so the stored
        // record shows them even when the refresh fails.
        let discovered = self
            .repository
            .find_dependencies(&coordinate, version_id)
            .await?;
        let mut record = self
            .versions
            .find(&coordinate, version_id)
            .await?
            .unwrap_or_else(|| StoredProjectVersion::new(&coordinate, version_id));
        record.version_data.dependencies = discovered.clone();
        record.touch();
        let record = self.versions.create_or_update(record).await?;
        outcome.add_message(format!(
            "found {} direct dependencies for {}",
            discovered.len(),
            version
        ));

        let resolved = self
            .resolve_dependencies(event, &discovered, visited, &mut outcome)
            .await?;
        let all_resolved = resolved.len() == discovered.len();
        if all_resolved && resolved != discovered {
            debug!(version = %version, "Recording dependencies in their stored form");
            let mut record = record;
            record.version_data.dependencies = resolved;
            self.versions.create_or_update(record).await?;
        }

        for (artifact_type, handler) in self.registry.iter() {
            let fragment = async {
                let files = self
                    .repository
                    .find_files(artifact_type, &coordinate, version_id)
                    .await?;
                handler
                    .refresh_project_version_artifacts(&coordinate, version_id, &files)
                    .await
            }
            .await;
            match fragment {
                Ok(fragment) => outcome.merge(fragment),
                Err(e) => {
                    error!(
                        version = %version,
                        artifact_type = %artifact_type,
                        error = %e,
                        "Artifact processing failed"
                    );
                    outcome.add_error(format!(
                        "Unexpected exception processing {} artifacts: {}",
                        artifact_type, e
                    ));
                }
            }
        }

        self.record_properties(&coordinate, version_id, &mut outcome)
            .await?;

        if !outcome.has_errors()
            && !is_snapshot(version_id)
            && self.projects.add_version(&coordinate, version_id).await?
        {
            outcome.add_message(format!("added version {} to project {}", version_id, coordinate));
        }

        if all_resolved {
            self.dependency_manager
                .update_transitive_dependencies(&coordinate, version_id)
                .await?;
            outcome.add_message(format!("updated transitive dependencies for {}", version));
        }

        Ok(outcome)
    }

    /// Resolve each discovered dependency against the version store.
    ///
    /// Returns the stored form of every dependency that resolved; an error is
    /// recorded for each one that did not.
    async fn resolve_dependencies(
        &self,
        event: &RefreshEvent,
        discovered: &[ProjectVersion],
        visited: &mut HashSet<ProjectVersion>,
        outcome: &mut RefreshOutcome,
    ) -> Result<Vec<ProjectVersion>> {
        let mut resolved = Vec::with_capacity(discovered.len());
        for dependency in discovered {
            let mut found = resolve_dependency(self.versions.as_ref(), dependency).await?;
            if found.is_none() && event.transitive && !visited.contains(dependency) {
                found = self
                    .refresh_missing_dependency(event, dependency, visited, outcome)
                    .await?;
            }

            match found {
                Some(record) if record.is_excluded() => {
                    outcome.add_error(format!("Dependency {} is excluded", dependency));
                }
                Some(record) => resolved.push(record.project_version()),
                None => {
                    outcome.add_error(format!("Dependency {} not found in store", dependency));
                }
            }
        }
        Ok(resolved)
    }

    /// Refresh a missing dependency through a child event, then look it up again.
    async fn refresh_missing_dependency(
        &self,
        parent: &RefreshEvent,
        dependency: &ProjectVersion,
        visited: &mut HashSet<ProjectVersion>,
        outcome: &mut RefreshOutcome,
    ) -> Result<Option<StoredProjectVersion>> {
        let Some(project) = self.projects.find(&dependency.coordinate()).await? else {
            debug!(dependency = %dependency, "No project owns dependency, skipping transitive refresh");
            return Ok(None);
        };

        let child = RefreshEvent::child_of(parent, project.project_id, dependency);
        let child_outcome = self.process(child, visited).await;
        outcome.add_message(format!(
            "transitively refreshed {} with status {:?}",
            dependency, child_outcome.status
        ));
        resolve_dependency(self.versions.as_ref(), dependency).await
    }

    /// Store POM properties whose keys match the configured patterns.
    async fn record_properties(
        &self,
        coordinate: &Coordinate,
        version_id: &str,
        outcome: &mut RefreshOutcome,
    ) -> Result<()> {
        let Some(pom) = self.repository.find_pom(coordinate, version_id).await? else {
            return Ok(());
        };
        let properties = match parse_pom(&pom) {
            Ok(project) => project.matching_properties(&self.property_patterns),
            Err(e) => {
                outcome.add_error(format!("Unexpected exception reading POM properties: {}", e));
                return Ok(());
            }
        };

        let mut record = self
            .versions
            .find(coordinate, version_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Version {} disappeared during refresh",
                    coordinate.at(version_id)
                ))
            })?;
        if record.version_data.properties != properties {
            outcome.add_message(format!("recorded {} properties", properties.len()));
            record.version_data.properties = properties;
            record.touch();
            self.versions.create_or_update(record).await?;
        }
        Ok(())
    }
}
