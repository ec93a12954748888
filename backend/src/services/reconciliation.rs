//! Version reconciliation between the artifact repository and the store.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use tracing::{info, warn};

use crate::artifacts::ArtifactHandlerRegistry;
use crate::error::Result;
use crate::models::coordinate::{compare_versions, is_snapshot};
use crate::models::project::Project;
use crate::models::refresh::{RetirementResult, VersionMismatch};
use crate::services::dependency_manager::DependencyManager;
use crate::services::repository_client::ArtifactRepositoryClient;
use crate::storage::{DepotStores, ProjectStore, ProjectVersionStore};

/// Versions listed by the repository but not yet stored, in repository order.
pub fn calculate_candidate_versions(
    repository_versions: &[String],
    stored_versions: &[String],
) -> Vec<String> {
    let stored: HashSet<&str> = stored_versions.iter().map(String::as_str).collect();
    let mut seen = HashSet::new();
    repository_versions
        .iter()
        .filter(|v| !stored.contains(v.as_str()) && seen.insert(v.as_str()))
        .cloned()
        .collect()
}

/// Detects drift and retires old versions.
pub struct VersionReconciliation {
    projects: Arc<dyn ProjectStore>,
    versions: Arc<dyn ProjectVersionStore>,
    repository: Arc<dyn ArtifactRepositoryClient>,
    registry: ArtifactHandlerRegistry,
    dependency_manager: Arc<DependencyManager>,
}

impl VersionReconciliation {
    pub fn new(
        stores: &DepotStores,
        repository: Arc<dyn ArtifactRepositoryClient>,
        registry: ArtifactHandlerRegistry,
        dependency_manager: Arc<DependencyManager>,
    ) -> Self {
        Self {
            projects: stores.projects.clone(),
            versions: stores.versions.clone(),
            repository,
            registry,
            dependency_manager,
        }
    }

    /// Released versions that differ between the repository and each
    /// project's recorded versions.
    ///
    /// Projects whose versions match exactly are omitted. A project whose
    /// repository listing cannot be read is logged and skipped.
    pub async fn find_versions_mismatches(&self) -> Result<Vec<VersionMismatch>> {
        let mut mismatches = Vec::new();
        for project in self.projects.get_all().await? {
            let coordinate = project.coordinate();
            let repository_versions: Vec<String> =
                match self.repository.find_versions(&coordinate).await {
                    Ok(versions) => versions.into_iter().filter(|v| !is_snapshot(v)).collect(),
                    Err(e) => {
                        warn!(
                            project_id = %project.project_id,
                            coordinate = %coordinate,
                            error = %e,
                            "Failed to list repository versions"
                        );
                        continue;
                    }
                };

            let versions_not_in_cache =
                calculate_candidate_versions(&repository_versions, &project.versions);
            let versions_not_in_repo =
                calculate_candidate_versions(&project.versions, &repository_versions);
            if versions_not_in_cache.is_empty() && versions_not_in_repo.is_empty() {
                continue;
            }

            mismatches.push(VersionMismatch {
                project_id: project.project_id.clone(),
                group_id: project.group_id.clone(),
                artifact_id: project.artifact_id.clone(),
                versions_not_in_cache,
                versions_not_in_repo,
            });
        }
        info!(mismatches = mismatches.len(), "Computed version mismatches");
        Ok(mismatches)
    }

    /// Keep the latest `keep_latest` released versions of every project and
    /// remove the rest, artifacts included.
    ///
    /// Snapshots are never retired. Excluded versions are neither ranked nor
    /// retired so their exclusion keeps applying. A store failure on one
    /// version is recorded on the project's result and the pass continues.
    pub async fn retire_old_project_versions(
        &self,
        keep_latest: usize,
    ) -> Result<Vec<RetirementResult>> {
        let mut results = Vec::new();
        for project in self.projects.get_all().await? {
            match self.retire_project_versions(&project, keep_latest).await {
                Ok(Some(result)) => results.push(result),
                Ok(None) => {}
                Err(e) => {
                    warn!(
                        project_id = %project.project_id,
                        error = %e,
                        "Failed to retire project versions"
                    );
                    results.push(RetirementResult {
                        project_id: project.project_id.clone(),
                        group_id: project.group_id.clone(),
                        artifact_id: project.artifact_id.clone(),
                        retired_versions: Vec::new(),
                        artifacts_removed: 0,
                        errors: vec![format!(
                            "Failed to list versions of {}: {}",
                            project.coordinate(),
                            e
                        )],
                    });
                }
            }
        }
        Ok(results)
    }

    async fn retire_project_versions(
        &self,
        project: &Project,
        keep_latest: usize,
    ) -> Result<Option<RetirementResult>> {
        let coordinate = project.coordinate();
        let (excluded, ingested): (Vec<_>, Vec<_>) = self
            .versions
            .find_versions(&coordinate)
            .await?
            .into_iter()
            .partition(|r| r.is_excluded());
        // Excluded records hold no content and must outlive retirement.
        let excluded: HashSet<String> = excluded.into_iter().map(|r| r.version_id).collect();

        let released: BTreeSet<String> = project
            .versions
            .iter()
            .cloned()
            .chain(ingested.into_iter().map(|r| r.version_id))
            .filter(|v| !is_snapshot(v) && !excluded.contains(v))
            .collect();
        let mut released: Vec<String> = released.into_iter().collect();
        released.sort_by(|a, b| compare_versions(a, b));
        if released.len() <= keep_latest {
            return Ok(None);
        }
        let retired = released[..released.len() - keep_latest].to_vec();

        let mut result = RetirementResult {
            project_id: project.project_id.clone(),
            group_id: project.group_id.clone(),
            artifact_id: project.artifact_id.clone(),
            retired_versions: Vec::new(),
            artifacts_removed: 0,
            errors: Vec::new(),
        };

        for version_id in retired {
            let mut failed = false;
            for (artifact_type, handler) in self.registry.iter() {
                match handler.delete(&coordinate, &version_id).await {
                    Ok(removed) => result.artifacts_removed += removed,
                    Err(e) => {
                        failed = true;
                        result.errors.push(format!(
                            "Failed to delete {} artifacts of {}: {}",
                            artifact_type,
                            coordinate.at(version_id.as_str()),
                            e
                        ));
                    }
                }
            }
            if failed {
                continue;
            }

            if let Err(e) = self.versions.delete(&coordinate, &version_id).await {
                result.errors.push(format!(
                    "Failed to delete version record {}: {}",
                    coordinate.at(version_id.as_str()),
                    e
                ));
                continue;
            }
            if let Err(e) = self.projects.remove_version(&coordinate, &version_id).await {
                result.errors.push(format!(
                    "Failed to remove {} from project {}: {}",
                    version_id, project.project_id, e
                ));
            }
            if let Err(e) = self
                .dependency_manager
                .refresh_dependants(&coordinate.at(version_id.as_str()))
                .await
            {
                result.errors.push(format!(
                    "Failed to update dependants of {}: {}",
                    coordinate.at(version_id.as_str()),
                    e
                ));
            }
            result.retired_versions.push(version_id);
        }

        info!(
            project_id = %project.project_id,
            retired = result.retired_versions.len(),
            artifacts_removed = result.artifacts_removed,
            "Retired old project versions"
        );
        Ok(Some(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::coordinate::{Coordinate, ProjectVersion};
    use crate::models::project::{StoredProjectVersion, TransitiveDependenciesReport};
    use crate::services::repository_client::InMemoryArtifactRepository;
    use crate::storage::memory::MemoryProjectVersionStore;
    use async_trait::async_trait;

    /// Version store whose deletes fail for one version id.
    struct FailingDeleteStore {
        inner: MemoryProjectVersionStore,
        failing_version: &'static str,
    }

    #[async_trait]
    impl ProjectVersionStore for FailingDeleteStore {
        async fn find(
            &self,
            coordinate: &Coordinate,
            version_id: &str,
        ) -> Result<Option<StoredProjectVersion>> {
            self.inner.find(coordinate, version_id).await
        }

        async fn find_versions(
            &self,
            coordinate: &Coordinate,
        ) -> Result<Vec<StoredProjectVersion>> {
            self.inner.find_versions(coordinate).await
        }

        async fn find_dependants(
            &self,
            dependency: &ProjectVersion,
            snapshots_only: bool,
        ) -> Result<Vec<ProjectVersion>> {
            self.inner.find_dependants(dependency, snapshots_only).await
        }

        async fn get_all(&self) -> Result<Vec<StoredProjectVersion>> {
            self.inner.get_all().await
        }

        async fn create_or_update(
            &self,
            record: StoredProjectVersion,
        ) -> Result<StoredProjectVersion> {
            self.inner.create_or_update(record).await
        }

        async fn set_transitive_report(
            &self,
            coordinate: &Coordinate,
            version_id: &str,
            report: TransitiveDependenciesReport,
        ) -> Result<Option<StoredProjectVersion>> {
            self.inner
                .set_transitive_report(coordinate, version_id, report)
                .await
        }

        async fn delete(&self, coordinate: &Coordinate, version_id: &str) -> Result<bool> {
            if version_id == self.failing_version {
                return Err(AppError::Storage("disk full".to_string()));
            }
            self.inner.delete(coordinate, version_id).await
        }
    }

    fn versions(list: &[&str]) -> Vec<String> {
        list.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_candidates_preserve_repository_order() {
        let candidates = calculate_candidate_versions(
            &versions(&["1.0.0", "3.0.0", "2.0.0", "2.1.0"]),
            &versions(&["2.0.0"]),
        );
        assert_eq!(candidates, versions(&["1.0.0", "3.0.0", "2.1.0"]));
    }

    #[test]
    fn test_candidates_empty_when_all_stored() {
        let candidates =
            calculate_candidate_versions(&versions(&["1.0.0"]), &versions(&["1.0.0", "0.9.0"]));
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_candidates_deduplicate_repository_listing() {
        let candidates = calculate_candidate_versions(&versions(&["1.0.0", "1.0.0"]), &[]);
        assert_eq!(candidates, versions(&["1.0.0"]));
    }

    #[tokio::test]
    async fn test_retirement_continues_after_store_failure() {
        let mut stores = DepotStores::in_memory();
        stores.versions = Arc::new(FailingDeleteStore {
            inner: MemoryProjectVersionStore::new(),
            failing_version: "1.0.0",
        });
        let registry = ArtifactHandlerRegistry::standard(
            stores.entities.clone(),
            stores.versioned_entities.clone(),
            stores.file_generations.clone(),
        )
        .unwrap();
        let reconciliation = VersionReconciliation::new(
            &stores,
            Arc::new(InMemoryArtifactRepository::new()),
            registry,
            Arc::new(DependencyManager::new(stores.versions.clone())),
        );

        let model = Coordinate::new("org.finos", "model");
        let lib = Coordinate::new("org.finos", "lib");
        for (project_id, coordinate) in [("PROD-1", &model), ("PROD-2", &lib)] {
            stores
                .projects
                .create_or_update(Project::new(project_id, coordinate))
                .await
                .unwrap();
            for v in ["1.0.0", "1.1.0", "2.0.0"] {
                stores
                    .versions
                    .create_or_update(StoredProjectVersion::new(coordinate, v))
                    .await
                    .unwrap();
                stores.projects.add_version(coordinate, v).await.unwrap();
            }
        }

        let results = reconciliation.retire_old_project_versions(1).await.unwrap();

        assert_eq!(results.len(), 2);
        for result in &results {
            assert_eq!(result.retired_versions, versions(&["1.1.0"]));
            assert_eq!(result.errors.len(), 1);
            assert!(result.errors[0].starts_with("Failed to delete version record"));
        }
        // The failed version stays listed; the retired one is gone.
        let listed = stores.projects.find(&lib).await.unwrap().unwrap().versions;
        assert_eq!(listed, versions(&["1.0.0", "2.0.0"]));
    }
}
