//! In-memory store adapters.
//!
//! Each store guards its documents with a single `tokio::sync::RwLock`, which
//! gives the per-document atomic create-or-update the services rely on.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tokio::sync::RwLock;

use super::{ArtifactStore, ProjectStore, ProjectVersionStore};
use crate::error::{AppError, Result};
use crate::models::artifact::StoredArtifact;
use crate::models::coordinate::{Coordinate, ProjectVersion};
use crate::models::project::{Project, StoredProjectVersion, TransitiveDependenciesReport};

/// Projects keyed by coordinate.
#[derive(Default)]
pub struct MemoryProjectStore {
    projects: RwLock<BTreeMap<Coordinate, Project>>,
}

impl MemoryProjectStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProjectStore for MemoryProjectStore {
    async fn find(&self, coordinate: &Coordinate) -> Result<Option<Project>> {
        Ok(self.projects.read().await.get(coordinate).cloned())
    }

    async fn find_by_project_id(&self, project_id: &str) -> Result<Vec<Project>> {
        Ok(self
            .projects
            .read()
            .await
            .values()
            .filter(|p| p.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn get_all(&self) -> Result<Vec<Project>> {
        Ok(self.projects.read().await.values().cloned().collect())
    }

    async fn create_or_update(&self, mut project: Project) -> Result<Project> {
        project.updated_at = Utc::now();
        self.projects
            .write()
            .await
            .insert(project.coordinate(), project.clone());
        Ok(project)
    }

    async fn add_version(&self, coordinate: &Coordinate, version_id: &str) -> Result<bool> {
        let mut projects = self.projects.write().await;
        let project = projects
            .get_mut(coordinate)
            .ok_or_else(|| AppError::NotFound(format!("No project with coordinates {}", coordinate)))?;
        if project.has_version(version_id) {
            return Ok(false);
        }
        project.versions.push(version_id.to_string());
        project.updated_at = Utc::now();
        Ok(true)
    }

    async fn remove_version(&self, coordinate: &Coordinate, version_id: &str) -> Result<bool> {
        let mut projects = self.projects.write().await;
        let project = projects
            .get_mut(coordinate)
            .ok_or_else(|| AppError::NotFound(format!("No project with coordinates {}", coordinate)))?;
        let before = project.versions.len();
        project.versions.retain(|v| v != version_id);
        let removed = project.versions.len() != before;
        if removed {
            project.updated_at = Utc::now();
        }
        Ok(removed)
    }
}

#[derive(Default)]
struct VersionState {
    records: BTreeMap<ProjectVersion, StoredProjectVersion>,
    /// Reverse dependency index: dependency -> versions listing it directly
    dependants: HashMap<ProjectVersion, BTreeSet<ProjectVersion>>,
}

impl VersionState {
    fn unlink(&mut self, version: &ProjectVersion) {
        if let Some(old) = self.records.get(version) {
            for dependency in &old.version_data.dependencies {
                if let Some(set) = self.dependants.get_mut(dependency) {
                    set.remove(version);
                    if set.is_empty() {
                        self.dependants.remove(dependency);
                    }
                }
            }
        }
    }

    fn link(&mut self, record: &StoredProjectVersion) {
        let version = record.project_version();
        for dependency in &record.version_data.dependencies {
            self.dependants
                .entry(dependency.clone())
                .or_default()
                .insert(version.clone());
        }
    }
}

/// Version records with a reverse dependency index for cascades.
#[derive(Default)]
pub struct MemoryProjectVersionStore {
    state: RwLock<VersionState>,
}

impl MemoryProjectVersionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProjectVersionStore for MemoryProjectVersionStore {
    async fn find(
        &self,
        coordinate: &Coordinate,
        version_id: &str,
    ) -> Result<Option<StoredProjectVersion>> {
        Ok(self
            .state
            .read()
            .await
            .records
            .get(&coordinate.at(version_id))
            .cloned())
    }

    async fn find_versions(&self, coordinate: &Coordinate) -> Result<Vec<StoredProjectVersion>> {
        Ok(self
            .state
            .read()
            .await
            .records
            .values()
            .filter(|r| r.group_id == coordinate.group_id && r.artifact_id == coordinate.artifact_id)
            .cloned()
            .collect())
    }

    async fn find_dependants(
        &self,
        dependency: &ProjectVersion,
        snapshots_only: bool,
    ) -> Result<Vec<ProjectVersion>> {
        let state = self.state.read().await;
        Ok(state
            .dependants
            .get(dependency)
            .map(|set| {
                set.iter()
                    .filter(|v| !snapshots_only || v.is_snapshot())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get_all(&self) -> Result<Vec<StoredProjectVersion>> {
        Ok(self.state.read().await.records.values().cloned().collect())
    }

    async fn create_or_update(&self, record: StoredProjectVersion) -> Result<StoredProjectVersion> {
        let version = record.project_version();
        let mut state = self.state.write().await;
        state.unlink(&version);
        state.link(&record);
        state.records.insert(version, record.clone());
        Ok(record)
    }

    async fn set_transitive_report(
        &self,
        coordinate: &Coordinate,
        version_id: &str,
        report: TransitiveDependenciesReport,
    ) -> Result<Option<StoredProjectVersion>> {
        let mut state = self.state.write().await;
        Ok(state
            .records
            .get_mut(&coordinate.at(version_id))
            .map(|record| {
                record.version_data.transitive_dependencies_report = Some(report);
                record.touch();
                record.clone()
            }))
    }

    async fn delete(&self, coordinate: &Coordinate, version_id: &str) -> Result<bool> {
        let version = coordinate.at(version_id);
        let mut state = self.state.write().await;
        state.unlink(&version);
        Ok(state.records.remove(&version).is_some())
    }
}

/// Artifacts of one type keyed by version and logical path.
pub struct MemoryArtifactStore<A> {
    artifacts: RwLock<BTreeMap<ProjectVersion, BTreeMap<String, A>>>,
}

impl<A> Default for MemoryArtifactStore<A> {
    fn default() -> Self {
        Self {
            artifacts: RwLock::new(BTreeMap::new()),
        }
    }
}

impl<A> MemoryArtifactStore<A> {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl<A: StoredArtifact> ArtifactStore<A> for MemoryArtifactStore<A> {
    async fn create_or_update(
        &self,
        coordinate: &Coordinate,
        version_id: &str,
        artifacts: Vec<A>,
    ) -> Result<usize> {
        let count = artifacts.len();
        let mut all = self.artifacts.write().await;
        let by_path = all.entry(coordinate.at(version_id)).or_default();
        for artifact in artifacts {
            by_path.insert(artifact.path().to_string(), artifact);
        }
        Ok(count)
    }

    async fn delete(&self, coordinate: &Coordinate, version_id: &str) -> Result<u64> {
        Ok(self
            .artifacts
            .write()
            .await
            .remove(&coordinate.at(version_id))
            .map(|by_path| by_path.len() as u64)
            .unwrap_or(0))
    }

    async fn find_by_version(&self, coordinate: &Coordinate, version_id: &str) -> Result<Vec<A>> {
        Ok(self
            .artifacts
            .read()
            .await
            .get(&coordinate.at(version_id))
            .map(|by_path| by_path.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn find_by_path(
        &self,
        coordinate: &Coordinate,
        version_id: &str,
        path: &str,
    ) -> Result<Option<A>> {
        Ok(self
            .artifacts
            .read()
            .await
            .get(&coordinate.at(version_id))
            .and_then(|by_path| by_path.get(path).cloned()))
    }

    async fn find_all_versions(&self, coordinate: &Coordinate) -> Result<Vec<(String, A)>> {
        Ok(self
            .artifacts
            .read()
            .await
            .iter()
            .filter(|(version, _)| version.coordinate() == *coordinate)
            .flat_map(|(version, by_path)| {
                by_path
                    .values()
                    .map(|a| (version.version_id.clone(), a.clone()))
                    .collect::<Vec<_>>()
            })
            .collect())
    }
}
