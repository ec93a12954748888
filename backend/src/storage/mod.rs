//! Document store contracts.
//!
//! The stores are external collaborators; the core relies on each single
//! document create-or-update being atomic and does no locking of its own.

pub mod memory;

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;
use crate::models::artifact::{Entity, GeneratedFile, StoredArtifact, VersionedEntity};
use crate::models::coordinate::{Coordinate, ProjectVersion};
use crate::models::project::{Project, StoredProjectVersion, TransitiveDependenciesReport};

/// The stores a depot runs against.
#[derive(Clone)]
pub struct DepotStores {
    pub projects: Arc<dyn ProjectStore>,
    pub versions: Arc<dyn ProjectVersionStore>,
    pub entities: Arc<dyn ArtifactStore<Entity>>,
    pub versioned_entities: Arc<dyn ArtifactStore<VersionedEntity>>,
    pub file_generations: Arc<dyn ArtifactStore<GeneratedFile>>,
}

impl DepotStores {
    /// Fresh, empty in-memory stores.
    pub fn in_memory() -> Self {
        Self {
            projects: Arc::new(memory::MemoryProjectStore::new()),
            versions: Arc::new(memory::MemoryProjectVersionStore::new()),
            entities: Arc::new(memory::MemoryArtifactStore::<Entity>::new()),
            versioned_entities: Arc::new(memory::MemoryArtifactStore::<VersionedEntity>::new()),
            file_generations: Arc::new(memory::MemoryArtifactStore::<GeneratedFile>::new()),
        }
    }
}

/// Durable record of projects.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Find the project owning a coordinate
    async fn find(&self, coordinate: &Coordinate) -> Result<Option<Project>>;

    async fn find_by_project_id(&self, project_id: &str) -> Result<Vec<Project>>;

    async fn get_all(&self) -> Result<Vec<Project>>;

    async fn create_or_update(&self, project: Project) -> Result<Project>;

    /// Atomically add a version to the project's version list.
    ///
    /// Returns `false` when the version was already listed. Concurrent
    /// additions of sibling versions are never lost.
    async fn add_version(&self, coordinate: &Coordinate, version_id: &str) -> Result<bool>;

    /// Atomically remove a version from the project's version list.
    async fn remove_version(&self, coordinate: &Coordinate, version_id: &str) -> Result<bool>;
}

/// Durable record of per-version metadata.
#[async_trait]
pub trait ProjectVersionStore: Send + Sync {
    async fn find(
        &self,
        coordinate: &Coordinate,
        version_id: &str,
    ) -> Result<Option<StoredProjectVersion>>;

    /// All stored versions of one coordinate
    async fn find_versions(&self, coordinate: &Coordinate) -> Result<Vec<StoredProjectVersion>>;

    /// Versions whose direct dependency list references `dependency`
    async fn find_dependants(
        &self,
        dependency: &ProjectVersion,
        snapshots_only: bool,
    ) -> Result<Vec<ProjectVersion>>;

    async fn get_all(&self) -> Result<Vec<StoredProjectVersion>>;

    async fn create_or_update(&self, record: StoredProjectVersion) -> Result<StoredProjectVersion>;

    /// Atomically replace only the transitive dependencies report of a record.
    ///
    /// Every other field keeps its currently stored value, so writes made by
    /// a concurrent refresh are never reverted. Returns `None` when the
    /// record no longer exists.
    async fn set_transitive_report(
        &self,
        coordinate: &Coordinate,
        version_id: &str,
        report: TransitiveDependenciesReport,
    ) -> Result<Option<StoredProjectVersion>>;

    async fn delete(&self, coordinate: &Coordinate, version_id: &str) -> Result<bool>;
}

/// Durable record of extracted artifacts of one type.
#[async_trait]
pub trait ArtifactStore<A: StoredArtifact>: Send + Sync {
    /// Insert or overwrite artifacts by logical path; returns the number written
    async fn create_or_update(
        &self,
        coordinate: &Coordinate,
        version_id: &str,
        artifacts: Vec<A>,
    ) -> Result<usize>;

    /// Remove every artifact of a version; returns the number removed
    async fn delete(&self, coordinate: &Coordinate, version_id: &str) -> Result<u64>;

    async fn find_by_version(&self, coordinate: &Coordinate, version_id: &str) -> Result<Vec<A>>;

    async fn find_by_path(
        &self,
        coordinate: &Coordinate,
        version_id: &str,
        path: &str,
    ) -> Result<Option<A>>;

    /// Every stored artifact of a coordinate across versions, as `(version, artifact)`
    async fn find_all_versions(&self, coordinate: &Coordinate) -> Result<Vec<(String, A)>>;
}
