//! Common test utilities for backend integration tests
//!
//! Provides a fully wired in-memory depot: stores, a programmable artifact
//! repository, the notification bus and the services on top of them.

#![allow(dead_code)]
#![allow(unused_imports)]

pub mod fixtures;

use std::sync::Arc;

use depot_backend::artifacts::ArtifactHandlerRegistry;
use depot_backend::models::artifact::{Entity, GeneratedFile, VersionedEntity};
use depot_backend::models::coordinate::Coordinate;
use depot_backend::models::project::{Project, StoredProjectVersion, TransitiveDependenciesReport};
use depot_backend::services::event_bus::EventBus;
use depot_backend::services::project_service::ProjectService;
use depot_backend::services::refresh_service::RefreshService;
use depot_backend::services::repository_client::InMemoryArtifactRepository;
use depot_backend::storage::{ArtifactStore, DepotStores, ProjectStore, ProjectVersionStore};
use depot_backend::{telemetry, Config};

/// Route service logs to the test output; `RUST_LOG` overrides the level
pub fn init_test_tracing() {
    telemetry::init_tracing(&telemetry::default_filter("warn"));
}

/// In-memory depot shared by a test
pub struct TestDepot {
    pub stores: DepotStores,
    pub repository: Arc<InMemoryArtifactRepository>,
    pub notifications: Arc<EventBus>,
    pub refresh: RefreshService,
    pub admin: ProjectService,
}

impl TestDepot {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        init_test_tracing();
        let stores = DepotStores::in_memory();
        let repository = Arc::new(InMemoryArtifactRepository::new());
        let notifications = Arc::new(EventBus::new(config.notification_capacity));
        let refresh = RefreshService::new(
            &stores,
            repository.clone(),
            notifications.clone(),
            &config,
        )
        .expect("Failed to build refresh service");
        let registry = ArtifactHandlerRegistry::standard(
            stores.entities.clone(),
            stores.versioned_entities.clone(),
            stores.file_generations.clone(),
        )
        .expect("Failed to build handler registry");
        let admin = ProjectService::new(&stores, registry);

        Self {
            stores,
            repository,
            notifications,
            refresh,
            admin,
        }
    }

    /// Register a project
    pub async fn project(&self, project_id: &str, coordinate: &Coordinate) -> Project {
        self.admin
            .create_project(project_id, coordinate)
            .await
            .expect("Failed to create project")
    }

    pub async fn project_versions(&self, coordinate: &Coordinate) -> Vec<String> {
        self.stores
            .projects
            .find(coordinate)
            .await
            .expect("project store failed")
            .map(|p| p.versions)
            .unwrap_or_default()
    }

    pub async fn stored_version(
        &self,
        coordinate: &Coordinate,
        version_id: &str,
    ) -> Option<StoredProjectVersion> {
        self.stores
            .versions
            .find(coordinate, version_id)
            .await
            .expect("version store failed")
    }

    /// Stored closure of a version; panics when the version has none
    pub async fn report(
        &self,
        coordinate: &Coordinate,
        version_id: &str,
    ) -> TransitiveDependenciesReport {
        self.stored_version(coordinate, version_id)
            .await
            .and_then(|r| r.version_data.transitive_dependencies_report)
            .expect("version has no transitive dependencies report")
    }

    pub async fn entities(&self, coordinate: &Coordinate, version_id: &str) -> Vec<Entity> {
        self.stores
            .entities
            .find_by_version(coordinate, version_id)
            .await
            .expect("entity store failed")
    }

    pub async fn versioned_entities(
        &self,
        coordinate: &Coordinate,
        version_id: &str,
    ) -> Vec<VersionedEntity> {
        self.stores
            .versioned_entities
            .find_by_version(coordinate, version_id)
            .await
            .expect("versioned entity store failed")
    }

    pub async fn generated_files(
        &self,
        coordinate: &Coordinate,
        version_id: &str,
    ) -> Vec<GeneratedFile> {
        self.stores
            .file_generations
            .find_by_version(coordinate, version_id)
            .await
            .expect("file generation store failed")
    }
}
