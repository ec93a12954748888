//! Versioned entity definitions handler.

use async_trait::async_trait;
use std::sync::Arc;

use super::entities::parse_entity_documents;
use super::{persist_artifacts, select_files, ArtifactHandler};
use crate::error::Result;
use crate::models::artifact::{ArtifactFile, ArtifactType, VersionedEntity};
use crate::models::coordinate::Coordinate;
use crate::models::refresh::RefreshOutcome;
use crate::storage::ArtifactStore;

/// Handler for version-scoped entity definitions.
pub struct VersionedEntitiesHandler {
    store: Arc<dyn ArtifactStore<VersionedEntity>>,
}

impl VersionedEntitiesHandler {
    pub fn new(store: Arc<dyn ArtifactStore<VersionedEntity>>) -> Self {
        Self { store }
    }

    pub fn extract_artifacts(&self, files: &[&ArtifactFile]) -> Result<Vec<VersionedEntity>> {
        parse_entity_documents(files)
    }
}

#[async_trait]
impl ArtifactHandler for VersionedEntitiesHandler {
    fn artifact_type(&self) -> ArtifactType {
        ArtifactType::VersionedEntities
    }

    async fn refresh_project_version_artifacts(
        &self,
        coordinate: &Coordinate,
        version_id: &str,
        files: &[ArtifactFile],
    ) -> Result<RefreshOutcome> {
        let selected = select_files(self, files);
        let entities = self.extract_artifacts(&selected)?;
        persist_artifacts(
            self.store.as_ref(),
            self.artifact_type(),
            coordinate,
            version_id,
            entities,
        )
        .await
    }

    async fn delete(&self, coordinate: &Coordinate, version_id: &str) -> Result<u64> {
        self.store.delete(coordinate, version_id).await
    }
}
