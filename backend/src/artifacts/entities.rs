//! Entity definitions handler.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::Arc;

use super::{persist_artifacts, select_files, ArtifactHandler};
use crate::error::{AppError, Result};
use crate::models::artifact::{ArtifactFile, ArtifactType, Entity};
use crate::models::coordinate::Coordinate;
use crate::models::refresh::RefreshOutcome;
use crate::storage::ArtifactStore;

/// Handler for plain entity definitions.
pub struct EntitiesHandler {
    store: Arc<dyn ArtifactStore<Entity>>,
}

impl EntitiesHandler {
    pub fn new(store: Arc<dyn ArtifactStore<Entity>>) -> Self {
        Self { store }
    }

    /// Parse every entity document of the given files.
    pub fn extract_artifacts(&self, files: &[&ArtifactFile]) -> Result<Vec<Entity>> {
        parse_entity_documents(files)
    }
}

/// Parse the JSON documents of a set of files.
///
/// Any malformed document aborts the whole extraction.
pub(crate) fn parse_entity_documents<T: DeserializeOwned>(files: &[&ArtifactFile]) -> Result<Vec<T>> {
    let mut documents = Vec::new();
    for file in files {
        for entry in file.entries.iter().filter(|e| !e.is_metadata()) {
            if !entry.path.ends_with(".json") {
                continue;
            }
            let document = serde_json::from_slice(&entry.content).map_err(|e| {
                AppError::extraction(&file.name, format!("{}: {}", entry.path, e))
            })?;
            documents.push(document);
        }
    }
    Ok(documents)
}

#[async_trait]
impl ArtifactHandler for EntitiesHandler {
    fn artifact_type(&self) -> ArtifactType {
        ArtifactType::Entities
    }

    fn matches_artifact_type(&self, file: &ArtifactFile) -> bool {
        file.name.contains(ArtifactType::Entities.marker())
            && !file.name.contains(ArtifactType::VersionedEntities.marker())
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
