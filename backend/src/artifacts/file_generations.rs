//! File generation outputs handler.

use async_trait::async_trait;
use std::sync::Arc;

use super::{persist_artifacts, select_files, ArtifactHandler};
use crate::error::{AppError, Result};
use crate::models::artifact::{ArtifactFile, ArtifactType, GeneratedFile};
use crate::models::coordinate::Coordinate;
use crate::models::refresh::RefreshOutcome;
use crate::storage::ArtifactStore;

/// Handler for generated files (schemas, code, documentation) shipped with a version.
pub struct FileGenerationsHandler {
    store: Arc<dyn ArtifactStore<GeneratedFile>>,
}

impl FileGenerationsHandler {
    pub fn new(store: Arc<dyn ArtifactStore<GeneratedFile>>) -> Self {
        Self { store }
    }

    /// Turn every non-metadata entry into a generated file.
    ///
    /// The first path segment names the generation; entries at the archive
    /// root have an empty generation type.
    pub fn extract_artifacts(&self, files: &[&ArtifactFile]) -> Result<Vec<GeneratedFile>> {
        let mut generated = Vec::new();
        for file in files {
            for entry in file.entries.iter().filter(|e| !e.is_metadata()) {
                let relative = entry.path.trim_start_matches('/');
                let generation_type = match relative.split_once('/') {
                    Some((first, _)) => first.to_string(),
                    None => String::new(),
                };
                let content = std::str::from_utf8(&entry.content)
                    .map_err(|e| AppError::extraction(&file.name, format!("{}: {}", entry.path, e)))?;
                generated.push(GeneratedFile {
                    path: format!("/{}", relative),
                    generation_type,
                    content: content.to_string(),
                });
            }
        }
        Ok(generated)
    }
}

#[async_trait]
impl ArtifactHandler for FileGenerationsHandler {
    fn artifact_type(&self) -> ArtifactType {
        ArtifactType::FileGenerations
    }

    async fn refresh_project_version_artifacts(
        &self,
        coordinate: &Coordinate,
        version_id: &str,
        files: &[ArtifactFile],
    ) -> Result<RefreshOutcome> {
        let selected = select_files(self, files);
        let generated = self.extract_artifacts(&selected)?;
        persist_artifacts(
            self.store.as_ref(),
            self.artifact_type(),
            coordinate,
            version_id,
            generated,
        )
        .await
    }

    async fn delete(&self, coordinate: &Coordinate, version_id: &str) -> Result<u64> {
        self.store.delete(coordinate, version_id).await
    }
}
