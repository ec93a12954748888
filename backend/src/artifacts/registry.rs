//! Artifact handler registry.
//!
//! Maps each [`ArtifactType`] to the handler responsible for it. The
//! registry is built once at startup and read-only afterwards.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::entities::EntitiesHandler;
use super::file_generations::FileGenerationsHandler;
use super::versioned_entities::VersionedEntitiesHandler;
use super::ArtifactHandler;
use crate::error::{AppError, Result};
use crate::models::artifact::{ArtifactType, Entity, GeneratedFile, VersionedEntity};
use crate::storage::ArtifactStore;

/// Read-only lookup from artifact type to handler.
#[derive(Clone, Default)]
pub struct ArtifactHandlerRegistry {
    handlers: BTreeMap<ArtifactType, Arc<dyn ArtifactHandler>>,
}

impl ArtifactHandlerRegistry {
    pub fn builder() -> ArtifactHandlerRegistryBuilder {
        ArtifactHandlerRegistryBuilder::default()
    }

    /// Registry with the three built-in handlers.
    pub fn standard(
        entities: Arc<dyn ArtifactStore<Entity>>,
        versioned_entities: Arc<dyn ArtifactStore<VersionedEntity>>,
        file_generations: Arc<dyn ArtifactStore<GeneratedFile>>,
    ) -> Result<Self> {
        Self::builder()
            .register(Arc::new(EntitiesHandler::new(entities)))
            .register(Arc::new(VersionedEntitiesHandler::new(versioned_entities)))
            .register(Arc::new(FileGenerationsHandler::new(file_generations)))
            .build()
    }

    pub fn get(&self, artifact_type: ArtifactType) -> Option<Arc<dyn ArtifactHandler>> {
        self.handlers.get(&artifact_type).cloned()
    }

    /// Registered artifact types, in processing order.
    pub fn artifact_types(&self) -> Vec<ArtifactType> {
        self.handlers.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ArtifactType, &Arc<dyn ArtifactHandler>)> {
        self.handlers.iter().map(|(t, h)| (*t, h))
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Collects handlers; duplicate artifact types are rejected at build time.
#[derive(Default)]
pub struct ArtifactHandlerRegistryBuilder {
    handlers: Vec<Arc<dyn ArtifactHandler>>,
}

impl ArtifactHandlerRegistryBuilder {
    pub fn register(mut self, handler: Arc<dyn ArtifactHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn build(self) -> Result<ArtifactHandlerRegistry> {
        let mut handlers = BTreeMap::new();
        for handler in self.handlers {
            let artifact_type = handler.artifact_type();
            if handlers.insert(artifact_type, handler).is_some() {
                return Err(AppError::Config(format!(
                    "Duplicate handler registered for artifact type '{}'",
                    artifact_type
                )));
            }
        }
        Ok(ArtifactHandlerRegistry { handlers })
    }
}
