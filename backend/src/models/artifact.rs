//! Artifact types, repository files and the records extracted from them.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of artifact bundled with a project version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactType {
    /// Plain entity definitions
    Entities,
    /// Version-scoped entity definitions
    VersionedEntities,
    /// File generation outputs
    FileGenerations,
}

impl ArtifactType {
    /// Every artifact type, in processing order.
    pub const ALL: [ArtifactType; 3] = [
        ArtifactType::Entities,
        ArtifactType::VersionedEntities,
        ArtifactType::FileGenerations,
    ];

    /// Tag used in configuration, logs and messages.
    pub fn key(&self) -> &'static str {
        match self {
            ArtifactType::Entities => "entities",
            ArtifactType::VersionedEntities => "versioned-entities",
            ArtifactType::FileGenerations => "file-generations",
        }
    }

    /// Token a repository file name carries when it holds this artifact type.
    pub fn marker(&self) -> &'static str {
        match self {
            ArtifactType::Entities => "entities",
            ArtifactType::VersionedEntities => "versioned-entities",
            ArtifactType::FileGenerations => "file-generation",
        }
    }
}

impl fmt::Display for ArtifactType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// One entry of a repository file (files are archives of entries).
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactEntry {
    pub path: String,
    pub content: Bytes,
}

impl ArtifactEntry {
    pub fn new(path: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    /// Archive bookkeeping such as `META-INF/MANIFEST.MF` or directory entries.
    pub fn is_metadata(&self) -> bool {
        self.path.starts_with("META-INF/") || self.path.ends_with('/')
    }
}

/// A file retrieved from the artifact repository for a version.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactFile {
    /// File name, e.g. `model-1.0.0-entities.jar`
    pub name: String,
    pub entries: Vec<ArtifactEntry>,
}

impl ArtifactFile {
    pub fn new(name: impl Into<String>, entries: Vec<ArtifactEntry>) -> Self {
        Self {
            name: name.into(),
            entries,
        }
    }
}

/// Record persisted by an artifact content store, keyed by logical path.
pub trait StoredArtifact: Clone + Send + Sync + 'static {
    fn path(&self) -> &str;
}

/// Entity definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub path: String,
    pub classifier_path: String,
    #[serde(default)]
    pub content: serde_json::Value,
}

impl StoredArtifact for Entity {
    fn path(&self) -> &str {
        &self.path
    }
}

/// Version-scoped entity definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionedEntity {
    pub path: String,
    pub classifier_path: String,
    #[serde(default)]
    pub content: serde_json::Value,
}

impl From<Entity> for VersionedEntity {
    fn from(entity: Entity) -> Self {
        Self {
            path: entity.path,
            classifier_path: entity.classifier_path,
            content: entity.content,
        }
    }
}

impl StoredArtifact for VersionedEntity {
    fn path(&self) -> &str {
        &self.path
    }
}

/// Output file of a generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedFile {
    /// Logical path, always rooted (`/avro/model/Person.avsc`)
    pub path: String,
    /// First path segment, naming the generator (`avro`)
    pub generation_type: String,
    pub content: String,
}

impl StoredArtifact for GeneratedFile {
    fn path(&self) -> &str {
        &self.path
    }
}
