//! Project and project-version records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::coordinate::{Coordinate, ProjectVersion};

/// A project registered in the depot.
///
/// `versions` holds the released versions ingested so far; snapshot versions
/// are tracked only through their [`StoredProjectVersion`] records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub project_id: String,
    pub group_id: String,
    pub artifact_id: String,
    #[serde(default)]
    pub versions: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn new(project_id: impl Into<String>, coordinate: &Coordinate) -> Self {
        let now = Utc::now();
        Self {
            project_id: project_id.into(),
            group_id: coordinate.group_id.clone(),
            artifact_id: coordinate.artifact_id.clone(),
            versions: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.group_id.clone(), self.artifact_id.clone())
    }

    pub fn has_version(&self, version_id: &str) -> bool {
        self.versions.iter().any(|v| v == version_id)
    }
}

/// Flattened transitive dependency closure of one version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitiveDependenciesReport {
    /// False when some node of the closure is missing from the store or excluded
    pub valid: bool,
    /// Ordered and deduplicated closure
    #[serde(default)]
    pub transitive_dependencies: Vec<ProjectVersion>,
}

impl TransitiveDependenciesReport {
    pub fn new(transitive_dependencies: Vec<ProjectVersion>, valid: bool) -> Self {
        Self {
            valid,
            transitive_dependencies,
        }
    }

    pub fn contains(&self, version: &ProjectVersion) -> bool {
        self.transitive_dependencies.contains(version)
    }
}

impl Default for TransitiveDependenciesReport {
    fn default() -> Self {
        Self::new(Vec::new(), true)
    }
}

/// Metadata attached to a stored version.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionData {
    /// Direct dependencies, in discovery order
    #[serde(default)]
    pub dependencies: Vec<ProjectVersion>,
    /// POM properties whose keys matched the configured patterns
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default)]
    pub excluded: bool,
    pub exclusion_reason: Option<String>,
    pub transitive_dependencies_report: Option<TransitiveDependenciesReport>,
}

/// A version record as held by the project-version store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredProjectVersion {
    pub group_id: String,
    pub artifact_id: String,
    pub version_id: String,
    pub version_data: VersionData,
    pub updated_at: DateTime<Utc>,
}

impl StoredProjectVersion {
    pub fn new(coordinate: &Coordinate, version_id: impl Into<String>) -> Self {
        Self {
            group_id: coordinate.group_id.clone(),
            artifact_id: coordinate.artifact_id.clone(),
            version_id: version_id.into(),
            version_data: VersionData::default(),
            updated_at: Utc::now(),
        }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.group_id.clone(), self.artifact_id.clone())
    }

    pub fn project_version(&self) -> ProjectVersion {
        ProjectVersion::new(
            self.group_id.clone(),
            self.artifact_id.clone(),
            self.version_id.clone(),
        )
    }

    pub fn is_excluded(&self) -> bool {
        self.version_data.excluded
    }

    /// Mark the record as modified now.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
