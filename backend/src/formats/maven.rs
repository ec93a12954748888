//! Maven POM parsing.
//!
//! Versions published to the artifact repository carry a POM; the depot
//! reads its `<properties>` block and, where a repository client has no
//! richer source, its declared dependencies.

use quick_xml::de::from_str;
use regex::Regex;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

use crate::error::{AppError, Result};
use crate::models::coordinate::ProjectVersion;

/// Parse POM file
pub fn parse_pom(content: &str) -> Result<PomProject> {
    from_str(content).map_err(|e| AppError::Validation(format!("Invalid POM XML: {}", e)))
}

/// POM project model (simplified)
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PomProject {
    pub group_id: Option<String>,
    pub version: Option<String>,
    pub parent: Option<PomParent>,
    pub dependencies: Option<PomDependencies>,
    pub properties: Option<HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PomParent {
    pub group_id: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PomDependencies {
    #[serde(default)]
    pub dependency: Vec<PomDependency>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PomDependency {
    pub group_id: String,
    pub artifact_id: String,
    pub version: Option<String>,
    pub scope: Option<String>,
}

impl PomProject {
    /// Properties whose keys match at least one pattern, sorted by key.
    pub fn matching_properties(&self, patterns: &[Regex]) -> BTreeMap<String, String> {
        self.properties
            .as_ref()
            .map(|properties| {
                properties
                    .iter()
                    .filter(|(key, _)| patterns.iter().any(|re| re.is_match(key)))
                    .map(|(key, value)| (key.clone(), value.trim().to_string()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Group id, inherited from the parent when not declared.
    pub fn effective_group_id(&self) -> Option<&str> {
        self.group_id
            .as_deref()
            .or_else(|| self.parent.as_ref().and_then(|p| p.group_id.as_deref()))
    }

    /// Version, inherited from the parent when not declared.
    pub fn effective_version(&self) -> Option<&str> {
        self.version
            .as_deref()
            .or_else(|| self.parent.as_ref().and_then(|p| p.version.as_deref()))
    }

    /// Declared dependencies with a resolvable version, excluding test scope.
    ///
    /// `${...}` placeholders in group ids and versions are resolved against
    /// the project coordinates and the properties block; a dependency with
    /// an unresolvable placeholder is skipped.
    pub fn project_dependencies(&self) -> Vec<ProjectVersion> {
        self.dependencies
            .as_ref()
            .map(|deps| {
                deps.dependency
                    .iter()
                    .filter(|d| d.scope.as_deref() != Some("test"))
                    .filter_map(|d| {
                        let version = self.interpolate(d.version.as_deref()?)?;
                        let group_id = self.interpolate(&d.group_id)?;
                        Some(ProjectVersion::new(group_id, d.artifact_id.clone(), version))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn interpolate(&self, value: &str) -> Option<String> {
        let Some(name) = value.strip_prefix("${").and_then(|v| v.strip_suffix('}')) else {
            return Some(value.to_string());
        };
        let resolved = match name {
            "project.version" | "version" => self.effective_version(),
            "project.groupId" | "groupId" => self.effective_group_id(),
            "project.parent.version" => self.parent.as_ref().and_then(|p| p.version.as_deref()),
            "project.parent.groupId" => self.parent.as_ref().and_then(|p| p.group_id.as_deref()),
            _ => self
                .properties
                .as_ref()
                .and_then(|props| props.get(name))
                .map(String::as_str),
        };
        resolved.map(|v| v.trim().to_string())
    }
}
