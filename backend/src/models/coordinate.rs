//! Coordinates and version identifiers.
//!
//! A [`Coordinate`] names a published component; a [`ProjectVersion`] pins it
//! to one version and is the node type of the dependency graph.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Suffix carried by every mutable version identifier.
pub const SNAPSHOT_SUFFIX: &str = "-SNAPSHOT";

/// Branch name of the default mutable version.
pub const MASTER_BRANCH: &str = "master";

/// The reserved default snapshot version.
pub const MASTER_SNAPSHOT: &str = "master-SNAPSHOT";

/// Group/artifact pair identifying a publishable component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinate {
    pub group_id: String,
    pub artifact_id: String,
}

impl Coordinate {
    pub fn new(group_id: impl Into<String>, artifact_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
        }
    }

    /// Pin this coordinate to a version.
    pub fn at(&self, version_id: impl Into<String>) -> ProjectVersion {
        ProjectVersion {
            group_id: self.group_id.clone(),
            artifact_id: self.artifact_id.clone(),
            version_id: version_id.into(),
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.group_id, self.artifact_id)
    }
}

/// One node of the dependency graph: coordinate plus version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectVersion {
    pub group_id: String,
    pub artifact_id: String,
    pub version_id: String,
}

impl ProjectVersion {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version_id: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version_id: version_id.into(),
        }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.group_id.clone(), self.artifact_id.clone())
    }

    pub fn is_snapshot(&self) -> bool {
        is_snapshot(&self.version_id)
    }

    /// Same coordinate, different version.
    pub fn with_version(&self, version_id: impl Into<String>) -> Self {
        Self {
            group_id: self.group_id.clone(),
            artifact_id: self.artifact_id.clone(),
            version_id: version_id.into(),
        }
    }
}

impl fmt::Display for ProjectVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.group_id, self.artifact_id, self.version_id)
    }
}

/// True when the version identifier denotes a mutable snapshot.
pub fn is_snapshot(version_id: &str) -> bool {
    version_id.ends_with(SNAPSHOT_SUFFIX)
}

/// Snapshot identifier for a branch, e.g. `feature-x` -> `feature-x-SNAPSHOT`.
pub fn branch_snapshot(branch: &str) -> String {
    format!("{}{}", branch, SNAPSHOT_SUFFIX)
}

/// The branch-snapshot form a snapshot dependency falls back to.
///
/// Maven-style snapshots of an upcoming release (`1.2.0-SNAPSHOT`) are built
/// from the master branch and resolve to [`MASTER_SNAPSHOT`]; branch
/// snapshots (`feature-x-SNAPSHOT`) are already in branch form. Released
/// versions have no branch form.
pub fn branch_snapshot_form(version_id: &str) -> Option<String> {
    let base = version_id.strip_suffix(SNAPSHOT_SUFFIX)?;
    if parse_release(base).is_some() {
        Some(MASTER_SNAPSHOT.to_string())
    } else {
        Some(version_id.to_string())
    }
}

/// Parse a released version leniently: `1.2.3`, `1.2` and `1` all parse,
/// missing components defaulting to zero.
pub fn parse_release(version_id: &str) -> Option<semver::Version> {
    if let Ok(version) = semver::Version::parse(version_id) {
        return Some(version);
    }
    let mut parts = version_id.split('.');
    let major: u64 = parts.next()?.parse().ok()?;
    let minor = parts.next().map(str::parse::<u64>).transpose().ok()?.unwrap_or(0);
    let patch = parts.next().map(str::parse::<u64>).transpose().ok()?.unwrap_or(0);
    if parts.next().is_some() {
        return None;
    }
    Some(semver::Version::new(major, minor, patch))
}

/// Semantic precedence of two released versions.
///
/// Unparseable versions sort before parseable ones and among themselves
/// lexically, so ordering is total.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    match (parse_release(a), parse_release(b)) {
        (Some(va), Some(vb)) => va.cmp(&vb).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => a.cmp(b),
    }
}
