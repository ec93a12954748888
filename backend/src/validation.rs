//! Shape validation for project ids, coordinates and version identifiers.

use regex::Regex;
use std::sync::OnceLock;

use crate::models::coordinate::{Coordinate, MASTER_SNAPSHOT};

fn project_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Z]+-[0-9]+$").expect("valid regex"))
}

fn group_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9_-]+(\.[A-Za-z0-9_-]+)*$").expect("valid regex")
    })
}

fn artifact_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z0-9]+([-_][a-z0-9]+)*$").expect("valid regex"))
}

fn release_version_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9]+\.[0-9]+\.[0-9]+$").expect("valid regex"))
}

fn snapshot_version_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*-SNAPSHOT$").expect("valid regex")
    })
}

/// Project ids are an upper-case prefix and a number, e.g. `PROD-12345`.
pub fn is_valid_project_id(project_id: &str) -> bool {
    project_id_regex().is_match(project_id)
}

pub fn is_valid_group_id(group_id: &str) -> bool {
    group_id_regex().is_match(group_id)
}

pub fn is_valid_artifact_id(artifact_id: &str) -> bool {
    artifact_id_regex().is_match(artifact_id)
}

/// `MAJOR.MINOR.PATCH`
pub fn is_valid_release_version(version_id: &str) -> bool {
    release_version_regex().is_match(version_id)
}

/// `<branch>-SNAPSHOT`, including the reserved master snapshot.
pub fn is_valid_snapshot_version(version_id: &str) -> bool {
    version_id == MASTER_SNAPSHOT || snapshot_version_regex().is_match(version_id)
}

pub fn is_valid_version_id(version_id: &str) -> bool {
    is_valid_release_version(version_id) || is_valid_snapshot_version(version_id)
}

/// Errors for every malformed component of a coordinate.
pub fn validate_coordinate(coordinate: &Coordinate) -> Vec<String> {
    let mut errors = Vec::new();
    if !is_valid_group_id(&coordinate.group_id) {
        errors.push(format!("Invalid groupId '{}'", coordinate.group_id));
    }
    if !is_valid_artifact_id(&coordinate.artifact_id) {
        errors.push(format!("Invalid artifactId '{}'", coordinate.artifact_id));
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_id() {
        assert!(is_valid_project_id("PROD-12345"));
        assert!(!is_valid_project_id("prod-1"));
        assert!(!is_valid_project_id("PROD-"));
        assert!(!is_valid_project_id("12345"));
    }

    #[test]
    fn test_group_id() {
        assert!(is_valid_group_id("org.finos.legend"));
        assert!(is_valid_group_id("examples"));
        assert!(!is_valid_group_id("org..finos"));
        assert!(!is_valid_group_id(".org"));
        assert!(!is_valid_group_id(""));
    }

    #[test]
    fn test_artifact_id() {
        assert!(is_valid_artifact_id("my-model"));
        assert!(is_valid_artifact_id("my_model2"));
        assert!(!is_valid_artifact_id("MyModel"));
        assert!(!is_valid_artifact_id("my--model"));
        assert!(!is_valid_artifact_id("-model"));
    }

    #[test]
    fn test_versions() {
        assert!(is_valid_release_version("1.0.0"));
        assert!(!is_valid_release_version("1.0"));
        assert!(!is_valid_release_version("1.0.0-SNAPSHOT"));

        assert!(is_valid_snapshot_version("master-SNAPSHOT"));
        assert!(is_valid_snapshot_version("feature.x-SNAPSHOT"));
        assert!(is_valid_snapshot_version("1.0.0-SNAPSHOT"));
        assert!(!is_valid_snapshot_version("-SNAPSHOT"));
        assert!(!is_valid_snapshot_version("master"));

        assert!(is_valid_version_id("2.3.1"));
        assert!(!is_valid_version_id("latest"));
    }

    #[test]
    fn test_validate_coordinate_reports_each_part() {
        let errors = validate_coordinate(&Coordinate::new("bad group", "BadArtifact"));
        assert_eq!(errors.len(), 2);
        assert!(validate_coordinate(&Coordinate::new("org.finos", "model")).is_empty());
    }
}
