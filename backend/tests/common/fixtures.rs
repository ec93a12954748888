//! Test fixtures and data factories for backend tests
//!
//! Provides reusable test data for:
//! - Coordinates and project versions
//! - Repository files holding entities, versioned entities and generations

#![allow(dead_code)]

use depot_backend::models::artifact::{ArtifactEntry, ArtifactFile};
use depot_backend::models::coordinate::{Coordinate, ProjectVersion};

pub const GROUP_ID: &str = "org.finos.legend";

pub fn coordinate(artifact_id: &str) -> Coordinate {
    Coordinate::new(GROUP_ID, artifact_id)
}

pub fn version(artifact_id: &str, version_id: &str) -> ProjectVersion {
    coordinate(artifact_id).at(version_id)
}

/// JSON document of one entity definition
pub fn entity_json(path: &str) -> String {
    format!(
        r#"{{"path":"{}","classifierPath":"meta::pure::metamodel::type::Class","content":{{"_type":"class","name":"{}"}}}}"#,
        path,
        path.rsplit("::").next().unwrap_or(path)
    )
}

/// Archive entries for a set of entity paths, plus a manifest
fn entity_entries(paths: &[&str]) -> Vec<ArtifactEntry> {
    let mut entries = vec![ArtifactEntry::new(
        "META-INF/MANIFEST.MF",
        "Manifest-Version: 1.0",
    )];
    entries.extend(paths.iter().map(|path| {
        ArtifactEntry::new(
            format!("entities/{}.json", path.replace("::", "/")),
            entity_json(path),
        )
    }));
    entries
}

pub fn entities_file(artifact_id: &str, version_id: &str, paths: &[&str]) -> ArtifactFile {
    ArtifactFile::new(
        format!("{}-{}-entities.jar", artifact_id, version_id),
        entity_entries(paths),
    )
}

pub fn versioned_entities_file(
    artifact_id: &str,
    version_id: &str,
    paths: &[&str],
) -> ArtifactFile {
    ArtifactFile::new(
        format!("{}-{}-versioned-entities.jar", artifact_id, version_id),
        entity_entries(paths),
    )
}

/// Generation archive from `(path, content)` pairs
pub fn file_generation_file(
    artifact_id: &str,
    version_id: &str,
    files: &[(&str, &str)],
) -> ArtifactFile {
    ArtifactFile::new(
        format!("{}-{}-file-generation.jar", artifact_id, version_id),
        files
            .iter()
            .map(|(path, content)| ArtifactEntry::new(path.to_string(), content.to_string()))
            .collect(),
    )
}

pub fn malformed_entities_file(artifact_id: &str, version_id: &str) -> ArtifactFile {
    ArtifactFile::new(
        format!("{}-{}-entities.jar", artifact_id, version_id),
        vec![ArtifactEntry::new("entities/Broken.json", "{\"path\": ")],
    )
}

/// POM declaring dependencies and a few properties
pub fn pom(dependencies: &[ProjectVersion]) -> String {
    let dependencies: String = dependencies
        .iter()
        .map(|d| {
            format!(
                "    <dependency>\n      <groupId>{}</groupId>\n      <artifactId>{}</artifactId>\n      <version>{}</version>\n    </dependency>\n",
                d.group_id, d.artifact_id, d.version_id
            )
        })
        .collect();
    format!(
        r#"<project>
  <groupId>{group}</groupId>
  <properties>
    <project.build.sourceEncoding>UTF-8</project.build.sourceEncoding>
    <legend.engine.version>4.1.0</legend.engine.version>
    <skipTests>true</skipTests>
  </properties>
  <dependencies>
{dependencies}  </dependencies>
</project>"#,
        group = GROUP_ID,
        dependencies = dependencies
    )
}
