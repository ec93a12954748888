//! Artifact repository client contract and an in-memory repository.
//!
//! The depot never talks to the artifact repository's storage directly; it
//! asks for version listings, direct dependencies and files by coordinates.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use crate::error::{AppError, Result};
use crate::formats::maven::parse_pom;
use crate::models::artifact::{ArtifactFile, ArtifactType};
use crate::models::coordinate::{Coordinate, ProjectVersion};

/// Facts about published versions.
#[async_trait]
pub trait ArtifactRepositoryClient: Send + Sync {
    /// Every published version of a coordinate, in repository order
    async fn find_versions(&self, coordinate: &Coordinate) -> Result<Vec<String>>;

    async fn find_version(&self, coordinate: &Coordinate, version_id: &str)
        -> Result<Option<String>>;

    /// Direct dependencies declared by a version
    async fn find_dependencies(
        &self,
        coordinate: &Coordinate,
        version_id: &str,
    ) -> Result<Vec<ProjectVersion>>;

    /// Files of a version relevant to an artifact type.
    ///
    /// Implementations may return a broader listing; artifact handlers
    /// select their own files by name.
    async fn find_files(
        &self,
        artifact_type: ArtifactType,
        coordinate: &Coordinate,
        version_id: &str,
    ) -> Result<Vec<ArtifactFile>>;

    /// Raw POM of a version, when the repository keeps one.
    async fn find_pom(&self, coordinate: &Coordinate, version_id: &str) -> Result<Option<String>> {
        let _ = (coordinate, version_id);
        Ok(None)
    }
}

#[derive(Debug, Clone, Default)]
struct PublishedVersion {
    dependencies: Vec<ProjectVersion>,
    files: Vec<ArtifactFile>,
    pom: Option<String>,
}

/// Programmable in-memory artifact repository.
///
/// Versions are listed in publication order. `find_files` returns the whole
/// file listing of the version regardless of the requested artifact type.
#[derive(Default)]
pub struct InMemoryArtifactRepository {
    versions: RwLock<BTreeMap<Coordinate, Vec<(String, PublishedVersion)>>>,
    offline: AtomicBool,
}

impl InMemoryArtifactRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish (or republish) a version with its dependencies and files.
    pub async fn publish(
        &self,
        coordinate: &Coordinate,
        version_id: &str,
        dependencies: Vec<ProjectVersion>,
        files: Vec<ArtifactFile>,
    ) {
        let mut versions = self.versions.write().await;
        let published = versions.entry(coordinate.clone()).or_default();
        let pom = published
            .iter()
            .find(|(v, _)| v == version_id)
            .and_then(|(_, p)| p.pom.clone());
        let version = PublishedVersion {
            dependencies,
            files,
            pom,
        };
        match published.iter_mut().find(|(v, _)| v == version_id) {
            Some((_, existing)) => *existing = version,
            None => published.push((version_id.to_string(), version)),
        }
    }

    /// Publish a version described by its POM; dependencies are read from it.
    pub async fn publish_pom(
        &self,
        coordinate: &Coordinate,
        version_id: &str,
        pom: &str,
        files: Vec<ArtifactFile>,
    ) -> Result<()> {
        let dependencies = parse_pom(pom)?.project_dependencies();
        self.publish(coordinate, version_id, dependencies, files).await;
        self.set_pom(coordinate, version_id, pom).await;
        Ok(())
    }

    /// Attach a POM to an already published version.
    pub async fn set_pom(&self, coordinate: &Coordinate, version_id: &str, pom: impl Into<String>) {
        let mut versions = self.versions.write().await;
        if let Some((_, published)) = versions
            .get_mut(coordinate)
            .and_then(|all| all.iter_mut().find(|(v, _)| v == version_id))
        {
            published.pom = Some(pom.into());
        }
    }

    /// Withdraw a version from the repository.
    pub async fn unpublish(&self, coordinate: &Coordinate, version_id: &str) {
        if let Some(all) = self.versions.write().await.get_mut(coordinate) {
            all.retain(|(v, _)| v != version_id);
        }
    }

    /// Make every call fail as an unreachable repository would.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(AppError::Repository(
                "artifact repository unavailable".to_string(),
            ));
        }
        Ok(())
    }

    async fn published(
        &self,
        coordinate: &Coordinate,
        version_id: &str,
    ) -> Option<PublishedVersion> {
        self.versions
            .read()
            .await
            .get(coordinate)
            .and_then(|all| all.iter().find(|(v, _)| v == version_id))
            .map(|(_, p)| p.clone())
    }
}

#[async_trait]
impl ArtifactRepositoryClient for InMemoryArtifactRepository {
    async fn find_versions(&self, coordinate: &Coordinate) -> Result<Vec<String>> {
        self.check_online()?;
        Ok(self
            .versions
            .read()
            .await
            .get(coordinate)
            .map(|all| all.iter().map(|(v, _)| v.clone()).collect())
            .unwrap_or_default())
    }

    async fn find_version(
        &self,
        coordinate: &Coordinate,
        version_id: &str,
    ) -> Result<Option<String>> {
        self.check_online()?;
        Ok(self
            .published(coordinate, version_id)
            .await
            .map(|_| version_id.to_string()))
    }

    async fn find_dependencies(
        &self,
        coordinate: &Coordinate,
        version_id: &str,
    ) -> Result<Vec<ProjectVersion>> {
        self.check_online()?;
        self.published(coordinate, version_id)
            .await
            .map(|p| p.dependencies)
            .ok_or_else(|| {
                AppError::Repository(format!(
                    "Version {} of {} not found in repository",
                    version_id, coordinate
                ))
            })
    }

    async fn find_files(
        &self,
        _artifact_type: ArtifactType,
        coordinate: &Coordinate,
        version_id: &str,
    ) -> Result<Vec<ArtifactFile>> {
        self.check_online()?;
        Ok(self
            .published(coordinate, version_id)
            .await
            .map(|p| p.files)
            .unwrap_or_default())
    }

    async fn find_pom(&self, coordinate: &Coordinate, version_id: &str) -> Result<Option<String>> {
        self.check_online()?;
        Ok(self
            .published(coordinate, version_id)
            .await
            .and_then(|p| p.pom))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coordinate() -> Coordinate {
        Coordinate::new("org.finos", "model")
    }

    #[tokio::test]
    async fn test_versions_keep_publication_order() {
        let repo = InMemoryArtifactRepository::new();
        for v in ["2.2.0", "2.3.0", "2.1.0"] {
            repo.publish(&coordinate(), v, vec![], vec![]).await;
        }
        assert_eq!(
            repo.find_versions(&coordinate()).await.unwrap(),
            vec!["2.2.0", "2.3.0", "2.1.0"]
        );
    }

    #[tokio::test]
    async fn test_republish_replaces_content_and_keeps_pom() {
        let repo = InMemoryArtifactRepository::new();
        let lib = Coordinate::new("org.finos", "lib").at("1.0.0");
        repo.publish(&coordinate(), "master-SNAPSHOT", vec![], vec![]).await;
        repo.set_pom(&coordinate(), "master-SNAPSHOT", "<project/>").await;
        repo.publish(&coordinate(), "master-SNAPSHOT", vec![lib.clone()], vec![])
            .await;

        assert_eq!(
            repo.find_dependencies(&coordinate(), "master-SNAPSHOT")
                .await
                .unwrap(),
            vec![lib]
        );
        assert_eq!(
            repo.find_pom(&coordinate(), "master-SNAPSHOT").await.unwrap(),
            Some("<project/>".to_string())
        );
        assert_eq!(repo.find_versions(&coordinate()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_publish_pom_reads_dependencies() {
        let repo = InMemoryArtifactRepository::new();
        let pom = r#"<project>
  <dependencies>
    <dependency>
      <groupId>org.finos</groupId>
      <artifactId>lib</artifactId>
      <version>2.0.0</version>
    </dependency>
  </dependencies>
</project>"#;
        repo.publish_pom(&coordinate(), "1.0.0", pom, vec![])
            .await
            .unwrap();

        assert_eq!(
            repo.find_dependencies(&coordinate(), "1.0.0").await.unwrap(),
            vec![ProjectVersion::new("org.finos", "lib", "2.0.0")]
        );
        assert!(repo.find_pom(&coordinate(), "1.0.0").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_offline_repository_fails_calls() {
        let repo = InMemoryArtifactRepository::new();
        repo.set_offline(true);
        let err = repo.find_versions(&coordinate()).await.unwrap_err();
        assert!(matches!(err, AppError::Repository(_)));
    }

    #[tokio::test]
    async fn test_unknown_version() {
        let repo = InMemoryArtifactRepository::new();
        assert_eq!(repo.find_version(&coordinate(), "9.9.9").await.unwrap(), None);
        assert!(repo.find_dependencies(&coordinate(), "9.9.9").await.is_err());
        assert!(repo
            .find_files(ArtifactType::Entities, &coordinate(), "9.9.9")
            .await
            .unwrap()
            .is_empty());
    }
}
