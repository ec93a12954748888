//! Artifact handlers.
//!
//! Each artifact type bundled with a project version has one handler that
//! selects its files from the repository listing, extracts typed records
//! from them and persists those records.

pub mod entities;
pub mod file_generations;
pub mod registry;
pub mod versioned_entities;

use async_trait::async_trait;
use tracing::debug;

use crate::error::Result;
use crate::models::artifact::{ArtifactFile, ArtifactType, StoredArtifact};
use crate::models::coordinate::{is_snapshot, Coordinate};
use crate::models::refresh::RefreshOutcome;
use crate::storage::ArtifactStore;

pub use registry::ArtifactHandlerRegistry;

/// Artifact handler trait.
///
/// Services dispatch through this trait without knowing the artifact type
/// behind it.
#[async_trait]
pub trait ArtifactHandler: Send + Sync {
    /// Get the artifact type this handler supports.
    fn artifact_type(&self) -> ArtifactType;

    /// Whether a repository file holds artifacts of this type.
    fn matches_artifact_type(&self, file: &ArtifactFile) -> bool {
        file.name.contains(self.artifact_type().marker())
    }

    /// Extract and persist the artifacts of one version.
    ///
    /// Snapshot versions are fully replaced; released versions are
    /// overwritten by logical path and never lose existing artifacts.
    async fn refresh_project_version_artifacts(
        &self,
        coordinate: &Coordinate,
        version_id: &str,
        files: &[ArtifactFile],
    ) -> Result<RefreshOutcome>;

    /// Remove every stored artifact of this type for a version.
    async fn delete(&self, coordinate: &Coordinate, version_id: &str) -> Result<u64>;
}

/// Files of a listing selected by a handler's naming convention.
pub fn select_files<'a, H>(handler: &H, files: &'a [ArtifactFile]) -> Vec<&'a ArtifactFile>
where
    H: ArtifactHandler + ?Sized,
{
    files
        .iter()
        .filter(|f| handler.matches_artifact_type(f))
        .collect()
}

/// Persist extracted artifacts with snapshot replace semantics.
pub(crate) async fn persist_artifacts<A: StoredArtifact>(
    store: &dyn ArtifactStore<A>,
    artifact_type: ArtifactType,
    coordinate: &Coordinate,
    version_id: &str,
    artifacts: Vec<A>,
) -> Result<RefreshOutcome> {
    let mut outcome = RefreshOutcome::new();

    if is_snapshot(version_id) {
        let deleted = store.delete(coordinate, version_id).await?;
        debug!(
            coordinate = %coordinate,
            version = version_id,
            artifact_type = %artifact_type,
            deleted,
            "Removed previous snapshot artifacts"
        );
        outcome.add_message(format!(
            "removed {} old {} artifacts for {}",
            deleted,
            artifact_type,
            coordinate.at(version_id)
        ));
    }

    if artifacts.is_empty() {
        outcome.add_message(format!(
            "found 0 {} artifacts for {}",
            artifact_type,
            coordinate.at(version_id)
        ));
        return Ok(outcome);
    }

    let written = store
        .create_or_update(coordinate, version_id, artifacts)
        .await?;
    outcome.add_message(format!(
        "persisted {} {} artifacts for {}",
        written,
        artifact_type,
        coordinate.at(version_id)
    ));
    Ok(outcome)
}
