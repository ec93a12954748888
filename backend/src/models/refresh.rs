//! Refresh events, outcomes and reconciliation reports.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::coordinate::{Coordinate, ProjectVersion};

/// Request to ingest one project version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshEvent {
    pub event_id: Uuid,
    pub parent_event_id: Option<Uuid>,
    pub project_id: String,
    pub group_id: String,
    pub artifact_id: String,
    pub version_id: String,
    /// Skip the repository existence check
    pub force_refresh: bool,
    /// Refresh missing dependencies before this version
    pub transitive: bool,
}

impl RefreshEvent {
    pub fn new(
        project_id: impl Into<String>,
        coordinate: &Coordinate,
        version_id: impl Into<String>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            parent_event_id: None,
            project_id: project_id.into(),
            group_id: coordinate.group_id.clone(),
            artifact_id: coordinate.artifact_id.clone(),
            version_id: version_id.into(),
            force_refresh: false,
            transitive: false,
        }
    }

    pub fn with_force_refresh(mut self, force_refresh: bool) -> Self {
        self.force_refresh = force_refresh;
        self
    }

    pub fn with_transitive(mut self, transitive: bool) -> Self {
        self.transitive = transitive;
        self
    }

    /// Event for a dependency, triggered while handling `parent`.
    pub fn child_of(
        parent: &RefreshEvent,
        project_id: impl Into<String>,
        dependency: &ProjectVersion,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            parent_event_id: Some(parent.event_id),
            project_id: project_id.into(),
            group_id: dependency.group_id.clone(),
            artifact_id: dependency.artifact_id.clone(),
            version_id: dependency.version_id.clone(),
            force_refresh: parent.force_refresh,
            transitive: parent.transitive,
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
}

/// Terminal status of a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefreshStatus {
    Success,
    Failed,
}

/// Result of a refresh: status plus accumulated messages and errors.
///
/// The status is `Failed` as soon as one error has been added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshOutcome {
    pub status: RefreshStatus,
    pub messages: Vec<String>,
    pub errors: Vec<String>,
}

impl Default for RefreshOutcome {
    fn default() -> Self {
        Self::new()
    }
}

impl RefreshOutcome {
    pub fn new() -> Self {
        Self {
            status: RefreshStatus::Success,
            messages: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Outcome carrying a single error.
    pub fn failed(error: impl Into<String>) -> Self {
        let mut outcome = Self::new();
        outcome.add_error(error);
        outcome
    }

    pub fn add_message(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    pub fn add_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
        self.status = RefreshStatus::Failed;
    }

    pub fn add_errors(&mut self, errors: impl IntoIterator<Item = String>) {
        for error in errors {
            self.add_error(error);
        }
    }

    /// Fold another outcome into this one.
    pub fn merge(&mut self, other: RefreshOutcome) {
        self.messages.extend(other.messages);
        self.add_errors(other.errors);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn is_success(&self) -> bool {
        self.status == RefreshStatus::Success
    }
}

/// Published once a refresh reaches a terminal state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshNotification {
    pub event_id: Uuid,
    pub parent_event_id: Option<Uuid>,
    pub project_id: String,
    pub group_id: String,
    pub artifact_id: String,
    pub version_id: String,
    pub outcome: RefreshOutcome,
    /// ISO 8601 timestamp
    pub timestamp: String,
}

impl RefreshNotification {
    /// Notification for `event`, timestamped to now.
    pub fn completed(event: &RefreshEvent, outcome: RefreshOutcome) -> Self {
        Self {
            event_id: event.event_id,
            parent_event_id: event.parent_event_id,
            project_id: event.project_id.clone(),
            group_id: event.group_id.clone(),
            artifact_id: event.artifact_id.clone(),
            version_id: event.version_id.clone(),
            outcome,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Drift between the artifact repository and the store for one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionMismatch {
    pub project_id: String,
    pub group_id: String,
    pub artifact_id: String,
    /// Present in the repository, missing from the store
    pub versions_not_in_cache: Vec<String>,
    /// Present in the store, missing from the repository
    pub versions_not_in_repo: Vec<String>,
}

/// Result of retiring old versions of one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetirementResult {
    pub project_id: String,
    pub group_id: String,
    pub artifact_id: String,
    pub retired_versions: Vec<String>,
    pub artifacts_removed: u64,
    pub errors: Vec<String>,
}
