//! Transitive dependency resolution.
//!
//! Computes the flattened dependency closure of each stored version and keeps
//! the closures of dependent snapshot versions consistent when an upstream
//! version's dependencies change.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{AppError, Result};
use crate::models::coordinate::{branch_snapshot_form, Coordinate, ProjectVersion};
use crate::models::project::{StoredProjectVersion, TransitiveDependenciesReport};
use crate::storage::ProjectVersionStore;

/// Upper bound on how often one dependant is recomputed during a cascade.
const CASCADE_REVISIT_LIMIT: usize = 16;

/// Look up a dependency by exact version, falling back to its branch-snapshot form.
pub async fn resolve_dependency(
    versions: &dyn ProjectVersionStore,
    dependency: &ProjectVersion,
) -> Result<Option<StoredProjectVersion>> {
    let coordinate = dependency.coordinate();
    if let Some(found) = versions.find(&coordinate, &dependency.version_id).await? {
        return Ok(Some(found));
    }
    match branch_snapshot_form(&dependency.version_id) {
        Some(fallback) if fallback != dependency.version_id => {
            versions.find(&coordinate, &fallback).await
        }
        _ => Ok(None),
    }
}

/// A stored closure is reused only when present and valid.
fn needs_resolution(record: &StoredProjectVersion) -> bool {
    !matches!(
        &record.version_data.transitive_dependencies_report,
        Some(report) if report.valid
    )
}

/// Records reachable from a version, keyed by the dependency as declared.
type Arena = HashMap<ProjectVersion, Option<StoredProjectVersion>>;

/// Closure computation over a loaded arena.
///
/// `path` holds the versions on the current resolution path; reaching one of
/// them again reuses its stored report instead of descending.
struct Resolution<'a> {
    arena: &'a Arena,
    recomputed: HashMap<ProjectVersion, TransitiveDependenciesReport>,
}

impl<'a> Resolution<'a> {
    fn new(arena: &'a Arena) -> Self {
        Self {
            arena,
            recomputed: HashMap::new(),
        }
    }

    fn closure(
        &mut self,
        node: &ProjectVersion,
        dependencies: &[ProjectVersion],
        path: &mut HashSet<ProjectVersion>,
    ) -> TransitiveDependenciesReport {
        let mut list: Vec<ProjectVersion> = Vec::new();
        let mut seen: HashSet<ProjectVersion> = HashSet::new();
        let mut valid = true;
        let arena = self.arena;

        for dependency in dependencies {
            let record = match arena.get(dependency) {
                Some(Some(record)) if !record.is_excluded() => record,
                Some(Some(_)) => {
                    debug!(node = %node, dependency = %dependency, "Dependency is excluded");
                    valid = false;
                    continue;
                }
                _ => {
                    debug!(node = %node, dependency = %dependency, "Dependency not found in store");
                    valid = false;
                    continue;
                }
            };
            let resolved = record.project_version();
            let report = self.report_for(&resolved, record, path);

            valid &= report.valid;
            for transitive in report.transitive_dependencies {
                if transitive != *node && seen.insert(transitive.clone()) {
                    list.push(transitive);
                }
            }
            if resolved != *node && seen.insert(resolved.clone()) {
                list.push(resolved);
            }
        }

        TransitiveDependenciesReport::new(list, valid)
    }

    fn report_for(
        &mut self,
        version: &ProjectVersion,
        record: &StoredProjectVersion,
        path: &mut HashSet<ProjectVersion>,
    ) -> TransitiveDependenciesReport {
        if let Some(report) = self.recomputed.get(version) {
            return report.clone();
        }
        if path.contains(version) || !needs_resolution(record) {
            return record
                .version_data
                .transitive_dependencies_report
                .clone()
                .unwrap_or_default();
        }

        path.insert(version.clone());
        let report = self.closure(version, &record.version_data.dependencies, path);
        path.remove(version);
        self.recomputed.insert(version.clone(), report.clone());
        report
    }
}

/// Computes and caches transitive dependency closures.
pub struct DependencyManager {
    versions: Arc<dyn ProjectVersionStore>,
}

impl DependencyManager {
    pub fn new(versions: Arc<dyn ProjectVersionStore>) -> Self {
        Self { versions }
    }

    /// Recompute the closure of a stored version, then cascade to its
    /// snapshot dependants.
    ///
    /// The version must already be stored; asking for one that is not is an
    /// error rather than an implicit create.
    pub async fn update_transitive_dependencies(
        &self,
        coordinate: &Coordinate,
        version_id: &str,
    ) -> Result<StoredProjectVersion> {
        let record = self
            .versions
            .find(coordinate, version_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "No version data stored for {}",
                    coordinate.at(version_id)
                ))
            })?;

        let origin = record.project_version();
        let (updated, changed) = self.recompute(record).await?.ok_or_else(|| {
            AppError::NotFound(format!("Version {} was removed during resolution", origin))
        })?;
        info!(
            version = %origin,
            dependencies = updated
                .version_data
                .transitive_dependencies_report
                .as_ref()
                .map(|r| r.transitive_dependencies.len())
                .unwrap_or(0),
            changed,
            "Updated transitive dependencies"
        );

        let cascaded = self.cascade(&origin, true).await?;
        if cascaded > 0 {
            info!(version = %origin, cascaded, "Cascaded transitive dependency updates");
        }
        Ok(updated)
    }

    /// Recompute every direct dependant of a version, released or snapshot,
    /// and cascade from those whose closure changed.
    ///
    /// Used after a version is removed so dependants stop listing it.
    pub async fn refresh_dependants(&self, version: &ProjectVersion) -> Result<usize> {
        self.cascade(version, false).await
    }

    /// Recompute one record's closure and persist it, along with any stale
    /// intermediate closures computed on the way.
    ///
    /// Only the report field is written back; dependencies and properties
    /// stored by a concurrent refresh are left as they are. Returns the
    /// persisted record and whether its closure changed, or `None` when the
    /// record was removed in the meantime.
    async fn recompute(
        &self,
        record: StoredProjectVersion,
    ) -> Result<Option<(StoredProjectVersion, bool)>> {
        let node = record.project_version();
        let arena = self.load_arena(&record).await?;

        let mut resolution = Resolution::new(&arena);
        let mut path = HashSet::from([node.clone()]);
        let report = resolution.closure(&node, &record.version_data.dependencies, &mut path);

        for (version, recomputed) in resolution.recomputed {
            if version == node {
                continue;
            }
            let Some(Some(stale)) = arena.values().find(|r| {
                r.as_ref().is_some_and(|r| r.project_version() == version)
            }) else {
                continue;
            };
            if stale.version_data.transitive_dependencies_report.as_ref() == Some(&recomputed) {
                continue;
            }
            debug!(version = %version, "Persisting recomputed intermediate closure");
            self.versions
                .set_transitive_report(&version.coordinate(), &version.version_id, recomputed)
                .await?;
        }

        let changed = record.version_data.transitive_dependencies_report.as_ref() != Some(&report);
        if !report.valid {
            warn!(version = %node, "Transitive dependency closure is incomplete");
        }
        let saved = self
            .versions
            .set_transitive_report(&node.coordinate(), &node.version_id, report)
            .await?;
        Ok(saved.map(|saved| (saved, changed)))
    }

    /// Load every record the closure computation may descend into.
    ///
    /// Versions with a valid stored closure are loaded but not expanded.
    async fn load_arena(&self, root: &StoredProjectVersion) -> Result<Arena> {
        let mut arena = Arena::new();
        arena.insert(root.project_version(), Some(root.clone()));

        let mut pending: VecDeque<ProjectVersion> =
            root.version_data.dependencies.iter().cloned().collect();
        while let Some(dependency) = pending.pop_front() {
            if arena.contains_key(&dependency) {
                continue;
            }
            let found = resolve_dependency(self.versions.as_ref(), &dependency).await?;
            if let Some(record) = &found {
                if !record.is_excluded() && needs_resolution(record) {
                    pending.extend(record.version_data.dependencies.iter().cloned());
                }
            }
            arena.insert(dependency, found);
        }
        Ok(arena)
    }

    /// Propagate a closure change to dependants through a work queue.
    ///
    /// A dependant is queued for further propagation only when its own
    /// closure changed. Returns the number of recomputations performed.
    async fn cascade(&self, origin: &ProjectVersion, snapshots_only: bool) -> Result<usize> {
        let mut queue = VecDeque::from([(origin.clone(), snapshots_only)]);
        let mut visits: HashMap<ProjectVersion, usize> = HashMap::new();
        let mut recomputed = 0;

        while let Some((changed, snapshots_only)) = queue.pop_front() {
            let dependants = self.versions.find_dependants(&changed, snapshots_only).await?;
            for dependant in dependants {
                let count = visits.entry(dependant.clone()).or_insert(0);
                *count += 1;
                if *count > CASCADE_REVISIT_LIMIT {
                    warn!(
                        dependant = %dependant,
                        origin = %origin,
                        "Cascade revisit limit reached, skipping dependant"
                    );
                    continue;
                }

                let Some(record) = self
                    .versions
                    .find(&dependant.coordinate(), &dependant.version_id)
                    .await?
                else {
                    continue;
                };

                debug!(dependant = %dependant, dependency = %changed, "Recomputing dependant closure");
                let Some((_, dependant_changed)) = self.recompute(record).await? else {
                    continue;
                };
                recomputed += 1;
                if dependant_changed {
                    queue.push_back((dependant, true));
                }
            }
        }
        Ok(recomputed)
    }
}
