//! Concurrent lineage store
//!
//! Results are routed by explicit (lineage, version) identity into an
//! append-only log. A late result can never corrupt a newer version: the
//! write lands on the version it was addressed to, or is dropped with a
//! logged anomaly when the address is unknown.

use dashmap::DashMap;

use kiln_orchestrator::JobResult;
use kiln_script::Script;

use crate::lineage::{Lineage, LineageId};
use crate::version::VersionId;

/// Errors from lineage mutations
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LineageError {
    /// The lineage id is not in the store; state is unchanged
    #[error("unknown lineage {0}")]
    UnknownLineage(LineageId),
}

/// Outcome of delivering a result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The result was attached to its version
    Applied,
    /// The identical result was already attached; state unchanged
    AlreadyApplied,
    /// No lineage with that id; result dropped, anomaly logged
    UnknownLineage,
    /// No version with that id in the lineage; result dropped, anomaly logged
    UnknownVersion,
}

/// In-memory store of all live lineages
///
/// `append_version` calls within one lineage are serialized by the caller
/// (they are user-causal); `apply_result` may arrive from background tasks
/// in any order and any interleaving.
#[derive(Debug, Default)]
pub struct LineageStore {
    lineages: DashMap<LineageId, Lineage>,
}

impl LineageStore {
    /// Create an empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new lineage with version 1
    pub fn start_lineage(&self, first_script: Script) -> (LineageId, VersionId) {
        let lineage = Lineage::start(first_script);
        let lineage_id = lineage.id();
        let version_id = lineage.latest().id;
        self.lineages.insert(lineage_id, lineage);
        tracing::info!(lineage = %lineage_id, version = %version_id, "lineage started");
        (lineage_id, version_id)
    }

    /// Append the next version, demoting the previous latest
    ///
    /// # Errors
    /// [`LineageError::UnknownLineage`]; the store is unchanged.
    pub fn append_version(
        &self,
        lineage_id: LineageId,
        script: Script,
        parent: VersionId,
    ) -> Result<VersionId, LineageError> {
        let mut lineage = self
            .lineages
            .get_mut(&lineage_id)
            .ok_or(LineageError::UnknownLineage(lineage_id))?;
        let version_id = lineage.append(script, parent);
        tracing::info!(
            lineage = %lineage_id,
            version = %version_id,
            number = lineage.latest_version_number(),
            "version appended"
        );
        Ok(version_id)
    }

    /// Deliver a result to the version it is addressed to
    ///
    /// The version is looked up by its own id — never "whichever is latest" —
    /// so results arriving after further refinements still land on the right
    /// version. Unknown addresses drop the result with a logged anomaly; an
    /// identical re-delivery is a no-op.
    pub fn apply_result(
        &self,
        lineage_id: LineageId,
        version_id: VersionId,
        result: JobResult,
    ) -> ApplyOutcome {
        let Some(mut lineage) = self.lineages.get_mut(&lineage_id) else {
            tracing::warn!(
                lineage = %lineage_id,
                version = %version_id,
                "result for unknown lineage dropped"
            );
            return ApplyOutcome::UnknownLineage;
        };
        let Some(version) = lineage.version_mut(version_id) else {
            tracing::warn!(
                lineage = %lineage_id,
                version = %version_id,
                "result for unknown version dropped"
            );
            return ApplyOutcome::UnknownVersion;
        };

        if version.attach(result) {
            tracing::debug!(lineage = %lineage_id, version = %version_id, "result applied");
            ApplyOutcome::Applied
        } else {
            tracing::debug!(lineage = %lineage_id, version = %version_id, "duplicate result ignored");
            ApplyOutcome::AlreadyApplied
        }
    }

    /// Read a lineage by id (cloned snapshot)
    #[must_use]
    pub fn lineage(&self, lineage_id: LineageId) -> Option<Lineage> {
        self.lineages.get(&lineage_id).map(|l| l.clone())
    }

    /// Drop a lineage when the user abandons or restarts the session
    pub fn remove_lineage(&self, lineage_id: LineageId) -> Option<Lineage> {
        self.lineages.remove(&lineage_id).map(|(_, lineage)| lineage)
    }

    /// Number of live lineages
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.lineages.len()
    }

    /// Whether the store is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lineages.is_empty()
    }
}
