//! A single version within a lineage

use chrono::{DateTime, Utc};
use kiln_orchestrator::JobResult;
use kiln_script::Script;
use ulid::Ulid;

/// Unique version identifier
///
/// Results are routed by this id, never by "whichever version is latest".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct VersionId(pub Ulid);

impl VersionId {
    /// Generate new version ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for VersionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for VersionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Coarse compilation state of a version
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum VersionState {
    /// No result has arrived yet
    Pending,
    /// A compiled artifact is attached
    Compiled,
    /// Validation or compilation failed
    Failed,
    /// A fallback template's artifact is attached
    Fallback,
}

/// One compiled (or pending/failed) state of a design
///
/// Versions are appended, demoted and updated — never deleted and never
/// renumbered.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Version {
    /// Routing identity
    pub id: VersionId,
    /// 1-based position in the lineage; contiguous, never reused
    pub number: u32,
    /// The version this one refines, if any
    pub parent: Option<VersionId>,
    /// The script this version was submitted with
    pub script: Script,
    /// Whether this is the lineage's current latest version
    pub is_latest: bool,
    /// Creation time
    pub created_at: DateTime<Utc>,
    result: Option<JobResult>,
}

impl Version {
    pub(crate) fn new(number: u32, parent: Option<VersionId>, script: Script) -> Self {
        Self {
            id: VersionId::new(),
            number,
            parent,
            script,
            is_latest: true,
            created_at: Utc::now(),
            result: None,
        }
    }

    /// The attached result, if one has arrived
    #[inline]
    #[must_use]
    pub fn result(&self) -> Option<&JobResult> {
        self.result.as_ref()
    }

    /// Coarse state derived from the attached result
    #[must_use]
    pub fn state(&self) -> VersionState {
        match &self.result {
            None => VersionState::Pending,
            Some(JobResult::Success { .. }) => VersionState::Compiled,
            Some(JobResult::TemplateFallback { .. }) => VersionState::Fallback,
            Some(JobResult::ValidationFailed(_) | JobResult::CompileFailed { .. }) => {
                VersionState::Failed
            }
        }
    }

    /// Attach a result; returns false when it is already attached unchanged
    pub(crate) fn attach(&mut self, result: JobResult) -> bool {
        if self.result.as_ref() == Some(&result) {
            return false;
        }
        self.result = Some(result);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_version_is_pending_and_latest() {
        let version = Version::new(1, None, Script::new("sphere(r=1);"));
        assert_eq!(version.state(), VersionState::Pending);
        assert!(version.is_latest);
        assert!(version.result().is_none());
    }

    #[test]
    fn state_tracks_attached_result() {
        let mut version = Version::new(1, None, Script::new("sphere(r=1);"));

        version.attach(JobResult::Success {
            artifact: vec![1],
            log: String::new(),
        });
        assert_eq!(version.state(), VersionState::Compiled);

        version.attach(JobResult::TemplateFallback { artifact: vec![2] });
        assert_eq!(version.state(), VersionState::Fallback);
    }

    #[test]
    fn attaching_the_same_result_twice_is_a_no_op() {
        let mut version = Version::new(1, None, Script::new("sphere(r=1);"));
        let result = JobResult::Success {
            artifact: vec![1],
            log: "ok".to_string(),
        };

        assert!(version.attach(result.clone()));
        assert!(!version.attach(result));
        assert_eq!(version.state(), VersionState::Compiled);
    }
}
