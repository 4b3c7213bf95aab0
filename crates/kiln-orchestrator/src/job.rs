//! Job identity and results

use indexmap::IndexMap;
use kiln_sandbox::{CompileFailureKind, FileType};
use kiln_script::Script;
use kiln_validator::Violation;
use ulid::Ulid;

/// Unique job identifier (ULID for sortability)
///
/// All attempts of one user-visible compilation request share the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct JobId(pub Ulid);

impl JobId {
    /// Generate new job ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One user-visible compilation request
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct JobRequest {
    /// Candidate script
    pub script: Script,
    /// Requested artifact format
    pub file_type: FileType,
    /// Parameters bound as compiler defines, in stable order
    pub bound_parameters: IndexMap<String, f64>,
    /// The user's natural-language description of the design
    ///
    /// Used only for coarse keyword matching when selecting a fallback
    /// template on exhaustion.
    pub description: String,
}

impl JobRequest {
    /// Create a request with no bound parameters
    #[must_use]
    pub fn new(script: Script, file_type: FileType, description: impl Into<String>) -> Self {
        Self {
            script,
            file_type,
            bound_parameters: IndexMap::new(),
            description: description.into(),
        }
    }

    /// With bound parameters
    #[inline]
    #[must_use]
    pub fn with_parameters(mut self, parameters: IndexMap<String, f64>) -> Self {
        self.bound_parameters = parameters;
        self
    }
}

/// One attempt of a job
///
/// `original_script` is the first attempt's script, retained across retries:
/// regeneration always starts from it to avoid compounding drift across
/// repeated partial fixes.
#[derive(Debug, Clone)]
pub struct Job {
    /// Shared identity across attempts
    pub id: JobId,
    /// Script for this attempt
    pub script: Script,
    /// Requested artifact format
    pub file_type: FileType,
    /// Parameters bound as compiler defines
    pub bound_parameters: IndexMap<String, f64>,
    /// Attempt number, 1-based
    pub attempt: u32,
    /// First attempt's script
    pub original_script: Script,
    /// The user's description (for fallback selection)
    pub description: String,
}

impl Job {
    /// Create attempt 1 from a request
    #[must_use]
    pub fn from_request(request: JobRequest) -> Self {
        Self {
            id: JobId::new(),
            original_script: request.script.clone(),
            script: request.script,
            file_type: request.file_type,
            bound_parameters: request.bound_parameters,
            attempt: 1,
            description: request.description,
        }
    }

    /// Create the next attempt with a regenerated script
    ///
    /// Shares `id` and `original_script` with this attempt.
    #[must_use]
    pub fn next_attempt(&self, script: Script) -> Self {
        Self {
            id: self.id,
            script,
            file_type: self.file_type,
            bound_parameters: self.bound_parameters.clone(),
            attempt: self.attempt + 1,
            original_script: self.original_script.clone(),
            description: self.description.clone(),
        }
    }
}

/// Terminal outcome of a job
///
/// Exactly one variant per terminal attempt. `TemplateFallback` is a
/// success, not an error: the fallback path is how the system guarantees
/// termination without a fatal error.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum JobResult {
    /// Compiled artifact from the submitted (or regenerated) script
    Success {
        /// Artifact bytes
        artifact: Vec<u8>,
        /// Merged compiler log
        log: String,
    },
    /// The script was rejected by the safety validator
    ValidationFailed(Violation),
    /// The sandbox classified a compilation failure
    CompileFailed {
        /// Failure classification
        kind: CompileFailureKind,
        /// Captured compiler log
        log: String,
    },
    /// Deterministic template compiled after the attempt budget ran out
    TemplateFallback {
        /// Artifact bytes from the template
        artifact: Vec<u8>,
    },
}

impl JobResult {
    /// Whether this result delivers an artifact
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. } | Self::TemplateFallback { .. })
    }

    /// Artifact bytes, if this result carries any
    #[inline]
    #[must_use]
    pub fn artifact(&self) -> Option<&[u8]> {
        match self {
            Self::Success { artifact, .. } | Self::TemplateFallback { artifact } => {
                Some(artifact.as_slice())
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attempts_share_id_and_original_script() {
        let request = JobRequest::new(Script::new("sphere(r=1);"), FileType::Stl, "a sphere");
        let first = Job::from_request(request);
        let second = first.next_attempt(Script::new("sphere(r=2);"));

        assert_eq!(first.id, second.id);
        assert_eq!(second.attempt, 2);
        assert_eq!(second.original_script, first.script);
        assert_ne!(second.script, first.script);
    }

    #[test]
    fn result_success_classification() {
        let success = JobResult::Success {
            artifact: vec![1],
            log: String::new(),
        };
        let fallback = JobResult::TemplateFallback { artifact: vec![2] };
        let failed = JobResult::CompileFailed {
            kind: CompileFailureKind::Timeout,
            log: String::new(),
        };

        assert!(success.is_success());
        assert!(fallback.is_success());
        assert!(!failed.is_success());
        assert_eq!(success.artifact(), Some([1u8].as_slice()));
        assert_eq!(failed.artifact(), None);
    }

    #[test]
    fn job_ids_are_unique() {
        assert_ne!(JobId::new(), JobId::new());
    }
}
