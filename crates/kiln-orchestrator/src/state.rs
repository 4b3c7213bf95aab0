//! Per-job finite-state machine
//!
//! Retry state is explicit, not threaded through callback chains: one
//! machine per job, driven by a single loop in the orchestrator. The
//! transition table makes the attempt-count invariant and the
//! always-use-original-script rule structurally enforced.

use crate::JobId;

/// States a job moves through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum JobState {
    /// Running the safety validator on the current script
    Validating,
    /// Compiling in a fresh sandbox instance
    Compiling,
    /// Asking the regeneration collaborator for a fixed script
    RequestingRegeneration,
    /// Attempt budget exhausted; selecting a template
    Exhausted,
    /// Compiling the deterministic fallback template
    FallingBack,
    /// Terminal: an artifact was produced
    Succeeded,
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Validating => "validating",
            Self::Compiling => "compiling",
            Self::RequestingRegeneration => "requesting-regeneration",
            Self::Exhausted => "exhausted",
            Self::FallingBack => "falling-back",
            Self::Succeeded => "succeeded",
        };
        f.write_str(name)
    }
}

/// An illegal transition; an internal anomaly, never a domain failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal job state transition: {from} -> {to}")]
pub struct IllegalTransition {
    /// State the machine was in
    pub from: JobState,
    /// State that was requested
    pub to: JobState,
}

/// States reachable from `from`
#[must_use]
pub fn allowed_transitions(from: JobState) -> Vec<JobState> {
    use JobState::{Compiling, Exhausted, FallingBack, RequestingRegeneration, Succeeded, Validating};
    match from {
        Validating => vec![Compiling, RequestingRegeneration, Exhausted],
        Compiling => vec![Succeeded, RequestingRegeneration, Exhausted],
        // A failed regeneration consumes an attempt and may be retried.
        RequestingRegeneration => vec![Validating, RequestingRegeneration, Exhausted],
        Exhausted => vec![FallingBack],
        FallingBack => vec![Succeeded],
        Succeeded => vec![],
    }
}

/// Validate a transition
///
/// # Errors
/// [`IllegalTransition`] when `to` is not reachable from `from`.
pub fn validate_transition(from: JobState, to: JobState) -> Result<(), IllegalTransition> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(IllegalTransition { from, to })
    }
}

/// The per-job machine driven by the orchestrator loop
#[derive(Debug)]
pub struct JobMachine {
    job_id: JobId,
    state: JobState,
}

impl JobMachine {
    /// Every job starts by validating
    #[inline]
    #[must_use]
    pub fn new(job_id: JobId) -> Self {
        Self {
            job_id,
            state: JobState::Validating,
        }
    }

    /// Current state
    #[inline]
    #[must_use]
    pub fn state(&self) -> JobState {
        self.state
    }

    /// Move to `to`, logging an anomaly on an illegal transition
    ///
    /// Illegal transitions indicate a programming error in the driving loop;
    /// they are logged and the state still advances so the job can reach a
    /// terminal outcome rather than wedge.
    pub fn transition(&mut self, to: JobState) {
        if let Err(anomaly) = validate_transition(self.state, to) {
            tracing::error!(job = %self.job_id, %anomaly, "state machine anomaly");
        }
        tracing::debug!(job = %self.job_id, from = %self.state, to = %to, "job state transition");
        self.state = to;
    }
}
