//! Progress reporting
//!
//! The observer is invoked at every state transition. It must tolerate being
//! called multiple times for the same job, and must not assume monotonically
//! increasing percentages: progress resets to zero at each new attempt.

use crate::state::JobState;
use crate::JobId;

/// A progress event for one job
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct JobProgress {
    /// State the job just entered
    pub state: JobState,
    /// Coarse completion estimate, 0-100; resets per attempt
    pub percent: u8,
    /// Attempt this event belongs to, 1-based
    pub attempt: u32,
    /// Optional human-readable detail (e.g. terminal error text)
    pub detail: Option<String>,
}

impl JobProgress {
    /// Event for entering a state with the default percentage estimate
    #[must_use]
    pub fn entering(state: JobState, attempt: u32) -> Self {
        Self {
            state,
            percent: default_percent(state),
            attempt,
            detail: None,
        }
    }

    /// Attach detail text
    #[inline]
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

// Coarse estimates; validation is fast, the sandbox call dominates.
fn default_percent(state: JobState) -> u8 {
    match state {
        // A new attempt starts over.
        JobState::Validating => 0,
        JobState::RequestingRegeneration => 15,
        JobState::Compiling => 40,
        JobState::Exhausted => 55,
        JobState::FallingBack => 70,
        JobState::Succeeded => 100,
    }
}

/// Receives progress events for submitted jobs
pub trait ProgressObserver: Send + Sync {
    /// Called on every state transition of `job_id`
    fn on_progress(&self, job_id: JobId, progress: &JobProgress);
}

/// Observer that discards all events
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl ProgressObserver for NullObserver {
    fn on_progress(&self, _job_id: JobId, _progress: &JobProgress) {}
}
