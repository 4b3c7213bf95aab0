//! Kiln Orchestrator - bounded retry/regeneration of generated scripts
//!
//! Drives a job from submission to a terminal result:
//!
//! 1. validate (fail fast with structured diagnostics)
//! 2. compile in a fresh sandbox instance
//! 3. on failure, ask the regeneration collaborator for a fixed script —
//!    always from the original first-attempt script — and loop
//! 4. on exhaustion, compile a deterministic template guaranteed to pass
//!    validation
//!
//! Retry state is an explicit per-job machine ([`JobMachine`]) driven by one
//! loop, so the attempt-count invariant and the always-use-original-script
//! rule are structural rather than conventional. There is no fatal error in
//! normal operation: the template fallback terminates every job.

#![warn(unreachable_pub)]

mod job;
mod orchestrator;
mod progress;
mod regen;
mod state;
pub mod templates;

pub use job::{Job, JobId, JobRequest, JobResult};
pub use orchestrator::{Orchestrator, OrchestratorConfig};
pub use progress::{JobProgress, NullObserver, ProgressObserver};
pub use regen::{diagnostic_tail, RegenerationClient, RegenerationRequest};
pub use state::{allowed_transitions, validate_transition, IllegalTransition, JobMachine, JobState};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
