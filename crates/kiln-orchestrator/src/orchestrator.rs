//! The retry/regeneration driving loop
//!
//! One explicit state machine per job, driven by a single loop. The attempt
//! budget covers validate/compile cycles and failed regenerations alike; on
//! exhaustion a deterministic template terminates the job.

use std::sync::Arc;

use indexmap::IndexMap;

use kiln_sandbox::{CompileFailure, SandboxEngine};
use kiln_script::Script;
use kiln_validator::{Validator, Violation};

use crate::job::{Job, JobRequest, JobResult};
use crate::progress::{JobProgress, NullObserver, ProgressObserver};
use crate::regen::{diagnostic_tail, RegenerationClient, RegenerationRequest, MAX_DIAGNOSTIC_LINES};
use crate::state::{JobMachine, JobState};
use crate::templates;
use crate::JobId;

/// Orchestrator configuration
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct OrchestratorConfig {
    /// Maximum attempts per job (validate/compile cycles plus failed
    /// regenerations); at least 1
    pub max_attempts: u32,
}

impl OrchestratorConfig {
    /// Default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With attempt budget
    #[inline]
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

// The diagnostic carried from a failed cycle into the regeneration request.
struct Diagnostic {
    error_message: String,
    lines: Vec<String>,
}

impl Diagnostic {
    fn from_violation(violation: &Violation) -> Self {
        Self {
            error_message: violation.to_string(),
            lines: violation.diagnostic_lines(),
        }
    }

    fn from_compile_failure(failure: &CompileFailure) -> Self {
        Self {
            error_message: format!("compilation failed: {}", failure.kind),
            lines: diagnostic_tail(&failure.log, MAX_DIAGNOSTIC_LINES),
        }
    }
}

/// Drives a job from submission to terminal success or deterministic fallback
pub struct Orchestrator {
    validator: Validator,
    engine: SandboxEngine,
    regen: Arc<dyn RegenerationClient>,
    observer: Arc<dyn ProgressObserver>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    /// Create an orchestrator with the default validator and no observer
    #[must_use]
    pub fn new(
        engine: SandboxEngine,
        regen: Arc<dyn RegenerationClient>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            validator: Validator::new(),
            engine,
            regen,
            observer: Arc::new(NullObserver),
            config,
        }
    }

    /// With a custom validator
    #[inline]
    #[must_use]
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    /// With a progress observer
    #[inline]
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Submit a request, returning the job id and its terminal result
    pub async fn submit(&self, request: JobRequest) -> (JobId, JobResult) {
        let job = Job::from_request(request);
        let id = job.id;
        let result = self.run(job).await;
        (id, result)
    }

    /// Drive one job to a terminal result
    ///
    /// Never loops indefinitely: the attempt budget bounds every cycle, and
    /// exhaustion falls back to a template guaranteed to pass validation.
    pub async fn run(&self, job: Job) -> JobResult {
        tracing::info!(job = %job.id, script = %job.script.hash().short(), "job submitted");

        let mut machine = JobMachine::new(job.id);
        let mut current = job;
        let mut attempts_used: u32 = 0;
        let max_attempts = self.config.max_attempts.max(1);

        loop {
            attempts_used += 1;
            if current.attempt > 1 {
                machine.transition(JobState::Validating);
            }
            // Progress resets to zero at each new attempt.
            self.notify(
                current.id,
                &JobProgress::entering(JobState::Validating, current.attempt),
            );

            let diagnostic = match self.validator.validate(&current.script) {
                Some(violation) => {
                    tracing::warn!(job = %current.id, %violation, "validation rejected script");
                    Diagnostic::from_violation(&violation)
                }
                None => {
                    machine.transition(JobState::Compiling);
                    self.notify(
                        current.id,
                        &JobProgress::entering(JobState::Compiling, current.attempt),
                    );

                    match self
                        .engine
                        .compile(&current.script, current.file_type, &current.bound_parameters)
                        .await
                    {
                        Ok(artifact) => {
                            machine.transition(JobState::Succeeded);
                            self.notify(
                                current.id,
                                &JobProgress::entering(JobState::Succeeded, current.attempt),
                            );
                            tracing::info!(job = %current.id, attempt = current.attempt, "job succeeded");
                            return JobResult::Success {
                                artifact: artifact.bytes,
                                log: artifact.log,
                            };
                        }
                        Err(failure) => {
                            tracing::warn!(job = %current.id, kind = %failure.kind, "compilation failed");
                            Diagnostic::from_compile_failure(&failure)
                        }
                    }
                }
            };

            // Regeneration consumes budget until a fixed script arrives.
            let mut next_script: Option<Script> = None;
            while attempts_used < max_attempts {
                machine.transition(JobState::RequestingRegeneration);
                self.notify(
                    current.id,
                    &JobProgress::entering(JobState::RequestingRegeneration, current.attempt)
                        .with_detail(diagnostic.error_message.clone()),
                );

                // Always the original first-attempt script, never the prior
                // partially-fixed one.
                let request = RegenerationRequest {
                    original_script: current.original_script.clone(),
                    error_message: diagnostic.error_message.clone(),
                    diagnostic_lines: diagnostic.lines.clone(),
                };
                match self.regen.regenerate(request).await {
                    Ok(Some(fixed)) => {
                        next_script = Some(fixed);
                        break;
                    }
                    Ok(None) => {
                        attempts_used += 1;
                        tracing::warn!(job = %current.id, "regeneration declined; attempt consumed");
                    }
                    Err(error) => {
                        attempts_used += 1;
                        tracing::warn!(job = %current.id, %error, "regeneration unavailable; attempt consumed");
                    }
                }
            }

            match next_script {
                Some(script) => current = current.next_attempt(script),
                None => break,
            }
        }

        machine.transition(JobState::Exhausted);
        self.notify(
            current.id,
            &JobProgress::entering(JobState::Exhausted, current.attempt)
                .with_detail("attempt budget exhausted"),
        );
        tracing::info!(job = %current.id, attempts = attempts_used, "attempt budget exhausted; falling back");

        self.fallback(&mut machine, &current).await
    }

    /// Compile the deterministic template for an exhausted job
    ///
    /// The request's bound parameters are deliberately not passed through:
    /// overriding a template's own parameters could void its validity
    /// guarantee.
    async fn fallback(&self, machine: &mut JobMachine, job: &Job) -> JobResult {
        machine.transition(JobState::FallingBack);
        self.notify(
            job.id,
            &JobProgress::entering(JobState::FallingBack, job.attempt),
        );

        let template = templates::fallback_template(&job.description);
        if let Some(violation) = self.validator.validate(&template) {
            // The catalog guarantees validity; reaching this is a bug there.
            tracing::error!(job = %job.id, %violation, "fallback template failed validation");
        }

        match self
            .engine
            .compile(&template, job.file_type, &IndexMap::new())
            .await
        {
            Ok(artifact) => {
                machine.transition(JobState::Succeeded);
                self.notify(
                    job.id,
                    &JobProgress::entering(JobState::Succeeded, job.attempt),
                );
                JobResult::TemplateFallback {
                    artifact: artifact.bytes,
                }
            }
            Err(failure) => {
                tracing::error!(job = %job.id, %failure, "fallback template failed to compile");
                self.notify(
                    job.id,
                    &JobProgress::entering(JobState::Exhausted, job.attempt)
                        .with_detail(failure.to_string()),
                );
                JobResult::CompileFailed {
                    kind: failure.kind,
                    log: failure.log,
                }
            }
        }
    }

    fn notify(&self, job_id: JobId, progress: &JobProgress) {
        self.observer.on_progress(job_id, progress);
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
