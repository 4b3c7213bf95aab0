//! Sandboxed compilation orchestration
//!
//! Drives one job through staging, invocation, the watchdog and outcome
//! classification. Instance policy: a fresh runtime per job, disposed at the
//! job boundary. The runtime corrupts its internal state after an invocation
//! in some configurations, so instances are never reused.

use std::sync::Arc;

use indexmap::IndexMap;
use kiln_script::{scan, Script};

use crate::config::SandboxConfig;
use crate::error::{CompileFailure, CompileFailureKind};
use crate::handle::SandboxHandle;
use crate::libcache::LibraryCache;
use crate::runtime::{FileType, Invocation, RuntimeFault, RuntimeFactory, RuntimeOutput};

/// Explanation used when a runtime fault carries no diagnostics at all.
/// An empty stderr on a fault indicates a sandbox-level failure rather than a
/// compiler-reported error, so no specific cause is available.
const GENERIC_SANDBOX_FAULT: &str =
    "the compiler sandbox faulted without diagnostics; the script likely triggered a \
     memory-isolation fault inside the compiler runtime";

/// A successfully compiled artifact with its captured log
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledArtifact {
    /// Raw artifact bytes
    pub bytes: Vec<u8>,
    /// Merged stdout/stderr from every invocation of this job
    pub log: String,
}

/// The sandbox execution engine
///
/// Owns at most one runtime instance at a time; one compile may be in flight
/// against it. Concurrent jobs needing true parallelism require independent
/// engines, which this type does not provide.
pub struct SandboxEngine {
    config: SandboxConfig,
    factory: Arc<dyn RuntimeFactory>,
    libraries: LibraryCache,
}

impl SandboxEngine {
    /// Create an engine from its configuration and collaborators
    #[must_use]
    pub fn new(
        config: SandboxConfig,
        factory: Arc<dyn RuntimeFactory>,
        libraries: LibraryCache,
    ) -> Self {
        Self {
            config,
            factory,
            libraries,
        }
    }

    /// Engine configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// Compile a script in a fresh sandbox instance
    ///
    /// # Errors
    /// A classified [`CompileFailure`]; no raw runtime fault escapes.
    pub async fn compile(
        &self,
        script: &Script,
        file_type: FileType,
        bound_parameters: &IndexMap<String, f64>,
    ) -> Result<CompiledArtifact, CompileFailure> {
        tracing::info!(script = %script.hash().short(), "starting sandboxed compilation");

        let runtime = self
            .factory
            .create()
            .map_err(|fault| self.classify_fault(&fault))?;
        let mut handle = SandboxHandle::create(runtime, self.config.clone())
            .map_err(|e| staging_failure(&e))?;

        handle.stage_script(script).map_err(|e| staging_failure(&e))?;
        let libraries = scan::library_references(script.source());
        handle
            .stage_libraries(&self.libraries, &libraries)
            .await
            .map_err(|e| staging_failure(&e))?;

        let defines: Vec<(String, f64)> = bound_parameters
            .iter()
            .map(|(name, value)| (name.clone(), *value))
            .collect();
        let invocation = Invocation {
            input_path: handle.input_path(),
            output_path: handle.output_path(file_type, false),
            file_type,
            defines: defines.clone(),
            export_2d: false,
        };

        let (handle, output) = self.run_with_watchdog(handle, invocation).await?;
        let log = output.merged_log();

        if output.exit_code != 0 {
            tracing::warn!(exit_code = output.exit_code, "compiler exited non-zero");
            return Err(CompileFailure::new(CompileFailureKind::NonZeroExit, log));
        }

        if self.reports_non_solid(&log) {
            tracing::info!("compiler reports a non-renderable solid; retrying with 2D export");
            return self
                .compile_2d_fallback(handle, file_type, defines, log)
                .await;
        }

        match handle.read_artifact(file_type, false) {
            Some(bytes) => Ok(CompiledArtifact { bytes, log }),
            None => Err(CompileFailure::new(
                CompileFailureKind::RuntimeFault,
                merge_logs(&log, "compiler exited cleanly but produced no readable artifact"),
            )),
        }
    }

    /// One re-invocation with the alternate 2D export flag
    async fn compile_2d_fallback(
        &self,
        handle: SandboxHandle,
        file_type: FileType,
        defines: Vec<(String, f64)>,
        first_log: String,
    ) -> Result<CompiledArtifact, CompileFailure> {
        let invocation = Invocation {
            input_path: handle.input_path(),
            output_path: handle.output_path(file_type, true),
            file_type,
            defines,
            export_2d: true,
        };

        let (handle, output) = self
            .run_with_watchdog(handle, invocation)
            .await
            .map_err(|mut failure| {
                failure.log = merge_logs(&first_log, &failure.log);
                failure
            })?;
        let log = merge_logs(&first_log, &output.merged_log());

        if output.exit_code != 0 {
            return Err(CompileFailure::new(CompileFailureKind::NonZeroExit, log));
        }
        match handle.read_artifact(file_type, true) {
            Some(bytes) => Ok(CompiledArtifact { bytes, log }),
            None => Err(CompileFailure::new(
                CompileFailureKind::RuntimeFault,
                merge_logs(&log, "2D fallback export produced no readable artifact"),
            )),
        }
    }

    /// Race the blocking invocation against the wall-clock watchdog
    ///
    /// The invocation cannot be interrupted in-process. On overrun the
    /// outcome is classified as a timeout and the handle is abandoned inside
    /// the still-running blocking task; its workspace is cleaned up whenever
    /// the call finally returns. True cancellation is instance replacement,
    /// which fresh-instance-per-job already performs.
    async fn run_with_watchdog(
        &self,
        handle: SandboxHandle,
        invocation: Invocation,
    ) -> Result<(SandboxHandle, RuntimeOutput), CompileFailure> {
        let task = tokio::task::spawn_blocking(move || {
            let result = handle.invoke(&invocation);
            (handle, result)
        });

        match tokio::time::timeout(self.config.compile_timeout, task).await {
            Err(_elapsed) => {
                tracing::warn!(
                    timeout = ?self.config.compile_timeout,
                    "watchdog overrun; abandoning the invocation"
                );
                Err(CompileFailure::new(
                    CompileFailureKind::Timeout,
                    format!(
                        "compilation exceeded the {:?} watchdog and was abandoned",
                        self.config.compile_timeout
                    ),
                ))
            }
            Ok(Err(join_error)) => {
                tracing::error!(%join_error, "blocking invocation panicked");
                Err(CompileFailure::new(
                    CompileFailureKind::RuntimeFault,
                    GENERIC_SANDBOX_FAULT,
                ))
            }
            Ok(Ok((handle, Ok(output)))) => Ok((handle, output)),
            Ok(Ok((_handle, Err(fault)))) => Err(self.classify_fault(&fault)),
        }
    }

    fn classify_fault(&self, fault: &RuntimeFault) -> CompileFailure {
        let detail = match fault {
            RuntimeFault::Launch(message) | RuntimeFault::Crashed(message) => message.trim(),
        };
        let log = if detail.is_empty() {
            GENERIC_SANDBOX_FAULT.to_string()
        } else {
            detail.to_string()
        };
        CompileFailure::new(CompileFailureKind::RuntimeFault, log)
    }

    fn reports_non_solid(&self, log: &str) -> bool {
        self.config
            .non_solid_markers
            .iter()
            .any(|marker| log.contains(marker.as_str()))
    }
}

impl std::fmt::Debug for SandboxEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SandboxEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn staging_failure(error: &crate::error::SandboxError) -> CompileFailure {
    CompileFailure::new(
        CompileFailureKind::RuntimeFault,
        format!("sandbox staging failed: {error}"),
    )
}

fn merge_logs(first: &str, second: &str) -> String {
    match (first.is_empty(), second.is_empty()) {
        (true, true) => String::new(),
        (false, true) => first.to_string(),
        (true, false) => second.to_string(),
        (false, false) => format!("{first}\n{second}"),
    }
}
