//! Compiler runtime abstraction
//!
//! The embedded compiler is expensive to start and observed to corrupt its
//! internal state after an invocation in some configurations. The trait
//! models exactly what the engine relies on: a blocking, non-preemptible
//! `invoke` against a freshly created instance.

use std::path::PathBuf;
use std::process::{Command, Stdio};

use crate::config::SandboxConfig;

/// Requested artifact format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum FileType {
    /// Triangle mesh
    Stl,
    /// Object file format
    Off,
    /// Additive manufacturing format
    Amf,
}

impl FileType {
    /// Export-format flag value passed to the compiler
    #[inline]
    #[must_use]
    pub fn flag(self) -> &'static str {
        match self {
            Self::Stl => "stl",
            Self::Off => "off",
            Self::Amf => "amf",
        }
    }

    /// Output file extension
    #[inline]
    #[must_use]
    pub fn extension(self) -> &'static str {
        self.flag()
    }
}

/// One compiler invocation, fully resolved to paths and flags
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    /// Staged script path
    pub input_path: PathBuf,
    /// Expected artifact path
    pub output_path: PathBuf,
    /// Requested artifact format
    pub file_type: FileType,
    /// `-D name=value` defines, in stable order
    pub defines: Vec<(String, f64)>,
    /// Use the alternate 2D export flag (fallback re-invocation)
    pub export_2d: bool,
}

/// Captured output of a completed invocation
#[derive(Debug, Clone, Default)]
pub struct RuntimeOutput {
    /// Process exit code
    pub exit_code: i32,
    /// Captured stdout
    pub stdout: String,
    /// Captured stderr
    pub stderr: String,
}

impl RuntimeOutput {
    /// Merged stdout/stderr for diagnostics
    #[must_use]
    pub fn merged_log(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (true, true) => String::new(),
            (false, true) => self.stdout.clone(),
            (true, false) => self.stderr.clone(),
            (false, false) => format!("{}\n{}", self.stdout, self.stderr),
        }
    }
}

/// A fault thrown by the runtime itself, as opposed to a compiler-reported
/// error with a normal exit code
#[derive(Debug, Clone, thiserror::Error)]
pub enum RuntimeFault {
    /// The runtime could not be launched
    #[error("failed to launch compiler runtime: {0}")]
    Launch(String),

    /// The runtime crashed mid-invocation
    #[error("compiler runtime fault: {0}")]
    Crashed(String),
}

/// A single compiler runtime instance
///
/// `invoke` is blocking and cannot be interrupted from inside the engine;
/// the watchdog can only classify an overrun, and replacement happens at
/// instance granularity.
#[cfg_attr(test, mockall::automock)]
pub trait CompilerRuntime: Send {
    /// Run one compilation synchronously
    ///
    /// # Errors
    /// [`RuntimeFault`] when the runtime itself fails, distinct from a
    /// compiler-reported error (which is a non-zero exit in the output).
    fn invoke(&self, invocation: &Invocation) -> Result<RuntimeOutput, RuntimeFault>;
}

/// Creates fresh runtime instances, one per job
pub trait RuntimeFactory: Send + Sync {
    /// Create a new, never-used runtime instance
    ///
    /// # Errors
    /// [`RuntimeFault::Launch`] when instance creation fails.
    fn create(&self) -> Result<Box<dyn CompilerRuntime>, RuntimeFault>;
}

/// Process-backed compiler runtime
///
/// Each invocation spawns the compiler binary with a cleared environment and
/// captured output, mirroring how the embedded runtime is isolated.
#[derive(Debug, Clone)]
pub struct ProcessRuntime {
    binary: PathBuf,
}

impl ProcessRuntime {
    /// Create a runtime backed by the given compiler binary
    #[inline]
    #[must_use]
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl CompilerRuntime for ProcessRuntime {
    fn invoke(&self, invocation: &Invocation) -> Result<RuntimeOutput, RuntimeFault> {
        let mut cmd = Command::new(&self.binary);
        cmd.arg(&invocation.input_path)
            .arg("-o")
            .arg(&invocation.output_path);

        if invocation.export_2d {
            cmd.args(["--export-format", "svg"]);
        } else {
            cmd.args(["--export-format", invocation.file_type.flag()]);
        }

        for (name, value) in &invocation.defines {
            cmd.arg("-D").arg(format!("{name}={value}"));
        }

        cmd.env_clear();
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.stdin(Stdio::null());

        let output = cmd
            .output()
            .map_err(|e| RuntimeFault::Launch(format!("spawning {}: {e}", self.binary.display())))?;

        Ok(RuntimeOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

/// Factory for [`ProcessRuntime`] instances
#[derive(Debug, Clone)]
pub struct ProcessRuntimeFactory {
    config: SandboxConfig,
}

impl ProcessRuntimeFactory {
    /// Create a factory from the sandbox configuration
    #[inline]
    #[must_use]
    pub fn new(config: SandboxConfig) -> Self {
        Self { config }
    }
}

impl RuntimeFactory for ProcessRuntimeFactory {
    fn create(&self) -> Result<Box<dyn CompilerRuntime>, RuntimeFault> {
        Ok(Box::new(ProcessRuntime::new(&self.config.compiler_path)))
    }
}
