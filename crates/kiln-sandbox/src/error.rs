//! Sandbox error taxonomy
//!
//! Every compile-layer fault is caught and classified before it leaves the
//! engine; a raw runtime fault never crosses the boundary uncaught.

/// Classified reason a compilation attempt failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum CompileFailureKind {
    /// Compiler exited with a non-zero code
    NonZeroExit,
    /// The runtime itself faulted (crash, panic, launch failure)
    RuntimeFault,
    /// The watchdog classified the invocation as overrun
    Timeout,
}

impl std::fmt::Display for CompileFailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::NonZeroExit => "non-zero exit",
            Self::RuntimeFault => "runtime fault",
            Self::Timeout => "timeout",
        };
        f.write_str(name)
    }
}

/// A classified, recoverable compilation failure
#[derive(Debug, Clone, PartialEq, thiserror::Error, serde::Serialize, serde::Deserialize)]
#[error("compilation failed ({kind}): {log}")]
pub struct CompileFailure {
    /// Failure classification
    pub kind: CompileFailureKind,
    /// Captured stdout/stderr, merged across fallback invocations
    pub log: String,
}

impl CompileFailure {
    /// Create a classified failure
    #[inline]
    #[must_use]
    pub fn new(kind: CompileFailureKind, log: impl Into<String>) -> Self {
        Self {
            kind,
            log: log.into(),
        }
    }
}

/// Internal sandbox errors (staging and workspace management)
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    /// Workspace or staging I/O failed
    #[error("sandbox I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_display_includes_kind_and_log() {
        let failure = CompileFailure::new(CompileFailureKind::Timeout, "no output after 30s");
        let rendered = failure.to_string();
        assert!(rendered.contains("timeout"));
        assert!(rendered.contains("no output after 30s"));
    }

    #[test]
    fn kind_serde_round_trip() {
        let json = serde_json::to_string(&CompileFailureKind::RuntimeFault).unwrap();
        let decoded: CompileFailureKind = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, CompileFailureKind::RuntimeFault);
    }
}
