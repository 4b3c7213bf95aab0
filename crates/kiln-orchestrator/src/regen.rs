//! Regeneration collaborator interface
//!
//! The external service that produces "fixed" scripts. Treated as
//! unreliable: a `None` response or a transport failure counts as one
//! exhausted attempt, never a fatal error.

use kiln_script::Script;

/// A request for a fixed script
///
/// Always carries the original first-attempt script, not the immediately
/// prior (possibly already-mutated) one, so repeated partial fixes do not
/// compound drift.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RegenerationRequest {
    /// First attempt's script
    pub original_script: Script,
    /// Latest diagnostic headline
    pub error_message: String,
    /// Supporting diagnostic lines (violation fixes or compiler log tail)
    pub diagnostic_lines: Vec<String>,
}

/// External script-fixing collaborator
#[async_trait::async_trait]
pub trait RegenerationClient: Send + Sync {
    /// Ask for a fixed script
    ///
    /// `Ok(None)` means the collaborator declined; both that and an `Err`
    /// are absorbed by the orchestrator as a failed attempt.
    ///
    /// # Errors
    /// Opaque transport failures.
    async fn regenerate(&self, request: RegenerationRequest) -> anyhow::Result<Option<Script>>;
}

/// Maximum diagnostic lines handed to the collaborator
pub(crate) const MAX_DIAGNOSTIC_LINES: usize = 12;

/// Trim a compiler log to its last meaningful lines
///
/// Blank lines and progress noise are dropped so the collaborator sees the
/// actual error text rather than a render transcript.
#[must_use]
pub fn diagnostic_tail(log: &str, max_lines: usize) -> Vec<String> {
    let meaningful: Vec<&str> = log
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !is_progress_noise(line))
        .collect();

    meaningful
        .iter()
        .rev()
        .take(max_lines)
        .rev()
        .map(|line| (*line).to_string())
        .collect()
}

// Render progress lines look like dots, percentages or cache statistics.
fn is_progress_noise(line: &str) -> bool {
    line.chars().all(|c| c == '.' || c == '%' || c.is_ascii_digit() || c.is_whitespace())
        || line.starts_with("Rendering:")
        || line.starts_with("Cache:")
}
