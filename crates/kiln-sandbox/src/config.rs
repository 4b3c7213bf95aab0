//! Sandbox configuration

use std::path::PathBuf;
use std::time::Duration;

/// Sandbox engine configuration
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SandboxConfig {
    /// Path to the compiler binary (process-backed runtime only)
    pub compiler_path: PathBuf,
    /// Wall-clock watchdog for one compiler invocation
    pub compile_timeout: Duration,
    /// File name the script is staged under inside the workspace
    pub input_file_name: String,
    /// File stem of the compiler's output artifact
    pub output_file_stem: String,
    /// Directory name libraries are unpacked into
    pub library_dir_name: String,
    /// Log markers the compiler emits for a non-renderable solid
    ///
    /// A successful exit whose log carries one of these triggers the single
    /// 2D-export fallback re-invocation.
    pub non_solid_markers: Vec<String>,
}

impl SandboxConfig {
    /// Default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With compiler binary path
    #[inline]
    #[must_use]
    pub fn with_compiler_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.compiler_path = path.into();
        self
    }

    /// With watchdog timeout
    #[inline]
    #[must_use]
    pub fn with_compile_timeout(mut self, timeout: Duration) -> Self {
        self.compile_timeout = timeout;
        self
    }
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            compiler_path: PathBuf::from("geomc"),
            compile_timeout: Duration::from_secs(30),
            input_file_name: "model.scad".to_string(),
            output_file_stem: "model".to_string(),
            library_dir_name: "libraries".to_string(),
            non_solid_markers: vec![
                "not a renderable solid".to_string(),
                "not a valid 2-manifold".to_string(),
                "top level object is not a 3D object".to_string(),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_watchdog_is_thirty_seconds() {
        assert_eq!(SandboxConfig::default().compile_timeout, Duration::from_secs(30));
    }

    #[test]
    fn builders_override() {
        let config = SandboxConfig::new()
            .with_compiler_path("/opt/geomc/bin/geomc")
            .with_compile_timeout(Duration::from_secs(5));
        assert_eq!(config.compiler_path, PathBuf::from("/opt/geomc/bin/geomc"));
        assert_eq!(config.compile_timeout, Duration::from_secs(5));
    }
}
