//! Per-job sandbox handle
//!
//! One `SandboxHandle` = one fresh runtime instance + one staging workspace,
//! owned for the duration of a single job and disposed at its boundary.
//! Reusing instances across jobs is the leading cause of unexplained
//! post-first-compile faults, so the handle is never returned to a pool.

use std::collections::HashSet;
use std::path::PathBuf;

use kiln_script::Script;
use tempfile::TempDir;

use crate::config::SandboxConfig;
use crate::error::SandboxError;
use crate::libcache::LibraryCache;
use crate::runtime::{CompilerRuntime, FileType, Invocation};

/// A freshly created sandbox for exactly one job
pub struct SandboxHandle {
    workspace: TempDir,
    runtime: Box<dyn CompilerRuntime>,
    staged_libraries: HashSet<String>,
    config: SandboxConfig,
}

impl SandboxHandle {
    /// Create a handle around a never-used runtime instance
    ///
    /// # Errors
    /// [`SandboxError::Io`] when the staging workspace cannot be created.
    pub fn create(
        runtime: Box<dyn CompilerRuntime>,
        config: SandboxConfig,
    ) -> Result<Self, SandboxError> {
        let workspace = tempfile::Builder::new().prefix("kiln-sandbox-").tempdir()?;
        std::fs::create_dir_all(workspace.path().join(&config.library_dir_name))?;
        tracing::debug!(workspace = %workspace.path().display(), "sandbox workspace created");

        Ok(Self {
            workspace,
            runtime,
            staged_libraries: HashSet::new(),
            config,
        })
    }

    /// Path the script is staged under
    #[must_use]
    pub fn input_path(&self) -> PathBuf {
        self.workspace.path().join(&self.config.input_file_name)
    }

    /// Path the compiler writes its artifact to
    #[must_use]
    pub fn output_path(&self, file_type: FileType, export_2d: bool) -> PathBuf {
        let extension = if export_2d { "svg" } else { file_type.extension() };
        self.workspace
            .path()
            .join(format!("{}.{extension}", self.config.output_file_stem))
    }

    /// Write the script to the fixed input path
    ///
    /// # Errors
    /// [`SandboxError::Io`] on write failure.
    pub fn stage_script(&self, script: &Script) -> Result<(), SandboxError> {
        std::fs::write(self.input_path(), script.source())?;
        Ok(())
    }

    /// Stage each referenced library not already present in this instance
    ///
    /// Fetch failures are logged inside the cache and skipped; compilation
    /// proceeds and may fail later with a clearer compiler-level error.
    pub async fn stage_libraries(
        &mut self,
        cache: &LibraryCache,
        names: &[String],
    ) -> Result<(), SandboxError> {
        for name in names {
            if self.staged_libraries.contains(name) {
                continue;
            }
            let Some(bytes) = cache.get(name).await else {
                continue;
            };
            let path = self
                .workspace
                .path()
                .join(&self.config.library_dir_name)
                .join(name);
            std::fs::write(&path, bytes.as_slice())?;
            self.staged_libraries.insert(name.clone());
            tracing::debug!(library = %name, "library staged");
        }
        Ok(())
    }

    /// Run one blocking invocation against this handle's runtime
    ///
    /// # Errors
    /// Propagates the runtime's fault; the engine classifies it.
    pub fn invoke(
        &self,
        invocation: &Invocation,
    ) -> Result<crate::runtime::RuntimeOutput, crate::runtime::RuntimeFault> {
        self.runtime.invoke(invocation)
    }

    /// Read the artifact the compiler produced, if any
    #[must_use]
    pub fn read_artifact(&self, file_type: FileType, export_2d: bool) -> Option<Vec<u8>> {
        std::fs::read(self.output_path(file_type, export_2d)).ok()
    }

    /// Names staged into this instance so far
    #[must_use]
    pub fn staged_libraries(&self) -> &HashSet<String> {
        &self.staged_libraries
    }
}

impl std::fmt::Debug for SandboxHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SandboxHandle")
            .field("workspace", &self.workspace.path())
            .field("staged_libraries", &self.staged_libraries)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libcache::{LibraryFetcher, MockLibraryFetcher};
    use crate::runtime::MockCompilerRuntime;
    use std::sync::Arc;

    fn handle() -> SandboxHandle {
        SandboxHandle::create(Box::new(MockCompilerRuntime::new()), SandboxConfig::default())
            .unwrap()
    }

    #[test]
    fn staging_writes_the_script() {
        let handle = handle();
        let script = Script::new("sphere(r=5);");
        handle.stage_script(&script).unwrap();

        let staged = std::fs::read_to_string(handle.input_path()).unwrap();
        assert_eq!(staged, "sphere(r=5);");
    }

    #[test]
    fn output_path_tracks_format_and_fallback() {
        let handle = handle();
        assert!(handle
            .output_path(FileType::Stl, false)
            .to_string_lossy()
            .ends_with("model.stl"));
        assert!(handle
            .output_path(FileType::Stl, true)
            .to_string_lossy()
            .ends_with("model.svg"));
    }

    #[tokio::test]
    async fn libraries_stage_once_per_instance() {
        let mut mock = MockLibraryFetcher::new();
        mock.expect_fetch().times(1).returning(|_| Ok(b"module".to_vec()));
        let cache = LibraryCache::new(Arc::new(mock) as Arc<dyn LibraryFetcher>);

        let mut handle = handle();
        let names = vec!["threads.scad".to_string()];
        handle.stage_libraries(&cache, &names).await.unwrap();
        handle.stage_libraries(&cache, &names).await.unwrap();

        assert!(handle.staged_libraries().contains("threads.scad"));
        let staged = handle
            .workspace
            .path()
            .join("libraries")
            .join("threads.scad");
        assert_eq!(std::fs::read(staged).unwrap(), b"module".to_vec());
    }

    #[tokio::test]
    async fn failed_fetch_skips_staging() {
        let mut mock = MockLibraryFetcher::new();
        mock.expect_fetch()
            .returning(|name| anyhow::bail!("unknown library {name}"));
        let cache = LibraryCache::new(Arc::new(mock) as Arc<dyn LibraryFetcher>);

        let mut handle = handle();
        handle
            .stage_libraries(&cache, &["missing.scad".to_string()])
            .await
            .unwrap();
        assert!(handle.staged_libraries().is_empty());
    }

    #[test]
    fn missing_artifact_reads_as_none() {
        let handle = handle();
        assert!(handle.read_artifact(FileType::Stl, false).is_none());
    }
}
