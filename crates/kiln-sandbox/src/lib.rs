//! Kiln Sandbox - isolated execution of the fault-prone geometry compiler
//!
//! The compiler runtime is expensive to create, blocking to invoke, and
//! known to corrupt its internal state after an invocation in some
//! configurations. This crate wraps it behind a classified, recoverable
//! interface:
//!
//! - fresh runtime instance and staging workspace per job ([`SandboxHandle`])
//! - process-wide library cache populated at most once per name
//! - wall-clock watchdog around the non-preemptible invocation
//! - single 2D-export fallback when the result is not a renderable solid
//! - every fault caught and classified before it leaves the engine
//!
//! The engine holds one runtime at a time; concurrent compilation requires
//! independent engines.

#![warn(unreachable_pub)]

mod config;
mod engine;
mod error;
mod handle;
mod libcache;
mod runtime;

pub use config::SandboxConfig;
pub use engine::{CompiledArtifact, SandboxEngine};
pub use error::{CompileFailure, CompileFailureKind, SandboxError};
pub use handle::SandboxHandle;
pub use libcache::{LibraryCache, LibraryFetcher};
pub use runtime::{
    CompilerRuntime, FileType, Invocation, ProcessRuntime, ProcessRuntimeFactory, RuntimeFactory,
    RuntimeOutput, RuntimeFault,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
