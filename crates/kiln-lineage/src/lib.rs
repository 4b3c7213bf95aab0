//! Kiln Lineage - version lineage state machine
//!
//! Pure in-memory state tracking one design's history across iterative
//! refinements, mutated only through three actions:
//!
//! - [`LineageStore::start_lineage`]: create a lineage with version 1
//! - [`LineageStore::append_version`]: create version N+1, demote the
//!   previous latest
//! - [`LineageStore::apply_result`]: attach a job result to the version it
//!   is addressed to
//!
//! Compilation is asynchronous and refinements overlap, so results may
//! arrive out of order and after further versions were appended. Routing by
//! explicit version id — never "update whatever is current" — is the
//! load-bearing correctness property: a stale result cannot corrupt a newer
//! version's state, and discarding interest in a job is always safe.

#![warn(unreachable_pub)]

mod lineage;
mod store;
mod version;

pub use lineage::{Lineage, LineageId};
pub use store::{ApplyOutcome, LineageError, LineageStore};
pub use version::{Version, VersionId, VersionState};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
