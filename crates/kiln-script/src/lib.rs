//! Kiln Script - shared script primitives
//!
//! Foundation types for the generated-script pipeline:
//! - [`Script`]: immutable, content-hashed script text
//! - [`SymbolTable`]: numeric parameters extracted from top-level assignments
//! - [`eval`]: restricted arithmetic evaluation over script expressions
//! - [`scan`]: regex pre-filters over script source
//!
//! The scan layer is deliberately syntactic: it locates call sites and
//! extracts expression text, and the restricted evaluator is the source of
//! truth for any numeric comparison. Neither layer ever executes script
//! content.

#![warn(unreachable_pub)]

pub mod eval;
pub mod scan;
mod script;
mod symbols;

pub use eval::{evaluate, EvalError};
pub use script::{Script, ScriptHash, ScriptHashError};
pub use symbols::SymbolTable;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
