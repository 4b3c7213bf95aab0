//! Kiln Validator - generated-script safety validation
//!
//! Pure, deterministic static analysis over untrusted generated scripts. The
//! embedded geometry compiler faults at process level on enumerable input
//! patterns; this crate rejects those patterns before a script ever reaches
//! the sandbox.
//!
//! Checks run in a fixed priority order, cheapest and most certain first,
//! and the validator returns on the first match. Numeric comparisons go
//! through the restricted evaluator in `kiln-script`; sites that cannot be
//! evaluated are skipped, never rejected — the validator must not itself
//! execute generated content.
//!
//! # Example
//!
//! ```
//! use kiln_script::Script;
//! use kiln_validator::{validate, ViolationCategory};
//!
//! let script = Script::new("radius = 10;\nheight = 40;\nscale([1, 1, height/radius]) sphere(r=radius);");
//! let violation = validate(&script).expect("division inside scale is rejected");
//! assert_eq!(violation.category, ViolationCategory::ScaleRatio);
//! ```

#![warn(unreachable_pub)]

mod checks;
mod limits;
mod violation;

pub use limits::ValidatorLimits;
pub use violation::{Violation, ViolationCategory};

use kiln_script::{Script, SymbolTable};

/// Generated-script safety validator
///
/// Stateless apart from its thresholds; cheap to construct and share.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    limits: ValidatorLimits,
}

impl Validator {
    /// Create a validator with the tuned default limits
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a validator with custom limits
    #[inline]
    #[must_use]
    pub fn with_limits(limits: ValidatorLimits) -> Self {
        Self { limits }
    }

    /// Current limits
    #[inline]
    #[must_use]
    pub fn limits(&self) -> &ValidatorLimits {
        &self.limits
    }

    /// Validate a script, returning the first violation in priority order
    ///
    /// No side effects, no I/O, deterministic. `None` means the script is
    /// safe to hand to the sandbox.
    #[must_use]
    pub fn validate(&self, script: &Script) -> Option<Violation> {
        let src = script.source();
        let symbols = SymbolTable::extract(script);

        let violation = checks::complexity::check(src, &self.limits)
            .or_else(|| checks::hull::check(src, &symbols, &self.limits))
            .or_else(|| checks::cutter::check(src, &symbols, &self.limits))
            .or_else(|| checks::scale::check(src, &symbols, &self.limits))
            .or_else(|| checks::expression::check(src, &self.limits))
            .or_else(|| checks::bounds::check(&symbols, &self.limits))
            .or_else(|| checks::extrude::check(src, &symbols, &self.limits));

        match &violation {
            Some(v) => {
                tracing::debug!(script = %script.hash().short(), category = %v.category, "script rejected");
            }
            None => {
                tracing::debug!(script = %script.hash().short(), "script passed validation");
            }
        }

        violation
    }
}

/// Validate with the default limits
#[inline]
#[must_use]
pub fn validate(script: &Script) -> Option<Violation> {
    Validator::new().validate(script)
}
