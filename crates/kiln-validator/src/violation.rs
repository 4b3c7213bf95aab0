//! Violation reporting types

use std::fmt::{self, Display, Formatter};

/// Category of a safety violation
///
/// Each category maps to a class of script patterns known to fault the
/// embedded compiler at process level. A script gets at most one reported
/// violation; categories are checked in a fixed priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ViolationCategory {
    /// Too many crash-prone operations for one script
    Complexity,
    /// Smoothing-union members overlap or nearly coincide
    HullOverlap,
    /// Scale vector with division or extreme component ratios
    ScaleRatio,
    /// Scale vector arithmetic too complex to be testable
    ParameterExpression,
    /// Dimension-like parameter outside the safe range
    ParameterBounds,
    /// Extrusion/rotation combination producing non-manifold geometry
    ExtrudePattern,
}

impl Display for ViolationCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Complexity => "complexity",
            Self::HullOverlap => "hull-overlap",
            Self::ScaleRatio => "scale-ratio",
            Self::ParameterExpression => "parameter-expression",
            Self::ParameterBounds => "parameter-bounds",
            Self::ExtrudePattern => "extrude-pattern",
        };
        f.write_str(name)
    }
}

/// A single reported safety violation
///
/// The validator is fail-fast: a script has either zero violations or exactly
/// one, the first found in priority order.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Violation {
    /// Violation category
    pub category: ViolationCategory,
    /// Human-readable description of the offending pattern
    pub message: String,
    /// Concrete rewrite suggestions for the regeneration collaborator
    pub suggested_fixes: Vec<String>,
}

impl Violation {
    /// Create a violation with no suggested fixes
    #[inline]
    #[must_use]
    pub fn new(category: ViolationCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            suggested_fixes: Vec::new(),
        }
    }

    /// Attach suggested fixes
    #[inline]
    #[must_use]
    pub fn with_fixes(mut self, fixes: Vec<String>) -> Self {
        self.suggested_fixes = fixes;
        self
    }

    /// Diagnostic lines handed to the regeneration collaborator
    #[must_use]
    pub fn diagnostic_lines(&self) -> Vec<String> {
        let mut lines = vec![format!("{}: {}", self.category, self.message)];
        lines.extend(self.suggested_fixes.iter().cloned());
        lines
    }
}

impl Display for Violation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.category, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn violation_display() {
        let violation = Violation::new(ViolationCategory::ScaleRatio, "division inside scale vector");
        assert_eq!(
            violation.to_string(),
            "scale-ratio: division inside scale vector"
        );
    }

    #[test]
    fn diagnostic_lines_include_fixes() {
        let violation = Violation::new(ViolationCategory::Complexity, "too many hull calls")
            .with_fixes(vec!["merge hull groups".to_string()]);
        let lines = violation.diagnostic_lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("complexity:"));
        assert_eq!(lines[1], "merge hull groups");
    }

    #[test]
    fn violation_serde_round_trip() {
        let violation = Violation::new(ViolationCategory::ExtrudePattern, "centered extrusion under rotation");
        let json = serde_json::to_string(&violation).unwrap();
        let decoded: Violation = serde_json::from_str(&json).unwrap();
        assert_eq!(violation, decoded);
    }
}
