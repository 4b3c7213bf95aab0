//! Symbol table extraction from top-level parameter assignments

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::Script;

// Matches `name = 12.5;` at the start of a line. Only plain numeric literals
// populate the table; assignments to expressions are not symbols.
static ASSIGNMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*([A-Za-z_][A-Za-z0-9_]*)\s*=\s*(-?\d+(?:\.\d+)?)\s*;").expect("static regex")
});

/// Mapping from parameter name to numeric literal
///
/// Extracted from top-level `name = literal;` assignments in a [`Script`] and
/// used only by the restricted expression evaluator. Declaration order is
/// preserved; a re-assignment overwrites the earlier value in place, matching
/// last-write-wins semantics of the script dialect.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SymbolTable {
    entries: IndexMap<String, f64>,
}

impl SymbolTable {
    /// Build the table by scanning a script's top-level assignments
    #[must_use]
    pub fn extract(script: &Script) -> Self {
        let mut entries = IndexMap::new();
        for capture in ASSIGNMENT.captures_iter(script.source()) {
            let name = capture[1].to_string();
            // The regex only admits well-formed numeric literals.
            if let Ok(value) = capture[2].parse::<f64>() {
                entries.insert(name, value);
            }
        }
        Self { entries }
    }

    /// Create an empty table
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Look up a parameter value by name
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries.get(name).copied()
    }

    /// Iterate entries in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Number of entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, f64)> for SymbolTable {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_numeric_assignments() {
        let script = Script::new("radius = 10;\nheight = 40.5;\nsphere(r=radius);");
        let table = SymbolTable::extract(&script);

        assert_eq!(table.get("radius"), Some(10.0));
        assert_eq!(table.get("height"), Some(40.5));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn ignores_expression_assignments() {
        let script = Script::new("a = 10;\nb = a * 2;\nc = foo();");
        let table = SymbolTable::extract(&script);

        assert_eq!(table.get("a"), Some(10.0));
        assert_eq!(table.get("b"), None);
        assert_eq!(table.get("c"), None);
    }

    #[test]
    fn negative_literals_are_captured() {
        let script = Script::new("offset = -3.5;");
        let table = SymbolTable::extract(&script);
        assert_eq!(table.get("offset"), Some(-3.5));
    }

    #[test]
    fn reassignment_takes_last_value() {
        let script = Script::new("r = 5;\nr = 8;");
        let table = SymbolTable::extract(&script);
        assert_eq!(table.get("r"), Some(8.0));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn preserves_declaration_order() {
        let script = Script::new("width = 1;\nheight = 2;\ndepth = 3;");
        let table = SymbolTable::extract(&script);
        let names: Vec<&str> = table.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["width", "height", "depth"]);
    }

    #[test]
    fn empty_script_yields_empty_table() {
        let table = SymbolTable::extract(&Script::new(""));
        assert!(table.is_empty());
    }
}
