//! Dimension-like parameter bounds

use kiln_script::SymbolTable;

use crate::{ValidatorLimits, Violation, ViolationCategory};

const LENGTH_LIKE: [&str; 3] = ["height", "width", "length"];

pub(crate) fn check(symbols: &SymbolTable, limits: &ValidatorLimits) -> Option<Violation> {
    for (name, value) in symbols.iter() {
        let lower = name.to_lowercase();
        let radius_like = lower.contains("radius");
        let length_like = LENGTH_LIKE.iter().any(|needle| lower.contains(needle));

        if !radius_like && !length_like {
            continue;
        }

        if value < 0.0 {
            return Some(
                Violation::new(
                    ViolationCategory::ParameterBounds,
                    format!("dimension parameter `{name}` is negative ({value})"),
                )
                .with_fixes(vec![format!("set `{name}` to a positive value")]),
            );
        }

        if radius_like && value > limits.max_radius_param {
            return Some(
                Violation::new(
                    ViolationCategory::ParameterBounds,
                    format!(
                        "radius parameter `{name}` = {value} exceeds the safe limit of {}",
                        limits.max_radius_param
                    ),
                )
                .with_fixes(vec![format!(
                    "reduce `{name}` to at most {}",
                    limits.max_radius_param
                )]),
            );
        }

        if length_like && value > limits.max_length_param {
            return Some(
                Violation::new(
                    ViolationCategory::ParameterBounds,
                    format!(
                        "dimension parameter `{name}` = {value} exceeds the safe limit of {}",
                        limits.max_length_param
                    ),
                )
                .with_fixes(vec![format!(
                    "reduce `{name}` to at most {}",
                    limits.max_length_param
                )]),
            );
        }
    }

    None
}
