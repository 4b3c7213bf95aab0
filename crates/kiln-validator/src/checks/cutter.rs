//! Difference-operand geometry
//!
//! Centered cylinder cutters inside a boolean subtraction produce degenerate
//! geometry at extreme dimensions. Reported under `ParameterBounds`: the
//! category enum is closed and the failure is dimensional.

use kiln_script::{eval, scan, SymbolTable};

use crate::{ValidatorLimits, Violation, ViolationCategory};

pub(crate) fn check(src: &str, symbols: &SymbolTable, limits: &ValidatorLimits) -> Option<Violation> {
    for block in scan::difference_blocks(src) {
        for args in scan::cylinder_args(block) {
            if !scan::is_centered(&args) {
                continue;
            }

            let height = evaluate_arg(&args, "h", symbols);
            let diameter = evaluate_arg(&args, "d", symbols);
            let radius = evaluate_arg(&args, "r", symbols);

            for value in [height, diameter, radius].into_iter().flatten() {
                if value <= 0.0 {
                    return Some(cutter_violation(format!(
                        "centered cutter inside difference has non-positive dimension {value}"
                    )));
                }
            }

            if let Some(h) = height {
                if h > limits.max_cutter_height {
                    return Some(cutter_violation(format!(
                        "centered cutter height {h} exceeds the safe limit of {}",
                        limits.max_cutter_height
                    )));
                }
            }
            if let Some(d) = diameter {
                if d > limits.max_cutter_diameter {
                    return Some(cutter_violation(format!(
                        "centered cutter diameter {d} exceeds the safe limit of {}",
                        limits.max_cutter_diameter
                    )));
                }
            }
            if let Some(r) = radius {
                if r > limits.max_cutter_radius {
                    return Some(cutter_violation(format!(
                        "centered cutter radius {r} exceeds the safe limit of {}",
                        limits.max_cutter_radius
                    )));
                }
            }
        }
    }

    None
}

fn evaluate_arg(args: &str, name: &str, symbols: &SymbolTable) -> Option<f64> {
    let expr = scan::named_arg(args, name)?;
    match eval::evaluate(&expr, symbols) {
        Ok(value) => Some(value),
        Err(error) => {
            tracing::debug!(%expr, %error, "cutter argument not evaluable; skipping");
            None
        }
    }
}

fn cutter_violation(message: String) -> Violation {
    Violation::new(ViolationCategory::ParameterBounds, message).with_fixes(vec![
        "size the cutter to the feature being removed".to_string(),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_script::Script;

    fn run(src: &str) -> Option<Violation> {
        let script = Script::new(src);
        let symbols = SymbolTable::extract(&script);
        check(script.source(), &symbols, &ValidatorLimits::default())
    }

    #[test]
    fn reasonable_cutter_passes() {
        assert!(run("difference() { cube(20); cylinder(h=30, d=5, center=true); }").is_none());
    }

    #[test]
    fn oversized_height_flagged() {
        let violation = run("difference() { cube(20); cylinder(h=150, d=5, center=true); }").unwrap();
        assert_eq!(violation.category, ViolationCategory::ParameterBounds);
        assert!(violation.message.contains("height"));
    }

    #[test]
    fn oversized_diameter_and_radius_flagged() {
        assert!(run("difference() { cube(20); cylinder(h=10, d=250, center=true); }")
            .unwrap()
            .message
            .contains("diameter"));
        assert!(run("difference() { cube(20); cylinder(h=10, r=120, center=true); }")
            .unwrap()
            .message
            .contains("radius"));
    }

    #[test]
    fn non_positive_dimension_flagged() {
        let violation = run("difference() { cube(20); cylinder(h=0, d=5, center=true); }").unwrap();
        assert!(violation.message.contains("non-positive"));
    }

    #[test]
    fn uncentered_cutters_are_ignored() {
        assert!(run("difference() { cube(20); cylinder(h=150, d=5); }").is_none());
    }

    #[test]
    fn cutters_outside_difference_are_ignored() {
        assert!(run("cylinder(h=150, d=5, center=true);").is_none());
    }

    #[test]
    fn symbolic_dimensions_resolve() {
        let violation =
            run("bore = 150;\ndifference() { cube(20); cylinder(h=bore, d=5, center=true); }")
                .unwrap();
        assert!(violation.message.contains("height"));
    }

    #[test]
    fn unresolved_dimension_is_skipped() {
        assert!(run("difference() { cube(20); cylinder(h=missing, d=5, center=true); }").is_none());
    }
}
