//! Syntactic complexity counting

use kiln_script::scan;

use crate::{ValidatorLimits, Violation, ViolationCategory};

pub(crate) fn check(src: &str, limits: &ValidatorLimits) -> Option<Violation> {
    let hulls = scan::count_hull_calls(src);
    if hulls > limits.max_hull_calls {
        return Some(
            Violation::new(
                ViolationCategory::Complexity,
                format!(
                    "{hulls} hull operations exceed the safe limit of {}",
                    limits.max_hull_calls
                ),
            )
            .with_fixes(vec![
                "merge adjacent hull groups into one".to_string(),
                "replace decorative hulls with plain unions".to_string(),
            ]),
        );
    }

    let primitives = scan::count_primitive_calls(src);
    if primitives > limits.max_primitive_calls {
        return Some(
            Violation::new(
                ViolationCategory::Complexity,
                format!(
                    "{primitives} primitives exceed the safe limit of {}",
                    limits.max_primitive_calls
                ),
            )
            .with_fixes(vec!["simplify the model to fewer primitives".to_string()]),
        );
    }

    // Scale operations are only dangerous in combination with hulls.
    let scales = scan::count_scale_calls(src);
    if hulls > 0 && scales > limits.max_scale_calls_with_hull {
        return Some(
            Violation::new(
                ViolationCategory::Complexity,
                format!(
                    "{scales} scale operations combined with hull exceed the safe limit of {}",
                    limits.max_scale_calls_with_hull
                ),
            )
            .with_fixes(vec![
                "bake scale factors into primitive dimensions".to_string()
            ]),
        );
    }

    let booleans = scan::count_boolean_calls(src);
    if booleans > limits.max_boolean_calls {
        return Some(
            Violation::new(
                ViolationCategory::Complexity,
                format!(
                    "{booleans} boolean operations exceed the safe limit of {}",
                    limits.max_boolean_calls
                ),
            )
            .with_fixes(vec!["flatten nested boolean combinations".to_string()]),
        );
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> ValidatorLimits {
        ValidatorLimits::default()
    }

    #[test]
    fn under_limits_passes() {
        let src = "hull() { sphere(r=1); sphere(r=2); }";
        assert!(check(src, &limits()).is_none());
    }

    #[test]
    fn too_many_hulls() {
        let src = "hull(); ".repeat(7);
        let violation = check(&src, &limits()).unwrap();
        assert_eq!(violation.category, ViolationCategory::Complexity);
        assert!(violation.message.contains("hull"));
    }

    #[test]
    fn too_many_primitives() {
        let src = "sphere(r=1); ".repeat(31);
        let violation = check(&src, &limits()).unwrap();
        assert!(violation.message.contains("primitives"));
    }

    #[test]
    fn scale_limit_applies_only_with_hull() {
        let scales = "scale([1,1,1]) cube(1); ".repeat(11);

        // No hull present: scale count alone is fine.
        assert!(check(&scales, &limits()).is_none());

        let with_hull = format!("hull() {{ sphere(r=1); }}\n{scales}");
        let violation = check(&with_hull, &limits()).unwrap();
        assert!(violation.message.contains("scale"));
    }

    #[test]
    fn too_many_booleans() {
        let src = "union() { cube(1); } ".repeat(11);
        let violation = check(&src, &limits()).unwrap();
        assert!(violation.message.contains("boolean"));
    }
}
