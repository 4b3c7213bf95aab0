//! Scale vector expression complexity
//!
//! Operator count is a proxy for untestable parameter arithmetic: a vector
//! with many combined operators cannot be reasoned about from the symbol
//! table alone, so it is rejected even without division.

use kiln_script::{eval, scan};

use crate::{ValidatorLimits, Violation, ViolationCategory};

pub(crate) fn check(src: &str, limits: &ValidatorLimits) -> Option<Violation> {
    for site in scan::scale_sites(src) {
        let operators: usize = site
            .components
            .iter()
            .map(|component| eval::operator_count(component))
            .sum();

        if operators > limits.max_scale_operators {
            return Some(
                Violation::new(
                    ViolationCategory::ParameterExpression,
                    format!(
                        "scale vector carries {operators} arithmetic operators, more than the \
                         testable limit of {}",
                        limits.max_scale_operators
                    ),
                )
                .with_fixes(vec![
                    "precompute the expression into a named parameter".to_string(),
                ]),
            );
        }
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
    fn simple_vectors_pass() {
        assert!(check("scale([1, 2, 3]) cube(1);", &limits()).is_none());
        assert!(check("scale([a + 1, 1, b * 2]) cube(1);", &limits()).is_none());
    }

    #[test]
    fn operator_heavy_vector_flagged() {
        let violation = check("scale([a + b * c, d - 1, 1]) cube(1);", &limits()).unwrap();
        assert_eq!(violation.category, ViolationCategory::ParameterExpression);
    }

    #[test]
    fn unary_minus_does_not_count() {
        assert!(check("scale([-a, -b, -c]) cube(1);", &limits()).is_none());
    }
}
