//! Scale vector analysis
//!
//! Division inside a scale vector is the single most reliable crash
//! predictor for the embedded compiler and is rejected before and regardless
//! of evaluation. Evaluable vectors are then checked for extreme ratios.

use kiln_script::{eval, scan, SymbolTable};

use crate::{ValidatorLimits, Violation, ViolationCategory};

pub(crate) fn check(src: &str, symbols: &SymbolTable, limits: &ValidatorLimits) -> Option<Violation> {
    for site in scan::scale_sites(src) {
        // Textual division test first: an unevaluable `a/b` still crashes.
        if site.components.iter().any(|c| eval::contains_division(c)) {
            return Some(
                Violation::new(
                    ViolationCategory::ScaleRatio,
                    "scale vector contains division; the compiler faults on unresolved \
                     arithmetic inside scale operators",
                )
                .with_fixes(vec![
                    "precompute the ratio into a named parameter".to_string(),
                    "replace the division with a literal factor".to_string(),
                ]),
            );
        }

        let Some(components) = evaluate_components(&site.components, symbols) else {
            continue;
        };
        if components.is_empty() {
            continue;
        }

        if let Some(&small) = components
            .iter()
            .find(|&&component| component < limits.min_scale_component)
        {
            return Some(
                Violation::new(
                    ViolationCategory::ScaleRatio,
                    format!(
                        "scale component {small} is below the safe minimum of {}",
                        limits.min_scale_component
                    ),
                )
                .with_fixes(vec!["shrink the primitive instead of scaling down".to_string()]),
            );
        }

        let max = components.iter().copied().fold(f64::MIN, f64::max);
        let min = components.iter().copied().fold(f64::MAX, f64::min);
        if max / min > limits.max_scale_ratio {
            return Some(
                Violation::new(
                    ViolationCategory::ScaleRatio,
                    format!(
                        "scale ratio {:.1}:1 exceeds the safe limit of {}:1",
                        max / min,
                        limits.max_scale_ratio
                    ),
                )
                .with_fixes(vec![
                    "use a primitive with the target proportions instead of extreme scaling"
                        .to_string(),
                ]),
            );
        }

        if let Some(radius_expr) = &site.sphere_radius {
            if let Ok(radius) = eval::evaluate(radius_expr, symbols) {
                if radius > limits.large_sphere_radius && max > limits.max_scale_for_large_sphere {
                    return Some(
                        Violation::new(
                            ViolationCategory::ScaleRatio,
                            format!(
                                "sphere of radius {radius} scaled by {max}; large spheres \
                                 tolerate at most {}",
                                limits.max_scale_for_large_sphere
                            ),
                        )
                        .with_fixes(vec!["increase the sphere radius directly".to_string()]),
                    );
                }
            }
        }
    }

    None
}

fn evaluate_components(components: &[String], symbols: &SymbolTable) -> Option<Vec<f64>> {
    components
        .iter()
        .map(|expr| match eval::evaluate(expr, symbols) {
            Ok(value) => Some(value),
            Err(error) => {
                tracing::debug!(%expr, %error, "scale component not evaluable; skipping vector");
                None
            }
        })
        .collect()
}
