//! Extrusion/rotation pattern detection
//!
//! Certain extrusion shapes produce non-manifold geometry the compiler
//! cannot survive: a rotation wrapping a centered extrusion, a centered
//! extrusion directly over a polygon, oversized extrusion heights, and
//! polygon literals with too many points.

use kiln_script::{eval, scan, SymbolTable};

use crate::{ValidatorLimits, Violation, ViolationCategory};

pub(crate) fn check(src: &str, symbols: &SymbolTable, limits: &ValidatorLimits) -> Option<Violation> {
    if scan::rotated_centered_extrudes(src) > 0 {
        return Some(
            Violation::new(
                ViolationCategory::ExtrudePattern,
                "rotation wraps a centered extrusion; this combination produces \
                 non-manifold geometry",
            )
            .with_fixes(vec![
                "drop center=true and translate the extrusion instead".to_string(),
            ]),
        );
    }

    if scan::centered_extrude_wraps_polygon(src) {
        return Some(
            Violation::new(
                ViolationCategory::ExtrudePattern,
                "centered extrusion directly wraps a polygon",
            )
            .with_fixes(vec![
                "extrude without centering, then translate by half the height".to_string(),
            ]),
        );
    }

    for site in scan::extrude_sites(src) {
        let Some(expr) = &site.height else { continue };
        match eval::evaluate(expr, symbols) {
            Ok(height) if height > limits.max_extrude_height => {
                return Some(
                    Violation::new(
                        ViolationCategory::ExtrudePattern,
                        format!(
                            "extrusion height {height} exceeds the safe limit of {}",
                            limits.max_extrude_height
                        ),
                    )
                    .with_fixes(vec!["split the extrusion into stacked segments".to_string()]),
                );
            }
            Ok(_) => {}
            Err(error) => {
                tracing::debug!(%expr, %error, "extrusion height not evaluable; skipping");
            }
        }
    }

    for points in scan::polygon_point_counts(src) {
        if points > limits.max_polygon_points {
            return Some(
                Violation::new(
                    ViolationCategory::ExtrudePattern,
                    format!(
                        "polygon with {points} points exceeds the safe limit of {}",
                        limits.max_polygon_points
                    ),
                )
                .with_fixes(vec!["approximate the outline with fewer points".to_string()]),
            );
        }
    }

    None
}
