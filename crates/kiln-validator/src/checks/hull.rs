//! Overlap detection between smoothing-union members
//!
//! The embedded compiler faults at process level when hull members overlap
//! or nearly coincide. Members positioned by a translate triple and sized by
//! a sphere radius are evaluated through the restricted evaluator; members
//! that do not evaluate are skipped.

use kiln_script::{eval, scan, SymbolTable};

use crate::{ValidatorLimits, Violation, ViolationCategory};

struct EvaluatedMember {
    center: [f64; 3],
    radius: f64,
}

pub(crate) fn check(src: &str, symbols: &SymbolTable, limits: &ValidatorLimits) -> Option<Violation> {
    let mut risk: Option<Violation> = None;

    for block in scan::hull_blocks(src) {
        let members: Vec<EvaluatedMember> = scan::hull_members(block)
            .iter()
            .filter_map(|member| evaluate_member(member, symbols))
            .collect();

        for (index, a) in members.iter().enumerate() {
            for b in &members[index + 1..] {
                let distance = center_distance(a.center, b.center);
                let radius_sum = a.radius + b.radius;

                if distance < limits.overlap_certain_factor * radius_sum {
                    return Some(
                        Violation::new(
                            ViolationCategory::HullOverlap,
                            format!(
                                "hull members at distance {distance:.2} overlap \
                                 (sum of radii {radius_sum:.2}); the compiler faults on \
                                 overlapping hull members"
                            ),
                        )
                        .with_fixes(vec![
                            "move the members apart so centers are farther than the sum of radii"
                                .to_string(),
                            "reduce member radii".to_string(),
                        ]),
                    );
                }

                if risk.is_none() && distance < limits.overlap_risk_factor * radius_sum {
                    risk = Some(
                        Violation::new(
                            ViolationCategory::HullOverlap,
                            format!(
                                "hull members at distance {distance:.2} are close to \
                                 overlapping (sum of radii {radius_sum:.2}); this risks a \
                                 compiler fault"
                            ),
                        )
                        .with_fixes(vec![
                            "increase spacing between hull members".to_string()
                        ]),
                    );
                }
            }
        }
    }

    risk
}

fn evaluate_member(member: &scan::HullMember, symbols: &SymbolTable) -> Option<EvaluatedMember> {
    let mut center = [0.0f64; 3];
    for (slot, expr) in center.iter_mut().zip(&member.center) {
        match eval::evaluate(expr, symbols) {
            Ok(value) => *slot = value,
            Err(error) => {
                tracing::debug!(%expr, %error, "hull member center not evaluable; skipping");
                return None;
            }
        }
    }
    match eval::evaluate(&member.radius, symbols) {
        Ok(radius) => Some(EvaluatedMember { center, radius }),
        Err(error) => {
            tracing::debug!(expr = %member.radius, %error, "hull member radius not evaluable; skipping");
            None
        }
    }
}

fn center_distance(a: [f64; 3], b: [f64; 3]) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    let dz = a[2] - b[2];
    (dx * dx + dy * dy + dz * dz).sqrt()
}
