//! Validator thresholds
//!
//! Every constant here is empirically tuned against the embedded compiler's
//! observed fault modes. They are configuration, not geometric truths: a
//! different compiler build wants different numbers.

/// Thresholds for the safety checks
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ValidatorLimits {
    /// Maximum smoothing-union (hull) calls per script
    pub max_hull_calls: usize,
    /// Maximum primitive calls per script
    pub max_primitive_calls: usize,
    /// Maximum scale calls when any hull is present
    pub max_scale_calls_with_hull: usize,
    /// Maximum boolean-combination calls per script
    pub max_boolean_calls: usize,

    /// Center distance below `factor × (r1 + r2)` is a certain crash
    pub overlap_certain_factor: f64,
    /// Center distance below `factor × (r1 + r2)` is a crash risk
    pub overlap_risk_factor: f64,

    /// Maximum height of a centered cutter inside a difference
    pub max_cutter_height: f64,
    /// Maximum diameter of a centered cutter inside a difference
    pub max_cutter_diameter: f64,
    /// Maximum radius of a centered cutter inside a difference
    pub max_cutter_radius: f64,

    /// Maximum ratio between largest and smallest scale component
    pub max_scale_ratio: f64,
    /// Minimum allowed scale component
    pub min_scale_component: f64,
    /// Sphere radius beyond which aggressive scaling is rejected
    pub large_sphere_radius: f64,
    /// Maximum scale component for a sphere past `large_sphere_radius`
    pub max_scale_for_large_sphere: f64,
    /// Maximum arithmetic operators inside one scale vector
    pub max_scale_operators: usize,

    /// Maximum value for radius-like named parameters
    pub max_radius_param: f64,
    /// Maximum value for height/width/length-like named parameters
    pub max_length_param: f64,

    /// Maximum extrusion height
    pub max_extrude_height: f64,
    /// Maximum points in a polygon literal
    pub max_polygon_points: usize,
}

impl ValidatorLimits {
    /// Limits tuned for the embedded compiler
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With overlap factors
    #[inline]
    #[must_use]
    pub fn with_overlap_factors(mut self, certain: f64, risk: f64) -> Self {
        self.overlap_certain_factor = certain;
        self.overlap_risk_factor = risk;
        self
    }

    /// With scale ratio ceiling
    #[inline]
    #[must_use]
    pub fn with_max_scale_ratio(mut self, ratio: f64) -> Self {
        self.max_scale_ratio = ratio;
        self
    }
}

impl Default for ValidatorLimits {
    fn default() -> Self {
        Self {
            max_hull_calls: 6,
            max_primitive_calls: 30,
            max_scale_calls_with_hull: 10,
            max_boolean_calls: 10,
            overlap_certain_factor: 1.0,
            overlap_risk_factor: 1.5,
            max_cutter_height: 100.0,
            max_cutter_diameter: 200.0,
            max_cutter_radius: 100.0,
            max_scale_ratio: 5.0,
            min_scale_component: 0.7,
            large_sphere_radius: 50.0,
            max_scale_for_large_sphere: 1.5,
            max_scale_operators: 2,
            max_radius_param: 80.0,
            max_length_param: 200.0,
            max_extrude_height: 200.0,
            max_polygon_points: 12,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_tuned_values() {
        let limits = ValidatorLimits::default();
        assert_eq!(limits.max_hull_calls, 6);
        assert_eq!(limits.max_primitive_calls, 30);
        assert!((limits.overlap_risk_factor - 1.5).abs() < f64::EPSILON);
        assert_eq!(limits.max_polygon_points, 12);
    }

    #[test]
    fn builders_override() {
        let limits = ValidatorLimits::new()
            .with_overlap_factors(1.1, 1.6)
            .with_max_scale_ratio(4.0);
        assert!((limits.overlap_certain_factor - 1.1).abs() < f64::EPSILON);
        assert!((limits.max_scale_ratio - 4.0).abs() < f64::EPSILON);
    }
}
