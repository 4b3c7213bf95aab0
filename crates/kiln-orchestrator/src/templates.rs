//! Deterministic fallback templates
//!
//! When the attempt budget runs out, the orchestrator selects one of a small
//! fixed catalog of parameterized generators by coarse keyword match against
//! the user's description. Every generated script is valid under the safety
//! validator by construction: size hints are clamped into ranges the
//! validator accepts, and shapes are laid out clear of every geometric rule.

use once_cell::sync::Lazy;
use regex::Regex;

use kiln_script::Script;

static SIZE_HINT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*(mm|cm)?").expect("static regex"));

/// Fallback template categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum TemplateCategory {
    /// Rectangular solid
    Box,
    /// Cylindrical solid
    Cylinder,
    /// Spherical solid
    Sphere,
    /// Hollow open box
    Container,
    /// Blended organic form
    Organic,
}

impl TemplateCategory {
    /// Select a category by coarse keyword match
    ///
    /// Container keywords are checked before box keywords so "a box-shaped
    /// pen holder" gets a cavity.
    #[must_use]
    pub fn from_description(description: &str) -> Self {
        let lower = description.to_lowercase();
        let matches_any = |keywords: &[&str]| keywords.iter().any(|k| lower.contains(k));

        if matches_any(&["container", "holder", "tray", "cup", "vase", "bin", "pot"]) {
            Self::Container
        } else if matches_any(&["organic", "blob", "smooth", "rounded shape", "pebble"]) {
            Self::Organic
        } else if matches_any(&["cylinder", "tube", "rod", "puck", "disc", "disk"]) {
            Self::Cylinder
        } else if matches_any(&["sphere", "ball", "orb", "globe"]) {
            Self::Sphere
        } else {
            Self::Box
        }
    }
}

/// Size hints parsed out of the user's description
///
/// Values are clamped into validator-safe ranges before use, so a hinted
/// template is as guaranteed-valid as the defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SizeHints {
    values: Vec<f64>,
}

impl SizeHints {
    const MIN_DIMENSION: f64 = 5.0;
    const MAX_DIMENSION: f64 = 180.0;
    const MAX_RADIUS: f64 = 60.0;

    /// Parse numeric hints (with optional mm/cm units) from a description
    #[must_use]
    pub fn parse(description: &str) -> Self {
        let values = SIZE_HINT
            .captures_iter(description)
            .filter_map(|capture| {
                let value: f64 = capture[1].parse().ok()?;
                let scale = match capture.get(2).map(|m| m.as_str()) {
                    Some("cm") => 10.0,
                    _ => 1.0,
                };
                Some(value * scale)
            })
            .take(3)
            .collect();
        Self { values }
    }

    /// The n-th hinted dimension, clamped to the safe range
    #[must_use]
    pub fn dimension(&self, index: usize, default: f64) -> f64 {
        self.values
            .get(index)
            .copied()
            .unwrap_or(default)
            .clamp(Self::MIN_DIMENSION, Self::MAX_DIMENSION)
    }

    /// The first hinted value as a radius, clamped to the safe range
    #[must_use]
    pub fn radius(&self, default: f64) -> f64 {
        self.values
            .first()
            .copied()
            .unwrap_or(default)
            .clamp(Self::MIN_DIMENSION, Self::MAX_RADIUS)
    }
}

/// Generate the fallback template for a user description
///
/// Deterministic: the same description always yields the same script.
#[must_use]
pub fn fallback_template(description: &str) -> Script {
    let category = TemplateCategory::from_description(description);
    let hints = SizeHints::parse(description);
    tracing::info!(?category, "selected fallback template");
    generate(category, &hints)
}

/// Instantiate a template generator with size hints
#[must_use]
pub fn generate(category: TemplateCategory, hints: &SizeHints) -> Script {
    let source = match category {
        TemplateCategory::Box => {
            let width = hints.dimension(0, 30.0);
            let depth = hints.dimension(1, width);
            let height = hints.dimension(2, width);
            format!(
                "width = {width};\ndepth = {depth};\nheight = {height};\n\
                 cube([width, depth, height]);\n"
            )
        }
        TemplateCategory::Cylinder => {
            let radius = hints.radius(15.0);
            let height = hints.dimension(1, 40.0);
            format!(
                "radius = {radius};\nheight = {height};\n\
                 cylinder(h=height, r=radius);\n"
            )
        }
        TemplateCategory::Sphere => {
            let radius = hints.radius(20.0);
            format!("radius = {radius};\nsphere(r=radius);\n")
        }
        TemplateCategory::Container => {
            let width = hints.dimension(0, 60.0);
            let depth = hints.dimension(1, width);
            let height = hints.dimension(2, 40.0);
            format!(
                "wall = 2;\nwidth = {width};\ndepth = {depth};\nheight = {height};\n\
                 difference() {{\n\
                 \x20 cube([width, depth, height]);\n\
                 \x20 translate([wall, wall, wall]) cube([width - 2*wall, depth - 2*wall, height]);\n\
                 }}\n"
            )
        }
        TemplateCategory::Organic => {
            // Spacing of 4r keeps the members clear of the 1.5x(r1+r2)
            // overlap-risk band.
            let radius = hints.radius(12.0);
            let spacing = 4.0 * radius;
            format!(
                "radius = {radius};\nspacing = {spacing};\n\
                 hull() {{\n\
                 \x20 translate([0, 0, 0]) sphere(r=radius);\n\
                 \x20 translate([spacing, 0, 0]) sphere(r=radius);\n\
                 }}\n"
            )
        }
    };
    Script::new(source)
}
