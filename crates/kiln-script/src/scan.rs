//! Syntactic pre-filters over script source
//!
//! Regex-driven extraction of call sites, vector literals and block contents.
//! This layer never decides numeric questions — it hands expression text to
//! the restricted evaluator, which is the source of truth for comparisons.

use once_cell::sync::Lazy;
use regex::Regex;

static HULL_CALL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bhull\s*\(").expect("static regex"));
static PRIMITIVE_CALL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:sphere|cylinder|cube)\s*\(").expect("static regex"));
static SCALE_CALL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bscale\s*\(").expect("static regex"));
static BOOLEAN_CALL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:union|difference|intersection)\s*\(").expect("static regex"));

static HULL_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bhull\s*\(\s*\)\s*\{").expect("static regex"));
static DIFFERENCE_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bdifference\s*\(\s*\)\s*\{").expect("static regex"));

static HULL_MEMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"translate\s*\(\s*\[([^\]]+)\]\s*\)\s*sphere\s*\(\s*(?:r\s*=\s*)?([^)]+)\)")
        .expect("static regex")
});

static SCALE_VECTOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bscale\s*\(\s*\[([^\]]+)\]\s*\)").expect("static regex"));
static ADJACENT_SPHERE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*sphere\s*\(\s*(?:r\s*=\s*)?([^)]+)\)").expect("static regex"));

static CYLINDER_CALL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bcylinder\s*\(([^)]*)\)").expect("static regex"));

static ROTATED_EXTRUDE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\brotate\s*\([^)]*\)\s*linear_extrude\s*\(([^)]*)\)").expect("static regex")
});
static EXTRUDE_POLYGON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\blinear_extrude\s*\(([^)]*)\)\s*polygon\b").expect("static regex")
});
static EXTRUDE_CALL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\blinear_extrude\s*\(([^)]*)\)").expect("static regex"));
static POLYGON_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bpolygon\s*\(").expect("static regex"));
static CENTER_TRUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bcenter\s*=\s*true\b").expect("static regex"));

static LIBRARY_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*(?:use|include)\s*<([^>]+)>").expect("static regex"));

/// A smoothing-union member shaped `translate([x,y,z]) sphere(r=…)`
#[derive(Debug, Clone, PartialEq)]
pub struct HullMember {
    /// Raw component expressions of the translate triple
    pub center: [String; 3],
    /// Raw radius expression
    pub radius: String,
}

/// A `scale([a,b,c])` site and its optionally adjacent sphere
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleSite {
    /// Raw component expressions of the scale triple
    pub components: Vec<String>,
    /// Raw radius expression of a directly following sphere, if any
    pub sphere_radius: Option<String>,
}

/// A `linear_extrude(…)` site
#[derive(Debug, Clone, PartialEq)]
pub struct ExtrudeSite {
    /// Raw height expression, if a `height=` argument is present
    pub height: Option<String>,
    /// Whether the extrusion carries `center=true`
    pub centered: bool,
}

/// Count smoothing-union (`hull`) calls
#[must_use]
pub fn count_hull_calls(src: &str) -> usize {
    HULL_CALL.find_iter(src).count()
}

/// Count primitive calls (sphere, cylinder, cube)
#[must_use]
pub fn count_primitive_calls(src: &str) -> usize {
    PRIMITIVE_CALL.find_iter(src).count()
}

/// Count scale calls
#[must_use]
pub fn count_scale_calls(src: &str) -> usize {
    SCALE_CALL.find_iter(src).count()
}

/// Count boolean-combination calls (union, difference, intersection)
#[must_use]
pub fn count_boolean_calls(src: &str) -> usize {
    BOOLEAN_CALL.find_iter(src).count()
}

/// Contents of each `hull() { … }` block
#[must_use]
pub fn hull_blocks(src: &str) -> Vec<&str> {
    blocks_after(src, &HULL_OPEN)
}

/// Contents of each `difference() { … }` block
#[must_use]
pub fn difference_blocks(src: &str) -> Vec<&str> {
    blocks_after(src, &DIFFERENCE_OPEN)
}

fn blocks_after<'a>(src: &'a str, open: &Regex) -> Vec<&'a str> {
    open.find_iter(src)
        .filter_map(|m| block_content(src, m.end() - 1))
        .collect()
}

// `open_brace` is the byte index of a `{`; returns the content up to its
// matching `}`, or None when the block never closes.
fn block_content(src: &str, open_brace: usize) -> Option<&str> {
    let bytes = src.as_bytes();
    debug_assert_eq!(bytes.get(open_brace), Some(&b'{'));

    let mut depth = 0usize;
    for (offset, &byte) in bytes[open_brace..].iter().enumerate() {
        match byte {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&src[open_brace + 1..open_brace + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Extract translate-positioned sphere members from a hull block
#[must_use]
pub fn hull_members(block: &str) -> Vec<HullMember> {
    HULL_MEMBER
        .captures_iter(block)
        .filter_map(|capture| {
            let components = split_components(&capture[1]);
            if components.len() != 3 {
                return None;
            }
            Some(HullMember {
                center: [
                    components[0].clone(),
                    components[1].clone(),
                    components[2].clone(),
                ],
                radius: capture[2].trim().to_string(),
            })
        })
        .collect()
}

/// All `scale([…])` sites in the source, with adjacent-sphere detection
#[must_use]
pub fn scale_sites(src: &str) -> Vec<ScaleSite> {
    SCALE_VECTOR
        .captures_iter(src)
        .filter_map(|capture| {
            let whole = capture.get(0)?;
            let sphere_radius = ADJACENT_SPHERE
                .captures(&src[whole.end()..])
                .map(|sphere| sphere[1].trim().to_string());
            Some(ScaleSite {
                components: split_components(&capture[1]),
                sphere_radius,
            })
        })
        .collect()
}

/// Raw argument text of every cylinder call in a block
#[must_use]
pub fn cylinder_args(block: &str) -> Vec<String> {
    CYLINDER_CALL
        .captures_iter(block)
        .map(|capture| capture[1].to_string())
        .collect()
}

/// Extract a named argument's raw expression from an argument list
#[must_use]
pub fn named_arg(args: &str, name: &str) -> Option<String> {
    let bytes = args.as_bytes();
    let mut search_from = 0;
    while let Some(found) = args[search_from..].find(name) {
        let start = search_from + found;
        let end = start + name.len();
        let word_start = start == 0 || !is_ident_byte(bytes[start - 1]);
        let word_end = end >= args.len() || !is_ident_byte(bytes[end]);
        if word_start && word_end {
            let rest = args[end..].trim_start();
            if let Some(value) = rest.strip_prefix('=') {
                let value = value.split(',').next().unwrap_or(value).trim();
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
        search_from = end;
    }
    None
}

fn is_ident_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

/// Whether an argument list carries `center=true`
#[must_use]
pub fn is_centered(args: &str) -> bool {
    CENTER_TRUE.is_match(args)
}

/// Count `rotate(…)` calls wrapping a centered extrusion
#[must_use]
pub fn rotated_centered_extrudes(src: &str) -> usize {
    ROTATED_EXTRUDE
        .captures_iter(src)
        .filter(|capture| is_centered(&capture[1]))
        .count()
}

/// Whether a centered extrusion directly wraps a polygon
#[must_use]
pub fn centered_extrude_wraps_polygon(src: &str) -> bool {
    EXTRUDE_POLYGON
        .captures_iter(src)
        .any(|capture| is_centered(&capture[1]))
}

/// Every `linear_extrude(…)` site in the source
#[must_use]
pub fn extrude_sites(src: &str) -> Vec<ExtrudeSite> {
    EXTRUDE_CALL
        .captures_iter(src)
        .map(|capture| ExtrudeSite {
            height: named_arg(&capture[1], "height"),
            centered: is_centered(&capture[1]),
        })
        .collect()
}

/// Point counts of each polygon literal
#[must_use]
pub fn polygon_point_counts(src: &str) -> Vec<usize> {
    POLYGON_OPEN
        .find_iter(src)
        .filter_map(|m| {
            let rest = &src[m.end()..];
            let open = rest.find('[')?;
            let mut depth = 0usize;
            let mut points = 0usize;
            for byte in rest[open..].bytes() {
                match byte {
                    b'[' => {
                        depth += 1;
                        if depth == 2 {
                            points += 1;
                        }
                    }
                    b']' => {
                        depth = depth.checked_sub(1)?;
                        if depth == 0 {
                            return Some(points);
                        }
                    }
                    _ => {}
                }
            }
            None
        })
        .collect()
}

/// Names of libraries referenced by `use <…>` / `include <…>` directives
#[must_use]
pub fn library_references(src: &str) -> Vec<String> {
    LIBRARY_REF
        .captures_iter(src)
        .map(|capture| capture[1].trim().to_string())
        .collect()
}

/// Split a vector literal's interior on top-level commas
#[must_use]
pub fn split_components(triple: &str) -> Vec<String> {
    triple
        .split(',')
        .map(|component| component.trim().to_string())
        .filter(|component| !component.is_empty())
        .collect()
}
