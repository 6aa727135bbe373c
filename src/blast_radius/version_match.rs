//! Version comparison for `CVEPackageMatch` constraints (spec.md §4.4
//! step 1). Resolves spec.md's Open Question on version-string semantics
//! by preferring semver comparison, with a dotted-numeric fallback for
//! the non-semver version strings real packages actually ship — see
//! DESIGN.md.

use crate::models::VersionConstraint;
use semver::Version;

/// Parses `text` as semver, padding missing minor/patch components with
/// zero so `"1"` and `"1.2"` parse the way most package ecosystems mean
/// them.
fn parse_lenient(text: &str) -> Option<Version> {
    let trimmed = text.trim().trim_start_matches('v');
    if let Ok(v) = Version::parse(trimmed) {
        return Some(v);
    }
    let parts: Vec<&str> = trimmed.split('.').collect();
    if parts.is_empty() || parts.len() > 3 {
        return None;
    }
    if !parts.iter().all(|p| p.chars().all(|c| c.is_ascii_digit()) && !p.is_empty()) {
        return None;
    }
    let mut padded = parts.to_vec();
    while padded.len() < 3 {
        padded.push("0");
    }
    Version::parse(&padded.join(".")).ok()
}

/// Compares two version strings. Falls back to a component-wise
/// dotted-numeric comparison when either string is not semver-shaped,
/// and finally to a lexicographic compare so a wholly non-numeric
/// version string (e.g. a vendor build tag) never panics this policy.
fn compare(a: &str, b: &str) -> std::cmp::Ordering {
    if let (Some(va), Some(vb)) = (parse_lenient(a), parse_lenient(b)) {
        return va.cmp(&vb);
    }
    let split = |s: &str| -> Option<Vec<u64>> {
        s.trim()
            .split('.')
            .map(|p| p.parse::<u64>().ok())
            .collect::<Option<Vec<_>>>()
    };
    if let (Some(na), Some(nb)) = (split(a), split(b)) {
        return na.cmp(&nb);
    }
    a.cmp(b)
}

/// Evaluates whether an installed package version satisfies a match rule
/// (spec.md §4.4 step 1's per-constraint semantics).
pub fn satisfies(
    constraint: VersionConstraint,
    installed: &str,
    version_start: Option<&str>,
    version_end: Option<&str>,
) -> bool {
    match constraint {
        VersionConstraint::All => true,
        VersionConstraint::Exact => version_start.is_some_and(|start| compare(installed, start).is_eq()),
        VersionConstraint::LessThan => version_end.is_some_and(|end| compare(installed, end).is_lt()),
        VersionConstraint::LessThanEq => version_end.is_some_and(|end| compare(installed, end).is_le()),
        VersionConstraint::Range => match (version_start, version_end) {
            (Some(start), Some(end)) => compare(installed, start).is_ge() && compare(installed, end).is_lt(),
            _ => false,
        },
    }
}
