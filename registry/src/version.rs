//! Semantic version parsing, comparison, and constraint evaluation.
//!
//! Plugin versions and constraints are free-form strings coming from
//! directory names, release tags, and user input. This module is the only
//! place that understands semver; everything else compares `Version`s.

use crate::error::{RegistryError, Result};
use semver::{Version, VersionReq};
use std::cmp::Ordering;

/// Strip a leading `v`/`V` that release tags and directory names commonly carry.
fn strip_v_prefix(raw: &str) -> &str {
    raw.strip_prefix('v')
        .or_else(|| raw.strip_prefix('V'))
        .unwrap_or(raw)
}

/// Parse a version string, tolerating a leading `v`.
pub fn parse_version(raw: &str) -> Result<Version> {
    Version::parse(strip_v_prefix(raw.trim())).map_err(|_| RegistryError::InvalidVersion {
        version: raw.to_string(),
    })
}

/// Whether a string parses as a semantic version.
pub fn is_valid(raw: &str) -> bool {
    parse_version(raw).is_ok()
}

/// A parsed version constraint (e.g. `>=1.2.0,<2.0.0`).
#[derive(Debug, Clone)]
pub struct Constraint(VersionReq);

/// Parse a constraint expression.
///
/// Supports the comparator syntax `semver::VersionReq` understands:
/// `>=`, `<`, `~`, `^`, and comma-separated conjunctions.
pub fn parse_constraint(expr: &str) -> Result<Constraint> {
    let trimmed = expr.trim();
    if trimmed.is_empty() {
        return Err(RegistryError::InvalidConstraint {
            constraint: expr.to_string(),
            reason: "constraint must not be empty".to_string(),
        });
    }
    VersionReq::parse(trimmed)
        .map(Constraint)
        .map_err(|e| RegistryError::InvalidConstraint {
            constraint: expr.to_string(),
            reason: e.to_string(),
        })
}

/// Whether `version` satisfies `constraint`.
pub fn satisfies(version: &str, constraint: &Constraint) -> Result<bool> {
    let v = parse_version(version)?;
    Ok(constraint.0.matches(&v))
}

/// Compare two version strings under semver precedence.
///
/// Returns `-1`, `0`, or `1` the way a C comparator would, matching the
/// operation's name in the component design.
pub fn compare(v1: &str, v2: &str) -> Result<i8> {
    let a = parse_version(v1)?;
    let b = parse_version(v2)?;
    Ok(match a.cmp(&b) {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    })
}

/// Pick the version with the highest semver precedence from a set of raw
/// strings, skipping any that fail to parse. Returns the winning raw string
/// plus the list of raw strings that were skipped (for caller-side warnings).
pub fn pick_latest<'a, I>(versions: I) -> (Option<&'a str>, Vec<&'a str>)
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best: Option<(Version, &str)> = None;
    let mut skipped = Vec::new();

    for raw in versions {
        match parse_version(raw) {
            Ok(parsed) => {
                let better = match &best {
                    Some((current_best, _)) => parsed > *current_best,
                    None => true,
                };
                if better {
                    best = Some((parsed, raw));
                }
            }
            Err(_) => skipped.push(raw),
        }
    }

    (best.map(|(_, raw)| raw), skipped)
}
