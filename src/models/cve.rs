//! CVE facts and SBOM package matching — read-only inputs to the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A CVE advisory as written by the upstream ingester. The core never
/// fetches or mutates these — see spec.md §1's non-goals.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CVEFact {
    pub cve_id: String,
    pub cvss_v3_score: Option<f64>,
    pub epss_score: Option<f64>,
    pub exploit_available: bool,
    pub cisa_kev_listed: bool,
    pub severity: String,
    pub description: Option<String>,
    pub published_date: Option<DateTime<Utc>>,
}

impl CVEFact {
    pub fn cvss(&self) -> f64 {
        self.cvss_v3_score.unwrap_or(0.0).clamp(0.0, 10.0)
    }

    pub fn epss(&self) -> f64 {
        self.epss_score.unwrap_or(0.0).clamp(0.0, 1.0)
    }
}

/// How a `CVEPackageMatch`'s version bounds are compared against an
/// installed package's version.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VersionConstraint {
    All,
    Exact,
    LessThan,
    LessThanEq,
    Range,
}

/// A single CVE-to-package matching rule, scoped to an organization via
/// the query that loads it (the type itself carries no org_id — it is
/// always loaded already filtered, per spec.md §4.4 step 1).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CVEPackageMatch {
    pub package_name: String,
    pub package_type: Option<String>,
    pub version_constraint: VersionConstraint,
    pub version_start: Option<String>,
    pub version_end: Option<String>,
    pub fixed_version: Option<String>,
    pub purl_pattern: Option<String>,
    pub cpe_pattern: Option<String>,
}

impl CVEPackageMatch {
    /// Validates the invariant from spec.md §3: `range` requires both
    /// bounds, `less_than`/`less_than_eq` require `version_end`, `exact`
    /// requires `version_start`.
    pub fn validate(&self) -> Result<(), String> {
        match self.version_constraint {
            VersionConstraint::Range => {
                if self.version_start.is_none() || self.version_end.is_none() {
                    return Err(format!(
                        "range constraint on {} requires version_start and version_end",
                        self.package_name
                    ));
                }
            }
            VersionConstraint::LessThan | VersionConstraint::LessThanEq => {
                if self.version_end.is_none() {
                    return Err(format!(
                        "{:?} constraint on {} requires version_end",
                        self.version_constraint, self.package_name
                    ));
                }
            }
            VersionConstraint::Exact => {
                if self.version_start.is_none() {
                    return Err(format!(
                        "exact constraint on {} requires version_start",
                        self.package_name
                    ));
                }
            }
            VersionConstraint::All => {}
        }
        Ok(())
    }
}

/// An installed package discovered in an image's SBOM.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SBOMPackage {
    pub id: String,
    pub sbom_id: String,
    pub image_id: String,
    pub name: String,
    pub version: String,
    #[serde(rename = "type")]
    pub package_type: Option<String>,
}
