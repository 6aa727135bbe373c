//! The blast-radius report produced by the engine (spec.md §3, §4.4).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    P1,
    P2,
    P3,
    P4,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::P1 => "p1",
            Priority::P2 => "p2",
            Priority::P3 => "p3",
            Priority::P4 => "p4",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AffectedPackage {
    pub package_id: String,
    pub sbom_id: String,
    pub image_id: String,
    pub name: String,
    pub version: String,
    pub package_type: Option<String>,
    pub fixed_version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AffectedImage {
    pub image_id: String,
    pub family: String,
    pub version: String,
    pub is_direct: bool,
    pub inherited_from: Option<String>,
    pub lineage_depth: u32,
    pub child_image_ids: Vec<String>,
}

impl AffectedImage {
    /// Enforces spec.md's invariant: `is_direct ⇔ inherited_from = null ∧
    /// lineage_depth = 0`.
    pub fn is_consistent(&self) -> bool {
        if self.is_direct {
            self.inherited_from.is_none() && self.lineage_depth == 0
        } else {
            self.inherited_from.is_some() && self.lineage_depth >= 1
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AffectedAsset {
    pub asset_id: String,
    pub name: String,
    pub platform: String,
    pub region: String,
    pub environment: crate::models::Environment,
    pub is_production: bool,
    pub image_ref: String,
    pub image_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BlastRadiusReport {
    pub cve_id: String,
    pub org_id: String,
    pub affected_packages: Vec<AffectedPackage>,
    pub affected_images: Vec<AffectedImage>,
    pub affected_assets: Vec<AffectedAsset>,
    pub total_packages: u32,
    pub total_images: u32,
    pub total_assets: u32,
    pub production_assets: u32,
    pub affected_platforms: BTreeSet<String>,
    pub affected_regions: BTreeSet<String>,
    pub urgency_score: u32,
    pub priority: Priority,
    pub sla_due_at: DateTime<Utc>,
}

impl BlastRadiusReport {
    /// An all-empty report for the `calculate()` early-termination path
    /// (spec.md §4.4 step 1: "if no packages match, the report is
    /// completed with empty collections and returned").
    pub fn empty(
        cve_id: impl Into<String>,
        org_id: impl Into<String>,
        priority: Priority,
        sla_due_at: DateTime<Utc>,
    ) -> Self {
        Self {
            cve_id: cve_id.into(),
            org_id: org_id.into(),
            affected_packages: Vec::new(),
            affected_images: Vec::new(),
            affected_assets: Vec::new(),
            total_packages: 0,
            total_images: 0,
            total_assets: 0,
            production_assets: 0,
            affected_platforms: BTreeSet::new(),
            affected_regions: BTreeSet::new(),
            urgency_score: 0,
            priority,
            sla_due_at,
        }
    }

    /// ∀ reports: every affected_asset appears at most once (spec.md §8).
    pub fn assets_are_unique(&self) -> bool {
        let mut seen = std::collections::HashSet::new();
        self.affected_assets.iter().all(|a| seen.insert(&a.asset_id))
    }

    /// ∀ reports: every non-direct image's `inherited_from` resolves
    /// within the same report and has depth >= 1 (spec.md §8).
    pub fn lineage_is_consistent(&self) -> bool {
        let ids: std::collections::HashSet<&str> =
            self.affected_images.iter().map(|i| i.image_id.as_str()).collect();
        self.affected_images.iter().all(|img| {
            img.is_consistent()
                && (img.is_direct || img.inherited_from.as_deref().map_or(false, |p| ids.contains(p)))
        })
    }
}
