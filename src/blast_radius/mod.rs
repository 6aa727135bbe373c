//! The Blast-Radius Engine (C1, spec.md §4.4) — the six-step pipeline
//! from a CVE id to a persisted `BlastRadiusReport`.

mod store;
mod version_match;

pub use store::{BlastRadiusSource, BlastRadiusStore};

use crate::config::{AssetMatchPolicy, ScoringConfig};
use crate::lineage::LineageGraph;
use crate::models::{
    AffectedAsset, AffectedImage, AffectedPackage, BlastRadiusReport, Priority, SBOMPackage,
};
use crate::scoring::{self, ScoreInput};
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use tracing::warn;

/// Computes a blast-radius report for `cve_id` within `org_id`. Reads
/// through `source` and `lineage` (already built for the org); never
/// persists — call `BlastRadiusStore::store` with the result.
pub async fn calculate(
    org_id: &str,
    cve_id: &str,
    source: &dyn BlastRadiusSource,
    lineage: &LineageGraph,
    config: &ScoringConfig,
    asset_match_policy: &AssetMatchPolicy,
    now_utc: DateTime<Utc>,
) -> crate::error::CoreResult<BlastRadiusReport> {
    // Step 6's inputs are fetched up front so a missing fact still lets
    // us stamp a (zeroed) score on the empty-report early-exit path.
    let cve_fact = source.cve_fact(cve_id).await?;
    if cve_fact.is_none() {
        warn!(cve_id, "CVE fact not found; scoring with zero contribution");
    }
    let fleet_size = source.fleet_size(org_id).await.unwrap_or_else(|err| {
        warn!(org_id, error = %err, "fleet size lookup failed; treating as zero");
        0
    });

    let matches = source.package_matches(org_id, cve_id).await?;
    let packages = source.sbom_packages(org_id).await?;

    // Step 1: package match.
    let affected_packages = match_packages(&matches, &packages);
    if affected_packages.is_empty() {
        let score = score_report(cve_fact.as_ref(), 0, 0, fleet_size, config, now_utc);
        return Ok(BlastRadiusReport::empty(cve_id, org_id, score.priority, score.sla_due_at));
    }

    // Step 2: directly affected images.
    let direct_image_ids: BTreeSet<String> =
        affected_packages.iter().map(|p| p.image_id.clone()).collect();

    let mut affected_images: Vec<AffectedImage> = Vec::new();
    let mut depth_by_image: HashMap<String, u32> = HashMap::new();
    for image_id in &direct_image_ids {
        if let Some(image) = lineage.image_by_id(image_id) {
            depth_by_image.insert(image_id.clone(), 0);
            affected_images.push(AffectedImage {
                image_id: image.id.clone(),
                family: image.family.clone(),
                version: image.version.clone(),
                is_direct: true,
                inherited_from: None,
                lineage_depth: 0,
                child_image_ids: Vec::new(),
            });
        }
    }

    // Step 3: lineage propagation (BFS, per spec.md §4.3's cycle/depth guards).
    let mut queue: VecDeque<String> = direct_image_ids.iter().cloned().collect();
    let mut seen: HashSet<String> = direct_image_ids.clone();
    while let Some(parent_id) = queue.pop_front() {
        let parent_depth = *depth_by_image.get(&parent_id).unwrap_or(&0);
        let Ok(direct_children) = lineage.children_of(&parent_id) else {
            continue;
        };

        let mut child_ids = Vec::new();
        for child in direct_children {
            child_ids.push(child.id.clone());
            if seen.insert(child.id.clone()) {
                let depth = parent_depth + 1;
                depth_by_image.insert(child.id.clone(), depth);
                affected_images.push(AffectedImage {
                    image_id: child.id.clone(),
                    family: child.family.clone(),
                    version: child.version.clone(),
                    is_direct: false,
                    inherited_from: Some(parent_id.clone()),
                    lineage_depth: depth,
                    child_image_ids: Vec::new(),
                });
                queue.push_back(child.id.clone());
            }
        }
        if let Some(entry) = affected_images.iter_mut().find(|i| i.image_id == parent_id) {
            entry.child_image_ids = child_ids;
        }
    }

    // Step 4: asset attribution.
    let assets = source.assets(org_id).await?;
    let affected_image_ids: HashSet<&str> = affected_images.iter().map(|i| i.image_id.as_str()).collect();
    let mut affected_assets = Vec::new();
    let mut seen_assets = HashSet::new();
    for asset in &assets {
        let matched_image = lineage
            .match_asset_image_ref(&asset.image_ref, asset_match_policy)
            .filter(|image| affected_image_ids.contains(image.id.as_str()));
        let Some(image) = matched_image else { continue };
        if !seen_assets.insert(asset.id.clone()) {
            continue;
        }
        affected_assets.push(AffectedAsset {
            asset_id: asset.id.clone(),
            name: asset.name.clone(),
            platform: asset.platform.clone(),
            region: asset.region.clone(),
            environment: asset.environment,
            is_production: asset.is_production(),
            image_ref: asset.image_ref.clone(),
            image_id: Some(image.id.clone()),
        });
    }

    // Step 5: rollups.
    let production_assets = affected_assets.iter().filter(|a| a.is_production).count() as u32;
    let affected_platforms: BTreeSet<String> = affected_assets
        .iter()
        .map(|a| a.platform.clone())
        .filter(|p| !p.is_empty())
        .collect();
    let affected_regions: BTreeSet<String> = affected_assets
        .iter()
        .map(|a| a.region.clone())
        .filter(|r| !r.is_empty())
        .collect();

    // Step 6: scoring.
    let score = score_report(
        cve_fact.as_ref(),
        affected_assets.len() as u32,
        production_assets,
        fleet_size,
        config,
        now_utc,
    );

    Ok(BlastRadiusReport {
        cve_id: cve_id.to_string(),
        org_id: org_id.to_string(),
        total_packages: affected_packages.len() as u32,
        total_images: affected_images.len() as u32,
        total_assets: affected_assets.len() as u32,
        production_assets,
        affected_platforms,
        affected_regions,
        urgency_score: score.score,
        priority: score.priority,
        sla_due_at: score.sla_due_at,
        affected_packages,
        affected_images,
        affected_assets,
    })
}

fn match_packages(matches: &[crate::models::CVEPackageMatch], packages: &[SBOMPackage]) -> Vec<AffectedPackage> {
    let mut result = Vec::new();
    for package in packages {
        for rule in matches {
            if !package.name.eq_ignore_ascii_case(&rule.package_name) {
                continue;
            }
            if let Some(expected_type) = &rule.package_type {
                let actual = package.package_type.as_deref().unwrap_or("");
                if !actual.eq_ignore_ascii_case(expected_type) {
                    continue;
                }
            }
            if !version_match::satisfies(
                rule.version_constraint,
                &package.version,
                rule.version_start.as_deref(),
                rule.version_end.as_deref(),
            ) {
                continue;
            }
            result.push(AffectedPackage {
                package_id: package.id.clone(),
                sbom_id: package.sbom_id.clone(),
                image_id: package.image_id.clone(),
                name: package.name.clone(),
                version: package.version.clone(),
                package_type: package.package_type.clone(),
                fixed_version: rule.fixed_version.clone(),
            });
            break;
        }
    }
    result
}

fn score_report(
    cve_fact: Option<&crate::models::CVEFact>,
    affected_assets: u32,
    production_assets: u32,
    fleet_size: u32,
    config: &ScoringConfig,
    now_utc: DateTime<Utc>,
) -> scoring::ScoreResult {
    let input = match cve_fact {
        Some(fact) => ScoreInput {
            cvss: fact.cvss(),
            epss: fact.epss(),
            exploit_available: fact.exploit_available,
            cisa_kev_listed: fact.cisa_kev_listed,
            affected_assets,
            production_assets,
            fleet_size,
        },
        None => ScoreInput {
            cvss: 0.0,
            epss: 0.0,
            exploit_available: false,
            cisa_kev_listed: false,
            affected_assets,
            production_assets,
            fleet_size,
        },
    };
    scoring::score(&input, config, now_utc)
}
