//! Rollout-strategy phase expansion (spec.md §4.5): turns a
//! `RolloutStrategy` and an asset count into an ordered list of phases,
//! then assigns assets to them stickily.

use crate::config::CampaignConfig;
use crate::models::{PatchCampaignAsset, PatchCampaignAssetStatus, PatchCampaignPhase, PhaseStatus, PhaseType, RolloutStrategy};
use uuid::Uuid;

/// One phase's blueprint before it is materialized with an id and asset
/// counts.
struct PhaseBlueprint {
    name: String,
    phase_type: PhaseType,
    /// Cumulative percentage of total assets this phase covers, per
    /// spec.md's "ordered wave phases covering cumulative X%" wording.
    cumulative_percentage: f64,
}

fn blueprints(strategy: RolloutStrategy, config: &CampaignConfig) -> Vec<PhaseBlueprint> {
    match strategy {
        RolloutStrategy::Immediate => vec![PhaseBlueprint {
            name: "full".to_string(),
            phase_type: PhaseType::Full,
            cumulative_percentage: 100.0,
        }],
        RolloutStrategy::Canary => vec![
            PhaseBlueprint {
                name: "canary".to_string(),
                phase_type: PhaseType::Canary,
                cumulative_percentage: config.default_canary_percentage,
            },
            PhaseBlueprint {
                name: "full".to_string(),
                phase_type: PhaseType::Full,
                cumulative_percentage: 100.0,
            },
        ],
        RolloutStrategy::Rolling => config
            .rolling_wave_percentages
            .iter()
            .enumerate()
            .map(|(i, &pct)| PhaseBlueprint {
                name: format!("wave-{}", i + 1),
                phase_type: PhaseType::Wave,
                cumulative_percentage: pct,
            })
            .collect(),
        RolloutStrategy::BlueGreen => vec![
            PhaseBlueprint {
                name: "blue".to_string(),
                phase_type: PhaseType::Wave,
                cumulative_percentage: config.blue_green_wave_percentage,
            },
            PhaseBlueprint {
                name: "green".to_string(),
                phase_type: PhaseType::Wave,
                cumulative_percentage: 100.0,
            },
        ],
    }
}

/// Per-phase asset counts for `total` assets, given cumulative
/// percentage boundaries. Uses floor rounding with a minimum of one
/// asset per non-terminal non-empty phase; the final phase always
/// absorbs the remainder so every asset is assigned exactly once.
fn phase_sizes(total: usize, cumulative_percentages: &[f64]) -> Vec<usize> {
    let mut boundaries = Vec::with_capacity(cumulative_percentages.len());
    let mut prev = 0usize;
    let last_index = cumulative_percentages.len().saturating_sub(1);
    for (i, &pct) in cumulative_percentages.iter().enumerate() {
        let mut boundary = if i == last_index {
            total
        } else {
            ((total as f64) * pct / 100.0).floor() as usize
        };
        if boundary <= prev && total > prev {
            boundary = prev + 1;
        }
        boundary = boundary.min(total);
        boundaries.push(boundary);
        prev = boundary;
    }
    let mut sizes = Vec::with_capacity(boundaries.len());
    let mut last = 0;
    for boundary in boundaries {
        sizes.push(boundary - last);
        last = boundary;
    }
    sizes
}

/// Expands `strategy` into phases and assigns `asset_ids` to them
/// sticky-first-come order, materializing `PatchCampaignPhase` and
/// `PatchCampaignAsset` rows for `campaign_id`.
pub fn expand(
    campaign_id: &str,
    strategy: RolloutStrategy,
    asset_ids: &[(String, String, String)], // (asset_id, asset_name, platform)
    config: &CampaignConfig,
) -> (Vec<PatchCampaignPhase>, Vec<PatchCampaignAsset>) {
    let plans = blueprints(strategy, config);
    let percentages: Vec<f64> = plans.iter().map(|p| p.cumulative_percentage).collect();
    let sizes = phase_sizes(asset_ids.len(), &percentages);

    let mut phases = Vec::with_capacity(plans.len());
    let mut assets = Vec::with_capacity(asset_ids.len());
    let mut cursor = 0usize;

    for (ordinal, (plan, size)) in plans.into_iter().zip(sizes).enumerate() {
        let phase_id = Uuid::new_v4().to_string();
        let slice = &asset_ids[cursor..cursor + size];
        cursor += size;

        for (asset_id, asset_name, platform) in slice {
            assets.push(PatchCampaignAsset {
                id: Uuid::new_v4().to_string(),
                campaign_id: campaign_id.to_string(),
                phase_id: phase_id.clone(),
                asset_id: asset_id.clone(),
                asset_name: asset_name.clone(),
                platform: platform.clone(),
                status: PatchCampaignAssetStatus::Pending,
                before_version: None,
                after_version: None,
                error_message: None,
                started_at: None,
                completed_at: None,
            });
        }

        phases.push(PatchCampaignPhase {
            id: phase_id,
            campaign_id: campaign_id.to_string(),
            ordinal: ordinal as u32 + 1,
            name: plan.name,
            phase_type: plan.phase_type,
            target_percentage: plan.cumulative_percentage,
            total_assets: size as u32,
            completed_assets: 0,
            failed_assets: 0,
            status: PhaseStatus::Pending,
            health_check_passed: None,
            started_at: None,
            completed_at: None,
        });
    }

    (phases, assets)
}
