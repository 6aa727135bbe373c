//! The persistence port for patch campaigns (spec.md §4.5, §6). The
//! orchestrator (`CampaignAggregate`) is store-agnostic; callers load an
//! aggregate through this trait, mutate it, and write it back.

use crate::error::CoreResult;
use crate::models::{PatchCampaign, PatchCampaignAsset, PatchCampaignPhase};
use async_trait::async_trait;

#[async_trait]
pub trait CampaignStore: Send + Sync {
    async fn create(
        &self,
        campaign: &PatchCampaign,
        phases: &[PatchCampaignPhase],
        assets: &[PatchCampaignAsset],
    ) -> CoreResult<()>;

    async fn get_campaign(&self, campaign_id: &str) -> CoreResult<Option<PatchCampaign>>;
    async fn update_campaign(&self, campaign: &PatchCampaign) -> CoreResult<()>;

    async fn list_phases(&self, campaign_id: &str) -> CoreResult<Vec<PatchCampaignPhase>>;
    async fn update_phase(&self, phase: &PatchCampaignPhase) -> CoreResult<()>;

    async fn list_assets(&self, campaign_id: &str) -> CoreResult<Vec<PatchCampaignAsset>>;
    async fn update_asset(&self, asset: &PatchCampaignAsset) -> CoreResult<()>;
}
