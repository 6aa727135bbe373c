//! An in-memory adapter for every store port the engine defines.
//! Grounded in the teacher package family's `LocalDataStore` pattern:
//! plain `RwLock<HashMap<_, _>>` fields, no external dependencies. Meant
//! for tests and single-process deployments (the `local` feature, on by
//! default); multi-node deployments use the `postgres` adapter instead.

use crate::blast_radius::{BlastRadiusSource, BlastRadiusStore};
use crate::campaign::CampaignStore;
use crate::error::{CoreError, CoreResult};
use crate::lineage::LineageSource;
use crate::models::{
    Asset, BlastRadiusReport, CVEFact, CVEPackageMatch, Image, ImageCoordinate, ImageLineageEdge,
    PatchCampaign, PatchCampaignAsset, PatchCampaignPhase, SBOMPackage,
};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct InMemoryStore {
    images: RwLock<Vec<Image>>,
    coordinates: RwLock<Vec<ImageCoordinate>>,
    edges: RwLock<Vec<ImageLineageEdge>>,
    cve_facts: RwLock<HashMap<String, CVEFact>>,
    package_matches: RwLock<HashMap<String, Vec<CVEPackageMatch>>>,
    sbom_packages: RwLock<HashMap<String, Vec<SBOMPackage>>>,
    assets: RwLock<HashMap<String, Vec<Asset>>>,
    fleet_sizes: RwLock<HashMap<String, u32>>,
    reports: RwLock<HashMap<String, BlastRadiusReport>>,
    campaigns: RwLock<HashMap<String, PatchCampaign>>,
    phases: RwLock<HashMap<String, Vec<PatchCampaignPhase>>>,
    campaign_assets: RwLock<HashMap<String, Vec<PatchCampaignAsset>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed_images(&self, images: Vec<Image>) {
        *self.images.write().await = images;
    }

    pub async fn seed_coordinates(&self, coordinates: Vec<ImageCoordinate>) {
        *self.coordinates.write().await = coordinates;
    }

    pub async fn seed_edges(&self, edges: Vec<ImageLineageEdge>) {
        *self.edges.write().await = edges;
    }

    pub async fn seed_cve_fact(&self, fact: CVEFact) {
        self.cve_facts.write().await.insert(fact.cve_id.clone(), fact);
    }

    pub async fn seed_package_matches(&self, cve_id: impl Into<String>, matches: Vec<CVEPackageMatch>) {
        self.package_matches.write().await.insert(cve_id.into(), matches);
    }

    pub async fn seed_sbom_packages(&self, org_id: impl Into<String>, packages: Vec<SBOMPackage>) {
        self.sbom_packages.write().await.insert(org_id.into(), packages);
    }

    pub async fn seed_assets(&self, org_id: impl Into<String>, assets: Vec<Asset>) {
        self.assets.write().await.insert(org_id.into(), assets);
    }

    pub async fn seed_fleet_size(&self, org_id: impl Into<String>, size: u32) {
        self.fleet_sizes.write().await.insert(org_id.into(), size);
    }
}

#[async_trait]
impl LineageSource for InMemoryStore {
    async fn images(&self, org_id: &str) -> CoreResult<Vec<Image>> {
        Ok(self.images.read().await.iter().filter(|i| i.org_id == org_id).cloned().collect())
    }

    async fn coordinates(&self, _org_id: &str) -> CoreResult<Vec<ImageCoordinate>> {
        Ok(self.coordinates.read().await.clone())
    }

    async fn edges(&self, _org_id: &str) -> CoreResult<Vec<ImageLineageEdge>> {
        Ok(self.edges.read().await.clone())
    }
}

#[async_trait]
impl BlastRadiusSource for InMemoryStore {
    async fn cve_fact(&self, cve_id: &str) -> CoreResult<Option<CVEFact>> {
        Ok(self.cve_facts.read().await.get(cve_id).cloned())
    }

    async fn package_matches(&self, _org_id: &str, cve_id: &str) -> CoreResult<Vec<CVEPackageMatch>> {
        Ok(self.package_matches.read().await.get(cve_id).cloned().unwrap_or_default())
    }

    async fn sbom_packages(&self, org_id: &str) -> CoreResult<Vec<SBOMPackage>> {
        Ok(self.sbom_packages.read().await.get(org_id).cloned().unwrap_or_default())
    }

    async fn assets(&self, org_id: &str) -> CoreResult<Vec<Asset>> {
        Ok(self.assets.read().await.get(org_id).cloned().unwrap_or_default())
    }

    async fn fleet_size(&self, org_id: &str) -> CoreResult<u32> {
        Ok(self.fleet_sizes.read().await.get(org_id).copied().unwrap_or(0))
    }
}

#[async_trait]
impl BlastRadiusStore for InMemoryStore {
    async fn store(&self, alert_id: &str, report: &BlastRadiusReport) -> CoreResult<()> {
        self.reports.write().await.insert(alert_id.to_string(), report.clone());
        Ok(())
    }

    async fn latest_report(&self, alert_id: &str) -> CoreResult<Option<BlastRadiusReport>> {
        Ok(self.reports.read().await.get(alert_id).cloned())
    }
}

#[async_trait]
impl CampaignStore for InMemoryStore {
    async fn create(
        &self,
        campaign: &PatchCampaign,
        phases: &[PatchCampaignPhase],
        assets: &[PatchCampaignAsset],
    ) -> CoreResult<()> {
        self.campaigns.write().await.insert(campaign.id.clone(), campaign.clone());
        self.phases.write().await.insert(campaign.id.clone(), phases.to_vec());
        self.campaign_assets.write().await.insert(campaign.id.clone(), assets.to_vec());
        Ok(())
    }

    async fn get_campaign(&self, campaign_id: &str) -> CoreResult<Option<PatchCampaign>> {
        Ok(self.campaigns.read().await.get(campaign_id).cloned())
    }

    async fn update_campaign(&self, campaign: &PatchCampaign) -> CoreResult<()> {
        let mut campaigns = self.campaigns.write().await;
        if !campaigns.contains_key(&campaign.id) {
            return Err(CoreError::NotFound(format!("campaign {} not found", campaign.id)));
        }
        campaigns.insert(campaign.id.clone(), campaign.clone());
        Ok(())
    }

    async fn list_phases(&self, campaign_id: &str) -> CoreResult<Vec<PatchCampaignPhase>> {
        Ok(self.phases.read().await.get(campaign_id).cloned().unwrap_or_default())
    }

    async fn update_phase(&self, phase: &PatchCampaignPhase) -> CoreResult<()> {
        let mut phases = self.phases.write().await;
        let list = phases
            .get_mut(&phase.campaign_id)
            .ok_or_else(|| CoreError::NotFound(format!("campaign {} not found", phase.campaign_id)))?;
        match list.iter_mut().find(|p| p.id == phase.id) {
            Some(existing) => *existing = phase.clone(),
            None => return Err(CoreError::NotFound(format!("phase {} not found", phase.id))),
        }
        Ok(())
    }

    async fn list_assets(&self, campaign_id: &str) -> CoreResult<Vec<PatchCampaignAsset>> {
        Ok(self.campaign_assets.read().await.get(campaign_id).cloned().unwrap_or_default())
    }

    async fn update_asset(&self, asset: &PatchCampaignAsset) -> CoreResult<()> {
        let mut assets = self.campaign_assets.write().await;
        let list = assets
            .get_mut(&asset.campaign_id)
            .ok_or_else(|| CoreError::NotFound(format!("campaign {} not found", asset.campaign_id)))?;
        match list.iter_mut().find(|a| a.id == asset.id) {
            Some(existing) => *existing = asset.clone(),
            None => return Err(CoreError::NotFound(format!("campaign asset {} not found", asset.id))),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CampaignStatus, CampaignType, PatchCampaignAssetStatus, PhaseStatus, PhaseType, RolloutStrategy};
    use chrono::Utc;

    fn campaign(id: &str) -> PatchCampaign {
        PatchCampaign {
            id: id.to_string(),
            org_id: "org-1".to_string(),
            name: "test".to_string(),
            description: None,
            campaign_type: CampaignType::CveResponse,
            status: CampaignStatus::Draft,
            rollout_strategy: RolloutStrategy::Immediate,
            canary_percentage: None,
            failure_threshold_percentage: None,
            health_check_enabled: true,
            auto_rollback_enabled: false,
            requires_approval: false,
            approved_by: None,
            approved_at: None,
            cve_alert_ids: None,
            total_assets: 0,
            completed_assets: 0,
            failed_assets: 0,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    #[tokio::test]
    async fn campaign_round_trips_through_the_store() {
        let store = InMemoryStore::new();
        let c = campaign("c1");
        store.create(&c, &[], &[]).await.unwrap();
        let loaded = store.get_campaign("c1").await.unwrap().unwrap();
        assert_eq!(loaded.id, "c1");

        let mut updated = loaded.clone();
        updated.status = CampaignStatus::Approved;
        store.update_campaign(&updated).await.unwrap();
        let reloaded = store.get_campaign("c1").await.unwrap().unwrap();
        assert_eq!(reloaded.status, CampaignStatus::Approved);
    }

    #[tokio::test]
    async fn updating_unknown_campaign_is_not_found() {
        let store = InMemoryStore::new();
        let err = store.update_campaign(&campaign("missing")).await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn phase_and_asset_updates_round_trip() {
        let store = InMemoryStore::new();
        let c = campaign("c1");
        let phase = PatchCampaignPhase {
            id: "p1".to_string(),
            campaign_id: "c1".to_string(),
            ordinal: 0,
            name: "full".to_string(),
            phase_type: PhaseType::Full,
            target_percentage: 100.0,
            total_assets: 1,
            completed_assets: 0,
            failed_assets: 0,
            status: PhaseStatus::Pending,
            health_check_passed: None,
            started_at: None,
            completed_at: None,
        };
        let asset = PatchCampaignAsset {
            id: "a1".to_string(),
            campaign_id: "c1".to_string(),
            phase_id: "p1".to_string(),
            asset_id: "asset-1".to_string(),
            asset_name: "host-1".to_string(),
            platform: "aws".to_string(),
            status: PatchCampaignAssetStatus::Pending,
            before_version: None,
            after_version: None,
            error_message: None,
            started_at: None,
            completed_at: None,
        };
        store.create(&c, &[phase.clone()], &[asset.clone()]).await.unwrap();

        let mut updated_asset = asset.clone();
        updated_asset.status = PatchCampaignAssetStatus::Completed;
        store.update_asset(&updated_asset).await.unwrap();

        let assets = store.list_assets("c1").await.unwrap();
        assert_eq!(assets[0].status, PatchCampaignAssetStatus::Completed);
    }
}
