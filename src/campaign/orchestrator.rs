//! The in-memory campaign aggregate and its state machine (spec.md
//! §4.5). The orchestrator owns no persistence of its own — callers load
//! an aggregate through `CampaignStore`, call its methods, and persist
//! whatever changed.

use super::rollout;
use super::state_machine::{is_idempotent_noop, validate_campaign_transition};
use crate::config::CampaignConfig;
use crate::error::{CoreError, CoreResult};
use crate::models::{
    CampaignStatus, CampaignType, PatchCampaign, PatchCampaignAsset, PatchCampaignAssetStatus,
    PatchCampaignPhase, PhaseStatus, RolloutStrategy,
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Scope of a rollback request (spec.md §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollbackScope<'a> {
    All,
    Phase(&'a str),
}

/// A campaign together with its phases and assets, the unit the
/// orchestrator operates on.
#[derive(Debug, Clone)]
pub struct CampaignAggregate {
    pub campaign: PatchCampaign,
    pub phases: Vec<PatchCampaignPhase>,
    pub assets: Vec<PatchCampaignAsset>,
}

/// Everything needed to create a new campaign (spec.md §4.5's phase
/// expansion happens immediately at creation).
pub struct CampaignSpec {
    pub org_id: String,
    pub name: String,
    pub description: Option<String>,
    pub campaign_type: CampaignType,
    pub rollout_strategy: RolloutStrategy,
    pub canary_percentage: Option<f64>,
    pub failure_threshold_percentage: Option<f64>,
    pub health_check_enabled: bool,
    pub auto_rollback_enabled: bool,
    pub requires_approval: bool,
    pub cve_alert_ids: Option<Vec<String>>,
    /// (asset_id, asset_name, platform)
    pub assets: Vec<(String, String, String)>,
}

impl CampaignAggregate {
    /// Creates a campaign in `draft` and immediately expands it into
    /// phases and sticky asset assignments.
    pub fn create(spec: CampaignSpec, config: &CampaignConfig, now_utc: DateTime<Utc>) -> Self {
        let campaign_id = Uuid::new_v4().to_string();
        let total_assets = spec.assets.len() as u32;
        let (phases, assets) = rollout::expand(&campaign_id, spec.rollout_strategy, &spec.assets, config);

        let campaign = PatchCampaign {
            id: campaign_id,
            org_id: spec.org_id,
            name: spec.name,
            description: spec.description,
            campaign_type: spec.campaign_type,
            status: CampaignStatus::Draft,
            rollout_strategy: spec.rollout_strategy,
            canary_percentage: spec.canary_percentage.or(Some(config.default_canary_percentage)),
            failure_threshold_percentage: spec
                .failure_threshold_percentage
                .or(Some(config.default_failure_threshold_percentage)),
            health_check_enabled: spec.health_check_enabled,
            auto_rollback_enabled: spec.auto_rollback_enabled,
            requires_approval: spec.requires_approval,
            approved_by: None,
            approved_at: None,
            cve_alert_ids: spec.cve_alert_ids,
            total_assets,
            completed_assets: 0,
            failed_assets: 0,
            created_at: now_utc,
            started_at: None,
            completed_at: None,
        };

        Self { campaign, phases, assets }
    }

    /// `completed_assets / total_assets * 100`, computed on read — the
    /// per-asset rows are the only source of truth (spec.md §4.5).
    pub fn completion_percentage(&self) -> f64 {
        if self.campaign.total_assets == 0 {
            return 0.0;
        }
        let completed = self
            .assets
            .iter()
            .filter(|a| a.status == PatchCampaignAssetStatus::Completed)
            .count();
        completed as f64 / self.campaign.total_assets as f64 * 100.0
    }

    pub fn current_phase(&self) -> Option<&PatchCampaignPhase> {
        self.phases
            .iter()
            .find(|p| matches!(p.status, PhaseStatus::Pending | PhaseStatus::InProgress))
    }

    fn transition_campaign(&mut self, to: CampaignStatus) -> CoreResult<bool> {
        if is_idempotent_noop(self.campaign.status, to) {
            return Ok(false);
        }
        validate_campaign_transition(self.campaign.status, to, self.campaign.requires_approval)?;
        self.campaign.status = to;
        Ok(true)
    }

    /// Leaves `draft`: to `pending_approval` if the campaign requires
    /// sign-off, straight to `approved` otherwise (spec.md §4.5's two
    /// edges out of `draft`).
    pub fn submit(&mut self) -> CoreResult<()> {
        let target = if self.campaign.requires_approval {
            CampaignStatus::PendingApproval
        } else {
            CampaignStatus::Approved
        };
        self.transition_campaign(target).map(|_| ())
    }

    pub fn approve(&mut self, by: impl Into<String>, now_utc: DateTime<Utc>) -> CoreResult<()> {
        if self.campaign.status == CampaignStatus::Approved {
            return Ok(());
        }
        if self.campaign.status != CampaignStatus::PendingApproval {
            return Err(CoreError::InvalidState(format!(
                "cannot approve campaign in state {:?}",
                self.campaign.status
            )));
        }
        self.campaign.status = CampaignStatus::Approved;
        self.campaign.approved_by = Some(by.into());
        self.campaign.approved_at = Some(now_utc);
        Ok(())
    }

    pub fn reject(&mut self, _by: impl Into<String>, _reason: impl Into<String>) -> CoreResult<()> {
        if self.campaign.status == CampaignStatus::Cancelled {
            return Ok(());
        }
        if self.campaign.status != CampaignStatus::PendingApproval {
            return Err(CoreError::InvalidState(format!(
                "cannot reject campaign in state {:?}",
                self.campaign.status
            )));
        }
        self.campaign.status = CampaignStatus::Cancelled;
        Ok(())
    }

    pub fn start(&mut self, now_utc: DateTime<Utc>) -> CoreResult<()> {
        if self.transition_campaign(CampaignStatus::InProgress)? {
            self.campaign.started_at = Some(now_utc);
            if let Some(phase) = self.phases.iter_mut().find(|p| p.status == PhaseStatus::Pending) {
                phase.status = PhaseStatus::InProgress;
                phase.started_at = Some(now_utc);
                let phase_id = phase.id.clone();
                for asset in self.assets.iter_mut().filter(|a| a.phase_id == phase_id) {
                    asset.status = PatchCampaignAssetStatus::InProgress;
                    asset.started_at = Some(now_utc);
                }
            }
        }
        Ok(())
    }

    pub fn pause(&mut self) -> CoreResult<()> {
        self.transition_campaign(CampaignStatus::Paused).map(|_| ())
    }

    pub fn resume(&mut self) -> CoreResult<()> {
        self.transition_campaign(CampaignStatus::InProgress).map(|_| ())
    }

    pub fn cancel(&mut self) -> CoreResult<()> {
        self.transition_campaign(CampaignStatus::Cancelled).map(|_| ())
    }

    /// The executor-facing callback (spec.md §6's `ReportAssetResult`).
    /// Updates the asset, and if that was the phase's last asset to
    /// reach a terminal state, evaluates the health gate and advances
    /// the campaign.
    pub fn report_asset_result(
        &mut self,
        asset_id: &str,
        status: PatchCampaignAssetStatus,
        before_version: Option<String>,
        after_version: Option<String>,
        error_message: Option<String>,
        config: &CampaignConfig,
        now_utc: DateTime<Utc>,
    ) -> CoreResult<()> {
        let asset = self
            .assets
            .iter_mut()
            .find(|a| a.asset_id == asset_id && a.status == PatchCampaignAssetStatus::InProgress)
            .ok_or_else(|| CoreError::NotFound(format!("no in-progress asset {asset_id} in this campaign")))?;
        asset.status = status;
        asset.before_version = before_version;
        asset.after_version = after_version;
        asset.error_message = error_message;
        asset.completed_at = Some(now_utc);
        let phase_id = asset.phase_id.clone();

        self.recount_campaign_totals();
        self.maybe_advance_phase(&phase_id, config, now_utc)
    }

    fn recount_campaign_totals(&mut self) {
        self.campaign.completed_assets =
            self.assets.iter().filter(|a| a.status == PatchCampaignAssetStatus::Completed).count() as u32;
        self.campaign.failed_assets =
            self.assets.iter().filter(|a| a.status == PatchCampaignAssetStatus::Failed).count() as u32;
    }

    fn maybe_advance_phase(&mut self, phase_id: &str, config: &CampaignConfig, now_utc: DateTime<Utc>) -> CoreResult<()> {
        let phase_assets: Vec<&PatchCampaignAsset> = self.assets.iter().filter(|a| a.phase_id == phase_id).collect();
        if phase_assets.is_empty() || !phase_assets.iter().all(|a| a.is_terminal()) {
            return Ok(());
        }

        let total = phase_assets.len() as u32;
        let failed = phase_assets.iter().filter(|a| a.status == PatchCampaignAssetStatus::Failed).count() as u32;
        let completed = phase_assets.iter().filter(|a| a.status == PatchCampaignAssetStatus::Completed).count() as u32;

        let threshold = self.campaign.failure_threshold_percentage.unwrap_or(config.default_failure_threshold_percentage);
        let health_check_passed = !self.campaign.health_check_enabled || (failed as f64 / total as f64 * 100.0) <= threshold;

        let phase = self.phases.iter_mut().find(|p| p.id == phase_id).expect("phase exists for its own assets");
        phase.completed_assets = completed;
        phase.failed_assets = failed;
        phase.health_check_passed = Some(health_check_passed);
        phase.completed_at = Some(now_utc);

        if health_check_passed {
            phase.status = PhaseStatus::Completed;
            let next_ordinal = phase.ordinal + 1;
            if let Some(next) = self.phases.iter_mut().find(|p| p.ordinal == next_ordinal) {
                next.status = PhaseStatus::InProgress;
                next.started_at = Some(now_utc);
                let next_id = next.id.clone();
                for asset in self.assets.iter_mut().filter(|a| a.phase_id == next_id) {
                    asset.status = PatchCampaignAssetStatus::InProgress;
                    asset.started_at = Some(now_utc);
                }
            } else {
                self.campaign.status = CampaignStatus::Completed;
                self.campaign.completed_at = Some(now_utc);
            }
        } else {
            phase.status = PhaseStatus::Failed;
            if self.campaign.auto_rollback_enabled {
                self.campaign.status = CampaignStatus::RolledBack;
            } else {
                self.campaign.status = CampaignStatus::Failed;
            }
            self.campaign.completed_at = Some(now_utc);
        }
        Ok(())
    }

    /// Rolls back completed assets in `scope`. Per spec.md §4.5 this
    /// does not resurrect skipped assets, and there is no executor
    /// callout here — the caller is expected to drive the actual
    /// version restore through the executor before calling this.
    pub fn rollback(&mut self, scope: RollbackScope<'_>, now_utc: DateTime<Utc>) {
        for asset in self.assets.iter_mut() {
            let in_scope = match scope {
                RollbackScope::All => true,
                RollbackScope::Phase(phase_id) => asset.phase_id == phase_id,
            };
            if in_scope && asset.status == PatchCampaignAssetStatus::Completed {
                asset.status = PatchCampaignAssetStatus::RolledBack;
                asset.completed_at = Some(now_utc);
            }
        }
        self.recount_campaign_totals();
        if self.campaign.status != CampaignStatus::RolledBack {
            self.campaign.status = CampaignStatus::RolledBack;
            self.campaign.completed_at = Some(now_utc);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, 27, 0, 0, 0).unwrap()
    }

    fn assets(n: usize) -> Vec<(String, String, String)> {
        (0..n)
            .map(|i| (format!("asset-{i}"), format!("host-{i}"), "aws".to_string()))
            .collect()
    }

    fn spec(strategy: RolloutStrategy, requires_approval: bool, auto_rollback: bool, n: usize) -> CampaignSpec {
        CampaignSpec {
            org_id: "org-1".to_string(),
            name: "patch openssl".to_string(),
            description: None,
            campaign_type: CampaignType::CveResponse,
            rollout_strategy: strategy,
            canary_percentage: None,
            failure_threshold_percentage: None,
            health_check_enabled: true,
            auto_rollback_enabled: auto_rollback,
            requires_approval,
            cve_alert_ids: None,
            assets: assets(n),
        }
    }

    #[test]
    fn creation_expands_phases_and_assigns_assets() {
        let aggregate = CampaignAggregate::create(spec(RolloutStrategy::Canary, true, false, 20), &CampaignConfig::default(), now());
        assert_eq!(aggregate.campaign.status, CampaignStatus::Draft);
        assert_eq!(aggregate.phases.len(), 2);
        assert_eq!(aggregate.assets.len(), 20);
    }

    #[test]
    fn full_happy_path_completes_every_phase() {
        let config = CampaignConfig::default();
        let mut aggregate = CampaignAggregate::create(spec(RolloutStrategy::Canary, true, false, 20), &config, now());

        aggregate.submit().unwrap();
        aggregate.approve("alice", now()).unwrap();
        aggregate.start(now()).unwrap();

        loop {
            let phase_id = aggregate.current_phase().map(|p| p.id.clone());
            let Some(phase_id) = phase_id else { break };
            let asset_ids: Vec<String> = aggregate
                .assets
                .iter()
                .filter(|a| a.phase_id == phase_id && a.status == PatchCampaignAssetStatus::InProgress)
                .map(|a| a.asset_id.clone())
                .collect();
            for asset_id in asset_ids {
                aggregate
                    .report_asset_result(&asset_id, PatchCampaignAssetStatus::Completed, None, None, None, &config, now())
                    .unwrap();
            }
        }

        assert_eq!(aggregate.campaign.status, CampaignStatus::Completed);
        assert_eq!(aggregate.completion_percentage(), 100.0);
    }

    #[test]
    fn phase_failure_beyond_threshold_fails_campaign_without_auto_rollback() {
        let config = CampaignConfig::default();
        let mut aggregate = CampaignAggregate::create(spec(RolloutStrategy::Immediate, false, false, 10), &config, now());
        aggregate.submit().unwrap();
        aggregate.start(now()).unwrap();

        let asset_ids: Vec<String> = aggregate.assets.iter().map(|a| a.asset_id.clone()).collect();
        for (i, asset_id) in asset_ids.iter().enumerate() {
            let status = if i < 3 { PatchCampaignAssetStatus::Failed } else { PatchCampaignAssetStatus::Completed };
            aggregate.report_asset_result(asset_id, status, None, None, None, &config, now()).unwrap();
        }

        assert_eq!(aggregate.campaign.status, CampaignStatus::Failed);
        assert_eq!(aggregate.phases[0].status, PhaseStatus::Failed);
    }

    #[test]
    fn phase_failure_beyond_threshold_rolls_back_campaign_when_enabled() {
        let config = CampaignConfig::default();
        let mut aggregate = CampaignAggregate::create(spec(RolloutStrategy::Immediate, false, true, 10), &config, now());
        aggregate.submit().unwrap();
        aggregate.start(now()).unwrap();

        let asset_ids: Vec<String> = aggregate.assets.iter().map(|a| a.asset_id.clone()).collect();
        for (i, asset_id) in asset_ids.iter().enumerate() {
            let status = if i < 5 { PatchCampaignAssetStatus::Failed } else { PatchCampaignAssetStatus::Completed };
            aggregate.report_asset_result(asset_id, status, None, None, None, &config, now()).unwrap();
        }

        assert_eq!(aggregate.campaign.status, CampaignStatus::RolledBack);
    }

    #[test]
    fn approve_is_idempotent_but_rejects_wrong_state() {
        let config = CampaignConfig::default();
        let mut aggregate = CampaignAggregate::create(spec(RolloutStrategy::Immediate, true, false, 5), &config, now());
        aggregate.submit().unwrap();
        aggregate.approve("alice", now()).unwrap();
        aggregate.approve("alice", now()).unwrap();
        assert_eq!(aggregate.campaign.status, CampaignStatus::Approved);

        let mut draft = CampaignAggregate::create(spec(RolloutStrategy::Immediate, true, false, 5), &config, now());
        assert!(draft.approve("alice", now()).is_err());
    }

    #[test]
    fn pause_and_resume_round_trip() {
        let config = CampaignConfig::default();
        let mut aggregate = CampaignAggregate::create(spec(RolloutStrategy::Immediate, false, false, 5), &config, now());
        aggregate.submit().unwrap();
        aggregate.start(now()).unwrap();
        aggregate.pause().unwrap();
        assert_eq!(aggregate.campaign.status, CampaignStatus::Paused);
        aggregate.resume().unwrap();
        assert_eq!(aggregate.campaign.status, CampaignStatus::InProgress);
    }

    #[test]
    fn rollback_all_reverts_completed_assets_but_not_skipped() {
        let config = CampaignConfig::default();
        let mut aggregate = CampaignAggregate::create(spec(RolloutStrategy::Immediate, false, false, 3), &config, now());
        aggregate.submit().unwrap();
        aggregate.start(now()).unwrap();
        aggregate.assets[0].status = PatchCampaignAssetStatus::Completed;
        aggregate.assets[1].status = PatchCampaignAssetStatus::Skipped;
        aggregate.rollback(RollbackScope::All, now());
        assert_eq!(aggregate.assets[0].status, PatchCampaignAssetStatus::RolledBack);
        assert_eq!(aggregate.assets[1].status, PatchCampaignAssetStatus::Skipped);
        assert_eq!(aggregate.campaign.status, CampaignStatus::RolledBack);
    }

    #[test]
    fn completion_percentage_reflects_asset_rows_not_a_cache() {
        let config = CampaignConfig::default();
        let mut aggregate = CampaignAggregate::create(spec(RolloutStrategy::Immediate, false, false, 4), &config, now());
        aggregate.submit().unwrap();
        aggregate.start(now()).unwrap();
        assert_eq!(aggregate.completion_percentage(), 0.0);
        let asset_id = aggregate.assets[0].asset_id.clone();
        aggregate
            .report_asset_result(&asset_id, PatchCampaignAssetStatus::Completed, None, None, None, &config, now())
            .unwrap();
        assert_eq!(aggregate.completion_percentage(), 25.0);
    }
}
