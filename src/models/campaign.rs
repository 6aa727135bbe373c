//! Patch campaign lifecycle types (spec.md §3, §4.5).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CampaignType {
    CveResponse,
    Scheduled,
    Emergency,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Draft,
    PendingApproval,
    Approved,
    Scheduled,
    InProgress,
    Paused,
    Completed,
    Failed,
    RolledBack,
    Cancelled,
}

impl CampaignStatus {
    /// Terminal states are absorbing (spec.md §3).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CampaignStatus::Completed
                | CampaignStatus::Failed
                | CampaignStatus::RolledBack
                | CampaignStatus::Cancelled
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RolloutStrategy {
    Immediate,
    Canary,
    Rolling,
    BlueGreen,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PhaseType {
    Canary,
    Wave,
    Full,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PatchCampaignAssetStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Skipped,
    /// Dedicated variant rather than folding into `Failed` — see
    /// DESIGN.md's resolution of spec.md §9's Open Question.
    RolledBack,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatchCampaign {
    pub id: String,
    pub org_id: String,
    pub name: String,
    pub description: Option<String>,
    pub campaign_type: CampaignType,
    pub status: CampaignStatus,
    pub rollout_strategy: RolloutStrategy,
    pub canary_percentage: Option<f64>,
    pub failure_threshold_percentage: Option<f64>,
    pub health_check_enabled: bool,
    pub auto_rollback_enabled: bool,
    pub requires_approval: bool,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub cve_alert_ids: Option<Vec<String>>,
    pub total_assets: u32,
    pub completed_assets: u32,
    pub failed_assets: u32,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatchCampaignPhase {
    pub id: String,
    pub campaign_id: String,
    pub ordinal: u32,
    pub name: String,
    pub phase_type: PhaseType,
    pub target_percentage: f64,
    pub total_assets: u32,
    pub completed_assets: u32,
    pub failed_assets: u32,
    pub status: PhaseStatus,
    pub health_check_passed: Option<bool>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatchCampaignAsset {
    pub id: String,
    pub campaign_id: String,
    pub phase_id: String,
    pub asset_id: String,
    pub asset_name: String,
    pub platform: String,
    pub status: PatchCampaignAssetStatus,
    pub before_version: Option<String>,
    pub after_version: Option<String>,
    pub error_message: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl PatchCampaignAsset {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            PatchCampaignAssetStatus::Completed
                | PatchCampaignAssetStatus::Failed
                | PatchCampaignAssetStatus::Skipped
                | PatchCampaignAssetStatus::RolledBack
        )
    }
}
