//! Configuration value objects.
//!
//! Each config struct is constructed once at process start (its `Default`
//! matches the documented defaults in spec.md) and handed to the policy or
//! store that needs it — never read from a global. Overrides load from a
//! TOML file via `toml`, the format already used across the teacher
//! package family for this purpose.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Weights and thresholds for the urgency Scoring Policy (spec.md §4.1).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoringConfig {
    pub cvss_weight: f64,
    pub exploit_bonus: f64,
    pub kev_bonus: f64,
    pub production_bonus: f64,
    pub fleet_factor_cap: f64,
    pub epss_weight: f64,
    pub normalizer: f64,
    pub p1_score_threshold: f64,
    pub p2_score_threshold: f64,
    pub p3_score_threshold: f64,
    pub exploit_cvss_override: f64,
    pub sla_hours: SlaHours,
    pub severity_critical_threshold: f64,
    pub severity_high_threshold: f64,
    pub severity_medium_threshold: f64,
    pub fleet_coverage_high_band: f64,
    pub fleet_coverage_medium_band: f64,
    pub epss_high_band: f64,
    pub epss_medium_band: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SlaHours {
    pub p1: i64,
    pub p2: i64,
    pub p3: i64,
    pub p4: i64,
}

impl Default for SlaHours {
    fn default() -> Self {
        Self {
            p1: 24,
            p2: 72,
            p3: 168,
            p4: 720,
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            cvss_weight: 10.0,
            exploit_bonus: 25.0,
            kev_bonus: 20.0,
            production_bonus: 15.0,
            fleet_factor_cap: 10.0,
            epss_weight: 20.0,
            normalizer: 2.0,
            p1_score_threshold: 80.0,
            p2_score_threshold: 60.0,
            p3_score_threshold: 40.0,
            exploit_cvss_override: 9.0,
            sla_hours: SlaHours::default(),
            severity_critical_threshold: 80.0,
            severity_high_threshold: 60.0,
            severity_medium_threshold: 40.0,
            fleet_coverage_high_band: 0.5,
            fleet_coverage_medium_band: 0.2,
            epss_high_band: 0.5,
            epss_medium_band: 0.1,
        }
    }
}

/// Weights and thresholds for the Operation Risk Policy (spec.md §4.2).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OperationRiskConfig {
    pub weights: OperationRiskWeights,
    pub low_threshold: f64,
    pub medium_threshold: f64,
    pub high_threshold: f64,
    /// Overall score at/under which a change is eligible for automatic
    /// approval (spec.md leaves the exact value to the operator; 25.0
    /// aligns it with the "low" risk band — see DESIGN.md).
    pub auto_approve_max: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OperationRiskWeights {
    pub environment: f64,
    pub scope: f64,
    pub history: f64,
    pub change_size: f64,
    pub timing: f64,
    pub dependencies: f64,
    pub drift: f64,
    pub rollback: f64,
}

impl Default for OperationRiskWeights {
    fn default() -> Self {
        Self {
            environment: 0.20,
            scope: 0.15,
            history: 0.15,
            change_size: 0.15,
            timing: 0.10,
            dependencies: 0.10,
            drift: 0.10,
            rollback: 0.05,
        }
    }
}

impl Default for OperationRiskConfig {
    fn default() -> Self {
        Self {
            weights: OperationRiskWeights::default(),
            low_threshold: 25.0,
            medium_threshold: 50.0,
            high_threshold: 75.0,
            auto_approve_max: 25.0,
        }
    }
}

/// Resolves the asset-to-image join's Open Question (spec.md §9):
/// whether substring matching on `image_ref` is allowed in addition to
/// the exact image-coordinate lookup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssetMatchPolicy {
    pub allow_substring_fallback: bool,
}

impl Default for AssetMatchPolicy {
    fn default() -> Self {
        Self {
            allow_substring_fallback: true,
        }
    }
}

/// Campaign orchestrator defaults (spec.md §4.5).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CampaignConfig {
    pub default_canary_percentage: f64,
    pub default_failure_threshold_percentage: f64,
    pub rolling_wave_percentages: Vec<f64>,
    pub blue_green_wave_percentage: f64,
    pub default_executor_timeout_secs: u64,
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            default_canary_percentage: 5.0,
            default_failure_threshold_percentage: 10.0,
            rolling_wave_percentages: vec![10.0, 25.0, 50.0, 100.0],
            blue_green_wave_percentage: 50.0,
            default_executor_timeout_secs: 600,
        }
    }
}

/// Connection settings for the optional postgres store adapter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub max_connections: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            database: "resilience".to_string(),
            username: "resilience".to_string(),
            password: String::new(),
            max_connections: 10,
        }
    }
}

impl StoreConfig {
    /// Builds configuration from environment variables, falling back to
    /// defaults for anything unset. Mirrors the `DataStoreConfig::from_env`
    /// pattern used to construct `CVECore` in the teacher package.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("RESILIENCE_DB_HOST").unwrap_or(defaults.host),
            port: std::env::var("RESILIENCE_DB_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
            database: std::env::var("RESILIENCE_DB_NAME").unwrap_or(defaults.database),
            username: std::env::var("RESILIENCE_DB_USER").unwrap_or(defaults.username),
            password: std::env::var("RESILIENCE_DB_PASSWORD").unwrap_or(defaults.password),
            max_connections: std::env::var("RESILIENCE_DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_connections),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.host.is_empty() {
            return Err("store host must not be empty".to_string());
        }
        if self.database.is_empty() {
            return Err("store database name must not be empty".to_string());
        }
        Ok(())
    }

    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database
        )
    }
}

/// Top-level configuration bundle, optionally loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    pub scoring: ScoringConfig,
    pub operation_risk: OperationRiskConfig,
    pub asset_match: AssetMatchPolicy,
    pub campaign: CampaignConfig,
    pub store: StoreConfig,
}

impl Config {
    pub fn from_toml_str(text: &str) -> Result<Self, String> {
        toml::from_str(text).map_err(|e| format!("invalid configuration: {e}"))
    }

    /// Extension points beyond the documented defaults: per-org overrides
    /// keyed by org_id, layered on top of the global config. Unused keys
    /// are ignored rather than rejected so new orgs never fail to load.
    pub fn scoring_for_org<'a>(
        &'a self,
        overrides: &'a HashMap<String, ScoringConfig>,
        org_id: &str,
    ) -> &'a ScoringConfig {
        overrides.get(org_id).unwrap_or(&self.scoring)
    }
}
