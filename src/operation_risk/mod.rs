//! The Operation Risk Policy (L2, spec.md §4.2) — scores the risk of
//! executing a specific patch operation, independent of any CVE's
//! urgency. Pure function; never fails.

mod components;

pub use components::{
    ChangeSizeKind, DependenciesInput, EnvironmentKind, HistoryInput, RiskComponent, ScopeInput,
    TimingWindow,
};

use crate::config::OperationRiskConfig;
use serde::{Deserialize, Serialize};

/// Inputs to the Operation Risk Policy. `environment`, `history`, and
/// `change_size` are optional — missing data degrades `confidence`
/// rather than failing the assessment (spec.md §4.2).
#[derive(Debug, Clone)]
pub struct OperationRiskInput {
    pub environment: Option<EnvironmentKind>,
    pub scope: ScopeInput,
    pub history: Option<HistoryInput>,
    pub change_size: Option<ChangeSizeKind>,
    pub tested_in_staging: bool,
    pub timing: TimingWindow,
    pub dependencies: DependenciesInput,
    pub drift_days: u32,
    pub rollback_available: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskScore {
    pub overall: f64,
    pub level: RiskLevel,
    pub components: Vec<RiskComponent>,
    pub approval_required: bool,
    pub automation_safe: bool,
    pub suggested_batch_size: u32,
    pub suggested_wait_minutes: u32,
    pub confidence: f64,
}

/// Scores an operation against the eight weighted components and derives
/// approval, automation, and pacing recommendations from the result.
pub fn score_operation(input: &OperationRiskInput, config: &OperationRiskConfig) -> RiskScore {
    let weights = &config.weights;

    let components = vec![
        components::environment_component(weights.environment, input.environment),
        components::scope_component(weights.scope, input.scope),
        components::history_component(weights.history, input.history),
        components::change_size_component(weights.change_size, input.change_size, input.tested_in_staging),
        components::timing_component(weights.timing, input.timing),
        components::dependencies_component(weights.dependencies, input.dependencies),
        components::drift_component(weights.drift, input.drift_days),
        components::rollback_component(weights.rollback, input.rollback_available),
    ];

    let weight_sum: f64 = components.iter().map(|c| c.weight).sum();
    let weighted: f64 = components.iter().map(|c| c.score * c.weight).sum();
    let overall = if weight_sum.abs() < f64::EPSILON {
        0.0
    } else {
        (weighted / weight_sum).clamp(0.0, 100.0)
    };

    let level = if overall >= config.high_threshold {
        RiskLevel::Critical
    } else if overall >= config.medium_threshold {
        RiskLevel::High
    } else if overall >= config.low_threshold {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };

    let (batch_fraction, suggested_wait_minutes) = if overall >= config.high_threshold {
        (0.05, 30)
    } else if overall >= config.medium_threshold {
        (0.10, 15)
    } else if overall >= config.low_threshold {
        (0.25, 5)
    } else {
        (0.50, 2)
    };
    // spec.md §4.2: "suggested batch size" is a concrete asset count,
    // max(1, floor(assets * fraction)), never zero even for tiny batches.
    let suggested_batch_size = ((input.scope.assets as f64 * batch_fraction).floor() as u32).max(1);

    let mut confidence: f64 = 1.0;
    if input.history.is_none() {
        confidence -= 0.2;
    }
    if input.change_size.is_none() {
        confidence -= 0.1;
    }
    if input.environment.is_none() {
        confidence -= 0.15;
    }
    let confidence = confidence.max(0.5);

    RiskScore {
        overall,
        approval_required: overall > config.auto_approve_max
            || matches!(input.environment, Some(EnvironmentKind::Production)),
        automation_safe: overall <= config.auto_approve_max && input.rollback_available,
        level,
        components,
        suggested_batch_size,
        suggested_wait_minutes,
        confidence,
    }
}
