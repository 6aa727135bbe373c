//! The eight weighted components of the Operation Risk Policy (spec.md
//! §4.2). Each returns a `(score 0..100, weight, description,
//! mitigations[])` tuple via `RiskComponent`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskComponent {
    pub name: String,
    pub score: f64,
    pub weight: f64,
    pub description: String,
    pub mitigations: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EnvironmentKind {
    Production,
    Staging,
    Development,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChangeSizeKind {
    Major,
    Moderate,
    Minor,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ScopeInput {
    pub assets: u32,
    pub total_capacity: u32,
    pub critical_pct: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct HistoryInput {
    pub failure_rate: f64,
    pub days_since_last_failure: Option<u32>,
    pub success_streak: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TimingWindow {
    Peak,
    MaintenanceWindow,
    Weekend,
    Normal,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DependenciesInput {
    pub dependency_count: u32,
    pub has_external_dependencies: bool,
}

pub fn environment_component(weight: f64, environment: Option<EnvironmentKind>) -> RiskComponent {
    let (score, kind) = match environment {
        Some(EnvironmentKind::Production) => (80.0, "production"),
        Some(EnvironmentKind::Staging) => (40.0, "staging"),
        Some(EnvironmentKind::Development) => (10.0, "development"),
        // Unknown environment is treated as the riskier staging default,
        // not the safest one — see confidence penalty in `operation_risk::mod`.
        None => (40.0, "unknown"),
    };
    RiskComponent {
        name: "environment".to_string(),
        score,
        weight,
        description: format!("target environment is {kind}"),
        mitigations: if score >= 80.0 {
            vec!["require change-window approval".to_string()]
        } else {
            vec![]
        },
    }
}

pub fn scope_component(weight: f64, scope: ScopeInput) -> RiskComponent {
    let coverage = if scope.total_capacity > 0 {
        scope.assets as f64 / scope.total_capacity as f64
    } else {
        0.0
    };
    let base = if coverage >= 0.50 {
        90.0
    } else if coverage >= 0.25 {
        60.0
    } else if coverage >= 0.10 {
        40.0
    } else {
        20.0
    };
    let score = (base + 0.3 * scope.critical_pct).min(100.0);
    RiskComponent {
        name: "scope".to_string(),
        score,
        weight,
        description: format!(
            "{} of {} assets ({:.0}% coverage, {:.0}% critical)",
            scope.assets,
            scope.total_capacity,
            coverage * 100.0,
            scope.critical_pct
        ),
        mitigations: if coverage >= 0.25 {
            vec!["split into smaller batches".to_string()]
        } else {
            vec![]
        },
    }
}

pub fn history_component(weight: f64, history: Option<HistoryInput>) -> RiskComponent {
    let Some(history) = history else {
        return RiskComponent {
            name: "history".to_string(),
            score: 0.0,
            weight,
            description: "no history data available".to_string(),
            mitigations: vec!["run a staged dry-run before proceeding".to_string()],
        };
    };
    let mut score = history.failure_rate * 100.0;
    match history.days_since_last_failure {
        Some(days) if days < 7 => score += 30.0,
        Some(days) if days < 30 => score += 15.0,
        _ => {}
    }
    if history.success_streak > 10 {
        score -= 20.0;
    }
    let score = score.clamp(0.0, 100.0);
    RiskComponent {
        name: "history".to_string(),
        score,
        weight,
        description: format!(
            "{:.0}% historical failure rate, {} consecutive successes",
            history.failure_rate * 100.0,
            history.success_streak
        ),
        mitigations: vec![],
    }
}

pub fn change_size_component(weight: f64, change_size: Option<ChangeSizeKind>, tested_in_staging: bool) -> RiskComponent {
    let (base, kind) = match change_size {
        Some(ChangeSizeKind::Major) => (80.0, "major"),
        Some(ChangeSizeKind::Moderate) => (50.0, "moderate"),
        Some(ChangeSizeKind::Minor) => (20.0, "minor"),
        None => (50.0, "unspecified"),
    };
    let score = if tested_in_staging {
        (base - 15.0).max(0.0)
    } else {
        base
    };
    RiskComponent {
        name: "change_size".to_string(),
        score,
        weight,
        description: format!("{kind} change{}", if tested_in_staging { ", staged first" } else { "" }),
        mitigations: if !tested_in_staging {
            vec!["validate in staging before production rollout".to_string()]
        } else {
            vec![]
        },
    }
}

pub fn timing_component(weight: f64, window: TimingWindow) -> RiskComponent {
    let (score, desc) = match window {
        TimingWindow::Peak => (80.0, "peak business hours"),
        TimingWindow::MaintenanceWindow => (10.0, "scheduled maintenance window"),
        TimingWindow::Weekend => (60.0, "weekend (Fri-Sat-Sun)"),
        TimingWindow::Normal => (30.0, "off-peak hours"),
    };
    RiskComponent {
        name: "timing".to_string(),
        score,
        weight,
        description: desc.to_string(),
        mitigations: if matches!(window, TimingWindow::Peak) {
            vec!["reschedule to the next maintenance window".to_string()]
        } else {
            vec![]
        },
    }
}

pub fn dependencies_component(weight: f64, deps: DependenciesInput) -> RiskComponent {
    let mut score = (deps.dependency_count as f64 * 15.0).min(100.0);
    if deps.has_external_dependencies {
        score = (score + 25.0).min(100.0);
    }
    RiskComponent {
        name: "dependencies".to_string(),
        score,
        weight,
        description: format!(
            "{} dependent service(s){}",
            deps.dependency_count,
            if deps.has_external_dependencies { ", includes external dependencies" } else { "" }
        ),
        mitigations: if deps.has_external_dependencies {
            vec!["confirm external dependency maintenance windows".to_string()]
        } else {
            vec![]
        },
    }
}

pub fn drift_component(weight: f64, drift_days: u32) -> RiskComponent {
    let score = if drift_days > 90 {
        90.0
    } else if drift_days > 30 {
        60.0
    } else if drift_days > 14 {
        40.0
    } else {
        10.0
    };
    RiskComponent {
        name: "drift".to_string(),
        score,
        weight,
        description: format!("{drift_days} day(s) since the golden image"),
        mitigations: if drift_days > 30 {
            vec!["rebuild from the current golden image first".to_string()]
        } else {
            vec![]
        },
    }
}

pub fn rollback_component(weight: f64, rollback_available: bool) -> RiskComponent {
    let score = if rollback_available { 10.0 } else { 70.0 };
    RiskComponent {
        name: "rollback".to_string(),
        score,
        weight,
        description: if rollback_available {
            "rollback path available".to_string()
        } else {
            "no rollback path".to_string()
        },
        mitigations: if !rollback_available {
            vec!["prepare a manual rollback runbook before proceeding".to_string()]
        } else {
            vec![]
        },
    }
}
