//! The Scoring Policy (L1, spec.md §4.1) — a pure function from CVE facts
//! and blast-radius counts to an urgency score, priority, and SLA
//! deadline. Deterministic given `now_utc`; never fails.

mod risk_assessment;

pub use risk_assessment::{assess_risk, ContributingFactor, RiskAssessment};

use crate::config::ScoringConfig;
use crate::models::Priority;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Inputs to the Scoring Policy (spec.md §4.1).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ScoreInput {
    pub cvss: f64,
    pub epss: f64,
    pub exploit_available: bool,
    pub cisa_kev_listed: bool,
    /// Count of affected assets in the blast radius.
    pub affected_assets: u32,
    /// Count of affected assets that are production.
    pub production_assets: u32,
    /// Total fleet size for the organization.
    pub fleet_size: u32,
}

/// Per-factor audit trail so callers can display why a score landed
/// where it did (spec.md §4.1's contract).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ScoreBreakdown {
    pub cvss_contribution: f64,
    pub exploit_contribution: f64,
    pub kev_contribution: f64,
    pub production_contribution: f64,
    pub fleet_contribution: f64,
    pub epss_contribution: f64,
    pub raw: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SeverityLabel {
    Critical,
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoreResult {
    pub score: u32,
    pub priority: Priority,
    pub sla_due_at: DateTime<Utc>,
    pub severity: SeverityLabel,
    pub breakdown: ScoreBreakdown,
}

/// Computes the urgency score, priority, and SLA deadline for a CVE given
/// its blast radius. Inputs are clamped rather than rejected — this
/// function never returns an error (spec.md §7).
pub fn score(input: &ScoreInput, config: &ScoringConfig, now_utc: DateTime<Utc>) -> ScoreResult {
    let cvss = input.cvss.clamp(0.0, 10.0);
    let epss = input.epss.clamp(0.0, 1.0);

    let cvss_contribution = cvss * config.cvss_weight;
    let exploit_contribution = if input.exploit_available {
        config.exploit_bonus
    } else {
        0.0
    };
    let kev_contribution = if input.cisa_kev_listed {
        config.kev_bonus
    } else {
        0.0
    };
    let production_contribution = if input.production_assets > 0 {
        config.production_bonus
    } else {
        0.0
    };
    let fleet_contribution = if input.fleet_size > 0 {
        let coverage = input.affected_assets as f64 / input.fleet_size as f64 * 100.0;
        (coverage / 10.0).min(config.fleet_factor_cap)
    } else {
        0.0
    };
    let epss_contribution = epss * config.epss_weight;

    let raw = cvss_contribution
        + exploit_contribution
        + kev_contribution
        + production_contribution
        + fleet_contribution
        + epss_contribution;

    let normalizer = if config.normalizer.abs() < f64::EPSILON {
        1.0
    } else {
        config.normalizer
    };
    let score = ((raw / normalizer).floor() as i64).clamp(0, 100) as u32;

    let priority = assign_priority(score as f64, input, config);
    let sla_hours = match priority {
        Priority::P1 => config.sla_hours.p1,
        Priority::P2 => config.sla_hours.p2,
        Priority::P3 => config.sla_hours.p3,
        Priority::P4 => config.sla_hours.p4,
    };
    let sla_due_at = now_utc + Duration::hours(sla_hours);

    let severity = if score as f64 >= config.severity_critical_threshold {
        SeverityLabel::Critical
    } else if score as f64 >= config.severity_high_threshold {
        SeverityLabel::High
    } else if score as f64 >= config.severity_medium_threshold {
        SeverityLabel::Medium
    } else {
        SeverityLabel::Low
    };

    ScoreResult {
        score,
        priority,
        sla_due_at,
        severity,
        breakdown: ScoreBreakdown {
            cvss_contribution,
            exploit_contribution,
            kev_contribution,
            production_contribution,
            fleet_contribution,
            epss_contribution,
            raw,
        },
    }
}

/// The priority rule table from spec.md §4.1 — first match wins.
fn assign_priority(score: f64, input: &ScoreInput, config: &ScoringConfig) -> Priority {
    if score >= config.p1_score_threshold {
        return Priority::P1;
    }
    if input.cisa_kev_listed && input.production_assets > 0 {
        return Priority::P1;
    }
    if input.exploit_available && input.cvss >= config.exploit_cvss_override {
        return Priority::P1;
    }
    if score >= config.p2_score_threshold {
        return Priority::P2;
    }
    if input.exploit_available && input.production_assets > 0 {
        return Priority::P2;
    }
    if score >= config.p3_score_threshold {
        return Priority::P3;
    }
    Priority::P4
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, 27, 0, 0, 0).unwrap()
    }

    /// Scenario 1 (spec.md §8): critical CVE with exploit and KEV.
    #[test]
    fn critical_cve_with_exploit_and_kev() {
        let input = ScoreInput {
            cvss: 9.8,
            epss: 0.9,
            exploit_available: true,
            cisa_kev_listed: true,
            affected_assets: 50,
            production_assets: 10,
            fleet_size: 100,
        };
        let result = score(&input, &ScoringConfig::default(), now());
        assert!((80..=100).contains(&result.score), "score={}", result.score);
        assert_eq!(result.priority, Priority::P1);
        assert_eq!(result.sla_due_at, now() + Duration::hours(24));
    }

    /// Scenario 2: KEV + production overrides score.
    #[test]
    fn kev_and_production_overrides_score() {
        let input = ScoreInput {
            cvss: 7.0,
            epss: 0.3,
            exploit_available: false,
            cisa_kev_listed: true,
            affected_assets: 5,
            production_assets: 1,
            fleet_size: 100,
        };
        let result = score(&input, &ScoringConfig::default(), now());
        assert!((50..=80).contains(&result.score), "score={}", result.score);
        assert_eq!(result.priority, Priority::P1);
        assert_eq!(result.sla_due_at, now() + Duration::hours(24));
    }

    /// Scenario 3: exploit with CVSS 9+ overrides score.
    #[test]
    fn exploit_with_high_cvss_overrides_score() {
        let input = ScoreInput {
            cvss: 9.0,
            epss: 0.1,
            exploit_available: true,
            cisa_kev_listed: false,
            affected_assets: 0,
            production_assets: 0,
            fleet_size: 100,
        };
        let result = score(&input, &ScoringConfig::default(), now());
        assert!((60..=90).contains(&result.score), "score={}", result.score);
        assert_eq!(result.priority, Priority::P1);
    }

    /// Scenario 4: low severity.
    #[test]
    fn low_severity_cve() {
        let input = ScoreInput {
            cvss: 2.0,
            epss: 0.01,
            exploit_available: false,
            cisa_kev_listed: false,
            affected_assets: 0,
            production_assets: 0,
            fleet_size: 100,
        };
        let result = score(&input, &ScoringConfig::default(), now());
        assert!((0..=20).contains(&result.score), "score={}", result.score);
        assert_eq!(result.priority, Priority::P4);
        assert_eq!(result.sla_due_at, now() + Duration::hours(720));
    }

    #[test]
    fn score_is_always_in_bounds() {
        let extreme = ScoreInput {
            cvss: 10.0,
            epss: 1.0,
            exploit_available: true,
            cisa_kev_listed: true,
            affected_assets: 1_000_000,
            production_assets: 1_000_000,
            fleet_size: 1,
        };
        let result = score(&extreme, &ScoringConfig::default(), now());
        assert!(result.score <= 100);
    }

    #[test]
    fn deterministic_given_same_clock() {
        let input = ScoreInput {
            cvss: 5.5,
            epss: 0.2,
            exploit_available: false,
            cisa_kev_listed: false,
            affected_assets: 3,
            production_assets: 0,
            fleet_size: 40,
        };
        let config = ScoringConfig::default();
        let a = score(&input, &config, now());
        let b = score(&input, &config, now());
        assert_eq!(a, b);
    }

    #[test]
    fn zero_fleet_size_does_not_panic_and_contributes_zero() {
        let input = ScoreInput {
            cvss: 4.0,
            epss: 0.05,
            exploit_available: false,
            cisa_kev_listed: false,
            affected_assets: 3,
            production_assets: 0,
            fleet_size: 0,
        };
        let result = score(&input, &ScoringConfig::default(), now());
        assert_eq!(result.breakdown.fleet_contribution, 0.0);
    }
}
