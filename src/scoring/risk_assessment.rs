//! Secondary qualitative risk assessment (spec.md §4.1). Advisory only —
//! must never feed back into the numeric score.

use super::ScoreInput;
use crate::config::ScoringConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContributingFactor {
    pub name: String,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskAssessment {
    pub factors: Vec<ContributingFactor>,
    pub recommendation: String,
    pub time_to_remediate: String,
}

/// Builds the qualitative factor list and recommendation for a CVE. This
/// is purely descriptive — it reads the same inputs as `score()` but
/// never influences it.
pub fn assess_risk(input: &ScoreInput, config: &ScoringConfig) -> RiskAssessment {
    let mut factors = Vec::new();

    let cvss_band = if input.cvss >= 9.0 {
        "critical"
    } else if input.cvss >= 7.0 {
        "high"
    } else if input.cvss >= 4.0 {
        "medium"
    } else {
        "low"
    };
    factors.push(ContributingFactor {
        name: "cvss".to_string(),
        detail: format!("CVSS {:.1} ({cvss_band})", input.cvss),
    });

    if input.exploit_available {
        factors.push(ContributingFactor {
            name: "exploit".to_string(),
            detail: "a public exploit is available".to_string(),
        });
    }

    if input.cisa_kev_listed {
        factors.push(ContributingFactor {
            name: "kev".to_string(),
            detail: "listed in the CISA Known Exploited Vulnerabilities catalog".to_string(),
        });
    }

    if input.production_assets > 0 {
        factors.push(ContributingFactor {
            name: "production".to_string(),
            detail: format!("{} production asset(s) affected", input.production_assets),
        });
    }

    if input.fleet_size > 0 {
        let coverage = input.affected_assets as f64 / input.fleet_size as f64;
        if coverage > config.fleet_coverage_high_band {
            factors.push(ContributingFactor {
                name: "fleet_coverage".to_string(),
                detail: format!("{:.0}% of the fleet is affected — widespread exposure", coverage * 100.0),
            });
        } else if coverage > config.fleet_coverage_medium_band {
            factors.push(ContributingFactor {
                name: "fleet_coverage".to_string(),
                detail: format!("{:.0}% of the fleet is affected — significant exposure", coverage * 100.0),
            });
        }
    }

    if input.epss >= config.epss_high_band {
        factors.push(ContributingFactor {
            name: "epss".to_string(),
            detail: format!("EPSS {:.2} — high exploitation probability", input.epss),
        });
    } else if input.epss >= config.epss_medium_band {
        factors.push(ContributingFactor {
            name: "epss".to_string(),
            detail: format!("EPSS {:.2} — moderate exploitation probability", input.epss),
        });
    }

    let recommendation = if input.cisa_kev_listed && input.production_assets > 0 {
        "Patch immediately; this CVE is actively exploited and reaches production.".to_string()
    } else if input.exploit_available && input.cvss >= config.exploit_cvss_override {
        "Patch as a priority; a public exploit exists for a critical-severity flaw.".to_string()
    } else if input.production_assets > 0 {
        "Schedule remediation for production assets within the SLA window.".to_string()
    } else {
        "Remediate on the standard patch cadence.".to_string()
    };

    let time_to_remediate = if input.cisa_kev_listed && input.production_assets > 0 {
        "within 24 hours".to_string()
    } else if input.exploit_available {
        "within 72 hours".to_string()
    } else if input.production_assets > 0 {
        "within 1 week".to_string()
    } else {
        "within the standard patch cycle".to_string()
    };

    RiskAssessment {
        factors,
        recommendation,
        time_to_remediate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assessment_does_not_alter_score_inputs() {
        let input = ScoreInput {
            cvss: 9.8,
            epss: 0.9,
            exploit_available: true,
            cisa_kev_listed: true,
            affected_assets: 60,
            production_assets: 10,
            fleet_size: 100,
        };
        let assessment = assess_risk(&input, &ScoringConfig::default());
        assert!(!assessment.factors.is_empty());
        assert!(assessment.recommendation.contains("immediately"));
        assert_eq!(assessment.time_to_remediate, "within 24 hours");
    }

    #[test]
    fn low_risk_has_standard_recommendation() {
        let input = ScoreInput {
            cvss: 2.0,
            epss: 0.01,
            exploit_available: false,
            cisa_kev_listed: false,
            affected_assets: 0,
            production_assets: 0,
            fleet_size: 100,
        };
        let assessment = assess_risk(&input, &ScoringConfig::default());
        assert_eq!(assessment.recommendation, "Remediate on the standard patch cadence.");
    }
}
