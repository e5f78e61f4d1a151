use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::features::FeatureSet;
use super::student::StudentRecord;
use super::variants::{EscalationThresholds, RiskThresholds};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub const fn label(self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown risk level '{0}'")]
pub struct UnknownRiskLevel(pub String);

impl FromStr for RiskLevel {
    type Err = UnknownRiskLevel;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(RiskLevel::Low),
            "medium" | "moderate" => Ok(RiskLevel::Medium),
            "high" => Ok(RiskLevel::High),
            _ => Err(UnknownRiskLevel(value.to_string())),
        }
    }
}

/// Why a tier was raised above what the score alone implies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Escalation {
    ExcessiveAbsences { absences: f64 },
    LowSentiment { sentiment: f64 },
    LowRecordedGrade { g2: f64 },
    ElevatedAlcoholUse { weekly_sum: u8 },
}

/// Tier from score thresholds only. Each boundary belongs to the lower-risk tier.
pub fn tier_for_score(score: f64, thresholds: &RiskThresholds) -> RiskLevel {
    if score < thresholds.high_below {
        RiskLevel::High
    } else if score < thresholds.medium_below {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Every override condition that holds for these inputs.
pub fn escalations(
    features: &FeatureSet,
    record: Option<&StudentRecord>,
    thresholds: &EscalationThresholds,
) -> Vec<Escalation> {
    let mut reasons = Vec::new();

    if features.absences > thresholds.absences_above {
        reasons.push(Escalation::ExcessiveAbsences {
            absences: features.absences,
        });
    }
    if features.emotional_sentiment < thresholds.sentiment_below {
        reasons.push(Escalation::LowSentiment {
            sentiment: features.emotional_sentiment,
        });
    }
    if let Some(record) = record {
        if record.g2 < thresholds.record_g2_below {
            reasons.push(Escalation::LowRecordedGrade { g2: record.g2 });
        }
        if record.alcohol_sum() > thresholds.record_alcohol_sum_above {
            reasons.push(Escalation::ElevatedAlcoholUse {
                weekly_sum: record.alcohol_sum(),
            });
        }
    }

    reasons
}

/// Score tier, raised to at least medium when any override condition holds. Overrides never
/// lower a tier.
pub fn classify(
    score: f64,
    features: &FeatureSet,
    record: Option<&StudentRecord>,
    risk: &RiskThresholds,
    escalation: &EscalationThresholds,
) -> RiskLevel {
    let tier = tier_for_score(score, risk);
    if tier == RiskLevel::Low && !escalations(features, record, escalation).is_empty() {
        RiskLevel::Medium
    } else {
        tier
    }
}
