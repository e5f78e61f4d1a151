//! Closed catalog of scoring-formula variants.
//!
//! Every release of the heuristic kept the same term structure and only moved weights, so each
//! variant is pure data consumed by one shared aggregator. Zero weights switch a term off.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ModelVersion {
    #[serde(rename = "v1.0", alias = "v1")]
    V1,
    #[serde(rename = "v2.0", alias = "v2")]
    V2,
    #[serde(rename = "v3.0", alias = "v3")]
    V3,
    #[serde(rename = "v4.0", alias = "v4")]
    V4,
    #[serde(rename = "v5.0", alias = "v5")]
    V5,
    #[serde(rename = "v6.0", alias = "v6")]
    V6,
}

impl ModelVersion {
    pub const LATEST: ModelVersion = ModelVersion::V6;

    pub const ALL: [ModelVersion; 6] = [
        ModelVersion::V1,
        ModelVersion::V2,
        ModelVersion::V3,
        ModelVersion::V4,
        ModelVersion::V5,
        ModelVersion::V6,
    ];

    pub const fn tag(self) -> &'static str {
        match self {
            ModelVersion::V1 => "v1.0",
            ModelVersion::V2 => "v2.0",
            ModelVersion::V3 => "v3.0",
            ModelVersion::V4 => "v4.0",
            ModelVersion::V5 => "v5.0",
            ModelVersion::V6 => "v6.0",
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            ModelVersion::V1 => "prior grades, log study time, absence penalty",
            ModelVersion::V2 => "adds effort, sentiment and participation",
            ModelVersion::V3 => "adds grade trend and sentiment-effort synergy",
            ModelVersion::V4 => "rate-based attendance and student-record demographics",
            ModelVersion::V5 => "adds motivation and stress",
            ModelVersion::V6 => "retuned weights with supplementary analytics",
        }
    }

    pub fn weights(self) -> WeightTable {
        match self {
            ModelVersion::V1 => WeightTable {
                grade_weights: (0.3, 0.5),
                study_log_scale: 1.0,
                attendance: AttendanceTerm::Absences { per_absence: 0.15 },
                effort: PowerTerm::OFF,
                emotional_weight: 0.0,
                participation_weight: 0.0,
                trend: TrendAdjustment::OFF,
                synergy_weight: 0.0,
                motivation_weight: 0.0,
                stress_weight: 0.0,
                demographics: false,
                supplementary_weight: 0.0,
                risk: RiskThresholds::STANDARD,
                escalation: EscalationThresholds::STANDARD,
                confidence: ConfidenceParams::STANDARD,
                alert_on_medium: false,
            },
            ModelVersion::V2 => WeightTable {
                effort: PowerTerm {
                    coefficient: 1.5,
                    exponent: 1.5,
                },
                emotional_weight: 1.0,
                participation_weight: 0.08,
                ..ModelVersion::V1.weights()
            },
            ModelVersion::V3 => WeightTable {
                trend: TrendAdjustment {
                    improving_bonus: 0.5,
                    declining_penalty: 0.5,
                },
                synergy_weight: 0.5,
                ..ModelVersion::V2.weights()
            },
            ModelVersion::V4 => WeightTable {
                attendance: AttendanceTerm::Rate { weight: 2.0 },
                demographics: true,
                alert_on_medium: true,
                ..ModelVersion::V3.weights()
            },
            ModelVersion::V5 => WeightTable {
                motivation_weight: 0.1,
                stress_weight: 1.0,
                ..ModelVersion::V4.weights()
            },
            ModelVersion::V6 => WeightTable {
                grade_weights: (0.25, 0.45),
                study_log_scale: 1.2,
                effort: PowerTerm {
                    coefficient: 2.0,
                    exponent: 1.5,
                },
                emotional_weight: 1.5,
                participation_weight: 0.1,
                supplementary_weight: 1.0,
                ..ModelVersion::V5.weights()
            },
        }
    }
}

impl fmt::Display for ModelVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown model version '{0}'")]
pub struct UnknownModelVersion(pub String);

impl FromStr for ModelVersion {
    type Err = UnknownModelVersion;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "v1" | "v1.0" => Ok(ModelVersion::V1),
            "v2" | "v2.0" => Ok(ModelVersion::V2),
            "v3" | "v3.0" => Ok(ModelVersion::V3),
            "v4" | "v4.0" => Ok(ModelVersion::V4),
            "v5" | "v5.0" => Ok(ModelVersion::V5),
            "v6" | "v6.0" | "latest" => Ok(ModelVersion::V6),
            _ => Err(UnknownModelVersion(value.to_string())),
        }
    }
}

/// Weights and thresholds for one variant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeightTable {
    /// Weights on (g1, g2); the recent grade carries more.
    pub grade_weights: (f64, f64),
    /// Multiplier on `ln(1 + studytime)`.
    pub study_log_scale: f64,
    pub attendance: AttendanceTerm,
    pub effort: PowerTerm,
    pub emotional_weight: f64,
    pub participation_weight: f64,
    pub trend: TrendAdjustment,
    /// Multiplier on `sentiment * effort / 10`.
    pub synergy_weight: f64,
    /// Multiplier on `motivation - 5`.
    pub motivation_weight: f64,
    /// Multiplier on `0.5 - stress`.
    pub stress_weight: f64,
    /// Record-backed age, parental education, family, health, social and alcohol terms.
    pub demographics: bool,
    /// Multiplier on `mean(supplementary) - 0.5`.
    pub supplementary_weight: f64,
    pub risk: RiskThresholds,
    pub escalation: EscalationThresholds,
    pub confidence: ConfidenceParams,
    pub alert_on_medium: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttendanceTerm {
    /// `attendance_rate / 100 * weight`
    Rate { weight: f64 },
    /// `-absences * per_absence`
    Absences { per_absence: f64 },
}

/// `coefficient * (value / 10) ^ exponent`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PowerTerm {
    pub coefficient: f64,
    pub exponent: f64,
}

impl PowerTerm {
    pub const OFF: PowerTerm = PowerTerm {
        coefficient: 0.0,
        exponent: 1.0,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendAdjustment {
    pub improving_bonus: f64,
    pub declining_penalty: f64,
}

impl TrendAdjustment {
    pub const OFF: TrendAdjustment = TrendAdjustment {
        improving_bonus: 0.0,
        declining_penalty: 0.0,
    };
}

/// Score cutoffs. Scores below `high_below` are high risk, below `medium_below` medium.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RiskThresholds {
    pub high_below: f64,
    pub medium_below: f64,
}

impl RiskThresholds {
    pub const STANDARD: RiskThresholds = RiskThresholds {
        high_below: 8.0,
        medium_below: 12.0,
    };
}

/// Conditions that force at least a medium tier regardless of score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EscalationThresholds {
    pub absences_above: f64,
    pub sentiment_below: f64,
    pub record_g2_below: f64,
    pub record_alcohol_sum_above: u8,
}

impl EscalationThresholds {
    pub const STANDARD: EscalationThresholds = EscalationThresholds {
        absences_above: 8.0,
        sentiment_below: 0.3,
        record_g2_below: 8.0,
        record_alcohol_sum_above: 6,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConfidenceParams {
    pub base_with_record: f64,
    pub base_without_record: f64,
    /// Points removed per unit of variance proxy.
    pub variance_penalty: f64,
    /// Points added per participation index point.
    pub participation_boost: f64,
}

impl ConfidenceParams {
    pub const STANDARD: ConfidenceParams = ConfidenceParams {
        base_with_record: 95.0,
        base_without_record: 85.0,
        variance_penalty: 25.0,
        participation_boost: 0.5,
    };
}
