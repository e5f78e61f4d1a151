use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::features::FeatureSet;
use super::student::StudentRecord;
use super::variants::{AttendanceTerm, WeightTable};

pub const SCORE_RANGE: (f64, f64) = (0.0, 20.0);

const OPTIMAL_AGE: (f64, f64) = (15.0, 18.0);
const OPTIMAL_AGE_BONUS: f64 = 0.3;
const PARENTAL_EDUCATION_WEIGHT: f64 = 0.15;
const FAMILY_RELATIONSHIP_WEIGHT: f64 = 0.2;
const HEALTH_WEIGHT: f64 = 0.15;
const SOCIAL_BALANCE_PEAK: f64 = 0.4;
const SOCIAL_BALANCE_FALLOFF: f64 = 0.2;
const ALCOHOL_WEIGHT: f64 = 0.2;

/// Named additive term of the heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreTerm {
    Academic,
    StudyTime,
    Attendance,
    Effort,
    Emotional,
    Participation,
    Trend,
    Synergy,
    Motivation,
    Stress,
    AgeBand,
    ParentalEducation,
    FamilyRelationship,
    Health,
    SocialBalance,
    Alcohol,
    Supplementary,
}

impl ScoreTerm {
    pub const fn name(self) -> &'static str {
        match self {
            ScoreTerm::Academic => "academic",
            ScoreTerm::StudyTime => "study_time",
            ScoreTerm::Attendance => "attendance",
            ScoreTerm::Effort => "effort",
            ScoreTerm::Emotional => "emotional",
            ScoreTerm::Participation => "participation",
            ScoreTerm::Trend => "trend",
            ScoreTerm::Synergy => "synergy",
            ScoreTerm::Motivation => "motivation",
            ScoreTerm::Stress => "stress",
            ScoreTerm::AgeBand => "age_band",
            ScoreTerm::ParentalEducation => "parental_education",
            ScoreTerm::FamilyRelationship => "family_relationship",
            ScoreTerm::Health => "health",
            ScoreTerm::SocialBalance => "social_balance",
            ScoreTerm::Alcohol => "alcohol",
            ScoreTerm::Supplementary => "supplementary",
        }
    }
}

/// Discrete contribution to the raw score, kept for explainability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub term: ScoreTerm,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreBreakdown {
    /// Unbounded sum of every active term.
    pub raw: f64,
    pub components: Vec<ScoreComponent>,
}

impl ScoreBreakdown {
    /// Raw score clamped to the grade scale and rounded to two decimals.
    pub fn predicted_score(&self) -> f64 {
        bounded_score(self.raw)
    }

    pub fn contributions(&self) -> BTreeMap<String, f64> {
        self.components
            .iter()
            .map(|component| {
                (
                    component.term.name().to_string(),
                    round_to(component.value, 4),
                )
            })
            .collect()
    }
}

pub fn bounded_score(raw: f64) -> f64 {
    let (min, max) = SCORE_RANGE;
    if !raw.is_finite() {
        return min;
    }
    round_to(raw.clamp(min, max), 2)
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Weighted sum of every term the variant enables. Pure and deterministic; bounding is left to
/// [`ScoreBreakdown::predicted_score`].
pub fn aggregate(
    features: &FeatureSet,
    record: Option<&StudentRecord>,
    weights: &WeightTable,
) -> ScoreBreakdown {
    let mut components = Vec::new();
    let mut push = |term: ScoreTerm, value: f64| {
        components.push(ScoreComponent { term, value });
    };

    let (w1, w2) = weights.grade_weights;
    push(ScoreTerm::Academic, w1 * features.g1 + w2 * features.g2);

    if weights.study_log_scale != 0.0 {
        push(
            ScoreTerm::StudyTime,
            (1.0 + features.studytime).ln() * weights.study_log_scale,
        );
    }

    let attendance = match weights.attendance {
        AttendanceTerm::Rate { weight } => features.attendance_rate / 100.0 * weight,
        AttendanceTerm::Absences { per_absence } => -features.absences * per_absence,
    };
    push(ScoreTerm::Attendance, attendance);

    if weights.effort.coefficient != 0.0 {
        push(
            ScoreTerm::Effort,
            weights.effort.coefficient * (features.effort_score / 10.0).powf(weights.effort.exponent),
        );
    }

    if weights.emotional_weight != 0.0 {
        push(
            ScoreTerm::Emotional,
            features.emotional_sentiment * weights.emotional_weight,
        );
    }

    if weights.participation_weight != 0.0 {
        push(
            ScoreTerm::Participation,
            features.participation_index * weights.participation_weight,
        );
    }

    if weights.trend.improving_bonus != 0.0 || weights.trend.declining_penalty != 0.0 {
        let trend = if features.g2 > features.g1 {
            weights.trend.improving_bonus
        } else if features.g2 < features.g1 {
            -weights.trend.declining_penalty
        } else {
            0.0
        };
        push(ScoreTerm::Trend, trend);
    }

    if weights.synergy_weight != 0.0 {
        push(
            ScoreTerm::Synergy,
            features.emotional_sentiment * features.effort_score / 10.0 * weights.synergy_weight,
        );
    }

    if weights.motivation_weight != 0.0 {
        push(
            ScoreTerm::Motivation,
            (features.motivation_level - 5.0) * weights.motivation_weight,
        );
    }

    if weights.stress_weight != 0.0 {
        push(
            ScoreTerm::Stress,
            (0.5 - features.stress_level) * weights.stress_weight,
        );
    }

    if let (true, Some(record)) = (weights.demographics, record) {
        let (youngest, oldest) = OPTIMAL_AGE;
        let age_bonus = if features.age >= youngest && features.age <= oldest {
            OPTIMAL_AGE_BONUS
        } else {
            0.0
        };
        push(ScoreTerm::AgeBand, age_bonus);
        push(
            ScoreTerm::ParentalEducation,
            record.parental_education() * PARENTAL_EDUCATION_WEIGHT,
        );
        push(
            ScoreTerm::FamilyRelationship,
            (features.family_support - 3.0) * FAMILY_RELATIONSHIP_WEIGHT,
        );
        push(ScoreTerm::Health, (features.health_score - 3.0) * HEALTH_WEIGHT);
        push(
            ScoreTerm::SocialBalance,
            SOCIAL_BALANCE_PEAK - SOCIAL_BALANCE_FALLOFF * (features.social_activity - 3.0).abs(),
        );
        push(
            ScoreTerm::Alcohol,
            -features.alcohol_consumption * ALCOHOL_WEIGHT,
        );
    }

    if weights.supplementary_weight != 0.0 && !features.supplementary.is_empty() {
        let mean = features
            .supplementary
            .iter()
            .map(|signal| signal.value)
            .sum::<f64>()
            / features.supplementary.len() as f64;
        push(
            ScoreTerm::Supplementary,
            (mean - 0.5) * weights.supplementary_weight,
        );
    }

    let raw = components.iter().map(|component| component.value).sum();
    ScoreBreakdown { raw, components }
}
