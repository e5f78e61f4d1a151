use std::fmt;

use serde::{Deserialize, Serialize};

/// Named predictor inputs, listed in remote wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    Age,
    Studytime,
    G1,
    G2,
    Absences,
    EffortScore,
    EmotionalSentiment,
    ParticipationIndex,
    FamilySupport,
    HealthScore,
    SocialActivity,
    AlcoholConsumption,
    AttendanceRate,
    MotivationLevel,
    StressLevel,
}

impl FeatureKind {
    pub const ALL: [FeatureKind; 15] = [
        FeatureKind::Age,
        FeatureKind::Studytime,
        FeatureKind::G1,
        FeatureKind::G2,
        FeatureKind::Absences,
        FeatureKind::EffortScore,
        FeatureKind::EmotionalSentiment,
        FeatureKind::ParticipationIndex,
        FeatureKind::FamilySupport,
        FeatureKind::HealthScore,
        FeatureKind::SocialActivity,
        FeatureKind::AlcoholConsumption,
        FeatureKind::AttendanceRate,
        FeatureKind::MotivationLevel,
        FeatureKind::StressLevel,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            FeatureKind::Age => "age",
            FeatureKind::Studytime => "studytime",
            FeatureKind::G1 => "g1",
            FeatureKind::G2 => "g2",
            FeatureKind::Absences => "absences",
            FeatureKind::EffortScore => "effort_score",
            FeatureKind::EmotionalSentiment => "emotional_sentiment",
            FeatureKind::ParticipationIndex => "participation_index",
            FeatureKind::FamilySupport => "family_support",
            FeatureKind::HealthScore => "health_score",
            FeatureKind::SocialActivity => "social_activity",
            FeatureKind::AlcoholConsumption => "alcohol_consumption",
            FeatureKind::AttendanceRate => "attendance_rate",
            FeatureKind::MotivationLevel => "motivation_level",
            FeatureKind::StressLevel => "stress_level",
        }
    }

    /// Inclusive valid range after normalization.
    pub const fn range(self) -> (f64, f64) {
        match self {
            FeatureKind::Age => (10.0, 30.0),
            FeatureKind::Studytime => (0.0, 40.0),
            FeatureKind::G1 | FeatureKind::G2 => (0.0, 20.0),
            FeatureKind::Absences => (0.0, 100.0),
            FeatureKind::EffortScore
            | FeatureKind::ParticipationIndex
            | FeatureKind::MotivationLevel => (1.0, 10.0),
            FeatureKind::EmotionalSentiment | FeatureKind::StressLevel => (0.0, 1.0),
            FeatureKind::FamilySupport | FeatureKind::HealthScore | FeatureKind::SocialActivity => {
                (1.0, 5.0)
            }
            FeatureKind::AlcoholConsumption => (0.0, 5.0),
            FeatureKind::AttendanceRate => (0.0, 100.0),
        }
    }

    /// Neutral value used when neither the caller nor a student record supplies one.
    pub const fn default_value(self) -> f64 {
        match self {
            FeatureKind::Age => 17.0,
            FeatureKind::Studytime => 2.0,
            FeatureKind::G1 | FeatureKind::G2 => 10.0,
            FeatureKind::Absences => 0.0,
            FeatureKind::EffortScore
            | FeatureKind::ParticipationIndex
            | FeatureKind::MotivationLevel => 5.0,
            FeatureKind::EmotionalSentiment | FeatureKind::StressLevel => 0.5,
            FeatureKind::FamilySupport | FeatureKind::HealthScore | FeatureKind::SocialActivity => {
                3.0
            }
            FeatureKind::AlcoholConsumption => 1.0,
            FeatureKind::AttendanceRate => 100.0,
        }
    }

    /// Clamp into range; non-finite values collapse to the default.
    pub fn clamp(self, value: f64) -> f64 {
        if !value.is_finite() {
            return self.default_value();
        }
        let (min, max) = self.range();
        value.clamp(min, max)
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Caller-supplied, possibly partial feature values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureInput {
    pub age: Option<f64>,
    pub studytime: Option<f64>,
    pub g1: Option<f64>,
    pub g2: Option<f64>,
    pub absences: Option<f64>,
    pub effort_score: Option<f64>,
    pub emotional_sentiment: Option<f64>,
    pub participation_index: Option<f64>,
    pub family_support: Option<f64>,
    pub health_score: Option<f64>,
    pub social_activity: Option<f64>,
    pub alcohol_consumption: Option<f64>,
    pub attendance_rate: Option<f64>,
    pub motivation_level: Option<f64>,
    pub stress_level: Option<f64>,
}

impl FeatureInput {
    pub fn get(&self, kind: FeatureKind) -> Option<f64> {
        match kind {
            FeatureKind::Age => self.age,
            FeatureKind::Studytime => self.studytime,
            FeatureKind::G1 => self.g1,
            FeatureKind::G2 => self.g2,
            FeatureKind::Absences => self.absences,
            FeatureKind::EffortScore => self.effort_score,
            FeatureKind::EmotionalSentiment => self.emotional_sentiment,
            FeatureKind::ParticipationIndex => self.participation_index,
            FeatureKind::FamilySupport => self.family_support,
            FeatureKind::HealthScore => self.health_score,
            FeatureKind::SocialActivity => self.social_activity,
            FeatureKind::AlcoholConsumption => self.alcohol_consumption,
            FeatureKind::AttendanceRate => self.attendance_rate,
            FeatureKind::MotivationLevel => self.motivation_level,
            FeatureKind::StressLevel => self.stress_level,
        }
    }

    pub fn set(&mut self, kind: FeatureKind, value: f64) {
        let slot = match kind {
            FeatureKind::Age => &mut self.age,
            FeatureKind::Studytime => &mut self.studytime,
            FeatureKind::G1 => &mut self.g1,
            FeatureKind::G2 => &mut self.g2,
            FeatureKind::Absences => &mut self.absences,
            FeatureKind::EffortScore => &mut self.effort_score,
            FeatureKind::EmotionalSentiment => &mut self.emotional_sentiment,
            FeatureKind::ParticipationIndex => &mut self.participation_index,
            FeatureKind::FamilySupport => &mut self.family_support,
            FeatureKind::HealthScore => &mut self.health_score,
            FeatureKind::SocialActivity => &mut self.social_activity,
            FeatureKind::AlcoholConsumption => &mut self.alcohol_consumption,
            FeatureKind::AttendanceRate => &mut self.attendance_rate,
            FeatureKind::MotivationLevel => &mut self.motivation_level,
            FeatureKind::StressLevel => &mut self.stress_level,
        };
        *slot = Some(value);
    }

    pub fn with(mut self, kind: FeatureKind, value: f64) -> Self {
        self.set(kind, value);
        self
    }

    /// Build a fully populated input from a wire-ordered vector. Extra elements are ignored.
    pub fn from_vector(values: &[f64]) -> Self {
        let mut input = Self::default();
        for (kind, value) in FeatureKind::ALL.iter().zip(values) {
            input.set(*kind, *value);
        }
        input
    }
}

/// Complete, range-checked feature vector produced by the normalizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSet {
    pub age: f64,
    pub studytime: f64,
    pub g1: f64,
    pub g2: f64,
    pub absences: f64,
    pub effort_score: f64,
    pub emotional_sentiment: f64,
    pub participation_index: f64,
    pub family_support: f64,
    pub health_score: f64,
    pub social_activity: f64,
    pub alcohol_consumption: f64,
    pub attendance_rate: f64,
    pub motivation_level: f64,
    pub stress_level: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub supplementary: Vec<SupplementarySignal>,
}

impl FeatureSet {
    pub fn get(&self, kind: FeatureKind) -> f64 {
        match kind {
            FeatureKind::Age => self.age,
            FeatureKind::Studytime => self.studytime,
            FeatureKind::G1 => self.g1,
            FeatureKind::G2 => self.g2,
            FeatureKind::Absences => self.absences,
            FeatureKind::EffortScore => self.effort_score,
            FeatureKind::EmotionalSentiment => self.emotional_sentiment,
            FeatureKind::ParticipationIndex => self.participation_index,
            FeatureKind::FamilySupport => self.family_support,
            FeatureKind::HealthScore => self.health_score,
            FeatureKind::SocialActivity => self.social_activity,
            FeatureKind::AlcoholConsumption => self.alcohol_consumption,
            FeatureKind::AttendanceRate => self.attendance_rate,
            FeatureKind::MotivationLevel => self.motivation_level,
            FeatureKind::StressLevel => self.stress_level,
        }
    }

    /// The 15-element vector sent to a remote scorer.
    pub fn to_vector(&self) -> [f64; 15] {
        FeatureKind::ALL.map(|kind| self.get(kind))
    }

    pub fn is_within_ranges(&self) -> bool {
        FeatureKind::ALL.iter().all(|kind| {
            let (min, max) = kind.range();
            let value = self.get(*kind);
            value >= min && value <= max
        }) && self
            .supplementary
            .iter()
            .all(|signal| (0.0..=1.0).contains(&signal.value))
    }
}

/// Free-form analytic captured by the dashboard form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnalyticInput {
    /// A reading for one of the canonical features.
    Known { kind: FeatureKind, value: f64 },
    /// Anything else, carried with the scale it was measured on.
    Generic {
        label: String,
        value: f64,
        scale: GenericScale,
    },
}

/// Declared scale for an unclassified analytic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GenericScale {
    /// Already in [0, 1].
    Unit,
    /// 0 to 10.
    Decile,
    /// 0 to 100.
    Percent,
    Raw { min: f64, max: f64 },
}

impl GenericScale {
    /// Map a reading onto [0, 1]. Degenerate raw ranges read as the midpoint.
    pub fn to_unit(self, value: f64) -> f64 {
        if !value.is_finite() {
            return 0.5;
        }
        let unit = match self {
            GenericScale::Unit => value,
            GenericScale::Decile => value / 10.0,
            GenericScale::Percent => value / 100.0,
            GenericScale::Raw { min, max } => {
                let span = max - min;
                if !span.is_finite() || span.abs() < f64::EPSILON {
                    return 0.5;
                }
                (value - min) / span
            }
        };
        unit.clamp(0.0, 1.0)
    }
}

/// Generic analytic after scaling onto [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplementarySignal {
    pub label: String,
    pub value: f64,
}
