use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::confidence::confidence;
use super::features::FeatureSet;
use super::interventions;
use super::risk::{classify, RiskLevel};
use super::scoring::aggregate;
use super::student::StudentRecord;
use super::variants::{ModelVersion, WeightTable};

/// Output of one scoring call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Clamped to [0, 20], two decimals.
    pub predicted_score: f64,
    /// Clamped to [0, 100].
    pub confidence_level: f64,
    pub risk_level: RiskLevel,
    pub intervention_summary: String,
    /// Contribution of each scoring term to the raw score, keyed by
    /// [`ScoreTerm::name`](super::scoring::ScoreTerm::name)
    /// (`academic`, `attendance`, `synergy`, ...). One term may blend several input features, so
    /// keys are term names rather than feature names. Absent for remote results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_contributions: Option<BTreeMap<String, f64>>,
    pub model_version: ModelVersion,
}

/// Stateless evaluator applying one variant's weight table.
#[derive(Debug, Clone, Copy)]
pub struct ScoringEngine {
    version: ModelVersion,
    weights: WeightTable,
}

impl ScoringEngine {
    pub fn new(version: ModelVersion) -> Self {
        Self {
            version,
            weights: version.weights(),
        }
    }

    pub fn version(&self) -> ModelVersion {
        self.version
    }

    pub fn weights(&self) -> &WeightTable {
        &self.weights
    }

    /// Aggregate, estimate confidence, classify, and explain.
    pub fn score(&self, features: &FeatureSet, record: Option<&StudentRecord>) -> PredictionResult {
        let breakdown = aggregate(features, record, &self.weights);
        let predicted_score = breakdown.predicted_score();
        let confidence_level = confidence(features, record.is_some(), &self.weights.confidence);
        let risk_level = classify(
            predicted_score,
            features,
            record,
            &self.weights.risk,
            &self.weights.escalation,
        );
        let intervention_summary = interventions::generate(features, predicted_score, risk_level);

        PredictionResult {
            predicted_score,
            confidence_level,
            risk_level,
            intervention_summary,
            feature_contributions: Some(breakdown.contributions()),
            model_version: self.version,
        }
    }

    /// Whether this variant raises an alert for the given tier.
    pub fn should_alert(&self, risk: RiskLevel) -> bool {
        match risk {
            RiskLevel::High => true,
            RiskLevel::Medium => self.weights.alert_on_medium,
            RiskLevel::Low => false,
        }
    }
}

impl Default for ScoringEngine {
    fn default() -> Self {
        Self::new(ModelVersion::LATEST)
    }
}
