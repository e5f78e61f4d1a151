use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::dispatch::Provenance;
use super::engine::PredictionResult;
use super::features::FeatureSet;
use super::risk::RiskLevel;
use super::student::StudentId;
use super::variants::ModelVersion;

/// Identifier wrapper for stored predictions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PredictionId(pub String);

/// Row written to the predictions table: inputs, outputs, and which variant produced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub id: PredictionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_id: Option<StudentId>,
    pub features: FeatureSet,
    pub result: PredictionResult,
    pub model_version: ModelVersion,
    pub provenance: Provenance,
    pub created_at: DateTime<Utc>,
}

/// Storage abstraction for the predictions table.
pub trait PredictionRepository: Send + Sync {
    fn insert(&self, record: PredictionRecord) -> Result<PredictionRecord, RepositoryError>;
    fn history(&self, student_id: &StudentId) -> Result<Vec<PredictionRecord>, RepositoryError>;
    fn recent(&self, limit: usize) -> Result<Vec<PredictionRecord>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Row written to the alerts table when predicted risk is elevated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_id: Option<StudentId>,
    pub prediction_id: PredictionId,
    pub severity: RiskLevel,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl AlertRecord {
    pub fn from_prediction(record: &PredictionRecord, student_label: &str) -> Self {
        let result = &record.result;
        let message = format!(
            "{} is at {} risk: predicted grade {:.2}/20 ({:.0}% confidence, {}). {}",
            student_label,
            result.risk_level,
            result.predicted_score,
            result.confidence_level,
            record.provenance.label(),
            result.intervention_summary
        );

        Self {
            student_id: record.student_id.clone(),
            prediction_id: record.id.clone(),
            severity: result.risk_level,
            message,
            created_at: record.created_at,
        }
    }
}

/// Outbound alert hook (alerts table, e-mail, chat adapters).
pub trait AlertPublisher: Send + Sync {
    fn publish(&self, alert: AlertRecord) -> Result<(), AlertError>;
    fn recent(&self, limit: usize) -> Result<Vec<AlertRecord>, AlertError>;
}

#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    #[error("alert transport unavailable: {0}")]
    Transport(String),
}
