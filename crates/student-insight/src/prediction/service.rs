use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::dispatch::{Dispatcher, Provenance};
use super::engine::ScoringEngine;
use super::features::{AnalyticInput, FeatureInput};
use super::normalizer::normalize;
use super::remote::RemoteScorer;
use super::repository::{
    AlertError, AlertPublisher, AlertRecord, PredictionId, PredictionRecord, PredictionRepository,
    RepositoryError,
};
use super::risk::RiskLevel;
use super::student::{StudentDirectory, StudentDirectoryError, StudentId, StudentRecord};
use super::variants::ModelVersion;

/// Dashboard request: a described student, optionally backed by a stored record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRequest {
    #[serde(default)]
    pub student_id: Option<StudentId>,
    #[serde(default)]
    pub features: FeatureInput,
    #[serde(default)]
    pub analytics: Vec<AnalyticInput>,
    #[serde(default)]
    pub model_version: Option<ModelVersion>,
    #[serde(default = "default_use_remote")]
    pub use_remote: bool,
}

fn default_use_remote() -> bool {
    true
}

impl PredictionRequest {
    pub fn for_features(features: FeatureInput) -> Self {
        Self {
            student_id: None,
            features,
            analytics: Vec::new(),
            model_version: None,
            use_remote: true,
        }
    }
}

/// Persisted prediction plus what the caller needs to display it.
#[derive(Debug, Clone)]
pub struct PredictionOutcome {
    pub record: PredictionRecord,
    pub backend_status: String,
    pub alert: Option<AlertRecord>,
}

impl PredictionOutcome {
    pub fn view(&self) -> PredictionView {
        PredictionView::from_record(
            &self.record,
            Some(self.backend_status.clone()),
            self.alert.is_some(),
        )
    }
}

/// Flattened prediction as exposed over HTTP.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionView {
    pub prediction_id: PredictionId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_id: Option<StudentId>,
    pub predicted_score: f64,
    pub confidence_level: f64,
    pub risk_level: RiskLevel,
    pub intervention_summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_contributions: Option<BTreeMap<String, f64>>,
    pub model_version: ModelVersion,
    pub provenance: Provenance,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_status: Option<String>,
    pub alert_raised: bool,
    pub created_at: DateTime<Utc>,
}

impl PredictionView {
    pub fn from_record(
        record: &PredictionRecord,
        backend_status: Option<String>,
        alert_raised: bool,
    ) -> Self {
        Self {
            prediction_id: record.id.clone(),
            student_id: record.student_id.clone(),
            predicted_score: record.result.predicted_score,
            confidence_level: record.result.confidence_level,
            risk_level: record.result.risk_level,
            intervention_summary: record.result.intervention_summary.clone(),
            feature_contributions: record.result.feature_contributions.clone(),
            model_version: record.model_version,
            provenance: record.provenance,
            backend_status,
            alert_raised,
            created_at: record.created_at,
        }
    }
}

/// Caller side of the scoring core: resolves students, dispatches, persists, and alerts.
pub struct PredictionService<D, R, A, S> {
    directory: Arc<D>,
    repository: Arc<R>,
    alerts: Arc<A>,
    dispatcher: Arc<Dispatcher<S>>,
    default_version: ModelVersion,
}

static PREDICTION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_prediction_id() -> PredictionId {
    let id = PREDICTION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    PredictionId(format!("pred-{id:06}"))
}

impl<D, R, A, S> PredictionService<D, R, A, S>
where
    D: StudentDirectory + 'static,
    R: PredictionRepository + 'static,
    A: AlertPublisher + 'static,
    S: RemoteScorer + 'static,
{
    pub fn new(
        directory: Arc<D>,
        repository: Arc<R>,
        alerts: Arc<A>,
        dispatcher: Dispatcher<S>,
        default_version: ModelVersion,
    ) -> Self {
        Self {
            directory,
            repository,
            alerts,
            dispatcher: Arc::new(dispatcher),
            default_version,
        }
    }

    pub fn default_version(&self) -> ModelVersion {
        self.default_version
    }

    pub fn has_remote(&self) -> bool {
        self.dispatcher.has_remote()
    }

    /// Score a student, store the prediction, and raise an alert when the tier warrants one.
    ///
    /// Only lookup and storage failures are errors. An alert that cannot be published is logged
    /// and the outcome comes back with `alert: None`.
    pub async fn predict(
        &self,
        request: PredictionRequest,
    ) -> Result<PredictionOutcome, PredictionServiceError> {
        let PredictionRequest {
            student_id,
            features,
            analytics,
            model_version,
            use_remote,
        } = request;

        let student = match &student_id {
            Some(id) => Some(self.resolve_student(id)?),
            None => None,
        };

        let engine = ScoringEngine::new(model_version.unwrap_or(self.default_version));
        let features = normalize(&features, &analytics, student.as_ref());
        let scored = self
            .dispatcher
            .dispatch(&features, student.as_ref(), &engine, use_remote)
            .await;

        let backend_status = scored.backend_status();
        let provenance = scored.provenance();
        let record = PredictionRecord {
            id: next_prediction_id(),
            student_id,
            features,
            result: scored.into_result(),
            model_version: engine.version(),
            provenance,
            created_at: Utc::now(),
        };
        let stored = self.repository.insert(record)?;

        let alert = if engine.should_alert(stored.result.risk_level) {
            let label = student
                .as_ref()
                .map(StudentRecord::display_name)
                .unwrap_or("Unidentified student");
            let alert = AlertRecord::from_prediction(&stored, label);
            match self.alerts.publish(alert.clone()) {
                Ok(()) => {
                    info!(
                        prediction = %stored.id.0,
                        severity = %alert.severity,
                        "risk alert raised"
                    );
                    Some(alert)
                }
                // The prediction is already stored, so report it without the alert.
                Err(error) => {
                    warn!(
                        prediction = %stored.id.0,
                        %error,
                        "risk alert could not be published"
                    );
                    None
                }
            }
        } else {
            None
        };

        Ok(PredictionOutcome {
            record: stored,
            backend_status,
            alert,
        })
    }

    pub fn history(
        &self,
        student_id: &StudentId,
    ) -> Result<Vec<PredictionRecord>, PredictionServiceError> {
        self.resolve_student(student_id)?;
        Ok(self.repository.history(student_id)?)
    }

    /// Most recent predictions across all students, newest first.
    pub fn recent_predictions(
        &self,
        limit: usize,
    ) -> Result<Vec<PredictionRecord>, PredictionServiceError> {
        Ok(self.repository.recent(limit)?)
    }

    pub fn recent_alerts(&self, limit: usize) -> Result<Vec<AlertRecord>, PredictionServiceError> {
        Ok(self.alerts.recent(limit)?)
    }

    pub fn students(&self) -> Result<Vec<StudentRecord>, PredictionServiceError> {
        Ok(self.directory.list()?)
    }

    fn resolve_student(&self, id: &StudentId) -> Result<StudentRecord, PredictionServiceError> {
        self.directory
            .fetch(id)?
            .ok_or_else(|| PredictionServiceError::UnknownStudent(id.clone()))
    }
}

/// Error raised by the prediction service. Scoring itself never fails.
#[derive(Debug, thiserror::Error)]
pub enum PredictionServiceError {
    #[error("unknown student '{0}'")]
    UnknownStudent(StudentId),
    #[error(transparent)]
    Directory(#[from] StudentDirectoryError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Alert(#[from] AlertError),
}
