use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::engine::ScoringEngine;
use super::features::FeatureInput;
use super::normalizer::normalize;
use super::remote::{RemoteRequest, RemoteResponse, RemoteScorer};
use super::repository::{AlertPublisher, PredictionRepository};
use super::service::{PredictionRequest, PredictionService, PredictionServiceError, PredictionView};
use super::student::{StudentDirectory, StudentId};
use super::variants::{ModelVersion, WeightTable};

const DEFAULT_LIST_LIMIT: usize = 50;

/// Router exposing prediction, history, alert, and model-catalog endpoints plus the remote
/// scorer contract at `/predict`.
pub fn prediction_router<D, R, A, S>(service: Arc<PredictionService<D, R, A, S>>) -> Router
where
    D: StudentDirectory + 'static,
    R: PredictionRepository + 'static,
    A: AlertPublisher + 'static,
    S: RemoteScorer + 'static,
{
    Router::new()
        .route(
            "/api/v1/predictions",
            post(predict_handler::<D, R, A, S>).get(recent_predictions_handler::<D, R, A, S>),
        )
        .route(
            "/api/v1/students/:student_id/predictions",
            get(history_handler::<D, R, A, S>),
        )
        .route("/api/v1/alerts", get(alerts_handler::<D, R, A, S>))
        .route("/api/v1/models", get(models_handler))
        .route("/predict", post(remote_contract_handler::<D, R, A, S>))
        .with_state(service)
}

pub(crate) async fn predict_handler<D, R, A, S>(
    State(service): State<Arc<PredictionService<D, R, A, S>>>,
    Json(request): Json<PredictionRequest>,
) -> Response
where
    D: StudentDirectory + 'static,
    R: PredictionRepository + 'static,
    A: AlertPublisher + 'static,
    S: RemoteScorer + 'static,
{
    match service.predict(request).await {
        Ok(outcome) => (StatusCode::CREATED, Json(outcome.view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn history_handler<D, R, A, S>(
    State(service): State<Arc<PredictionService<D, R, A, S>>>,
    Path(student_id): Path<String>,
) -> Response
where
    D: StudentDirectory + 'static,
    R: PredictionRepository + 'static,
    A: AlertPublisher + 'static,
    S: RemoteScorer + 'static,
{
    let id = StudentId(student_id);
    match service.history(&id) {
        Ok(records) => {
            let views: Vec<PredictionView> = records
                .iter()
                .map(|record| PredictionView::from_record(record, None, false))
                .collect();
            let payload = json!({
                "student_id": id.0,
                "predictions": views,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct LimitQuery {
    #[serde(default)]
    pub(crate) limit: Option<usize>,
}

pub(crate) async fn recent_predictions_handler<D, R, A, S>(
    State(service): State<Arc<PredictionService<D, R, A, S>>>,
    Query(query): Query<LimitQuery>,
) -> Response
where
    D: StudentDirectory + 'static,
    R: PredictionRepository + 'static,
    A: AlertPublisher + 'static,
    S: RemoteScorer + 'static,
{
    match service.recent_predictions(query.limit.unwrap_or(DEFAULT_LIST_LIMIT)) {
        Ok(records) => {
            let views: Vec<PredictionView> = records
                .iter()
                .map(|record| PredictionView::from_record(record, None, false))
                .collect();
            (StatusCode::OK, Json(json!({ "predictions": views }))).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn alerts_handler<D, R, A, S>(
    State(service): State<Arc<PredictionService<D, R, A, S>>>,
    Query(query): Query<LimitQuery>,
) -> Response
where
    D: StudentDirectory + 'static,
    R: PredictionRepository + 'static,
    A: AlertPublisher + 'static,
    S: RemoteScorer + 'static,
{
    match service.recent_alerts(query.limit.unwrap_or(DEFAULT_LIST_LIMIT)) {
        Ok(alerts) => (StatusCode::OK, Json(json!({ "alerts": alerts }))).into_response(),
        Err(error) => error_response(error),
    }
}

/// Catalog entry describing one scoring variant.
#[derive(Debug, Clone, Serialize)]
pub struct ModelDescriptor {
    pub version: ModelVersion,
    pub description: &'static str,
    pub latest: bool,
    pub weights: WeightTable,
}

pub fn model_catalog() -> Vec<ModelDescriptor> {
    ModelVersion::ALL
        .iter()
        .map(|version| ModelDescriptor {
            version: *version,
            description: version.description(),
            latest: *version == ModelVersion::LATEST,
            weights: version.weights(),
        })
        .collect()
}

pub(crate) async fn models_handler() -> Json<Vec<ModelDescriptor>> {
    Json(model_catalog())
}

/// Serve the remote-scorer contract from the local engine so one instance can back another.
pub(crate) async fn remote_contract_handler<D, R, A, S>(
    State(service): State<Arc<PredictionService<D, R, A, S>>>,
    Json(request): Json<RemoteRequest>,
) -> Json<RemoteResponse>
where
    D: StudentDirectory + 'static,
    R: PredictionRepository + 'static,
    A: AlertPublisher + 'static,
    S: RemoteScorer + 'static,
{
    let features = normalize(&FeatureInput::from_vector(&request.features), &[], None);
    let result = ScoringEngine::new(service.default_version()).score(&features, None);

    Json(RemoteResponse {
        predicted_score: Some(result.predicted_score),
        prediction: None,
        confidence: Some(result.confidence_level),
        risk_level: Some(result.risk_level.label().to_string()),
        intervention: Some(result.intervention_summary),
    })
}

fn error_response(error: PredictionServiceError) -> Response {
    let status = match &error {
        PredictionServiceError::UnknownStudent(_) => StatusCode::NOT_FOUND,
        PredictionServiceError::Directory(_)
        | PredictionServiceError::Repository(_)
        | PredictionServiceError::Alert(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({ "error": error.to_string() });
    (status, Json(payload)).into_response()
}
