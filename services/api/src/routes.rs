use crate::infra::AppState;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use student_insight::error::AppError;
use student_insight::prediction::{
    prediction_router, AlertPublisher, PredictionRepository, PredictionService, RemoteScorer,
    StudentDirectory, StudentId, StudentRecord,
};

pub(crate) fn with_prediction_routes<D, R, A, S>(
    service: Arc<PredictionService<D, R, A, S>>,
) -> Router
where
    D: StudentDirectory + 'static,
    R: PredictionRepository + 'static,
    A: AlertPublisher + 'static,
    S: RemoteScorer + 'static,
{
    let roster = Router::new()
        .route("/api/v1/students", get(students_endpoint::<D, R, A, S>))
        .with_state(service.clone());

    prediction_router(service)
        .merge(roster)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[derive(Debug, Serialize)]
pub(crate) struct StudentSummary {
    pub(crate) student_id: StudentId,
    pub(crate) name: String,
    pub(crate) age: u8,
    pub(crate) g1: f64,
    pub(crate) g2: f64,
    pub(crate) absences: u32,
    pub(crate) attendance_rate: f64,
}

impl From<&StudentRecord> for StudentSummary {
    fn from(record: &StudentRecord) -> Self {
        Self {
            student_id: record.id.clone(),
            name: record.display_name().to_string(),
            age: record.age,
            g1: record.g1,
            g2: record.g2,
            absences: record.absences,
            attendance_rate: record.attendance_rate(),
        }
    }
}

pub(crate) async fn students_endpoint<D, R, A, S>(
    State(service): State<Arc<PredictionService<D, R, A, S>>>,
) -> Result<Json<serde_json::Value>, AppError>
where
    D: StudentDirectory + 'static,
    R: PredictionRepository + 'static,
    A: AlertPublisher + 'static,
    S: RemoteScorer + 'static,
{
    let students: Vec<StudentSummary> = service
        .students()?
        .iter()
        .map(StudentSummary::from)
        .collect();
    Ok(Json(json!({ "students": students })))
}
