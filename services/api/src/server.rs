use crate::cli::ServeArgs;
use crate::infra::{
    build_dispatcher, load_roster, AppState, InMemoryAlertPublisher,
    InMemoryPredictionRepository, InMemoryStudentDirectory,
};
use crate::routes::with_prediction_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use student_insight::config::AppConfig;
use student_insight::error::AppError;
use student_insight::prediction::PredictionService;
use student_insight::telemetry;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if let Some(url) = args.remote_url.take() {
        let url = url.trim().trim_end_matches('/').to_string();
        config.scoring.remote_url = (!url.is_empty()).then_some(url);
    }
    if let Some(version) = args.model_version.take() {
        config.scoring.model_version = version;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let roster = load_roster(args.students.as_deref())?;
    let student_count = roster.len();
    let directory = Arc::new(InMemoryStudentDirectory::new(roster));
    let repository = Arc::new(InMemoryPredictionRepository::default());
    let alerts = Arc::new(InMemoryAlertPublisher::default());
    let dispatcher = build_dispatcher(&config.scoring)?;
    let prediction_service = Arc::new(PredictionService::new(
        directory,
        repository,
        alerts,
        dispatcher,
        config.scoring.model_version,
    ));

    let app = with_prediction_routes(prediction_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        model_version = %config.scoring.model_version,
        remote = config.scoring.remote_url.as_deref().unwrap_or("none"),
        students = student_count,
        "student insight service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
