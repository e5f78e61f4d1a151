use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

use super::common::{
    features, spawn_server, steady_input, struggling_input, stub_dispatcher, StubBehavior,
    StubScorer,
};
use crate::prediction::dispatch::{
    map_remote, Dispatcher, FallbackReason, Provenance, ScoredPrediction,
    DEFAULT_REMOTE_CONFIDENCE,
};
use crate::prediction::engine::ScoringEngine;
use crate::prediction::remote::{HttpRemoteScorer, RemoteResponse, RemoteScorerError};
use crate::prediction::risk::RiskLevel;

fn full_response() -> RemoteResponse {
    RemoteResponse {
        predicted_score: Some(13.25),
        prediction: None,
        confidence: Some(91.0),
        risk_level: Some("Medium".to_string()),
        intervention: Some("Keep weekly check-ins going.".to_string()),
    }
}

#[tokio::test]
async fn remote_answer_is_used_verbatim() {
    let scorer = StubScorer::new(StubBehavior::Respond(full_response()));
    let dispatcher = stub_dispatcher(scorer.clone());
    let engine = ScoringEngine::default();

    let scored = dispatcher
        .dispatch(&features(&steady_input()), None, &engine, true)
        .await;

    assert_eq!(scored.provenance(), Provenance::Remote);
    assert_eq!(scored.backend_status(), "scored by remote backend");
    let result = scored.result();
    assert_eq!(result.predicted_score, 13.25);
    assert_eq!(result.confidence_level, 91.0);
    assert_eq!(result.risk_level, RiskLevel::Medium);
    assert_eq!(result.intervention_summary, "Keep weekly check-ins going.");
    assert!(result.feature_contributions.is_none());
    assert_eq!(scorer.calls(), 1);
}

#[test]
fn sparse_remote_answer_is_completed_locally() {
    let engine = ScoringEngine::default();
    let features = features(&struggling_input());
    let response = RemoteResponse {
        prediction: Some(6.5),
        ..RemoteResponse::default()
    };

    let result = map_remote(response, &features, &engine).expect("score present");

    assert_eq!(result.predicted_score, 6.5);
    assert_eq!(result.confidence_level, DEFAULT_REMOTE_CONFIDENCE);
    assert_eq!(result.risk_level, RiskLevel::High);
    assert!(result
        .intervention_summary
        .starts_with("Recommended interventions: Plan remedial sessions: projected grade 6.5/20"));
}

#[test]
fn remote_values_are_clamped_into_range() {
    let engine = ScoringEngine::default();
    let features = features(&steady_input());
    let response = RemoteResponse {
        predicted_score: Some(27.0),
        confidence: Some(140.0),
        ..RemoteResponse::default()
    };

    let result = map_remote(response, &features, &engine).expect("score present");

    assert_eq!(result.predicted_score, 20.0);
    assert_eq!(result.confidence_level, 100.0);
    assert_eq!(result.risk_level, RiskLevel::Low);
}

#[test]
fn remote_answer_without_score_is_rejected() {
    let engine = ScoringEngine::default();
    let response = RemoteResponse {
        confidence: Some(70.0),
        ..RemoteResponse::default()
    };

    let err = map_remote(response, &features(&steady_input()), &engine).unwrap_err();
    assert!(matches!(err, RemoteScorerError::MissingScore));
}

#[tokio::test]
async fn server_error_falls_back_to_local_engine() {
    let dispatcher = stub_dispatcher(StubScorer::new(StubBehavior::Fail(500)));
    let engine = ScoringEngine::default();
    let features = features(&struggling_input());

    let scored = dispatcher.dispatch(&features, None, &engine, true).await;

    assert_eq!(scored.provenance(), Provenance::Fallback);
    assert!(matches!(
        scored.fallback_reason(),
        Some(FallbackReason::Failed(RemoteScorerError::Status(500)))
    ));
    assert_eq!(
        scored.backend_status(),
        "could not reach remote backend (remote scorer returned HTTP 500); scored locally"
    );
    assert_eq!(scored.into_result(), engine.score(&features, None));
}

#[tokio::test]
async fn hung_remote_times_out_into_fallback() {
    let scorer = StubScorer::new(StubBehavior::Hang);
    let dispatcher = Dispatcher::new(Some(Arc::new(scorer)), Duration::from_millis(50));
    let engine = ScoringEngine::default();

    let scored = dispatcher
        .dispatch(&features(&steady_input()), None, &engine, true)
        .await;

    assert!(matches!(
        scored.fallback_reason(),
        Some(FallbackReason::Failed(RemoteScorerError::Timeout(_)))
    ));
    assert_eq!(scored.result().risk_level, RiskLevel::Low);
}

#[tokio::test]
async fn cancellation_abandons_the_remote_call() {
    let scorer = StubScorer::new(StubBehavior::Hang);
    let dispatcher = Dispatcher::new(Some(Arc::new(scorer)), Duration::from_secs(30));
    let engine = ScoringEngine::default();

    let scored = dispatcher
        .dispatch_until(&features(&steady_input()), None, &engine, true, async {})
        .await;

    assert!(matches!(
        scored.fallback_reason(),
        Some(FallbackReason::Cancelled)
    ));
    assert_eq!(scored.provenance(), Provenance::Fallback);
}

#[tokio::test]
async fn local_paths_skip_the_remote_entirely() {
    let scorer = StubScorer::new(StubBehavior::Respond(full_response()));
    let dispatcher = stub_dispatcher(scorer.clone());
    let engine = ScoringEngine::default();
    let features = features(&steady_input());

    let disabled = dispatcher.dispatch(&features, None, &engine, false).await;
    assert!(matches!(
        disabled.fallback_reason(),
        Some(FallbackReason::Disabled)
    ));
    assert_eq!(disabled.backend_status(), "scored locally");
    assert_eq!(scorer.calls(), 0);

    let unconfigured = Dispatcher::<StubScorer>::local_only()
        .dispatch(&features, None, &engine, true)
        .await;
    assert!(matches!(
        unconfigured.fallback_reason(),
        Some(FallbackReason::NotConfigured)
    ));
    assert!(unconfigured.result().feature_contributions.is_some());
}

#[tokio::test]
async fn http_remote_success_is_tagged_remote() {
    let backend = Router::new().route(
        "/predict",
        post(|Json(body): Json<Value>| async move {
            let count = body["features"].as_array().map(Vec::len).unwrap_or(0);
            Json(json!({
                "predicted_score": 15.5,
                "confidence": 88.0,
                "risk_level": "low",
                "intervention": format!("received {count} features"),
            }))
        }),
    );
    let base = spawn_server(backend).await;
    let scorer = HttpRemoteScorer::new(&base, Duration::from_secs(5)).expect("client builds");
    let dispatcher = Dispatcher::new(Some(Arc::new(scorer)), Duration::from_secs(5));

    let scored = dispatcher
        .dispatch(&features(&steady_input()), None, &ScoringEngine::default(), true)
        .await;

    assert_eq!(scored.provenance(), Provenance::Remote);
    let result = scored.into_result();
    assert_eq!(result.predicted_score, 15.5);
    assert_eq!(result.intervention_summary, "received 15 features");
}

#[tokio::test]
async fn http_remote_failures_all_fall_back() {
    let backend = Router::new()
        .route(
            "/broken/predict",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        )
        .route("/garbled/predict", post(|| async { "definitely not json" }))
        .route(
            "/slow/predict",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(json!({ "predicted_score": 12.0 }))
            }),
        );
    let base = spawn_server(backend).await;
    let engine = ScoringEngine::default();
    let features = features(&steady_input());
    let expected = engine.score(&features, None);

    for (path, timeout) in [
        ("broken", Duration::from_secs(5)),
        ("garbled", Duration::from_secs(5)),
        ("slow", Duration::from_millis(200)),
    ] {
        let scorer = HttpRemoteScorer::new(&format!("{base}/{path}"), timeout)
            .expect("client builds");
        let dispatcher = Dispatcher::new(Some(Arc::new(scorer)), timeout);

        let scored = dispatcher.dispatch(&features, None, &engine, true).await;

        assert_eq!(scored.provenance(), Provenance::Fallback, "{path}");
        match (path, scored.fallback_reason()) {
            ("broken", Some(FallbackReason::Failed(RemoteScorerError::Status(500)))) => {}
            ("garbled", Some(FallbackReason::Failed(RemoteScorerError::InvalidBody(_)))) => {}
            ("slow", Some(FallbackReason::Failed(RemoteScorerError::Timeout(_)))) => {}
            (_, other) => panic!("{path}: unexpected fallback reason {other:?}"),
        }
        assert_eq!(scored.into_result(), expected);
    }
}

#[tokio::test]
async fn unreachable_remote_falls_back() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);

    let scorer =
        HttpRemoteScorer::new(&format!("http://{addr}"), Duration::from_secs(2)).expect("client");
    let dispatcher = Dispatcher::new(Some(Arc::new(scorer)), Duration::from_secs(2));

    let scored = dispatcher
        .dispatch(&features(&steady_input()), None, &ScoringEngine::default(), true)
        .await;

    assert!(matches!(scored, ScoredPrediction::LocalFallback { .. }));
    assert!(scored
        .backend_status()
        .starts_with("could not reach remote backend"));
}
