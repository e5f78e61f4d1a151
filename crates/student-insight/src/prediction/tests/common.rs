use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::response::Response;
use axum::Router;
use serde_json::Value;

use crate::prediction::dispatch::Dispatcher;
use crate::prediction::features::{FeatureInput, FeatureSet};
use crate::prediction::normalizer::normalize;
use crate::prediction::remote::{RemoteRequest, RemoteResponse, RemoteScorer, RemoteScorerError};
use crate::prediction::repository::{
    AlertError, AlertPublisher, AlertRecord, PredictionRecord, PredictionRepository,
    RepositoryError,
};
use crate::prediction::service::PredictionService;
use crate::prediction::student::{
    StudentDirectory, StudentDirectoryError, StudentId, StudentRecord,
};
use crate::prediction::variants::ModelVersion;

/// The steady student from the dashboard walkthrough.
pub(super) fn steady_input() -> FeatureInput {
    FeatureInput {
        g1: Some(10.0),
        g2: Some(12.0),
        studytime: Some(2.0),
        absences: Some(3.0),
        effort_score: Some(7.5),
        emotional_sentiment: Some(0.6),
        participation_index: Some(8.2),
        ..FeatureInput::default()
    }
}

/// A disengaged student who should land in the high-risk tier.
pub(super) fn struggling_input() -> FeatureInput {
    FeatureInput {
        absences: Some(20.0),
        studytime: Some(1.0),
        effort_score: Some(2.0),
        emotional_sentiment: Some(0.1),
        participation_index: Some(1.0),
        g1: Some(5.0),
        g2: Some(4.0),
        ..FeatureInput::default()
    }
}

pub(super) fn features(input: &FeatureInput) -> FeatureSet {
    normalize(input, &[], None)
}

pub(super) fn neutral_features() -> FeatureSet {
    features(&FeatureInput::default())
}

pub(super) fn student_record(id: &str) -> StudentRecord {
    StudentRecord {
        id: StudentId(id.to_string()),
        name: Some("Jules Moreno".to_string()),
        age: 17,
        sex: Some("M".to_string()),
        g1: 12.0,
        g2: 13.0,
        g3: None,
        medu: 3,
        fedu: 3,
        famrel: 4,
        dalc: 1,
        walc: 2,
        health: 4,
        goout: 3,
        absences: 2,
        studytime: 5.0,
        failures: 0,
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryDirectory {
    students: Arc<Mutex<HashMap<StudentId, StudentRecord>>>,
}

impl MemoryDirectory {
    pub(super) fn with(students: Vec<StudentRecord>) -> Self {
        let directory = Self::default();
        {
            let mut guard = directory.students.lock().expect("lock");
            for student in students {
                guard.insert(student.id.clone(), student);
            }
        }
        directory
    }
}

impl StudentDirectory for MemoryDirectory {
    fn fetch(&self, id: &StudentId) -> Result<Option<StudentRecord>, StudentDirectoryError> {
        Ok(self.students.lock().expect("lock").get(id).cloned())
    }

    fn list(&self) -> Result<Vec<StudentRecord>, StudentDirectoryError> {
        let mut students: Vec<StudentRecord> =
            self.students.lock().expect("lock").values().cloned().collect();
        students.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(students)
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    records: Arc<Mutex<Vec<PredictionRecord>>>,
}

impl MemoryRepository {
    pub(super) fn records(&self) -> Vec<PredictionRecord> {
        self.records.lock().expect("lock").clone()
    }
}

impl PredictionRepository for MemoryRepository {
    fn insert(&self, record: PredictionRecord) -> Result<PredictionRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("lock");
        if guard.iter().any(|existing| existing.id == record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.push(record.clone());
        Ok(record)
    }

    fn history(&self, student_id: &StudentId) -> Result<Vec<PredictionRecord>, RepositoryError> {
        Ok(self
            .records
            .lock()
            .expect("lock")
            .iter()
            .filter(|record| record.student_id.as_ref() == Some(student_id))
            .cloned()
            .collect())
    }

    fn recent(&self, limit: usize) -> Result<Vec<PredictionRecord>, RepositoryError> {
        Ok(self
            .records
            .lock()
            .expect("lock")
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }
}

pub(super) struct UnavailableRepository;

impl PredictionRepository for UnavailableRepository {
    fn insert(&self, _record: PredictionRecord) -> Result<PredictionRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn history(&self, _student_id: &StudentId) -> Result<Vec<PredictionRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn recent(&self, _limit: usize) -> Result<Vec<PredictionRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryAlerts {
    events: Arc<Mutex<Vec<AlertRecord>>>,
}

impl MemoryAlerts {
    pub(super) fn events(&self) -> Vec<AlertRecord> {
        self.events.lock().expect("lock").clone()
    }
}

pub(super) struct UnreachableAlerts;

impl AlertPublisher for UnreachableAlerts {
    fn publish(&self, _alert: AlertRecord) -> Result<(), AlertError> {
        Err(AlertError::Transport("pager offline".to_string()))
    }

    fn recent(&self, _limit: usize) -> Result<Vec<AlertRecord>, AlertError> {
        Err(AlertError::Transport("pager offline".to_string()))
    }
}

impl AlertPublisher for MemoryAlerts {
    fn publish(&self, alert: AlertRecord) -> Result<(), AlertError> {
        self.events.lock().expect("lock").push(alert);
        Ok(())
    }

    fn recent(&self, limit: usize) -> Result<Vec<AlertRecord>, AlertError> {
        Ok(self
            .events
            .lock()
            .expect("lock")
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }
}

/// Canned remote behavior for dispatch tests.
#[derive(Debug, Clone)]
pub(super) enum StubBehavior {
    Respond(RemoteResponse),
    Fail(u16),
    Hang,
}

#[derive(Clone)]
pub(super) struct StubScorer {
    behavior: StubBehavior,
    calls: Arc<AtomicUsize>,
}

impl StubScorer {
    pub(super) fn new(behavior: StubBehavior) -> Self {
        Self {
            behavior,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RemoteScorer for StubScorer {
    fn score(
        &self,
        _request: &RemoteRequest,
    ) -> impl Future<Output = Result<RemoteResponse, RemoteScorerError>> + Send {
        let behavior = self.behavior.clone();
        let calls = self.calls.clone();
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            match behavior {
                StubBehavior::Respond(response) => Ok(response),
                StubBehavior::Fail(status) => Err(RemoteScorerError::Status(status)),
                StubBehavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Err(RemoteScorerError::MissingScore)
                }
            }
        }
    }
}

pub(super) fn stub_dispatcher(scorer: StubScorer) -> Dispatcher<StubScorer> {
    Dispatcher::new(Some(Arc::new(scorer)), Duration::from_millis(100))
}

pub(super) type TestService =
    PredictionService<MemoryDirectory, MemoryRepository, MemoryAlerts, StubScorer>;

pub(super) fn build_service(
    version: ModelVersion,
) -> (TestService, Arc<MemoryRepository>, Arc<MemoryAlerts>) {
    let directory = Arc::new(MemoryDirectory::with(vec![
        student_record("stu-0001"),
        StudentRecord {
            g1: 6.0,
            g2: 5.0,
            absences: 14,
            dalc: 4,
            walc: 5,
            ..student_record("stu-0002")
        },
    ]));
    let repository = Arc::new(MemoryRepository::default());
    let alerts = Arc::new(MemoryAlerts::default());
    let service = PredictionService::new(
        directory,
        repository.clone(),
        alerts.clone(),
        Dispatcher::local_only(),
        version,
    );
    (service, repository, alerts)
}

/// Bind an in-process HTTP server and return its base URL.
pub(super) async fn spawn_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server runs");
    });
    format!("http://{addr}")
}

pub(super) async fn read_json_body(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    serde_json::from_slice(&bytes).expect("json body")
}
