use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use student_insight::config::ScoringConfig;
use student_insight::error::AppError;
use student_insight::prediction::{
    import_students, import_students_from_path, AlertError, AlertPublisher, AlertRecord,
    Dispatcher, HttpRemoteScorer, PredictionRecord, PredictionRepository, RepositoryError,
    StudentDirectory, StudentDirectoryError, StudentId, StudentRecord,
};

/// Roster bundled with the binary for demos and a default directory.
pub(crate) const SAMPLE_ROSTER: &str =
    include_str!("../../../crates/student-insight/student_records.csv");

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryStudentDirectory {
    students: Arc<Mutex<BTreeMap<StudentId, StudentRecord>>>,
}

impl InMemoryStudentDirectory {
    pub(crate) fn new(students: Vec<StudentRecord>) -> Self {
        let students = students
            .into_iter()
            .map(|student| (student.id.clone(), student))
            .collect();
        Self {
            students: Arc::new(Mutex::new(students)),
        }
    }
}

impl StudentDirectory for InMemoryStudentDirectory {
    fn fetch(&self, id: &StudentId) -> Result<Option<StudentRecord>, StudentDirectoryError> {
        let guard = self.students.lock().expect("directory mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn list(&self) -> Result<Vec<StudentRecord>, StudentDirectoryError> {
        let guard = self.students.lock().expect("directory mutex poisoned");
        Ok(guard.values().cloned().collect())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryPredictionRepository {
    records: Arc<Mutex<Vec<PredictionRecord>>>,
}

impl PredictionRepository for InMemoryPredictionRepository {
    fn insert(&self, record: PredictionRecord) -> Result<PredictionRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.iter().any(|existing| existing.id == record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.push(record.clone());
        Ok(record)
    }

    fn history(&self, student_id: &StudentId) -> Result<Vec<PredictionRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .iter()
            .filter(|record| record.student_id.as_ref() == Some(student_id))
            .cloned()
            .collect())
    }

    fn recent(&self, limit: usize) -> Result<Vec<PredictionRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.iter().rev().take(limit).cloned().collect())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryAlertPublisher {
    events: Arc<Mutex<Vec<AlertRecord>>>,
}

impl AlertPublisher for InMemoryAlertPublisher {
    fn publish(&self, alert: AlertRecord) -> Result<(), AlertError> {
        let mut guard = self.events.lock().expect("alert mutex poisoned");
        guard.push(alert);
        Ok(())
    }

    fn recent(&self, limit: usize) -> Result<Vec<AlertRecord>, AlertError> {
        let guard = self.events.lock().expect("alert mutex poisoned");
        Ok(guard.iter().rev().take(limit).cloned().collect())
    }
}

/// Roster from `path`, or the bundled sample when none is given.
pub(crate) fn load_roster(path: Option<&Path>) -> Result<Vec<StudentRecord>, AppError> {
    let students = match path {
        Some(path) => import_students_from_path(path)?,
        None => import_students(SAMPLE_ROSTER)?,
    };
    Ok(students)
}

pub(crate) fn build_dispatcher(
    scoring: &ScoringConfig,
) -> Result<Dispatcher<HttpRemoteScorer>, AppError> {
    match scoring.remote_url.as_deref() {
        Some(url) => {
            let scorer = HttpRemoteScorer::new(url, scoring.remote_timeout)?;
            Ok(Dispatcher::new(
                Some(Arc::new(scorer)),
                scoring.remote_timeout,
            ))
        }
        None => Ok(Dispatcher::local_only()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn bundled_roster_loads() {
        let students = load_roster(None).expect("sample roster parses");
        assert_eq!(students.len(), 8);

        let directory = InMemoryStudentDirectory::new(students);
        let listed = directory.list().expect("list succeeds");
        assert_eq!(listed[0].id, StudentId("stu-0001".to_string()));
        assert!(directory
            .fetch(&StudentId("stu-0008".to_string()))
            .expect("fetch succeeds")
            .is_some());
    }

    #[test]
    fn dispatcher_is_local_without_remote_url() {
        let scoring = ScoringConfig::default();
        assert!(!build_dispatcher(&scoring).expect("builds").has_remote());

        let scoring = ScoringConfig {
            remote_url: Some("http://127.0.0.1:5000".to_string()),
            remote_timeout: Duration::from_secs(12),
            ..ScoringConfig::default()
        };
        let dispatcher = build_dispatcher(&scoring).expect("builds");
        assert!(dispatcher.has_remote());
        assert_eq!(dispatcher.timeout(), Duration::from_secs(12));
    }

    #[test]
    fn missing_roster_file_is_reported() {
        let err = load_roster(Some(Path::new("/nonexistent/roster.csv"))).unwrap_err();
        assert!(matches!(err, AppError::StudentImport(_)));
    }
}
