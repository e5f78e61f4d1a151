use crate::infra::{
    build_dispatcher, load_roster, InMemoryAlertPublisher, InMemoryPredictionRepository,
    InMemoryStudentDirectory,
};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use student_insight::config::AppConfig;
use student_insight::error::AppError;
use student_insight::prediction::{
    model_catalog, normalize, FeatureInput, FeatureKind, ModelVersion, PredictionOutcome,
    PredictionRequest, PredictionService, ScoringEngine, StudentId,
};

#[derive(Args, Debug, Default)]
pub(crate) struct PredictArgs {
    /// Student age in years
    #[arg(long)]
    pub(crate) age: Option<f64>,
    /// Weekly study hours
    #[arg(long)]
    pub(crate) studytime: Option<f64>,
    /// First-period grade (0-20)
    #[arg(long)]
    pub(crate) g1: Option<f64>,
    /// Second-period grade (0-20)
    #[arg(long)]
    pub(crate) g2: Option<f64>,
    /// Number of school absences
    #[arg(long)]
    pub(crate) absences: Option<f64>,
    /// Effort score (1-10)
    #[arg(long)]
    pub(crate) effort: Option<f64>,
    /// Emotional sentiment (0-1)
    #[arg(long)]
    pub(crate) sentiment: Option<f64>,
    /// Participation index (1-10)
    #[arg(long)]
    pub(crate) participation: Option<f64>,
    /// Family support (1-5)
    #[arg(long)]
    pub(crate) family_support: Option<f64>,
    /// Health score (1-5)
    #[arg(long)]
    pub(crate) health: Option<f64>,
    /// Social activity (1-5)
    #[arg(long)]
    pub(crate) social: Option<f64>,
    /// Alcohol consumption (0-5)
    #[arg(long)]
    pub(crate) alcohol: Option<f64>,
    /// Attendance rate in percent; derived from absences when omitted
    #[arg(long)]
    pub(crate) attendance: Option<f64>,
    /// Motivation level (1-10)
    #[arg(long)]
    pub(crate) motivation: Option<f64>,
    /// Stress level (0-1)
    #[arg(long)]
    pub(crate) stress: Option<f64>,
    /// Student roster CSV used to resolve --student-id (defaults to the bundled sample)
    #[arg(long)]
    pub(crate) students: Option<PathBuf>,
    /// Score a student from the roster; command-line features override the stored record
    #[arg(long)]
    pub(crate) student_id: Option<String>,
    /// Scoring variant (defaults to MODEL_VERSION or the latest)
    #[arg(long)]
    pub(crate) model_version: Option<ModelVersion>,
    /// Remote scorer base URL (defaults to REMOTE_SCORER_URL)
    #[arg(long)]
    pub(crate) remote_url: Option<String>,
    /// Skip the remote scorer even when one is configured
    #[arg(long)]
    pub(crate) local_only: bool,
}

impl PredictArgs {
    fn feature_input(&self) -> FeatureInput {
        let supplied = [
            (FeatureKind::Age, self.age),
            (FeatureKind::Studytime, self.studytime),
            (FeatureKind::G1, self.g1),
            (FeatureKind::G2, self.g2),
            (FeatureKind::Absences, self.absences),
            (FeatureKind::EffortScore, self.effort),
            (FeatureKind::EmotionalSentiment, self.sentiment),
            (FeatureKind::ParticipationIndex, self.participation),
            (FeatureKind::FamilySupport, self.family_support),
            (FeatureKind::HealthScore, self.health),
            (FeatureKind::SocialActivity, self.social),
            (FeatureKind::AlcoholConsumption, self.alcohol),
            (FeatureKind::AttendanceRate, self.attendance),
            (FeatureKind::MotivationLevel, self.motivation),
            (FeatureKind::StressLevel, self.stress),
        ];

        supplied
            .into_iter()
            .fold(FeatureInput::default(), |input, (kind, value)| match value {
                Some(value) => input.with(kind, value),
                None => input,
            })
    }
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Student roster CSV to score (defaults to the bundled sample)
    #[arg(long)]
    pub(crate) students: Option<PathBuf>,
    /// Only score this student
    #[arg(long)]
    pub(crate) student_id: Option<String>,
}

pub(crate) async fn run_predict(mut args: PredictArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;
    if let Some(url) = args.remote_url.take() {
        let url = url.trim().trim_end_matches('/').to_string();
        config.scoring.remote_url = (!url.is_empty()).then_some(url);
    }
    if let Some(version) = args.model_version.take() {
        config.scoring.model_version = version;
    }

    let roster = load_roster(args.students.as_deref())?;
    let service = PredictionService::new(
        Arc::new(InMemoryStudentDirectory::new(roster)),
        Arc::new(InMemoryPredictionRepository::default()),
        Arc::new(InMemoryAlertPublisher::default()),
        build_dispatcher(&config.scoring)?,
        config.scoring.model_version,
    );

    let request = PredictionRequest {
        student_id: args.student_id.clone().map(StudentId),
        use_remote: !args.local_only,
        ..PredictionRequest::for_features(args.feature_input())
    };
    let outcome = service.predict(request).await?;
    render_outcome(&outcome);

    Ok(())
}

fn render_outcome(outcome: &PredictionOutcome) {
    let record = &outcome.record;
    let result = &record.result;

    let subject = record
        .student_id
        .as_ref()
        .map(|id| format!(" for {id}"))
        .unwrap_or_default();
    println!(
        "Prediction {}{} ({}, {})",
        record.id.0, subject, record.model_version, outcome.backend_status
    );
    println!("- predicted grade: {:.2}/20", result.predicted_score);
    println!("- confidence: {:.1}%", result.confidence_level);
    println!("- risk level: {}", result.risk_level);
    println!("- summary: {}", result.intervention_summary);

    if let Some(contributions) = &result.feature_contributions {
        let mut ranked: Vec<(&String, &f64)> = contributions.iter().collect();
        ranked.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()));
        let top: Vec<String> = ranked
            .iter()
            .take(4)
            .map(|(term, value)| format!("{term} {value:+.2}"))
            .collect();
        println!("- largest terms: {}", top.join(", "));
    }

    if let Some(alert) = &outcome.alert {
        println!("- alert raised ({}): {}", alert.severity, alert.message);
    }
}

pub(crate) fn run_models() {
    println!("Scoring variants");
    for model in model_catalog() {
        let marker = if model.latest { " (latest)" } else { "" };
        println!("- {}{}: {}", model.version, marker, model.description);
        println!(
            "    grades {:.2}/{:.2} | study x{:.1} | alerts on medium: {}",
            model.weights.grade_weights.0,
            model.weights.grade_weights.1,
            model.weights.study_log_scale,
            if model.weights.alert_on_medium { "yes" } else { "no" }
        );
    }
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let roster = load_roster(args.students.as_deref())?;
    let selected: Vec<_> = match &args.student_id {
        Some(id) => roster.iter().filter(|student| &student.id.0 == id).collect(),
        None => roster.iter().collect(),
    };
    if selected.is_empty() {
        return Err(AppError::InvalidInput(format!(
            "no student matches '{}'",
            args.student_id.unwrap_or_default()
        )));
    }

    println!("Student insight demo: {} students", selected.len());
    let header: Vec<String> = ModelVersion::ALL
        .iter()
        .map(|version| format!("{:>14}", version.tag()))
        .collect();
    println!("{:<24}{}", "student", header.join(""));

    for &student in &selected {
        let features = normalize(&FeatureInput::default(), &[], Some(student));
        let cells: Vec<String> = ModelVersion::ALL
            .iter()
            .map(|version| {
                let result = ScoringEngine::new(*version).score(&features, Some(student));
                format!(
                    "{:>14}",
                    format!("{:.2} {}", result.predicted_score, result.risk_level)
                )
            })
            .collect();
        println!("{:<24}{}", student.display_name(), cells.join(""));
    }

    let engine = ScoringEngine::default();
    println!("\nRecommendations ({})", engine.version());
    for &student in &selected {
        let features = normalize(&FeatureInput::default(), &[], Some(student));
        let result = engine.score(&features, Some(student));
        println!(
            "- {} [{} | {:.0}% confidence]: {}",
            student.display_name(),
            result.risk_level,
            result.confidence_level,
            result.intervention_summary
        );
    }

    Ok(())
}
