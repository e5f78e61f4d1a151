//! Student performance scoring: feature normalization, weighted score aggregation, confidence,
//! risk tiers, intervention text, and remote-first dispatch with a local fallback.
//!
//! Everything up to [`ScoringEngine::score`] is pure and synchronous. The only suspension point
//! is the optional remote scorer call inside [`Dispatcher`], bounded by a timeout.

pub mod confidence;
pub mod dispatch;
pub mod engine;
pub mod features;
pub mod interventions;
pub mod normalizer;
pub mod remote;
pub mod repository;
pub mod risk;
pub mod router;
pub mod scoring;
pub mod service;
pub mod student;
pub mod variants;

#[cfg(test)]
mod tests;

pub use dispatch::{DispatchState, Dispatcher, FallbackReason, Provenance, ScoredPrediction};
pub use engine::{PredictionResult, ScoringEngine};
pub use features::{
    AnalyticInput, FeatureInput, FeatureKind, FeatureSet, GenericScale, SupplementarySignal,
};
pub use normalizer::normalize;
pub use remote::{HttpRemoteScorer, RemoteRequest, RemoteResponse, RemoteScorer, RemoteScorerError};
pub use repository::{
    AlertError, AlertPublisher, AlertRecord, PredictionId, PredictionRecord, PredictionRepository,
    RepositoryError,
};
pub use risk::{classify, Escalation, RiskLevel};
pub use router::{model_catalog, prediction_router, ModelDescriptor};
pub use scoring::{aggregate, ScoreBreakdown, ScoreComponent, ScoreTerm};
pub use service::{
    PredictionOutcome, PredictionRequest, PredictionService, PredictionServiceError,
    PredictionView,
};
pub use student::{
    import_students, import_students_from_path, StudentDirectory, StudentDirectoryError,
    StudentId, StudentImportError, StudentRecord,
};
pub use variants::{ModelVersion, WeightTable};
