//! Remote-first scoring with a guaranteed local fallback.
//!
//! A dispatch starts in [`DispatchState::Attempting`] when a remote scorer is configured and
//! moves to [`DispatchState::Fallback`] on any failure, timeout, or cancellation. The fallback
//! state always produces a result from the local engine, so dispatch never fails.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::engine::{PredictionResult, ScoringEngine};
use super::features::FeatureSet;
use super::interventions;
use super::remote::{RemoteRequest, RemoteResponse, RemoteScorer, RemoteScorerError};
use super::risk::{tier_for_score, RiskLevel};
use super::scoring::{bounded_score, round_to};
use super::student::StudentRecord;

/// Confidence assumed when a remote response omits one.
pub const DEFAULT_REMOTE_CONFIDENCE: f64 = 85.0;

/// Which path produced a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Remote,
    Fallback,
}

impl Provenance {
    pub const fn label(self) -> &'static str {
        match self {
            Provenance::Remote => "remote",
            Provenance::Fallback => "fallback",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FallbackReason {
    #[error("no remote scorer configured")]
    NotConfigured,
    #[error("remote scoring disabled for this request")]
    Disabled,
    #[error("remote request cancelled")]
    Cancelled,
    #[error(transparent)]
    Failed(#[from] RemoteScorerError),
}

#[derive(Debug)]
pub enum DispatchState {
    Attempting,
    Fallback(FallbackReason),
}

/// Prediction tagged with the path that produced it.
#[derive(Debug)]
pub enum ScoredPrediction {
    Remote(PredictionResult),
    LocalFallback {
        result: PredictionResult,
        reason: FallbackReason,
    },
}

impl ScoredPrediction {
    pub fn result(&self) -> &PredictionResult {
        match self {
            ScoredPrediction::Remote(result) => result,
            ScoredPrediction::LocalFallback { result, .. } => result,
        }
    }

    pub fn into_result(self) -> PredictionResult {
        match self {
            ScoredPrediction::Remote(result) => result,
            ScoredPrediction::LocalFallback { result, .. } => result,
        }
    }

    pub fn provenance(&self) -> Provenance {
        match self {
            ScoredPrediction::Remote(_) => Provenance::Remote,
            ScoredPrediction::LocalFallback { .. } => Provenance::Fallback,
        }
    }

    pub fn fallback_reason(&self) -> Option<&FallbackReason> {
        match self {
            ScoredPrediction::Remote(_) => None,
            ScoredPrediction::LocalFallback { reason, .. } => Some(reason),
        }
    }

    /// Human-readable backend status for display next to the number.
    pub fn backend_status(&self) -> String {
        match self {
            ScoredPrediction::Remote(_) => "scored by remote backend".to_string(),
            ScoredPrediction::LocalFallback {
                reason: FallbackReason::NotConfigured | FallbackReason::Disabled,
                ..
            } => "scored locally".to_string(),
            ScoredPrediction::LocalFallback { reason, .. } => {
                format!("could not reach remote backend ({reason}); scored locally")
            }
        }
    }
}

/// Routes scoring calls to an optional remote scorer with a bounded wait.
pub struct Dispatcher<S> {
    remote: Option<Arc<S>>,
    timeout: Duration,
}

impl<S> Dispatcher<S>
where
    S: RemoteScorer + 'static,
{
    pub fn new(remote: Option<Arc<S>>, timeout: Duration) -> Self {
        Self { remote, timeout }
    }

    pub fn local_only() -> Self {
        Self {
            remote: None,
            timeout: Duration::ZERO,
        }
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn dispatch(
        &self,
        features: &FeatureSet,
        record: Option<&StudentRecord>,
        engine: &ScoringEngine,
        use_remote: bool,
    ) -> ScoredPrediction {
        self.dispatch_until(
            features,
            record,
            engine,
            use_remote,
            std::future::pending::<()>(),
        )
        .await
    }

    /// Like [`Dispatcher::dispatch`], abandoning the remote call as soon as `cancel` resolves.
    /// Dropping the in-flight request aborts it.
    pub async fn dispatch_until<C>(
        &self,
        features: &FeatureSet,
        record: Option<&StudentRecord>,
        engine: &ScoringEngine,
        use_remote: bool,
        cancel: C,
    ) -> ScoredPrediction
    where
        C: Future<Output = ()>,
    {
        tokio::pin!(cancel);

        let mut state = match (&self.remote, use_remote) {
            (_, false) => DispatchState::Fallback(FallbackReason::Disabled),
            (None, true) => DispatchState::Fallback(FallbackReason::NotConfigured),
            (Some(_), true) => DispatchState::Attempting,
        };

        loop {
            match state {
                DispatchState::Attempting => {
                    let Some(remote) = self.remote.as_ref() else {
                        state = DispatchState::Fallback(FallbackReason::NotConfigured);
                        continue;
                    };
                    let request = RemoteRequest::from_features(features);

                    let attempt = tokio::select! {
                        outcome = tokio::time::timeout(self.timeout, remote.score(&request)) => {
                            match outcome {
                                Ok(Ok(response)) => map_remote(response, features, engine)
                                    .map_err(FallbackReason::Failed),
                                Ok(Err(err)) => Err(FallbackReason::Failed(err)),
                                Err(_) => Err(FallbackReason::Failed(
                                    RemoteScorerError::Timeout(self.timeout),
                                )),
                            }
                        }
                        _ = &mut cancel => Err(FallbackReason::Cancelled),
                    };

                    match attempt {
                        Ok(result) => {
                            debug!(score = result.predicted_score, "remote scorer answered");
                            return ScoredPrediction::Remote(result);
                        }
                        Err(reason) => {
                            warn!(%reason, "remote scoring failed; using local fallback");
                            state = DispatchState::Fallback(reason);
                        }
                    }
                }
                DispatchState::Fallback(reason) => {
                    return ScoredPrediction::LocalFallback {
                        result: engine.score(features, record),
                        reason,
                    };
                }
            }
        }
    }
}

/// Fill a remote answer into a full result, computing omitted fields locally.
pub fn map_remote(
    response: RemoteResponse,
    features: &FeatureSet,
    engine: &ScoringEngine,
) -> Result<PredictionResult, RemoteScorerError> {
    let raw = response.score().ok_or(RemoteScorerError::MissingScore)?;
    if !raw.is_finite() {
        return Err(RemoteScorerError::InvalidBody(format!(
            "non-finite score {raw}"
        )));
    }
    let predicted_score = bounded_score(raw);

    let confidence_level = response
        .confidence
        .filter(|value| value.is_finite())
        .map(|value| round_to(value.clamp(0.0, 100.0), 2))
        .unwrap_or(DEFAULT_REMOTE_CONFIDENCE);

    let risk_level = response
        .risk_level
        .as_deref()
        .and_then(|label| label.parse::<RiskLevel>().ok())
        .unwrap_or_else(|| tier_for_score(predicted_score, &engine.weights().risk));

    let intervention_summary = response
        .intervention
        .filter(|text| !text.trim().is_empty())
        .unwrap_or_else(|| interventions::generate(features, predicted_score, risk_level));

    Ok(PredictionResult {
        predicted_score,
        confidence_level,
        risk_level,
        intervention_summary,
        feature_contributions: None,
        model_version: engine.version(),
    })
}
