use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::features::FeatureSet;

/// Body of `POST <backend>/predict`: the 15 features in wire order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRequest {
    pub features: Vec<f64>,
}

impl RemoteRequest {
    pub fn from_features(features: &FeatureSet) -> Self {
        Self {
            features: features.to_vector().to_vec(),
        }
    }
}

/// Loosely typed success body; every field is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicted_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prediction: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intervention: Option<String>,
}

impl RemoteResponse {
    /// `predicted_score`, falling back to the older `prediction` field.
    pub fn score(&self) -> Option<f64> {
        self.predicted_score.or(self.prediction)
    }
}

/// Outbound scorer hook so dispatch can be exercised without a network.
pub trait RemoteScorer: Send + Sync {
    fn score(
        &self,
        request: &RemoteRequest,
    ) -> impl Future<Output = Result<RemoteResponse, RemoteScorerError>> + Send;
}

#[derive(Debug, thiserror::Error)]
pub enum RemoteScorerError {
    #[error("remote scorer client could not be built: {0}")]
    Client(#[source] reqwest::Error),
    #[error("remote scorer unreachable: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("remote scorer timed out after {0:?}")]
    Timeout(Duration),
    #[error("remote scorer returned HTTP {0}")]
    Status(u16),
    #[error("remote scorer returned an unparseable body: {0}")]
    InvalidBody(String),
    #[error("remote scorer response carried no score")]
    MissingScore,
}

/// reqwest-backed client for a user-hosted prediction service.
#[derive(Debug, Clone)]
pub struct HttpRemoteScorer {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpRemoteScorer {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RemoteScorerError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(RemoteScorerError::Client)?;

        Ok(Self {
            client,
            endpoint: format!("{}/predict", base_url.trim_end_matches('/')),
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl RemoteScorer for HttpRemoteScorer {
    fn score(
        &self,
        request: &RemoteRequest,
    ) -> impl Future<Output = Result<RemoteResponse, RemoteScorerError>> + Send {
        let pending = self.client.post(&self.endpoint).json(request).send();
        let timeout = self.timeout;

        async move {
            let response = pending.await.map_err(|err| {
                if err.is_timeout() {
                    RemoteScorerError::Timeout(timeout)
                } else {
                    RemoteScorerError::Transport(err)
                }
            })?;

            let status = response.status();
            if !status.is_success() {
                return Err(RemoteScorerError::Status(status.as_u16()));
            }

            let body = response.bytes().await.map_err(|err| {
                if err.is_timeout() {
                    RemoteScorerError::Timeout(timeout)
                } else {
                    RemoteScorerError::Transport(err)
                }
            })?;

            serde_json::from_slice::<RemoteResponse>(&body)
                .map_err(|err| RemoteScorerError::InvalidBody(err.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prediction::features::FeatureInput;
    use crate::prediction::normalizer::normalize;

    #[test]
    fn request_carries_fifteen_features_in_wire_order() {
        let features = normalize(
            &FeatureInput {
                age: Some(16.0),
                g1: Some(9.0),
                g2: Some(11.0),
                stress_level: Some(0.8),
                ..FeatureInput::default()
            },
            &[],
            None,
        );

        let request = RemoteRequest::from_features(&features);

        assert_eq!(request.features.len(), 15);
        assert_eq!(request.features[0], 16.0);
        assert_eq!(request.features[2], 9.0);
        assert_eq!(request.features[3], 11.0);
        assert_eq!(request.features[14], 0.8);
    }

    #[test]
    fn legacy_prediction_field_is_accepted() {
        let response: RemoteResponse =
            serde_json::from_str(r#"{ "prediction": 13.5, "risk_level": "Medium" }"#)
                .expect("parses");
        assert_eq!(response.score(), Some(13.5));
        assert!(response.confidence.is_none());
    }

    #[test]
    fn endpoint_joins_base_url() {
        let scorer = HttpRemoteScorer::new("http://127.0.0.1:5000/", Duration::from_secs(10))
            .expect("client builds");
        assert_eq!(scorer.endpoint(), "http://127.0.0.1:5000/predict");
    }
}
