use super::features::FeatureSet;
use super::scoring::round_to;
use super::variants::ConfidenceParams;

pub const CONFIDENCE_RANGE: (f64, f64) = (0.0, 100.0);

/// Mean of per-feature instability measures; larger means a less trustworthy estimate.
///
/// Measures: grade swing (|g2 - g1| / 5), absences / 10, sentiment distance from neutral,
/// effort distance from 5, and a flat 1.0 when no student record backs the prediction.
pub fn variance_proxy(features: &FeatureSet, has_record: bool) -> f64 {
    let measures = [
        (features.g2 - features.g1).abs() / 5.0,
        features.absences / 10.0,
        (features.emotional_sentiment - 0.5).abs() * 2.0,
        (features.effort_score - 5.0).abs() / 5.0,
        if has_record { 0.0 } else { 1.0 },
    ];
    measures.iter().sum::<f64>() / measures.len() as f64
}

/// Confidence for a given variance proxy; non-increasing in `variance`.
pub fn confidence_from_variance(
    variance: f64,
    participation_index: f64,
    has_record: bool,
    params: &ConfidenceParams,
) -> f64 {
    let base = if has_record {
        params.base_with_record
    } else {
        params.base_without_record
    };
    let variance = if variance.is_finite() { variance.max(0.0) } else { 0.0 };
    let value = base - variance * params.variance_penalty
        + participation_index * params.participation_boost;
    let (min, max) = CONFIDENCE_RANGE;
    round_to(value.clamp(min, max), 2)
}

pub fn confidence(features: &FeatureSet, has_record: bool, params: &ConfidenceParams) -> f64 {
    confidence_from_variance(
        variance_proxy(features, has_record),
        features.participation_index,
        has_record,
        params,
    )
}
