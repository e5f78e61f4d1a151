use super::features::{AnalyticInput, FeatureInput, FeatureKind, FeatureSet, SupplementarySignal};
use super::student::StudentRecord;

/// Resolve every feature to a value inside its documented range.
///
/// Precedence per feature: caller value, then the student record, then a value derived from a
/// related feature, then the neutral default. Out-of-range and non-finite inputs are clamped
/// rather than rejected so scoring stays defined for every input.
pub fn normalize(
    input: &FeatureInput,
    analytics: &[AnalyticInput],
    record: Option<&StudentRecord>,
) -> FeatureSet {
    let mut supplied = input.clone();
    let mut supplementary = Vec::new();
    for analytic in analytics {
        match analytic {
            AnalyticInput::Known { kind, value } => supplied.set(*kind, *value),
            AnalyticInput::Generic {
                label,
                value,
                scale,
            } => supplementary.push(SupplementarySignal {
                label: label.clone(),
                value: scale.to_unit(*value),
            }),
        }
    }

    let resolve = |kind: FeatureKind| -> Option<f64> {
        supplied
            .get(kind)
            .filter(|value| value.is_finite())
            .or_else(|| record.and_then(|record| from_record(record, kind)))
            .map(|value| kind.clamp(value))
    };

    let value_or_default = |kind: FeatureKind| resolve(kind).unwrap_or(kind.default_value());

    let absences = value_or_default(FeatureKind::Absences);
    let attendance_rate = resolve(FeatureKind::AttendanceRate)
        .unwrap_or_else(|| FeatureKind::AttendanceRate.clamp(100.0 - absences * 3.0));

    FeatureSet {
        age: value_or_default(FeatureKind::Age),
        studytime: value_or_default(FeatureKind::Studytime),
        g1: value_or_default(FeatureKind::G1),
        g2: value_or_default(FeatureKind::G2),
        absences,
        effort_score: value_or_default(FeatureKind::EffortScore),
        emotional_sentiment: value_or_default(FeatureKind::EmotionalSentiment),
        participation_index: value_or_default(FeatureKind::ParticipationIndex),
        family_support: value_or_default(FeatureKind::FamilySupport),
        health_score: value_or_default(FeatureKind::HealthScore),
        social_activity: value_or_default(FeatureKind::SocialActivity),
        alcohol_consumption: value_or_default(FeatureKind::AlcoholConsumption),
        attendance_rate,
        motivation_level: value_or_default(FeatureKind::MotivationLevel),
        stress_level: value_or_default(FeatureKind::StressLevel),
        supplementary,
    }
}

fn from_record(record: &StudentRecord, kind: FeatureKind) -> Option<f64> {
    match kind {
        FeatureKind::Age => Some(record.age as f64),
        FeatureKind::Studytime => Some(record.studytime),
        FeatureKind::G1 => Some(record.g1),
        FeatureKind::G2 => Some(record.g2),
        FeatureKind::Absences => Some(record.absences as f64),
        FeatureKind::FamilySupport => Some(record.famrel as f64),
        FeatureKind::HealthScore => Some(record.health as f64),
        FeatureKind::SocialActivity => Some(record.goout as f64),
        FeatureKind::AlcoholConsumption => Some(record.alcohol_consumption()),
        // Derived from the resolved absences so a caller override of absences carries through.
        FeatureKind::AttendanceRate
        | FeatureKind::EffortScore
        | FeatureKind::EmotionalSentiment
        | FeatureKind::ParticipationIndex
        | FeatureKind::MotivationLevel
        | FeatureKind::StressLevel => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prediction::engine::ScoringEngine;
    use crate::prediction::features::GenericScale;
    use crate::prediction::student::StudentId;

    fn record() -> StudentRecord {
        StudentRecord {
            id: StudentId("stu-0007".to_string()),
            name: None,
            age: 16,
            sex: Some("F".to_string()),
            g1: 11.0,
            g2: 13.0,
            g3: None,
            medu: 3,
            fedu: 2,
            famrel: 4,
            dalc: 1,
            walc: 2,
            health: 5,
            goout: 3,
            absences: 4,
            studytime: 3.0,
            failures: 0,
        }
    }

    #[test]
    fn empty_input_yields_documented_defaults() {
        let features = normalize(&FeatureInput::default(), &[], None);

        for kind in FeatureKind::ALL {
            assert_eq!(features.get(kind), kind.default_value(), "{kind}");
        }
        assert!(features.supplementary.is_empty());
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let input = FeatureInput::default()
            .with(FeatureKind::G1, 35.0)
            .with(FeatureKind::G2, -4.0)
            .with(FeatureKind::EmotionalSentiment, 1.7)
            .with(FeatureKind::AttendanceRate, 140.0)
            .with(FeatureKind::EffortScore, f64::NAN);

        let features = normalize(&input, &[], None);

        assert_eq!(features.g1, 20.0);
        assert_eq!(features.g2, 0.0);
        assert_eq!(features.emotional_sentiment, 1.0);
        assert_eq!(features.attendance_rate, 100.0);
        assert_eq!(features.effort_score, FeatureKind::EffortScore.default_value());
        assert!(features.is_within_ranges());
    }

    #[test]
    fn attendance_is_derived_from_absences_when_missing() {
        let input = FeatureInput::default().with(FeatureKind::Absences, 12.0);
        assert_eq!(normalize(&input, &[], None).attendance_rate, 64.0);

        let input = FeatureInput::default().with(FeatureKind::Absences, 60.0);
        assert_eq!(normalize(&input, &[], None).attendance_rate, 0.0);
    }

    #[test]
    fn record_fields_fill_gaps_but_caller_values_win() {
        let input = FeatureInput::default().with(FeatureKind::G2, 15.0);

        let features = normalize(&input, &[], Some(&record()));

        assert_eq!(features.g2, 15.0);
        assert_eq!(features.g1, 11.0);
        assert_eq!(features.studytime, 3.0);
        assert_eq!(features.family_support, 4.0);
        assert_eq!(features.health_score, 5.0);
        assert_eq!(features.social_activity, 3.0);
        assert_eq!(features.alcohol_consumption, 1.5);
        assert_eq!(features.attendance_rate, 88.0);
        assert_eq!(features.effort_score, 5.0);
    }

    #[test]
    fn caller_absences_drive_attendance_even_with_a_record() {
        let student = StudentRecord {
            absences: 0,
            ..record()
        };
        let baseline = normalize(&FeatureInput::default(), &[], Some(&student));
        assert_eq!(baseline.attendance_rate, 100.0);

        let input = FeatureInput::default().with(FeatureKind::Absences, 30.0);
        let features = normalize(&input, &[], Some(&student));

        assert_eq!(features.absences, 30.0);
        assert_eq!(features.attendance_rate, 10.0);

        let engine = ScoringEngine::default();
        assert!(
            engine.score(&features, Some(&student)).predicted_score
                < engine.score(&baseline, Some(&student)).predicted_score
        );

        let explicit = input.with(FeatureKind::AttendanceRate, 75.0);
        assert_eq!(
            normalize(&explicit, &[], Some(&student)).attendance_rate,
            75.0
        );
    }

    #[test]
    fn analytics_override_or_supplement_features() {
        let analytics = vec![
            AnalyticInput::Known {
                kind: FeatureKind::ParticipationIndex,
                value: 9.0,
            },
            AnalyticInput::Generic {
                label: "lab completion".to_string(),
                value: 75.0,
                scale: GenericScale::Percent,
            },
            AnalyticInput::Generic {
                label: "quiz streak".to_string(),
                value: 12.0,
                scale: GenericScale::Raw { min: 0.0, max: 8.0 },
            },
        ];

        let features = normalize(&FeatureInput::default(), &analytics, None);

        assert_eq!(features.participation_index, 9.0);
        assert_eq!(features.supplementary.len(), 2);
        assert_eq!(features.supplementary[0].value, 0.75);
        assert_eq!(features.supplementary[1].value, 1.0);
    }
}
