use super::features::FeatureSet;
use super::risk::RiskLevel;

pub const PERFORMING_WELL: &str = "Student is performing well; maintain the current approach.";
pub const HIGH_RISK_SUFFIX: &str = "URGENT: immediate intervention required.";
pub const MEDIUM_RISK_SUFFIX: &str = "Monitor closely and review progress within two weeks.";

const PASSING_SCORE: f64 = 10.0;

/// Build the recommendation text for a scored student.
///
/// Checks run in a fixed order (projected score, recent grade, trend, study time, attendance,
/// effort, sentiment, participation, motivation, stress) so identical inputs always produce
/// identical text.
pub fn generate(features: &FeatureSet, score: f64, risk: RiskLevel) -> String {
    let mut strengths: Vec<String> = Vec::new();
    let mut interventions: Vec<String> = Vec::new();

    if score < PASSING_SCORE {
        interventions.push(format!(
            "Plan remedial sessions: projected grade {score:.1}/20 is below passing"
        ));
    }

    if features.g2 < 10.0 {
        interventions.push(format!(
            "Arrange tutoring in core subjects (latest grade {:.0}/20)",
            features.g2
        ));
    } else if features.g2 >= 15.0 {
        strengths.push(format!("strong recent grades ({:.0}/20)", features.g2));
    }

    if features.g2 < features.g1 {
        interventions.push(format!(
            "Review recent coursework with the student: grades fell from {:.0} to {:.0}",
            features.g1, features.g2
        ));
    } else if features.g2 > features.g1 {
        strengths.push("improving grade trend".to_string());
    }

    if features.studytime < 2.0 {
        interventions.push("Increase weekly study time to at least 2 hours".to_string());
    } else if features.studytime >= 5.0 {
        strengths.push("consistent study habits".to_string());
    }

    if features.absences > 5.0 {
        interventions.push(format!(
            "Address attendance: {:.0} absences recorded",
            features.absences
        ));
    } else if features.attendance_rate >= 95.0 {
        strengths.push("excellent attendance".to_string());
    }

    if features.effort_score < 5.0 {
        interventions.push(format!(
            "Set short-term goals to lift effort ({:.1}/10)",
            features.effort_score
        ));
    } else if features.effort_score >= 8.0 {
        strengths.push("high effort".to_string());
    }

    if features.emotional_sentiment < 0.4 {
        interventions.push("Schedule a wellbeing check-in with a counselor".to_string());
    } else if features.emotional_sentiment >= 0.7 {
        strengths.push("positive outlook".to_string());
    }

    if features.participation_index < 5.0 {
        interventions
            .push("Encourage class participation through structured group work".to_string());
    } else if features.participation_index >= 8.0 {
        strengths.push("active class participation".to_string());
    }

    if features.motivation_level < 4.0 {
        interventions.push("Connect coursework to personal goals to rebuild motivation".to_string());
    } else if features.motivation_level >= 8.0 {
        strengths.push("high motivation".to_string());
    }

    if features.stress_level > 0.7 {
        interventions.push("Introduce stress management support".to_string());
    }

    let mut sections = Vec::new();
    if !strengths.is_empty() {
        sections.push(format!("Strengths: {}.", strengths.join(", ")));
    }
    if interventions.is_empty() {
        sections.push(PERFORMING_WELL.to_string());
    } else {
        sections.push(format!(
            "Recommended interventions: {}.",
            interventions.join("; ")
        ));
    }
    match risk {
        RiskLevel::High => sections.push(HIGH_RISK_SUFFIX.to_string()),
        RiskLevel::Medium => sections.push(MEDIUM_RISK_SUFFIX.to_string()),
        RiskLevel::Low => {}
    }

    sections.join(" ")
}
