use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HireRecommendation {
    StrongYes,
    Yes,
    Maybe,
    No,
    StrongNo,
}

impl HireRecommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            HireRecommendation::StrongYes => "strong_yes",
            HireRecommendation::Yes => "yes",
            HireRecommendation::Maybe => "maybe",
            HireRecommendation::No => "no",
            HireRecommendation::StrongNo => "strong_no",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "strong_yes" => Some(HireRecommendation::StrongYes),
            "yes" => Some(HireRecommendation::Yes),
            "maybe" => Some(HireRecommendation::Maybe),
            "no" => Some(HireRecommendation::No),
            "strong_no" => Some(HireRecommendation::StrongNo),
            _ => None,
        }
    }
}

/// Human behavioral rubric. Each sub-score is on a 1–5 scale.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BehavioralRubric {
    pub communication: u8,
    pub collaboration: u8,
    pub problem_solving: u8,
    pub culture_fit: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leadership: Option<u8>,
}

impl BehavioralRubric {
    pub fn validate(&self) -> Result<(), AppError> {
        let scores = [
            ("communication", Some(self.communication)),
            ("collaboration", Some(self.collaboration)),
            ("problem_solving", Some(self.problem_solving)),
            ("culture_fit", Some(self.culture_fit)),
            ("leadership", self.leadership),
        ];
        for (name, score) in scores {
            if let Some(score) = score {
                if !(1..=5).contains(&score) {
                    return Err(AppError::Validation(format!(
                        "{name} must be between 1 and 5 (got {score})"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Grading and hiring-manager output for one interview.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InterviewEvaluation {
    pub interview_id: Uuid,
    /// 0–100
    pub quiz_score: Option<u32>,
    pub hire_recommendation: Option<HireRecommendation>,
    pub notes: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl InterviewEvaluation {
    pub fn empty(interview_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            interview_id,
            quiz_score: None,
            hire_recommendation: None,
            notes: None,
            updated_at: now,
        }
    }
}

/// Partial update to an evaluation. Absent fields keep their stored value,
/// so grading and the hiring manager can write independently.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EvaluationInput {
    pub quiz_score: Option<u32>,
    pub hire_recommendation: Option<HireRecommendation>,
    pub notes: Option<String>,
}

impl EvaluationInput {
    pub fn validate(&self) -> Result<(), AppError> {
        match self.quiz_score {
            Some(score) if score > 100 => Err(AppError::Validation(format!(
                "quiz_score must be between 0 and 100 (got {score})"
            ))),
            _ => Ok(()),
        }
    }

    pub fn apply_to(&self, evaluation: &mut InterviewEvaluation, now: DateTime<Utc>) {
        if let Some(score) = self.quiz_score {
            evaluation.quiz_score = Some(score);
        }
        if let Some(recommendation) = self.hire_recommendation {
            evaluation.hire_recommendation = Some(recommendation);
        }
        if let Some(notes) = &self.notes {
            evaluation.notes = Some(notes.clone());
        }
        evaluation.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rubric(scores: [u8; 4], leadership: Option<u8>) -> BehavioralRubric {
        BehavioralRubric {
            communication: scores[0],
            collaboration: scores[1],
            problem_solving: scores[2],
            culture_fit: scores[3],
            leadership,
        }
    }

    #[test]
    fn test_rubric_bounds() {
        assert!(rubric([1, 5, 3, 4], None).validate().is_ok());
        assert!(rubric([0, 5, 3, 4], None).validate().is_err());
        assert!(rubric([1, 6, 3, 4], None).validate().is_err());
        assert!(rubric([1, 5, 3, 4], Some(6)).validate().is_err());
    }

    #[test]
    fn test_recommendation_strings() {
        for rec in [
            HireRecommendation::StrongYes,
            HireRecommendation::Yes,
            HireRecommendation::Maybe,
            HireRecommendation::No,
            HireRecommendation::StrongNo,
        ] {
            assert_eq!(HireRecommendation::parse(rec.as_str()), Some(rec));
        }
        let parsed: HireRecommendation = serde_json::from_str("\"strong_no\"").unwrap();
        assert_eq!(parsed, HireRecommendation::StrongNo);
    }

    #[test]
    fn test_input_merges_only_present_fields() {
        let now = Utc::now();
        let mut evaluation = InterviewEvaluation::empty(Uuid::new_v4(), now);
        evaluation.quiz_score = Some(72);

        EvaluationInput {
            hire_recommendation: Some(HireRecommendation::Yes),
            ..Default::default()
        }
        .apply_to(&mut evaluation, now);

        assert_eq!(evaluation.quiz_score, Some(72));
        assert_eq!(evaluation.hire_recommendation, Some(HireRecommendation::Yes));
    }

    #[test]
    fn test_quiz_score_over_100_rejected() {
        let input = EvaluationInput {
            quiz_score: Some(101),
            ..Default::default()
        };
        assert!(input.validate().is_err());
    }
}
