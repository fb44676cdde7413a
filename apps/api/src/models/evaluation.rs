use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::evaluation::models::{BehavioralRubric, HireRecommendation, InterviewEvaluation};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EvaluationRow {
    pub interview_id: Uuid,
    pub quiz_score: Option<i32>,
    pub hire_recommendation: Option<String>,
    pub notes: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<EvaluationRow> for InterviewEvaluation {
    type Error = anyhow::Error;

    fn try_from(row: EvaluationRow) -> Result<Self, Self::Error> {
        let hire_recommendation = row
            .hire_recommendation
            .as_deref()
            .map(|s| {
                HireRecommendation::parse(s)
                    .ok_or_else(|| anyhow!("unknown hire recommendation '{s}'"))
            })
            .transpose()?;
        Ok(InterviewEvaluation {
            interview_id: row.interview_id,
            quiz_score: row.quiz_score.and_then(|s| u32::try_from(s).ok()),
            hire_recommendation,
            notes: row.notes,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RubricRow {
    pub interview_id: Uuid,
    pub communication: i16,
    pub collaboration: i16,
    pub problem_solving: i16,
    pub culture_fit: i16,
    pub leadership: Option<i16>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<RubricRow> for BehavioralRubric {
    type Error = anyhow::Error;

    fn try_from(row: RubricRow) -> Result<Self, Self::Error> {
        let sub_score =
            |v: i16| u8::try_from(v).map_err(|_| anyhow!("rubric score {v} out of range"));
        Ok(BehavioralRubric {
            communication: sub_score(row.communication)?,
            collaboration: sub_score(row.collaboration)?,
            problem_solving: sub_score(row.problem_solving)?,
            culture_fit: sub_score(row.culture_fit)?,
            leadership: row.leadership.map(sub_score).transpose()?,
        })
    }
}
