use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

use crate::session::models::{AnswerMap, Interview, InterviewStatus, Quiz};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QuizRow {
    pub id: Uuid,
    pub title: String,
    pub questions: Value,
    pub time_limit: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<QuizRow> for Quiz {
    type Error = anyhow::Error;

    fn try_from(row: QuizRow) -> Result<Self, Self::Error> {
        let questions = serde_json::from_value(row.questions)
            .with_context(|| format!("Quiz {} has malformed questions", row.id))?;
        let time_limit = row
            .time_limit
            .map(u32::try_from)
            .transpose()
            .with_context(|| format!("Quiz {} has a negative time limit", row.id))?;
        Ok(Quiz {
            id: row.id,
            title: row.title,
            questions,
            time_limit,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InterviewRow {
    pub id: Uuid,
    pub token: String,
    pub quiz_id: Uuid,
    pub candidate_id: Uuid,
    pub status: String,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub answers: Value,
    pub score: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<InterviewRow> for Interview {
    type Error = anyhow::Error;

    fn try_from(row: InterviewRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<InterviewStatus>()
            .map_err(anyhow::Error::msg)?;
        let answers: AnswerMap = serde_json::from_value(row.answers)
            .with_context(|| format!("Interview {} has malformed answers", row.id))?;
        Ok(Interview {
            id: row.id,
            token: row.token,
            quiz_id: row.quiz_id,
            candidate_id: row.candidate_id,
            status,
            started_at: row.started_at,
            completed_at: row.completed_at,
            answers,
            score: row.score.and_then(|s| u32::try_from(s).ok()),
            created_at: row.created_at,
        })
    }
}
