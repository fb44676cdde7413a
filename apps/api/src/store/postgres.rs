use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::evaluation::models::{BehavioralRubric, EvaluationInput, InterviewEvaluation};
use crate::evaluation::store::EvaluationStore;
use crate::models::evaluation::{EvaluationRow, RubricRow};
use crate::models::interview::{InterviewRow, QuizRow};
use crate::session::models::{Answer, Interview, Quiz};
use crate::session::store::{SessionKey, SessionStore};

/// PostgreSQL-backed store. Status guards live in the `WHERE` clause of each
/// write, so the row itself is the per-interview serialization point.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgStore {
    async fn find_quiz(&self, quiz_id: Uuid) -> Result<Option<Quiz>, AppError> {
        let row = sqlx::query_as::<_, QuizRow>("SELECT * FROM quizzes WHERE id = $1")
            .bind(quiz_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Quiz::try_from).transpose()?)
    }

    async fn find_interview(&self, key: &SessionKey) -> Result<Option<Interview>, AppError> {
        let row = match key {
            SessionKey::Token(token) => {
                sqlx::query_as::<_, InterviewRow>("SELECT * FROM interviews WHERE token = $1")
                    .bind(token)
                    .fetch_optional(&self.pool)
                    .await?
            }
            SessionKey::Id(id) => {
                sqlx::query_as::<_, InterviewRow>("SELECT * FROM interviews WHERE id = $1")
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await?
            }
        };
        Ok(row.map(Interview::try_from).transpose()?)
    }

    async fn insert_interview(&self, interview: &Interview) -> Result<(), AppError> {
        let answers = serde_json::to_value(&interview.answers)
            .map_err(|e| AppError::Internal(e.into()))?;
        sqlx::query(
            r#"
            INSERT INTO interviews
                (id, token, quiz_id, candidate_id, status, started_at, completed_at,
                 answers, score, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(interview.id)
        .bind(&interview.token)
        .bind(interview.quiz_id)
        .bind(interview.candidate_id)
        .bind(interview.status.as_str())
        .bind(interview.started_at)
        .bind(interview.completed_at)
        .bind(answers)
        .bind(interview.score.map(|s| s as i32))
        .bind(interview.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db) = &e {
                if db.is_unique_violation() {
                    return AppError::Conflict(
                        "Candidate already has an active interview for this quiz".to_string(),
                    );
                }
            }
            AppError::Database(e)
        })?;
        Ok(())
    }

    async fn mark_started(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE interviews SET status = 'in_progress', started_at = $2 \
             WHERE id = $1 AND status = 'pending'",
        )
        .bind(id)
        .bind(at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn record_answer(
        &self,
        id: Uuid,
        question_id: &str,
        answer: Option<&Answer>,
    ) -> Result<bool, AppError> {
        let value = match answer {
            Some(answer) => {
                serde_json::to_value(answer).map_err(|e| AppError::Internal(e.into()))?
            }
            None => Value::Null,
        };
        // Single-key merge: concurrent submissions for other questions are preserved.
        let result = sqlx::query(
            r#"
            UPDATE interviews
            SET answers = answers || jsonb_build_object($2::text, $3::jsonb)
            WHERE id = $1 AND status = 'in_progress'
            "#,
        )
        .bind(id)
        .bind(question_id)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn mark_completed(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE interviews SET status = 'completed', completed_at = $2 \
             WHERE id = $1 AND status = 'in_progress'",
        )
        .bind(id)
        .bind(at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn mark_cancelled(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE interviews SET status = 'cancelled' \
             WHERE id = $1 AND status IN ('pending', 'in_progress')",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn set_score(&self, id: Uuid, score: Option<u32>) -> Result<(), AppError> {
        sqlx::query("UPDATE interviews SET score = $2 WHERE id = $1")
            .bind(id)
            .bind(score.map(|s| s as i32))
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl EvaluationStore for PgStore {
    async fn find_evaluation(
        &self,
        interview_id: Uuid,
    ) -> Result<Option<InterviewEvaluation>, AppError> {
        let row = sqlx::query_as::<_, EvaluationRow>(
            "SELECT * FROM interview_evaluations WHERE interview_id = $1",
        )
        .bind(interview_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(InterviewEvaluation::try_from).transpose()?)
    }

    async fn merge_evaluation(
        &self,
        interview_id: Uuid,
        input: &EvaluationInput,
        now: DateTime<Utc>,
    ) -> Result<InterviewEvaluation, AppError> {
        // Absent fields bind as NULL and keep the stored value, so the merge
        // happens inside the row lock taken by the upsert.
        let row = sqlx::query_as::<_, EvaluationRow>(
            r#"
            INSERT INTO interview_evaluations
                (interview_id, quiz_score, hire_recommendation, notes, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (interview_id) DO UPDATE SET
                quiz_score = COALESCE(EXCLUDED.quiz_score, interview_evaluations.quiz_score),
                hire_recommendation = COALESCE(
                    EXCLUDED.hire_recommendation,
                    interview_evaluations.hire_recommendation
                ),
                notes = COALESCE(EXCLUDED.notes, interview_evaluations.notes),
                updated_at = EXCLUDED.updated_at
            RETURNING *
            "#,
        )
        .bind(interview_id)
        .bind(input.quiz_score.map(|s| s as i32))
        .bind(input.hire_recommendation.map(|r| r.as_str()))
        .bind(&input.notes)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(InterviewEvaluation::try_from(row)?)
    }

    async fn find_rubric(&self, interview_id: Uuid) -> Result<Option<BehavioralRubric>, AppError> {
        let row = sqlx::query_as::<_, RubricRow>(
            "SELECT * FROM behavioral_rubrics WHERE interview_id = $1",
        )
        .bind(interview_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(BehavioralRubric::try_from).transpose()?)
    }

    async fn upsert_rubric(
        &self,
        interview_id: Uuid,
        rubric: &BehavioralRubric,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO behavioral_rubrics
                (interview_id, communication, collaboration, problem_solving,
                 culture_fit, leadership, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, now())
            ON CONFLICT (interview_id) DO UPDATE SET
                communication = EXCLUDED.communication,
                collaboration = EXCLUDED.collaboration,
                problem_solving = EXCLUDED.problem_solving,
                culture_fit = EXCLUDED.culture_fit,
                leadership = EXCLUDED.leadership,
                updated_at = now()
            "#,
        )
        .bind(interview_id)
        .bind(i16::from(rubric.communication))
        .bind(i16::from(rubric.collaboration))
        .bind(i16::from(rubric.problem_solving))
        .bind(i16::from(rubric.culture_fit))
        .bind(rubric.leadership.map(i16::from))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
