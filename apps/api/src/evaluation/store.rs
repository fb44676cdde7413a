use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::AppError;
use crate::evaluation::models::{BehavioralRubric, EvaluationInput, InterviewEvaluation};

/// Storage for the human and grading signals attached to an interview.
#[async_trait]
pub trait EvaluationStore: Send + Sync {
    async fn find_evaluation(
        &self,
        interview_id: Uuid,
    ) -> Result<Option<InterviewEvaluation>, AppError>;

    /// Merges the present fields of `input` into the stored evaluation in a
    /// single write, creating it if needed, and returns the merged row.
    /// Concurrent merges of different fields never overwrite each other.
    async fn merge_evaluation(
        &self,
        interview_id: Uuid,
        input: &EvaluationInput,
        now: DateTime<Utc>,
    ) -> Result<InterviewEvaluation, AppError>;

    async fn find_rubric(&self, interview_id: Uuid) -> Result<Option<BehavioralRubric>, AppError>;

    async fn upsert_rubric(
        &self,
        interview_id: Uuid,
        rubric: &BehavioralRubric,
    ) -> Result<(), AppError>;
}
