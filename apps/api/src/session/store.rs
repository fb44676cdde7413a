use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::AppError;
use crate::session::models::{Answer, Interview, Quiz};

/// How a caller addresses an interview: candidates by opaque token,
/// operators by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionKey {
    Token(String),
    Id(Uuid),
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionKey::Token(token) => write!(f, "token {token}"),
            SessionKey::Id(id) => write!(f, "id {id}"),
        }
    }
}

/// Storage for interviews and their quizzes.
///
/// Every `mark_*`/`record_*` write is guarded on the status the transition
/// starts from and returns `false` when the guard no longer holds (a
/// concurrent writer moved the interview first). Callers reload and
/// re-evaluate in that case.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn find_quiz(&self, quiz_id: Uuid) -> Result<Option<Quiz>, AppError>;

    async fn find_interview(&self, key: &SessionKey) -> Result<Option<Interview>, AppError>;

    async fn insert_interview(&self, interview: &Interview) -> Result<(), AppError>;

    /// `pending → in_progress`
    async fn mark_started(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, AppError>;

    /// Merges one entry into the answer map of an `in_progress` interview.
    async fn record_answer(
        &self,
        id: Uuid,
        question_id: &str,
        answer: Option<&Answer>,
    ) -> Result<bool, AppError>;

    /// `in_progress → completed`
    async fn mark_completed(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, AppError>;

    /// `pending | in_progress → cancelled`
    async fn mark_cancelled(&self, id: Uuid) -> Result<bool, AppError>;

    /// Snapshot of the latest composite score.
    async fn set_score(&self, id: Uuid, score: Option<u32>) -> Result<(), AppError>;
}
