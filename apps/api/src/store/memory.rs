//! In-process store used by tests and local runs without PostgreSQL.
//! Applies the same status guards as the SQL store.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::errors::AppError;
use crate::evaluation::models::{BehavioralRubric, EvaluationInput, InterviewEvaluation};
use crate::evaluation::store::EvaluationStore;
use crate::session::models::{Answer, Interview, InterviewStatus, Quiz};
use crate::session::store::{SessionKey, SessionStore};

#[derive(Default)]
struct Inner {
    quizzes: HashMap<Uuid, Quiz>,
    interviews: HashMap<Uuid, Interview>,
    evaluations: HashMap<Uuid, InterviewEvaluation>,
    rubrics: HashMap<Uuid, BehavioralRubric>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a quiz. Quizzes are produced outside this service.
    pub async fn insert_quiz(&self, quiz: Quiz) {
        self.inner.lock().await.quizzes.insert(quiz.id, quiz);
    }

    async fn guarded<F>(&self, id: Uuid, from: &[InterviewStatus], write: F) -> bool
    where
        F: FnOnce(&mut Interview) + Send,
    {
        let mut inner = self.inner.lock().await;
        match inner.interviews.get_mut(&id) {
            Some(interview) if from.contains(&interview.status) => {
                write(interview);
                true
            }
            _ => false,
        }
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn find_quiz(&self, quiz_id: Uuid) -> Result<Option<Quiz>, AppError> {
        Ok(self.inner.lock().await.quizzes.get(&quiz_id).cloned())
    }

    async fn find_interview(&self, key: &SessionKey) -> Result<Option<Interview>, AppError> {
        let inner = self.inner.lock().await;
        let found = match key {
            SessionKey::Id(id) => inner.interviews.get(id),
            SessionKey::Token(token) => inner.interviews.values().find(|i| &i.token == token),
        };
        Ok(found.cloned())
    }

    async fn insert_interview(&self, interview: &Interview) -> Result<(), AppError> {
        let mut inner = self.inner.lock().await;
        if inner.interviews.contains_key(&interview.id) {
            return Err(AppError::Conflict(format!(
                "Interview {} already exists",
                interview.id
            )));
        }
        // Mirrors the `interviews_one_active_attempt` partial unique index.
        let active_attempt = inner.interviews.values().any(|existing| {
            existing.candidate_id == interview.candidate_id
                && existing.quiz_id == interview.quiz_id
                && !existing.status.is_terminal()
        });
        if active_attempt {
            return Err(AppError::Conflict(
                "Candidate already has an active interview for this quiz".to_string(),
            ));
        }
        inner.interviews.insert(interview.id, interview.clone());
        Ok(())
    }

    async fn mark_started(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, AppError> {
        Ok(self
            .guarded(id, &[InterviewStatus::Pending], |i| {
                i.status = InterviewStatus::InProgress;
                i.started_at = Some(at);
            })
            .await)
    }

    async fn record_answer(
        &self,
        id: Uuid,
        question_id: &str,
        answer: Option<&Answer>,
    ) -> Result<bool, AppError> {
        let answer = answer.cloned();
        Ok(self
            .guarded(id, &[InterviewStatus::InProgress], |i| {
                i.answers.insert(question_id.to_string(), answer);
            })
            .await)
    }

    async fn mark_completed(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, AppError> {
        Ok(self
            .guarded(id, &[InterviewStatus::InProgress], |i| {
                i.status = InterviewStatus::Completed;
                i.completed_at = Some(at);
            })
            .await)
    }

    async fn mark_cancelled(&self, id: Uuid) -> Result<bool, AppError> {
        Ok(self
            .guarded(
                id,
                &[InterviewStatus::Pending, InterviewStatus::InProgress],
                |i| i.status = InterviewStatus::Cancelled,
            )
            .await)
    }

    async fn set_score(&self, id: Uuid, score: Option<u32>) -> Result<(), AppError> {
        let mut inner = self.inner.lock().await;
        let interview = inner
            .interviews
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Interview {id} not found")))?;
        interview.score = score;
        Ok(())
    }
}

#[async_trait]
impl EvaluationStore for MemoryStore {
    async fn find_evaluation(
        &self,
        interview_id: Uuid,
    ) -> Result<Option<InterviewEvaluation>, AppError> {
        Ok(self
            .inner
            .lock()
            .await
            .evaluations
            .get(&interview_id)
            .cloned())
    }

    async fn merge_evaluation(
        &self,
        interview_id: Uuid,
        input: &EvaluationInput,
        now: DateTime<Utc>,
    ) -> Result<InterviewEvaluation, AppError> {
        let mut inner = self.inner.lock().await;
        let evaluation = inner
            .evaluations
            .entry(interview_id)
            .or_insert_with(|| InterviewEvaluation::empty(interview_id, now));
        input.apply_to(evaluation, now);
        Ok(evaluation.clone())
    }

    async fn find_rubric(&self, interview_id: Uuid) -> Result<Option<BehavioralRubric>, AppError> {
        Ok(self.inner.lock().await.rubrics.get(&interview_id).cloned())
    }

    async fn upsert_rubric(
        &self,
        interview_id: Uuid,
        rubric: &BehavioralRubric,
    ) -> Result<(), AppError> {
        self.inner
            .lock()
            .await
            .rubrics
            .insert(interview_id, rubric.clone());
        Ok(())
    }
}
