//! Session engine: the token-addressed operations exposed to candidates and
//! operators. Each call loads the interview, enforces expiry, runs one state
//! machine step, and persists it through a status-guarded write.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::session::answers::find_first_unanswered;
use crate::session::error::SessionError;
use crate::session::machine::{CompletionReason, Transition};
use crate::session::models::{Answer, Interview, InterviewStatus, Question, Quiz};
use crate::session::store::{SessionKey, SessionStore};

/// A lost guarded write means another request moved the interview first;
/// the step is re-evaluated against fresh state this many times.
const MAX_WRITE_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StartedSession {
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TimerView {
    pub status: InterviewStatus,
    pub remaining_seconds: Option<u64>,
}

/// Everything a client needs to rehydrate a session after a reload.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub interview: Interview,
    pub quiz_title: String,
    pub time_limit: Option<u32>,
    pub questions: Vec<Question>,
    pub remaining_seconds: Option<u64>,
    pub resume_index: usize,
}

#[derive(Clone)]
pub struct SessionEngine {
    store: Arc<dyn SessionStore>,
}

impl SessionEngine {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Issues a pending interview for a candidate.
    pub async fn create_interview(
        &self,
        quiz_id: Uuid,
        candidate_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Interview, AppError> {
        if self.store.find_quiz(quiz_id).await?.is_none() {
            return Err(AppError::NotFound(format!("Quiz {quiz_id} not found")));
        }
        let interview = Interview::new_pending(quiz_id, candidate_id, now);
        self.store.insert_interview(&interview).await?;
        info!(
            "Created interview {} for candidate {candidate_id} on quiz {quiz_id}",
            interview.id
        );
        Ok(interview)
    }

    pub async fn start(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<StartedSession, AppError> {
        let (interview, _, _) = self
            .step(SessionKey::Token(token.to_string()), now, |interview, _| {
                interview.start(now)
            })
            .await?;
        // A successful start always leaves `started_at` set.
        let started_at = interview.started_at.ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!(
                "Interview {} is in progress without a start time",
                interview.id
            ))
        })?;
        Ok(StartedSession { started_at })
    }

    pub async fn submit_answer(
        &self,
        token: &str,
        question_id: &str,
        answer: Option<Answer>,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        self.step(SessionKey::Token(token.to_string()), now, |interview, quiz| {
            interview.submit_answer(quiz, question_id, answer.clone(), now)
        })
        .await?;
        Ok(())
    }

    /// Candidate completion. Succeeds as a no-op when already completed.
    pub async fn complete(&self, token: &str, now: DateTime<Utc>) -> Result<(), AppError> {
        self.step(SessionKey::Token(token.to_string()), now, |interview, _| {
            interview.complete(now)
        })
        .await?;
        Ok(())
    }

    /// Operator cancellation by interview id.
    pub async fn cancel(&self, interview_id: Uuid, now: DateTime<Utc>) -> Result<(), AppError> {
        self.step(SessionKey::Id(interview_id), now, |interview, _| {
            interview.cancel()
        })
        .await?;
        Ok(())
    }

    /// Timer heartbeat. Recomputes remaining time from the stored start and
    /// records a forced completion once it reaches zero.
    pub async fn tick(&self, token: &str, now: DateTime<Utc>) -> Result<TimerView, AppError> {
        let (interview, quiz, _) = self
            .step(SessionKey::Token(token.to_string()), now, |_, _| {
                Ok(Transition::Unchanged)
            })
            .await?;
        Ok(TimerView {
            status: interview.status,
            remaining_seconds: interview.remaining_seconds(&quiz, now),
        })
    }

    pub async fn get_session(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<SessionView, AppError> {
        let (interview, quiz, _) = self
            .step(SessionKey::Token(token.to_string()), now, |_, _| {
                Ok(Transition::Unchanged)
            })
            .await?;
        let remaining_seconds = interview.remaining_seconds(&quiz, now);
        let resume_index = find_first_unanswered(&quiz.questions, &interview.answers);
        Ok(SessionView {
            quiz_title: quiz.title,
            time_limit: quiz.time_limit,
            questions: quiz.questions.iter().map(Question::redacted).collect(),
            remaining_seconds,
            resume_index,
            interview,
        })
    }

    /// Loads an interview and its quiz without enforcing expiry.
    pub async fn load(&self, key: &SessionKey) -> Result<(Interview, Quiz), AppError> {
        let interview = self
            .store
            .find_interview(key)
            .await?
            .ok_or_else(|| SessionError::NotFound(key.to_string()))?;
        let quiz = self.store.find_quiz(interview.quiz_id).await?.ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!(
                "Quiz {} referenced by interview {} is missing",
                interview.quiz_id,
                interview.id
            ))
        })?;
        Ok((interview, quiz))
    }

    async fn step<F>(
        &self,
        key: SessionKey,
        now: DateTime<Utc>,
        action: F,
    ) -> Result<(Interview, Quiz, Transition), AppError>
    where
        F: Fn(&mut Interview, &Quiz) -> Result<Transition, SessionError> + Send + Sync,
    {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let (mut interview, quiz) = self.load(&key).await?;

            if let Some(expiry) = interview.detect_expiry(&quiz, now) {
                if !self.persist(&interview, &expiry).await? {
                    debug!(
                        "Interview {} changed before expiry was recorded (attempt {attempt})",
                        interview.id
                    );
                    continue;
                }
                info!(
                    "Interview {} reached its time limit; completed at {now}",
                    interview.id
                );
            }

            let transition = match action(&mut interview, &quiz) {
                Ok(transition) => transition,
                Err(e) => {
                    debug!("Rejected operation on interview {}: {e}", interview.id);
                    return Err(e.into());
                }
            };

            if self.persist(&interview, &transition).await? {
                log_transition(&interview, &transition);
                return Ok((interview, quiz, transition));
            }
            debug!(
                "Interview {} changed concurrently; re-evaluating (attempt {attempt})",
                interview.id
            );
        }

        warn!("Gave up on {key} after {MAX_WRITE_ATTEMPTS} conflicting writes");
        Err(AppError::Conflict(format!(
            "Interview ({key}) is being modified concurrently"
        )))
    }

    async fn persist(
        &self,
        interview: &Interview,
        transition: &Transition,
    ) -> Result<bool, AppError> {
        match transition {
            Transition::Started { at } => self.store.mark_started(interview.id, *at).await,
            Transition::AnswerRecorded {
                question_id,
                answer,
            } => {
                self.store
                    .record_answer(interview.id, question_id, answer.as_ref())
                    .await
            }
            Transition::Completed { at, .. } => self.store.mark_completed(interview.id, *at).await,
            Transition::Cancelled => self.store.mark_cancelled(interview.id).await,
            Transition::Unchanged => Ok(true),
        }
    }
}

fn log_transition(interview: &Interview, transition: &Transition) {
    match transition {
        Transition::Started { at } => info!("Interview {} started at {at}", interview.id),
        Transition::AnswerRecorded { question_id, .. } => {
            debug!("Interview {} recorded answer for {question_id}", interview.id)
        }
        Transition::Completed { reason, .. } => match reason {
            CompletionReason::Submitted => info!("Interview {} completed", interview.id),
            CompletionReason::Expired => info!("Interview {} expired", interview.id),
        },
        Transition::Cancelled => info!("Interview {} cancelled", interview.id),
        Transition::Unchanged => {}
    }
}
