//! Interview session state machine.
//!
//! Transitions are pure: each method validates against the current status,
//! mutates the in-memory `Interview`, and returns the `Transition` that the
//! caller must persist. Expiry is detected on demand via `detect_expiry`;
//! nothing here runs a clock.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::session::answers::upsert_answer;
use crate::session::error::SessionError;
use crate::session::models::{Answer, Interview, InterviewStatus, Quiz};
use crate::session::timer::{is_expired, remaining_seconds};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CompletionReason {
    Submitted,
    Expired,
}

/// The durable effect of a successful state machine step.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Started {
        at: DateTime<Utc>,
    },
    AnswerRecorded {
        question_id: String,
        answer: Option<Answer>,
    },
    Completed {
        at: DateTime<Utc>,
        reason: CompletionReason,
    },
    Cancelled,
    /// Accepted without a state change (resume, repeated completion, timer read).
    Unchanged,
}

impl Interview {
    /// Time left as shown to the candidate. The clock stops at zero once the
    /// interview is completed, and a cancelled interview has no clock.
    pub fn remaining_seconds(&self, quiz: &Quiz, now: DateTime<Utc>) -> Option<u64> {
        match self.status {
            InterviewStatus::Pending | InterviewStatus::InProgress => {
                remaining_seconds(self.started_at, quiz.time_limit, now)
            }
            InterviewStatus::Completed => quiz.time_limit.map(|_| 0),
            InterviewStatus::Cancelled => None,
        }
    }

    /// Forces completion of an in-progress interview whose time has run out.
    /// Must run before any other transition on every interaction.
    pub fn detect_expiry(&mut self, quiz: &Quiz, now: DateTime<Utc>) -> Option<Transition> {
        if self.status != InterviewStatus::InProgress
            || !is_expired(self.started_at, quiz.time_limit, now)
        {
            return None;
        }
        Some(self.mark_completed(now, CompletionReason::Expired))
    }

    /// `pending → in_progress`. Starting an interview that is already in
    /// progress is a resume and leaves `started_at` untouched.
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<Transition, SessionError> {
        match self.status {
            InterviewStatus::Pending => {
                self.status = InterviewStatus::InProgress;
                self.started_at = Some(now);
                Ok(Transition::Started { at: now })
            }
            InterviewStatus::InProgress => Ok(Transition::Unchanged),
            status => Err(SessionError::TerminalState(status)),
        }
    }

    pub fn submit_answer(
        &mut self,
        quiz: &Quiz,
        question_id: &str,
        answer: Option<Answer>,
        now: DateTime<Utc>,
    ) -> Result<Transition, SessionError> {
        match self.status {
            InterviewStatus::Pending => {
                return Err(SessionError::InvalidState(
                    "interview has not been started".to_string(),
                ))
            }
            InterviewStatus::Cancelled => {
                return Err(SessionError::TerminalState(InterviewStatus::Cancelled))
            }
            InterviewStatus::Completed => {
                // A late answer against a timed-out session reports the
                // expiry, not merely that the session is closed.
                return Err(if is_expired(self.started_at, quiz.time_limit, now) {
                    SessionError::Expired
                } else {
                    SessionError::TerminalState(InterviewStatus::Completed)
                });
            }
            InterviewStatus::InProgress => {}
        }

        if is_expired(self.started_at, quiz.time_limit, now) {
            return Err(SessionError::Expired);
        }

        upsert_answer(self, quiz, question_id, answer.clone())?;
        Ok(Transition::AnswerRecorded {
            question_id: question_id.to_string(),
            answer,
        })
    }

    /// `in_progress → completed`. Always allowed with unanswered questions;
    /// a no-op for an interview that is already completed.
    pub fn complete(&mut self, now: DateTime<Utc>) -> Result<Transition, SessionError> {
        match self.status {
            InterviewStatus::InProgress => {
                Ok(self.mark_completed(now, CompletionReason::Submitted))
            }
            InterviewStatus::Completed => Ok(Transition::Unchanged),
            InterviewStatus::Pending => Err(SessionError::InvalidState(
                "interview has not been started".to_string(),
            )),
            InterviewStatus::Cancelled => {
                Err(SessionError::TerminalState(InterviewStatus::Cancelled))
            }
        }
    }

    /// Operator cancellation from any non-terminal state. Irreversible.
    pub fn cancel(&mut self) -> Result<Transition, SessionError> {
        if self.status.is_terminal() {
            return Err(SessionError::TerminalState(self.status));
        }
        self.status = InterviewStatus::Cancelled;
        Ok(Transition::Cancelled)
    }

    fn mark_completed(&mut self, now: DateTime<Utc>, reason: CompletionReason) -> Transition {
        self.status = InterviewStatus::Completed;
        self.completed_at = Some(now);
        Transition::Completed { at: now, reason }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::models::{Question, QuestionKind};
    use chrono::Duration;
    use uuid::Uuid;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn quiz(time_limit: Option<u32>) -> Quiz {
        Quiz {
            id: Uuid::new_v4(),
            title: "Systems screen".to_string(),
            questions: vec![
                Question {
                    id: "q1".to_string(),
                    question: "Which is a smart pointer?".to_string(),
                    kind: QuestionKind::MultipleChoice {
                        options: vec!["Box".into(), "u8".into()],
                        correct_answer: Some(0),
                    },
                },
                Question {
                    id: "q2".to_string(),
                    question: "Explain Send".to_string(),
                    kind: QuestionKind::OpenQuestion { sample_answer: None },
                },
            ],
            time_limit,
        }
    }

    fn text(s: &str) -> Option<Answer> {
        Some(Answer::Text(s.to_string()))
    }

    fn started(quiz: &Quiz) -> Interview {
        let mut interview = Interview::new_pending(quiz.id, Uuid::new_v4(), t0());
        interview.start(t0()).unwrap();
        interview
    }

    #[test]
    fn test_start_sets_started_at_once() {
        let quiz = quiz(Some(60));
        let mut interview = Interview::new_pending(quiz.id, Uuid::new_v4(), t0());
        assert_eq!(
            interview.start(t0()).unwrap(),
            Transition::Started { at: t0() }
        );
        assert_eq!(interview.status, InterviewStatus::InProgress);

        let later = t0() + Duration::minutes(5);
        assert_eq!(interview.start(later).unwrap(), Transition::Unchanged);
        assert_eq!(interview.started_at, Some(t0()));
    }

    #[test]
    fn test_answer_before_start_is_invalid_state() {
        let quiz = quiz(None);
        let mut interview = Interview::new_pending(quiz.id, Uuid::new_v4(), t0());
        let err = interview
            .submit_answer(&quiz, "q1", text("0"), t0())
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidState(_)));
    }

    #[test]
    fn test_submit_does_not_change_status() {
        let quiz = quiz(Some(60));
        let mut interview = started(&quiz);
        let transition = interview
            .submit_answer(&quiz, "q1", text("0"), t0() + Duration::minutes(1))
            .unwrap();
        assert_eq!(
            transition,
            Transition::AnswerRecorded {
                question_id: "q1".to_string(),
                answer: text("0"),
            }
        );
        assert_eq!(interview.status, InterviewStatus::InProgress);
    }

    #[test]
    fn test_complete_with_unanswered_questions() {
        let quiz = quiz(Some(60));
        let mut interview = started(&quiz);
        let now = t0() + Duration::minutes(10);
        assert_eq!(
            interview.complete(now).unwrap(),
            Transition::Completed {
                at: now,
                reason: CompletionReason::Submitted
            }
        );
        assert_eq!(interview.completed_at, Some(now));
    }

    #[test]
    fn test_complete_is_idempotent() {
        let quiz = quiz(None);
        let mut interview = started(&quiz);
        interview.complete(t0()).unwrap();
        let snapshot = interview.clone();
        assert_eq!(
            interview.complete(t0() + Duration::hours(1)).unwrap(),
            Transition::Unchanged
        );
        assert_eq!(interview, snapshot);
    }

    #[test]
    fn test_complete_before_start_is_invalid() {
        let quiz = quiz(None);
        let mut interview = Interview::new_pending(quiz.id, Uuid::new_v4(), t0());
        assert!(matches!(
            interview.complete(t0()),
            Err(SessionError::InvalidState(_))
        ));
    }

    #[test]
    fn test_cancel_from_pending_and_in_progress() {
        let quiz = quiz(None);
        let mut pending = Interview::new_pending(quiz.id, Uuid::new_v4(), t0());
        assert_eq!(pending.cancel().unwrap(), Transition::Cancelled);
        assert_eq!(pending.completed_at, None);

        let mut running = started(&quiz);
        assert_eq!(running.cancel().unwrap(), Transition::Cancelled);
        assert_eq!(running.started_at, Some(t0()));
        assert_eq!(running.completed_at, None);
    }

    #[test]
    fn test_terminal_guard_leaves_interview_untouched() {
        let quiz = quiz(None);

        let mut completed = started(&quiz);
        completed
            .submit_answer(&quiz, "q1", text("1"), t0())
            .unwrap();
        completed.complete(t0()).unwrap();

        let mut cancelled = started(&quiz);
        cancelled.cancel().unwrap();

        for interview in [&mut completed, &mut cancelled] {
            let snapshot = interview.clone();
            let later = t0() + Duration::minutes(3);
            assert!(interview.start(later).is_err());
            assert!(interview
                .submit_answer(&quiz, "q2", text("late"), later)
                .is_err());
            assert!(interview.cancel().is_err());
            if interview.status == InterviewStatus::Cancelled {
                assert!(interview.complete(later).is_err());
            }
            assert_eq!(*interview, snapshot);
        }
    }

    #[test]
    fn test_expiry_forces_completion_and_rejects_answers() {
        let quiz = quiz(Some(60));
        let mut interview = started(&quiz);
        let now = t0() + Duration::minutes(61);

        assert_eq!(interview.remaining_seconds(&quiz, now), Some(0));
        assert_eq!(
            interview.detect_expiry(&quiz, now),
            Some(Transition::Completed {
                at: now,
                reason: CompletionReason::Expired
            })
        );
        assert_eq!(interview.status, InterviewStatus::Completed);
        assert_eq!(interview.completed_at, Some(now));

        let err = interview
            .submit_answer(&quiz, "q1", text("0"), now)
            .unwrap_err();
        assert_eq!(err, SessionError::Expired);
        assert!(interview.answers.is_empty());
    }

    #[test]
    fn test_expired_submission_without_detection_is_rejected() {
        let quiz = quiz(Some(1));
        let mut interview = started(&quiz);
        let err = interview
            .submit_answer(&quiz, "q1", text("0"), t0() + Duration::minutes(2))
            .unwrap_err();
        assert_eq!(err, SessionError::Expired);
        assert!(interview.answers.is_empty());
    }

    #[test]
    fn test_detect_expiry_ignores_untimed_and_pending() {
        let untimed = quiz(None);
        let mut interview = started(&untimed);
        assert_eq!(
            interview.detect_expiry(&untimed, t0() + Duration::days(3)),
            None
        );

        let timed = quiz(Some(5));
        let mut pending = Interview::new_pending(timed.id, Uuid::new_v4(), t0());
        assert_eq!(pending.detect_expiry(&timed, t0() + Duration::days(3)), None);
        assert_eq!(pending.status, InterviewStatus::Pending);
    }

    #[test]
    fn test_manually_completed_session_reports_terminal_not_expired() {
        let quiz = quiz(Some(60));
        let mut interview = started(&quiz);
        interview.complete(t0() + Duration::minutes(5)).unwrap();
        let err = interview
            .submit_answer(&quiz, "q1", text("0"), t0() + Duration::minutes(6))
            .unwrap_err();
        assert_eq!(
            err,
            SessionError::TerminalState(InterviewStatus::Completed)
        );
    }
}
