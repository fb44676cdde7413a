use thiserror::Error;

use crate::session::models::InterviewStatus;

/// Failures raised by the session state machine and answer store.
/// None of these are retryable: the caller has to change the request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Interview not found: {0}")]
    NotFound(String),

    #[error("Interview is already {0}")]
    TerminalState(InterviewStatus),

    #[error("Invalid interview state: {0}")]
    InvalidState(String),

    #[error("Interview time limit has been reached")]
    Expired,

    #[error("Question '{0}' is not part of this quiz")]
    UnknownQuestion(String),

    #[error("Invalid answer for question '{question_id}': {reason}")]
    InvalidAnswer { question_id: String, reason: String },
}

impl SessionError {
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::NotFound(_) => "NOT_FOUND",
            SessionError::TerminalState(_) => "SESSION_TERMINAL",
            SessionError::InvalidState(_) => "INVALID_STATE",
            SessionError::Expired => "SESSION_EXPIRED",
            SessionError::UnknownQuestion(_) => "UNKNOWN_QUESTION",
            SessionError::InvalidAnswer { .. } => "INVALID_ANSWER",
        }
    }
}
