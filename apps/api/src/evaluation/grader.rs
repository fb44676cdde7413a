//! Quiz grading: a pluggable, trait-based collaborator that turns a completed
//! interview's answers into a 0-100 quiz score.
//!
//! Default: `ChoiceOnlyGrader` (pure-Rust, deterministic, multiple choice only).
//! With `GRADER_URL` set: `HttpQuizGrader`, which delegates open-text and code
//! answers to the external evaluator service.
//!
//! `AppState` holds an `Arc<dyn QuizGrader>`, chosen at startup via config.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::errors::AppError;
use crate::session::models::{Answer, AnswerMap, QuestionKind, Quiz};

const MAX_RETRIES: u32 = 3;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GradeReport {
    /// 0 – 100
    pub quiz_score: u32,
    pub graded_questions: usize,
    pub grader_backend: String, // "choice" | "http"
}

#[async_trait]
pub trait QuizGrader: Send + Sync {
    async fn grade(&self, quiz: &Quiz, answers: &AnswerMap) -> Result<GradeReport, AppError>;
}

// ────────────────────────────────────────────────────────────────────────────
// ChoiceOnlyGrader
// ────────────────────────────────────────────────────────────────────────────

/// Scores multiple-choice questions against their answer key. Refuses quizzes
/// with open or code questions, which need the external evaluator.
pub struct ChoiceOnlyGrader;

#[async_trait]
impl QuizGrader for ChoiceOnlyGrader {
    async fn grade(&self, quiz: &Quiz, answers: &AnswerMap) -> Result<GradeReport, AppError> {
        grade_choices(quiz, answers)
    }
}

fn grade_choices(quiz: &Quiz, answers: &AnswerMap) -> Result<GradeReport, AppError> {
    if quiz.questions.is_empty() {
        return Err(AppError::Validation(format!(
            "Quiz {} has no questions to grade",
            quiz.id
        )));
    }

    let mut correct = 0usize;
    for question in &quiz.questions {
        let key = match &question.kind {
            QuestionKind::MultipleChoice {
                correct_answer: Some(key),
                ..
            } => *key,
            QuestionKind::MultipleChoice {
                correct_answer: None,
                ..
            } => {
                return Err(AppError::Validation(format!(
                    "Question '{}' has no answer key; configure GRADER_URL to grade it",
                    question.id
                )))
            }
            _ => {
                return Err(AppError::Validation(format!(
                    "Question '{}' is {} and needs the external evaluator (GRADER_URL)",
                    question.id,
                    question.type_str()
                )))
            }
        };

        let selected = match answers.get(&question.id) {
            Some(Some(Answer::Text(text))) => text.trim().parse::<usize>().ok(),
            _ => None,
        };
        if selected == Some(key) {
            correct += 1;
        }
    }

    let total = quiz.questions.len();
    let quiz_score = ((correct as f64 / total as f64) * 100.0).round() as u32;
    Ok(GradeReport {
        quiz_score,
        graded_questions: total,
        grader_backend: "choice".to_string(),
    })
}

// ────────────────────────────────────────────────────────────────────────────
// HttpQuizGrader
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum GraderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Evaluator error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Evaluator returned score {0}, outside 0–100")]
    OutOfRange(u32),

    #[error("Evaluator unavailable after {retries} retries")]
    Unavailable { retries: u32 },
}

impl From<GraderError> for AppError {
    fn from(e: GraderError) -> Self {
        AppError::Grader(e.to_string())
    }
}

#[derive(Debug, Serialize)]
struct GradeRequest<'a> {
    quiz: &'a Quiz,
    answers: &'a AnswerMap,
}

#[derive(Debug, Deserialize)]
struct GradeResponse {
    score: u32,
}

/// Client for the external answer evaluator.
/// Retries on 429 and 5xx with exponential backoff.
#[derive(Clone)]
pub struct HttpQuizGrader {
    client: Client,
    grade_url: String,
    api_key: Option<String>,
}

impl HttpQuizGrader {
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self, GraderError> {
        Ok(Self {
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            grade_url: format!("{}/grade", base_url.trim_end_matches('/')),
            api_key,
        })
    }

    async fn call(&self, quiz: &Quiz, answers: &AnswerMap) -> Result<GradeReport, GraderError> {
        let body = GradeRequest { quiz, answers };
        let mut last_error: Option<GraderError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s
                let delay = Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "Grader call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let mut request = self.client.post(&self.grade_url).json(&body);
            if let Some(key) = &self.api_key {
                request = request.bearer_auth(key);
            }

            let response = match request.send().await {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(GraderError::Http(e));
                    continue;
                }
            };

            let status = response.status();
            if status.as_u16() == 429 || status.is_server_error() {
                let message = response.text().await.unwrap_or_default();
                warn!("Grader returned {}: {}", status, message);
                last_error = Some(GraderError::Api {
                    status: status.as_u16(),
                    message,
                });
                continue;
            }
            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                return Err(GraderError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let graded: GradeResponse = response.json().await?;
            if graded.score > 100 {
                return Err(GraderError::OutOfRange(graded.score));
            }
            debug!("Grader scored quiz {}: {}", quiz.id, graded.score);

            return Ok(GradeReport {
                quiz_score: graded.score,
                graded_questions: quiz.questions.len(),
                grader_backend: "http".to_string(),
            });
        }

        Err(last_error.unwrap_or(GraderError::Unavailable {
            retries: MAX_RETRIES,
        }))
    }
}

#[async_trait]
impl QuizGrader for HttpQuizGrader {
    async fn grade(&self, quiz: &Quiz, answers: &AnswerMap) -> Result<GradeReport, AppError> {
        Ok(self.call(quiz, answers).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::models::Question;
    use uuid::Uuid;

    fn choice(id: &str, key: Option<usize>) -> Question {
        Question {
            id: id.to_string(),
            question: format!("Question {id}"),
            kind: QuestionKind::MultipleChoice {
                options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
                correct_answer: key,
            },
        }
    }

    fn quiz(questions: Vec<Question>) -> Quiz {
        Quiz {
            id: Uuid::new_v4(),
            title: "Fundamentals".to_string(),
            questions,
            time_limit: None,
        }
    }

    fn answers(pairs: &[(&str, &str)]) -> AnswerMap {
        pairs
            .iter()
            .map(|(q, a)| (q.to_string(), Some(Answer::Text(a.to_string()))))
            .collect()
    }

    #[test]
    fn test_all_correct_scores_100() {
        let quiz = quiz(vec![choice("q1", Some(0)), choice("q2", Some(3))]);
        let report = grade_choices(&quiz, &answers(&[("q1", "0"), ("q2", "3")])).unwrap();
        assert_eq!(report.quiz_score, 100);
        assert_eq!(report.grader_backend, "choice");
    }

    #[test]
    fn test_unanswered_counts_as_wrong() {
        let quiz = quiz(vec![
            choice("q1", Some(0)),
            choice("q2", Some(1)),
            choice("q3", Some(2)),
        ]);
        let report = grade_choices(&quiz, &answers(&[("q1", "0")])).unwrap();
        // 1/3 → 33
        assert_eq!(report.quiz_score, 33);
        assert_eq!(report.graded_questions, 3);
    }

    #[test]
    fn test_open_question_requires_external_evaluator() {
        let quiz = quiz(vec![
            choice("q1", Some(0)),
            Question {
                id: "q2".to_string(),
                question: "Explain lifetimes".to_string(),
                kind: QuestionKind::OpenQuestion {
                    sample_answer: None,
                },
            },
        ]);
        let err = grade_choices(&quiz, &answers(&[("q1", "0")])).unwrap_err();
        assert!(err.to_string().contains("GRADER_URL"));
    }

    #[test]
    fn test_missing_answer_key_is_rejected() {
        let quiz = quiz(vec![choice("q1", None)]);
        assert!(grade_choices(&quiz, &answers(&[("q1", "0")])).is_err());
    }

    #[test]
    fn test_empty_quiz_is_rejected() {
        assert!(grade_choices(&quiz(vec![]), &AnswerMap::new()).is_err());
    }

    #[test]
    fn test_grade_url_joins_cleanly() {
        let grader = HttpQuizGrader::new("http://evaluator.local/", None).unwrap();
        assert_eq!(grader.grade_url, "http://evaluator.local/grade");
    }
}
