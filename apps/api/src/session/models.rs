use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of an interview. `Completed` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InterviewStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl InterviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterviewStatus::Pending => "pending",
            InterviewStatus::InProgress => "in_progress",
            InterviewStatus::Completed => "completed",
            InterviewStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, InterviewStatus::Completed | InterviewStatus::Cancelled)
    }
}

impl fmt::Display for InterviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InterviewStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(InterviewStatus::Pending),
            "in_progress" => Ok(InterviewStatus::InProgress),
            "completed" => Ok(InterviewStatus::Completed),
            "cancelled" => Ok(InterviewStatus::Cancelled),
            other => Err(format!("unknown interview status '{other}'")),
        }
    }
}

/// A recorded answer. Multiple-choice answers carry the selected option index
/// as text, open questions carry free text, code questions carry `{ "code": .. }`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Answer {
    Code { code: String },
    Text(String),
}

/// Question id → answer. A `None` value is an explicitly cleared answer and
/// counts as unanswered.
pub type AnswerMap = BTreeMap<String, Option<Answer>>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionKind {
    MultipleChoice {
        options: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        correct_answer: Option<usize>,
    },
    OpenQuestion {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sample_answer: Option<String>,
    },
    CodeSnippet {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        language: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code_snippet: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sample_answer: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Question {
    pub id: String,
    #[serde(default)]
    pub question: String,
    #[serde(flatten)]
    pub kind: QuestionKind,
}

impl Question {
    pub fn type_str(&self) -> &'static str {
        match self.kind {
            QuestionKind::MultipleChoice { .. } => "multiple_choice",
            QuestionKind::OpenQuestion { .. } => "open_question",
            QuestionKind::CodeSnippet { .. } => "code_snippet",
        }
    }

    /// Copy of the question without answer keys, safe to show a candidate.
    pub fn redacted(&self) -> Question {
        let kind = match &self.kind {
            QuestionKind::MultipleChoice { options, .. } => QuestionKind::MultipleChoice {
                options: options.clone(),
                correct_answer: None,
            },
            QuestionKind::OpenQuestion { .. } => QuestionKind::OpenQuestion {
                sample_answer: None,
            },
            QuestionKind::CodeSnippet {
                language,
                code_snippet,
                ..
            } => QuestionKind::CodeSnippet {
                language: language.clone(),
                code_snippet: code_snippet.clone(),
                sample_answer: None,
            },
        };
        Question {
            id: self.id.clone(),
            question: self.question.clone(),
            kind,
        }
    }
}

/// Read-only question bank for one interview.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Quiz {
    pub id: Uuid,
    pub title: String,
    pub questions: Vec<Question>,
    /// Minutes; `None` means untimed.
    pub time_limit: Option<u32>,
}

impl Quiz {
    pub fn question(&self, question_id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == question_id)
    }
}

/// One candidate's attempt at one quiz.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Interview {
    pub id: Uuid,
    pub token: String,
    pub quiz_id: Uuid,
    pub candidate_id: Uuid,
    pub status: InterviewStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub answers: AnswerMap,
    pub score: Option<u32>,
    pub created_at: DateTime<Utc>,
}

impl Interview {
    /// A fresh pending interview with a random opaque access token.
    pub fn new_pending(quiz_id: Uuid, candidate_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            token: Uuid::new_v4().simple().to_string(),
            quiz_id,
            candidate_id,
            status: InterviewStatus::Pending,
            started_at: None,
            completed_at: None,
            answers: AnswerMap::new(),
            score: None,
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answer_json_shapes() {
        let text: Answer = serde_json::from_str("\"2\"").unwrap();
        assert_eq!(text, Answer::Text("2".to_string()));

        let code: Answer = serde_json::from_str(r#"{"code": "fn main() {}"}"#).unwrap();
        assert_eq!(
            code,
            Answer::Code {
                code: "fn main() {}".to_string()
            }
        );
    }

    #[test]
    fn test_question_tagged_by_type() {
        let raw = r#"{
            "id": "q1",
            "question": "Pick one",
            "type": "multiple_choice",
            "options": ["a", "b"],
            "correct_answer": 1
        }"#;
        let q: Question = serde_json::from_str(raw).unwrap();
        assert_eq!(q.type_str(), "multiple_choice");
        assert_eq!(
            q.kind,
            QuestionKind::MultipleChoice {
                options: vec!["a".to_string(), "b".to_string()],
                correct_answer: Some(1),
            }
        );
    }

    #[test]
    fn test_redacted_strips_answer_keys() {
        let q = Question {
            id: "q1".to_string(),
            question: "Pick one".to_string(),
            kind: QuestionKind::MultipleChoice {
                options: vec!["a".to_string()],
                correct_answer: Some(0),
            },
        };
        let json = serde_json::to_value(q.redacted()).unwrap();
        assert!(json.get("correct_answer").is_none());
        assert_eq!(json["type"], "multiple_choice");
    }

    #[test]
    fn test_status_roundtrips_through_str() {
        for status in [
            InterviewStatus::Pending,
            InterviewStatus::InProgress,
            InterviewStatus::Completed,
            InterviewStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<InterviewStatus>().unwrap(), status);
        }
        assert!("archived".parse::<InterviewStatus>().is_err());
    }
}
