//! Answer Store: per-interview custody of submitted answers.

use crate::session::error::SessionError;
use crate::session::models::{
    Answer, AnswerMap, Interview, InterviewStatus, Question, QuestionKind, Quiz,
};

/// Records `answer` for `question_id`, replacing any earlier value.
///
/// Requires an `in_progress` interview and a question that belongs to `quiz`.
/// Never changes the interview status.
pub fn upsert_answer(
    interview: &mut Interview,
    quiz: &Quiz,
    question_id: &str,
    answer: Option<Answer>,
) -> Result<(), SessionError> {
    if interview.status != InterviewStatus::InProgress {
        return Err(SessionError::InvalidState(format!(
            "answers can only be recorded while in_progress (status is {})",
            interview.status
        )));
    }
    let question = quiz
        .question(question_id)
        .ok_or_else(|| SessionError::UnknownQuestion(question_id.to_string()))?;

    if let Some(answer) = &answer {
        validate_answer(question, answer)?;
    }

    interview.answers.insert(question_id.to_string(), answer);
    Ok(())
}

/// Checks that the answer variant matches the question type.
pub fn validate_answer(question: &Question, answer: &Answer) -> Result<(), SessionError> {
    let invalid = |reason: String| SessionError::InvalidAnswer {
        question_id: question.id.clone(),
        reason,
    };

    match (&question.kind, answer) {
        (QuestionKind::MultipleChoice { options, .. }, Answer::Text(selected)) => {
            let index: usize = selected
                .trim()
                .parse()
                .map_err(|_| invalid(format!("'{selected}' is not an option index")))?;
            if index >= options.len() {
                return Err(invalid(format!(
                    "option {index} out of range (question has {} options)",
                    options.len()
                )));
            }
            Ok(())
        }
        (QuestionKind::OpenQuestion { .. }, Answer::Text(_)) => Ok(()),
        (QuestionKind::CodeSnippet { .. }, Answer::Code { .. }) => Ok(()),
        (QuestionKind::CodeSnippet { .. }, Answer::Text(_)) => {
            Err(invalid("code questions expect a { code } submission".to_string()))
        }
        (_, Answer::Code { .. }) => Err(invalid(format!(
            "{} questions do not accept code submissions",
            question.type_str()
        ))),
    }
}

pub fn is_answered(answers: &AnswerMap, question_id: &str) -> bool {
    matches!(answers.get(question_id), Some(Some(_)))
}

/// Index of the first unanswered question, used to resume a session.
///
/// Returns the last index when every question is answered and `0` for an
/// empty question list.
pub fn find_first_unanswered(questions: &[Question], answers: &AnswerMap) -> usize {
    questions
        .iter()
        .position(|q| !is_answered(answers, &q.id))
        .unwrap_or_else(|| questions.len().saturating_sub(1))
}
