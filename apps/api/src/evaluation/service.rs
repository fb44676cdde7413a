use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::evaluation::aggregator::{
    compute_overall_score, score_breakdown, ComponentWeights, ScoreBreakdown,
};
use crate::evaluation::grader::{GradeReport, QuizGrader};
use crate::evaluation::models::{
    BehavioralRubric, EvaluationInput, HireRecommendation, InterviewEvaluation,
};
use crate::evaluation::store::EvaluationStore;
use crate::session::error::SessionError;
use crate::session::models::{Interview, InterviewStatus};
use crate::session::store::{SessionKey, SessionStore};

const MAX_SNAPSHOT_ATTEMPTS: u32 = 3;

/// Quiz score (0-100), rubric and recommendation as currently stored.
type Signals = (
    Option<u32>,
    Option<BehavioralRubric>,
    Option<HireRecommendation>,
);

#[derive(Debug, Clone, Serialize)]
pub struct GradeOutcome {
    pub report: GradeReport,
    pub score: ScoreBreakdown,
}

/// Collects the three evaluation signals for an interview and recomputes the
/// composite score whenever one of them changes or is requested.
#[derive(Clone)]
pub struct EvaluationService {
    sessions: Arc<dyn SessionStore>,
    evaluations: Arc<dyn EvaluationStore>,
    grader: Arc<dyn QuizGrader>,
}

impl EvaluationService {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        evaluations: Arc<dyn EvaluationStore>,
        grader: Arc<dyn QuizGrader>,
    ) -> Self {
        Self {
            sessions,
            evaluations,
            grader,
        }
    }

    pub async fn put_evaluation(
        &self,
        interview_id: Uuid,
        input: EvaluationInput,
        now: DateTime<Utc>,
    ) -> Result<InterviewEvaluation, AppError> {
        input.validate()?;
        self.interview(interview_id).await?;

        let evaluation = self
            .evaluations
            .merge_evaluation(interview_id, &input, now)
            .await?;

        self.refresh_score(interview_id).await?;
        Ok(evaluation)
    }

    pub async fn put_rubric(
        &self,
        interview_id: Uuid,
        rubric: BehavioralRubric,
    ) -> Result<ScoreBreakdown, AppError> {
        rubric.validate()?;
        self.interview(interview_id).await?;
        self.evaluations.upsert_rubric(interview_id, &rubric).await?;
        self.refresh_score(interview_id).await
    }

    /// Freshly computed breakdown; nothing is cached between calls.
    pub async fn score(&self, interview_id: Uuid) -> Result<ScoreBreakdown, AppError> {
        self.interview(interview_id).await?;
        self.compute(interview_id).await
    }

    /// Grades a completed interview through the configured grader and stores
    /// the resulting quiz score.
    pub async fn grade(
        &self,
        interview_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<GradeOutcome, AppError> {
        let interview = self.interview(interview_id).await?;
        if interview.status != InterviewStatus::Completed {
            return Err(SessionError::InvalidState(format!(
                "only completed interviews can be graded (status is {})",
                interview.status
            ))
            .into());
        }
        let quiz = self
            .sessions
            .find_quiz(interview.quiz_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Quiz {} not found", interview.quiz_id)))?;

        let report = self.grader.grade(&quiz, &interview.answers).await?;
        info!(
            "Graded interview {interview_id}: quiz score {} via {}",
            report.quiz_score, report.grader_backend
        );

        let input = EvaluationInput {
            quiz_score: Some(report.quiz_score),
            ..Default::default()
        };
        self.put_evaluation(interview_id, input, now).await?;
        let score = self.compute(interview_id).await?;
        Ok(GradeOutcome { report, score })
    }

    async fn interview(&self, interview_id: Uuid) -> Result<Interview, AppError> {
        self.sessions
            .find_interview(&SessionKey::Id(interview_id))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Interview {interview_id} not found")))
    }

    async fn signals(&self, interview_id: Uuid) -> Result<Signals, AppError> {
        let evaluation = self.evaluations.find_evaluation(interview_id).await?;
        let rubric = self.evaluations.find_rubric(interview_id).await?;
        Ok((
            evaluation.as_ref().and_then(|e| e.quiz_score),
            rubric,
            evaluation.and_then(|e| e.hire_recommendation),
        ))
    }

    async fn compute(&self, interview_id: Uuid) -> Result<ScoreBreakdown, AppError> {
        let (quiz_score, rubric, recommendation) = self.signals(interview_id).await?;
        Ok(score_breakdown(
            quiz_score,
            rubric.as_ref(),
            recommendation,
            &ComponentWeights::default(),
        ))
    }

    /// Snapshots the overall score onto the interview row after an input
    /// changes. Recomputes while another writer keeps changing the signals
    /// between the snapshot and its re-read.
    async fn refresh_score(&self, interview_id: Uuid) -> Result<ScoreBreakdown, AppError> {
        let mut signals = self.signals(interview_id).await?;
        for _ in 0..MAX_SNAPSHOT_ATTEMPTS {
            let (quiz_score, rubric, recommendation) = &signals;
            let overall = compute_overall_score(*quiz_score, rubric.as_ref(), *recommendation);
            self.sessions.set_score(interview_id, overall).await?;

            let latest = self.signals(interview_id).await?;
            if latest == signals {
                break;
            }
            debug!("Evaluation inputs for {interview_id} changed during snapshot; recomputing");
            signals = latest;
        }
        let (quiz_score, rubric, recommendation) = signals;
        Ok(score_breakdown(
            quiz_score,
            rubric.as_ref(),
            recommendation,
            &ComponentWeights::default(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::grader::ChoiceOnlyGrader;
    use crate::session::engine::SessionEngine;
    use crate::session::models::{Answer, Question, QuestionKind, Quiz};
    use crate::store::MemoryStore;

    struct Fixture {
        store: Arc<MemoryStore>,
        engine: SessionEngine,
        service: EvaluationService,
        interview: Interview,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let quiz = Quiz {
            id: Uuid::new_v4(),
            title: "Data screen".to_string(),
            questions: (0..4)
                .map(|i| Question {
                    id: format!("q{i}"),
                    question: format!("Question {i}"),
                    kind: QuestionKind::MultipleChoice {
                        options: vec!["a".into(), "b".into()],
                        correct_answer: Some(1),
                    },
                })
                .collect(),
            time_limit: Some(20),
        };
        let quiz_id = quiz.id;
        store.insert_quiz(quiz).await;

        let engine = SessionEngine::new(store.clone());
        let service =
            EvaluationService::new(store.clone(), store.clone(), Arc::new(ChoiceOnlyGrader));
        let interview = engine
            .create_interview(quiz_id, Uuid::new_v4(), Utc::now())
            .await
            .unwrap();
        Fixture {
            store,
            engine,
            service,
            interview,
        }
    }

    async fn stored_score(f: &Fixture) -> Option<u32> {
        f.store
            .find_interview(&SessionKey::Id(f.interview.id))
            .await
            .unwrap()
            .unwrap()
            .score
    }

    #[tokio::test]
    async fn test_no_signals_means_no_score() {
        let f = fixture().await;
        let breakdown = f.service.score(f.interview.id).await.unwrap();
        assert_eq!(breakdown.overall, None);
    }

    #[tokio::test]
    async fn test_recommendation_alone_is_not_penalized() {
        let f = fixture().await;
        let input = EvaluationInput {
            hire_recommendation: Some(HireRecommendation::Maybe),
            ..Default::default()
        };
        f.service
            .put_evaluation(f.interview.id, input, Utc::now())
            .await
            .unwrap();
        assert_eq!(f.service.score(f.interview.id).await.unwrap().overall, Some(6));
        assert_eq!(stored_score(&f).await, Some(6));
    }

    #[tokio::test]
    async fn test_signals_arrive_independently() {
        let f = fixture().await;
        let id = f.interview.id;
        let rubric = BehavioralRubric {
            communication: 4,
            collaboration: 4,
            problem_solving: 4,
            culture_fit: 4,
            leadership: Some(1),
        };
        let breakdown = f.service.put_rubric(id, rubric).await.unwrap();
        assert_eq!(breakdown.behavioral, Some(8));
        assert_eq!(breakdown.overall, Some(8));

        let input = EvaluationInput {
            quiz_score: Some(80),
            ..Default::default()
        };
        f.service.put_evaluation(id, input, Utc::now()).await.unwrap();
        let input = EvaluationInput {
            hire_recommendation: Some(HireRecommendation::Yes),
            notes: Some("Solid systems depth".to_string()),
            ..Default::default()
        };
        let evaluation = f.service.put_evaluation(id, input, Utc::now()).await.unwrap();
        assert_eq!(evaluation.quiz_score, Some(80));

        let breakdown = f.service.score(id).await.unwrap();
        assert_eq!(breakdown.quiz, Some(8));
        assert_eq!(breakdown.hiring, Some(8));
        assert_eq!(breakdown.overall, Some(8));
    }

    /// Slows every evaluation read so concurrent writers interleave.
    struct SlowReads(Arc<MemoryStore>);

    #[async_trait::async_trait]
    impl EvaluationStore for SlowReads {
        async fn find_evaluation(
            &self,
            interview_id: Uuid,
        ) -> Result<Option<InterviewEvaluation>, AppError> {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            self.0.find_evaluation(interview_id).await
        }

        async fn merge_evaluation(
            &self,
            interview_id: Uuid,
            input: &EvaluationInput,
            now: DateTime<Utc>,
        ) -> Result<InterviewEvaluation, AppError> {
            self.0.merge_evaluation(interview_id, input, now).await
        }

        async fn find_rubric(
            &self,
            interview_id: Uuid,
        ) -> Result<Option<BehavioralRubric>, AppError> {
            self.0.find_rubric(interview_id).await
        }

        async fn upsert_rubric(
            &self,
            interview_id: Uuid,
            rubric: &BehavioralRubric,
        ) -> Result<(), AppError> {
            self.0.upsert_rubric(interview_id, rubric).await
        }
    }

    #[tokio::test]
    async fn test_concurrent_partial_evaluations_both_land() {
        let f = fixture().await;
        let id = f.interview.id;
        let service = EvaluationService::new(
            f.store.clone(),
            Arc::new(SlowReads(f.store.clone())),
            Arc::new(ChoiceOnlyGrader),
        );

        let grading = EvaluationInput {
            quiz_score: Some(100),
            ..Default::default()
        };
        let manager = EvaluationInput {
            hire_recommendation: Some(HireRecommendation::StrongNo),
            ..Default::default()
        };
        let (a, b) = tokio::join!(
            service.put_evaluation(id, grading, Utc::now()),
            service.put_evaluation(id, manager, Utc::now()),
        );
        a.unwrap();
        b.unwrap();

        let stored = f.store.find_evaluation(id).await.unwrap().unwrap();
        assert_eq!(stored.quiz_score, Some(100));
        assert_eq!(stored.hire_recommendation, Some(HireRecommendation::StrongNo));

        // round((10*0.5 + 2*0.2) / 0.7) = round(7.71) = 8
        assert_eq!(service.score(id).await.unwrap().overall, Some(8));
        assert_eq!(stored_score(&f).await, Some(8));
    }

    #[tokio::test]
    async fn test_invalid_rubric_rejected() {
        let f = fixture().await;
        let rubric = BehavioralRubric {
            communication: 0,
            collaboration: 4,
            problem_solving: 4,
            culture_fit: 4,
            leadership: None,
        };
        assert!(matches!(
            f.service.put_rubric(f.interview.id, rubric).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_interview_is_not_found() {
        let f = fixture().await;
        assert!(matches!(
            f.service.score(Uuid::new_v4()).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_grading_requires_completion() {
        let f = fixture().await;
        let result = f.service.grade(f.interview.id, Utc::now()).await;
        assert!(matches!(
            result,
            Err(AppError::Session(SessionError::InvalidState(_)))
        ));
    }

    #[tokio::test]
    async fn test_grade_stores_quiz_score() {
        let f = fixture().await;
        let token = f.interview.token.as_str();
        let now = Utc::now();
        f.engine.start(token, now).await.unwrap();
        for (qid, choice) in [("q0", "1"), ("q1", "1"), ("q2", "1"), ("q3", "0")] {
            f.engine
                .submit_answer(token, qid, Some(Answer::Text(choice.to_string())), now)
                .await
                .unwrap();
        }
        f.engine.complete(token, now).await.unwrap();

        let outcome = f.service.grade(f.interview.id, now).await.unwrap();
        assert_eq!(outcome.report.quiz_score, 75);
        // round(7.5) = 8
        assert_eq!(outcome.score.quiz, Some(8));
        assert_eq!(outcome.score.overall, Some(8));
        assert_eq!(stored_score(&f).await, Some(8));
    }
}
