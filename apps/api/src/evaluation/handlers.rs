//! Axum route handlers for evaluation inputs and the composite score.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use chrono::Utc;
use uuid::Uuid;

use crate::errors::AppError;
use crate::evaluation::aggregator::ScoreBreakdown;
use crate::evaluation::models::{BehavioralRubric, EvaluationInput, InterviewEvaluation};
use crate::evaluation::service::GradeOutcome;
use crate::state::AppState;

/// PUT /api/v1/interviews/:id/evaluation
///
/// Merges the provided fields into the stored evaluation.
pub async fn handle_put_evaluation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Result<Json<EvaluationInput>, JsonRejection>,
) -> Result<Json<InterviewEvaluation>, AppError> {
    let Json(input) = payload?;
    let evaluation = state
        .evaluations
        .put_evaluation(id, input, Utc::now())
        .await?;
    Ok(Json(evaluation))
}

/// PUT /api/v1/interviews/:id/rubric
pub async fn handle_put_rubric(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Result<Json<BehavioralRubric>, JsonRejection>,
) -> Result<Json<ScoreBreakdown>, AppError> {
    let Json(rubric) = payload?;
    Ok(Json(state.evaluations.put_rubric(id, rubric).await?))
}

/// GET /api/v1/interviews/:id/score
pub async fn handle_get_score(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ScoreBreakdown>, AppError> {
    Ok(Json(state.evaluations.score(id).await?))
}

/// POST /api/v1/interviews/:id/grade
pub async fn handle_grade(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<GradeOutcome>, AppError> {
    Ok(Json(state.evaluations.grade(id, Utc::now()).await?))
}
