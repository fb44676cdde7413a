//! Axum route handlers for candidate sessions and interview administration.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::session::engine::{SessionView, StartedSession, TimerView};
use crate::session::models::{Answer, Interview};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateInterviewRequest {
    pub quiz_id: Uuid,
    pub candidate_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct SubmitAnswerRequest {
    /// `null` or absent clears the answer.
    #[serde(default)]
    pub answer: Option<Answer>,
}

/// POST /api/v1/interviews
pub async fn handle_create_interview(
    State(state): State<AppState>,
    payload: Result<Json<CreateInterviewRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Interview>), AppError> {
    let Json(req) = payload?;
    let interview = state
        .engine
        .create_interview(req.quiz_id, req.candidate_id, Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(interview)))
}

/// POST /api/v1/interviews/:id/cancel
pub async fn handle_cancel(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.engine.cancel(id, Utc::now()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/sessions/:token/start
pub async fn handle_start(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<StartedSession>, AppError> {
    Ok(Json(state.engine.start(&token, Utc::now()).await?))
}

/// GET /api/v1/sessions/:token
///
/// Rehydration after reload: remaining time and resume index are computed
/// fresh on every call.
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(state.engine.get_session(&token, Utc::now()).await?))
}

/// GET /api/v1/sessions/:token/timer
pub async fn handle_timer(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<TimerView>, AppError> {
    Ok(Json(state.engine.tick(&token, Utc::now()).await?))
}

/// PUT /api/v1/sessions/:token/answers/:question_id
pub async fn handle_submit_answer(
    State(state): State<AppState>,
    Path((token, question_id)): Path<(String, String)>,
    payload: Result<Json<SubmitAnswerRequest>, JsonRejection>,
) -> Result<StatusCode, AppError> {
    let Json(req) = payload?;
    state
        .engine
        .submit_answer(&token, &question_id, req.answer, Utc::now())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/sessions/:token/complete
pub async fn handle_complete(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<StatusCode, AppError> {
    state.engine.complete(&token, Utc::now()).await?;
    Ok(StatusCode::NO_CONTENT)
}
