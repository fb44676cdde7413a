pub mod health;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::evaluation::handlers as evaluation;
use crate::session::handlers as session;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Interview administration
        .route("/api/v1/interviews", post(session::handle_create_interview))
        .route("/api/v1/interviews/:id/cancel", post(session::handle_cancel))
        // Candidate sessions (token access)
        .route("/api/v1/sessions/:token", get(session::handle_get_session))
        .route("/api/v1/sessions/:token/start", post(session::handle_start))
        .route("/api/v1/sessions/:token/timer", get(session::handle_timer))
        .route(
            "/api/v1/sessions/:token/answers/:question_id",
            put(session::handle_submit_answer),
        )
        .route(
            "/api/v1/sessions/:token/complete",
            post(session::handle_complete),
        )
        // Evaluation
        .route(
            "/api/v1/interviews/:id/evaluation",
            put(evaluation::handle_put_evaluation),
        )
        .route(
            "/api/v1/interviews/:id/rubric",
            put(evaluation::handle_put_rubric),
        )
        .route(
            "/api/v1/interviews/:id/score",
            get(evaluation::handle_get_score),
        )
        .route(
            "/api/v1/interviews/:id/grade",
            post(evaluation::handle_grade),
        )
        .with_state(state)
}
