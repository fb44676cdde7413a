use std::sync::Arc;

use crate::config::Config;
use crate::evaluation::grader::QuizGrader;
use crate::evaluation::service::EvaluationService;
use crate::evaluation::store::EvaluationStore;
use crate::session::engine::SessionEngine;
use crate::session::store::SessionStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub engine: SessionEngine,
    pub evaluations: EvaluationService,
    pub config: Config,
}

impl AppState {
    /// Wires the engine and evaluation service over shared storage.
    /// The grader is pluggable: `ChoiceOnlyGrader` or `HttpQuizGrader`.
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        evaluations: Arc<dyn EvaluationStore>,
        grader: Arc<dyn QuizGrader>,
        config: Config,
    ) -> Self {
        Self {
            engine: SessionEngine::new(sessions.clone()),
            evaluations: EvaluationService::new(sessions, evaluations, grader),
            config,
        }
    }
}
