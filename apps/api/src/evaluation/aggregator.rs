//! Composite Evaluation Aggregator.
//!
//! Every signal is mapped onto a common 0–10 scale, then blended with fixed
//! weights. Only the components that are present take part in the weighted
//! average; a missing component is excluded, never counted as zero.

use serde::Serialize;

use crate::evaluation::models::{BehavioralRubric, HireRecommendation};

#[derive(Debug, Clone)]
pub struct ComponentWeights {
    pub quiz: f64,
    pub behavioral: f64,
    pub hiring: f64,
}

impl Default for ComponentWeights {
    fn default() -> Self {
        Self {
            quiz: 0.5,
            behavioral: 0.3,
            hiring: 0.2,
        }
    }
}

/// One present signal on the 0–10 scale with its fixed weight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreComponent {
    pub score: u32,
    pub weight: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ScoreBreakdown {
    pub quiz: Option<u32>,
    pub behavioral: Option<u32>,
    pub hiring: Option<u32>,
    /// `None` when no signal is available yet.
    pub overall: Option<u32>,
}

/// 0–100 quiz score → 0–10.
pub fn quiz_component(quiz_score: u32) -> u32 {
    (f64::from(quiz_score) / 10.0).round() as u32
}

/// Mean of the four required 1–5 sub-scores, doubled onto 0–10.
/// Leadership is informational and never averaged in.
pub fn behavioral_component(rubric: &BehavioralRubric) -> u32 {
    let sum = u32::from(rubric.communication)
        + u32::from(rubric.collaboration)
        + u32::from(rubric.problem_solving)
        + u32::from(rubric.culture_fit);
    (f64::from(sum) / 4.0 * 2.0).round() as u32
}

pub fn hiring_component(recommendation: HireRecommendation) -> u32 {
    match recommendation {
        HireRecommendation::StrongYes => 10,
        HireRecommendation::Yes => 8,
        HireRecommendation::Maybe => 6,
        HireRecommendation::No => 4,
        HireRecommendation::StrongNo => 2,
    }
}

/// `round(Σ score·weight / Σ weight)` over the present components.
pub fn weighted_overall(components: &[ScoreComponent]) -> Option<u32> {
    let total_weight: f64 = components.iter().map(|c| c.weight).sum();
    if components.is_empty() || total_weight <= 0.0 {
        return None;
    }
    let weighted: f64 = components
        .iter()
        .map(|c| f64::from(c.score) * c.weight)
        .sum();
    Some((weighted / total_weight).round() as u32)
}

/// Blends already-normalized 0–10 components.
pub fn overall_from_components(
    quiz: Option<u32>,
    behavioral: Option<u32>,
    hiring: Option<u32>,
    weights: &ComponentWeights,
) -> Option<u32> {
    let components: Vec<ScoreComponent> = [
        (quiz, weights.quiz),
        (behavioral, weights.behavioral),
        (hiring, weights.hiring),
    ]
    .into_iter()
    .filter_map(|(score, weight)| score.map(|score| ScoreComponent { score, weight }))
    .collect();
    weighted_overall(&components)
}

pub fn score_breakdown(
    quiz_score: Option<u32>,
    rubric: Option<&BehavioralRubric>,
    recommendation: Option<HireRecommendation>,
    weights: &ComponentWeights,
) -> ScoreBreakdown {
    let quiz = quiz_score.map(quiz_component);
    let behavioral = rubric.map(behavioral_component);
    let hiring = recommendation.map(hiring_component);
    ScoreBreakdown {
        quiz,
        behavioral,
        hiring,
        overall: overall_from_components(quiz, behavioral, hiring, weights),
    }
}

/// Overall 0–10 hire-worthiness score from the raw signals, or `None` when
/// none is available.
pub fn compute_overall_score(
    quiz_score: Option<u32>,
    rubric: Option<&BehavioralRubric>,
    recommendation: Option<HireRecommendation>,
) -> Option<u32> {
    score_breakdown(quiz_score, rubric, recommendation, &ComponentWeights::default()).overall
}
