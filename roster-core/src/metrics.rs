//! Fairness and health metrics over a finished assignment state.

use crate::models::{Fairness, Metrics};
use crate::solver::{RosterState, SolveModel};
use std::collections::BTreeMap;

/// Coefficients of the health score. A single hard violation dominates any
/// realistic soft penalty under the defaults.
#[derive(Debug, Clone, Copy)]
pub struct ScoreWeights {
    pub hard: f64,
    pub soft: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        ScoreWeights {
            hard: 25.0,
            soft: 0.5,
        }
    }
}

/// `clamp(100 − Hp·H − Sp·S, 0, 100)`. Exactly 100 iff both terms are zero.
pub fn health_score(hard_violations: u32, soft_score: f64, weights: ScoreWeights) -> f64 {
    (100.0 - weights.hard * f64::from(hard_violations) - weights.soft * soft_score)
        .clamp(0.0, 100.0)
}

/// Per-person assignment counts; keys are exactly the people assigned at
/// least once.
pub fn per_person_counts(model: &SolveModel, state: &RosterState) -> BTreeMap<String, u32> {
    state
        .total_counts
        .iter()
        .enumerate()
        .filter(|&(_, &count)| count > 0)
        .map(|(p, &count)| (model.ctx.people[p].id.clone(), count))
        .collect()
}

/// Population standard deviation of assignment counts over the structurally
/// eligible people. People who never matched any event's requirements are
/// not counted; zero eligible people yields σ = 0.
pub fn fairness_stdev(model: &SolveModel, state: &RosterState) -> f64 {
    if model.structurally_eligible.is_empty() {
        return 0.0;
    }
    let counts: Vec<f64> = model
        .structurally_eligible
        .iter()
        .map(|&p| f64::from(state.total_counts[p]))
        .collect();
    let mean = counts.iter().sum::<f64>() / counts.len() as f64;
    let variance = counts.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / counts.len() as f64;
    variance.sqrt()
}

/// Assembles the full metrics block for a finished solve.
pub fn compute(
    model: &SolveModel,
    state: &RosterState,
    hard_violations: u32,
    soft_score: f64,
    solve_ms: u64,
) -> Metrics {
    Metrics {
        solve_ms,
        hard_violations,
        soft_score,
        fairness: Fairness {
            stdev: fairness_stdev(model, state),
            per_person_counts: per_person_counts(model, state),
        },
        health_score: health_score(hard_violations, soft_score, ScoreWeights::default()),
    }
}
