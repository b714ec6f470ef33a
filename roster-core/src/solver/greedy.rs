//! The greedy heuristic reference solver.
//!
//! A single deterministic pass: events in `(start, id)` order, requirements
//! in declaration order. For each required role the eligible candidates are
//! ranked by a lexicographic priority key and the lowest `k` are taken.
//! Under-coverage is never silent; the evaluator turns every unfilled
//! required slot into an explicit hard violation.
//!
//! The priority key, lowest first:
//!
//! 0. change minimization — people already on this event in the previous
//!    snapshot sort first (only when `change_min` is set and the
//!    organization's `change_min_weight` is positive);
//! 1. current total assignment count (fairness);
//! 2. current count in the role being filled (role fairness);
//! 3. soft penalty a local simulation attributes to this pick;
//! 4. person id (determinism under ties).

use crate::evaluator::{self, rotation_units};
use crate::metrics;
use crate::models::{
    Assignment, Constraint, SolutionBundle, SolutionMeta, SolverInfo, Violations,
};
use crate::predicates;
use crate::solver::{RosterState, SolveModel, Solver};
use chrono::Utc;
use log::debug;
use std::time::Instant;

#[derive(Debug, Clone, Copy, Default)]
pub struct GreedySolver;

/// Rotation bookkeeping for one `round_robin_balance` constraint during the
/// pass: who maps to which unit, and how many turns have been consumed.
struct Rotation {
    unit_of_person: Vec<Option<usize>>,
    len: usize,
    weight: f64,
    next: usize,
}

impl Solver for GreedySolver {
    fn name(&self) -> &'static str {
        "greedy"
    }

    fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    fn strategy(&self) -> &'static str {
        "feasible-first"
    }

    fn solve(&self, model: &SolveModel) -> SolutionBundle {
        let started = Instant::now();
        let mut state = RosterState::new(model);

        let change_min =
            model.ctx.change_min && model.ctx.organization.defaults.change_min_weight > 0.0;
        let mut rotations: Vec<Rotation> = model
            .ctx
            .constraints
            .iter()
            .filter_map(|c| match c {
                Constraint::RoundRobinBalance { order, weight, .. } => Some(Rotation {
                    unit_of_person: rotation_units(model, order),
                    len: order.len(),
                    weight: *weight,
                    next: 0,
                }),
                _ => None,
            })
            .collect();
        // Running sum of effective counts over the eligible set, for the
        // historical-rotation part of the soft simulation.
        let mut sum_effective: f64 = model
            .structurally_eligible
            .iter()
            .map(|&p| f64::from(model.prior_counts[p]))
            .sum();

        for pos in 0..model.event_order.len() {
            let event = model.event_at(pos);
            if model.long_weekend_active
                && predicates::is_blocked_by_long_weekend(event.start_date(), &model.holiday_dates)
            {
                debug!("skipping `{}`: inside a Fri-Mon long weekend", event.id);
                continue;
            }

            for req in &event.requirements {
                let Some(&role) = model.role_index.get(&req.role) else {
                    continue;
                };
                let mut candidates: Vec<usize> = (0..model.ctx.people.len())
                    .filter(|&p| {
                        !state.is_assigned(pos, p) && eligible(model, &state, p, pos, role)
                    })
                    .collect();

                candidates.sort_by(|&a, &b| {
                    let key_a = priority_key(
                        model, &state, &rotations, sum_effective, change_min, a, pos, role,
                    );
                    let key_b = priority_key(
                        model, &state, &rotations, sum_effective, change_min, b, pos, role,
                    );
                    key_a
                        .partial_cmp(&key_b)
                        .unwrap_or(std::cmp::Ordering::Equal)
                        .then_with(|| model.ctx.people[a].id.cmp(&model.ctx.people[b].id))
                });

                for &person in candidates.iter().take(req.count as usize) {
                    state.assign(model, pos, person, role);
                    if model.structurally_eligible.contains(&person) {
                        sum_effective += 1.0;
                    }
                    for rotation in &mut rotations {
                        if rotation.unit_of_person[person].is_some() {
                            rotation.next += 1;
                        }
                    }
                }
            }
        }

        let evaluation = evaluator::evaluate(model, &state);
        state.verify_integrity(model);

        let solve_ms = started.elapsed().as_millis() as u64;
        let metrics = metrics::compute(
            model,
            &state,
            evaluation.hard.len() as u32,
            evaluation.soft_score,
            solve_ms,
        );
        debug!(
            "solved {} events in {}ms: {} hard, soft score {:.1}",
            model.event_order.len(),
            solve_ms,
            metrics.hard_violations,
            metrics.soft_score
        );

        SolutionBundle {
            meta: SolutionMeta {
                generated_at: Utc::now(),
                range_start: model.ctx.from_date,
                range_end: model.ctx.to_date,
                mode: model.ctx.mode,
                solver: SolverInfo {
                    name: self.name().to_string(),
                    version: self.version().to_string(),
                    strategy: self.strategy().to_string(),
                },
            },
            assignments: build_assignments(model, &state),
            metrics,
            violations: Violations {
                hard: evaluation.hard,
                soft: evaluation.soft,
            },
        }
    }
}

/// Hard eligibility: role held, available, and compliant with every active
/// rest-gap and cap constraint. Availability is unconditional; the rest
/// follow the declared constraint set.
fn eligible(
    model: &SolveModel,
    state: &RosterState,
    person: usize,
    pos: usize,
    role: usize,
) -> bool {
    predicates::has_required_role(model, person, role)
        && predicates::is_available(model, person, pos)
        && model
            .rest_gap_hours
            .iter()
            .all(|&hours| predicates::respects_rest_gap(model, state, person, pos, hours))
        && model
            .caps
            .iter()
            .all(|(max, period)| predicates::within_cap(model, state, person, pos, *max, period))
}

/// The lexicographic priority key, as comparable floats (person id breaks
/// remaining ties in the sort itself).
#[allow(clippy::too_many_arguments)]
fn priority_key(
    model: &SolveModel,
    state: &RosterState,
    rotations: &[Rotation],
    sum_effective: f64,
    change_min: bool,
    person: usize,
    pos: usize,
    role: usize,
) -> (u8, u32, u32, f64) {
    let event_idx = model.event_order[pos];
    let previously_here = change_min && model.previous_assignees[event_idx].contains(&person);
    (
        u8::from(!previously_here),
        state.total_counts[person],
        state.role_counts[person][role],
        soft_delta(model, state, rotations, sum_effective, person, pos, role),
    )
}

/// Local simulation of the soft constraints: the penalty this pick would
/// add if made now. Cheap and deterministic; the full evaluator has the
/// last word on the finished state.
fn soft_delta(
    model: &SolveModel,
    state: &RosterState,
    rotations: &[Rotation],
    sum_effective: f64,
    person: usize,
    pos: usize,
    role: usize,
) -> f64 {
    let date = model.event_at(pos).start_date();
    let mut delta = 0.0;

    for constraint in &model.ctx.constraints {
        match constraint {
            Constraint::RoleCooldown { days, weight, .. } => {
                let repeats = state.by_person[person].iter().any(|&other_pos| {
                    let same_role = state.slots[other_pos]
                        .iter()
                        .any(|&(p, r)| p == person && r == role);
                    same_role
                        && (date - model.event_at(other_pos).start_date())
                            .num_days()
                            .abs()
                            < *days
                });
                if repeats {
                    delta += weight;
                }
            }
            Constraint::HistoricalRotation { weight, .. } => {
                let n = model.structurally_eligible.len();
                if n > 0 {
                    let effective =
                        f64::from(state.total_counts[person] + model.prior_counts[person]) + 1.0;
                    let mean = (sum_effective + 1.0) / n as f64;
                    delta += weight * (effective - mean).max(0.0);
                }
            }
            _ => {}
        }
    }

    for rotation in rotations {
        if let Some(unit) = rotation.unit_of_person[person] {
            if unit != rotation.next % rotation.len {
                delta += rotation.weight;
            }
        }
    }

    delta
}

/// Converts the working state into the bundle's assignment list; events
/// with no assignees do not appear.
fn build_assignments(model: &SolveModel, state: &RosterState) -> Vec<Assignment> {
    (0..model.event_order.len())
        .filter(|&pos| !state.slots[pos].is_empty())
        .map(|pos| {
            let event = model.event_at(pos);
            Assignment {
                event_id: event.id.clone(),
                event_type: event.event_type.clone(),
                start: event.start,
                end: event.end,
                assignees: state.slots[pos]
                    .iter()
                    .map(|&(p, _)| model.ctx.people[p].name.clone())
                    .collect(),
                assignee_ids: state.slots[pos]
                    .iter()
                    .map(|&(p, _)| model.ctx.people[p].id.clone())
                    .collect(),
                roles: state.slots[pos]
                    .iter()
                    .map(|&(_, r)| model.roles[r].clone())
                    .collect(),
                resource_id: event.resource_id.clone(),
                team_ids: event.team_ids.clone(),
            }
        })
        .collect()
}
