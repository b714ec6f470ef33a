//! Constraint evaluation over a candidate assignment state.
//!
//! Given the prebuilt model and a (possibly partial) [`RosterState`], the
//! evaluator walks the context's constraint set in declaration order and
//! produces the hard violations, the soft violation records and the soft
//! score. It is pure and deterministic: identical input yields identical
//! output, byte for byte. The greedy solver calls it once on the final
//! state; evaluate-only flows call it on states rebuilt from a bundle.

use crate::models::{CapPeriod, Constraint, Severity, Violation};
use crate::predicates;
use crate::solver::{RosterState, SolveModel};
use chrono::Datelike;

/// Result of evaluating one state against the full constraint set.
#[derive(Debug, Clone, Default)]
pub struct Evaluation {
    pub hard: Vec<Violation>,
    pub soft: Vec<Violation>,
    pub soft_score: f64,
}

pub fn evaluate(model: &SolveModel, state: &RosterState) -> Evaluation {
    let mut eval = Evaluation::default();
    for constraint in &model.ctx.constraints {
        match constraint {
            Constraint::RequireRoleCoverage { key } => {
                check_role_coverage(model, state, key, &mut eval);
            }
            Constraint::MinRestGapHours { key, hours } => {
                check_rest_gap(model, state, key, *hours, &mut eval);
            }
            Constraint::CapPerPeriod {
                key,
                max_assignments,
                period,
            } => {
                check_cap(model, state, key, *max_assignments, period, &mut eval);
            }
            Constraint::NoLongWeekendFriMon { key } => {
                check_long_weekend(model, state, key, &mut eval);
            }
            Constraint::NoOverlapExternal { key } => {
                check_overlap_external(model, state, key, &mut eval);
            }
            Constraint::RoleCooldown { key, days, weight } => {
                check_role_cooldown(model, state, key, *days, *weight, &mut eval);
            }
            Constraint::HistoricalRotation { key, weight } => {
                check_historical_rotation(model, state, key, *weight, &mut eval);
            }
            Constraint::RoundRobinBalance { key, order, weight } => {
                check_round_robin(model, state, key, order, *weight, &mut eval);
            }
        }
    }
    eval
}

fn push_soft(eval: &mut Evaluation, violation: Violation) {
    eval.soft_score += violation.weight.unwrap_or(0.0);
    eval.soft.push(violation);
}

/// One hard violation per missing required slot. Events blocked by an
/// active long-weekend constraint are skipped here; their unfilled slots
/// are reported under that constraint's key instead.
fn check_role_coverage(model: &SolveModel, state: &RosterState, key: &str, eval: &mut Evaluation) {
    for pos in 0..model.event_order.len() {
        let event = model.event_at(pos);
        if model.long_weekend_active
            && predicates::is_blocked_by_long_weekend(event.start_date(), &model.holiday_dates)
        {
            continue;
        }
        for req in &event.requirements {
            let Some(&role) = model.role_index.get(&req.role) else {
                continue;
            };
            let covered = state.slots[pos]
                .iter()
                .filter(|&&(p, _)| model.person_has_role[p][role])
                .count() as u32;
            for _ in covered..req.count {
                eval.hard.push(Violation {
                    constraint_key: key.to_string(),
                    severity: Severity::Hard,
                    event_ids: vec![event.id.clone()],
                    person_ids: Vec::new(),
                    message: format!(
                        "event `{}` has {}/{} required `{}` assignees",
                        event.id, covered, req.count, req.role
                    ),
                    weight: None,
                });
            }
        }
    }
}

fn check_rest_gap(
    model: &SolveModel,
    state: &RosterState,
    key: &str,
    hours: i64,
    eval: &mut Evaluation,
) {
    let required = chrono::Duration::hours(hours);
    for (person, positions) in state.by_person.iter().enumerate() {
        for i in 0..positions.len() {
            for j in (i + 1)..positions.len() {
                let (a, b) = (model.event_at(positions[i]), model.event_at(positions[j]));
                let gap = if a.end <= b.start {
                    b.start - a.end
                } else if b.end <= a.start {
                    a.start - b.end
                } else {
                    chrono::Duration::hours(-1) // overlap
                };
                if gap < required {
                    eval.hard.push(Violation {
                        constraint_key: key.to_string(),
                        severity: Severity::Hard,
                        event_ids: vec![a.id.clone(), b.id.clone()],
                        person_ids: vec![model.ctx.people[person].id.clone()],
                        message: format!(
                            "`{}` has less than {}h of rest between `{}` and `{}`",
                            model.ctx.people[person].id, hours, a.id, b.id
                        ),
                        weight: None,
                    });
                }
            }
        }
    }
}

/// One violation per person per exceeded window: the worst rolling window
/// anchored at one of the person's assignments, or each over-full calendar
/// bucket.
fn check_cap(
    model: &SolveModel,
    state: &RosterState,
    key: &str,
    max: u32,
    period: &CapPeriod,
    eval: &mut Evaluation,
) {
    for (person, positions) in state.by_person.iter().enumerate() {
        if positions.is_empty() {
            continue;
        }
        match period {
            CapPeriod::Rolling { days } => {
                let span = chrono::Duration::days(i64::from(*days));
                let mut worst: Option<(usize, usize)> = None; // (anchor, count)
                for i in 0..positions.len() {
                    let anchor = model.event_at(positions[i]).start;
                    let count = positions[i..]
                        .iter()
                        .take_while(|&&pos| model.event_at(pos).start - anchor < span)
                        .count();
                    if count as u32 > max && worst.map_or(true, |(_, best)| count > best) {
                        worst = Some((i, count));
                    }
                }
                if let Some((anchor, count)) = worst {
                    let window: Vec<String> = positions[anchor..anchor + count]
                        .iter()
                        .map(|&pos| model.event_at(pos).id.clone())
                        .collect();
                    eval.hard.push(Violation {
                        constraint_key: key.to_string(),
                        severity: Severity::Hard,
                        event_ids: window,
                        person_ids: vec![model.ctx.people[person].id.clone()],
                        message: format!(
                            "`{}` has {} assignments in a rolling {}-day window (cap {})",
                            model.ctx.people[person].id, count, days, max
                        ),
                        weight: None,
                    });
                }
            }
            CapPeriod::CalendarWeek | CapPeriod::CalendarMonth => {
                let mut buckets: std::collections::BTreeMap<(i32, u32), Vec<usize>> =
                    std::collections::BTreeMap::new();
                for &pos in positions {
                    let date = model.event_at(pos).start.date_naive();
                    let bucket = match period {
                        CapPeriod::CalendarWeek => {
                            (date.iso_week().year(), date.iso_week().week())
                        }
                        _ => (date.year(), date.month()),
                    };
                    buckets.entry(bucket).or_default().push(pos);
                }
                for (bucket, members) in buckets {
                    if members.len() as u32 > max {
                        eval.hard.push(Violation {
                            constraint_key: key.to_string(),
                            severity: Severity::Hard,
                            event_ids: members
                                .iter()
                                .map(|&pos| model.event_at(pos).id.clone())
                                .collect(),
                            person_ids: vec![model.ctx.people[person].id.clone()],
                            message: format!(
                                "`{}` has {} assignments in period {:?} (cap {})",
                                model.ctx.people[person].id,
                                members.len(),
                                bucket,
                                max
                            ),
                            weight: None,
                        });
                    }
                }
            }
        }
    }
}

/// Blocked events cannot be scheduled: one violation per required slot
/// (whether or not it was filled), plus one per assignee beyond the
/// requirement count when evaluating a foreign bundle.
fn check_long_weekend(model: &SolveModel, state: &RosterState, key: &str, eval: &mut Evaluation) {
    for pos in 0..model.event_order.len() {
        let event = model.event_at(pos);
        if !predicates::is_blocked_by_long_weekend(event.start_date(), &model.holiday_dates) {
            continue;
        }
        let required: u32 = event.requirements.iter().map(|r| r.count).sum();
        let assigned = state.slots[pos].len() as u32;
        let person_ids: Vec<String> = state.slots[pos]
            .iter()
            .map(|&(p, _)| model.ctx.people[p].id.clone())
            .collect();
        for _ in 0..required.max(assigned) {
            eval.hard.push(Violation {
                constraint_key: key.to_string(),
                severity: Severity::Hard,
                event_ids: vec![event.id.clone()],
                person_ids: person_ids.clone(),
                message: format!(
                    "event `{}` on {} falls inside a Fri-Mon long weekend and cannot be scheduled",
                    event.id,
                    event.start_date()
                ),
                weight: None,
            });
        }
    }
}

fn check_overlap_external(
    model: &SolveModel,
    state: &RosterState,
    key: &str,
    eval: &mut Evaluation,
) {
    for pos in 0..model.event_order.len() {
        let event = model.event_at(pos);
        for &(person, _) in &state.slots[pos] {
            if !predicates::is_available(model, person, pos) {
                eval.hard.push(Violation {
                    constraint_key: key.to_string(),
                    severity: Severity::Hard,
                    event_ids: vec![event.id.clone()],
                    person_ids: vec![model.ctx.people[person].id.clone()],
                    message: format!(
                        "`{}` is unavailable on {} but assigned to `{}`",
                        model.ctx.people[person].id,
                        event.start_date(),
                        event.id
                    ),
                    weight: None,
                });
            }
        }
    }
}

/// One trigger per assignment whose nearest earlier same-role assignment of
/// the same person is strictly less than `days` days before it.
fn check_role_cooldown(
    model: &SolveModel,
    state: &RosterState,
    key: &str,
    days: i64,
    weight: f64,
    eval: &mut Evaluation,
) {
    for (person, positions) in state.by_person.iter().enumerate() {
        let mut last_by_role: Vec<Option<usize>> = vec![None; model.roles.len()];
        for &pos in positions {
            let Some(&(_, role)) = state.slots[pos].iter().find(|&&(p, _)| p == person) else {
                continue;
            };
            if role >= model.roles.len() {
                continue;
            }
            let event = model.event_at(pos);
            if let Some(prev_pos) = last_by_role[role] {
                let prev = model.event_at(prev_pos);
                let gap_days = (event.start_date() - prev.start_date()).num_days();
                if gap_days < days {
                    push_soft(
                        eval,
                        Violation {
                            constraint_key: key.to_string(),
                            severity: Severity::Soft,
                            event_ids: vec![prev.id.clone(), event.id.clone()],
                            person_ids: vec![model.ctx.people[person].id.clone()],
                            message: format!(
                                "`{}` repeats role `{}` after {} days (cooldown {})",
                                model.ctx.people[person].id, model.roles[role], gap_days, days
                            ),
                            weight: Some(weight),
                        },
                    );
                }
            }
            last_by_role[role] = Some(pos);
        }
    }
}

/// Fractional triggers: positive deviation of each structurally eligible
/// person's count (plus historical prior) from the mean over that set.
fn check_historical_rotation(
    model: &SolveModel,
    state: &RosterState,
    key: &str,
    weight: f64,
    eval: &mut Evaluation,
) {
    if model.structurally_eligible.is_empty() {
        return;
    }
    let effective: Vec<f64> = model
        .structurally_eligible
        .iter()
        .map(|&p| f64::from(state.total_counts[p] + model.prior_counts[p]))
        .collect();
    let mean = effective.iter().sum::<f64>() / effective.len() as f64;
    for (i, &p) in model.structurally_eligible.iter().enumerate() {
        let deviation = effective[i] - mean;
        if deviation > 1e-9 {
            push_soft(
                eval,
                Violation {
                    constraint_key: key.to_string(),
                    severity: Severity::Soft,
                    event_ids: Vec::new(),
                    person_ids: vec![model.ctx.people[p].id.clone()],
                    message: format!(
                        "`{}` carries {:.1} assignments against a mean of {:.1}",
                        model.ctx.people[p].id, effective[i], mean
                    ),
                    weight: Some(weight * deviation),
                },
            );
        }
    }
}

/// Walks assignments in event order and compares each rotation-unit
/// occurrence against the declared ordering; every mismatch is one trigger.
fn check_round_robin(
    model: &SolveModel,
    state: &RosterState,
    key: &str,
    order: &[String],
    weight: f64,
    eval: &mut Evaluation,
) {
    let unit_of_person = rotation_units(model, order);
    let mut next = 0usize;
    for pos in 0..model.event_order.len() {
        let event = model.event_at(pos);
        for &(person, _) in &state.slots[pos] {
            let Some(unit) = unit_of_person[person] else {
                continue;
            };
            if unit != next % order.len() {
                push_soft(
                    eval,
                    Violation {
                        constraint_key: key.to_string(),
                        severity: Severity::Soft,
                        event_ids: vec![event.id.clone()],
                        person_ids: vec![model.ctx.people[person].id.clone()],
                        message: format!(
                            "`{}` took a turn out of rotation order at `{}` (expected `{}`)",
                            model.ctx.people[person].id,
                            event.id,
                            order[next % order.len()]
                        ),
                        weight: Some(weight),
                    },
                );
            }
            next += 1;
        }
    }
}

/// Maps each person to the rotation unit (index into `order`) they belong
/// to: the entry that is their id, or the first team entry containing them.
pub(crate) fn rotation_units(model: &SolveModel, order: &[String]) -> Vec<Option<usize>> {
    let mut unit_of_person = vec![None; model.ctx.people.len()];
    for (unit, entry) in order.iter().enumerate() {
        if let Some(&p) = model.person_index.get(entry) {
            if unit_of_person[p].is_none() {
                unit_of_person[p] = Some(unit);
            }
        } else if let Some(team) = model.ctx.teams.iter().find(|t| &t.id == entry) {
            for member in &team.members {
                if let Some(&p) = model.person_index.get(member) {
                    if unit_of_person[p].is_none() {
                        unit_of_person[p] = Some(unit);
                    }
                }
            }
        }
    }
    unit_of_person
}
