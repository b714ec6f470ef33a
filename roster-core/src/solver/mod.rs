//! Solver infrastructure: the prebuilt model, the working assignment state
//! and the strategy-agnostic solver contract.
//!
//! [`SolveModel::build`] is invoked once per solve. It converts the
//! string-keyed context into flat, index-addressable vectors (people, roles,
//! events) and precomputes the lookups every strategy needs: who holds which
//! role, per-person availability windows, the region's holiday dates and the
//! active hard-constraint parameters. The model never mutates the context.
//!
//! [`RosterState`] is the assignment-in-progress. It is owned by exactly one
//! solve at a time; per-person assignment lists are kept sorted by event
//! start so rest-gap and cap checks stay cheap.

pub mod greedy;
#[cfg(test)]
mod tests;

use crate::models::{
    Assignment, CapPeriod, Constraint, Event, SolutionBundle, SolveContext,
};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap, HashSet};

pub use greedy::GreedySolver;

/// Strategy-agnostic solver contract. `build_model` happens once (the model
/// is shared, immutable input); `solve` returns a fully formed bundle.
/// Implementations are interchangeable: the greedy heuristic is the
/// reference, and an optimizing strategy can replace it without touching
/// callers or the evaluator.
pub trait Solver {
    fn name(&self) -> &'static str;
    fn version(&self) -> &'static str;
    fn strategy(&self) -> &'static str;
    fn solve(&self, model: &SolveModel) -> SolutionBundle;
}

/// Resolves a solver by name. `"greedy"` is the reference implementation.
pub fn solver_for(name: &str) -> Option<Box<dyn Solver>> {
    match name {
        "greedy" => Some(Box::new(GreedySolver)),
        _ => None,
    }
}

/// Immutable, index-addressable view of a [`SolveContext`], precomputed once
/// per solve.
pub struct SolveModel<'a> {
    pub ctx: &'a SolveContext,

    /// Indices into `ctx.events` for events inside the date range, sorted
    /// ascending by `(start, event_id)`. This ordering is an observable
    /// contract.
    pub event_order: Vec<usize>,
    pub person_index: HashMap<String, usize>,
    pub event_index: HashMap<String, usize>,

    /// Role arena: every role named by a requirement or held by a person,
    /// in sorted order.
    pub roles: Vec<String>,
    pub role_index: BTreeMap<String, usize>,
    /// `person_has_role[p][r]`
    pub person_has_role: Vec<Vec<bool>>,

    /// Inclusive unavailability windows per person.
    pub availability_by_person: Vec<Vec<(NaiveDate, NaiveDate)>>,
    /// Holiday dates matching the organization's region.
    pub holiday_dates: HashSet<NaiveDate>,

    /// Parameters of every active `min_rest_gap_hours` constraint.
    pub rest_gap_hours: Vec<i64>,
    /// Parameters of every active `cap_per_period` constraint.
    pub caps: Vec<(u32, CapPeriod)>,
    /// Whether a `no_long_weekend_fri_mon` constraint is active.
    pub long_weekend_active: bool,

    /// For change minimization: person indices previously assigned to each
    /// event, aligned with `ctx.events`.
    pub previous_assignees: Vec<Vec<usize>>,
    /// Historical counts per person index (zero when the context carries
    /// none).
    pub prior_counts: Vec<u32>,

    /// People holding at least one role required (count > 0) by at least
    /// one event in range. Fairness is measured over this set.
    pub structurally_eligible: Vec<usize>,
}

impl<'a> SolveModel<'a> {
    /// Precomputes all indices for the given context. The context must have
    /// passed [`crate::validate::validate`].
    pub fn build(ctx: &'a SolveContext) -> Self {
        let person_index: HashMap<String, usize> = ctx
            .people
            .iter()
            .enumerate()
            .map(|(idx, p)| (p.id.clone(), idx))
            .collect();
        let event_index: HashMap<String, usize> = ctx
            .events
            .iter()
            .enumerate()
            .map(|(idx, e)| (e.id.clone(), idx))
            .collect();

        let mut event_order: Vec<usize> = ctx
            .events
            .iter()
            .enumerate()
            .filter(|(_, e)| {
                let date = e.start_date();
                ctx.from_date <= date && date <= ctx.to_date
            })
            .map(|(idx, _)| idx)
            .collect();
        event_order.sort_by(|&a, &b| {
            let (ea, eb) = (&ctx.events[a], &ctx.events[b]);
            ea.start.cmp(&eb.start).then_with(|| ea.id.cmp(&eb.id))
        });

        // Role arena over requirements and capability sets.
        let mut role_index = BTreeMap::new();
        for event in &ctx.events {
            for req in &event.requirements {
                role_index.entry(req.role.clone()).or_insert(0);
            }
        }
        for person in &ctx.people {
            for role in &person.roles {
                role_index.entry(role.clone()).or_insert(0);
            }
        }
        let roles: Vec<String> = role_index.keys().cloned().collect();
        for (idx, role) in roles.iter().enumerate() {
            role_index.insert(role.clone(), idx);
        }

        let person_has_role: Vec<Vec<bool>> = ctx
            .people
            .iter()
            .map(|p| {
                let mut held = vec![false; roles.len()];
                for role in &p.roles {
                    if let Some(&r) = role_index.get(role) {
                        held[r] = true;
                    }
                }
                held
            })
            .collect();

        let mut availability_by_person = vec![Vec::new(); ctx.people.len()];
        for record in &ctx.availability {
            if let Some(&p) = person_index.get(&record.person_id) {
                availability_by_person[p].push((record.start_date, record.end_date));
            }
        }

        let holiday_dates: HashSet<NaiveDate> = ctx
            .holidays
            .iter()
            .filter(|h| h.applies_to_region(&ctx.organization.region))
            .flat_map(|h| {
                let end = h.end_date.unwrap_or(h.date);
                h.date.iter_days().take_while(move |d| *d <= end)
            })
            .collect();

        let mut rest_gap_hours = Vec::new();
        let mut caps = Vec::new();
        let mut long_weekend_active = false;
        for constraint in &ctx.constraints {
            match constraint {
                Constraint::MinRestGapHours { hours, .. } => rest_gap_hours.push(*hours),
                Constraint::CapPerPeriod {
                    max_assignments,
                    period,
                    ..
                } => caps.push((*max_assignments, period.clone())),
                Constraint::NoLongWeekendFriMon { .. } => long_weekend_active = true,
                _ => {}
            }
        }

        let mut previous_assignees = vec![Vec::new(); ctx.events.len()];
        if let Some(previous) = &ctx.previous {
            for assignment in &previous.assignments {
                if let Some(&e) = event_index.get(&assignment.event_id) {
                    for person_id in &assignment.assignee_ids {
                        if let Some(&p) = person_index.get(person_id) {
                            previous_assignees[e].push(p);
                        }
                    }
                }
            }
        }

        let mut prior_counts = vec![0u32; ctx.people.len()];
        if let Some(priors) = &ctx.prior_counts {
            for (person_id, count) in priors {
                if let Some(&p) = person_index.get(person_id) {
                    prior_counts[p] = *count;
                }
            }
        }

        let mut required_roles = vec![false; roles.len()];
        for &e in &event_order {
            for req in &ctx.events[e].requirements {
                if req.count > 0 {
                    if let Some(&r) = role_index.get(&req.role) {
                        required_roles[r] = true;
                    }
                }
            }
        }
        let structurally_eligible: Vec<usize> = (0..ctx.people.len())
            .filter(|&p| {
                person_has_role[p]
                    .iter()
                    .enumerate()
                    .any(|(r, &held)| held && required_roles[r])
            })
            .collect();

        SolveModel {
            ctx,
            event_order,
            person_index,
            event_index,
            roles,
            role_index,
            person_has_role,
            availability_by_person,
            holiday_dates,
            rest_gap_hours,
            caps,
            long_weekend_active,
            previous_assignees,
            prior_counts,
            structurally_eligible,
        }
    }

    /// The event at a position of the solve order.
    pub fn event_at(&self, pos: usize) -> &Event {
        &self.ctx.events[self.event_order[pos]]
    }
}

/// The assignment-in-progress, indexed the same way as the model.
///
/// `slots[pos]` holds `(person_idx, role_idx)` pairs for the event at
/// `event_order[pos]`, in the order they were filled (requirement
/// declaration order). `by_person` mirrors the same data per person, sorted
/// by event start.
#[derive(Debug, Clone)]
pub struct RosterState {
    pub slots: Vec<Vec<(usize, usize)>>,
    pub by_person: Vec<Vec<usize>>,
    pub total_counts: Vec<u32>,
    /// `role_counts[p][r]`
    pub role_counts: Vec<Vec<u32>>,
}

impl RosterState {
    pub fn new(model: &SolveModel) -> Self {
        RosterState {
            slots: vec![Vec::new(); model.event_order.len()],
            by_person: vec![Vec::new(); model.ctx.people.len()],
            total_counts: vec![0; model.ctx.people.len()],
            role_counts: vec![vec![0; model.roles.len()]; model.ctx.people.len()],
        }
    }

    /// Records `person` filling `role` on the event at solve-order position
    /// `pos`, keeping the per-person list sorted by event start.
    pub fn assign(&mut self, model: &SolveModel, pos: usize, person: usize, role: usize) {
        self.slots[pos].push((person, role));
        let start = model.event_at(pos).start;
        let list = &mut self.by_person[person];
        let insert_at = list
            .partition_point(|&other| model.event_at(other).start <= start);
        list.insert(insert_at, pos);
        self.total_counts[person] += 1;
        if let Some(count) = self.role_counts[person].get_mut(role) {
            *count += 1;
        }
    }

    /// True if `person` is already assigned to the event at `pos`.
    pub fn is_assigned(&self, pos: usize, person: usize) -> bool {
        self.slots[pos].iter().any(|&(p, _)| p == person)
    }

    /// Rebuilds a state from a bundle's assignments, for evaluate-only
    /// flows. Assignments referencing ids the model does not know are
    /// reported through the returned error string (the caller maps it onto
    /// its own error type). Missing role lists are inferred by
    /// eligibility-intersect against the event's requirements.
    pub fn from_assignments(
        model: &SolveModel,
        assignments: &[Assignment],
    ) -> Result<Self, String> {
        let mut state = RosterState::new(model);
        let mut position_of_event: HashMap<usize, usize> = HashMap::new();
        for (pos, &e) in model.event_order.iter().enumerate() {
            position_of_event.insert(e, pos);
        }

        for assignment in assignments {
            let &e = model
                .event_index
                .get(&assignment.event_id)
                .ok_or_else(|| format!("unknown event `{}`", assignment.event_id))?;
            let Some(&pos) = position_of_event.get(&e) else {
                continue; // outside the solve range
            };
            if !state.slots[pos].is_empty() {
                return Err(format!(
                    "event `{}` appears in more than one assignment",
                    assignment.event_id
                ));
            }
            let event = &model.ctx.events[e];
            let mut remaining: Vec<(usize, u32)> = event
                .requirements
                .iter()
                .filter_map(|req| model.role_index.get(&req.role).map(|&r| (r, req.count)))
                .collect();

            for (i, person_id) in assignment.assignee_ids.iter().enumerate() {
                let &p = model
                    .person_index
                    .get(person_id)
                    .ok_or_else(|| format!("unknown person `{}`", person_id))?;
                let role = match assignment.roles.get(i) {
                    Some(role) if !role.is_empty() => {
                        *model
                            .role_index
                            .get(role)
                            .ok_or_else(|| format!("unknown role `{}`", role))?
                    }
                    _ => infer_role(model, p, &mut remaining),
                };
                if let Some(slot) = remaining.iter_mut().find(|(r, n)| *r == role && *n > 0) {
                    slot.1 -= 1;
                }
                state.assign(model, pos, p, role);
            }
        }
        Ok(state)
    }

    /// Checks the solver's own invariants: every slot references a known
    /// person, no person is assigned twice to one event, and the cached
    /// counts match the slots. A breach here is an internal error and
    /// panics with a diagnostic including the offending state.
    pub fn verify_integrity(&self, model: &SolveModel) {
        let mut totals = vec![0u32; model.ctx.people.len()];
        for (pos, slot) in self.slots.iter().enumerate() {
            let event = model.event_at(pos);
            let mut seen = HashSet::new();
            for &(p, r) in slot {
                assert!(
                    p < model.ctx.people.len() && r < model.roles.len(),
                    "internal error: event `{}` references person index {} / role index {} \
                     outside the model (slots: {:?})",
                    event.id,
                    p,
                    r,
                    slot
                );
                assert!(
                    seen.insert(p),
                    "internal error: person `{}` assigned twice to event `{}` (slots: {:?})",
                    model.ctx.people[p].id,
                    event.id,
                    slot
                );
                totals[p] += 1;
            }
        }
        assert_eq!(
            totals, self.total_counts,
            "internal error: cached totals diverged from slots"
        );
    }
}

/// First requirement role the person holds with remaining need, falling
/// back to any requirement role they hold, then to the first requirement.
fn infer_role(model: &SolveModel, person: usize, remaining: &mut [(usize, u32)]) -> usize {
    if let Some(&(r, _)) = remaining
        .iter()
        .find(|&&(r, n)| n > 0 && model.person_has_role[person][r])
    {
        return r;
    }
    if let Some(&(r, _)) = remaining
        .iter()
        .find(|&&(r, _)| model.person_has_role[person][r])
    {
        return r;
    }
    remaining.first().map(|&(r, _)| r).unwrap_or(0)
}
