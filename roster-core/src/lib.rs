//! # Roster-Core: Constraint-Based Roster Scheduling Engine
//!
//! This crate assigns people to events under declarative hard and soft
//! constraints: hard rules filter who is eligible, soft rules score how
//! good a feasible choice is, and the solver distributes work fairly. The
//! output is a [`models::SolutionBundle`] carrying the assignments, a
//! health score, fairness metrics and the full violation report; external
//! collaborators own persistence, transport and rendering.
//!
//! ## Quick Example
//!
//! ```no_run
//! use roster_core::models::*;
//! use roster_core::solve;
//!
//! let ctx = SolveContext {
//!     organization: Organization {
//!         id: "org-1".to_string(),
//!         name: "Riverside".to_string(),
//!         region: "CA-ON".to_string(),
//!         timezone: "America/Toronto".to_string(),
//!         defaults: OrgDefaults::default(),
//!     },
//!     people: vec![Person {
//!         id: "p1".to_string(),
//!         name: "Alice Ng".to_string(),
//!         roles: vec!["kitchen".to_string()],
//!         organization_id: "org-1".to_string(),
//!     }],
//!     teams: vec![],
//!     resources: vec![],
//!     events: vec![Event {
//!         id: "sun-1".to_string(),
//!         event_type: "service".to_string(),
//!         start: "2025-09-07T09:00:00-04:00".parse().unwrap(),
//!         end: "2025-09-07T12:00:00-04:00".parse().unwrap(),
//!         resource_id: None,
//!         team_ids: vec![],
//!         requirements: vec![RoleRequirement {
//!             role: "kitchen".to_string(),
//!             count: 1,
//!         }],
//!     }],
//!     constraints: vec![Constraint::RequireRoleCoverage {
//!         key: "coverage".to_string(),
//!     }],
//!     availability: vec![],
//!     holidays: vec![],
//!     from_date: "2025-09-01".parse().unwrap(),
//!     to_date: "2025-09-30".parse().unwrap(),
//!     mode: Mode::Strict,
//!     change_min: false,
//!     previous: None,
//!     prior_counts: None,
//! };
//!
//! match solve(&ctx) {
//!     Ok(bundle) => {
//!         println!("health: {}", bundle.metrics.health_score);
//!         println!("{}", bundle.display());
//!     }
//!     Err(e) => eprintln!("invalid context: {e}"),
//! }
//! ```
//!
//! A solve is a pure function of its context: no I/O, no global state, no
//! randomness. Two runs on the same context produce identical bundles (the
//! generation timestamp and wall-clock `solve_ms` aside), and independent
//! contexts can be solved on separate threads concurrently.

pub mod diff;
pub mod evaluator;
pub mod metrics;
pub mod models;
pub mod predicates;
pub mod validate;

pub mod solver;

pub use diff::{diff, SolutionDiff};
pub use solver::{solver_for, GreedySolver, SolveModel, Solver};
pub use validate::ConfigurationError;

use models::{SolutionBundle, SolveContext};

/// Validates the context and solves it with the greedy reference solver.
///
/// Configuration errors are the only failure mode; constraint violations
/// are reported inside the returned bundle, never as errors.
pub fn solve(ctx: &SolveContext) -> Result<SolutionBundle, ConfigurationError> {
    solve_with(ctx, &GreedySolver)
}

/// Validates the context and solves it with the given strategy.
pub fn solve_with(
    ctx: &SolveContext,
    solver: &dyn Solver,
) -> Result<SolutionBundle, ConfigurationError> {
    validate::validate(ctx)?;
    let model = SolveModel::build(ctx);
    Ok(solver.solve(&model))
}

/// Re-evaluates an existing bundle's assignments against the context,
/// recomputing violations and metrics without solving. The incoming solver
/// identity is preserved; the generation timestamp, range and mode are
/// refreshed from the context.
pub fn evaluate_bundle(
    ctx: &SolveContext,
    bundle: &SolutionBundle,
) -> Result<SolutionBundle, ConfigurationError> {
    validate::validate(ctx)?;
    let model = SolveModel::build(ctx);
    let started = std::time::Instant::now();
    let state = solver::RosterState::from_assignments(&model, &bundle.assignments)
        .map_err(ConfigurationError::InconsistentBundle)?;
    let evaluation = evaluator::evaluate(&model, &state);
    let solve_ms = started.elapsed().as_millis() as u64;

    Ok(SolutionBundle {
        meta: models::SolutionMeta {
            generated_at: chrono::Utc::now(),
            range_start: ctx.from_date,
            range_end: ctx.to_date,
            mode: ctx.mode,
            solver: bundle.meta.solver.clone(),
        },
        assignments: bundle.assignments.clone(),
        metrics: metrics::compute(
            &model,
            &state,
            evaluation.hard.len() as u32,
            evaluation.soft_score,
            solve_ms,
        ),
        violations: models::Violations {
            hard: evaluation.hard,
            soft: evaluation.soft,
        },
    })
}
