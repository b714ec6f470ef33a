//! Semantic validation of a [`SolveContext`] before solving.
//!
//! Validation is fail-fast: the first offending entity is reported and the
//! solver is never invoked with an invalid context. Configuration errors
//! are a distinct category from the constraint-violation taxonomy the
//! solver reports inside a bundle.

use crate::models::{Constraint, SolveContext};
use std::collections::HashSet;
use thiserror::Error;

/// The input context violates a semantic invariant. Carries the offending
/// entity id and a precise message; surfaced to the caller before any
/// solving happens.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("duplicate person id `{0}`")]
    DuplicatePersonId(String),
    #[error("duplicate event id `{0}`")]
    DuplicateEventId(String),
    #[error("event `{event_id}` has end <= start")]
    InvalidEventWindow { event_id: String },
    #[error("date range has from_date {from} > to_date {to}")]
    InvalidDateRange { from: String, to: String },
    #[error("availability record for `{person_id}` has start_date > end_date")]
    InvalidAvailabilityWindow { person_id: String },
    #[error("availability record references unknown person `{person_id}`")]
    UnknownAvailabilityPerson { person_id: String },
    #[error("team `{team_id}` references unknown member `{person_id}`")]
    UnknownTeamMember { team_id: String, person_id: String },
    #[error("event `{event_id}` references unknown resource `{resource_id}`")]
    UnknownEventResource {
        event_id: String,
        resource_id: String,
    },
    #[error("event `{event_id}` references unknown team `{team_id}`")]
    UnknownEventTeam { event_id: String, team_id: String },
    #[error(
        "role `{role}` required by event `{event_id}` is not held by any person; \
         the requirement is infeasible by construction"
    )]
    UnstaffableRole { event_id: String, role: String },
    #[error("event `{event_id}` requires role `{role}` more than once")]
    DuplicateRoleRequirement { event_id: String, role: String },
    #[error("constraint `{key}` references unknown person or team `{entry}`")]
    UnknownRotationEntry { key: String, entry: String },
    #[error("constraint `{key}` has an invalid parameter: {detail}")]
    InvalidConstraintParameter { key: String, detail: String },
    #[error("prior_counts references unknown person `{person_id}`")]
    UnknownPriorCountPerson { person_id: String },
    #[error("bundle is inconsistent with the context: {0}")]
    InconsistentBundle(String),
}

/// Checks every semantic invariant of the context, returning the first
/// offender found. The scan order is the declaration order of the input,
/// so the reported offender is deterministic.
pub fn validate(ctx: &SolveContext) -> Result<(), ConfigurationError> {
    if ctx.from_date > ctx.to_date {
        return Err(ConfigurationError::InvalidDateRange {
            from: ctx.from_date.to_string(),
            to: ctx.to_date.to_string(),
        });
    }

    let mut person_ids = HashSet::new();
    for person in &ctx.people {
        if !person_ids.insert(person.id.as_str()) {
            return Err(ConfigurationError::DuplicatePersonId(person.id.clone()));
        }
    }

    let mut event_ids = HashSet::new();
    let team_ids: HashSet<&str> = ctx.teams.iter().map(|t| t.id.as_str()).collect();
    let resource_ids: HashSet<&str> = ctx.resources.iter().map(|r| r.id.as_str()).collect();

    for event in &ctx.events {
        if !event_ids.insert(event.id.as_str()) {
            return Err(ConfigurationError::DuplicateEventId(event.id.clone()));
        }
        if event.end <= event.start {
            return Err(ConfigurationError::InvalidEventWindow {
                event_id: event.id.clone(),
            });
        }
        if let Some(resource_id) = &event.resource_id {
            if !resource_ids.contains(resource_id.as_str()) {
                return Err(ConfigurationError::UnknownEventResource {
                    event_id: event.id.clone(),
                    resource_id: resource_id.clone(),
                });
            }
        }
        for team_id in &event.team_ids {
            if !team_ids.contains(team_id.as_str()) {
                return Err(ConfigurationError::UnknownEventTeam {
                    event_id: event.id.clone(),
                    team_id: team_id.clone(),
                });
            }
        }
        let mut seen_roles = HashSet::new();
        for req in &event.requirements {
            if !seen_roles.insert(req.role.as_str()) {
                return Err(ConfigurationError::DuplicateRoleRequirement {
                    event_id: event.id.clone(),
                    role: req.role.clone(),
                });
            }
        }
    }

    for team in &ctx.teams {
        for member in &team.members {
            if !person_ids.contains(member.as_str()) {
                return Err(ConfigurationError::UnknownTeamMember {
                    team_id: team.id.clone(),
                    person_id: member.clone(),
                });
            }
        }
    }

    for record in &ctx.availability {
        if !person_ids.contains(record.person_id.as_str()) {
            return Err(ConfigurationError::UnknownAvailabilityPerson {
                person_id: record.person_id.clone(),
            });
        }
        if record.start_date > record.end_date {
            return Err(ConfigurationError::InvalidAvailabilityWindow {
                person_id: record.person_id.clone(),
            });
        }
    }

    for constraint in &ctx.constraints {
        match constraint {
            Constraint::MinRestGapHours { key, hours } => {
                if *hours < 0 {
                    return Err(ConfigurationError::InvalidConstraintParameter {
                        key: key.clone(),
                        detail: format!("hours must be non-negative, got {}", hours),
                    });
                }
            }
            Constraint::CapPerPeriod {
                key,
                max_assignments,
                period,
            } => {
                if *max_assignments == 0 {
                    return Err(ConfigurationError::InvalidConstraintParameter {
                        key: key.clone(),
                        detail: "max_assignments must be at least 1".to_string(),
                    });
                }
                if let crate::models::CapPeriod::Rolling { days: 0 } = period {
                    return Err(ConfigurationError::InvalidConstraintParameter {
                        key: key.clone(),
                        detail: "rolling period must span at least 1 day".to_string(),
                    });
                }
            }
            Constraint::RoleCooldown { key, days, .. } => {
                if *days < 0 {
                    return Err(ConfigurationError::InvalidConstraintParameter {
                        key: key.clone(),
                        detail: format!("days must be non-negative, got {}", days),
                    });
                }
            }
            Constraint::RoundRobinBalance { key, order, .. } => {
                if order.is_empty() {
                    return Err(ConfigurationError::InvalidConstraintParameter {
                        key: key.clone(),
                        detail: "order must not be empty".to_string(),
                    });
                }
                for entry in order {
                    if !person_ids.contains(entry.as_str()) && !team_ids.contains(entry.as_str()) {
                        return Err(ConfigurationError::UnknownRotationEntry {
                            key: key.clone(),
                            entry: entry.clone(),
                        });
                    }
                }
            }
            _ => {}
        }
    }

    if let Some(prior_counts) = &ctx.prior_counts {
        for person_id in prior_counts.keys() {
            if !person_ids.contains(person_id.as_str()) {
                return Err(ConfigurationError::UnknownPriorCountPerson {
                    person_id: person_id.clone(),
                });
            }
        }
    }

    Ok(())
}

/// Non-fatal configuration diagnostics. A required role nobody holds makes
/// the requirement infeasible by construction; the solve still runs and
/// reports the uncovered slots, but callers that want to reject such a
/// context up front can surface these.
pub fn warnings(ctx: &SolveContext) -> Vec<ConfigurationError> {
    let held_roles: HashSet<&str> = ctx
        .people
        .iter()
        .flat_map(|p| p.roles.iter().map(String::as_str))
        .collect();
    let mut warnings = Vec::new();
    for event in &ctx.events {
        for req in &event.requirements {
            if req.count > 0 && !held_roles.contains(req.role.as_str()) {
                warnings.push(ConfigurationError::UnstaffableRole {
                    event_id: event.id.clone(),
                    role: req.role.clone(),
                });
            }
        }
    }
    warnings
}
