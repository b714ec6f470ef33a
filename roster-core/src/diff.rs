//! Structural diffing of two solutions over the same event set.
//!
//! The diff works purely on `(event_id, person_id)` pairs, so it can compare
//! bundles produced by different solvers or loaded from storage. All output
//! is ordered by event id then person id.

use crate::models::SolutionBundle;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One `(event, person)` pair that appears on only one side of a diff.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct AssignmentChange {
    pub event_id: String,
    pub person_id: String,
}

/// Difference between two solutions: pairs gained, pairs lost, the events
/// whose assignee set changed and everyone touched by the change.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct SolutionDiff {
    pub added: Vec<AssignmentChange>,
    pub removed: Vec<AssignmentChange>,
    pub changed_events: Vec<String>,
    pub affected_persons: Vec<String>,
    pub total_changes: usize,
}

pub fn diff(old: &SolutionBundle, new: &SolutionBundle) -> SolutionDiff {
    let old_pairs = pairs(old);
    let new_pairs = pairs(new);

    let added: Vec<AssignmentChange> = new_pairs.difference(&old_pairs).cloned().collect();
    let removed: Vec<AssignmentChange> = old_pairs.difference(&new_pairs).cloned().collect();

    let changed_events: Vec<String> = added
        .iter()
        .chain(removed.iter())
        .map(|change| change.event_id.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let affected_persons: Vec<String> = added
        .iter()
        .chain(removed.iter())
        .map(|change| change.person_id.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let total_changes = added.len() + removed.len();
    SolutionDiff {
        added,
        removed,
        changed_events,
        affected_persons,
        total_changes,
    }
}

fn pairs(bundle: &SolutionBundle) -> BTreeSet<AssignmentChange> {
    bundle
        .assignments
        .iter()
        .flat_map(|assignment| {
            assignment
                .assignee_ids
                .iter()
                .map(|person_id| AssignmentChange {
                    event_id: assignment.event_id.clone(),
                    person_id: person_id.clone(),
                })
        })
        .collect()
}
