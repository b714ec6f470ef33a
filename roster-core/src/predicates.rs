//! Pure eligibility predicates.
//!
//! Each function answers one question about a `(person, event)` pair given
//! the prebuilt model and the assignment-in-progress. The evaluator and the
//! greedy solver compose these into per-constraint decisions; nothing here
//! mutates state.

use crate::models::CapPeriod;
use crate::solver::{RosterState, SolveModel};
use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// True when no availability record of `person` covers the event's start
/// date.
pub fn is_available(model: &SolveModel, person: usize, event_pos: usize) -> bool {
    let date = model.event_at(event_pos).start_date();
    !model.availability_by_person[person]
        .iter()
        .any(|&(start, end)| start <= date && date <= end)
}

/// True when the person's capability set contains `role`.
pub fn has_required_role(model: &SolveModel, person: usize, role: usize) -> bool {
    model.person_has_role[person][role]
}

/// True when assigning `person` to the event at `event_pos` keeps every gap
/// to their existing assignments at or above `gap_hours`. Overlapping
/// events produce negative gaps and fail the check.
pub fn respects_rest_gap(
    model: &SolveModel,
    state: &RosterState,
    person: usize,
    event_pos: usize,
    gap_hours: i64,
) -> bool {
    let candidate = model.event_at(event_pos);
    let required = Duration::hours(gap_hours);
    state.by_person[person].iter().all(|&other_pos| {
        let other = model.event_at(other_pos);
        let gap = if other.end <= candidate.start {
            candidate.start - other.end
        } else if candidate.end <= other.start {
            other.start - candidate.end
        } else {
            return false; // overlap
        };
        gap >= required
    })
}

/// True when adding the event at `event_pos` keeps `person` at or under
/// `max` assignments in every window described by `period`.
pub fn within_cap(
    model: &SolveModel,
    state: &RosterState,
    person: usize,
    event_pos: usize,
    max: u32,
    period: &CapPeriod,
) -> bool {
    let candidate = model.event_at(event_pos);
    let mut starts: Vec<_> = state.by_person[person]
        .iter()
        .map(|&pos| model.event_at(pos).start)
        .collect();
    starts.push(candidate.start);
    starts.sort();

    match period {
        CapPeriod::Rolling { days } => {
            let span = Duration::days(i64::from(*days));
            !starts.iter().enumerate().any(|(i, &anchor)| {
                let in_window = starts[i..].iter().take_while(|&&s| s - anchor < span).count();
                in_window as u32 > max
            })
        }
        CapPeriod::CalendarWeek => {
            bucket_max(starts.iter().map(|s| {
                let week = s.date_naive().iso_week();
                (week.year(), week.week())
            })) <= max
        }
        CapPeriod::CalendarMonth => {
            bucket_max(
                starts
                    .iter()
                    .map(|s| (s.date_naive().year(), s.date_naive().month())),
            ) <= max
        }
    }
}

fn bucket_max<K: Ord>(keys: impl Iterator<Item = K>) -> u32 {
    let mut counts = std::collections::BTreeMap::new();
    for key in keys {
        *counts.entry(key).or_insert(0u32) += 1;
    }
    counts.values().copied().max().unwrap_or(0)
}

/// True when `date` falls inside a Fri–Mon long weekend: the surrounding
/// Friday-to-Monday window contains a holiday on its Friday or its Monday.
/// Tuesday-through-Thursday dates are never blocked.
pub fn is_blocked_by_long_weekend(
    date: NaiveDate,
    holidays: &std::collections::HashSet<NaiveDate>,
) -> bool {
    let days_since_friday = match date.weekday() {
        Weekday::Fri => 0,
        Weekday::Sat => 1,
        Weekday::Sun => 2,
        Weekday::Mon => 3,
        _ => return false,
    };
    let friday = date - Duration::days(days_since_friday);
    let monday = friday + Duration::days(3);
    holidays.contains(&friday) || holidays.contains(&monday)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::HashSet;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn long_weekend_blocks_the_whole_fri_mon_window() {
        // Labour Day: Monday 2025-09-01
        let holidays: HashSet<_> = [d("2025-09-01")].into_iter().collect();

        assert!(is_blocked_by_long_weekend(d("2025-08-29"), &holidays)); // Fri
        assert!(is_blocked_by_long_weekend(d("2025-08-30"), &holidays)); // Sat
        assert!(is_blocked_by_long_weekend(d("2025-08-31"), &holidays)); // Sun
        assert!(is_blocked_by_long_weekend(d("2025-09-01"), &holidays)); // Mon
        assert!(!is_blocked_by_long_weekend(d("2025-09-02"), &holidays)); // Tue
        assert!(!is_blocked_by_long_weekend(d("2025-08-28"), &holidays)); // Thu
    }

    #[test]
    fn midweek_holiday_does_not_block() {
        // A Wednesday holiday creates no Fri–Mon long weekend.
        let holidays: HashSet<_> = [d("2025-12-24")].into_iter().collect();
        assert!(!is_blocked_by_long_weekend(d("2025-12-26"), &holidays));
        assert!(!is_blocked_by_long_weekend(d("2025-12-24"), &holidays));
    }
}
