use super::*;
use crate::models::{
    AvailabilityRecord, Holiday, Mode, OrgDefaults, Organization, Person, RoleRequirement,
};
use crate::{evaluator, solve};
use chrono::{DateTime, Duration, FixedOffset};

// Helpers to build deterministic test contexts.

fn dt(s: &str) -> DateTime<FixedOffset> {
    s.parse().unwrap()
}

fn person(id: &str, roles: &[&str]) -> Person {
    Person {
        id: id.to_string(),
        name: format!("Person {}", id),
        roles: roles.iter().map(|r| r.to_string()).collect(),
        organization_id: "org".to_string(),
    }
}

fn event(id: &str, start: &str, hours: i64, requirements: &[(&str, u32)]) -> Event {
    let start = dt(start);
    Event {
        id: id.to_string(),
        event_type: "shift".to_string(),
        start,
        end: start + Duration::hours(hours),
        resource_id: None,
        team_ids: Vec::new(),
        requirements: requirements
            .iter()
            .map(|&(role, count)| RoleRequirement {
                role: role.to_string(),
                count,
            })
            .collect(),
    }
}

fn context(people: Vec<Person>, events: Vec<Event>, constraints: Vec<Constraint>) -> SolveContext {
    SolveContext {
        organization: Organization {
            id: "org".to_string(),
            name: "Test Org".to_string(),
            region: "CA-ON".to_string(),
            timezone: "America/Toronto".to_string(),
            defaults: OrgDefaults::default(),
        },
        people,
        teams: Vec::new(),
        resources: Vec::new(),
        events,
        constraints,
        availability: Vec::new(),
        holidays: Vec::new(),
        from_date: "2025-01-01".parse().unwrap(),
        to_date: "2025-12-31".parse().unwrap(),
        mode: Mode::Strict,
        change_min: false,
        previous: None,
        prior_counts: None,
    }
}

fn coverage() -> Constraint {
    Constraint::RequireRoleCoverage {
        key: "coverage".to_string(),
    }
}

#[test]
fn fills_required_roles_from_capability_sets() {
    let ctx = context(
        vec![
            person("p1", &["kitchen"]),
            person("p2", &["kitchen"]),
            person("p3", &["reception"]),
        ],
        vec![event(
            "e1",
            "2025-09-07T09:00:00-04:00",
            3,
            &[("kitchen", 2), ("reception", 1)],
        )],
        vec![coverage()],
    );

    let bundle = solve(&ctx).unwrap();
    assert_eq!(bundle.assignments.len(), 1);
    assert_eq!(
        bundle.assignments[0].assignee_ids,
        vec!["p1", "p2", "p3"],
        "requirements fill in declaration order, ids break ties"
    );
    assert_eq!(bundle.assignments[0].roles, vec!["kitchen", "kitchen", "reception"]);
    assert_eq!(bundle.metrics.hard_violations, 0);
    assert_eq!(bundle.metrics.health_score, 100.0);
}

#[test]
fn under_coverage_is_reported_never_silent() {
    // Two av_tech slots but only one person holds the role.
    let ctx = context(
        vec![person("p1", &["kitchen"]), person("p2", &["av_tech"])],
        vec![event(
            "svc",
            "2025-09-07T09:00:00-04:00",
            3,
            &[("kitchen", 1), ("av_tech", 2)],
        )],
        vec![coverage()],
    );

    let bundle = solve(&ctx).unwrap();
    // The service still appears with the roles that could be filled.
    assert_eq!(bundle.assignments.len(), 1);
    assert_eq!(bundle.assignments[0].assignee_ids, vec!["p1", "p2"]);
    assert_eq!(bundle.metrics.hard_violations, 1);
    let violation = &bundle.violations.hard[0];
    assert_eq!(violation.constraint_key, "coverage");
    assert_eq!(violation.event_ids, vec!["svc"]);
    assert!(violation.message.contains("av_tech"));
}

#[test]
fn greedy_balances_total_counts() {
    // Four interchangeable people, four single-slot events: everyone
    // works exactly once.
    let people = vec![
        person("a", &["host"]),
        person("b", &["host"]),
        person("c", &["host"]),
        person("d", &["host"]),
    ];
    let events = (0..4)
        .map(|i| {
            event(
                &format!("e{}", i),
                &format!("2025-09-{:02}T09:00:00-04:00", 8 + i),
                2,
                &[("host", 1)],
            )
        })
        .collect();
    let bundle = solve(&context(people, events, vec![coverage()])).unwrap();

    let counts = &bundle.metrics.fairness.per_person_counts;
    assert_eq!(counts.len(), 4);
    assert!(counts.values().all(|&c| c == 1));
    assert_eq!(bundle.metrics.fairness.stdev, 0.0);
}

#[test]
fn availability_is_respected_without_a_constraint() {
    let mut ctx = context(
        vec![person("a", &["host"]), person("b", &["host"])],
        vec![event("e1", "2025-09-08T09:00:00-04:00", 2, &[("host", 1)])],
        vec![coverage()],
    );
    // "a" would win the id tie-break, but is away that week.
    ctx.availability.push(AvailabilityRecord {
        person_id: "a".to_string(),
        start_date: "2025-09-01".parse().unwrap(),
        end_date: "2025-09-14".parse().unwrap(),
        reason: Some("vacation".to_string()),
    });

    let bundle = solve(&ctx).unwrap();
    assert_eq!(bundle.assignments[0].assignee_ids, vec!["b"]);
    assert_eq!(bundle.metrics.hard_violations, 0);
}

#[test]
fn rest_gap_filters_back_to_back_events() {
    let ctx = context(
        vec![person("a", &["host"]), person("b", &["host"])],
        vec![
            event("day1", "2025-09-08T09:00:00-04:00", 8, &[("host", 1)]),
            event("day2", "2025-09-09T09:00:00-04:00", 8, &[("host", 1)]),
            event("day3", "2025-09-10T09:00:00-04:00", 8, &[("host", 1)]),
        ],
        vec![
            coverage(),
            Constraint::MinRestGapHours {
                key: "rest24".to_string(),
                hours: 24,
            },
        ],
    );

    let bundle = solve(&ctx).unwrap();
    // 16h gap between shift end and next start is under 24h, so the two
    // people must alternate.
    assert_eq!(bundle.assignments[0].assignee_ids, vec!["a"]);
    assert_eq!(bundle.assignments[1].assignee_ids, vec!["b"]);
    assert_eq!(bundle.assignments[2].assignee_ids, vec!["a"]);
    assert_eq!(bundle.metrics.hard_violations, 0);
}

#[test]
fn rolling_cap_limits_assignments_per_window() {
    let people = vec![person("a", &["host"]), person("b", &["host"])];
    let events: Vec<Event> = (0..4)
        .map(|i| {
            event(
                &format!("e{}", i),
                &format!("2025-09-{:02}T09:00:00-04:00", 8 + i * 2),
                2,
                &[("host", 1)],
            )
        })
        .collect();
    let ctx = context(
        people,
        events,
        vec![
            coverage(),
            Constraint::CapPerPeriod {
                key: "cap2per30".to_string(),
                max_assignments: 2,
                period: CapPeriod::Rolling { days: 30 },
            },
        ],
    );

    let bundle = solve(&ctx).unwrap();
    assert_eq!(bundle.metrics.hard_violations, 0);
    let counts = &bundle.metrics.fairness.per_person_counts;
    assert_eq!(counts["a"], 2);
    assert_eq!(counts["b"], 2);
}

#[test]
fn calendar_month_cap_is_bucketed_not_rolling() {
    // Two events at the end of September, two at the start of October: a
    // per-month cap of 2 allows all four on one person even though a
    // rolling 30-day window would not.
    let people = vec![person("a", &["host"])];
    let events = vec![
        event("sep1", "2025-09-29T09:00:00-04:00", 2, &[("host", 1)]),
        event("sep2", "2025-09-30T09:00:00-04:00", 2, &[("host", 1)]),
        event("oct1", "2025-10-01T09:00:00-04:00", 2, &[("host", 1)]),
        event("oct2", "2025-10-02T09:00:00-04:00", 2, &[("host", 1)]),
    ];
    let ctx = context(
        people,
        events,
        vec![
            coverage(),
            Constraint::CapPerPeriod {
                key: "cap2permonth".to_string(),
                max_assignments: 2,
                period: CapPeriod::CalendarMonth,
            },
        ],
    );

    let bundle = solve(&ctx).unwrap();
    assert_eq!(bundle.assignments.len(), 4);
    assert_eq!(bundle.metrics.hard_violations, 0);
}

#[test]
fn long_weekend_blocks_event_and_reports_each_slot() {
    let mut ctx = context(
        vec![person("a", &["host"]), person("b", &["host"])],
        vec![
            event("labour", "2025-09-01T10:00:00-04:00", 2, &[("host", 2)]),
            event("midweek", "2025-09-03T10:00:00-04:00", 2, &[("host", 1)]),
        ],
        vec![
            coverage(),
            Constraint::NoLongWeekendFriMon {
                key: "no_long_weekend".to_string(),
            },
        ],
    );
    ctx.holidays.push(Holiday {
        name: "Labour Day".to_string(),
        date: "2025-09-01".parse().unwrap(),
        end_date: None,
        region: "CA-ON".to_string(),
    });

    let bundle = solve(&ctx).unwrap();
    assert_eq!(bundle.assignments.len(), 1);
    assert_eq!(bundle.assignments[0].event_id, "midweek");
    assert_eq!(bundle.metrics.hard_violations, 2); // one per blocked slot
    assert!(bundle
        .violations
        .hard
        .iter()
        .all(|v| v.constraint_key == "no_long_weekend" && v.event_ids == vec!["labour"]));
}

#[test]
fn holiday_from_another_region_does_not_block() {
    let mut ctx = context(
        vec![person("a", &["host"])],
        vec![event("labour", "2025-09-01T10:00:00-04:00", 2, &[("host", 1)])],
        vec![
            coverage(),
            Constraint::NoLongWeekendFriMon {
                key: "no_long_weekend".to_string(),
            },
        ],
    );
    ctx.holidays.push(Holiday {
        name: "Labor Day".to_string(),
        date: "2025-09-01".parse().unwrap(),
        end_date: None,
        region: "US-NY".to_string(),
    });

    let bundle = solve(&ctx).unwrap();
    assert_eq!(bundle.assignments.len(), 1);
    assert_eq!(bundle.metrics.hard_violations, 0);
}

#[test]
fn role_cooldown_steers_the_pick_when_alternatives_exist() {
    // Totals and role counts tie at the third event; only the cooldown
    // simulation separates the candidates, and it must beat the id
    // tie-break ("a" would otherwise win).
    let mut ctx = context(
        vec![person("a", &["host"]), person("b", &["host"])],
        vec![
            event("wk0", "2025-09-01T09:00:00-04:00", 2, &[("host", 1)]),
            event("wk1", "2025-09-08T09:00:00-04:00", 2, &[("host", 1)]),
            event("wk2", "2025-09-16T09:00:00-04:00", 2, &[("host", 1)]),
        ],
        vec![
            coverage(),
            Constraint::RoleCooldown {
                key: "cooldown".to_string(),
                days: 14,
                weight: 20.0,
            },
        ],
    );
    // Keep "a" off the first event so their host turn lands on wk1.
    ctx.availability.push(AvailabilityRecord {
        person_id: "a".to_string(),
        start_date: "2025-09-01".parse().unwrap(),
        end_date: "2025-09-01".parse().unwrap(),
        reason: None,
    });

    let bundle = solve(&ctx).unwrap();
    assert_eq!(bundle.assignments[0].assignee_ids, vec!["b"]);
    assert_eq!(bundle.assignments[1].assignee_ids, vec!["a"]);
    // wk2 is 8 days after a's turn but 15 after b's: b takes it.
    assert_eq!(bundle.assignments[2].assignee_ids, vec!["b"]);
    assert_eq!(bundle.metrics.soft_score, 0.0);
    assert_eq!(bundle.metrics.health_score, 100.0);
}

#[test]
fn role_cooldown_is_scored_when_unavoidable() {
    let ctx = context(
        vec![person("a", &["host"])],
        vec![
            event("wk0", "2025-09-07T09:00:00-04:00", 2, &[("host", 1)]),
            event("wk1", "2025-09-14T09:00:00-04:00", 2, &[("host", 1)]),
        ],
        vec![
            coverage(),
            Constraint::RoleCooldown {
                key: "cooldown".to_string(),
                days: 14,
                weight: 20.0,
            },
        ],
    );

    let bundle = solve(&ctx).unwrap();
    assert_eq!(bundle.metrics.hard_violations, 0);
    assert_eq!(bundle.metrics.soft_score, 20.0);
    assert_eq!(bundle.violations.soft.len(), 1);
    assert_eq!(bundle.violations.soft[0].constraint_key, "cooldown");
    assert_eq!(bundle.metrics.health_score, 90.0);
}

#[test]
fn change_minimization_prefers_previous_assignee() {
    let events = vec![event("e1", "2025-09-08T09:00:00-04:00", 2, &[("host", 1)])];
    let base = context(
        vec![person("a", &["host"]), person("b", &["host"])],
        events.clone(),
        vec![coverage()],
    );
    let first = solve(&base).unwrap();
    assert_eq!(first.assignments[0].assignee_ids, vec!["a"]);

    // Previous snapshot had "b" on the event; with change_min the solver
    // keeps them even though "a" wins the id tie-break.
    let mut previous = first.clone();
    previous.assignments[0].assignee_ids = vec!["b".to_string()];
    previous.assignments[0].assignees = vec!["Person b".to_string()];

    let mut ctx = base.clone();
    ctx.change_min = true;
    ctx.previous = Some(previous);
    let second = solve(&ctx).unwrap();
    assert_eq!(second.assignments[0].assignee_ids, vec!["b"]);

    // A zero weight disables the preference.
    ctx.organization.defaults.change_min_weight = 0.0;
    let third = solve(&ctx).unwrap();
    assert_eq!(third.assignments[0].assignee_ids, vec!["a"]);
}

#[test]
fn round_robin_deviation_is_penalized() {
    let ctx = context(
        vec![person("a", &["host"]), person("b", &["host"])],
        vec![
            event("e1", "2025-09-08T09:00:00-04:00", 2, &[("host", 1)]),
            event("e2", "2025-09-10T09:00:00-04:00", 2, &[("host", 1)]),
        ],
        vec![
            coverage(),
            Constraint::RoundRobinBalance {
                key: "rotation".to_string(),
                order: vec!["b".to_string(), "a".to_string()],
                weight: 5.0,
            },
        ],
    );
    let bundle = solve(&ctx).unwrap();
    // The declared rotation starts with "b"; the solver follows it.
    assert_eq!(bundle.assignments[0].assignee_ids, vec!["b"]);
    assert_eq!(bundle.assignments[1].assignee_ids, vec!["a"]);
    assert_eq!(bundle.metrics.soft_score, 0.0);

    // Pin the rotation the wrong way round via a foreign bundle and the
    // evaluator reports both out-of-order turns.
    let mut foreign = bundle.clone();
    foreign.assignments[0].assignee_ids = vec!["a".to_string()];
    foreign.assignments[1].assignee_ids = vec!["b".to_string()];
    foreign.assignments[0].roles.clear();
    foreign.assignments[1].roles.clear();
    let evaluated = crate::evaluate_bundle(&ctx, &foreign).unwrap();
    assert_eq!(evaluated.metrics.soft_score, 10.0);
    assert_eq!(evaluated.violations.soft.len(), 2);
}

#[test]
fn historical_priors_steer_assignment_away() {
    let mut ctx = context(
        vec![person("a", &["host"]), person("b", &["host"])],
        vec![event("e1", "2025-09-08T09:00:00-04:00", 2, &[("host", 1)])],
        vec![
            coverage(),
            Constraint::HistoricalRotation {
                key: "rotation_history".to_string(),
                weight: 1.0,
            },
        ],
    );
    ctx.prior_counts = Some([("a".to_string(), 5u32)].into_iter().collect());

    let bundle = solve(&ctx).unwrap();
    assert_eq!(bundle.assignments[0].assignee_ids, vec!["b"]);
}

#[test]
fn events_outside_the_range_are_not_scheduled() {
    let mut ctx = context(
        vec![person("a", &["host"])],
        vec![
            event("in", "2025-09-08T09:00:00-04:00", 2, &[("host", 1)]),
            event("out", "2025-11-08T09:00:00-05:00", 2, &[("host", 1)]),
        ],
        vec![coverage()],
    );
    ctx.from_date = "2025-09-01".parse().unwrap();
    ctx.to_date = "2025-09-30".parse().unwrap();

    let bundle = solve(&ctx).unwrap();
    assert_eq!(bundle.assignments.len(), 1);
    assert_eq!(bundle.assignments[0].event_id, "in");
}

#[test]
fn evaluator_matches_solver_output_on_reload() {
    let ctx = context(
        vec![
            person("p1", &["kitchen", "reception"]),
            person("p2", &["kitchen"]),
            person("p3", &["reception"]),
        ],
        vec![
            event(
                "e1",
                "2025-09-07T09:00:00-04:00",
                3,
                &[("kitchen", 1), ("reception", 1)],
            ),
            event("e2", "2025-09-14T09:00:00-04:00", 3, &[("kitchen", 2)]),
        ],
        vec![
            coverage(),
            Constraint::RoleCooldown {
                key: "cooldown".to_string(),
                days: 14,
                weight: 3.0,
            },
        ],
    );

    let bundle = solve(&ctx).unwrap();
    let reloaded = crate::evaluate_bundle(&ctx, &bundle).unwrap();
    assert_eq!(reloaded.metrics.hard_violations, bundle.metrics.hard_violations);
    assert_eq!(reloaded.metrics.soft_score, bundle.metrics.soft_score);
    assert_eq!(
        reloaded.metrics.fairness.per_person_counts,
        bundle.metrics.fairness.per_person_counts
    );
}

#[test]
fn evaluation_is_deterministic_for_identical_input() {
    let ctx = context(
        vec![person("a", &["host"]), person("b", &["host"])],
        vec![
            event("e1", "2025-09-08T09:00:00-04:00", 2, &[("host", 1)]),
            event("e2", "2025-09-10T09:00:00-04:00", 2, &[("host", 1)]),
        ],
        vec![coverage()],
    );
    let model = SolveModel::build(&ctx);
    let state = RosterState::new(&model);
    let first = evaluator::evaluate(&model, &state);
    let second = evaluator::evaluate(&model, &state);
    assert_eq!(first.hard, second.hard);
    assert_eq!(first.soft, second.soft);
    assert_eq!(first.soft_score, second.soft_score);
}

#[test]
fn validation_reports_the_first_offender_only() {
    let mut ctx = context(
        vec![person("a", &["host"]), person("a", &["host"])],
        vec![event("e1", "2025-09-08T09:00:00-04:00", 0, &[("host", 1)])],
        vec![coverage()],
    );
    // Duplicate person comes before the zero-length event in scan order.
    let err = solve(&ctx).unwrap_err();
    assert_eq!(
        err,
        crate::ConfigurationError::DuplicatePersonId("a".to_string())
    );

    ctx.people[1].id = "b".to_string();
    let err = solve(&ctx).unwrap_err();
    assert_eq!(
        err,
        crate::ConfigurationError::InvalidEventWindow {
            event_id: "e1".to_string()
        }
    );
}

#[test]
fn rotation_order_must_reference_known_people_or_teams() {
    let ctx = context(
        vec![person("a", &["host"])],
        vec![event("e1", "2025-09-08T09:00:00-04:00", 2, &[("host", 1)])],
        vec![Constraint::RoundRobinBalance {
            key: "rotation".to_string(),
            order: vec!["ghost".to_string()],
            weight: 1.0,
        }],
    );
    let err = solve(&ctx).unwrap_err();
    assert!(matches!(
        err,
        crate::ConfigurationError::UnknownRotationEntry { .. }
    ));
}

#[test]
#[should_panic(expected = "assigned twice")]
fn integrity_check_panics_on_duplicate_assignment() {
    let ctx = context(
        vec![person("a", &["host"])],
        vec![event("e1", "2025-09-08T09:00:00-04:00", 2, &[("host", 2)])],
        vec![coverage()],
    );
    let model = SolveModel::build(&ctx);
    let mut state = RosterState::new(&model);
    state.slots[0].push((0, 0));
    state.slots[0].push((0, 0));
    state.total_counts[0] = 2;
    state.verify_integrity(&model);
}
