//! Data models and types for the roster-core API.
//!
//! This module contains all the public data structures used to describe a
//! scheduling problem (people, events, constraints), configure a solve, and
//! receive results. The API is designed to be serializable (JSON) for easy
//! integration with web services and command-line tooling.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default penalty weight for soft constraints that don't specify one.
fn default_constraint_weight() -> f64 {
    1.0
}

/// Tunable weights an organization carries into every solve.
///
/// `change_min_weight` gates the change-minimization tie-breaker of the
/// greedy solver: `0.0` disables the preference for previous assignees
/// entirely; any positive value prefers them ahead of the fairness keys.
/// It never contributes to the reported soft score. `fairness_weight` and
/// `cooldown_days` are defaults consumed by constraints that reference the
/// organization's configuration.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct OrgDefaults {
    #[serde(default = "default_change_min_weight")]
    pub change_min_weight: f64,
    #[serde(default = "default_constraint_weight")]
    pub fairness_weight: f64,
    #[serde(default = "default_cooldown_days")]
    pub cooldown_days: u32,
}

fn default_change_min_weight() -> f64 {
    10.0
}

fn default_cooldown_days() -> u32 {
    14
}

impl Default for OrgDefaults {
    fn default() -> Self {
        OrgDefaults {
            change_min_weight: default_change_min_weight(),
            fairness_weight: default_constraint_weight(),
            cooldown_days: default_cooldown_days(),
        }
    }
}

/// The organization a roster is solved for. Immutable within a solve.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Organization {
    /// Stable identifier (minted by the caller, never by the core)
    pub id: String,
    pub name: String,
    /// Region tag used to match holiday records (e.g. "CA-ON")
    #[serde(default)]
    pub region: String,
    /// IANA timezone name (e.g. "America/Toronto"); informational for the
    /// core, which works on the timezone-aware instants events carry
    pub timezone: String,
    #[serde(default)]
    pub defaults: OrgDefaults,
}

/// A person who can be assigned to events.
///
/// A person may hold multiple capability roles (e.g. `kitchen`, `L2`);
/// matching against event requirements is set-membership.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Person {
    /// Unique identifier (must be unique across all people)
    pub id: String,
    pub name: String,
    /// Capability roles, in declaration order
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub organization_id: String,
}

/// An optional named group of people with a canonical role.
///
/// Teams are referenced by constraints that reason about groups (e.g.
/// `round_robin_balance` over team ids); the solver itself assigns people,
/// not teams.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Team {
    pub id: String,
    pub name: String,
    /// Member person ids; every id must exist in the context's people
    #[serde(default)]
    pub members: Vec<String>,
    /// Canonical role this team covers
    #[serde(default)]
    pub role: String,
}

/// A schedulable resource (e.g. `main_hall`). Presence on an event is
/// informational unless a constraint declares otherwise.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Resource {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// One entry of an event's role-requirement map: the minimum number of
/// distinct assignees who must hold `role`. Requirements are processed in
/// declaration order, which is observable in the solution.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RoleRequirement {
    pub role: String,
    pub count: u32,
}

/// An event that needs role coverage.
///
/// `start` and `end` are timezone-aware instants supplied by the caller;
/// date-based rules (availability, holidays, cooldowns) use the civil date
/// of `start` in the event's own offset.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Event {
    /// Unique identifier (must be unique across all events)
    pub id: String,
    /// Type tag, e.g. "shift", "service", "match"
    #[serde(rename = "type")]
    pub event_type: String,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    #[serde(default)]
    pub resource_id: Option<String>,
    #[serde(default)]
    pub team_ids: Vec<String>,
    /// Role-requirement map in declaration order; an event with no
    /// requirements needs zero assignees
    #[serde(default)]
    pub requirements: Vec<RoleRequirement>,
}

impl Event {
    /// Civil date of the event's start, in the event's own offset.
    pub fn start_date(&self) -> NaiveDate {
        self.start.date_naive()
    }
}

/// A window during which a person is unavailable (vacation, time off).
/// The window is inclusive on both ends; a person is unavailable for any
/// event whose start date falls inside it.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AvailabilityRecord {
    pub person_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub reason: Option<String>,
}

impl AvailabilityRecord {
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

/// A named public holiday (single date or inclusive range) with a region
/// tag. An empty region matches every organization.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Holiday {
    pub name: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub region: String,
}

impl Holiday {
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.date <= date && date <= self.end_date.unwrap_or(self.date)
    }

    pub fn applies_to_region(&self, region: &str) -> bool {
        self.region.is_empty() || self.region == region
    }
}

/// Severity of a constraint or violation.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Hard,
    Soft,
}

/// Period over which `cap_per_period` counts assignments.
///
/// The rolling form anchors a window of `days` days at each assignment
/// start; the calendar forms bucket by ISO week or by (year, month).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "unit", rename_all = "snake_case")]
pub enum CapPeriod {
    Rolling { days: u32 },
    CalendarWeek,
    CalendarMonth,
}

/// A scheduling rule. The set of kinds is closed: the evaluator
/// pattern-matches exhaustively, so an unknown kind is a compile-time error
/// rather than a runtime surprise.
///
/// Every constraint carries a `key`, a stable identifier echoed in
/// violation reports and test assertions. Soft kinds carry a `weight`
/// (default 1.0); hard kinds have no weight because hard violations are
/// counted, not scored.
///
/// # Example
///
/// ```no_run
/// use roster_core::models::{CapPeriod, Constraint};
///
/// let hard = Constraint::MinRestGapHours {
///     key: "rest12".to_string(),
///     hours: 12,
/// };
/// let cap = Constraint::CapPerPeriod {
///     key: "cap4per30d".to_string(),
///     max_assignments: 4,
///     period: CapPeriod::Rolling { days: 30 },
/// };
/// let soft = Constraint::RoleCooldown {
///     key: "kitchen_cooldown".to_string(),
///     days: 14,
///     weight: 20.0,
/// };
/// ```
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Constraint {
    /// For each event, each required role `r` with requirement `n` needs at
    /// least `n` distinct assignees holding `r`. One violation per missing
    /// slot.
    RequireRoleCoverage { key: String },
    /// For every pair of events assigned to the same person, the gap
    /// between the end of the earlier and the start of the later must be
    /// at least `hours`.
    MinRestGapHours { key: String, hours: i64 },
    /// No person may exceed `max_assignments` within any window described
    /// by `period`.
    CapPerPeriod {
        key: String,
        max_assignments: u32,
        period: CapPeriod,
    },
    /// Events whose date falls inside a Fri–Mon long weekend (a Friday or
    /// Monday holiday in the organization's region) cannot be scheduled.
    NoLongWeekendFriMon { key: String },
    /// A person with an availability record overlapping the event's date is
    /// ineligible for that event.
    NoOverlapExternal { key: String },
    /// Penalize assigning a person the same role twice within `days` days.
    RoleCooldown {
        key: String,
        days: i64,
        #[serde(default = "default_constraint_weight")]
        weight: f64,
    },
    /// Penalize positive deviation of a person's assignment count from the
    /// mean, biased by `prior_counts` from a previous snapshot when the
    /// context supplies them.
    HistoricalRotation {
        key: String,
        #[serde(default = "default_constraint_weight")]
        weight: f64,
    },
    /// Penalize deviation from a declared round-robin ordering. Entries of
    /// `order` may be person ids or team ids.
    RoundRobinBalance {
        key: String,
        order: Vec<String>,
        #[serde(default = "default_constraint_weight")]
        weight: f64,
    },
}

impl Constraint {
    pub fn key(&self) -> &str {
        match self {
            Constraint::RequireRoleCoverage { key }
            | Constraint::MinRestGapHours { key, .. }
            | Constraint::CapPerPeriod { key, .. }
            | Constraint::NoLongWeekendFriMon { key }
            | Constraint::NoOverlapExternal { key }
            | Constraint::RoleCooldown { key, .. }
            | Constraint::HistoricalRotation { key, .. }
            | Constraint::RoundRobinBalance { key, .. } => key,
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Constraint::RequireRoleCoverage { .. }
            | Constraint::MinRestGapHours { .. }
            | Constraint::CapPerPeriod { .. }
            | Constraint::NoLongWeekendFriMon { .. }
            | Constraint::NoOverlapExternal { .. } => Severity::Hard,
            Constraint::RoleCooldown { .. }
            | Constraint::HistoricalRotation { .. }
            | Constraint::RoundRobinBalance { .. } => Severity::Soft,
        }
    }

    /// Penalty weight for soft kinds; `0.0` for hard kinds.
    pub fn weight(&self) -> f64 {
        match self {
            Constraint::RoleCooldown { weight, .. }
            | Constraint::HistoricalRotation { weight, .. }
            | Constraint::RoundRobinBalance { weight, .. } => *weight,
            _ => 0.0,
        }
    }
}

/// Solve mode. In `strict` mode the solver must either reach zero hard
/// violations or report every unfilled required slot explicitly; `relaxed`
/// tolerates hard violations without that obligation.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Strict,
    Relaxed,
}

/// Complete, immutable input to a solve.
///
/// The caller assembles the context from whatever storage it owns; the core
/// validates it semantically (see [`crate::validate`]) and never mutates it.
/// Two concurrent solves on independent contexts are completely
/// independent, and a context may be shared across threads by reference.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SolveContext {
    pub organization: Organization,
    pub people: Vec<Person>,
    #[serde(default)]
    pub teams: Vec<Team>,
    #[serde(default)]
    pub resources: Vec<Resource>,
    pub events: Vec<Event>,
    pub constraints: Vec<Constraint>,
    #[serde(default)]
    pub availability: Vec<AvailabilityRecord>,
    #[serde(default)]
    pub holidays: Vec<Holiday>,
    /// Inclusive date range the solve covers; events outside it are not
    /// scheduled
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    #[serde(default)]
    pub mode: Mode,
    /// When true, prefer keeping people on the events they held in
    /// `previous` (scaled by the organization's `change_min_weight`)
    #[serde(default)]
    pub change_min: bool,
    /// Previously published solution, consumed by change minimization
    #[serde(default)]
    pub previous: Option<SolutionBundle>,
    /// Historical per-person assignment counts for fairness anchoring
    #[serde(default)]
    pub prior_counts: Option<BTreeMap<String, u32>>,
}

/// One event paired with its chosen people. `roles[i]` is the requirement
/// role `assignee_ids[i]` is filling.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Assignment {
    pub event_id: String,
    pub event_type: String,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    /// Display names, aligned with `assignee_ids`
    pub assignees: Vec<String>,
    pub assignee_ids: Vec<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub resource_id: Option<String>,
    #[serde(default)]
    pub team_ids: Vec<String>,
}

/// A rule breach, hard or soft. Violations are values, not errors: the
/// solver collects them into the bundle and never propagates them as
/// failures.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Violation {
    pub constraint_key: String,
    pub severity: Severity,
    #[serde(default)]
    pub event_ids: Vec<String>,
    #[serde(default)]
    pub person_ids: Vec<String>,
    pub message: String,
    /// Penalty contributed to the soft score; absent on hard violations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

/// Fairness section of the metrics: population standard deviation of
/// per-person assignment counts over the structurally eligible people, and
/// the counts of everyone assigned at least once.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Fairness {
    pub stdev: f64,
    pub per_person_counts: BTreeMap<String, u32>,
}

/// Solution quality summary.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Metrics {
    pub solve_ms: u64,
    pub hard_violations: u32,
    pub soft_score: f64,
    pub fairness: Fairness,
    /// 0–100; exactly 100 iff zero hard violations and zero soft score
    pub health_score: f64,
}

/// Violations grouped by severity.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Violations {
    pub hard: Vec<Violation>,
    pub soft: Vec<Violation>,
}

/// Identity of the solver that produced a bundle.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SolverInfo {
    pub name: String,
    pub version: String,
    pub strategy: String,
}

/// Bundle metadata: when it was generated, for which range and mode, and by
/// which solver.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SolutionMeta {
    pub generated_at: DateTime<Utc>,
    pub range_start: NaiveDate,
    pub range_end: NaiveDate,
    pub mode: Mode,
    pub solver: SolverInfo,
}

/// The complete output of a solve: assignments, metrics and violations.
/// Pure data; serializers (JSON/CSV/ICS) live outside the core and need
/// nothing beyond this structure.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SolutionBundle {
    pub meta: SolutionMeta,
    pub assignments: Vec<Assignment>,
    pub metrics: Metrics,
    pub violations: Violations,
}

impl SolutionBundle {
    /// Formats the roster as a human-readable string, one block per event
    /// in chronological order.
    ///
    /// # Example Output
    ///
    /// ```text
    /// ========== 2025-09-07 09:00 service sun-1 ==========
    /// kitchen: Alice Ng, Ben Okafor
    /// reception: Carol Fine, Dae-Jung Kim
    /// ```
    pub fn display(&self) -> String {
        let mut output = String::new();
        for assignment in &self.assignments {
            output.push_str(&format!(
                "========== {} {} {} ==========\n",
                assignment.start.format("%Y-%m-%d %H:%M"),
                assignment.event_type,
                assignment.event_id
            ));
            let mut by_role: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
            for (i, name) in assignment.assignees.iter().enumerate() {
                let role = assignment.roles.get(i).map(String::as_str).unwrap_or("");
                by_role.entry(role).or_default().push(name);
            }
            for (role, names) in by_role {
                let label = if role.is_empty() { "assigned" } else { role };
                output.push_str(&format!("{}: {}\n", label, names.join(", ")));
            }
            output.push('\n');
        }
        if !self.violations.hard.is_empty() {
            output.push_str(&format!(
                "{} hard violation(s):\n",
                self.violations.hard.len()
            ));
            for v in &self.violations.hard {
                output.push_str(&format!("  [{}] {}\n", v.constraint_key, v.message));
            }
        }
        output
    }
}
