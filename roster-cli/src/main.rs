//! roster-cli: Command-line interface for the roster scheduling engine
//!
//! The CLI is the external-collaborator shell: it loads a solve context
//! from JSON, runs validation and the solver, and renders the resulting
//! bundle in the formats the engine itself deliberately does not own.
//!
//! # Commands
//!
//! - `solve`: Run the solver on a context file
//! - `validate`: Validate a context file without solving
//! - `evaluate`: Re-evaluate an existing bundle against a context
//! - `diff`: Compare two solution bundles
//! - `export`: Render a bundle as CSV or ICS
//! - `schema`: Print example JSON for the input/output formats

mod export;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use roster_core::models::{SolutionBundle, SolveContext};
use roster_core::{diff, evaluate_bundle, solve, solve_with, solver_for, validate};
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "roster-cli")]
#[command(version = "0.1.0")]
#[command(about = "Constraint-based roster scheduling", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportFormat {
    Csv,
    Ics,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the solver on a context file
    Solve {
        /// Input JSON file path (use --stdin to read from stdin)
        #[arg(value_name = "FILE")]
        input: Option<PathBuf>,

        /// Read input from stdin instead of a file
        #[arg(long)]
        stdin: bool,

        /// Solver strategy to use
        #[arg(long, default_value = "greedy")]
        solver: String,

        /// Output file path (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Validate a context file without solving
    Validate {
        /// Input JSON file path
        #[arg(value_name = "FILE")]
        input: Option<PathBuf>,

        /// Read input from stdin instead of a file
        #[arg(long)]
        stdin: bool,
    },

    /// Re-evaluate an existing bundle against a context (no solving)
    Evaluate {
        /// Context JSON file path
        #[arg(value_name = "CONTEXT")]
        context: PathBuf,

        /// Bundle JSON file path
        #[arg(value_name = "BUNDLE")]
        bundle: PathBuf,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Compare two solution bundles
    Diff {
        /// Previously published bundle
        #[arg(value_name = "OLD")]
        old: PathBuf,

        /// Newly produced bundle
        #[arg(value_name = "NEW")]
        new: PathBuf,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Render a bundle as CSV or ICS
    Export {
        /// Bundle JSON file path
        #[arg(value_name = "BUNDLE")]
        bundle: PathBuf,

        /// Output format
        #[arg(long, value_enum)]
        format: ExportFormat,

        /// Output file path (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print example JSON for the input/output formats
    Schema {
        /// Which schema to print: context, bundle, or all
        #[arg(value_name = "TYPE", default_value = "all")]
        schema_type: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Solve {
            input,
            stdin,
            solver,
            output,
            pretty,
        } => cmd_solve(input, stdin, &solver, output, pretty),

        Commands::Validate { input, stdin } => cmd_validate(input, stdin),

        Commands::Evaluate {
            context,
            bundle,
            pretty,
        } => cmd_evaluate(context, bundle, pretty),

        Commands::Diff { old, new, pretty } => cmd_diff(old, new, pretty),

        Commands::Export {
            bundle,
            format,
            output,
        } => cmd_export(bundle, format, output),

        Commands::Schema { schema_type } => cmd_schema(&schema_type),
    }
}

fn read_input(file: Option<PathBuf>, use_stdin: bool) -> Result<String> {
    if use_stdin {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read from stdin")?;
        Ok(buffer)
    } else if let Some(path) = file {
        fs::read_to_string(&path).with_context(|| format!("Failed to read file: {:?}", path))
    } else {
        anyhow::bail!("Either provide an input file or use --stdin")
    }
}

fn read_bundle(path: &PathBuf) -> Result<SolutionBundle> {
    let json = fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    serde_json::from_str(&json).with_context(|| format!("Failed to parse bundle {:?}", path))
}

fn write_output(output: Option<PathBuf>, content: &str) -> Result<()> {
    if let Some(path) = output {
        fs::write(&path, content).with_context(|| format!("Failed to write {:?}", path))?;
        eprintln!("Written to {:?}", path);
    } else {
        println!("{}", content);
    }
    Ok(())
}

fn cmd_solve(
    input: Option<PathBuf>,
    stdin: bool,
    solver: &str,
    output: Option<PathBuf>,
    pretty: bool,
) -> Result<()> {
    let json_str = read_input(input, stdin)?;
    let ctx: SolveContext =
        serde_json::from_str(&json_str).context("Failed to parse context JSON")?;

    for warning in validate::warnings(&ctx) {
        eprintln!("warning: {}", warning);
    }

    let bundle = if solver == "greedy" {
        solve(&ctx)?
    } else {
        let strategy =
            solver_for(solver).ok_or_else(|| anyhow::anyhow!("Unknown solver: {}", solver))?;
        solve_with(&ctx, strategy.as_ref())?
    };
    eprintln!(
        "{} assignments, {} hard violations, health {}",
        bundle.assignments.len(),
        bundle.metrics.hard_violations,
        bundle.metrics.health_score
    );

    let output_json = if pretty {
        serde_json::to_string_pretty(&bundle)?
    } else {
        serde_json::to_string(&bundle)?
    };
    write_output(output, &output_json)
}

fn cmd_validate(input: Option<PathBuf>, stdin: bool) -> Result<()> {
    let json_str = read_input(input, stdin)?;
    let ctx: SolveContext = serde_json::from_str(&json_str).context("JSON parse error")?;

    let warnings: Vec<String> = validate::warnings(&ctx)
        .iter()
        .map(|w| w.to_string())
        .collect();
    let report = match validate::validate(&ctx) {
        Ok(()) => serde_json::json!({
            "valid": true,
            "warnings": warnings,
        }),
        Err(e) => serde_json::json!({
            "valid": false,
            "error": e.to_string(),
            "warnings": warnings,
        }),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn cmd_evaluate(context: PathBuf, bundle: PathBuf, pretty: bool) -> Result<()> {
    let ctx: SolveContext = serde_json::from_str(
        &fs::read_to_string(&context).with_context(|| format!("Failed to read {:?}", context))?,
    )
    .context("Failed to parse context JSON")?;
    let bundle = read_bundle(&bundle)?;

    let evaluated = evaluate_bundle(&ctx, &bundle)?;
    let output_json = if pretty {
        serde_json::to_string_pretty(&evaluated)?
    } else {
        serde_json::to_string(&evaluated)?
    };
    println!("{}", output_json);
    Ok(())
}

fn cmd_diff(old: PathBuf, new: PathBuf, pretty: bool) -> Result<()> {
    let old_bundle = read_bundle(&old)?;
    let new_bundle = read_bundle(&new)?;
    let delta = diff(&old_bundle, &new_bundle);

    eprintln!(
        "{} changes across {} events",
        delta.total_changes,
        delta.changed_events.len()
    );
    let output_json = if pretty {
        serde_json::to_string_pretty(&delta)?
    } else {
        serde_json::to_string(&delta)?
    };
    println!("{}", output_json);
    Ok(())
}

fn cmd_export(bundle: PathBuf, format: ExportFormat, output: Option<PathBuf>) -> Result<()> {
    let bundle = read_bundle(&bundle)?;
    let rendered = match format {
        ExportFormat::Csv => export::to_csv(&bundle),
        ExportFormat::Ics => export::to_ics(&bundle),
    };
    write_output(output, &rendered)
}

fn cmd_schema(schema_type: &str) -> Result<()> {
    match schema_type {
        "context" => print_context_schema(),
        "bundle" => print_bundle_schema(),
        "all" => {
            println!("=== CONTEXT SCHEMA ===\n");
            print_context_schema()?;
            println!("\n=== BUNDLE SCHEMA ===\n");
            print_bundle_schema()?;
            Ok(())
        }
        _ => anyhow::bail!("Unknown schema type: {}. Use: context, bundle, or all", schema_type),
    }
}

fn print_context_schema() -> Result<()> {
    let example = r#"{
  "organization": {
    "id": "org-1",
    "name": "Riverside Community",
    "region": "CA-ON",
    "timezone": "America/Toronto",
    "defaults": {"change_min_weight": 10.0, "fairness_weight": 1.0, "cooldown_days": 14}
  },
  "people": [
    {"id": "p1", "name": "Alice Ng", "roles": ["kitchen", "reception"], "organization_id": "org-1"},
    {"id": "p2", "name": "Ben Okafor", "roles": ["av_tech"], "organization_id": "org-1"}
  ],
  "teams": [
    {"id": "t1", "name": "Welcome Team", "members": ["p1"], "role": "reception"}
  ],
  "resources": [
    {"id": "main_hall", "name": "Main Hall"}
  ],
  "events": [
    {
      "id": "sun-1",
      "type": "service",
      "start": "2025-09-07T09:00:00-04:00",
      "end": "2025-09-07T12:00:00-04:00",
      "resource_id": "main_hall",
      "team_ids": [],
      "requirements": [
        {"role": "kitchen", "count": 2},
        {"role": "av_tech", "count": 1}
      ]
    }
  ],
  "constraints": [
    {"type": "require_role_coverage", "key": "coverage"},
    {"type": "min_rest_gap_hours", "key": "rest12", "hours": 12},
    {"type": "cap_per_period", "key": "cap4", "max_assignments": 4, "period": {"unit": "rolling", "days": 30}},
    {"type": "no_long_weekend_fri_mon", "key": "no_long_weekend"},
    {"type": "no_overlap_external", "key": "time_off"},
    {"type": "role_cooldown", "key": "cooldown", "days": 14, "weight": 20.0},
    {"type": "historical_rotation", "key": "rotation_history", "weight": 1.0},
    {"type": "round_robin_balance", "key": "rotation", "order": ["p1", "p2"], "weight": 5.0}
  ],
  "availability": [
    {"person_id": "p1", "start_date": "2025-09-10", "end_date": "2025-09-17", "reason": "vacation"}
  ],
  "holidays": [
    {"name": "Labour Day", "date": "2025-09-01", "region": "CA-ON"}
  ],
  "from_date": "2025-09-01",
  "to_date": "2025-10-31",
  "mode": "strict",
  "change_min": false,
  "previous": null,
  "prior_counts": {"p1": 3}
}"#;
    println!("{}", example);
    Ok(())
}

fn print_bundle_schema() -> Result<()> {
    let example = r#"{
  "meta": {
    "generated_at": "2025-09-01T12:00:00Z",
    "range_start": "2025-09-01",
    "range_end": "2025-10-31",
    "mode": "strict",
    "solver": {"name": "greedy", "version": "0.1.0", "strategy": "feasible-first"}
  },
  "assignments": [
    {
      "event_id": "sun-1",
      "event_type": "service",
      "start": "2025-09-07T09:00:00-04:00",
      "end": "2025-09-07T12:00:00-04:00",
      "assignees": ["Alice Ng", "Ben Okafor"],
      "assignee_ids": ["p1", "p2"],
      "roles": ["kitchen", "av_tech"],
      "resource_id": "main_hall",
      "team_ids": []
    }
  ],
  "metrics": {
    "solve_ms": 3,
    "hard_violations": 0,
    "soft_score": 0.0,
    "fairness": {"stdev": 0.4, "per_person_counts": {"p1": 1, "p2": 1}},
    "health_score": 100.0
  },
  "violations": {"hard": [], "soft": []}
}"#;
    println!("{}", example);
    Ok(())
}
