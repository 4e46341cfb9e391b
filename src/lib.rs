//! Daybook: daily work reports with carry-over of unfinished tasks.
//!
//! Each user keeps one report per calendar day. A report is open on its own
//! day and closed afterwards. When a new day starts, unfinished tasks from
//! the most recent closed report are offered for carry-over; accepted tasks
//! move (not copy) into today's report with their progress reset to 0.
//!
//! # Architecture
//!
//! - [`engine`]: the domain. Pure progress, streak, trend and motivation
//!   computations, plus carry-over and task/goal mutations written against
//!   the [`engine::ReportStore`] trait.
//! - [`core`]: infrastructure. The SQLite store behind a serializing
//!   broker with a JSONL audit log, `daybook.toml` config, errors and
//!   text rendering.
//!
//! All writes to the on-disk store route through `DbBroker`, which
//! serializes access in-process and records every operation to
//! `broker.events.jsonl`. Domain changes are also appended to
//! `daybook.events.jsonl`.

pub mod core;
pub mod engine;

use crate::core::{
    config::{self, DaybookConfig},
    error::DaybookError,
    output,
    report_db::SqliteReportStore,
    store::{DEFAULT_STORE_DIR, Store},
    time,
};
use crate::engine::{
    ConditionScore, GoalId, NewGoal, NewTask, Priority, ProgressRate, ReportStore, ScanOptions,
    TaskCategory, TaskId, UserId, apply_pending, build_dashboard, discard_candidates, scan_for_carry_over,
    tasks,
};

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Env var holding the `tracing` filter directive.
pub const LOG_ENV: &str = "DAYBOOK_LOG";

#[derive(Parser, Debug)]
#[clap(
    name = "daybook",
    version = env!("CARGO_PKG_VERSION"),
    about = "Daily reports with carry-over of unfinished work"
)]
struct Cli {
    /// Store directory (defaults to ./.daybook).
    #[clap(long, global = true)]
    root: Option<PathBuf>,
    /// User to act as (defaults to `user` in daybook.toml).
    #[clap(long, global = true)]
    user: Option<String>,
    /// Treat this date (YYYY-MM-DD) as today.
    #[clap(long, global = true)]
    today: Option<String>,
    /// Output format: 'text' or 'json'.
    #[clap(long, global = true, default_value = "text")]
    format: String,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the store directory, database and default daybook.toml
    #[clap(name = "init")]
    Init,
    #[clap(name = "report", visible_alias = "r")]
    Report(ReportCli),
    #[clap(name = "task", visible_alias = "t")]
    Task(TaskCli),
    #[clap(name = "goal", visible_alias = "g")]
    Goal(GoalCli),
    #[clap(name = "carryover", visible_alias = "c")]
    Carryover(CarryoverCli),
    /// Today's progress, streak, trend, goals and pending carry-over
    #[clap(name = "dashboard", visible_alias = "d")]
    Dashboard {
        /// Name used in the greeting.
        #[clap(long)]
        name: Option<String>,
    },
}

#[derive(clap::Args, Debug)]
struct ReportCli {
    #[clap(subcommand)]
    command: ReportCommand,
}

#[derive(Subcommand, Debug)]
enum ReportCommand {
    /// Show the report for a date (defaults to today)
    Show {
        #[clap(long)]
        date: Option<String>,
    },
    /// Record today's condition score (1-10)
    Condition {
        #[clap(long)]
        score: u8,
    },
}

#[derive(clap::Args, Debug)]
struct TaskCli {
    #[clap(subcommand)]
    command: TaskCommand,
}

#[derive(Subcommand, Debug)]
enum TaskCommand {
    /// Add a task to today's report
    Add {
        title: String,
        #[clap(long, default_value = "")]
        description: String,
        /// 'continuous' or 'short-term'.
        #[clap(long, default_value = "short-term")]
        category: String,
        /// 1-3 or high/medium/low.
        #[clap(long, default_value = "medium")]
        priority: String,
        /// Estimated minutes.
        #[clap(long)]
        estimate: Option<u32>,
        #[clap(long)]
        goal: Option<String>,
    },
    /// Set a task's progress (0-100)
    Progress {
        #[clap(long)]
        id: String,
        #[clap(long)]
        value: i64,
    },
    /// Link a task to a goal, or unlink it when --goal is omitted
    Link {
        #[clap(long)]
        id: String,
        #[clap(long)]
        goal: Option<String>,
    },
}

#[derive(clap::Args, Debug)]
struct GoalCli {
    #[clap(subcommand)]
    command: GoalCommand,
}

#[derive(Subcommand, Debug)]
enum GoalCommand {
    Add {
        title: String,
        #[clap(long, default_value = "medium")]
        priority: String,
        /// Target date (YYYY-MM-DD).
        #[clap(long)]
        target: Option<String>,
    },
    List,
    /// Delete a goal; linked tasks keep existing without a goal
    Delete {
        #[clap(long)]
        id: String,
    },
}

#[derive(clap::Args, Debug)]
struct CarryoverCli {
    #[clap(subcommand)]
    command: CarryoverCommand,
}

#[derive(Subcommand, Debug)]
enum CarryoverCommand {
    /// List unfinished tasks from closed reports
    Scan,
    /// Move the pending tasks into today's report
    Apply {
        /// Only carry these task ids (repeatable). Defaults to all.
        #[clap(long = "task")]
        tasks: Vec<String>,
    },
    /// Decline the pending tasks; later scans skip them
    Discard,
}

struct Session {
    store: SqliteReportStore,
    config: DaybookConfig,
    user: UserId,
    today: NaiveDate,
    json: bool,
}

impl Session {
    /// Print `payload` in the command envelope, or the text rendering.
    fn emit(
        &self,
        cmd: &str,
        payload: JsonValue,
        text: impl FnOnce() -> String,
    ) -> Result<(), DaybookError> {
        if self.json {
            let envelope = time::command_envelope(cmd, "ok", payload);
            println!("{}", serde_json::to_string_pretty(&envelope)?);
        } else {
            print!("{}", text());
        }
        Ok(())
    }
}

fn to_payload<T: Serialize>(key: &str, value: &T) -> Result<JsonValue, DaybookError> {
    let mut map = serde_json::Map::new();
    map.insert(key.to_string(), serde_json::to_value(value)?);
    Ok(JsonValue::Object(map))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    // A second init in the same process (tests) is harmless.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn parse_format(raw: &str) -> Result<bool, DaybookError> {
    match raw {
        "json" => Ok(true),
        "text" => Ok(false),
        other => Err(DaybookError::ValidationError(format!(
            "unknown format '{}', expected 'text' or 'json'",
            other
        ))),
    }
}

pub fn run() -> Result<(), DaybookError> {
    init_tracing();
    let cli = Cli::parse();

    let json = parse_format(&cli.format)?;
    let store = Store::new(
        cli.root
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_DIR)),
    );
    let today = match &cli.today {
        Some(raw) => time::parse_date(raw)?,
        None => time::today_local(),
    };

    if let Command::Init = cli.command {
        return run_init(&store, json);
    }

    let config = config::load_config(&store.root)?;
    let user = UserId::from(cli.user.clone().unwrap_or_else(|| config.user.clone()));
    debug!(root = %store.root.display(), %user, %today, "session opened");
    let mut session = Session {
        store: SqliteReportStore::open(&store)?,
        config,
        user,
        today,
        json,
    };

    match cli.command {
        Command::Init => Ok(()),
        Command::Report(c) => run_report(&mut session, c.command),
        Command::Task(c) => run_task(&mut session, c.command),
        Command::Goal(c) => run_goal(&mut session, c.command),
        Command::Carryover(c) => run_carryover(&mut session, c.command),
        Command::Dashboard { name } => {
            let name = name.unwrap_or_else(|| session.user.to_string());
            let dash = build_dashboard(
                &session.store,
                &session.user,
                session.today,
                &name,
                &session.config,
            )?;
            session.emit("dashboard", to_payload("dashboard", &dash)?, || {
                output::render_dashboard(&dash)
            })
        }
    }
}

fn run_init(store: &Store, json: bool) -> Result<(), DaybookError> {
    let opened = SqliteReportStore::open(store)?;
    let wrote_config = config::write_default_config(&store.root)?;
    if json {
        let envelope = time::command_envelope(
            "init",
            "ok",
            serde_json::json!({
                "root": store.root.display().to_string(),
                "db": opened.db_path().display().to_string(),
                "config_created": wrote_config,
            }),
        );
        println!("{}", serde_json::to_string_pretty(&envelope)?);
    } else {
        println!(
            "  {} {}",
            "●".bright_green(),
            opened.db_path().display().to_string().bright_white()
        );
        if wrote_config {
            println!(
                "  {} {}",
                "●".bright_green(),
                config::config_path(&store.root)
                    .display()
                    .to_string()
                    .bright_white()
            );
        }
        println!("{} Daybook initialized", "✓".bright_green().bold());
    }
    Ok(())
}

fn run_report(session: &mut Session, cmd: ReportCommand) -> Result<(), DaybookError> {
    match cmd {
        ReportCommand::Show { date } => {
            let date = match date {
                Some(raw) => time::parse_date(&raw)?,
                None => session.today,
            };
            let report = session
                .store
                .get_report(&session.user, date)?
                .ok_or_else(|| DaybookError::NotFound(format!("report for {}", date)))?;
            session.emit("report.show", to_payload("report", &report)?, || {
                output::render_report(&report)
            })
        }
        ReportCommand::Condition { score } => {
            let score = ConditionScore::try_from(score)?;
            let report = tasks::set_condition_score(
                &mut session.store,
                &session.user,
                session.today,
                Some(score),
                session.today,
            )?;
            session.emit("report.condition", to_payload("report", &report)?, || {
                output::render_report(&report)
            })
        }
    }
}

fn run_task(session: &mut Session, cmd: TaskCommand) -> Result<(), DaybookError> {
    match cmd {
        TaskCommand::Add {
            title,
            description,
            category,
            priority,
            estimate,
            goal,
        } => {
            let new_task = NewTask {
                description,
                category: category.parse::<TaskCategory>()?,
                priority: priority.parse::<Priority>()?,
                estimated_time_minutes: estimate,
                goal_id: goal.map(GoalId::from),
                ..NewTask::titled(title)
            };
            let task = tasks::add_task(&mut session.store, &session.user, session.today, new_task)?;
            session.emit("task.add", to_payload("task", &task)?, || {
                format!("{} task {} added\n", "✓".bright_green(), task.id)
            })
        }
        TaskCommand::Progress { id, value } => {
            let progress = ProgressRate::parse_strict(value)?;
            let task = tasks::update_task_progress(
                &mut session.store,
                &TaskId::from(id),
                progress,
                session.today,
            )?;
            session.emit("task.progress", to_payload("task", &task)?, || {
                format!(
                    "{} task {} at {}\n",
                    "✓".bright_green(),
                    task.id,
                    task.progress_rate
                )
            })
        }
        TaskCommand::Link { id, goal } => {
            let task = tasks::link_task_goal(
                &mut session.store,
                &TaskId::from(id),
                goal.map(GoalId::from),
                session.today,
            )?;
            session.emit("task.link", to_payload("task", &task)?, || match &task.goal_id {
                Some(g) => format!("{} task {} linked to {}\n", "✓".bright_green(), task.id, g),
                None => format!("{} task {} unlinked\n", "✓".bright_green(), task.id),
            })
        }
    }
}

fn run_goal(session: &mut Session, cmd: GoalCommand) -> Result<(), DaybookError> {
    match cmd {
        GoalCommand::Add {
            title,
            priority,
            target,
        } => {
            let new_goal = NewGoal {
                title,
                target_date: target.as_deref().map(time::parse_date).transpose()?,
                priority: priority.parse::<Priority>()?,
            };
            let goal = tasks::create_goal(&mut session.store, &session.user, new_goal)?;
            session.emit("goal.add", to_payload("goal", &goal)?, || {
                format!("{} goal {} added\n", "✓".bright_green(), goal.id)
            })
        }
        GoalCommand::List => {
            let goals = session.store.list_goals(&session.user)?;
            session.emit("goal.list", to_payload("goals", &goals)?, || {
                output::render_goals(&goals)
            })
        }
        GoalCommand::Delete { id } => {
            let goal_id = GoalId::from(id);
            let unlinked = tasks::delete_goal(&mut session.store, &goal_id)?;
            let payload = serde_json::json!({
                "goal_id": goal_id.as_str(),
                "unlinked_tasks": unlinked,
            });
            session.emit("goal.delete", payload, || {
                format!(
                    "{} goal {} deleted, {} task(s) unlinked\n",
                    "✓".bright_green(),
                    goal_id,
                    unlinked.len()
                )
            })
        }
    }
}

fn run_carryover(session: &mut Session, cmd: CarryoverCommand) -> Result<(), DaybookError> {
    let options = ScanOptions::from(&session.config);
    let mut pending = scan_for_carry_over(&session.store, &session.user, session.today, options)?;

    match cmd {
        CarryoverCommand::Scan => session.emit("carryover.scan", to_payload("pending", &pending)?, || {
            output::render_candidates(&pending)
        }),
        CarryoverCommand::Apply { tasks: selected } => {
            if !selected.is_empty() {
                let wanted: Vec<TaskId> = selected.into_iter().map(TaskId::from).collect();
                if let Some(missing) = wanted.iter().find(|id| {
                    !pending.candidates.iter().any(|c| &c.task.id == *id)
                }) {
                    return Err(DaybookError::NotFound(format!(
                        "task {} is not a carry-over candidate",
                        missing
                    )));
                }
                pending.candidates.retain(|c| wanted.contains(&c.task.id));
            }
            let moved = pending.len();
            if moved == 0 {
                return session.emit(
                    "carryover.apply",
                    serde_json::json!({ "carried": 0 }),
                    || output::render_candidates(&pending),
                );
            }
            let report = apply_pending(&mut session.store, &mut pending, session.today)?;
            let payload = serde_json::json!({
                "carried": moved,
                "report": serde_json::to_value(&report)?,
            });
            session.emit("carryover.apply", payload, || {
                format!(
                    "{} carried {} task(s) into {}\n{}",
                    "✓".bright_green(),
                    moved,
                    report.report_date,
                    output::render_report(&report)
                )
            })
        }
        CarryoverCommand::Discard => {
            let discarded = discard_candidates(&mut session.store, &mut pending, session.today)?;
            session.emit(
                "carryover.discard",
                serde_json::json!({ "discarded": discarded }),
                || format!("{} discarded {} task(s)\n", "✓".bright_green(), discarded),
            )
        }
    }
}
