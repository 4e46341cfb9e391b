//! Database schema definitions for the Daybook store.
//!
//! One SQLite file (`daybook.db`) holds reports, tasks, goals, carry-over
//! dismissals and the domain event table. The JSONL event log next to it
//! mirrors `report_events`.

pub const DAYBOOK_DB_NAME: &str = "daybook.db";
pub const DAYBOOK_EVENTS_NAME: &str = "daybook.events.jsonl";
pub const DAYBOOK_SCHEMA_VERSION: u32 = 2;

pub const DAYBOOK_DB_SCHEMA_META: &str = "
    CREATE TABLE IF NOT EXISTS meta (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    )
";

pub const DAYBOOK_DB_SCHEMA_REPORTS: &str = "
    CREATE TABLE IF NOT EXISTS daily_reports (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        report_date TEXT NOT NULL,
        condition_score INTEGER CHECK (condition_score BETWEEN 1 AND 10),
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        UNIQUE(user_id, report_date)
    )
";

pub const DAYBOOK_DB_SCHEMA_GOALS: &str = "
    CREATE TABLE IF NOT EXISTS goals (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        title TEXT NOT NULL,
        progress_rate INTEGER NOT NULL DEFAULT 0 CHECK (progress_rate BETWEEN 0 AND 100),
        target_date TEXT,
        priority INTEGER NOT NULL DEFAULT 2 CHECK (priority BETWEEN 1 AND 3),
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
";

pub const DAYBOOK_DB_SCHEMA_TASKS: &str = "
    CREATE TABLE IF NOT EXISTS tasks (
        id TEXT PRIMARY KEY,
        report_id TEXT NOT NULL,
        position INTEGER NOT NULL,
        title TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        category TEXT NOT NULL,
        priority INTEGER NOT NULL CHECK (priority BETWEEN 1 AND 3),
        progress_rate INTEGER NOT NULL CHECK (progress_rate BETWEEN 0 AND 100),
        estimated_time_minutes INTEGER,
        goal_id TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        FOREIGN KEY(report_id) REFERENCES daily_reports(id),
        FOREIGN KEY(goal_id) REFERENCES goals(id) ON DELETE SET NULL
    )
";

pub const DAYBOOK_DB_SCHEMA_DISMISSALS: &str = "
    CREATE TABLE IF NOT EXISTS carryover_dismissals (
        user_id TEXT NOT NULL,
        task_id TEXT NOT NULL,
        dismissed_on TEXT NOT NULL,
        PRIMARY KEY(user_id, task_id)
    )
";

pub const DAYBOOK_DB_SCHEMA_EVENTS: &str = "
    CREATE TABLE IF NOT EXISTS report_events (
        event_id TEXT PRIMARY KEY,
        ts TEXT NOT NULL,
        event_type TEXT NOT NULL,
        subject_id TEXT,
        payload TEXT NOT NULL,
        actor TEXT NOT NULL
    )
";

pub const DAYBOOK_DB_SCHEMA_INDEX_REPORTS_USER_DATE: &str =
    "CREATE INDEX IF NOT EXISTS idx_daily_reports_user_date ON daily_reports(user_id, report_date)";
pub const DAYBOOK_DB_SCHEMA_INDEX_TASKS_REPORT: &str =
    "CREATE INDEX IF NOT EXISTS idx_tasks_report ON tasks(report_id, position)";
pub const DAYBOOK_DB_SCHEMA_INDEX_TASKS_GOAL: &str =
    "CREATE INDEX IF NOT EXISTS idx_tasks_goal ON tasks(goal_id)";
pub const DAYBOOK_DB_SCHEMA_INDEX_EVENTS_SUBJECT: &str =
    "CREATE INDEX IF NOT EXISTS idx_report_events_subject ON report_events(subject_id)";
