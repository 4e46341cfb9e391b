//! SQLite-backed [`ReportStore`].
//!
//! Every call opens a connection through the broker, which serializes
//! access and writes the audit trail. Mutations run in a transaction and
//! also append a domain event to `daybook.events.jsonl` and the
//! `report_events` table.

use crate::core::broker::DbBroker;
use crate::core::db;
use crate::core::error::DaybookError;
use crate::core::schemas;
use crate::core::store::Store;
use crate::core::time;
use crate::engine::model::{
    ConditionScore, DailyReport, Goal, GoalId, Priority, ProgressRate, ReportId, Task, TaskCategory,
    TaskId, UserId,
};
use crate::engine::persistence::ReportStore;
use chrono::NaiveDate;
use rusqlite::{Connection, ErrorCode, OptionalExtension, params, types::ToSql};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

const ACTOR: &str = "daybook";

const REPORT_COLUMNS: &str = "id, user_id, report_date, condition_score";
const TASK_COLUMNS: &str = "id, report_id, title, description, category, priority, progress_rate, estimated_time_minutes, goal_id";
const GOAL_COLUMNS: &str = "id, user_id, title, progress_rate, target_date, priority";

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ReportEvent {
    pub ts: String,
    pub event_id: String,
    pub event_type: String,
    pub subject_id: Option<String>,
    pub payload: JsonValue,
    pub actor: String,
}

pub struct SqliteReportStore {
    root: PathBuf,
    db_path: PathBuf,
    broker: DbBroker,
}

impl SqliteReportStore {
    /// Open (and if needed create) the store under `store.root`.
    pub fn open(store: &Store) -> Result<Self, DaybookError> {
        fs::create_dir_all(&store.root).map_err(DaybookError::IoError)?;
        let this = Self {
            root: store.root.clone(),
            db_path: db::daybook_db_path(&store.root),
            broker: DbBroker::new(&store.root),
        };
        this.broker
            .with_conn(&this.db_path, ACTOR, None, "daybook.init", ensure_schema)?;
        Ok(this)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn read<F, R>(&self, op: &str, f: F) -> Result<R, DaybookError>
    where
        F: FnOnce(&Connection) -> Result<R, DaybookError>,
    {
        self.broker.with_conn(&self.db_path, ACTOR, None, op, f)
    }

    /// Run `f` in a transaction and record one domain event with it.
    ///
    /// The event row commits with the change. The JSONL copy is written
    /// only after commit, and failing to write it does not undo a
    /// committed change.
    fn write<F, R>(
        &self,
        op: &str,
        subject_id: Option<&str>,
        f: F,
    ) -> Result<R, DaybookError>
    where
        F: FnOnce(&Connection) -> Result<(R, JsonValue), DaybookError>,
    {
        let intent_ref = format!("intent:{}:{}", op, time::new_event_id());
        let (out, ev) = self
            .broker
            .with_tx(&self.db_path, ACTOR, Some(&intent_ref), op, |tx| {
                let (out, payload) = f(tx)?;
                let ev = ReportEvent {
                    ts: time::now_rfc3339(),
                    event_id: time::new_event_id(),
                    event_type: op.to_string(),
                    subject_id: subject_id.map(|s| s.to_string()),
                    payload,
                    actor: ACTOR.to_string(),
                };
                insert_event(tx, &ev)?;
                Ok((out, ev))
            })?;
        if let Err(e) = append_event(&self.root, &ev) {
            warn!(op, event = %ev.event_id, error = %e, "domain event log append failed");
        }
        Ok(out)
    }
}

fn ensure_schema(conn: &Connection) -> Result<(), DaybookError> {
    conn.execute(schemas::DAYBOOK_DB_SCHEMA_META, [])?;

    let current: Option<String> = conn
        .query_row(
            "SELECT value FROM meta WHERE key = 'schema_version'",
            [],
            |row| row.get(0),
        )
        .optional()
        .map_err(DaybookError::RusqliteError)?;

    let current_version: u32 = current
        .as_deref()
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(0);

    if current_version >= schemas::DAYBOOK_SCHEMA_VERSION {
        return Ok(());
    }

    if current_version < 1 {
        conn.execute(schemas::DAYBOOK_DB_SCHEMA_REPORTS, [])?;
        conn.execute(schemas::DAYBOOK_DB_SCHEMA_GOALS, [])?;
        conn.execute(schemas::DAYBOOK_DB_SCHEMA_TASKS, [])?;
        conn.execute(schemas::DAYBOOK_DB_SCHEMA_INDEX_REPORTS_USER_DATE, [])?;
        conn.execute(schemas::DAYBOOK_DB_SCHEMA_INDEX_TASKS_REPORT, [])?;
        conn.execute(schemas::DAYBOOK_DB_SCHEMA_INDEX_TASKS_GOAL, [])?;
    }

    if current_version < 2 {
        // Carry-over dismissals and the domain event table
        conn.execute(schemas::DAYBOOK_DB_SCHEMA_DISMISSALS, [])?;
        conn.execute(schemas::DAYBOOK_DB_SCHEMA_EVENTS, [])?;
        conn.execute(schemas::DAYBOOK_DB_SCHEMA_INDEX_EVENTS_SUBJECT, [])?;
    }

    conn.execute(
        "INSERT INTO meta(key, value) VALUES('schema_version', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        [schemas::DAYBOOK_SCHEMA_VERSION.to_string()],
    )?;

    Ok(())
}

fn append_event(root: &Path, ev: &ReportEvent) -> Result<(), DaybookError> {
    let line = serde_json::to_string(ev)?;
    let mut f = OpenOptions::new()
        .create(true)
        .append(true)
        .open(db::events_path(root))
        .map_err(DaybookError::IoError)?;
    writeln!(f, "{}", line).map_err(DaybookError::IoError)?;
    Ok(())
}

fn insert_event(conn: &Connection, ev: &ReportEvent) -> Result<(), DaybookError> {
    conn.execute(
        "INSERT INTO report_events(event_id, ts, event_type, subject_id, payload, actor)
         VALUES(?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            ev.event_id,
            ev.ts,
            ev.event_type,
            ev.subject_id,
            ev.payload.to_string(),
            ev.actor
        ],
    )?;
    Ok(())
}

/// Read the domain event log, oldest first.
pub fn read_events(root: &Path) -> Result<Vec<ReportEvent>, DaybookError> {
    let path = db::events_path(root);
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(&path).map_err(DaybookError::IoError)?;
    content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| {
            serde_json::from_str(l)
                .map_err(|e| DaybookError::PersistenceUnavailable(format!("corrupt event line: {}", e)))
        })
        .collect()
}

fn corrupt(what: &str, id: &str, detail: impl std::fmt::Display) -> DaybookError {
    DaybookError::PersistenceUnavailable(format!("corrupt {} row {}: {}", what, id, detail))
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(err, rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation)
}

fn parse_stored_date(what: &str, id: &str, raw: &str) -> Result<NaiveDate, DaybookError> {
    time::parse_date(raw).map_err(|e| corrupt(what, id, e))
}

struct TaskRow {
    id: String,
    report_id: String,
    title: String,
    description: String,
    category: String,
    priority: i64,
    progress_rate: i64,
    estimated_time_minutes: Option<i64>,
    goal_id: Option<String>,
}

impl TaskRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            report_id: row.get(1)?,
            title: row.get(2)?,
            description: row.get(3)?,
            category: row.get(4)?,
            priority: row.get(5)?,
            progress_rate: row.get(6)?,
            estimated_time_minutes: row.get(7)?,
            goal_id: row.get(8)?,
        })
    }

    fn into_task(self) -> Result<Task, DaybookError> {
        let category = self
            .category
            .parse::<TaskCategory>()
            .map_err(|e| corrupt("task", &self.id, e))?;
        let priority = u8::try_from(self.priority)
            .ok()
            .and_then(|p| Priority::try_from(p).ok())
            .ok_or_else(|| corrupt("task", &self.id, format!("priority {}", self.priority)))?;
        let estimated_time_minutes = self
            .estimated_time_minutes
            .map(|m| u32::try_from(m).map_err(|e| corrupt("task", &self.id, e)))
            .transpose()?;
        Ok(Task {
            id: TaskId::from(self.id),
            title: self.title,
            description: self.description,
            category,
            priority,
            progress_rate: ProgressRate::clamped(self.progress_rate),
            estimated_time_minutes,
            daily_report_id: ReportId::from(self.report_id),
            goal_id: self.goal_id.map(GoalId::from),
        })
    }
}

fn load_tasks(conn: &Connection, sql: &str, params: &[&dyn ToSql]) -> Result<Vec<Task>, DaybookError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, TaskRow::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.into_iter().map(TaskRow::into_task).collect()
}

fn load_reports(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> Result<Vec<DailyReport>, DaybookError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<i64>>(3)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let task_sql = format!(
        "SELECT {} FROM tasks WHERE report_id = ?1 ORDER BY position, created_at",
        TASK_COLUMNS
    );
    let mut reports = Vec::with_capacity(rows.len());
    for (id, user_id, raw_date, score) in rows {
        let report_date = parse_stored_date("report", &id, &raw_date)?;
        let condition_score = score
            .map(|s| {
                u8::try_from(s)
                    .ok()
                    .and_then(|s| ConditionScore::try_from(s).ok())
                    .ok_or_else(|| corrupt("report", &id, format!("condition score {}", s)))
            })
            .transpose()?;
        let tasks = load_tasks(conn, &task_sql, &[&id])?;
        reports.push(DailyReport {
            id: ReportId::from(id),
            user_id: UserId::from(user_id),
            report_date,
            condition_score,
            tasks,
        });
    }
    Ok(reports)
}

fn load_goals(conn: &Connection, sql: &str, params: &[&dyn ToSql]) -> Result<Vec<Goal>, DaybookError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, i64>(5)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    rows.into_iter()
        .map(|(id, user_id, title, progress, target, priority)| {
            let target_date = target
                .as_deref()
                .map(|raw| parse_stored_date("goal", &id, raw))
                .transpose()?;
            let priority = u8::try_from(priority)
                .ok()
                .and_then(|p| Priority::try_from(p).ok())
                .ok_or_else(|| corrupt("goal", &id, format!("priority {}", priority)))?;
            Ok(Goal {
                id: GoalId::from(id),
                user_id: UserId::from(user_id),
                title,
                progress_rate: ProgressRate::clamped(progress),
                target_date,
                priority,
            })
        })
        .collect()
}

fn next_position(conn: &Connection, report_id: &str) -> Result<i64, DaybookError> {
    Ok(conn.query_row(
        "SELECT COALESCE(MAX(position), -1) + 1 FROM tasks WHERE report_id = ?1",
        [report_id],
        |row| row.get(0),
    )?)
}

fn report_exists(conn: &Connection, report_id: &str) -> Result<bool, DaybookError> {
    Ok(conn
        .query_row("SELECT 1 FROM daily_reports WHERE id = ?1", [report_id], |_| Ok(()))
        .optional()?
        .is_some())
}

impl ReportStore for SqliteReportStore {
    fn get_report(
        &self,
        user: &UserId,
        date: NaiveDate,
    ) -> Result<Option<DailyReport>, DaybookError> {
        let sql = format!(
            "SELECT {} FROM daily_reports WHERE user_id = ?1 AND report_date = ?2",
            REPORT_COLUMNS
        );
        let date = time::format_date(date);
        self.read("report.get", |conn| {
            Ok(load_reports(conn, &sql, &[&user.as_str(), &date])?.pop())
        })
    }

    fn get_report_by_id(&self, report_id: &ReportId) -> Result<Option<DailyReport>, DaybookError> {
        let sql = format!("SELECT {} FROM daily_reports WHERE id = ?1", REPORT_COLUMNS);
        self.read("report.get", |conn| {
            Ok(load_reports(conn, &sql, &[&report_id.as_str()])?.pop())
        })
    }

    fn get_reports_before(
        &self,
        user: &UserId,
        date: NaiveDate,
        limit: usize,
    ) -> Result<Vec<DailyReport>, DaybookError> {
        let sql = format!(
            "SELECT {} FROM daily_reports WHERE user_id = ?1 AND report_date < ?2
             ORDER BY report_date DESC LIMIT ?3",
            REPORT_COLUMNS
        );
        let date = time::format_date(date);
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.read("report.list_before", |conn| {
            load_reports(conn, &sql, &[&user.as_str(), &date, &limit])
        })
    }

    fn get_reports_between(
        &self,
        user: &UserId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyReport>, DaybookError> {
        let sql = format!(
            "SELECT {} FROM daily_reports WHERE user_id = ?1 AND report_date BETWEEN ?2 AND ?3
             ORDER BY report_date DESC",
            REPORT_COLUMNS
        );
        let (from, to) = (time::format_date(from), time::format_date(to));
        self.read("report.list_between", |conn| {
            load_reports(conn, &sql, &[&user.as_str(), &from, &to])
        })
    }

    fn create_report(
        &mut self,
        user: &UserId,
        date: NaiveDate,
    ) -> Result<DailyReport, DaybookError> {
        let report = DailyReport::new(user.clone(), date);
        let date_str = time::format_date(date);
        self.write("report.create", Some(report.id.as_str()), |conn| {
            let ts = time::now_rfc3339();
            conn.execute(
                "INSERT INTO daily_reports(id, user_id, report_date, condition_score, created_at, updated_at)
                 VALUES(?1, ?2, ?3, NULL, ?4, ?4)",
                params![report.id.as_str(), user.as_str(), date_str, ts],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    DaybookError::Conflict(format!(
                        "report for {} on {} already exists",
                        user, date_str
                    ))
                } else {
                    DaybookError::RusqliteError(e)
                }
            })?;
            Ok((
                report.clone(),
                serde_json::json!({ "user_id": user.as_str(), "report_date": date_str }),
            ))
        })
    }

    fn set_condition_score(
        &mut self,
        report_id: &ReportId,
        score: Option<ConditionScore>,
    ) -> Result<(), DaybookError> {
        let value = score.map(|s| i64::from(s.value()));
        self.write("report.condition", Some(report_id.as_str()), |conn| {
            let changed = conn.execute(
                "UPDATE daily_reports SET condition_score = ?1, updated_at = ?2 WHERE id = ?3",
                params![value, time::now_rfc3339(), report_id.as_str()],
            )?;
            if changed == 0 {
                return Err(DaybookError::NotFound(format!("report {}", report_id)));
            }
            Ok(((), serde_json::json!({ "condition_score": value })))
        })
    }

    fn get_task(&self, task_id: &TaskId) -> Result<Option<Task>, DaybookError> {
        let sql = format!("SELECT {} FROM tasks WHERE id = ?1", TASK_COLUMNS);
        self.read("task.get", |conn| {
            Ok(load_tasks(conn, &sql, &[&task_id.as_str()])?.pop())
        })
    }

    fn insert_task(&mut self, task: &Task) -> Result<(), DaybookError> {
        self.write("task.add", Some(task.id.as_str()), |conn| {
            let report_id = task.daily_report_id.as_str();
            if !report_exists(conn, report_id)? {
                return Err(DaybookError::NotFound(format!("report {}", report_id)));
            }
            let ts = time::now_rfc3339();
            let position = next_position(conn, report_id)?;
            conn.execute(
                "INSERT INTO tasks(id, report_id, position, title, description, category, priority, progress_rate, estimated_time_minutes, goal_id, created_at, updated_at)
                 VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
                params![
                    task.id.as_str(),
                    report_id,
                    position,
                    task.title,
                    task.description,
                    task.category.as_str(),
                    task.priority.level(),
                    task.progress_rate.value(),
                    task.estimated_time_minutes,
                    task.goal_id.as_ref().map(|g| g.as_str()),
                    ts
                ],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    DaybookError::Conflict(format!("task {} already exists", task.id))
                } else {
                    DaybookError::RusqliteError(e)
                }
            })?;
            Ok(((), serde_json::to_value(task)?))
        })
    }

    fn update_task(&mut self, task: &Task) -> Result<(), DaybookError> {
        self.write("task.update", Some(task.id.as_str()), |conn| {
            let changed = conn.execute(
                "UPDATE tasks SET title = ?1, description = ?2, category = ?3, priority = ?4,
                 progress_rate = ?5, estimated_time_minutes = ?6, goal_id = ?7, updated_at = ?8
                 WHERE id = ?9",
                params![
                    task.title,
                    task.description,
                    task.category.as_str(),
                    task.priority.level(),
                    task.progress_rate.value(),
                    task.estimated_time_minutes,
                    task.goal_id.as_ref().map(|g| g.as_str()),
                    time::now_rfc3339(),
                    task.id.as_str()
                ],
            )?;
            if changed == 0 {
                return Err(DaybookError::NotFound(format!("task {}", task.id)));
            }
            Ok((
                (),
                serde_json::json!({
                    "progress_rate": task.progress_rate.value(),
                    "goal_id": task.goal_id.as_ref().map(|g| g.as_str()),
                }),
            ))
        })
    }

    fn reassign_task(
        &mut self,
        task_id: &TaskId,
        new_report_id: &ReportId,
        new_progress: ProgressRate,
    ) -> Result<(), DaybookError> {
        self.write("task.reassign", Some(task_id.as_str()), |conn| {
            let target = new_report_id.as_str();
            if !report_exists(conn, target)? {
                return Err(DaybookError::NotFound(format!("report {}", target)));
            }
            let from: Option<String> = conn
                .query_row("SELECT report_id FROM tasks WHERE id = ?1", [task_id.as_str()], |row| {
                    row.get(0)
                })
                .optional()?;
            let from = from.ok_or_else(|| DaybookError::NotFound(format!("task {}", task_id)))?;
            let position = next_position(conn, target)?;
            conn.execute(
                "UPDATE tasks SET report_id = ?1, position = ?2, progress_rate = ?3, updated_at = ?4
                 WHERE id = ?5",
                params![
                    target,
                    position,
                    new_progress.value(),
                    time::now_rfc3339(),
                    task_id.as_str()
                ],
            )?;
            Ok((
                (),
                serde_json::json!({
                    "from_report": from,
                    "to_report": target,
                    "progress_rate": new_progress.value(),
                }),
            ))
        })
    }

    fn restore_task(
        &mut self,
        task_id: &TaskId,
        report_id: &ReportId,
        progress: ProgressRate,
        index: usize,
    ) -> Result<(), DaybookError> {
        self.write("task.restore", Some(task_id.as_str()), |conn| {
            let target = report_id.as_str();
            if !report_exists(conn, target)? {
                return Err(DaybookError::NotFound(format!("report {}", target)));
            }
            let updated = conn.execute(
                "UPDATE tasks SET report_id = ?1, progress_rate = ?2, updated_at = ?3 WHERE id = ?4",
                params![target, progress.value(), time::now_rfc3339(), task_id.as_str()],
            )?;
            if updated == 0 {
                return Err(DaybookError::NotFound(format!("task {}", task_id)));
            }

            // Renumber the report so the restored task sits at `index`.
            let mut stmt = conn.prepare(
                "SELECT id FROM tasks WHERE report_id = ?1 AND id != ?2 ORDER BY position, created_at",
            )?;
            let mut order = stmt
                .query_map(params![target, task_id.as_str()], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            let at = index.min(order.len());
            order.insert(at, task_id.as_str().to_string());
            for (position, id) in order.iter().enumerate() {
                conn.execute(
                    "UPDATE tasks SET position = ?1 WHERE id = ?2",
                    params![position as i64, id],
                )?;
            }
            Ok((
                (),
                serde_json::json!({
                    "to_report": target,
                    "index": at,
                    "progress_rate": progress.value(),
                }),
            ))
        })
    }

    fn tasks_for_goal(&self, goal_id: &GoalId) -> Result<Vec<Task>, DaybookError> {
        let sql = format!(
            "SELECT {} FROM tasks WHERE goal_id = ?1 ORDER BY created_at",
            TASK_COLUMNS
        );
        self.read("goal.tasks", |conn| load_tasks(conn, &sql, &[&goal_id.as_str()]))
    }

    fn get_goal(&self, goal_id: &GoalId) -> Result<Option<Goal>, DaybookError> {
        let sql = format!("SELECT {} FROM goals WHERE id = ?1", GOAL_COLUMNS);
        self.read("goal.get", |conn| {
            Ok(load_goals(conn, &sql, &[&goal_id.as_str()])?.pop())
        })
    }

    fn list_goals(&self, user: &UserId) -> Result<Vec<Goal>, DaybookError> {
        let sql = format!(
            "SELECT {} FROM goals WHERE user_id = ?1 ORDER BY priority, created_at",
            GOAL_COLUMNS
        );
        self.read("goal.list", |conn| load_goals(conn, &sql, &[&user.as_str()]))
    }

    fn insert_goal(&mut self, goal: &Goal) -> Result<(), DaybookError> {
        self.write("goal.add", Some(goal.id.as_str()), |conn| {
            let ts = time::now_rfc3339();
            conn.execute(
                "INSERT INTO goals(id, user_id, title, progress_rate, target_date, priority, created_at, updated_at)
                 VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
                params![
                    goal.id.as_str(),
                    goal.user_id.as_str(),
                    goal.title,
                    goal.progress_rate.value(),
                    goal.target_date.map(time::format_date),
                    goal.priority.level(),
                    ts
                ],
            )?;
            Ok(((), serde_json::to_value(goal)?))
        })
    }

    fn delete_goal(&mut self, goal_id: &GoalId) -> Result<(), DaybookError> {
        self.write("goal.delete", Some(goal_id.as_str()), |conn| {
            let unlinked = conn.execute(
                "UPDATE tasks SET goal_id = NULL, updated_at = ?1 WHERE goal_id = ?2",
                params![time::now_rfc3339(), goal_id.as_str()],
            )?;
            let removed = conn.execute("DELETE FROM goals WHERE id = ?1", [goal_id.as_str()])?;
            if removed == 0 {
                return Err(DaybookError::NotFound(format!("goal {}", goal_id)));
            }
            Ok(((), serde_json::json!({ "unlinked_tasks": unlinked })))
        })
    }

    fn upsert_goal_progress(
        &mut self,
        goal_id: &GoalId,
        progress: ProgressRate,
    ) -> Result<(), DaybookError> {
        self.write("goal.progress", Some(goal_id.as_str()), |conn| {
            let changed = conn.execute(
                "UPDATE goals SET progress_rate = ?1, updated_at = ?2 WHERE id = ?3",
                params![progress.value(), time::now_rfc3339(), goal_id.as_str()],
            )?;
            if changed == 0 {
                return Err(DaybookError::NotFound(format!("goal {}", goal_id)));
            }
            Ok(((), serde_json::json!({ "progress_rate": progress.value() })))
        })
    }

    fn dismiss_tasks(
        &mut self,
        user: &UserId,
        task_ids: &[TaskId],
        on: NaiveDate,
    ) -> Result<(), DaybookError> {
        let on = time::format_date(on);
        self.write("carryover.dismiss", Some(user.as_str()), |conn| {
            let mut stmt = conn.prepare(
                "INSERT OR IGNORE INTO carryover_dismissals(user_id, task_id, dismissed_on)
                 VALUES(?1, ?2, ?3)",
            )?;
            for id in task_ids {
                stmt.execute(params![user.as_str(), id.as_str(), on])?;
            }
            let ids: Vec<&str> = task_ids.iter().map(|t| t.as_str()).collect();
            Ok(((), serde_json::json!({ "task_ids": ids, "dismissed_on": on })))
        })
    }

    fn dismissed_task_ids(&self, user: &UserId) -> Result<HashSet<TaskId>, DaybookError> {
        self.read("carryover.dismissed", |conn| {
            let mut stmt =
                conn.prepare("SELECT task_id FROM carryover_dismissals WHERE user_id = ?1")?;
            let ids = stmt
                .query_map([user.as_str()], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(ids.into_iter().map(TaskId::from).collect())
        })
    }
}
