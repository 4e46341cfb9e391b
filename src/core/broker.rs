use crate::core::db;
use crate::core::error;
use crate::core::time;
use rusqlite::{Connection, Transaction};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::warn;

/// The DB Broker is the single gate for state access.
/// It serializes connections in-process and appends one audit line per call.
pub struct DbBroker {
    audit_log_path: PathBuf,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct BrokerEvent {
    pub ts: String,
    pub event_id: String,
    pub actor: String,
    pub intent_ref: Option<String>,
    pub op: String,
    pub db_id: String,
    pub status: String,
}

static DB_LOCK: Mutex<()> = Mutex::new(());

fn db_lock() -> MutexGuard<'static, ()> {
    // A panic while holding the lock leaves no partial state behind: every
    // write happens inside a SQLite transaction.
    DB_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl DbBroker {
    pub fn new(root: &Path) -> Self {
        Self {
            audit_log_path: root.join("broker.events.jsonl"),
        }
    }

    pub fn audit_log_path(&self) -> &Path {
        &self.audit_log_path
    }

    /// Execute a closure with a serialized connection to the specified DB.
    pub fn with_conn<F, R>(
        &self,
        db_path: &Path,
        actor: &str,
        intent_ref: Option<&str>,
        op_name: &str,
        f: F,
    ) -> Result<R, error::DaybookError>
    where
        F: FnOnce(&Connection) -> Result<R, error::DaybookError>,
    {
        let _lock = db_lock();

        let db_id = db_id(db_path);
        let conn = db::db_connect(&db_path.to_string_lossy())?;

        let result = f(&conn);

        self.record(actor, intent_ref, op_name, &db_id, result.is_ok());
        result
    }

    /// Like [`DbBroker::with_conn`], but the closure runs inside one
    /// transaction that commits only if it returns `Ok`.
    pub fn with_tx<F, R>(
        &self,
        db_path: &Path,
        actor: &str,
        intent_ref: Option<&str>,
        op_name: &str,
        f: F,
    ) -> Result<R, error::DaybookError>
    where
        F: FnOnce(&Transaction<'_>) -> Result<R, error::DaybookError>,
    {
        let _lock = db_lock();

        let db_id = db_id(db_path);
        let mut conn = db::db_connect(&db_path.to_string_lossy())?;

        let result = (|| {
            let tx = conn.transaction()?;
            let out = f(&tx)?;
            tx.commit()?;
            Ok(out)
        })();

        self.record(actor, intent_ref, op_name, &db_id, result.is_ok());
        result
    }

    /// Append the audit line for a finished call. The call's own result
    /// stands even when the audit log cannot be written.
    fn record(&self, actor: &str, intent_ref: Option<&str>, op: &str, db_id: &str, ok: bool) {
        let status = if ok { "success" } else { "error" };
        if let Err(e) = self.log_event(actor, intent_ref, op, db_id, status) {
            warn!(op, status, error = %e, "audit log append failed");
        }
    }

    fn log_event(
        &self,
        actor: &str,
        intent_ref: Option<&str>,
        op: &str,
        db_id: &str,
        status: &str,
    ) -> Result<(), error::DaybookError> {
        let ev = BrokerEvent {
            ts: time::now_rfc3339(),
            event_id: time::new_event_id(),
            actor: actor.to_string(),
            intent_ref: intent_ref.map(|s| s.to_string()),
            op: op.to_string(),
            db_id: db_id.to_string(),
            status: status.to_string(),
        };

        let line = serde_json::to_string(&ev)?;
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.audit_log_path)
            .map_err(error::DaybookError::IoError)?;

        writeln!(f, "{}", line).map_err(error::DaybookError::IoError)?;
        Ok(())
    }
}

fn db_id(db_path: &Path) -> String {
    db_path
        .file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string()
}

/// Read back the audit log, oldest first. Unparseable lines are skipped.
pub fn read_audit_log(root: &Path) -> Result<Vec<BrokerEvent>, error::DaybookError> {
    let path = DbBroker::new(root).audit_log_path;
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(&path).map_err(error::DaybookError::IoError)?;
    Ok(content
        .lines()
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect())
}
