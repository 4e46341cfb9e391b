use daybook::core::broker::{self, DbBroker};
use daybook::core::config::{self, DaybookConfig};
use daybook::core::db;
use daybook::core::error::DaybookError;
use daybook::core::schemas;
use daybook::core::store::Store;
use daybook::core::time;
use daybook::engine::BacklogPolicy;
use rusqlite::params;
use std::fs;
use tempfile::tempdir;

#[test]
fn db_connect_enables_wal_and_foreign_keys() {
    let tmp = tempdir().expect("tempdir");
    let db_path = tmp.path().join(schemas::DAYBOOK_DB_NAME);

    let conn = db::db_connect(&db_path.to_string_lossy()).expect("db connect");
    let fk_on: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .expect("pragma foreign_keys");
    assert_eq!(fk_on, 1);
    let mode: String = conn
        .query_row("PRAGMA journal_mode;", [], |row| row.get(0))
        .expect("pragma journal_mode");
    assert_eq!(mode.to_lowercase(), "wal");
}

#[test]
fn broker_audits_every_call_with_status() {
    let tmp = tempdir().expect("tempdir");
    let root = tmp.path();
    let db_path = root.join("scratch.db");
    let broker = DbBroker::new(root);

    broker
        .with_conn(&db_path, "tester", None, "scratch.create", |conn| {
            conn.execute("CREATE TABLE t (v INTEGER NOT NULL)", [])?;
            Ok(())
        })
        .expect("create");

    let failed: Result<(), DaybookError> =
        broker.with_conn(&db_path, "tester", Some("intent:x"), "scratch.fail", |_| {
            Err(DaybookError::ValidationError("nope".into()))
        });
    assert!(failed.is_err());

    let events = broker::read_audit_log(root).expect("audit log");
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].op, "scratch.create");
    assert_eq!(events[0].status, "success");
    assert_eq!(events[0].db_id, "scratch.db");
    assert_eq!(events[1].status, "error");
    assert_eq!(events[1].intent_ref.as_deref(), Some("intent:x"));
}

#[test]
fn broker_transaction_rolls_back_on_error() {
    let tmp = tempdir().expect("tempdir");
    let root = tmp.path();
    let db_path = root.join("scratch.db");
    let broker = DbBroker::new(root);

    broker
        .with_conn(&db_path, "tester", None, "scratch.create", |conn| {
            conn.execute("CREATE TABLE t (v INTEGER NOT NULL)", [])?;
            Ok(())
        })
        .expect("create");

    let result: Result<(), DaybookError> =
        broker.with_tx(&db_path, "tester", None, "scratch.insert", |tx| {
            tx.execute("INSERT INTO t(v) VALUES(?1)", params![1])?;
            Err(DaybookError::Conflict("abort".into()))
        });
    assert!(result.expect_err("aborted").is_conflict());

    broker
        .with_tx(&db_path, "tester", None, "scratch.insert", |tx| {
            tx.execute("INSERT INTO t(v) VALUES(?1)", params![2])?;
            Ok(())
        })
        .expect("commit");

    let values: Vec<i64> = broker
        .with_conn(&db_path, "tester", None, "scratch.read", |conn| {
            let mut stmt = conn.prepare("SELECT v FROM t")?;
            let rows = stmt
                .query_map([], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<i64>>>()?;
            Ok(rows)
        })
        .expect("read");
    assert_eq!(values, vec![2]);
}

#[test]
fn config_defaults_when_missing_and_round_trips_written_defaults() {
    let tmp = tempdir().expect("tempdir");
    let store = Store::new(tmp.path().join(".daybook"));
    fs::create_dir_all(&store.root).expect("mkdir");

    assert_eq!(
        config::load_config(&store.root).expect("defaults"),
        DaybookConfig::default()
    );
    assert!(config::write_default_config(&store.root).expect("write"));
    assert!(!config::write_default_config(&store.root).expect("second write is a no-op"));
    assert_eq!(
        config::load_config(&store.root).expect("reload"),
        DaybookConfig::default()
    );
}

#[test]
fn config_rejects_unknown_keys_and_bad_values() {
    let tmp = tempdir().expect("tempdir");
    let root = tmp.path();

    fs::write(config::config_path(root), "scan_limit = 0\n").expect("write");
    assert!(matches!(
        config::load_config(root),
        Err(DaybookError::Config(_))
    ));

    fs::write(config::config_path(root), "colour = \"red\"\n").expect("write");
    assert!(matches!(
        config::load_config(root),
        Err(DaybookError::Config(_))
    ));

    fs::write(
        config::config_path(root),
        "user = \"mika\"\nbacklog = \"accumulate\"\nhistory_days = 14\n",
    )
    .expect("write");
    let cfg = config::load_config(root).expect("valid");
    assert_eq!(cfg.user, "mika");
    assert_eq!(cfg.backlog, BacklogPolicy::Accumulate);
    assert_eq!(cfg.history_days, 14);
}

#[test]
fn command_envelope_merges_payload() {
    let env = time::command_envelope("carryover.scan", "ok", serde_json::json!({ "pending": [] }));
    assert_eq!(env["cmd"], "carryover.scan");
    assert_eq!(env["status"], "ok");
    assert_eq!(env["envelope_version"], "1.0.0");
    assert!(env["pending"].as_array().is_some());
    assert!(env["event_id"].as_str().is_some_and(|id| id.len() == 26));
}

#[test]
fn malformed_dates_are_validation_errors() {
    for raw in ["2024-13-01", "yesterday", "2024/01/10", ""] {
        assert!(
            matches!(time::parse_date(raw), Err(DaybookError::ValidationError(_))),
            "{} should be rejected",
            raw
        );
    }
}
