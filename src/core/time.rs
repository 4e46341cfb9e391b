//! Shared timestamp, calendar-date and event-envelope helpers.

use crate::core::error::DaybookError;
use chrono::{Local, NaiveDate, Utc};
use serde_json::Value as JsonValue;
use ulid::Ulid;

/// Canonical on-disk and CLI format for calendar dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

pub fn new_event_id() -> String {
    Ulid::new().to_string()
}

/// The local calendar date. Day boundaries follow the machine's timezone.
pub fn today_local() -> NaiveDate {
    Local::now().date_naive()
}

pub fn parse_date(input: &str) -> Result<NaiveDate, DaybookError> {
    NaiveDate::parse_from_str(input.trim(), DATE_FORMAT).map_err(|e| {
        DaybookError::ValidationError(format!("invalid date '{}': {}", input, e))
    })
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Standard command response envelope shape used across CLI surfaces.
pub fn command_envelope(cmd: &str, status: &str, extra: JsonValue) -> JsonValue {
    let mut base = serde_json::json!({
        "envelope_version": "1.0.0",
        "ts": now_rfc3339(),
        "event_id": new_event_id(),
        "cmd": cmd,
        "status": status
    });
    if let (Some(base_obj), Some(extra_obj)) = (base.as_object_mut(), extra.as_object()) {
        for (k, v) in extra_obj {
            base_obj.insert(k.clone(), v.clone());
        }
    }
    base
}
