use rusqlite;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DaybookError {
    #[error("SQLite error: {0}")]
    RusqliteError(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("Persistence unavailable: {0}")]
    PersistenceUnavailable(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Config error: {0}")]
    Config(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DaybookError {
    /// True for failures of the storage collaborator itself (as opposed to
    /// a rejected request).
    pub fn is_persistence_failure(&self) -> bool {
        matches!(
            self,
            DaybookError::RusqliteError(_)
                | DaybookError::IoError(_)
                | DaybookError::PersistenceUnavailable(_)
        )
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, DaybookError::Conflict(_))
    }
}
