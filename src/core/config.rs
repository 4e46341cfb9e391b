//! `daybook.toml` loading.
//!
//! The file lives in the store root. A missing file is not an error: every
//! key has a default.

use crate::core::error::DaybookError;
use crate::engine::carryover::BacklogPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "daybook.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DaybookConfig {
    /// User whose reports the CLI operates on.
    pub user: String,
    /// How many prior reports a carry-over scan reads.
    pub scan_limit: usize,
    pub backlog: BacklogPolicy,
    /// Length of the trend window shown on the dashboard.
    pub history_days: u32,
}

impl Default for DaybookConfig {
    fn default() -> Self {
        Self {
            user: "local".to_string(),
            scan_limit: 30,
            backlog: BacklogPolicy::MostRecent,
            history_days: 7,
        }
    }
}

impl DaybookConfig {
    fn validate(self) -> Result<Self, DaybookError> {
        if self.user.trim().is_empty() {
            return Err(DaybookError::Config("user must not be empty".into()));
        }
        if self.scan_limit == 0 {
            return Err(DaybookError::Config("scan_limit must be at least 1".into()));
        }
        if self.history_days == 0 || self.history_days > 366 {
            return Err(DaybookError::Config(
                "history_days must be between 1 and 366".into(),
            ));
        }
        Ok(self)
    }
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE_NAME)
}

pub fn parse_config(content: &str) -> Result<DaybookConfig, DaybookError> {
    let config: DaybookConfig =
        toml::from_str(content).map_err(|e| DaybookError::Config(e.to_string()))?;
    config.validate()
}

/// Load `<root>/daybook.toml`, falling back to defaults when absent.
pub fn load_config(root: &Path) -> Result<DaybookConfig, DaybookError> {
    let path = config_path(root);
    if !path.exists() {
        return Ok(DaybookConfig::default());
    }
    let content = fs::read_to_string(&path).map_err(DaybookError::IoError)?;
    parse_config(&content)
}

/// Write the defaults to `<root>/daybook.toml` unless a file is already there.
pub fn write_default_config(root: &Path) -> Result<bool, DaybookError> {
    let path = config_path(root);
    if path.exists() {
        return Ok(false);
    }
    let body = toml::to_string(&DaybookConfig::default())
        .map_err(|e| DaybookError::Config(e.to_string()))?;
    fs::write(&path, body).map_err(DaybookError::IoError)?;
    Ok(true)
}
