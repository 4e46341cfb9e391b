//! Store handle for Daybook's on-disk state.
//!
//! A store is a directory holding the SQLite database, the domain event log,
//! the broker audit log and the optional `daybook.toml`.

use std::path::{Path, PathBuf};

/// Default store directory name, resolved against the working directory.
pub const DEFAULT_STORE_DIR: &str = ".daybook";

/// Store handle representing a Daybook state workspace.
#[derive(Debug, Clone)]
pub struct Store {
    /// Absolute or caller-relative path to the store root directory
    pub root: PathBuf,
}

impl Store {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store rooted at `<dir>/.daybook`.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(DEFAULT_STORE_DIR))
    }
}
