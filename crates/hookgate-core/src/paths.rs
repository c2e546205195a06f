use crate::error::{HookError, Result};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const CLAUDE_DIR: &str = ".claude";
pub const CONFIG_FILE: &str = ".claude/hookgate.yaml";
pub const LOGS_DIR: &str = ".claude/logs";

pub const LOG_FILE_PREFIX: &str = "hooks_";
pub const LOG_FILE_EXT: &str = "jsonl";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

/// `~/.claude/logs`, or `None` when no home directory can be determined.
pub fn default_log_dir() -> Option<PathBuf> {
    home::home_dir().map(|h| h.join(LOGS_DIR))
}

/// `hooks_YYYYMMDD.jsonl` inside `log_dir`.
pub fn daily_log_path(log_dir: &Path, date: NaiveDate) -> PathBuf {
    log_dir.join(format!(
        "{LOG_FILE_PREFIX}{}.{LOG_FILE_EXT}",
        date.format("%Y%m%d")
    ))
}

pub fn parse_log_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y%m%d").map_err(|_| HookError::InvalidDate(s.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
