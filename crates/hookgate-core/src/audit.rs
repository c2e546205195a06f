//! Invocation logger and the daily JSONL audit log.
//!
//! [`run_with_logging`] wraps one hook run. Whatever the body does (returns,
//! fails, panics) exactly one [`AuditRecord`] is appended to
//! `<log_dir>/hooks_YYYYMMDD.jsonl` and one breadcrumb line goes to stderr.
//! Logging is best-effort: I/O failures are swallowed and never change the
//! body's result.

use crate::dispatch::Dispatch;
use crate::decision::{Outcome, EXIT_OK, EXIT_PIPELINE_FAULT};
use crate::error::{HookError, Result};
use crate::event::{ActionKind, Event};
use crate::io::{append_line, truncate_chars};
use crate::paths;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::time::Instant;

const ERROR_MAX_CHARS: usize = 200;
const BREADCRUMB_FILE_MAX_CHARS: usize = 120;

pub const SESSION_ENV: &str = "CLAUDE_SESSION_ID";

// ---------------------------------------------------------------------------
// AuditRecord
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub check_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_ms: u64,
    pub exit_code: i32,
    pub ok: bool,
    pub pid: u32,
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_kind: Option<ActionKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript_ref: Option<String>,
    #[serde(default)]
    pub recursion_guard: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
    #[serde(default)]
    pub checks_run: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuditRecord {
    /// `[hookgate] check=.. tool=.. file=.. ok dur_ms=.. exit=..`
    pub fn breadcrumb(&self) -> String {
        let mut parts = vec![
            "[hookgate]".to_string(),
            format!("check={}", self.check_name),
        ];
        if let Some(tool) = &self.tool_name {
            parts.push(format!("tool={tool}"));
        }
        if let Some(file) = &self.file_path {
            parts.push(format!(
                "file={}",
                truncate_chars(file, BREADCRUMB_FILE_MAX_CHARS)
            ));
        }
        parts.push(if self.ok { "ok" } else { "fail" }.to_string());
        parts.push(format!("dur_ms={}", self.duration_ms));
        parts.push(format!("exit={}", self.exit_code));
        parts.join(" ")
    }
}

// ---------------------------------------------------------------------------
// AuditLog
// ---------------------------------------------------------------------------

/// Where records go. `dir: None` disables the log entirely.
#[derive(Debug, Clone, Default)]
pub struct AuditLog {
    dir: Option<PathBuf>,
}

impl AuditLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
        }
    }

    pub fn disabled() -> Self {
        Self { dir: None }
    }

    /// Explicit directory if given, else `~/.claude/logs`, else disabled.
    pub fn resolve(explicit: Option<PathBuf>) -> Self {
        Self {
            dir: explicit.or_else(paths::default_log_dir),
        }
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    pub fn path_for(&self, date: NaiveDate) -> Option<PathBuf> {
        self.dir.as_ref().map(|d| paths::daily_log_path(d, date))
    }

    /// One serialized record, one append. A disabled log is a no-op.
    pub fn append(&self, record: &AuditRecord) -> Result<()> {
        let Some(path) = self.path_for(record.end_time.date_naive()) else {
            return Ok(());
        };
        let line = serde_json::to_string(record)?;
        append_line(&path, &line)
    }

    /// Records for `date`, skipping lines that do not parse. A missing file is
    /// an empty day.
    pub fn read_day(&self, date: NaiveDate) -> Result<Vec<AuditRecord>> {
        let path = self.path_for(date).ok_or(HookError::HomeNotFound)?;
        if !path.exists() {
            return Ok(Vec::new());
        }
        let data = std::fs::read_to_string(&path)?;
        Ok(data
            .lines()
            .filter(|l| !l.trim().is_empty())
            .filter_map(|l| match serde_json::from_str::<AuditRecord>(l) {
                Ok(r) => Some(r),
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "skipping malformed audit line");
                    None
                }
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Invocation
// ---------------------------------------------------------------------------

/// Facts gathered while a hook body runs.
#[derive(Debug)]
pub struct Invocation {
    check_name: String,
    start_time: DateTime<Utc>,
    started: Instant,
    env_session: Option<String>,
    event_session: Option<String>,
    tool_name: Option<String>,
    action_kind: Option<ActionKind>,
    file_path: Option<String>,
    working_directory: Option<String>,
    transcript_ref: Option<String>,
    recursion_guard: bool,
    outcome: Option<Outcome>,
    checks_run: usize,
}

impl Invocation {
    pub fn start(check_name: &str) -> Self {
        Self {
            check_name: check_name.to_string(),
            start_time: Utc::now(),
            started: Instant::now(),
            env_session: std::env::var(SESSION_ENV).ok().filter(|s| !s.is_empty()),
            event_session: None,
            tool_name: None,
            action_kind: None,
            file_path: None,
            working_directory: None,
            transcript_ref: None,
            recursion_guard: false,
            outcome: None,
            checks_run: 0,
        }
    }

    pub fn observe_event(&mut self, event: &Event) {
        self.tool_name = Some(event.tool_name.clone());
        self.action_kind = Some(event.action_kind);
        self.file_path = event.file_path().map(str::to_string);
        self.working_directory = Some(event.working_directory.display().to_string());
        self.transcript_ref = event.transcript_ref.clone();
        self.recursion_guard = event.recursion_guard;
        self.event_session = event.session_id.clone();
    }

    pub fn observe_dispatch(&mut self, dispatch: &Dispatch) {
        if let Some(event) = &dispatch.event {
            self.observe_event(event);
        }
        self.outcome = Some(dispatch.decision.outcome);
        self.checks_run = dispatch.checks_run();
    }

    fn finish(self, exit_code: i32, error: Option<(String, String)>) -> AuditRecord {
        let end_time = Utc::now();
        let (error_type, error) = match error {
            Some((t, msg)) => (Some(t), Some(truncate_chars(&msg, ERROR_MAX_CHARS))),
            None => (None, None),
        };
        AuditRecord {
            check_name: self.check_name,
            start_time: self.start_time,
            end_time,
            duration_ms: self.started.elapsed().as_millis() as u64,
            exit_code,
            ok: exit_code == EXIT_OK,
            pid: std::process::id(),
            session_id: self
                .env_session
                .or(self.event_session)
                .unwrap_or_else(|| std::process::id().to_string()),
            tool_name: self.tool_name,
            action_kind: self.action_kind,
            file_path: self.file_path,
            working_directory: self.working_directory,
            transcript_ref: self.transcript_ref,
            recursion_guard: self.recursion_guard,
            outcome: self.outcome,
            checks_run: self.checks_run,
            error_type,
            error,
        }
    }
}

// ---------------------------------------------------------------------------
// run_with_logging
// ---------------------------------------------------------------------------

/// Run `body`, then append one record and print one breadcrumb.
///
/// The return value is exactly what `body` produced; a panic is re-raised
/// after the record is written.
pub fn run_with_logging<F>(log: &AuditLog, check_name: &str, body: F) -> Result<i32>
where
    F: FnOnce(&mut Invocation) -> Result<i32>,
{
    let mut invocation = Invocation::start(check_name);
    let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| body(&mut invocation)));

    let (exit_code, error) = match &outcome {
        Ok(Ok(code)) => (*code, None),
        Ok(Err(e)) => (
            EXIT_PIPELINE_FAULT,
            Some((e.kind().to_string(), e.to_string())),
        ),
        Err(payload) => (
            EXIT_PIPELINE_FAULT,
            Some(("Panic".to_string(), panic_message(payload.as_ref()))),
        ),
    };

    let record = invocation.finish(exit_code, error);
    if let Err(e) = log.append(&record) {
        tracing::debug!(error = %e, "audit log unavailable");
    }
    let _ = writeln!(std::io::stderr(), "{}", record.breadcrumb());

    match outcome {
        Ok(result) => result,
        Err(payload) => std::panic::resume_unwind(payload),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}

// ---------------------------------------------------------------------------
// Summary (for `hookgate log`)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LogSummary {
    pub records: usize,
    pub failures: usize,
    pub denies: usize,
    pub mean_duration_ms: u64,
    pub max_duration_ms: u64,
    pub recent: Vec<String>,
}

pub fn summarize(records: &[AuditRecord], recent: usize) -> LogSummary {
    if records.is_empty() {
        return LogSummary::default();
    }
    let total: u64 = records.iter().map(|r| r.duration_ms).sum();
    LogSummary {
        records: records.len(),
        failures: records.iter().filter(|r| !r.ok).count(),
        denies: records
            .iter()
            .filter(|r| r.outcome == Some(Outcome::Deny))
            .count(),
        mean_duration_ms: total / records.len() as u64,
        max_duration_ms: records.iter().map(|r| r.duration_ms).max().unwrap_or(0),
        recent: records
            .iter()
            .rev()
            .take(recent)
            .rev()
            .map(AuditRecord::breadcrumb)
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HookConfig;
    use crate::dispatch::Dispatcher;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn all_records(dir: &Path) -> Vec<AuditRecord> {
        let mut out = Vec::new();
        for entry in std::fs::read_dir(dir).unwrap() {
            let data = std::fs::read_to_string(entry.unwrap().path()).unwrap();
            for line in data.lines() {
                out.push(serde_json::from_str(line).expect("well-formed record"));
            }
        }
        out
    }

    #[test]
    fn records_successful_run() {
        let dir = TempDir::new().unwrap();
        let log = AuditLog::new(dir.path());
        let code = run_with_logging(&log, "pre_action_dispatch", |inv| {
            let d = Dispatcher::pre_action(HookConfig::default())
                .dispatch(Event::shell("rm -rf /", "/w"));
            inv.observe_dispatch(&d);
            Ok(EXIT_OK)
        })
        .unwrap();
        assert_eq!(code, 0);

        let records = all_records(dir.path());
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.check_name, "pre_action_dispatch");
        assert!(r.ok);
        assert_eq!(r.tool_name.as_deref(), Some("Bash"));
        assert_eq!(r.action_kind, Some(ActionKind::ShellExecute));
        assert_eq!(r.working_directory.as_deref(), Some("/w"));
        assert_eq!(r.outcome, Some(Outcome::Deny));
        assert!(r.checks_run >= 2);
        assert!(r.end_time >= r.start_time);
    }

    #[test]
    fn body_error_is_recorded_and_returned() {
        let dir = TempDir::new().unwrap();
        let log = AuditLog::new(dir.path());
        let result = run_with_logging(&log, "x", |_| {
            Err(HookError::ToolSpawnFailed("y".repeat(500)))
        });
        assert!(matches!(result, Err(HookError::ToolSpawnFailed(_))));
        let r = &all_records(dir.path())[0];
        assert!(!r.ok);
        assert_eq!(r.exit_code, 1);
        assert_eq!(r.error_type.as_deref(), Some("ToolSpawnFailed"));
        assert_eq!(r.error.as_ref().unwrap().chars().count(), 200);
    }

    #[test]
    fn panic_is_recorded_then_resumed() {
        let dir = TempDir::new().unwrap();
        let log = AuditLog::new(dir.path());
        let caught = std::panic::catch_unwind(AssertUnwindSafe(|| {
            let _ = run_with_logging(&log, "x", |_| -> Result<i32> { panic!("kaboom") });
        }));
        assert!(caught.is_err());
        let r = &all_records(dir.path())[0];
        assert_eq!(r.error_type.as_deref(), Some("Panic"));
        assert_eq!(r.error.as_deref(), Some("kaboom"));
    }

    #[test]
    fn unwritable_log_does_not_change_result() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "file").unwrap();
        let log = AuditLog::new(blocker.join("logs"));
        let code = run_with_logging(&log, "x", |_| Ok(EXIT_OK)).unwrap();
        assert_eq!(code, EXIT_OK);
    }

    #[test]
    fn disabled_log_is_noop() {
        let log = AuditLog::disabled();
        assert_eq!(run_with_logging(&log, "x", |_| Ok(7)).unwrap(), 7);
        assert!(log.read_day(Utc::now().date_naive()).is_err());
    }

    #[test]
    fn concurrent_runs_produce_one_line_each() {
        let dir = TempDir::new().unwrap();
        let log = Arc::new(AuditLog::new(dir.path()));
        let n = 24;
        let handles: Vec<_> = (0..n)
            .map(|i| {
                let log = Arc::clone(&log);
                std::thread::spawn(move || {
                    run_with_logging(&log, "post_action_dispatch", |inv| {
                        inv.observe_event(&Event::write(
                            format!("src/file_{i}.rs"),
                            "x".repeat(i * 100),
                            "/w",
                        ));
                        Ok(EXIT_OK)
                    })
                    .unwrap()
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let records = all_records(dir.path());
        assert_eq!(records.len(), n);
        let mut files: Vec<_> = records.iter().filter_map(|r| r.file_path.clone()).collect();
        files.sort();
        files.dedup();
        assert_eq!(files.len(), n);
    }

    #[test]
    fn session_id_prefers_event_over_pid() {
        let mut inv = Invocation::start("x");
        inv.env_session = None;
        let mut ev = Event::shell("ls", "/w");
        ev.session_id = Some("sess-1".into());
        inv.observe_event(&ev);
        let r = inv.finish(0, None);
        assert_eq!(r.session_id, "sess-1");

        let mut inv = Invocation::start("x");
        inv.env_session = None;
        let r = inv.finish(0, None);
        assert_eq!(r.session_id, std::process::id().to_string());
    }

    #[test]
    fn breadcrumb_format() {
        let mut inv = Invocation::start("pre_action_dispatch");
        inv.observe_event(&Event::write(format!("{}.rs", "a".repeat(200)), "", "/w"));
        let r = inv.finish(0, None);
        let line = r.breadcrumb();
        assert!(line.starts_with("[hookgate] check=pre_action_dispatch tool=Write file=aaa"));
        assert!(line.contains("... ok dur_ms="));
        assert!(line.ends_with(" exit=0"));
    }

    #[test]
    fn read_day_and_summarize() {
        let dir = TempDir::new().unwrap();
        let log = AuditLog::new(dir.path());
        for code in [0, 0, 1] {
            let _ = run_with_logging(&log, "x", |_| Ok(code));
        }
        let today = Utc::now().date_naive();
        let path = log.path_for(today).unwrap();
        append_line(&path, "not json").unwrap();

        let records = log.read_day(today).unwrap();
        assert_eq!(records.len(), 3);
        let s = summarize(&records, 2);
        assert_eq!(s.records, 3);
        assert_eq!(s.failures, 1);
        assert_eq!(s.recent.len(), 2);
        assert!(s.recent[1].contains("exit=1"));
    }
}
