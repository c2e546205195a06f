//! External tool invocation for the post-action checks.
//!
//! Linters and type checkers are reached through the [`ToolRunner`] trait so
//! the checks can be driven by a scripted runner in tests. [`ProcessRunner`]
//! is the real implementation: it resolves programs on `PATH` with `which`
//! and enforces a wall-clock budget per invocation.

use crate::error::{HookError, Result};
use std::collections::HashSet;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Cap on captured output per stream, keeping the tail.
const MAX_OUTPUT: usize = 10 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub timeout: Duration,
}

impl ToolInvocation {
    pub fn new<I, S>(program: &str, args: I, cwd: impl Into<PathBuf>, timeout: Duration) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
            cwd: cwd.into(),
            timeout,
        }
    }

    /// `program arg1 arg2`, for log lines.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// `None` when the process was killed or terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// stdout followed by stderr, trimmed.
    pub fn combined(&self) -> String {
        let out = self.stdout.trim();
        let err = self.stderr.trim();
        match (out.is_empty(), err.is_empty()) {
            (true, _) => err.to_string(),
            (_, true) => out.to_string(),
            _ => format!("{out}\n{err}"),
        }
    }

    /// First `n` non-empty lines of [`ToolOutput::combined`].
    pub fn head(&self, n: usize) -> Vec<String> {
        self.combined()
            .lines()
            .filter(|l| !l.trim().is_empty())
            .take(n)
            .map(str::to_string)
            .collect()
    }
}

pub trait ToolRunner: Send + Sync {
    /// Whether `program` can be launched at all.
    fn available(&self, program: &str) -> bool;

    fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput>;

    /// Stop every invocation still in flight. Called when the dispatcher has
    /// given up waiting on a check that uses this runner.
    fn cancel(&self) {}
}

// ---------------------------------------------------------------------------
// ProcessRunner
// ---------------------------------------------------------------------------

/// Spawns real processes. Children still running are tracked by pid so
/// [`ToolRunner::cancel`] can kill them before the hook process exits.
#[derive(Debug, Default)]
pub struct ProcessRunner {
    live: Arc<Mutex<HashSet<u32>>>,
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pids of children that have not been reaped yet.
    pub fn live_pids(&self) -> Vec<u32> {
        self.live
            .lock()
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }
}

impl ToolRunner for ProcessRunner {
    fn available(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }

    /// Runs the program with piped output. stdout and stderr are drained on
    /// their own threads so a chatty tool cannot fill a pipe and stall; the
    /// wait happens on a third thread so the budget can be enforced with
    /// `recv_timeout`.
    fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput> {
        let program = which::which(&invocation.program)
            .map_err(|e| HookError::ToolSpawnFailed(format!("{}: {e}", invocation.program)))?;

        let mut child = Command::new(program)
            .args(&invocation.args)
            .current_dir(&invocation.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| HookError::ToolSpawnFailed(format!("{}: {e}", invocation.program)))?;

        let child_pid = child.id();
        if let Ok(mut live) = self.live.lock() {
            live.insert(child_pid);
        }
        let stdout_thread = drain(child.stdout.take());
        let stderr_thread = drain(child.stderr.take());

        let (tx, rx) = std::sync::mpsc::channel();
        let live = Arc::clone(&self.live);
        std::thread::spawn(move || {
            let status = child.wait();
            if let Ok(mut live) = live.lock() {
                live.remove(&child_pid);
            }
            let _ = tx.send(status);
        });

        let status = match rx.recv_timeout(invocation.timeout) {
            Ok(status) => status?,
            Err(_) => {
                kill_process(child_pid);
                tracing::warn!(
                    tool = %invocation.display(),
                    timeout_secs = invocation.timeout.as_secs(),
                    "tool timed out"
                );
                return Ok(ToolOutput {
                    exit_code: None,
                    timed_out: true,
                    ..ToolOutput::default()
                });
            }
        };

        Ok(ToolOutput {
            exit_code: status.code(),
            stdout: stdout_thread.join().unwrap_or_default(),
            stderr: stderr_thread.join().unwrap_or_default(),
            timed_out: false,
        })
    }

    fn cancel(&self) {
        for pid in self.live_pids() {
            tracing::warn!(pid, "killing abandoned tool process");
            kill_process(pid);
        }
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> std::thread::JoinHandle<String> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut r) = pipe {
            let _ = r.read_to_end(&mut buf);
        }
        let text = String::from_utf8_lossy(&buf);
        tail(&text, MAX_OUTPUT).to_string()
    })
}

fn tail(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut start = s.len() - max;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    &s[start..]
}

/// Best-effort SIGKILL by pid.
fn kill_process(pid: u32) {
    let _ = Command::new("kill")
        .arg("-9")
        .arg(pid.to_string())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
}

// ---------------------------------------------------------------------------
// Scripted runner for tests
// ---------------------------------------------------------------------------


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combined_and_head() {
        let out = ToolOutput {
            exit_code: Some(1),
            stdout: "a\n\nb\nc\n".into(),
            stderr: "err\n".into(),
            timed_out: false,
        };
        assert!(!out.success());
        assert_eq!(out.combined(), "a\n\nb\nc\nerr");
        assert_eq!(out.head(3), vec!["a", "b", "c"]);
    }

    #[test]
    fn tail_respects_char_boundaries() {
        let s = "ééé";
        let t = tail(s, 3);
        assert!(t.len() <= 3);
        assert!(s.ends_with(t));
    }

    #[test]
    fn invocation_display() {
        let inv = ToolInvocation::new("npx", ["eslint", "a.ts"], "/w", Duration::from_secs(1));
        assert_eq!(inv.display(), "npx eslint a.ts");
    }

    #[test]
    fn missing_program_is_spawn_failure() {
        let inv = ToolInvocation::new(
            "hookgate-definitely-not-installed",
            Vec::<String>::new(),
            std::env::temp_dir(),
            Duration::from_secs(1),
        );
        assert!(!ProcessRunner::new().available(&inv.program));
        assert!(matches!(
            ProcessRunner::new().run(&inv),
            Err(HookError::ToolSpawnFailed(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn process_runner_captures_exit_code() {
        let inv = ToolInvocation::new(
            "sh",
            ["-c", "echo out; echo err 1>&2; exit 3"],
            std::env::temp_dir(),
            Duration::from_secs(10),
        );
        let out = ProcessRunner::new().run(&inv).unwrap();
        assert_eq!(out.exit_code, Some(3));
        assert_eq!(out.stdout.trim(), "out");
        assert_eq!(out.stderr.trim(), "err");
    }

    #[cfg(unix)]
    #[test]
    fn process_runner_times_out() {
        let inv = ToolInvocation::new(
            "sh",
            ["-c", "sleep 5"],
            std::env::temp_dir(),
            Duration::from_millis(100),
        );
        let runner = ProcessRunner::new();
        let out = runner.run(&inv).unwrap();
        assert!(out.timed_out);
        assert_eq!(out.exit_code, None);
    }

    #[cfg(unix)]
    #[test]
    fn cancel_kills_children_in_flight() {
        let runner = Arc::new(ProcessRunner::new());
        let worker = {
            let runner = Arc::clone(&runner);
            std::thread::spawn(move || {
                let inv = ToolInvocation::new(
                    "sh",
                    ["-c", "sleep 30"],
                    std::env::temp_dir(),
                    Duration::from_secs(60),
                );
                runner.run(&inv)
            })
        };

        let started = std::time::Instant::now();
        while runner.live_pids().is_empty() {
            assert!(started.elapsed() < Duration::from_secs(5), "child never started");
            std::thread::sleep(Duration::from_millis(10));
        }
        runner.cancel();

        let out = worker.join().unwrap().unwrap();
        assert!(started.elapsed() < Duration::from_secs(20));
        assert_eq!(out.exit_code, None);
        assert!(runner.live_pids().is_empty());
    }
}
