//! Post-action checks that shell out to a linter or type checker.
//!
//! Both look the tool up through the injected [`ToolRunner`]; a missing tool,
//! a spawn failure or a timeout is a `Pass` with a log line, never a verdict.

use super::file_label;
use crate::check::{file_mutation, Check, CheckResult};
use crate::error::Result;
use crate::event::{ActionKind, Event};
use crate::runner::{ToolInvocation, ToolOutput, ToolRunner};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub const LINT: &str = "lint";
pub const TYPECHECK: &str = "typecheck";

/// Lines of tool output carried as hints.
const OUTPUT_LINES: usize = 10;

/// Headroom over the tool timeout for lookup and output collection.
pub(crate) const TOOL_BUDGET_MARGIN: Duration = Duration::from_secs(1);

const JS_EXTENSIONS: &[&str] = &["js", "jsx", "ts", "tsx"];
const TS_EXTENSIONS: &[&str] = &["ts", "tsx"];

/// `(program, args)` alternatives, most specific first.
pub(super) type Candidates = Vec<(&'static str, Vec<String>)>;

pub(super) fn first_available(
    runner: &dyn ToolRunner,
    candidates: Candidates,
    cwd: &Path,
    timeout: Duration,
) -> Option<ToolInvocation> {
    candidates
        .into_iter()
        .find(|(program, _)| runner.available(program))
        .map(|(program, args)| ToolInvocation::new(program, args, cwd, timeout))
}

/// Run `invocation`; `None` means "no opinion" (spawn failure or timeout).
pub(super) fn run_tool(runner: &dyn ToolRunner, check: &str, invocation: &ToolInvocation) -> Option<ToolOutput> {
    match runner.run(invocation) {
        Ok(out) if out.timed_out => {
            tracing::warn!(check, tool = %invocation.display(), "tool timed out; treating as pass");
            None
        }
        Ok(out) => Some(out),
        Err(e) => {
            tracing::warn!(check, tool = %invocation.display(), error = %e, "tool failed to run");
            None
        }
    }
}

/// Absolute target path, only if it exists on disk.
fn existing_target(event: &Event) -> Option<String> {
    let path = event.resolved_path()?;
    if !path.is_file() {
        return None;
    }
    path.to_str().map(str::to_string)
}

// ---------------------------------------------------------------------------
// Lint
// ---------------------------------------------------------------------------

pub struct Lint {
    runner: Arc<dyn ToolRunner>,
    timeout: Duration,
}

impl Lint {
    pub fn new(runner: Arc<dyn ToolRunner>, timeout: Duration) -> Self {
        Self { runner, timeout }
    }

    fn candidates(ext: &str, file: &str) -> Candidates {
        match ext {
            "py" => vec![("ruff", vec!["check".into(), file.into()])],
            e if JS_EXTENSIONS.contains(&e) => vec![
                ("eslint", vec![file.into()]),
                ("npx", vec!["--no-install".into(), "eslint".into(), file.into()]),
            ],
            _ => Vec::new(),
        }
    }
}

impl Check for Lint {
    fn name(&self) -> &'static str {
        LINT
    }

    fn description(&self) -> &'static str {
        "Runs ruff or eslint on the changed file and surfaces findings"
    }

    fn applies_to(&self, kind: ActionKind) -> bool {
        file_mutation(kind)
    }

    fn time_budget(&self) -> Option<Duration> {
        Some(self.timeout + TOOL_BUDGET_MARGIN)
    }

    fn cancel(&self) {
        self.runner.cancel();
    }

    fn evaluate(&self, event: &Event) -> Result<CheckResult> {
        let (Some(ext), Some(file)) = (event.extension(), existing_target(event)) else {
            return Ok(CheckResult::pass(LINT));
        };
        let candidates = Self::candidates(&ext, &file);
        if candidates.is_empty() {
            return Ok(CheckResult::pass(LINT));
        }
        let Some(invocation) = first_available(
            self.runner.as_ref(),
            candidates,
            &event.working_directory,
            self.timeout,
        ) else {
            tracing::debug!(ext = %ext, "no linter installed");
            return Ok(CheckResult::pass(LINT));
        };
        let Some(out) = run_tool(self.runner.as_ref(), LINT, &invocation) else {
            return Ok(CheckResult::pass(LINT));
        };
        if out.success() {
            return Ok(CheckResult::pass(LINT));
        }

        Ok(CheckResult::warn(
            LINT,
            format!(
                "{} reported problems in {}",
                invocation.program,
                file_label(&file)
            ),
        )
        .with_hints(out.head(OUTPUT_LINES)))
    }
}

// ---------------------------------------------------------------------------
// Typecheck
// ---------------------------------------------------------------------------

pub struct Typecheck {
    runner: Arc<dyn ToolRunner>,
    timeout: Duration,
}

impl Typecheck {
    pub fn new(runner: Arc<dyn ToolRunner>, timeout: Duration) -> Self {
        Self { runner, timeout }
    }

    fn candidates(ext: &str, file: &str, cwd: &Path) -> Candidates {
        if ext == "py" && (cwd.join("pyproject.toml").is_file() || cwd.join("mypy.ini").is_file()) {
            return vec![
                ("mypy", vec![file.into()]),
                ("uvx", vec!["mypy".into(), file.into()]),
            ];
        }
        if TS_EXTENSIONS.contains(&ext) && cwd.join("tsconfig.json").is_file() {
            let args = || -> Vec<String> {
                vec!["--noEmit".into(), "-p".into(), "tsconfig.json".into()]
            };
            let mut npx = vec!["--no-install".to_string(), "tsc".to_string()];
            npx.extend(args());
            return vec![("tsc", args()), ("npx", npx)];
        }
        Vec::new()
    }
}

impl Check for Typecheck {
    fn name(&self) -> &'static str {
        TYPECHECK
    }

    fn description(&self) -> &'static str {
        "Runs mypy or tsc when the project is configured for it"
    }

    fn applies_to(&self, kind: ActionKind) -> bool {
        file_mutation(kind)
    }

    fn time_budget(&self) -> Option<Duration> {
        Some(self.timeout + TOOL_BUDGET_MARGIN)
    }

    fn cancel(&self) {
        self.runner.cancel();
    }

    fn evaluate(&self, event: &Event) -> Result<CheckResult> {
        let (Some(ext), Some(file)) = (event.extension(), existing_target(event)) else {
            return Ok(CheckResult::pass(TYPECHECK));
        };
        let cwd = &event.working_directory;
        let candidates = Self::candidates(&ext, &file, cwd);
        let Some(invocation) =
            first_available(self.runner.as_ref(), candidates, cwd, self.timeout)
        else {
            return Ok(CheckResult::pass(TYPECHECK));
        };
        let Some(out) = run_tool(self.runner.as_ref(), TYPECHECK, &invocation) else {
            return Ok(CheckResult::pass(TYPECHECK));
        };
        if out.success() {
            return Ok(CheckResult::pass(TYPECHECK));
        }

        Ok(CheckResult::block(
            TYPECHECK,
            format!(
                "{} found type errors after editing {}",
                invocation.program,
                file_label(&file)
            ),
        )
        .with_hints(out.head(OUTPUT_LINES)))
    }
}
