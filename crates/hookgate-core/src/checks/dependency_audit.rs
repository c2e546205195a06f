//! Vulnerability audit after a dependency manifest or lockfile changes.

use super::lint::{first_available, run_tool, Candidates, TOOL_BUDGET_MARGIN};
use crate::check::{file_mutation, Check, CheckResult};
use crate::error::Result;
use crate::event::{ActionKind, Event};
use crate::runner::{ToolOutput, ToolRunner};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

pub const NAME: &str = "dependency_audit";

const NPM_FILES: &[&str] = &["package.json", "package-lock.json", "yarn.lock", "pnpm-lock.yaml"];

const PYTHON_FILES: &[&str] = &[
    "pyproject.toml",
    "requirements.txt",
    "requirements-dev.txt",
    "Pipfile",
    "Pipfile.lock",
    "poetry.lock",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ecosystem {
    Npm,
    Python,
}

impl Ecosystem {
    pub fn for_file(file_name: &str) -> Option<Self> {
        if NPM_FILES.contains(&file_name) {
            Some(Ecosystem::Npm)
        } else if PYTHON_FILES.contains(&file_name) {
            Some(Ecosystem::Python)
        } else {
            None
        }
    }

    fn candidates(self) -> Candidates {
        match self {
            Ecosystem::Npm => vec![("npm", vec!["audit".into(), "--json".into()])],
            Ecosystem::Python => vec![
                ("pip-audit", Vec::new()),
                ("uvx", vec!["pip-audit".into()]),
            ],
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct NpmReport {
    #[serde(default)]
    metadata: NpmMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct NpmMetadata {
    #[serde(default)]
    vulnerabilities: NpmCounts,
}

#[derive(Debug, Default, Deserialize)]
struct NpmCounts {
    #[serde(default)]
    critical: u64,
    #[serde(default)]
    high: u64,
}

/// Summary line for a failing `npm audit --json` run.
pub fn summarize_npm(stdout: &str) -> String {
    match serde_json::from_str::<NpmReport>(stdout) {
        Ok(report) => {
            let counts = report.metadata.vulnerabilities;
            if counts.critical > 0 || counts.high > 0 {
                format!(
                    "Found {} critical, {} high vulnerabilities",
                    counts.critical, counts.high
                )
            } else {
                "npm audit found vulnerabilities".to_string()
            }
        }
        Err(_) => "npm audit found vulnerabilities".to_string(),
    }
}

/// Vulnerable rows in `pip-audit` table output (header and rule lines skipped).
pub fn count_pip_findings(stdout: &str) -> usize {
    stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with("Name") && !l.starts_with('-'))
        .count()
}

pub struct DependencyAudit {
    runner: Arc<dyn ToolRunner>,
    timeout: Duration,
}

impl DependencyAudit {
    pub fn new(runner: Arc<dyn ToolRunner>, timeout: Duration) -> Self {
        Self { runner, timeout }
    }

    fn finding(ecosystem: Ecosystem, out: &ToolOutput) -> Option<String> {
        if out.success() {
            return None;
        }
        match ecosystem {
            Ecosystem::Npm => Some(summarize_npm(&out.stdout)),
            Ecosystem::Python => match count_pip_findings(&out.stdout) {
                0 => None,
                n => Some(format!("pip-audit found {n} vulnerabilities")),
            },
        }
    }
}

impl Check for DependencyAudit {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Runs npm audit or pip-audit when a dependency manifest changes"
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
        let Some(ecosystem) = event.file_name().and_then(Ecosystem::for_file) else {
            return Ok(CheckResult::pass(NAME));
        };
        let Some(invocation) = first_available(
            self.runner.as_ref(),
            ecosystem.candidates(),
            &event.working_directory,
            self.timeout,
        ) else {
            tracing::debug!(?ecosystem, "no dependency auditor installed");
            return Ok(CheckResult::pass(NAME));
        };
        let Some(out) = run_tool(self.runner.as_ref(), NAME, &invocation) else {
            return Ok(CheckResult::pass(NAME));
        };

        Ok(match Self::finding(ecosystem, &out) {
            None => CheckResult::pass(NAME),
            Some(message) => CheckResult::warn(NAME, message).with_hints([
                "Run 'npm audit fix' or 'pip-audit --fix' to auto-fix",
                "Review vulnerabilities and update dependencies",
            ]),
        })
    }
}
