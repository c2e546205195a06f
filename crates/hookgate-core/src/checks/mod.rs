//! The closed set of checks, in registration order.
//!
//! Registration order is the order messages appear in a decision reason, so
//! the tables below are the single place that order is defined.

use crate::check::{Check, Stage};
use crate::config::HookConfig;
use crate::event::ActionKind;
use crate::runner::ToolRunner;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

pub mod branch_protection;
pub mod code_smells;
pub mod content_size;
pub mod dangerous_command;
pub mod dependency_audit;
pub mod file_protection;
pub mod lint;
pub mod nesting_depth;
pub mod path_containment;
pub mod readonly_path;
pub mod secret_scan;
pub mod todo_scan;

pub const PRE_ACTION_CHECKS: &[&str] = &[
    dangerous_command::NAME,
    branch_protection::NAME,
    secret_scan::NAME,
    file_protection::NAME,
    content_size::NAME,
    path_containment::NAME,
    readonly_path::NAME,
];

pub const POST_ACTION_CHECKS: &[&str] = &[
    lint::LINT,
    lint::TYPECHECK,
    dependency_audit::NAME,
    todo_scan::NAME,
    nesting_depth::NAME,
    code_smells::NAME,
];

/// Every registered name, pre-action first.
pub fn all_check_names() -> Vec<&'static str> {
    PRE_ACTION_CHECKS
        .iter()
        .chain(POST_ACTION_CHECKS)
        .copied()
        .collect()
}

/// Pre-action checks with thresholds taken from `config`. Enablement is not
/// applied here; the dispatcher filters.
pub fn pre_action_checks(config: &HookConfig) -> Vec<Arc<dyn Check>> {
    vec![
        Arc::new(dangerous_command::DangerousCommand),
        Arc::new(branch_protection::BranchProtection),
        Arc::new(secret_scan::SecretScan),
        Arc::new(file_protection::FileProtection),
        Arc::new(content_size::ContentSize::from_limits(&config.limits)),
        Arc::new(path_containment::PathContainment::new(
            config.paths.extra_allowed_roots.clone(),
        )),
        Arc::new(readonly_path::ReadonlyPath),
    ]
}

pub fn post_action_checks(config: &HookConfig, runner: Arc<dyn ToolRunner>) -> Vec<Arc<dyn Check>> {
    let timeout = config.tool_timeout();
    vec![
        Arc::new(lint::Lint::new(runner.clone(), timeout)),
        Arc::new(lint::Typecheck::new(runner.clone(), timeout)),
        Arc::new(dependency_audit::DependencyAudit::new(runner, timeout)),
        Arc::new(todo_scan::TodoScan),
        Arc::new(nesting_depth::NestingDepth::new(config.limits.max_nesting_depth)),
        Arc::new(code_smells::CodeSmells),
    ]
}

pub fn checks_for_stage(
    stage: Stage,
    config: &HookConfig,
    runner: Arc<dyn ToolRunner>,
) -> Vec<Arc<dyn Check>> {
    match stage {
        Stage::PreAction => pre_action_checks(config),
        Stage::PostAction => post_action_checks(config, runner),
    }
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

/// One row of `hookgate checks`.
#[derive(Debug, Clone, Serialize)]
pub struct CheckInfo {
    pub name: &'static str,
    pub stage: Stage,
    pub applies_to: Vec<ActionKind>,
    pub enabled: bool,
    pub description: &'static str,
}

pub fn describe(stage: Stage, checks: &[Arc<dyn Check>], config: &HookConfig) -> Vec<CheckInfo> {
    checks
        .iter()
        .map(|c| CheckInfo {
            name: c.name(),
            stage,
            applies_to: ActionKind::all()
                .iter()
                .copied()
                .filter(|k| c.applies_to(*k))
                .collect(),
            enabled: config.is_enabled(c.name()),
            description: c.description(),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Template files that are expected to hold placeholder credentials.
pub(crate) fn is_placeholder_file(file_name: &str) -> bool {
    let lower = file_name.to_ascii_lowercase();
    [".example", ".sample", ".template"]
        .iter()
        .any(|suffix| lower.ends_with(suffix))
}

pub(crate) fn file_label(path: &str) -> &str {
    Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path)
}

pub(crate) fn human_bytes(n: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * KIB;
    if n >= MIB {
        format!("{:.1} MiB", n as f64 / MIB as f64)
    } else if n >= KIB {
        format!("{:.1} KiB", n as f64 / KIB as f64)
    } else {
        format!("{n} B")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ProcessRunner;

    #[test]
    fn registry_matches_name_tables() {
        let cfg = HookConfig::default();
        let pre: Vec<_> = pre_action_checks(&cfg).iter().map(|c| c.name()).collect();
        assert_eq!(pre, PRE_ACTION_CHECKS);
        let post: Vec<_> = post_action_checks(&cfg, Arc::new(ProcessRunner::new()))
            .iter()
            .map(|c| c.name())
            .collect();
        assert_eq!(post, POST_ACTION_CHECKS);
    }

    #[test]
    fn names_are_unique() {
        let mut names = all_check_names();
        let before = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), before);
    }

    #[test]
    fn placeholder_files() {
        for name in [".env.example", ".env.sample", ".env.template", "config.example", "Keys.SAMPLE"] {
            assert!(is_placeholder_file(name), "expected placeholder: {name}");
        }
        for name in [".env", ".env.local", "example.rs", "sample"] {
            assert!(!is_placeholder_file(name), "expected real file: {name}");
        }
    }

    #[test]
    fn describe_reports_applicability_and_enablement() {
        let mut cfg = HookConfig::default();
        cfg.set_enabled(branch_protection::NAME, false);
        let rows = describe(Stage::PreAction, &pre_action_checks(&cfg), &cfg);
        let bp = rows.iter().find(|r| r.name == branch_protection::NAME).unwrap();
        assert!(!bp.enabled);
        assert_eq!(bp.applies_to, vec![ActionKind::ShellExecute]);
        let cs = rows.iter().find(|r| r.name == content_size::NAME).unwrap();
        assert!(cs.enabled);
        assert_eq!(cs.applies_to.len(), 3);
    }

    #[test]
    fn human_bytes_units() {
        assert_eq!(human_bytes(12), "12 B");
        assert_eq!(human_bytes(2048), "2.0 KiB");
        assert_eq!(human_bytes(3 * 1024 * 1024), "3.0 MiB");
    }
}
