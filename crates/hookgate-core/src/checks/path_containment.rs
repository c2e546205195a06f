use crate::check::{file_mutation, Check, CheckResult};
use crate::error::Result;
use crate::event::{normalize, ActionKind, Event};
use std::path::{Path, PathBuf};

pub const NAME: &str = "path_containment";

/// Resolve symlinks in the longest prefix of `path` that exists on disk and
/// re-attach the rest. `path` must already be lexically normalized.
fn resolve_existing(path: &Path) -> PathBuf {
    for ancestor in path.ancestors() {
        if let Ok(real) = ancestor.canonicalize() {
            return match path.strip_prefix(ancestor) {
                Ok(rest) if !rest.as_os_str().is_empty() => real.join(rest),
                _ => real,
            };
        }
    }
    path.to_path_buf()
}

/// Blocks file actions whose target lies outside the working directory and
/// the configured extra roots. Both sides are compared after resolving
/// symlinks in their existing prefix, so a link inside the project that
/// points elsewhere does not count as inside.
pub struct PathContainment {
    extra_roots: Vec<PathBuf>,
}

impl PathContainment {
    pub fn new(extra_roots: Vec<PathBuf>) -> Self {
        Self {
            extra_roots: extra_roots.iter().map(|r| normalize(r)).collect(),
        }
    }
}

impl Check for PathContainment {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Blocks file actions that resolve outside the working directory"
    }

    fn applies_to(&self, kind: ActionKind) -> bool {
        file_mutation(kind)
    }

    fn evaluate(&self, event: &Event) -> Result<CheckResult> {
        let Some(target) = event.resolved_path() else {
            return Ok(CheckResult::pass(NAME));
        };
        let cwd = normalize(&event.working_directory);
        let real_target = resolve_existing(&target);

        let contained = std::iter::once(&cwd)
            .chain(self.extra_roots.iter())
            .any(|root| real_target.starts_with(resolve_existing(root)));
        if contained {
            return Ok(CheckResult::pass(NAME));
        }

        Ok(CheckResult::block(
            NAME,
            format!(
                "{} resolves outside the working directory {}",
                target.display(),
                cwd.display()
            ),
        )
        .with_hints([
            "Keep file changes inside the project directory",
            "Add the directory to paths.extra_allowed_roots in .claude/hookgate.yaml if access is intended",
        ]))
    }
}
