use crate::check::{file_mutation, Check, CheckResult};
use crate::error::Result;
use crate::event::{ActionKind, Event};
use std::path::{Component, Path};

pub const NAME: &str = "readonly_path";

const LOCKFILES: &[&str] = &[
    "Cargo.lock",
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "poetry.lock",
    "uv.lock",
    "Gemfile.lock",
    "composer.lock",
    "go.sum",
];

const VENDORED_DIRS: &[&str] = &["vendor", "node_modules", ".venv", "target"];

const GENERATED_SUFFIXES: &[&str] = &[".pb.go", "_pb2.py", ".min.js"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Lockfile,
    Vendored,
    Generated,
}

impl Kind {
    fn label(self) -> &'static str {
        match self {
            Kind::Lockfile => "a lockfile",
            Kind::Vendored => "inside a vendored or installed dependency tree",
            Kind::Generated => "a generated file",
        }
    }

    fn hint(self) -> &'static str {
        match self {
            Kind::Lockfile => "Change the manifest and let the package manager regenerate the lockfile",
            Kind::Vendored => "Change the dependency version instead of editing installed sources",
            Kind::Generated => "Edit the generator input and regenerate",
        }
    }
}

fn classify(rel: &Path) -> Option<Kind> {
    let name = rel.file_name()?.to_str()?;
    if LOCKFILES.contains(&name) {
        return Some(Kind::Lockfile);
    }

    let dirs: Vec<&str> = rel
        .parent()
        .into_iter()
        .flat_map(|p| p.components())
        .filter_map(|c| match c {
            Component::Normal(s) => s.to_str(),
            _ => None,
        })
        .collect();

    if dirs.iter().any(|d| VENDORED_DIRS.contains(d)) {
        return Some(Kind::Vendored);
    }
    if name.contains(".generated.")
        || GENERATED_SUFFIXES.iter().any(|s| name.ends_with(s))
        || dirs.contains(&"generated")
    {
        return Some(Kind::Generated);
    }
    None
}

pub struct ReadonlyPath;

impl Check for ReadonlyPath {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Blocks hand edits to lockfiles, vendored trees and generated files"
    }

    fn applies_to(&self, kind: ActionKind) -> bool {
        file_mutation(kind)
    }

    fn evaluate(&self, event: &Event) -> Result<CheckResult> {
        let Some(target) = event.resolved_path() else {
            return Ok(CheckResult::pass(NAME));
        };
        // Only directories below the working directory count, so a project
        // that itself lives under e.g. `target/` is not read-only everywhere.
        let cwd = crate::event::normalize(&event.working_directory);
        let rel = target.strip_prefix(&cwd).unwrap_or(target.as_path());

        match classify(rel) {
            None => Ok(CheckResult::pass(NAME)),
            Some(kind) => Ok(CheckResult::block(
                NAME,
                format!("{} is {} and should not be edited by hand", rel.display(), kind.label()),
            )
            .with_hints([kind.hint()])),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::Verdict;

    fn eval(path: &str, cwd: &str) -> CheckResult {
        ReadonlyPath.evaluate(&Event::write(path, "x", cwd)).unwrap()
    }

    #[test]
    fn lockfiles_blocked() {
        for p in ["Cargo.lock", "web/package-lock.json", "go.sum", "uv.lock"] {
            let r = eval(p, "/w");
            assert_eq!(r.verdict, Verdict::Block, "expected block: {p}");
            assert!(r.message.unwrap().contains("lockfile"));
        }
    }

    #[test]
    fn vendored_and_generated_blocked() {
        for p in [
            "node_modules/react/index.js",
            "vendor/github.com/x/y.go",
            ".venv/lib/site.py",
            "target/debug/build.rs",
            "api/service.pb.go",
            "proto/msg_pb2.py",
            "static/app.min.js",
            "src/schema.generated.ts",
            "src/generated/client.ts",
        ] {
            assert_eq!(eval(p, "/w").verdict, Verdict::Block, "expected block: {p}");
        }
    }

    #[test]
    fn ordinary_files_pass() {
        for p in ["src/main.rs", "Cargo.toml", "src/target.rs", "docs/vendor.md", "app.js"] {
            assert!(eval(p, "/w").is_pass(), "expected pass: {p}");
        }
    }

    #[test]
    fn working_directory_components_do_not_count() {
        assert!(eval("src/lib.rs", "/home/u/target/proj").is_pass());
        assert_eq!(
            eval("target/x.rs", "/home/u/target/proj").verdict,
            Verdict::Block
        );
    }
}
