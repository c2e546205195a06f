use super::is_placeholder_file;
use crate::check::{file_mutation, Check, CheckResult};
use crate::error::Result;
use crate::event::{ActionKind, Event};
use regex::Regex;
use std::sync::OnceLock;

pub const NAME: &str = "file_protection";

/// Matched against the file name, or as a trailing `/<entry>` of the path.
const PROTECTED_FILES: &[&str] = &[
    ".env",
    ".env.local",
    ".env.production",
    ".env.prod",
    "credentials.json",
    "service-account.json",
    "secrets.json",
    "secrets.yaml",
    "secrets.yml",
    ".npmrc",
    ".pypirc",
    ".netrc",
    ".docker/config.json",
    "id_rsa",
    "id_ed25519",
    "id_ecdsa",
    ".ssh/config",
];

/// Matched case-insensitively against the whole file name.
const PROTECTED_PATTERNS: &[&str] = &[
    r".*\.pem",
    r".*\.key",
    r".*\.p12",
    r".*\.pfx",
    r".*_rsa",
    r".*_ed25519",
    r".*_ecdsa",
    r".*credentials.*\.json",
    r".*secrets.*\.(?:json|yaml|yml)",
    r".*service[-_]?account.*\.json",
    r"\.env\.[a-z]+",
];

const PROTECTED_PATH_PARTS: &[&str] = &[
    "/prod/",
    "/production/",
    "/live/",
    "/.aws/",
    "/.ssh/",
    "/.gnupg/",
    "/.kube/",
];

static PATTERNS: OnceLock<Vec<(&'static str, Regex)>> = OnceLock::new();

fn patterns() -> &'static [(&'static str, Regex)] {
    PATTERNS.get_or_init(|| {
        PROTECTED_PATTERNS
            .iter()
            .map(|p| (*p, Regex::new(&format!("(?i)^(?:{p})$")).unwrap()))
            .collect()
    })
}

/// Why `file_path` is protected, if it is.
pub fn protection_reason(file_path: &str) -> Option<String> {
    let path = file_path.replace('\\', "/");
    let file_name = path.rsplit('/').next().unwrap_or(&path);
    if is_placeholder_file(file_name) {
        return None;
    }

    if let Some(hit) = PROTECTED_FILES
        .iter()
        .find(|p| file_name == **p || path.ends_with(&format!("/{p}")))
    {
        return Some(format!("Protected file: {hit}"));
    }

    if let Some((pattern, _)) = patterns().iter().find(|(_, re)| re.is_match(file_name)) {
        return Some(format!("Matches protected pattern: {pattern}"));
    }

    let rooted = if path.starts_with('/') {
        path.clone()
    } else {
        format!("/{path}")
    };
    PROTECTED_PATH_PARTS
        .iter()
        .find(|part| rooted.contains(**part))
        .map(|part| format!("Protected path contains: {part}"))
}

pub struct FileProtection;

impl Check for FileProtection {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Blocks edits to env files, credentials, keys and production config paths"
    }

    fn applies_to(&self, kind: ActionKind) -> bool {
        file_mutation(kind)
    }

    fn evaluate(&self, event: &Event) -> Result<CheckResult> {
        let Some(path) = event.file_path() else {
            return Ok(CheckResult::pass(NAME));
        };
        match protection_reason(path) {
            None => Ok(CheckResult::pass(NAME)),
            Some(reason) => Ok(CheckResult::block(
                NAME,
                format!("Cannot modify protected file {path}: {reason}"),
            )
            .with_hints([
                "Edit this file manually if changes are needed",
                "Use environment variables for configuration",
                "Consider using a secrets manager",
            ])),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::Verdict;

    #[test]
    fn exact_names_are_protected() {
        for p in [".env", "app/.env.local", "credentials.json", "/home/u/.ssh/config", "id_rsa"] {
            assert!(protection_reason(p).is_some(), "expected protected: {p}");
        }
        assert_eq!(
            protection_reason(".env").as_deref(),
            Some("Protected file: .env")
        );
    }

    #[test]
    fn name_patterns_are_protected() {
        for p in ["certs/server.pem", "tls.KEY", "deploy_rsa", "aws-credentials-prod.json", ".env.staging"] {
            assert!(protection_reason(p).is_some(), "expected protected: {p}");
        }
    }

    #[test]
    fn path_fragments_are_protected() {
        for p in ["config/production/app.yaml", "production/app.yaml", "/home/u/.aws/config"] {
            assert!(protection_reason(p).is_some(), "expected protected: {p}");
        }
    }

    #[test]
    fn placeholders_and_ordinary_files_pass() {
        for p in [".env.example", ".env.sample", "src/main.rs", "docs/keys.md", "src/production_plan.rs"] {
            assert!(protection_reason(p).is_none(), "expected allowed: {p}");
        }
    }

    #[test]
    fn block_carries_three_hints() {
        let r = FileProtection
            .evaluate(&Event::write(".env", "A=1", "/w"))
            .unwrap();
        assert_eq!(r.verdict, Verdict::Block);
        assert_eq!(r.hints.len(), 3);
    }
}
