use crate::check::{shell_only, Check, CheckResult};
use crate::error::Result;
use crate::event::{ActionKind, Event};
use regex::Regex;
use std::sync::OnceLock;

pub const NAME: &str = "branch_protection";

pub const PROTECTED_BRANCHES: &[&str] = &["main", "master", "production", "prod", "release"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rule {
    ForcePush,
    PushProtected,
    HardReset,
    CommitOnProtected,
    DeleteProtected,
}

impl Rule {
    fn description(self) -> &'static str {
        match self {
            Rule::ForcePush => "Force push rewrites shared history",
            Rule::PushProtected => "Push to protected branch",
            Rule::HardReset => "git reset --hard discards uncommitted work",
            Rule::CommitOnProtected => "Commit on protected branch",
            Rule::DeleteProtected => "Deleting protected branch",
        }
    }

    fn hints(self) -> &'static [&'static str] {
        match self {
            Rule::HardReset => &[
                "Use `git stash` to set changes aside instead of a hard reset",
                "Use `git restore <file>` to discard changes to a single file",
            ],
            _ => &[
                "Create a feature branch: git checkout -b feature/your-feature",
                "Push it and open a pull request: git push origin feature/your-feature",
            ],
        }
    }
}

static RULES: OnceLock<Vec<(Regex, Rule)>> = OnceLock::new();

fn rules() -> &'static [(Regex, Rule)] {
    RULES.get_or_init(|| {
        let b = PROTECTED_BRANCHES.join("|");
        let end = r"(?:[\s;&|)]|$)";
        [
            (
                r"(?i)\bgit\s+push\b[^;&|]*\s(?:-f|--force|--force-with-lease)(?:[\s=]|$)".to_string(),
                Rule::ForcePush,
            ),
            (
                format!(r"(?i)\bgit\s+push\b[^;&|]*?[\s:+](?:refs/heads/)?({b}){end}"),
                Rule::PushProtected,
            ),
            (
                r"(?i)\bgit\s+reset\b[^;&|]*\s--hard\b".to_string(),
                Rule::HardReset,
            ),
            (
                format!(r"(?i)\bgit\s+(?:checkout|switch)\s+({b})\s*&&\s*git\s+commit\b"),
                Rule::CommitOnProtected,
            ),
            (
                format!(r"(?i)\bgit\s+branch\s+(?:\S+\s+)*?(?:-[a-zA-Z]*[dD][a-zA-Z]*|--delete)\s+(?:\S+\s+)*?({b}){end}"),
                Rule::DeleteProtected,
            ),
        ]
        .into_iter()
        .map(|(re, rule)| (Regex::new(&re).unwrap(), rule))
        .collect()
    })
}

/// First rule `command` violates, with the protected branch it names.
fn violation(command: &str) -> Option<(Rule, Option<String>)> {
    rules().iter().find_map(|(re, rule)| {
        re.captures(command).map(|caps| {
            let branch = caps.get(1).map(|m| m.as_str().to_ascii_lowercase());
            (*rule, branch)
        })
    })
}

pub struct BranchProtection;

impl Check for BranchProtection {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Blocks pushes to protected branches, force pushes and hard resets"
    }

    fn applies_to(&self, kind: ActionKind) -> bool {
        shell_only(kind)
    }

    fn evaluate(&self, event: &Event) -> Result<CheckResult> {
        let Some(command) = event.command() else {
            return Ok(CheckResult::pass(NAME));
        };
        let Some((rule, branch)) = violation(command) else {
            return Ok(CheckResult::pass(NAME));
        };
        let message = match branch {
            Some(b) => format!("Branch protection: {}: '{b}'", rule.description()),
            None => format!("Branch protection: {}", rule.description()),
        };
        Ok(CheckResult::block(NAME, message).with_hints(rule.hints().iter().copied()))
    }
}
