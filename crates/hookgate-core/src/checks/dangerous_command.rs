use crate::check::{shell_only, Check, CheckResult};
use crate::error::Result;
use crate::event::{ActionKind, Event};
use regex::Regex;
use std::sync::OnceLock;

pub const NAME: &str = "dangerous_command";

/// `(pattern, description)`. The description is what a denial reports.
const PATTERNS: &[(&str, &str)] = &[
    (
        r"\brm\s+(?:-{1,2}[a-zA-Z-]+\s+)*?(?:-[a-zA-Z]*[rR][a-zA-Z]*|--recursive)\s+(?:-{1,2}[a-zA-Z-]+\s+)*(?:/\*?|~/?|\$HOME/?|\*)(?:[\s;&|]|$)",
        "Recursive delete of the filesystem root, home directory or a bare wildcard",
    ),
    (r"\bmkfs(?:\.\w+)?\b", "Filesystem format (mkfs)"),
    (
        r"\bdd\b[^;&|]*\bof=/dev/(?:sd|hd|nvme|disk|mmcblk|xvd)",
        "Raw dd write to a block device",
    ),
    (
        r":\(\)\s*\{\s*:\s*\|\s*:\s*&\s*\}\s*;\s*:",
        "Fork bomb",
    ),
    (
        r"\bchmod\s+(?:-[a-zA-Z]*R[a-zA-Z]*|--recursive)\s+0?777\s+/(?:[\s;&|]|$)",
        "Recursive chmod 777 on the filesystem root",
    ),
    (
        r"\b(?:curl|wget)\b[^|;&]*\|\s*(?:sudo\s+)?(?:ba|z|da)?sh\b",
        "Piping a downloaded script straight into a shell",
    ),
    (
        r">\s*/dev/(?:sd|hd|nvme|disk|mmcblk|xvd)",
        "Redirecting output onto a block device",
    ),
    (
        r"(?:^|[;&|(])\s*(?:sudo\s+)?(?:shutdown|reboot|halt|poweroff)(?:[\s;&|)]|$)",
        "System shutdown or reboot",
    ),
];

static TABLE: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();

fn table() -> &'static [(Regex, &'static str)] {
    TABLE.get_or_init(|| {
        PATTERNS
            .iter()
            .map(|(re, desc)| (Regex::new(re).unwrap(), *desc))
            .collect()
    })
}

/// Descriptions of every pattern `command` matches, in table order.
pub fn matches(command: &str) -> Vec<&'static str> {
    table()
        .iter()
        .filter(|(re, _)| re.is_match(command))
        .map(|(_, desc)| *desc)
        .collect()
}

pub struct DangerousCommand;

impl Check for DangerousCommand {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Blocks destructive shell commands (rm -rf /, mkfs, dd to devices, fork bombs)"
    }

    fn applies_to(&self, kind: ActionKind) -> bool {
        shell_only(kind)
    }

    fn evaluate(&self, event: &Event) -> Result<CheckResult> {
        let Some(command) = event.command() else {
            return Ok(CheckResult::pass(NAME));
        };
        let hits = matches(command);
        if hits.is_empty() {
            return Ok(CheckResult::pass(NAME));
        }
        Ok(CheckResult::block(NAME, format!("Dangerous command: {}", hits.join("; ")))
            .with_hints([
                "Scope the command to an explicit path inside the project",
                "Run it yourself outside the agent session if it is really intended",
            ]))
    }
}
