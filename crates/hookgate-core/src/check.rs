use crate::error::Result;
use crate::event::{ActionKind, Event};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// Which side of the host action a check runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    PreAction,
    PostAction,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::PreAction => "pre",
            Stage::PostAction => "post",
        }
    }

    /// Name recorded in audit records for a dispatch at this stage.
    pub fn dispatcher_name(self) -> &'static str {
        match self {
            Stage::PreAction => "pre_action_dispatch",
            Stage::PostAction => "post_action_dispatch",
        }
    }

    /// `hookEventName` used in the protocol response.
    pub fn host_event_name(self) -> &'static str {
        match self {
            Stage::PreAction => "PreToolUse",
            Stage::PostAction => "PostToolUse",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pre" | "pre_action" => Ok(Stage::PreAction),
            "post" | "post_action" => Ok(Stage::PostAction),
            other => Err(format!("unknown stage '{other}': expected pre or post")),
        }
    }
}

// ---------------------------------------------------------------------------
// Verdict / CheckResult
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    Warn,
    Block,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub name: String,
    pub verdict: Verdict,
    /// Required for `Block`; optional informational note on `Pass`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hints: Vec<String>,
}

impl CheckResult {
    pub fn pass(name: &str) -> Self {
        Self {
            name: name.to_string(),
            verdict: Verdict::Pass,
            message: None,
            hints: Vec::new(),
        }
    }

    /// A pass that still has something to say (e.g. markers found).
    pub fn note(name: &str, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::pass(name)
        }
    }

    pub fn warn(name: &str, message: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            verdict: Verdict::Warn,
            message: Some(message.into()),
            hints: Vec::new(),
        }
    }

    /// A `Block` always carries a non-empty message; an empty one is replaced
    /// with a generic reason naming the check.
    pub fn block(name: &str, message: impl Into<String>) -> Self {
        let mut message = message.into();
        if message.trim().is_empty() {
            message = format!("blocked by check '{name}'");
        }
        Self {
            name: name.to_string(),
            verdict: Verdict::Block,
            message: Some(message),
            hints: Vec::new(),
        }
    }

    pub fn with_hints<I, S>(mut self, hints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hints.extend(hints.into_iter().map(Into::into));
        self
    }

    pub fn is_pass(&self) -> bool {
        self.verdict == Verdict::Pass
    }

    /// `message` plus indented hints, as it appears in a decision reason.
    pub fn render(&self) -> String {
        let mut out = format!(
            "[{}] {}",
            self.name,
            self.message.as_deref().unwrap_or_default()
        );
        for hint in &self.hints {
            out.push_str("\n  - ");
            out.push_str(hint);
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Check
// ---------------------------------------------------------------------------

/// One independent policy evaluator.
///
/// Implementations must not mutate anything they can reach through `event`;
/// apart from read-only external tools they are pure. Returning `Err` (or
/// panicking) makes the dispatcher record the check as `Pass`.
pub trait Check: Send + Sync {
    fn name(&self) -> &'static str;

    fn applies_to(&self, kind: ActionKind) -> bool;

    fn evaluate(&self, event: &Event) -> Result<CheckResult>;

    fn description(&self) -> &'static str {
        ""
    }

    /// Wall-clock time this check needs. The dispatcher waits for the larger
    /// of this and the configured per-check timeout.
    fn time_budget(&self) -> Option<Duration> {
        None
    }

    /// Called once the dispatcher has stopped waiting for this check.
    fn cancel(&self) {}
}

/// Applicability helper for checks that look at file content or paths.
pub fn file_mutation(kind: ActionKind) -> bool {
    kind.is_file_mutation()
}

/// Applicability helper for checks that look at shell commands.
pub fn shell_only(kind: ActionKind) -> bool {
    kind == ActionKind::ShellExecute
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
