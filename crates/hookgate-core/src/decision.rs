//! Aggregation of check results and the protocol document written to stdout.

use crate::check::{CheckResult, Stage, Verdict};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Every reached decision, Deny included.
pub const EXIT_OK: i32 = 0;
/// The pipeline could not emit a response at all.
pub const EXIT_PIPELINE_FAULT: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Allow,
    Deny,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Allow => "allow",
            Outcome::Deny => "deny",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub outcome: Outcome,
    /// Block messages on Deny, otherwise advisory text (may be empty).
    pub reason: String,
}

impl Decision {
    pub fn allow() -> Self {
        Self {
            outcome: Outcome::Allow,
            reason: String::new(),
        }
    }

    pub fn is_deny(&self) -> bool {
        self.outcome == Outcome::Deny
    }

    pub fn first_reason_line(&self) -> &str {
        self.reason.lines().next().unwrap_or_default()
    }

    /// Pre-action aggregation. Results must already be in registration order.
    pub fn aggregate_pre(results: &[CheckResult]) -> Self {
        let blocks = render_all(results, |r| r.verdict == Verdict::Block);
        if !blocks.is_empty() {
            return Self {
                outcome: Outcome::Deny,
                reason: blocks.join("\n"),
            };
        }
        Self {
            outcome: Outcome::Allow,
            reason: render_all(results, |r| r.verdict == Verdict::Warn).join("\n"),
        }
    }

    /// Post-action aggregation: never Deny. Blocks become flagged advisories,
    /// warnings and informational notes follow in registration order.
    pub fn aggregate_post(results: &[CheckResult]) -> Self {
        let lines: Vec<String> = results
            .iter()
            .filter(|r| r.message.is_some())
            .map(|r| match r.verdict {
                Verdict::Block => format!("MUST FIX (change already applied): {}", r.render()),
                Verdict::Warn => r.render(),
                Verdict::Pass => format!("note: {}", r.render()),
            })
            .collect();
        Self {
            outcome: Outcome::Allow,
            reason: lines.join("\n"),
        }
    }

    pub fn aggregate(stage: Stage, results: &[CheckResult]) -> Self {
        match stage {
            Stage::PreAction => Self::aggregate_pre(results),
            Stage::PostAction => Self::aggregate_post(results),
        }
    }
}

fn render_all(results: &[CheckResult], keep: impl Fn(&CheckResult) -> bool) -> Vec<String> {
    results.iter().filter(|r| keep(*r)).map(CheckResult::render).collect()
}

// ---------------------------------------------------------------------------
// Protocol response
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HookSpecificOutput {
    pub hook_event_name: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission_decision: Option<Outcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission_decision_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_context: Option<String>,
}

/// The JSON document written to stdout. An empty object means "no opinion":
/// the host's own permission flow proceeds unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HookResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hook_specific_output: Option<HookSpecificOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_message: Option<String>,
}

impl HookResponse {
    pub fn render(stage: Stage, decision: &Decision) -> Self {
        let reason = (!decision.reason.is_empty()).then(|| decision.reason.clone());
        match (stage, decision.outcome) {
            (Stage::PreAction, Outcome::Deny) => Self {
                hook_specific_output: Some(HookSpecificOutput {
                    hook_event_name: stage.host_event_name(),
                    permission_decision: Some(Outcome::Deny),
                    permission_decision_reason: reason,
                    additional_context: None,
                }),
                system_message: None,
            },
            (Stage::PreAction, Outcome::Allow) => Self {
                hook_specific_output: None,
                system_message: reason,
            },
            (Stage::PostAction, _) => Self {
                hook_specific_output: reason.as_ref().map(|r| HookSpecificOutput {
                    hook_event_name: stage.host_event_name(),
                    permission_decision: None,
                    permission_decision_reason: None,
                    additional_context: Some(r.clone()),
                }),
                system_message: reason,
            },
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}
