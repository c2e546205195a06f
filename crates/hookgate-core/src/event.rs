//! Typed view of one host tool-use event.
//!
//! The host writes a JSON document on stdin:
//!
//! ```json
//! {
//!   "session_id": "abc",
//!   "transcript_path": "/home/u/.claude/projects/x.jsonl",
//!   "cwd": "/work/repo",
//!   "hook_event_name": "PreToolUse",
//!   "tool_name": "Write",
//!   "tool_input": { "file_path": "src/main.rs", "content": "..." },
//!   "stop_hook_active": false
//! }
//! ```
//!
//! [`Event::from_json`] turns that into an immutable [`Event`]. Anything that
//! does not parse is a [`HookError::MalformedEvent`]; the dispatcher treats
//! that as "allow, run nothing".

use crate::error::{HookError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::{Component, Path, PathBuf};

// ---------------------------------------------------------------------------
// ActionKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    ShellExecute,
    FileWrite,
    FileEdit,
    FileMultiEdit,
    Other,
}

impl ActionKind {
    pub fn all() -> &'static [ActionKind] {
        &[
            ActionKind::ShellExecute,
            ActionKind::FileWrite,
            ActionKind::FileEdit,
            ActionKind::FileMultiEdit,
            ActionKind::Other,
        ]
    }

    /// Map the host's `tool_name` onto an action kind.
    pub fn from_tool_name(tool_name: &str) -> Self {
        match tool_name {
            "Bash" => ActionKind::ShellExecute,
            "Write" => ActionKind::FileWrite,
            "Edit" => ActionKind::FileEdit,
            "MultiEdit" => ActionKind::FileMultiEdit,
            _ => ActionKind::Other,
        }
    }

    pub fn is_file_mutation(self) -> bool {
        matches!(
            self,
            ActionKind::FileWrite | ActionKind::FileEdit | ActionKind::FileMultiEdit
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::ShellExecute => "shell_execute",
            ActionKind::FileWrite => "file_write",
            ActionKind::FileEdit => "file_edit",
            ActionKind::FileMultiEdit => "file_multi_edit",
            ActionKind::Other => "other",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditPair {
    #[serde(default)]
    pub old_string: String,
    #[serde(default)]
    pub new_string: String,
}

/// Kind-specific part of an event.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Shell {
        command: String,
    },
    Write {
        file_path: String,
        content: String,
    },
    Edit {
        file_path: String,
        edit: EditPair,
    },
    MultiEdit {
        file_path: String,
        edits: Vec<EditPair>,
    },
    Other {
        tool_input: Value,
    },
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct HookInput {
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    transcript_path: Option<String>,
    #[serde(default)]
    cwd: Option<String>,
    tool_name: String,
    #[serde(default)]
    tool_input: Value,
    #[serde(default)]
    stop_hook_active: bool,
}

#[derive(Debug, Deserialize)]
struct ShellInput {
    command: String,
}

#[derive(Debug, Deserialize)]
struct WriteInput {
    file_path: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct EditInput {
    file_path: String,
    #[serde(flatten)]
    edit: EditPair,
}

#[derive(Debug, Deserialize)]
struct MultiEditInput {
    file_path: String,
    #[serde(default)]
    edits: Vec<EditPair>,
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// One proposed or completed host action. Read-only once constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub tool_name: String,
    pub action_kind: ActionKind,
    pub payload: Payload,
    pub working_directory: PathBuf,
    /// Set when this event came out of a previous hook's own remediation.
    pub recursion_guard: bool,
    pub session_id: Option<String>,
    pub transcript_ref: Option<String>,
}

impl Event {
    pub fn from_json(input: &str) -> Result<Self> {
        if input.trim().is_empty() {
            return Err(HookError::MalformedEvent("empty input".into()));
        }
        let value: Value = serde_json::from_str(input)
            .map_err(|e| HookError::MalformedEvent(format!("invalid JSON: {e}")))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        let input: HookInput = serde_json::from_value(value)
            .map_err(|e| HookError::MalformedEvent(e.to_string()))?;

        let action_kind = ActionKind::from_tool_name(&input.tool_name);
        let payload = parse_payload(action_kind, input.tool_input)?;

        let working_directory = match input.cwd.filter(|c| !c.is_empty()) {
            Some(cwd) => PathBuf::from(cwd),
            None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        };

        Ok(Self {
            tool_name: input.tool_name,
            action_kind,
            payload,
            working_directory,
            recursion_guard: input.stop_hook_active,
            session_id: input.session_id.filter(|s| !s.is_empty()),
            transcript_ref: input.transcript_path.filter(|s| !s.is_empty()),
        })
    }

    // -----------------------------------------------------------------------
    // Constructors used by tests and tooling
    // -----------------------------------------------------------------------

    fn with_payload(tool_name: &str, payload: Payload, cwd: impl Into<PathBuf>) -> Self {
        Self {
            tool_name: tool_name.to_string(),
            action_kind: ActionKind::from_tool_name(tool_name),
            payload,
            working_directory: cwd.into(),
            recursion_guard: false,
            session_id: None,
            transcript_ref: None,
        }
    }

    pub fn shell(command: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self::with_payload(
            "Bash",
            Payload::Shell {
                command: command.into(),
            },
            cwd,
        )
    }

    pub fn write(
        file_path: impl Into<String>,
        content: impl Into<String>,
        cwd: impl Into<PathBuf>,
    ) -> Self {
        Self::with_payload(
            "Write",
            Payload::Write {
                file_path: file_path.into(),
                content: content.into(),
            },
            cwd,
        )
    }

    pub fn edit(
        file_path: impl Into<String>,
        old_string: impl Into<String>,
        new_string: impl Into<String>,
        cwd: impl Into<PathBuf>,
    ) -> Self {
        Self::with_payload(
            "Edit",
            Payload::Edit {
                file_path: file_path.into(),
                edit: EditPair {
                    old_string: old_string.into(),
                    new_string: new_string.into(),
                },
            },
            cwd,
        )
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn command(&self) -> Option<&str> {
        match &self.payload {
            Payload::Shell { command } => Some(command),
            _ => None,
        }
    }

    pub fn file_path(&self) -> Option<&str> {
        match &self.payload {
            Payload::Write { file_path, .. }
            | Payload::Edit { file_path, .. }
            | Payload::MultiEdit { file_path, .. } => Some(file_path),
            _ => None,
        }
    }

    /// File name component of the target path, if any.
    pub fn file_name(&self) -> Option<&str> {
        self.file_path()
            .and_then(|p| Path::new(p).file_name())
            .and_then(|n| n.to_str())
    }

    /// Lowercased extension of the target path, without the dot.
    pub fn extension(&self) -> Option<String> {
        self.file_path()
            .and_then(|p| Path::new(p).extension())
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
    }

    /// Text the action introduces: full content for a write, the replacement
    /// fragments for edits.
    pub fn new_text(&self) -> Vec<&str> {
        match &self.payload {
            Payload::Write { content, .. } => vec![content.as_str()],
            Payload::Edit { edit, .. } => vec![edit.new_string.as_str()],
            Payload::MultiEdit { edits, .. } => {
                edits.iter().map(|e| e.new_string.as_str()).collect()
            }
            _ => Vec::new(),
        }
    }

    /// Text the action replaces. Empty for writes (the old file is not part of
    /// the event).
    pub fn old_text(&self) -> Vec<&str> {
        match &self.payload {
            Payload::Edit { edit, .. } => vec![edit.old_string.as_str()],
            Payload::MultiEdit { edits, .. } => {
                edits.iter().map(|e| e.old_string.as_str()).collect()
            }
            _ => Vec::new(),
        }
    }

    pub fn new_text_len(&self) -> usize {
        self.new_text().iter().map(|t| t.len()).sum()
    }

    /// Target path joined onto the working directory and normalised lexically.
    pub fn resolved_path(&self) -> Option<PathBuf> {
        let raw = Path::new(self.file_path()?);
        let joined = if raw.is_absolute() {
            raw.to_path_buf()
        } else {
            self.working_directory.join(raw)
        };
        Some(normalize(&joined))
    }
}

fn parse_payload(kind: ActionKind, tool_input: Value) -> Result<Payload> {
    let malformed = |e: serde_json::Error| HookError::MalformedEvent(format!("tool_input: {e}"));
    let payload = match kind {
        ActionKind::ShellExecute => {
            let i: ShellInput = serde_json::from_value(tool_input).map_err(malformed)?;
            Payload::Shell { command: i.command }
        }
        ActionKind::FileWrite => {
            let i: WriteInput = serde_json::from_value(tool_input).map_err(malformed)?;
            Payload::Write {
                file_path: non_empty_path(i.file_path)?,
                content: i.content,
            }
        }
        ActionKind::FileEdit => {
            let i: EditInput = serde_json::from_value(tool_input).map_err(malformed)?;
            Payload::Edit {
                file_path: non_empty_path(i.file_path)?,
                edit: i.edit,
            }
        }
        ActionKind::FileMultiEdit => {
            let i: MultiEditInput = serde_json::from_value(tool_input).map_err(malformed)?;
            Payload::MultiEdit {
                file_path: non_empty_path(i.file_path)?,
                edits: i.edits,
            }
        }
        ActionKind::Other => Payload::Other { tool_input },
    };
    Ok(payload)
}

fn non_empty_path(p: String) -> Result<String> {
    if p.trim().is_empty() {
        return Err(HookError::MalformedEvent("tool_input.file_path is empty".into()));
    }
    Ok(p)
}

/// Resolve `.` and `..` without touching the filesystem; the target of a
/// write usually does not exist yet.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bash_event() {
        let json = r#"{
            "session_id": "s1",
            "cwd": "/work/repo",
            "tool_name": "Bash",
            "tool_input": {"command": "ls -la"},
            "stop_hook_active": false
        }"#;
        let ev = Event::from_json(json).unwrap();
        assert_eq!(ev.action_kind, ActionKind::ShellExecute);
        assert_eq!(ev.command(), Some("ls -la"));
        assert_eq!(ev.working_directory, PathBuf::from("/work/repo"));
        assert_eq!(ev.session_id.as_deref(), Some("s1"));
        assert!(!ev.recursion_guard);
    }

    #[test]
    fn parses_multi_edit_event() {
        let json = r#"{
            "cwd": "/w",
            "tool_name": "MultiEdit",
            "tool_input": {
                "file_path": "src/lib.rs",
                "edits": [
                    {"old_string": "a", "new_string": "bb"},
                    {"old_string": "c", "new_string": "ddd", "replace_all": true}
                ]
            }
        }"#;
        let ev = Event::from_json(json).unwrap();
        assert_eq!(ev.action_kind, ActionKind::FileMultiEdit);
        assert_eq!(ev.new_text(), vec!["bb", "ddd"]);
        assert_eq!(ev.old_text(), vec!["a", "c"]);
        assert_eq!(ev.new_text_len(), 5);
        assert_eq!(ev.extension().as_deref(), Some("rs"));
    }

    #[test]
    fn unknown_tool_is_other() {
        let json = r#"{"tool_name": "WebFetch", "tool_input": {"url": "https://x"}}"#;
        let ev = Event::from_json(json).unwrap();
        assert_eq!(ev.action_kind, ActionKind::Other);
        assert!(ev.file_path().is_none());
        assert!(ev.new_text().is_empty());
    }

    #[test]
    fn stop_hook_active_sets_recursion_guard() {
        let json = r#"{"tool_name": "Bash", "tool_input": {"command": "x"}, "stop_hook_active": true}"#;
        assert!(Event::from_json(json).unwrap().recursion_guard);
    }

    #[test]
    fn malformed_inputs_are_rejected() {
        for input in [
            "",
            "   ",
            "not json",
            "[]",
            r#"{"tool_input": {}}"#,
            r#"{"tool_name": "Bash", "tool_input": {}}"#,
            r#"{"tool_name": "Write", "tool_input": {"file_path": "", "content": "x"}}"#,
            r#"{"tool_name": "Bash", "tool_input": {"command": "x"}, "stop_hook_active": "yes"}"#,
        ] {
            assert!(
                matches!(Event::from_json(input), Err(HookError::MalformedEvent(_))),
                "expected malformed: {input}"
            );
        }
    }

    #[test]
    fn resolved_path_joins_and_normalizes() {
        let ev = Event::write("src/../lib/./x.rs", "", "/work/repo");
        assert_eq!(ev.resolved_path(), Some(PathBuf::from("/work/repo/lib/x.rs")));

        let ev = Event::write("../../etc/passwd", "", "/work/repo");
        assert_eq!(ev.resolved_path(), Some(PathBuf::from("/etc/passwd")));

        let ev = Event::write("/abs/file.txt", "", "/work/repo");
        assert_eq!(ev.resolved_path(), Some(PathBuf::from("/abs/file.txt")));
    }

    #[test]
    fn action_kind_mapping() {
        assert_eq!(ActionKind::from_tool_name("Bash"), ActionKind::ShellExecute);
        assert_eq!(ActionKind::from_tool_name("Edit"), ActionKind::FileEdit);
        assert_eq!(ActionKind::from_tool_name("bash"), ActionKind::Other);
        assert!(ActionKind::FileMultiEdit.is_file_mutation());
        assert!(!ActionKind::ShellExecute.is_file_mutation());
        assert_eq!(ActionKind::FileMultiEdit.to_string(), "file_multi_edit");
    }
}
