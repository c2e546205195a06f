use super::file_label;
use crate::check::{file_mutation, Check, CheckResult};
use crate::error::Result;
use crate::event::{ActionKind, Event};
use regex::Regex;
use std::sync::OnceLock;

pub const NAME: &str = "code_smells";

const JS_EXTENSIONS: &[&str] = &["js", "jsx", "ts", "tsx"];
const TS_EXTENSIONS: &[&str] = &["ts", "tsx"];

const SECURITY_SUBSTRINGS: &[(&str, &str)] = &[
    ("eval(", "Use of eval() - potential code injection"),
    ("innerHTML", "Use of innerHTML - potential XSS"),
    ("document.write", "Use of document.write - potential XSS"),
    ("dangerouslySetInnerHTML", "Use of dangerouslySetInnerHTML - potential XSS"),
    ("child_process.exec", "Use of exec - potential command injection"),
    ("new Function(", "Use of Function constructor - potential code injection"),
    ("__proto__", "Use of __proto__ - potential prototype pollution"),
];

const MAX_ANY_LINES: usize = 5;

static ANY_RE: OnceLock<Regex> = OnceLock::new();
static ANY_ALLOWED_RE: OnceLock<Regex> = OnceLock::new();

fn any_re() -> &'static Regex {
    ANY_RE.get_or_init(|| {
        Regex::new(r":\s*any\b|\bas\s+any\b|<any>|<any,|,\s*any>").unwrap()
    })
}

fn any_allowed_re() -> &'static Regex {
    ANY_ALLOWED_RE.get_or_init(|| Regex::new(r"expect\.any\(|\.any\(\)").unwrap())
}

pub fn security_issues(text: &str) -> Vec<&'static str> {
    SECURITY_SUBSTRINGS
        .iter()
        .filter(|(needle, _)| text.contains(needle))
        .map(|(_, desc)| *desc)
        .collect()
}

/// `(line number, trimmed line)` for each line with an explicit `any` type.
pub fn any_annotations(text: &str) -> Vec<(usize, String)> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| any_re().is_match(line) && !any_allowed_re().is_match(line))
        .map(|(i, line)| (i + 1, line.trim().to_string()))
        .collect()
}

pub struct CodeSmells;

impl Check for CodeSmells {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Flags risky JS/TS APIs and explicit `any` types"
    }

    fn applies_to(&self, kind: ActionKind) -> bool {
        file_mutation(kind)
    }

    fn evaluate(&self, event: &Event) -> Result<CheckResult> {
        let (Some(path), Some(ext)) = (event.file_path(), event.extension()) else {
            return Ok(CheckResult::pass(NAME));
        };
        if !JS_EXTENSIONS.contains(&ext.as_str()) {
            return Ok(CheckResult::pass(NAME));
        }
        let is_ts = TS_EXTENSIONS.contains(&ext.as_str());

        let mut hints: Vec<String> = Vec::new();
        let mut any_count = 0;
        for text in event.new_text() {
            for issue in security_issues(text) {
                if !hints.iter().any(|h| h == issue) {
                    hints.push(issue.to_string());
                }
            }
            if is_ts {
                let lines = any_annotations(text);
                any_count += lines.len();
                hints.extend(
                    lines
                        .into_iter()
                        .take(MAX_ANY_LINES)
                        .map(|(n, line)| format!("line {n}: `any` type: {line}")),
                );
            }
        }
        if hints.is_empty() {
            return Ok(CheckResult::pass(NAME));
        }
        if any_count > 0 {
            hints.push("Replace 'any' with 'unknown' or a concrete type".to_string());
        }

        Ok(CheckResult::warn(
            NAME,
            format!("Code smells in {}", file_label(path)),
        )
        .with_hints(hints))
    }
}
