use super::file_label;
use crate::check::{file_mutation, Check, CheckResult};
use crate::error::Result;
use crate::event::{ActionKind, Event, Payload};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

pub const NAME: &str = "todo_scan";

const CODE_EXTENSIONS: &[&str] = &[
    "py", "js", "ts", "tsx", "jsx", "go", "rs", "java", "c", "cpp", "h", "md",
];

/// Markers listed as hints, at most.
const MAX_LISTED: usize = 10;

static MARKER_RE: OnceLock<Regex> = OnceLock::new();

fn marker_re() -> &'static Regex {
    MARKER_RE.get_or_init(|| {
        Regex::new(r"(?i)(?:#|//|/\*|<!--)\s*(TODO|FIXME|HACK|XXX|BUG|NOTE)[\s:]+(.+?)\s*(?:\*/|-->|$)")
            .unwrap()
    })
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Marker {
    pub kind: String,
    pub text: String,
}

impl std::fmt::Display for Marker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.text)
    }
}

/// Comment markers in `content`, one per line at most, in line order.
pub fn extract_markers(content: &str) -> Vec<Marker> {
    content
        .lines()
        .filter_map(|line| marker_re().captures(line))
        .map(|caps| Marker {
            kind: caps[1].to_ascii_uppercase(),
            text: caps[2].trim().to_string(),
        })
        .collect()
}

/// Markers in `after` but not `before`, counting duplicates.
fn difference(after: &[Marker], before: &[Marker]) -> Vec<Marker> {
    let mut remaining: BTreeMap<&Marker, usize> = BTreeMap::new();
    for m in before {
        *remaining.entry(m).or_default() += 1;
    }
    after
        .iter()
        .filter(|m| match remaining.get_mut(m) {
            Some(n) if *n > 0 => {
                *n -= 1;
                false
            }
            _ => true,
        })
        .cloned()
        .collect()
}

fn count_by_kind(markers: &[Marker]) -> String {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for m in markers {
        *counts.entry(m.kind.as_str()).or_default() += 1;
    }
    counts
        .iter()
        .map(|(k, n)| format!("{k}({n})"))
        .collect::<Vec<_>>()
        .join(", ")
}

pub struct TodoScan;

impl Check for TodoScan {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Reports TODO/FIXME-style markers added or resolved (informational)"
    }

    fn applies_to(&self, kind: ActionKind) -> bool {
        file_mutation(kind)
    }

    fn evaluate(&self, event: &Event) -> Result<CheckResult> {
        let (Some(path), Some(ext)) = (event.file_path(), event.extension()) else {
            return Ok(CheckResult::pass(NAME));
        };
        if !CODE_EXTENSIONS.contains(&ext.as_str()) {
            return Ok(CheckResult::pass(NAME));
        }
        let label = file_label(path);

        if let Payload::Write { content, .. } = &event.payload {
            let markers = extract_markers(content);
            if markers.is_empty() {
                return Ok(CheckResult::pass(NAME));
            }
            return Ok(CheckResult::note(
                NAME,
                format!(
                    "{} marker(s) in {label}: {}",
                    markers.len(),
                    count_by_kind(&markers)
                ),
            )
            .with_hints(markers.iter().take(MAX_LISTED).map(|m| m.to_string())));
        }

        let before: Vec<Marker> = event.old_text().iter().flat_map(|t| extract_markers(t)).collect();
        let after: Vec<Marker> = event.new_text().iter().flat_map(|t| extract_markers(t)).collect();
        let added = difference(&after, &before);
        let resolved = difference(&before, &after);
        if added.is_empty() && resolved.is_empty() {
            return Ok(CheckResult::pass(NAME));
        }

        let hints = added
            .iter()
            .map(|m| format!("added {m}"))
            .chain(resolved.iter().map(|m| format!("resolved {m}")))
            .take(MAX_LISTED);
        Ok(CheckResult::note(
            NAME,
            format!(
                "{label}: {} marker(s) added, {} resolved",
                added.len(),
                resolved.len()
            ),
        )
        .with_hints(hints))
    }
}
