use super::{file_label, human_bytes};
use crate::check::{file_mutation, Check, CheckResult};
use crate::config::Limits;
use crate::error::Result;
use crate::event::{ActionKind, Event};

pub const NAME: &str = "content_size";

pub struct ContentSize {
    pub warn_bytes: u64,
    pub block_bytes: u64,
}

impl ContentSize {
    pub fn from_limits(limits: &Limits) -> Self {
        Self {
            warn_bytes: limits.content_warn_bytes,
            block_bytes: limits.content_block_bytes,
        }
    }
}

impl Check for ContentSize {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Warns on large writes and blocks oversized ones"
    }

    fn applies_to(&self, kind: ActionKind) -> bool {
        file_mutation(kind)
    }

    fn evaluate(&self, event: &Event) -> Result<CheckResult> {
        let size = event.new_text_len() as u64;
        let label = event.file_path().map(file_label).unwrap_or("content");

        if size >= self.block_bytes {
            return Ok(CheckResult::block(
                NAME,
                format!(
                    "{label} is {} (limit {})",
                    human_bytes(size),
                    human_bytes(self.block_bytes)
                ),
            )
            .with_hints([
                "Split the content into smaller files",
                "Generate large artifacts with a script instead of writing them inline",
            ]));
        }
        if size >= self.warn_bytes {
            return Ok(CheckResult::warn(
                NAME,
                format!(
                    "{label} is {} (warn threshold {})",
                    human_bytes(size),
                    human_bytes(self.warn_bytes)
                ),
            )
            .with_hints(["Consider splitting the content into smaller files"]));
        }
        Ok(CheckResult::pass(NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::Verdict;
    use crate::event::{EditPair, Payload};

    fn check() -> ContentSize {
        ContentSize {
            warn_bytes: 100,
            block_bytes: 1000,
        }
    }

    #[test]
    fn thresholds() {
        let c = check();
        let verdict = |n: usize| {
            c.evaluate(&Event::write("big.txt", "x".repeat(n), "/w"))
                .unwrap()
                .verdict
        };
        assert_eq!(verdict(99), Verdict::Pass);
        assert_eq!(verdict(100), Verdict::Warn);
        assert_eq!(verdict(999), Verdict::Warn);
        assert_eq!(verdict(1000), Verdict::Block);
    }

    #[test]
    fn edit_measures_new_string_only() {
        let ev = Event::edit("a.txt", "x".repeat(5000), "y", "/w");
        assert!(check().evaluate(&ev).unwrap().is_pass());
    }

    #[test]
    fn multi_edit_sums_new_strings() {
        let mut ev = Event::edit("a.txt", "", "", "/w");
        ev.payload = Payload::MultiEdit {
            file_path: "a.txt".into(),
            edits: (0..3)
                .map(|_| EditPair {
                    old_string: String::new(),
                    new_string: "z".repeat(400),
                })
                .collect(),
        };
        let r = check().evaluate(&ev).unwrap();
        assert_eq!(r.verdict, Verdict::Block);
        assert!(r.message.unwrap().starts_with("a.txt is 1.2 KiB"));
    }

    #[test]
    fn defaults_come_from_limits() {
        let c = ContentSize::from_limits(&Limits::default());
        assert_eq!(c.warn_bytes, 256 * 1024);
        assert_eq!(c.block_bytes, 1024 * 1024);
    }
}
