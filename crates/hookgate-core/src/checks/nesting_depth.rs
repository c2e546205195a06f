use super::file_label;
use crate::check::{file_mutation, Check, CheckResult};
use crate::error::Result;
use crate::event::{ActionKind, Event};

pub const NAME: &str = "nesting_depth";

const BRACE_EXTENSIONS: &[&str] = &[
    "rs", "js", "jsx", "ts", "tsx", "go", "java", "c", "cc", "cpp", "h", "hpp", "cs", "kt",
    "swift", "php", "scala",
];

const INDENT_WIDTH: usize = 4;

/// Languages where `'` opens a string rather than a char literal.
const SINGLE_QUOTE_STRING_EXTENSIONS: &[&str] = &["js", "jsx", "ts", "tsx", "php"];

/// What an apostrophe means to [`brace_depth`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Apostrophe {
    /// JS/TS/PHP: `'...'` is a string like `"..."`.
    StringQuote,
    /// Rust/C-family: `'{'` is a char literal; a bare `'a` is a lifetime.
    CharLiteral,
}

impl Apostrophe {
    pub fn for_extension(ext: &str) -> Self {
        if SINGLE_QUOTE_STRING_EXTENSIONS.contains(&ext) {
            Apostrophe::StringQuote
        } else {
            Apostrophe::CharLiteral
        }
    }
}

/// Deepest `{` nesting in `text`, skipping string and char literals and `//`
/// comments. Unbalanced closers in an edit fragment clamp at zero.
pub fn brace_depth(text: &str, apostrophe: Apostrophe) -> usize {
    let mut depth: usize = 0;
    let mut max = 0;
    for line in text.lines() {
        let chars: Vec<char> = line.chars().collect();
        let mut quote: Option<char> = None;
        let mut escaped = false;
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            if let Some(q) = quote {
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == q {
                    quote = None;
                }
                i += 1;
                continue;
            }
            match c {
                '"' | '`' => quote = Some(c),
                '\'' if apostrophe == Apostrophe::StringQuote => quote = Some(c),
                '\'' => {
                    i += char_literal_len(&chars[i..]);
                    continue;
                }
                '/' if chars.get(i + 1) == Some(&'/') => break,
                '{' => {
                    depth += 1;
                    max = max.max(depth);
                }
                '}' => depth = depth.saturating_sub(1),
                _ => {}
            }
            i += 1;
        }
    }
    max
}

/// Length of the char literal opening at `chars[0]`, or 1 when the
/// apostrophe is a lifetime or stray quote.
fn char_literal_len(chars: &[char]) -> usize {
    match chars.get(1) {
        Some('\\') => chars
            .iter()
            .skip(3)
            .position(|&c| c == '\'')
            .map_or(1, |p| p + 4),
        Some(_) if chars.get(2) == Some(&'\'') => 3,
        _ => 1,
    }
}

/// Deepest indentation level (in 4-space units) of a code line, relative to
/// the shallowest code line in `text`.
pub fn indent_depth(text: &str) -> usize {
    let levels: Vec<usize> = text
        .lines()
        .filter(|l| {
            let t = l.trim_start();
            !t.is_empty() && !t.starts_with('#')
        })
        .map(|l| {
            let width: usize = l
                .chars()
                .take_while(|c| c.is_whitespace())
                .map(|c| if c == '\t' { INDENT_WIDTH } else { 1 })
                .sum();
            width / INDENT_WIDTH
        })
        .collect();
    let (Some(min), Some(max)) = (levels.iter().min(), levels.iter().max()) else {
        return 0;
    };
    max - min
}

pub struct NestingDepth {
    pub max_depth: usize,
}

impl NestingDepth {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }
}

impl Check for NestingDepth {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Warns when new code nests deeper than limits.max_nesting_depth"
    }

    fn applies_to(&self, kind: ActionKind) -> bool {
        file_mutation(kind)
    }

    fn evaluate(&self, event: &Event) -> Result<CheckResult> {
        let (Some(path), Some(ext)) = (event.file_path(), event.extension()) else {
            return Ok(CheckResult::pass(NAME));
        };
        if ext != "py" && !BRACE_EXTENSIONS.contains(&ext.as_str()) {
            return Ok(CheckResult::pass(NAME));
        }
        let apostrophe = Apostrophe::for_extension(&ext);
        let measure = |text: &str| {
            if ext == "py" {
                indent_depth(text)
            } else {
                brace_depth(text, apostrophe)
            }
        };

        let depth = event.new_text().into_iter().map(measure).max().unwrap_or(0);
        if depth <= self.max_depth {
            return Ok(CheckResult::pass(NAME));
        }
        Ok(CheckResult::warn(
            NAME,
            format!(
                "Nesting depth {depth} in {} exceeds {}",
                file_label(path),
                self.max_depth
            ),
        )
        .with_hints([
            "Extract the inner block into a helper function",
            "Return early to flatten nested conditionals",
        ]))
    }
}
