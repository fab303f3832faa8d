//! On-demand formatters for the two free-text artifacts of a generation cycle.
//!
//! Both are pure `&str -> String` transformations; the caller decides when to apply them.

use regex::Regex;
use std::sync::OnceLock;

/// One indentation level in formatted pseudo-code.
pub const INDENT_UNIT: &str = "    ";

/// Keywords that close a block; the line itself is printed one level shallower.
const BLOCK_CLOSERS: &[&str] = &["END", "ELSE", "UNTIL"];

/// Keywords that open a block; lines after them are printed one level deeper.
///
/// `do` is matched against the uppercased line, so on its own it never opens a block.
const BLOCK_OPENERS: &[&str] = &["IF", "ELSE", "WHILE", "FOR", "FUNCTION", "do"];

fn leading_numbering() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+[.)|]\s*").expect("numbering pattern is valid"))
}

/// Returns `true` if `s` starts with a `<digits><. | )><whitespace>` step marker.
fn starts_with_step_marker(s: &str) -> bool {
    let digits = s.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return false;
    }
    let mut rest = s[digits..].chars();
    matches!(rest.next(), Some('.' | '|' | ')')) && rest.next().is_some_and(char::is_whitespace)
}

/// Splits step text into candidate lines.
///
/// A boundary is either a line break or a whitespace run that is immediately followed by a
/// step marker such as `2. ` or `3) `, so steps emitted on a single physical line are recovered.
fn split_steps(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut iter = text.char_indices().peekable();

    while let Some((i, c)) = iter.next() {
        if c == '\n' {
            out.push(&text[start..i]);
            start = i + 1;
            continue;
        }
        if !c.is_whitespace() {
            continue;
        }

        let mut run_end = i + c.len_utf8();
        while let Some(&(j, next)) = iter.peek() {
            if next == '\n' || !next.is_whitespace() {
                break;
            }
            run_end = j + next.len_utf8();
            iter.next();
        }
        if starts_with_step_marker(&text[run_end..]) {
            out.push(&text[start..i]);
            start = run_end;
        }
    }
    out.push(&text[start..]);
    out
}

/// Re-numbers a list of algorithm steps as `1. `, `2. `, ...
///
/// Existing numbering is replaced, blank lines are dropped and steps that were run together on
/// one line (`"1. Start 2. End"`) are split apart. The output is a fixed point:
/// formatting it again yields the same text.
///
/// ```
/// use flowchart_ai_core::autoformat::normalize_numbered_list;
///
/// assert_eq!(normalize_numbered_list("1. Start 2. End"), "1. Start\n2. End");
/// assert_eq!(normalize_numbered_list("Start\n\nEnd"), "1. Start\n2. End");
/// ```
pub fn normalize_numbered_list(text: &str) -> String {
    let re = leading_numbering();
    split_steps(text)
        .into_iter()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .enumerate()
        .map(|(i, line)| format!("{}. {}", i + 1, re.replace(line, "")))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Re-indents pseudo-code by block keywords, four spaces per level.
///
/// Lines are trimmed and blank lines dropped. A line starting with `END`, `ELSE` or `UNTIL`
/// (case-insensitive) is printed one level shallower; a line starting with `IF`, `ELSE`,
/// `WHILE`, `FOR` or `FUNCTION` indents the lines that follow. `ELSE` does both, so it sits at
/// the level of its `IF`.
pub fn normalize_indentation(text: &str) -> String {
    let mut depth: usize = 0;
    let mut out = Vec::new();

    for line in text.split('\n').map(str::trim).filter(|l| !l.is_empty()) {
        let upper = line.to_uppercase();
        if BLOCK_CLOSERS.iter().any(|kw| upper.starts_with(kw)) {
            depth = depth.saturating_sub(1);
        }
        out.push(format!("{}{}", INDENT_UNIT.repeat(depth), line));
        if BLOCK_OPENERS.iter().any(|kw| upper.starts_with(kw)) {
            depth += 1;
        }
    }

    out.join("\n")
}
