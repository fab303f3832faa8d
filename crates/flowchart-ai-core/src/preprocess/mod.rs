/// Removes a Markdown code fence wrapped around `input`, whatever its language tag.
///
/// Text-generation models routinely wrap their answers in ```` ```mermaid ```` or
/// ```` ```json ```` blocks. A leading fence line (three or more backticks plus an optional info
/// string) and a trailing fence line are dropped together with the surrounding whitespace. Text
/// without fences is only trimmed.
pub fn strip_code_fence(input: &str) -> &str {
    let mut s = input.trim();

    if s.starts_with("```") {
        s = match s.find('\n') {
            Some(nl) => &s[nl + 1..],
            // A single-line block: "```json {...}```".
            None => s.trim_start_matches('`').trim_start_matches(|c: char| c.is_alphanumeric()),
        };
    }

    let trimmed_end = s.trim_end();
    if trimmed_end.ends_with("```") {
        s = trimmed_end.trim_end_matches('`');
    }

    s.trim()
}

/// Normalizes a diagram description before parsing.
///
/// - strips a surrounding code fence ([`strip_code_fence`])
/// - converts CRLF / CR line endings to LF
///
/// Rendering the normalized text and the raw text yields the same diagram.
pub fn render_normalize(input: &str) -> String {
    let stripped = strip_code_fence(input);
    if stripped.contains('\r') {
        stripped.replace("\r\n", "\n").replace('\r', "\n")
    } else {
        stripped.to_string()
    }
}
