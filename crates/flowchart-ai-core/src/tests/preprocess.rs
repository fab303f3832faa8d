use crate::preprocess::{render_normalize, strip_code_fence};

#[test]
fn strip_code_fence_any_language_tag() {
    assert_eq!(strip_code_fence("```mermaid\ngraph TD\nA-->B\n```"), "graph TD\nA-->B");
    assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
    assert_eq!(strip_code_fence("```\ngraph TD\n```"), "graph TD");
    assert_eq!(strip_code_fence("  \n```mermaid\ngraph TD\n```  \n"), "graph TD");
}

#[test]
fn strip_code_fence_single_line_block() {
    assert_eq!(strip_code_fence("```json {\"a\":1}```"), "{\"a\":1}");
}

#[test]
fn strip_code_fence_leaves_plain_text_trimmed() {
    assert_eq!(strip_code_fence("\n  graph TD\nA-->B \n"), "graph TD\nA-->B");
    assert_eq!(strip_code_fence(""), "");
}

#[test]
fn strip_code_fence_handles_a_missing_closing_fence() {
    assert_eq!(strip_code_fence("```mermaid\ngraph TD\nA-->B"), "graph TD\nA-->B");
}

#[test]
fn render_normalize_converts_line_endings() {
    assert_eq!(render_normalize("graph TD\r\nA-->B\rB-->C"), "graph TD\nA-->B\nB-->C");
    assert_eq!(
        render_normalize("```mermaid\r\ngraph TD\r\nA-->B\r\n```"),
        "graph TD\nA-->B"
    );
}

#[test]
fn render_normalize_is_idempotent() {
    let once = render_normalize("```mermaid\ngraph LR\n  A --> B\n```");
    assert_eq!(render_normalize(&once), once);
}
