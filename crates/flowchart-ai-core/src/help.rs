//! Flowchart syntax cheat sheet shown next to the diagram editor.

/// A single cheat-sheet row: what to type and what it produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntaxEntry {
    pub syntax: &'static str,
    pub meaning: &'static str,
}

const fn entry(syntax: &'static str, meaning: &'static str) -> SyntaxEntry {
    SyntaxEntry { syntax, meaning }
}

pub const SHAPES: &[SyntaxEntry] = &[
    entry("id([Start])", "Stadium (start / end)"),
    entry("id[Process]", "Rectangle (process)"),
    entry("id[/Input or output/]", "Parallelogram (I/O)"),
    entry("id{Decision}", "Rhombus (decision)"),
    entry("id[(Database)]", "Cylinder (storage)"),
];

pub const ARROWS: &[SyntaxEntry] = &[
    entry("A --> B", "Arrow"),
    entry("A --- B", "Open link"),
    entry("A -- Yes --> B", "Arrow with a label"),
    entry("A -->|Yes| B", "Arrow with a label"),
    entry("A -.-> B", "Dotted arrow"),
    entry("A ==> B", "Thick arrow"),
];

pub const TIPS: &[SyntaxEntry] = &[
    entry("flowchart TD", "Top-down layout"),
    entry("flowchart LR", "Left-to-right layout"),
    entry(
        "id[\"Text with (special) chars\"]",
        "Quote labels that contain brackets or parentheses",
    ),
];

/// Renders the whole cheat sheet as plain text.
pub fn syntax_guide() -> String {
    let mut out = String::new();
    for (title, entries) in [("Shapes", SHAPES), ("Arrows", ARROWS), ("Tips", TIPS)] {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(title);
        out.push('\n');
        let width = entries.iter().map(|e| e.syntax.len()).max().unwrap_or(0);
        for e in entries {
            out.push_str(&format!("  {:<width$}  {}\n", e.syntax, e.meaning));
        }
    }
    out
}
