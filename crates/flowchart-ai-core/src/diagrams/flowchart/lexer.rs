use super::link::destruct_link;
use super::tokens::{LinkToken, NodeLabelToken, Spanned, SubgraphHeader, Tok};
use super::{Direction, LinkStylePos, NodeShape};
use crate::{Error, Result};
use std::collections::VecDeque;

/// Node shape delimiters, longest opener first so that `([` wins over `(`.
const SHAPES: &[(&str, &[(&str, NodeShape)])] = &[
    ("([", &[("])", NodeShape::Stadium)]),
    ("((", &[("))", NodeShape::Circle)]),
    ("(", &[(")", NodeShape::Round)]),
    ("[(", &[(")]", NodeShape::Cylinder)]),
    ("[[", &[("]]", NodeShape::Subroutine)]),
    (
        "[/",
        &[("/]", NodeShape::LeanRight), ("\\]", NodeShape::Trapezoid)],
    ),
    (
        "[\\",
        &[("\\]", NodeShape::LeanLeft), ("/]", NodeShape::InvTrapezoid)],
    ),
    ("[", &[("]", NodeShape::Rect)]),
    ("{{", &[("}}", NodeShape::Hexagon)]),
    ("{", &[("}", NodeShape::Diamond)]),
    (">", &[("]", NodeShape::Asymmetric)]),
];

/// Characters that must be quoted inside a node label.
const RESERVED_LABEL_BYTES: &[u8] = b"[](){}\"";

fn is_id_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b >= 0x80
}

fn unquote(text: &str) -> String {
    let t = text.trim();
    if t.len() >= 2 && t.starts_with('"') && t.ends_with('"') {
        t[1..t.len() - 1].to_string()
    } else {
        t.to_string()
    }
}

fn split_styles(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub(super) struct Lexer<'input> {
    input: &'input str,
    pos: usize,
    line: usize,
    pending: VecDeque<Spanned>,
    header_done: bool,
    at_stmt_start: bool,
    /// The previous token ended a node reference, so `x--x` / `o--o` start a link.
    after_node: bool,
}

impl<'input> Lexer<'input> {
    pub(super) fn new(input: &'input str) -> Self {
        Self {
            input,
            pos: 0,
            line: 1,
            pending: VecDeque::new(),
            header_done: false,
            at_stmt_start: true,
            after_node: false,
        }
    }

    pub(super) fn tokenize(mut self) -> Result<Vec<Spanned>> {
        let mut out = Vec::new();
        while let Some(tok) = self.next_token()? {
            out.push(tok);
        }
        Ok(out)
    }

    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.as_bytes().get(self.pos + offset).copied()
    }

    fn rest(&self) -> &'input str {
        &self.input[self.pos..]
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        if b == b'\n' {
            self.line += 1;
        }
        Some(b)
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\r')) {
            self.pos += 1;
        }
    }

    /// Skips a `%%` comment up to (not including) the newline.
    fn skip_comment(&mut self) -> bool {
        if !self.rest().starts_with("%%") {
            return false;
        }
        while !matches!(self.peek(), None | Some(b'\n')) {
            self.pos += 1;
        }
        true
    }

    fn starts_with_kw(&self, kw: &str) -> bool {
        if !self.rest().starts_with(kw) {
            return false;
        }
        match self.input.as_bytes().get(self.pos + kw.len()) {
            None => true,
            Some(&b) => !is_id_byte(b) && b != b'-',
        }
    }

    /// Consumes the remainder of the statement (up to `;` or newline outside quotes).
    fn take_statement_rest(&mut self) -> &'input str {
        let start = self.pos;
        let mut in_quotes = false;
        while let Some(b) = self.peek() {
            match b {
                b'"' => in_quotes = !in_quotes,
                b'\n' => break,
                b';' if !in_quotes => break,
                _ => {}
            }
            self.pos += 1;
        }
        self.input[start..self.pos].trim()
    }

    fn take_word(&mut self) -> &'input str {
        let start = self.pos;
        while self.peek().is_some_and(|b| is_id_byte(b) || b == b'-') {
            self.pos += 1;
        }
        &self.input[start..self.pos]
    }

    fn lex_header(&mut self) -> Result<Spanned> {
        loop {
            while matches!(self.peek(), Some(b' ' | b'\t' | b'\r' | b'\n')) {
                self.bump();
            }
            if !self.skip_comment() {
                break;
            }
        }

        let line = self.line;
        if self.peek().is_none() {
            return Err(Error::EmptyDiagram);
        }

        let word = self.take_word();
        let keyword = match word {
            "graph" | "flowchart" => word.to_string(),
            "flowchart-elk" => "flowchart".to_string(),
            _ => {
                self.pos -= word.len();
                let header = self.take_statement_rest().to_string();
                return Err(Error::UnsupportedHeader { line, header });
            }
        };

        self.skip_ws();
        let mut direction = None;
        if let Some(b) = self.peek() {
            if !matches!(b, b'\n' | b';') && !self.rest().starts_with("%%") {
                let start = self.pos;
                while self
                    .peek()
                    .is_some_and(|b| !matches!(b, b' ' | b'\t' | b'\r' | b'\n' | b';'))
                {
                    self.pos += 1;
                }
                let word = &self.input[start..self.pos];
                direction = Some(Direction::parse(word).ok_or_else(|| {
                    Error::parse(line, format!("unknown direction `{word}` after `{keyword}`"))
                })?);
            }
        }

        self.skip_ws();
        self.skip_comment();
        if !matches!(self.peek(), None | Some(b'\n' | b';')) {
            let extra = self.take_statement_rest().to_string();
            return Err(Error::parse(
                line,
                format!("expected a new line after the header, found `{extra}`"),
            ));
        }

        self.header_done = true;
        Ok((line, Tok::Header { keyword, direction }))
    }

    fn next_token(&mut self) -> Result<Option<Spanned>> {
        if let Some(tok) = self.pending.pop_front() {
            return Ok(Some(tok));
        }
        if !self.header_done {
            return self.lex_header().map(Some);
        }

        loop {
            self.skip_ws();
            if !self.skip_comment() {
                break;
            }
        }

        let line = self.line;
        let Some(b) = self.peek() else {
            return Ok(None);
        };

        if matches!(b, b'\n' | b';') {
            self.bump();
            self.at_stmt_start = true;
            self.after_node = false;
            return Ok(Some((line, Tok::Sep)));
        }

        if self.at_stmt_start {
            self.at_stmt_start = false;
            if let Some(tok) = self.lex_keyword_statement(line)? {
                self.after_node = false;
                return Ok(Some((line, tok)));
            }
        }

        let tok = match b {
            b'&' => {
                self.bump();
                self.after_node = false;
                Tok::Amp
            }
            b'|' => {
                self.after_node = false;
                self.lex_pipe_label(line)?
            }
            b':' if self.rest().starts_with(":::") => {
                self.pos += 3;
                let name = self.take_word();
                if name.is_empty() {
                    return Err(Error::parse(line, "expected a class name after `:::`"));
                }
                self.after_node = true;
                Tok::ClassShorthand(name.to_string())
            }
            b'<' | b'-' | b'=' | b'~' | b'.' => {
                self.after_node = false;
                self.lex_link(line)?
            }
            b'x' | b'o' if self.after_node && matches!(self.peek_at(1), Some(b'-' | b'=')) => {
                self.after_node = false;
                self.lex_link(line)?
            }
            b if is_id_byte(b) => {
                let tok = self.lex_id();
                self.after_node = true;
                let label_line = self.line;
                if let Some(label) = self.lex_node_label()? {
                    self.pending.push_back((label_line, label));
                }
                tok
            }
            b'[' | b'(' | b'{' => {
                return Err(Error::parse(line, "node shape without a node id"));
            }
            _ => {
                let c = self.rest().chars().next().unwrap_or('?');
                return Err(Error::parse(line, format!("unexpected character `{c}`")));
            }
        };
        Ok(Some((line, tok)))
    }

    /// Lexes `subgraph`, `end`, `direction`, `style`, `classDef`, `class`, `linkStyle` and
    /// `click` statements. Returns `None` (without consuming input) for anything else.
    fn lex_keyword_statement(&mut self, line: usize) -> Result<Option<Tok>> {
        if self.starts_with_kw("end") {
            self.pos += 3;
            return Ok(Some(Tok::End));
        }

        let keywords = [
            "subgraph",
            "direction",
            "style",
            "classDef",
            "class",
            "linkStyle",
            "click",
        ];
        let Some(kw) = keywords.into_iter().find(|kw| {
            self.rest().starts_with(kw)
                && matches!(
                    self.input.as_bytes().get(self.pos + kw.len()),
                    Some(b' ' | b'\t')
                )
        }) else {
            return Ok(None);
        };
        self.pos += kw.len();
        self.skip_ws();
        let rest = self.take_statement_rest();

        let tok = match kw {
            "subgraph" => Tok::Subgraph(parse_subgraph_header(rest)),
            "direction" => {
                let dir = Direction::parse(rest)
                    .ok_or_else(|| Error::parse(line, format!("unknown direction `{rest}`")))?;
                Tok::DirectionStmt(dir)
            }
            "style" => {
                let (target, styles) = split_first_word(rest);
                if target.is_empty() {
                    return Err(Error::parse(line, "`style` needs a node id"));
                }
                Tok::Style {
                    target: target.to_string(),
                    styles: split_styles(styles),
                }
            }
            "classDef" => {
                let (names, styles) = split_first_word(rest);
                if names.is_empty() {
                    return Err(Error::parse(line, "`classDef` needs a class name"));
                }
                Tok::ClassDef {
                    names: split_styles(names),
                    styles: split_styles(styles),
                }
            }
            "class" => {
                let (targets, class_name) = split_first_word(rest);
                let class_name = class_name.trim();
                if targets.is_empty() || class_name.is_empty() {
                    return Err(Error::parse(line, "`class` needs node ids and a class name"));
                }
                Tok::ClassAssign {
                    targets: split_styles(targets),
                    class_name: class_name.to_string(),
                }
            }
            "linkStyle" => {
                let (positions, mut styles) = split_first_word(rest);
                // `linkStyle 0 interpolate basis stroke:red` carries a curve name we ignore.
                if let Some(after) = styles.trim_start().strip_prefix("interpolate") {
                    styles = split_first_word(after.trim_start()).1;
                }
                Tok::LinkStyle {
                    positions: parse_link_style_positions(line, positions)?,
                    styles: split_styles(styles),
                }
            }
            _ => Tok::Click,
        };
        Ok(Some(tok))
    }

    fn lex_id(&mut self) -> Tok {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if is_id_byte(b) {
                self.pos += 1;
            } else if b == b'-' && self.peek_at(1).is_some_and(is_id_byte) {
                // `node-1` is an id; `A-->B` and `A-.->B` are not.
                self.pos += 1;
            } else {
                break;
            }
        }
        Tok::Id(self.input[start..self.pos].to_string())
    }

    /// Lexes a shape label directly after an id. Whitespace is allowed before `[`, `(` and `{`.
    fn lex_node_label(&mut self) -> Result<Option<Tok>> {
        let line = self.line;
        let before_ws = self.pos;
        self.skip_ws();
        let spaced = self.pos != before_ws;

        for (open, closers) in SHAPES {
            if !self.rest().starts_with(open) {
                continue;
            }
            if *open == ">" && spaced {
                break;
            }
            self.pos += open.len();
            let (text, shape) = self.lex_shape_text(line, closers)?;
            self.after_node = true;
            return Ok(Some(Tok::NodeLabel(NodeLabelToken { shape, text })));
        }

        self.pos = before_ws;
        Ok(None)
    }

    fn lex_shape_text(
        &mut self,
        line: usize,
        closers: &[(&str, NodeShape)],
    ) -> Result<(String, NodeShape)> {
        self.skip_ws();

        if self.peek() == Some(b'"') {
            self.pos += 1;
            let rest = self.rest();
            let line_end = rest.find('\n').unwrap_or(rest.len());
            let Some(close_quote) = rest[..line_end].find('"') else {
                return Err(Error::parse(line, "unterminated string in node label"));
            };
            let text = rest[..close_quote].to_string();
            self.pos += close_quote + 1;
            self.skip_ws();
            for (close, shape) in closers {
                if self.rest().starts_with(close) {
                    self.pos += close.len();
                    return Ok((text, *shape));
                }
            }
            return Err(Error::parse(
                line,
                format!("expected `{}` to close the node label", closers[0].0),
            ));
        }

        let rest = self.rest();
        let line_end = rest.find('\n').unwrap_or(rest.len());
        let candidate = &rest[..line_end];
        let found = closers
            .iter()
            .filter_map(|(close, shape)| candidate.find(close).map(|i| (i, *close, *shape)))
            .min_by_key(|(i, _, _)| *i);
        let Some((idx, close, shape)) = found else {
            return Err(Error::parse(
                line,
                format!("unterminated node label; expected `{}`", closers[0].0),
            ));
        };

        let text = candidate[..idx].trim();
        if let Some(bad) = text.bytes().find(|b| RESERVED_LABEL_BYTES.contains(b)) {
            return Err(Error::parse(
                line,
                format!(
                    "unexpected `{}` in node label \"{text}\"; wrap labels with special characters in double quotes",
                    bad as char
                ),
            ));
        }
        self.pos += idx + close.len();
        Ok((text.to_string(), shape))
    }

    fn lex_pipe_label(&mut self, line: usize) -> Result<Tok> {
        self.pos += 1;
        let rest = self.rest();
        let line_end = rest.find('\n').unwrap_or(rest.len());
        let Some(close) = rest[..line_end].find('|') else {
            return Err(Error::parse(line, "unterminated edge label; expected `|`"));
        };
        let text = unquote(&rest[..close]);
        self.pos += close + 1;
        Ok(Tok::EdgeLabel(text))
    }

    /// Scans the extent of a link starting at `from`, returning the end offset.
    fn scan_link(&self, from: usize, allow_start: bool) -> usize {
        let bytes = self.input.as_bytes();
        let mut i = from;
        if allow_start && matches!(bytes.get(i), Some(b'<' | b'x' | b'o')) {
            i += 1;
        }
        match bytes.get(i) {
            Some(b'=') => {
                while bytes.get(i) == Some(&b'=') {
                    i += 1;
                }
            }
            Some(b'~') => {
                while bytes.get(i) == Some(&b'~') {
                    i += 1;
                }
            }
            Some(b'-' | b'.') => {
                while bytes.get(i) == Some(&b'-') {
                    i += 1;
                }
                while bytes.get(i) == Some(&b'.') {
                    i += 1;
                }
                while bytes.get(i) == Some(&b'-') {
                    i += 1;
                }
            }
            _ => return i,
        }
        match bytes.get(i) {
            Some(b'>') => i + 1,
            Some(b'x' | b'o') if !bytes.get(i + 1).copied().is_some_and(is_id_byte) => i + 1,
            _ => i,
        }
    }

    fn lex_link(&mut self, line: usize) -> Result<Tok> {
        let start = self.pos;
        let end = self.scan_link(start, true);
        let text = &self.input[start..end];

        if let Some((start_head, end_head, stroke, length)) = destruct_link(text) {
            self.pos = end;
            return Ok(Tok::Arrow(LinkToken {
                text: text.to_string(),
                start: start_head,
                end: end_head,
                stroke,
                length,
                label: None,
            }));
        }

        // `A -- text --> B`, `A -. text .-> B`, `A == text ==> B`
        let (marker, opener) = match text.as_bytes().first() {
            Some(b'<' | b'x' | b'o') => (&text[..1], &text[1..]),
            _ => ("", text),
        };
        let closing_prefix = match opener {
            "--" => "--",
            "==" => "==",
            "-." => ".-",
            _ => return Err(Error::parse(line, format!("invalid link `{text}`"))),
        };
        if matches!(self.input.as_bytes().get(end), None | Some(b'\n' | b';')) {
            return Err(Error::parse(line, format!("incomplete link `{text}`")));
        }

        let rest = &self.input[end..];
        let line_end = rest.find('\n').unwrap_or(rest.len());
        let Some(close_at) = rest[..line_end].find(closing_prefix) else {
            return Err(Error::parse(
                line,
                format!("unterminated link label after `{text}`"),
            ));
        };
        let label = unquote(&rest[..close_at]);
        let close_start = end + close_at;
        let close_end = self.scan_link(close_start, false);
        let closing = &self.input[close_start..close_end];
        let full = format!("{marker}{closing}");

        let Some((start_head, end_head, stroke, length)) = destruct_link(&full) else {
            return Err(Error::parse(line, format!("invalid link `{full}`")));
        };
        self.pos = close_end;
        Ok(Tok::Arrow(LinkToken {
            text: full,
            start: start_head,
            end: end_head,
            stroke,
            length,
            label: Some(label),
        }))
    }
}

/// Splits `"a,b fill:#f00"` into `("a,b", "fill:#f00")`.
fn split_first_word(s: &str) -> (&str, &str) {
    let s = s.trim();
    match s.find(|c: char| c.is_whitespace()) {
        Some(i) => (&s[..i], s[i..].trim_start()),
        None => (s, ""),
    }
}

fn parse_link_style_positions(line: usize, raw: &str) -> Result<Vec<LinkStylePos>> {
    raw.split(',')
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .map(|p| {
            if p == "default" {
                return Ok(LinkStylePos::Default);
            }
            p.parse::<usize>()
                .map(LinkStylePos::Index)
                .map_err(|_| Error::parse(line, format!("invalid linkStyle index `{p}`")))
        })
        .collect()
}

fn parse_subgraph_header(raw: &str) -> SubgraphHeader {
    let raw = raw.trim();
    if let Some(open) = raw.find('[') {
        if raw.ends_with(']') {
            let id = raw[..open].trim();
            return SubgraphHeader {
                id: (!id.is_empty()).then(|| id.to_string()),
                title: unquote(&raw[open + 1..raw.len() - 1]),
            };
        }
    }
    if raw.starts_with('"') || raw.contains(char::is_whitespace) {
        return SubgraphHeader {
            id: None,
            title: unquote(raw),
        };
    }
    SubgraphHeader {
        id: (!raw.is_empty()).then(|| raw.to_string()),
        title: raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagrams::flowchart::{ArrowHead, Stroke};

    fn lex(input: &str) -> Vec<Tok> {
        Lexer::new(input)
            .tokenize()
            .expect("lex")
            .into_iter()
            .map(|(_, t)| t)
            .collect()
    }

    #[test]
    fn hyphenated_ids_do_not_swallow_links() {
        let toks = lex("graph TD\nnode-1-->B");
        assert_eq!(toks[2], Tok::Id("node-1".to_string()));
        assert!(matches!(&toks[3], Tok::Arrow(l) if l.end == ArrowHead::Arrow));
        assert_eq!(toks[4], Tok::Id("B".to_string()));
    }

    #[test]
    fn inline_link_labels_are_captured() {
        let toks = lex("flowchart LR\nA -. maybe .-> B");
        let Tok::Arrow(link) = &toks[3] else {
            panic!("expected a link, got {:?}", toks[3]);
        };
        assert_eq!(link.label.as_deref(), Some("maybe"));
        assert_eq!(link.stroke, Stroke::Dotted);
    }

    #[test]
    fn style_statement_splits_target_and_styles() {
        let toks = lex("graph TD\nstyle A fill:#f9f,stroke:#333");
        assert_eq!(
            toks[2],
            Tok::Style {
                target: "A".to_string(),
                styles: vec!["fill:#f9f".to_string(), "stroke:#333".to_string()],
            }
        );
    }

    #[test]
    fn subgraph_headers() {
        assert_eq!(
            parse_subgraph_header("one [\"First part\"]"),
            SubgraphHeader {
                id: Some("one".to_string()),
                title: "First part".to_string(),
            }
        );
        assert_eq!(
            parse_subgraph_header("Two words"),
            SubgraphHeader {
                id: None,
                title: "Two words".to_string(),
            }
        );
    }
}
