use super::{ArrowHead, Stroke};

fn head_from_end(b: u8) -> ArrowHead {
    match b {
        b'>' => ArrowHead::Arrow,
        b'x' => ArrowHead::Cross,
        b'o' => ArrowHead::Circle,
        _ => ArrowHead::None,
    }
}

fn head_from_start(b: u8) -> ArrowHead {
    match b {
        b'<' => ArrowHead::Arrow,
        b'x' => ArrowHead::Cross,
        b'o' => ArrowHead::Circle,
        _ => ArrowHead::None,
    }
}

/// Splits a link such as `-->`, `<-.->`, `===` or `--x` into its heads, stroke and length.
///
/// `length` is the number of ranks the link spans (`-->` is 1, `--->` is 2, `-..->` is 2).
/// Returns `None` for text that is not a complete link (e.g. `--` or `=>`).
pub(super) fn destruct_link(text: &str) -> Option<(ArrowHead, ArrowHead, Stroke, usize)> {
    let s = text.trim();
    let bytes = s.as_bytes();
    if bytes.len() < 2 {
        return None;
    }

    let end = head_from_end(bytes[bytes.len() - 1]);
    let mut body = if end == ArrowHead::None {
        s
    } else {
        &s[..s.len() - 1]
    };

    // A start marker only counts when it mirrors the end marker (`<-->`, `x--x`, `o--o`).
    let mut start = ArrowHead::None;
    if let Some(&first) = body.as_bytes().first() {
        let candidate = head_from_start(first);
        if candidate != ArrowHead::None {
            if candidate != end {
                return None;
            }
            start = candidate;
            body = &body[1..];
        }
    }

    let has_end = end != ArrowHead::None;
    let all = |c: char| !body.is_empty() && body.chars().all(|b| b == c);

    if all('-') {
        let min = if has_end { 2 } else { 3 };
        if body.len() < min {
            return None;
        }
        let length = if has_end { body.len() - 1 } else { body.len() - 2 };
        return Some((start, end, Stroke::Normal, length.max(1)));
    }

    if all('=') {
        let min = if has_end { 2 } else { 3 };
        if body.len() < min {
            return None;
        }
        let length = if has_end { body.len() - 1 } else { body.len() - 2 };
        return Some((start, end, Stroke::Thick, length.max(1)));
    }

    if all('~') {
        if has_end || start != ArrowHead::None || body.len() < 3 {
            return None;
        }
        return Some((start, end, Stroke::Invisible, 1));
    }

    // Dotted: an optional leading dash, one or more dots, one trailing dash.
    let inner = body.strip_prefix('-').unwrap_or(body);
    let dots = inner.strip_suffix('-')?;
    if dots.is_empty() || !dots.chars().all(|c| c == '.') {
        return None;
    }
    Some((start, end, Stroke::Dotted, dots.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_arrows() {
        assert_eq!(
            destruct_link("-->"),
            Some((ArrowHead::None, ArrowHead::Arrow, Stroke::Normal, 1))
        );
        assert_eq!(
            destruct_link("---"),
            Some((ArrowHead::None, ArrowHead::None, Stroke::Normal, 1))
        );
        assert_eq!(
            destruct_link("---->"),
            Some((ArrowHead::None, ArrowHead::Arrow, Stroke::Normal, 3))
        );
        assert_eq!(
            destruct_link("<-->"),
            Some((ArrowHead::Arrow, ArrowHead::Arrow, Stroke::Normal, 1))
        );
    }

    #[test]
    fn dotted_thick_and_invisible() {
        assert_eq!(
            destruct_link("-.->"),
            Some((ArrowHead::None, ArrowHead::Arrow, Stroke::Dotted, 1))
        );
        assert_eq!(
            destruct_link("-..-"),
            Some((ArrowHead::None, ArrowHead::None, Stroke::Dotted, 2))
        );
        assert_eq!(
            destruct_link(".->"),
            Some((ArrowHead::None, ArrowHead::Arrow, Stroke::Dotted, 1))
        );
        assert_eq!(
            destruct_link("==>"),
            Some((ArrowHead::None, ArrowHead::Arrow, Stroke::Thick, 1))
        );
        assert_eq!(
            destruct_link("~~~"),
            Some((ArrowHead::None, ArrowHead::None, Stroke::Invisible, 1))
        );
    }

    #[test]
    fn cross_and_circle_ends() {
        assert_eq!(
            destruct_link("--x"),
            Some((ArrowHead::None, ArrowHead::Cross, Stroke::Normal, 1))
        );
        assert_eq!(
            destruct_link("o--o"),
            Some((ArrowHead::Circle, ArrowHead::Circle, Stroke::Normal, 1))
        );
    }

    #[test]
    fn incomplete_links_are_rejected() {
        assert_eq!(destruct_link("--"), None);
        assert_eq!(destruct_link("=="), None);
        assert_eq!(destruct_link("->"), None);
        assert_eq!(destruct_link("<--"), None);
        assert_eq!(destruct_link("-.x.->"), None);
    }
}
