use super::{ArrowHead, Direction, LinkStylePos, NodeShape, Stroke};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Tok {
    Header {
        keyword: String,
        direction: Option<Direction>,
    },

    Sep,
    Amp,
    End,

    Id(String),
    NodeLabel(NodeLabelToken),
    ClassShorthand(String),
    Arrow(LinkToken),
    EdgeLabel(String),

    Subgraph(SubgraphHeader),
    DirectionStmt(Direction),
    Style {
        target: String,
        styles: Vec<String>,
    },
    ClassDef {
        names: Vec<String>,
        styles: Vec<String>,
    },
    ClassAssign {
        targets: Vec<String>,
        class_name: String,
    },
    LinkStyle {
        positions: Vec<LinkStylePos>,
        styles: Vec<String>,
    },
    Click,
}

impl Tok {
    /// Short human-readable token name used in parse error messages.
    pub(crate) fn describe(&self) -> String {
        match self {
            Tok::Header { keyword, .. } => format!("`{keyword}`"),
            Tok::Sep => "end of statement".to_string(),
            Tok::Amp => "`&`".to_string(),
            Tok::End => "`end`".to_string(),
            Tok::Id(id) => format!("node id `{id}`"),
            Tok::NodeLabel(label) => format!("node label \"{}\"", label.text),
            Tok::ClassShorthand(name) => format!("`:::{name}`"),
            Tok::Arrow(link) => format!("link `{}`", link.text),
            Tok::EdgeLabel(text) => format!("edge label |{text}|"),
            Tok::Subgraph(_) => "`subgraph`".to_string(),
            Tok::DirectionStmt(_) => "`direction`".to_string(),
            Tok::Style { .. } => "`style`".to_string(),
            Tok::ClassDef { .. } => "`classDef`".to_string(),
            Tok::ClassAssign { .. } => "`class`".to_string(),
            Tok::LinkStyle { .. } => "`linkStyle`".to_string(),
            Tok::Click => "`click`".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct NodeLabelToken {
    pub shape: NodeShape,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LinkToken {
    /// The link exactly as written, without any inline label.
    pub text: String,
    pub start: ArrowHead,
    pub end: ArrowHead,
    pub stroke: Stroke,
    pub length: usize,
    /// Label written inside the link (`A -- yes --> B`).
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SubgraphHeader {
    pub id: Option<String>,
    pub title: String,
}

/// A token together with the 1-based source line it starts on.
pub(crate) type Spanned = (usize, Tok);
