use super::tokens::{LinkToken, NodeLabelToken, SubgraphHeader};
use super::{Direction, LinkStylePos};

#[derive(Debug, Clone, PartialEq)]
pub(super) struct Document {
    pub keyword: String,
    pub direction: Option<Direction>,
    pub statements: Vec<(usize, Stmt)>,
}

#[derive(Debug, Clone, PartialEq)]
pub(super) struct NodeRef {
    pub id: String,
    pub label: Option<NodeLabelToken>,
    pub class: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub(super) struct SubgraphBlock {
    pub header: SubgraphHeader,
    pub statements: Vec<(usize, Stmt)>,
}

#[derive(Debug, Clone, PartialEq)]
pub(super) enum Stmt {
    /// `A & B --> C -- text --> D`: `links.len() == groups.len() - 1`.
    Chain {
        groups: Vec<Vec<NodeRef>>,
        links: Vec<LinkToken>,
    },
    Subgraph(SubgraphBlock),
    Direction(Direction),
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
}
