//! Mermaid-style flowchart descriptions.
//!
//! Parsing runs in three steps: [`lexer::Lexer`] turns the text into line-tagged tokens,
//! [`parser`] groups them into statements and [`FlowchartDb`] folds the statements into the
//! semantic [`Flowchart`] model consumed by the layout engine.

mod ast;
mod lexer;
mod link;
mod parser;
mod tokens;

use crate::{Error, Result};
use ast::{NodeRef, Stmt, SubgraphBlock};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tokens::LinkToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    TB,
    BT,
    LR,
    RL,
}

impl Direction {
    pub fn parse(word: &str) -> Option<Self> {
        match word.trim().to_ascii_uppercase().as_str() {
            "TB" | "TD" | "V" => Some(Self::TB),
            "BT" | "^" => Some(Self::BT),
            "LR" | ">" => Some(Self::LR),
            "RL" | "<" => Some(Self::RL),
            _ => None,
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Self::LR | Self::RL)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::TB => "TB",
            Self::BT => "BT",
            Self::LR => "LR",
            Self::RL => "RL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeShape {
    /// `id[text]`
    #[default]
    Rect,
    /// `id(text)`
    Round,
    /// `id([text])`
    Stadium,
    /// `id[[text]]`
    Subroutine,
    /// `id[(text)]`
    Cylinder,
    /// `id((text))`
    Circle,
    /// `id{text}`
    Diamond,
    /// `id{{text}}`
    Hexagon,
    /// `id[/text/]`
    LeanRight,
    /// `id[\text\]`
    LeanLeft,
    /// `id[/text\]`
    Trapezoid,
    /// `id[\text/]`
    InvTrapezoid,
    /// `id>text]`
    Asymmetric,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ArrowHead {
    #[default]
    None,
    Arrow,
    Cross,
    Circle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Stroke {
    #[default]
    Normal,
    Thick,
    Dotted,
    Invisible,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkStylePos {
    Default,
    Index(usize),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowNode {
    pub id: String,
    pub label: String,
    pub shape: NodeShape,
    pub classes: Vec<String>,
    pub styles: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowEdge {
    pub id: String,
    pub from: String,
    pub to: String,
    pub label: Option<String>,
    pub start: ArrowHead,
    pub end: ArrowHead,
    pub stroke: Stroke,
    /// Minimum number of ranks between `from` and `to`.
    pub length: usize,
    pub styles: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowSubgraph {
    pub id: String,
    pub title: String,
    pub direction: Option<Direction>,
    /// Nodes declared directly inside this subgraph.
    pub nodes: Vec<String>,
    /// Ids of subgraphs nested directly inside this one.
    pub children: Vec<String>,
}

/// Semantic model of a flowchart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flowchart {
    /// `graph` or `flowchart`, as written in the header.
    pub keyword: String,
    pub direction: Direction,
    pub nodes: Vec<FlowNode>,
    pub edges: Vec<FlowEdge>,
    /// Innermost subgraphs come first.
    pub subgraphs: Vec<FlowSubgraph>,
    pub class_defs: IndexMap<String, Vec<String>>,
    pub edge_default_styles: Vec<String>,
}

impl Flowchart {
    pub fn node(&self, id: &str) -> Option<&FlowNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Resolves the inline styles of a node: `classDef` styles of its classes first, then its
    /// own `style` declarations (later entries win when rendered as CSS).
    pub fn resolved_node_styles(&self, node: &FlowNode) -> Vec<String> {
        let mut out = Vec::new();
        if let Some(default) = self.class_defs.get("default") {
            out.extend(default.iter().cloned());
        }
        for class in &node.classes {
            if let Some(styles) = self.class_defs.get(class) {
                out.extend(styles.iter().cloned());
            }
        }
        out.extend(node.styles.iter().cloned());
        out
    }
}

pub fn parse_flowchart(code: &str) -> Result<Flowchart> {
    let tokens = lexer::Lexer::new(code).tokenize()?;
    let ast = parser::Parser::new(tokens).parse_document()?;

    let mut db = FlowchartDb::new(ast.keyword, ast.direction.unwrap_or_default());
    db.apply_all(&ast.statements)?;
    Ok(db.into_model())
}

#[derive(Debug)]
struct FlowchartDb {
    keyword: String,
    direction: Direction,
    nodes: IndexMap<String, FlowNode>,
    edges: Vec<FlowEdge>,
    subgraphs: Vec<FlowSubgraph>,
    class_defs: IndexMap<String, Vec<String>>,
    edge_default_styles: Vec<String>,
    /// Node id -> id of the subgraph that claimed it.
    claimed: IndexMap<String, String>,
    next_subgraph: usize,
}

impl FlowchartDb {
    fn new(keyword: String, direction: Direction) -> Self {
        Self {
            keyword,
            direction,
            nodes: IndexMap::new(),
            edges: Vec::new(),
            subgraphs: Vec::new(),
            class_defs: IndexMap::new(),
            edge_default_styles: Vec::new(),
            claimed: IndexMap::new(),
            next_subgraph: 0,
        }
    }

    fn apply_all(&mut self, statements: &[(usize, Stmt)]) -> Result<()> {
        for (line, stmt) in statements {
            self.apply(*line, stmt)?;
        }
        Ok(())
    }

    fn apply(&mut self, line: usize, stmt: &Stmt) -> Result<()> {
        match stmt {
            Stmt::Chain { groups, links } => self.add_chain(groups, links),
            Stmt::Subgraph(block) => {
                self.add_subgraph(block)?;
            }
            Stmt::Direction(dir) => self.direction = *dir,
            Stmt::Style { target, styles } => {
                self.ensure_vertex(target).styles.extend(styles.iter().cloned());
            }
            Stmt::ClassDef { names, styles } => {
                for name in names {
                    self.class_defs
                        .entry(name.clone())
                        .or_default()
                        .extend(styles.iter().cloned());
                }
            }
            Stmt::ClassAssign {
                targets,
                class_name,
            } => {
                for target in targets {
                    let node = self.ensure_vertex(target);
                    if !node.classes.contains(class_name) {
                        node.classes.push(class_name.clone());
                    }
                }
            }
            Stmt::LinkStyle { positions, styles } => self.apply_link_style(line, positions, styles)?,
        }
        Ok(())
    }

    fn ensure_vertex(&mut self, id: &str) -> &mut FlowNode {
        self.nodes
            .entry(id.to_string())
            .or_insert_with(|| FlowNode {
                id: id.to_string(),
                label: id.to_string(),
                shape: NodeShape::Rect,
                classes: Vec::new(),
                styles: Vec::new(),
            })
    }

    fn add_vertex(&mut self, node: &NodeRef) {
        let vertex = self.ensure_vertex(&node.id);
        if let Some(label) = &node.label {
            // The last explicit declaration wins, as in Mermaid.
            vertex.label = label.text.clone();
            vertex.shape = label.shape;
        }
        if let Some(class) = &node.class {
            if !vertex.classes.contains(class) {
                vertex.classes.push(class.clone());
            }
        }
    }

    fn add_chain(&mut self, groups: &[Vec<NodeRef>], links: &[LinkToken]) {
        for group in groups {
            for node in group {
                self.add_vertex(node);
            }
        }

        for (i, link) in links.iter().enumerate() {
            for from in &groups[i] {
                for to in &groups[i + 1] {
                    let ordinal = self
                        .edges
                        .iter()
                        .filter(|e| e.from == from.id && e.to == to.id)
                        .count();
                    self.edges.push(FlowEdge {
                        id: format!("L_{}_{}_{}", from.id, to.id, ordinal),
                        from: from.id.clone(),
                        to: to.id.clone(),
                        label: link.label.clone().filter(|l| !l.is_empty()),
                        start: link.start,
                        end: link.end,
                        stroke: link.stroke,
                        length: link.length,
                        styles: Vec::new(),
                    });
                }
            }
        }
    }

    fn add_subgraph(&mut self, block: &SubgraphBlock) -> Result<String> {
        let id = match &block.header.id {
            Some(id) => id.clone(),
            None => {
                let id = format!("subGraph{}", self.next_subgraph);
                self.next_subgraph += 1;
                id
            }
        };

        let mut direction = None;
        let mut children = Vec::new();
        let mut mentioned: Vec<String> = Vec::new();

        for (line, stmt) in &block.statements {
            match stmt {
                Stmt::Subgraph(inner) => {
                    // Nested blocks claim their own nodes before the enclosing block does.
                    let child = self.add_subgraph(inner)?;
                    children.push(child);
                }
                Stmt::Direction(dir) => direction = Some(*dir),
                Stmt::Chain { groups, .. } => {
                    for node in groups.iter().flatten() {
                        if !mentioned.contains(&node.id) {
                            mentioned.push(node.id.clone());
                        }
                    }
                    self.apply(*line, stmt)?;
                }
                other => self.apply(*line, other)?,
            }
        }

        let mut nodes = Vec::new();
        for node_id in mentioned {
            if self.claimed.contains_key(&node_id) {
                continue;
            }
            self.claimed.insert(node_id.clone(), id.clone());
            nodes.push(node_id);
        }

        self.subgraphs.push(FlowSubgraph {
            id: id.clone(),
            title: block.header.title.clone(),
            direction,
            nodes,
            children,
        });
        Ok(id)
    }

    fn apply_link_style(
        &mut self,
        line: usize,
        positions: &[LinkStylePos],
        styles: &[String],
    ) -> Result<()> {
        for pos in positions {
            match pos {
                LinkStylePos::Default => {
                    self.edge_default_styles.extend(styles.iter().cloned());
                }
                LinkStylePos::Index(i) => {
                    let count = self.edges.len();
                    let Some(edge) = self.edges.get_mut(*i) else {
                        return Err(Error::parse(
                            line,
                            format!(
                                "linkStyle index {i} is out of bounds; the flowchart has {count} links"
                            ),
                        ));
                    };
                    edge.styles.extend(styles.iter().cloned());
                }
            }
        }
        Ok(())
    }

    fn into_model(self) -> Flowchart {
        Flowchart {
            keyword: self.keyword,
            direction: self.direction,
            nodes: self.nodes.into_values().collect(),
            edges: self.edges,
            subgraphs: self.subgraphs,
            class_defs: self.class_defs,
            edge_default_styles: self.edge_default_styles,
        }
    }
}
