use super::ast::{Document, NodeRef, Stmt, SubgraphBlock};
use super::tokens::{LinkToken, Spanned, SubgraphHeader, Tok};
use crate::{Error, Result};

/// Recursive-descent parser over the token stream produced by the lexer.
pub(super) struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser {
    pub(super) fn new(tokens: Vec<Spanned>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|(line, _)| *line)
            .unwrap_or(1)
    }

    fn next(&mut self) -> Option<Tok> {
        let tok = self.tokens.get(self.pos).map(|(_, t)| t.clone());
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn unexpected(&self, expected: &str) -> Error {
        let line = self.line();
        match self.peek() {
            Some(tok) => Error::parse(
                line,
                format!("expected {expected}, found {}", tok.describe()),
            ),
            None => Error::parse(line, format!("expected {expected}, found end of input")),
        }
    }

    pub(super) fn parse_document(mut self) -> Result<Document> {
        let (keyword, direction) = match self.next() {
            Some(Tok::Header { keyword, direction }) => (keyword, direction),
            _ => return Err(Error::EmptyDiagram),
        };

        let statements = self.parse_block(None)?;
        Ok(Document {
            keyword,
            direction,
            statements,
        })
    }

    /// Parses statements until EOF (top level) or the `end` closing `subgraph`.
    fn parse_block(&mut self, subgraph: Option<&SubgraphHeader>) -> Result<Vec<(usize, Stmt)>> {
        let mut out = Vec::new();
        loop {
            let line = self.line();
            let Some(tok) = self.peek() else {
                return match subgraph {
                    None => Ok(out),
                    Some(header) => Err(Error::parse(
                        line,
                        format!("subgraph \"{}\" is missing its `end`", header.title),
                    )),
                };
            };

            match tok {
                Tok::Sep => {
                    self.pos += 1;
                }
                Tok::End => {
                    if subgraph.is_none() {
                        return Err(Error::parse(line, "`end` without a matching `subgraph`"));
                    }
                    self.pos += 1;
                    return Ok(out);
                }
                Tok::Click => {
                    tracing::debug!(line, "ignoring click statement");
                    self.pos += 1;
                }
                Tok::Subgraph(header) => {
                    let header = header.clone();
                    self.pos += 1;
                    let statements = self.parse_block(Some(&header))?;
                    out.push((line, Stmt::Subgraph(SubgraphBlock { header, statements })));
                }
                Tok::DirectionStmt(dir) => {
                    out.push((line, Stmt::Direction(*dir)));
                    self.pos += 1;
                }
                Tok::Style { target, styles } => {
                    out.push((
                        line,
                        Stmt::Style {
                            target: target.clone(),
                            styles: styles.clone(),
                        },
                    ));
                    self.pos += 1;
                }
                Tok::ClassDef { names, styles } => {
                    out.push((
                        line,
                        Stmt::ClassDef {
                            names: names.clone(),
                            styles: styles.clone(),
                        },
                    ));
                    self.pos += 1;
                }
                Tok::ClassAssign {
                    targets,
                    class_name,
                } => {
                    out.push((
                        line,
                        Stmt::ClassAssign {
                            targets: targets.clone(),
                            class_name: class_name.clone(),
                        },
                    ));
                    self.pos += 1;
                }
                Tok::LinkStyle { positions, styles } => {
                    out.push((
                        line,
                        Stmt::LinkStyle {
                            positions: positions.clone(),
                            styles: styles.clone(),
                        },
                    ));
                    self.pos += 1;
                }
                Tok::Id(_) => {
                    let stmt = self.parse_chain()?;
                    out.push((line, stmt));
                    self.expect_statement_end()?;
                }
                _ => return Err(self.unexpected("a node id or statement")),
            }
        }
    }

    fn expect_statement_end(&mut self) -> Result<()> {
        match self.peek() {
            None | Some(Tok::Sep) => Ok(()),
            _ => Err(self.unexpected("a link or the end of the statement")),
        }
    }

    fn parse_chain(&mut self) -> Result<Stmt> {
        let mut groups = vec![self.parse_group()?];
        let mut links = Vec::new();

        while let Some(Tok::Arrow(_)) = self.peek() {
            links.push(self.parse_link()?);
            groups.push(self.parse_group()?);
        }

        Ok(Stmt::Chain { groups, links })
    }

    fn parse_link(&mut self) -> Result<LinkToken> {
        let Some(Tok::Arrow(mut link)) = self.next() else {
            return Err(self.unexpected("a link"));
        };
        if let Some(Tok::EdgeLabel(text)) = self.peek() {
            link.label = Some(text.clone());
            self.pos += 1;
        }
        Ok(link)
    }

    fn parse_group(&mut self) -> Result<Vec<NodeRef>> {
        let mut group = vec![self.parse_node()?];
        while let Some(Tok::Amp) = self.peek() {
            self.pos += 1;
            group.push(self.parse_node()?);
        }
        Ok(group)
    }

    fn parse_node(&mut self) -> Result<NodeRef> {
        let id = match self.peek() {
            Some(Tok::Id(id)) => id.clone(),
            _ => return Err(self.unexpected("a node id")),
        };
        self.pos += 1;

        let mut node = NodeRef {
            id,
            label: None,
            class: None,
        };
        if let Some(Tok::NodeLabel(label)) = self.peek() {
            node.label = Some(label.clone());
            self.pos += 1;
        }
        if let Some(Tok::ClassShorthand(class)) = self.peek() {
            node.class = Some(class.clone());
            self.pos += 1;
        }
        Ok(node)
    }
}
