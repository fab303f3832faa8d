pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("No flowchart found: the diagram text is empty")]
    EmptyDiagram,

    #[error("Unsupported diagram header on line {line}: expected `graph` or `flowchart`, got `{header}`")]
    UnsupportedHeader { line: usize, header: String },

    #[error("Parse error on line {line}: {message}")]
    DiagramParse { line: usize, message: String },

    #[error("Invalid flowchart config: {message}")]
    InvalidConfig { message: String },
}

impl Error {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::DiagramParse {
            line,
            message: message.into(),
        }
    }
}
