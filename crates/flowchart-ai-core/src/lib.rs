#![forbid(unsafe_code)]

//! Flowchart parser + semantic model (headless).
//!
//! Design goals:
//! - accept the Mermaid flowchart subset emitted by text-generation models
//! - deterministic, testable outputs (the same text always yields the same model)
//! - runtime-agnostic async APIs (no specific executor required)

pub mod autoformat;
pub mod config;
pub mod diagrams;
pub mod error;
pub mod generation;
pub mod help;
pub mod preprocess;

pub use config::FlowchartConfig;
pub use diagrams::flowchart::{
    ArrowHead, Direction, Flowchart, FlowEdge, FlowNode, FlowSubgraph, NodeShape, Stroke,
};
pub use error::{Error, Result};
pub use generation::{GenerationError, ResultBundle, TextGenerator, parse_generation_response};
pub use preprocess::{render_normalize, strip_code_fence};

#[derive(Debug, Clone, Default)]
pub struct Engine {
    config: FlowchartConfig,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: FlowchartConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &FlowchartConfig {
        &self.config
    }

    /// Parses a flowchart description into its semantic model.
    ///
    /// The text is normalized first (code fences, CRLF line endings), so the raw output of a
    /// text-generation call can be passed in as-is.
    pub fn parse_flowchart_sync(&self, text: &str) -> Result<Flowchart> {
        let code = render_normalize(text);
        let flowchart = diagrams::flowchart::parse_flowchart(&code)?;
        tracing::debug!(
            nodes = flowchart.nodes.len(),
            edges = flowchart.edges.len(),
            subgraphs = flowchart.subgraphs.len(),
            "parsed flowchart"
        );
        Ok(flowchart)
    }

    pub async fn parse_flowchart(&self, text: &str) -> Result<Flowchart> {
        self.parse_flowchart_sync(text)
    }
}

#[cfg(test)]
mod tests;
