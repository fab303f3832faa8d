#![forbid(unsafe_code)]

//! Headless layout and SVG emission for flowchart-ai.
//!
//! The entry point is [`layout_flowchart`], which turns a parsed
//! [`flowchart_ai_core::Flowchart`] into a [`model::FlowchartLayout`]; [`svg::render_flowchart_svg`]
//! then serializes that layout.

pub mod flowchart;
pub mod model;
pub mod svg;
pub mod text;

use crate::model::FlowchartLayout;
use crate::text::{DeterministicTextMeasurer, TextMeasurer};
use flowchart_ai_core::{Flowchart, FlowchartConfig};
use std::sync::Arc;

pub use flowchart::layout_flowchart;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid semantic model: {message}")]
    InvalidModel { message: String },
    #[error("semantic model JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Clone)]
pub struct LayoutOptions {
    pub text_measurer: Arc<dyn TextMeasurer + Send + Sync>,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            text_measurer: Arc::new(DeterministicTextMeasurer::default()),
        }
    }
}

impl std::fmt::Debug for LayoutOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayoutOptions").finish_non_exhaustive()
    }
}

/// Lays out a flowchart with the measurer from `options`.
pub fn layout(
    chart: &Flowchart,
    config: &FlowchartConfig,
    options: &LayoutOptions,
) -> Result<FlowchartLayout> {
    layout_flowchart(chart, config, options.text_measurer.as_ref())
}

/// Lays out a flowchart given as its JSON semantic model (the output of `flowchart-ai parse`).
pub fn layout_json(
    model: &serde_json::Value,
    config: &FlowchartConfig,
    options: &LayoutOptions,
) -> Result<FlowchartLayout> {
    let chart: Flowchart = serde_json::from_value(model.clone())?;
    layout(&chart, config, options)
}
