//! Boundary to the external text-generation collaborator.
//!
//! The collaborator turns source code into a [`ResultBundle`]. This module owns the response
//! contract (a JSON object with exactly three string fields, possibly wrapped in a code fence)
//! and the user-facing failure messages; the transport itself lives behind [`TextGenerator`].

use crate::preprocess::strip_code_fence;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    #[error(
        "You have hit the free tier rate limit. Please wait about 60 seconds and try again. If you need more, consider a higher billing tier."
    )]
    RateLimited,

    #[error("Malformed generation response: {message}")]
    MalformedResponse { message: String },

    #[error("{message}")]
    Upstream { message: String },
}

impl GenerationError {
    /// Classifies an error message reported by the upstream service.
    ///
    /// Any message mentioning HTTP status `429` is treated as rate limiting.
    pub fn from_upstream_message(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.contains("429") {
            Self::RateLimited
        } else {
            Self::Upstream { message }
        }
    }
}

/// The three artifacts of one generation cycle.
///
/// Replaced wholesale on every new generation; each field may be edited in place afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResultBundle {
    /// Flowchart description (the diagram source).
    pub flowchart: String,
    /// Numbered-step algorithm text.
    pub algorithm: String,
    /// Indented pseudo-code text.
    #[serde(rename = "pseudoCode")]
    pub pseudo_code: String,
}

/// Something that can turn source code into a raw generation response.
///
/// Implementations return the response text verbatim; [`generate_bundle`] validates it.
pub trait TextGenerator {
    fn generate(
        &self,
        source_code: &str,
    ) -> impl std::future::Future<Output = Result<String, GenerationError>>;
}

/// Parses a raw generation response into a [`ResultBundle`].
///
/// A surrounding ```` ```json ```` fence is stripped first. The JSON must be an object with exactly
/// the string fields `flowchart`, `algorithm` and `pseudoCode`.
///
/// ```
/// use flowchart_ai_core::parse_generation_response;
///
/// let raw = "```json\n{\"flowchart\":\"graph TD\\nA-->B\",\"algorithm\":\"1. A\",\"pseudoCode\":\"A\"}\n```";
/// let bundle = parse_generation_response(raw).unwrap();
/// assert_eq!(bundle.algorithm, "1. A");
/// ```
pub fn parse_generation_response(raw: &str) -> Result<ResultBundle, GenerationError> {
    let cleaned = strip_code_fence(raw);
    serde_json::from_str::<ResultBundle>(cleaned).map_err(|err| {
        GenerationError::MalformedResponse {
            message: err.to_string(),
        }
    })
}

/// Runs one generation cycle: asks `generator` for a response and validates it.
pub async fn generate_bundle<G: TextGenerator>(
    generator: &G,
    source_code: &str,
) -> Result<ResultBundle, GenerationError> {
    let raw = generator.generate(source_code).await?;
    let bundle = parse_generation_response(&raw);
    match &bundle {
        Ok(b) => tracing::debug!(
            flowchart_len = b.flowchart.len(),
            algorithm_len = b.algorithm.len(),
            pseudo_code_len = b.pseudo_code.len(),
            "generation response accepted"
        ),
        Err(err) => tracing::warn!(%err, "generation response rejected"),
    }
    bundle
}
