use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Layout and theme settings shared by the layout engine and the SVG emitter.
///
/// Every field has a default, so a config file only needs the keys it overrides:
///
/// ```
/// use flowchart_ai_core::FlowchartConfig;
///
/// let cfg = FlowchartConfig::from_json_str(r#"{ "fontSize": 14, "rankSpacing": 60 }"#)?;
/// assert_eq!(cfg.font_size, 14.0);
/// assert_eq!(cfg.node_spacing, FlowchartConfig::default().node_spacing);
/// # Ok::<(), flowchart_ai_core::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct FlowchartConfig {
    pub font_family: String,
    pub font_size: f64,
    /// Gap between neighbouring nodes of the same rank.
    pub node_spacing: f64,
    /// Gap between two consecutive ranks.
    pub rank_spacing: f64,
    /// Padding between a node's label and its outline.
    pub node_padding: f64,
    /// Margin around the whole diagram inside the SVG viewBox.
    pub diagram_padding: f64,
    pub cluster_padding: f64,
    pub node_fill: String,
    pub node_stroke: String,
    pub line_color: String,
    pub text_color: String,
    pub cluster_fill: String,
    pub cluster_stroke: String,
    pub edge_label_background: String,
}

impl Default for FlowchartConfig {
    fn default() -> Self {
        Self {
            font_family: "Inter, \"trebuchet ms\", verdana, arial, sans-serif".to_string(),
            font_size: 16.0,
            node_spacing: 50.0,
            rank_spacing: 50.0,
            node_padding: 15.0,
            diagram_padding: 8.0,
            cluster_padding: 8.0,
            node_fill: "#ECECFF".to_string(),
            node_stroke: "#9370DB".to_string(),
            line_color: "#333333".to_string(),
            text_color: "#333".to_string(),
            cluster_fill: "#ffffde".to_string(),
            cluster_stroke: "#aaaa33".to_string(),
            edge_label_background: "#e8e8e8".to_string(),
        }
    }
}

impl FlowchartConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(text).map_err(|e| Error::InvalidConfig {
            message: e.to_string(),
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        let positive = [
            ("fontSize", self.font_size),
            ("nodeSpacing", self.node_spacing),
            ("rankSpacing", self.rank_spacing),
        ];
        for (key, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::InvalidConfig {
                    message: format!("`{key}` must be a positive number, got {value}"),
                });
            }
        }
        let non_negative = [
            ("nodePadding", self.node_padding),
            ("diagramPadding", self.diagram_padding),
            ("clusterPadding", self.cluster_padding),
        ];
        for (key, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(Error::InvalidConfig {
                    message: format!("`{key}` must not be negative, got {value}"),
                });
            }
        }
        Ok(())
    }
}
