//! SVG serialization of a [`FlowchartLayout`].
//!
//! Output uses presentation attributes rather than a `<style>` sheet so rasterizers without CSS
//! selector support draw it the same way browsers do. It is a pure function of its inputs.

use crate::flowchart::cylinder_ry;
use crate::model::{FlowchartLayout, LayoutCluster, LayoutEdge, LayoutLabel, LayoutNode};
use crate::text::{DeterministicTextMeasurer, TextStyle};
use flowchart_ai_core::{ArrowHead, FlowEdge, Flowchart, FlowchartConfig, NodeShape, Stroke};
use std::fmt::Write as _;

pub const DEFAULT_DIAGRAM_ID: &str = "flowchart-ai";

#[derive(Debug, Clone, Default)]
pub struct SvgRenderOptions {
    /// Root element id and prefix for marker ids. Defaults to [`DEFAULT_DIAGRAM_ID`].
    pub diagram_id: Option<String>,
}

/// Serializes a laid-out flowchart.
///
/// `chart` supplies labels, arrowheads and styles; `layout` supplies geometry. Both must describe
/// the same flowchart.
pub fn render_flowchart_svg(
    layout: &FlowchartLayout,
    chart: &Flowchart,
    config: &FlowchartConfig,
    options: &SvgRenderOptions,
) -> String {
    let diagram_id = options.diagram_id.as_deref().unwrap_or(DEFAULT_DIAGRAM_ID);
    let ctx = SvgCtx {
        diagram_id,
        config,
        line_height: DeterministicTextMeasurer::default().line_height(&TextStyle {
            font_family: None,
            font_size: config.font_size,
            font_weight: None,
        }),
    };

    let mut out = String::new();
    let _ = write!(
        &mut out,
        r#"<svg id="{id}" xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" role="graphics-document document" aria-roledescription="flowchart" font-family="{font}" font-size="{size}">"#,
        id = escape_xml(diagram_id),
        w = fmt(layout.width),
        h = fmt(layout.height),
        font = escape_xml(&config.font_family),
        size = fmt(config.font_size),
    );

    out.push_str("<defs>");
    markers(&mut out, &ctx);
    out.push_str("</defs>");

    // Outer clusters are drawn first so nested boxes stay visible.
    out.push_str(r#"<g class="clusters">"#);
    for cluster in layout.clusters.iter().rev() {
        render_cluster(&mut out, &ctx, cluster);
    }
    out.push_str("</g>");

    out.push_str(r#"<g class="edgePaths">"#);
    for (i, edge) in layout.edges.iter().enumerate() {
        if let Some(flow_edge) = chart.edges.get(i) {
            render_edge_path(&mut out, &ctx, edge, flow_edge, &chart.edge_default_styles);
        }
    }
    out.push_str("</g>");

    out.push_str(r#"<g class="edgeLabels">"#);
    for (i, edge) in layout.edges.iter().enumerate() {
        let (Some(label), Some(text)) = (
            edge.label.as_ref(),
            chart.edges.get(i).and_then(|e| e.label.as_deref()),
        ) else {
            continue;
        };
        render_edge_label(&mut out, &ctx, label, text);
    }
    out.push_str("</g>");

    out.push_str(r#"<g class="nodes">"#);
    for node in &layout.nodes {
        let Some(flow_node) = chart.node(&node.id) else {
            continue;
        };
        let styles = chart.resolved_node_styles(flow_node);
        render_node(&mut out, &ctx, node, &flow_node.label, &styles);
    }
    out.push_str("</g>");

    out.push_str("</svg>");
    out
}

struct SvgCtx<'a> {
    diagram_id: &'a str,
    config: &'a FlowchartConfig,
    line_height: f64,
}

impl SvgCtx<'_> {
    fn marker_id(&self, base: &str) -> String {
        format!("{}_flowchart-{base}", self.diagram_id)
    }
}

fn markers(out: &mut String, ctx: &SvgCtx<'_>) {
    let color = escape_xml(&ctx.config.line_color);
    let defs = [
        (
            "pointEnd",
            r#"viewBox="0 0 10 10" refX="10" refY="5" markerWidth="8" markerHeight="8""#,
            r#"<path d="M 0 0 L 10 5 L 0 10 z""#,
        ),
        (
            "pointStart",
            r#"viewBox="0 0 10 10" refX="0" refY="5" markerWidth="8" markerHeight="8""#,
            r#"<path d="M 0 5 L 10 10 L 10 0 z""#,
        ),
        (
            "circleEnd",
            r#"viewBox="0 0 10 10" refX="10" refY="5" markerWidth="11" markerHeight="11""#,
            r#"<circle cx="5" cy="5" r="5""#,
        ),
        (
            "circleStart",
            r#"viewBox="0 0 10 10" refX="0" refY="5" markerWidth="11" markerHeight="11""#,
            r#"<circle cx="5" cy="5" r="5""#,
        ),
        (
            "crossEnd",
            r#"viewBox="0 0 11 11" refX="6" refY="5.5" markerWidth="11" markerHeight="11""#,
            r#"<path d="M 1,1 l 9,9 M 10,1 l -9,9" stroke-width="2""#,
        ),
        (
            "crossStart",
            r#"viewBox="0 0 11 11" refX="5" refY="5.5" markerWidth="11" markerHeight="11""#,
            r#"<path d="M 1,1 l 9,9 M 10,1 l -9,9" stroke-width="2""#,
        ),
    ];
    for (name, geometry, shape) in defs {
        let _ = write!(
            out,
            r#"<marker id="{id}" {geometry} markerUnits="userSpaceOnUse" orient="auto">{shape} fill="{color}" stroke="{color}"/></marker>"#,
            id = escape_xml(&ctx.marker_id(name)),
        );
    }
}

fn marker_name(head: ArrowHead, end: bool) -> Option<&'static str> {
    match (head, end) {
        (ArrowHead::None, _) => None,
        (ArrowHead::Arrow, true) => Some("pointEnd"),
        (ArrowHead::Arrow, false) => Some("pointStart"),
        (ArrowHead::Circle, true) => Some("circleEnd"),
        (ArrowHead::Circle, false) => Some("circleStart"),
        (ArrowHead::Cross, true) => Some("crossEnd"),
        (ArrowHead::Cross, false) => Some("crossStart"),
    }
}

fn render_cluster(out: &mut String, ctx: &SvgCtx<'_>, cluster: &LayoutCluster) {
    let _ = write!(
        out,
        r#"<g class="cluster" id="{id}"><rect x="{x}" y="{y}" width="{w}" height="{h}" fill="{fill}" stroke="{stroke}" stroke-width="1"/>"#,
        id = escape_xml(&cluster.id),
        x = fmt(cluster.x),
        y = fmt(cluster.y),
        w = fmt(cluster.width),
        h = fmt(cluster.height),
        fill = escape_xml(&ctx.config.cluster_fill),
        stroke = escape_xml(&ctx.config.cluster_stroke),
    );
    let _ = write!(
        out,
        r#"<g class="cluster-label" transform="translate({}, {})">"#,
        fmt(cluster.title_label.x),
        fmt(cluster.title_label.y)
    );
    render_text(out, ctx, &cluster.title, None);
    out.push_str("</g></g>");
}

fn render_edge_path(
    out: &mut String,
    ctx: &SvgCtx<'_>,
    edge: &LayoutEdge,
    flow_edge: &FlowEdge,
    default_styles: &[String],
) {
    let Some((first, rest)) = edge.points.split_first() else {
        return;
    };
    let mut d = format!("M{},{}", fmt(first.x), fmt(first.y));
    for p in rest {
        let _ = write!(&mut d, "L{},{}", fmt(p.x), fmt(p.y));
    }

    let (width, dash, stroke) = match flow_edge.stroke {
        Stroke::Normal => ("2", None, ctx.config.line_color.as_str()),
        Stroke::Thick => ("3.5", None, ctx.config.line_color.as_str()),
        Stroke::Dotted => ("2", Some("3"), ctx.config.line_color.as_str()),
        Stroke::Invisible => ("0", None, "none"),
    };

    let _ = write!(
        out,
        r#"<path id="{id}" class="flowchart-link" d="{d}" fill="none" stroke="{stroke}" stroke-width="{width}""#,
        id = escape_xml(&edge.id),
        stroke = escape_xml(stroke),
    );
    if let Some(dash) = dash {
        let _ = write!(out, r#" stroke-dasharray="{dash}""#);
    }
    if flow_edge.stroke != Stroke::Invisible {
        for (head, end, attr) in [
            (flow_edge.start, false, "marker-start"),
            (flow_edge.end, true, "marker-end"),
        ] {
            if let Some(name) = marker_name(head, end) {
                let _ = write!(
                    out,
                    r#" {attr}="url(#{})""#,
                    escape_xml(&ctx.marker_id(name))
                );
            }
        }
    }
    let css = inline_css(default_styles.iter().chain(&flow_edge.styles));
    if !css.is_empty() {
        let _ = write!(out, r#" style="{}""#, escape_xml(&css));
    }
    out.push_str("/>");
}

fn render_edge_label(out: &mut String, ctx: &SvgCtx<'_>, label: &LayoutLabel, text: &str) {
    let _ = write!(
        out,
        r#"<g class="edgeLabel" transform="translate({}, {})"><rect x="{}" y="{}" width="{}" height="{}" fill="{}"/>"#,
        fmt(label.x),
        fmt(label.y),
        fmt(-label.width / 2.0),
        fmt(-label.height / 2.0),
        fmt(label.width),
        fmt(label.height),
        escape_xml(&ctx.config.edge_label_background),
    );
    render_text(out, ctx, text, None);
    out.push_str("</g>");
}

fn render_node(
    out: &mut String,
    ctx: &SvgCtx<'_>,
    node: &LayoutNode,
    label: &str,
    styles: &[String],
) {
    let (shape_styles, text_color) = split_text_color(styles);
    let css = inline_css(shape_styles.iter().copied());
    let paint = if css.is_empty() {
        format!(
            r#"fill="{}" stroke="{}" stroke-width="1""#,
            escape_xml(&ctx.config.node_fill),
            escape_xml(&ctx.config.node_stroke)
        )
    } else {
        format!(
            r#"fill="{}" stroke="{}" stroke-width="1" style="{}""#,
            escape_xml(&ctx.config.node_fill),
            escape_xml(&ctx.config.node_stroke),
            escape_xml(&css)
        )
    };

    let _ = write!(
        out,
        r#"<g class="node" id="{}-{}" transform="translate({}, {})">"#,
        escape_xml(ctx.diagram_id),
        escape_xml(&node.id),
        fmt(node.x),
        fmt(node.y)
    );
    shape_outline(out, node, &paint);
    render_text(out, ctx, label, text_color);
    out.push_str("</g>");
}

/// Writes the outline of `node` centered on the origin.
fn shape_outline(out: &mut String, node: &LayoutNode, paint: &str) {
    let w = node.width;
    let h = node.height;
    let (hw, hh) = (w / 2.0, h / 2.0);

    let rect = |out: &mut String, radius: f64| {
        let _ = write!(
            out,
            r#"<rect x="{}" y="{}" width="{}" height="{}" rx="{r}" ry="{r}" {paint}/>"#,
            fmt(-hw),
            fmt(-hh),
            fmt(w),
            fmt(h),
            r = fmt(radius),
        );
    };

    match node.shape {
        NodeShape::Rect => rect(out, 0.0),
        NodeShape::Round => rect(out, 5.0),
        NodeShape::Stadium => rect(out, hh),
        NodeShape::Subroutine => {
            rect(out, 0.0);
            for x in [-hw + 8.0, hw - 8.0] {
                let _ = write!(
                    out,
                    r#"<line x1="{x}" y1="{}" x2="{x}" y2="{}" {paint}/>"#,
                    fmt(-hh),
                    fmt(hh),
                    x = fmt(x),
                );
            }
        }
        NodeShape::Cylinder => {
            let ry = cylinder_ry(w);
            let body = h - 2.0 * ry;
            let _ = write!(
                out,
                r#"<path d="M{x},{top} a{rx},{ry} 0,0,0 {w},0 a{rx},{ry} 0,0,0 -{w},0 l0,{body} a{rx},{ry} 0,0,0 {w},0 l0,-{body}" {paint}/>"#,
                x = fmt(-hw),
                top = fmt(-hh + ry),
                rx = fmt(hw),
                ry = fmt(ry),
                w = fmt(w),
                body = fmt(body),
            );
        }
        NodeShape::Circle => {
            let _ = write!(out, r#"<circle cx="0" cy="0" r="{}" {paint}/>"#, fmt(hw));
        }
        shape => {
            let points = polygon_points(shape, hw, hh);
            let joined = points
                .iter()
                .map(|(x, y)| format!("{},{}", fmt(*x), fmt(*y)))
                .collect::<Vec<_>>()
                .join(" ");
            let _ = write!(out, r#"<polygon points="{joined}" {paint}/>"#);
        }
    }
}

fn polygon_points(shape: NodeShape, hw: f64, hh: f64) -> Vec<(f64, f64)> {
    let slant = hh;
    match shape {
        NodeShape::Diamond => vec![(0.0, -hh), (hw, 0.0), (0.0, hh), (-hw, 0.0)],
        NodeShape::Hexagon => {
            let m = hh / 2.0;
            vec![
                (-hw + m, -hh),
                (hw - m, -hh),
                (hw, 0.0),
                (hw - m, hh),
                (-hw + m, hh),
                (-hw, 0.0),
            ]
        }
        NodeShape::LeanRight => vec![(-hw + slant, -hh), (hw, -hh), (hw - slant, hh), (-hw, hh)],
        NodeShape::LeanLeft => vec![(-hw, -hh), (hw - slant, -hh), (hw, hh), (-hw + slant, hh)],
        NodeShape::Trapezoid => vec![(-hw + slant, -hh), (hw - slant, -hh), (hw, hh), (-hw, hh)],
        NodeShape::InvTrapezoid => {
            vec![(-hw, -hh), (hw, -hh), (hw - slant, hh), (-hw + slant, hh)]
        }
        NodeShape::Asymmetric => vec![
            (-hw, -hh),
            (hw, -hh),
            (hw, hh),
            (-hw, hh),
            (-hw + hh / 2.0, 0.0),
        ],
        _ => vec![(-hw, -hh), (hw, -hh), (hw, hh), (-hw, hh)],
    }
}

/// Writes a centered, possibly multi-line label at the current origin.
fn render_text(out: &mut String, ctx: &SvgCtx<'_>, text: &str, color: Option<&str>) {
    let lines = DeterministicTextMeasurer::normalized_text_lines(text);
    let fill = color.unwrap_or(&ctx.config.text_color);
    let _ = write!(
        out,
        r#"<text text-anchor="middle" dominant-baseline="central" fill="{}">"#,
        escape_xml(fill)
    );
    let first = -(lines.len().saturating_sub(1) as f64) * ctx.line_height / 2.0;
    for (i, line) in lines.iter().enumerate() {
        let _ = write!(
            out,
            r#"<tspan x="0" y="{}">{}</tspan>"#,
            fmt(first + i as f64 * ctx.line_height),
            escape_xml(line)
        );
    }
    out.push_str("</text>");
}

/// Separates `color:` declarations (label colour) from the shape styles.
fn split_text_color(styles: &[String]) -> (Vec<&str>, Option<&str>) {
    let mut shape = Vec::new();
    let mut color = None;
    for s in styles {
        match s.split_once(':') {
            Some((key, value)) if key.trim().eq_ignore_ascii_case("color") => {
                color = Some(value.trim());
            }
            _ => shape.push(s.as_str()),
        }
    }
    (shape, color)
}

fn inline_css<I, S>(styles: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    styles
        .into_iter()
        .map(|s| s.as_ref().trim().trim_end_matches(';').to_string())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(";")
}

fn fmt(v: f64) -> String {
    if !v.is_finite() {
        return "0".to_string();
    }
    let mut v = if v.abs() < 1e-9 { 0.0 } else { v };
    let nearest = v.round();
    if (v - nearest).abs() < 1e-6 {
        v = nearest;
    }
    let s = format!("{:.3}", v);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" { "0".to_string() } else { s.to_string() }
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
