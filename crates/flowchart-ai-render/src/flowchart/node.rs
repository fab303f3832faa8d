use crate::text::TextMetrics;
use flowchart_ai_core::NodeShape;

/// Outline size of a node around a label of the given metrics.
///
/// Padding rules follow the usual Mermaid flowchart proportions: plain rectangles get twice the
/// horizontal padding, slanted shapes grow by half their height so the label clears the slant.
pub(crate) fn node_dimensions(shape: NodeShape, metrics: TextMetrics, padding: f64) -> (f64, f64) {
    let text_w = metrics.width.max(0.0);
    let text_h = metrics.height.max(0.0);
    let p = padding.max(0.0);

    match shape {
        NodeShape::Rect => (text_w + 4.0 * p, text_h + 2.0 * p),
        NodeShape::Round => (text_w + 2.0 * p, text_h + 2.0 * p),
        NodeShape::Stadium => {
            let h = text_h + p;
            (text_w + h / 4.0 + p, h)
        }
        NodeShape::Subroutine => (text_w + p + 16.0, text_h + p),
        NodeShape::Cylinder => {
            let w = text_w + p;
            let ry = cylinder_ry(w);
            (w, text_h + p + 3.0 * ry)
        }
        NodeShape::Circle => {
            let d = (text_w + p).max(text_h + p);
            (d, d)
        }
        NodeShape::Diamond => {
            let s = (text_w + p) + (text_h + p);
            (s, s)
        }
        NodeShape::Hexagon => {
            let h = text_h + p;
            let mut half_width = (text_w + 2.5 * p) / 2.0;
            half_width += half_width / 6.0;
            (half_width * 2.0, h)
        }
        NodeShape::LeanRight
        | NodeShape::LeanLeft
        | NodeShape::Trapezoid
        | NodeShape::InvTrapezoid => {
            let h = text_h + p;
            (text_w + 2.0 * p + h, h)
        }
        NodeShape::Asymmetric => {
            let h = text_h + p;
            (text_w + 2.0 * p + h / 4.0, h)
        }
    }
}

/// Vertical radius of the cylinder caps for a cylinder `width` wide.
pub(crate) fn cylinder_ry(width: f64) -> f64 {
    let rx = width / 2.0;
    rx / (2.5 + width / 50.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(width: f64, height: f64) -> TextMetrics {
        TextMetrics {
            width,
            height,
            line_count: 1,
        }
    }

    #[test]
    fn diamonds_are_square() {
        let (w, h) = node_dimensions(NodeShape::Diamond, metrics(40.0, 19.2), 15.0);
        assert_eq!(w, h);
        assert!((w - 89.2).abs() < 1e-9);
    }

    #[test]
    fn rectangles_pad_twice_horizontally() {
        let (w, h) = node_dimensions(NodeShape::Rect, metrics(40.0, 20.0), 15.0);
        assert_eq!((w, h), (100.0, 50.0));
    }

    #[test]
    fn circles_fit_tall_labels() {
        let (w, h) = node_dimensions(NodeShape::Circle, metrics(10.0, 40.0), 10.0);
        assert_eq!((w, h), (50.0, 50.0));
    }
}
