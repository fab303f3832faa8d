#![forbid(unsafe_code)]

//! `flowchart-ai` turns AI-generated flowchart descriptions into SVG and PNG, headlessly.
//!
//! The parser, semantic model and text auto-formatters are re-exported from
//! `flowchart-ai-core`. Layout and SVG emission live in `flowchart-ai-render` and are exposed
//! here through [`render::HeadlessRenderer`].
//!
//! # Features
//!
//! - `render`: layout + SVG rendering (`flowchart_ai::render`)
//! - `raster`: PNG export via pure-Rust SVG rasterization, plus the edit/view
//!   [`session::DiagramSession`]

pub use flowchart_ai_core::*;

#[cfg(feature = "raster")]
pub mod session;

#[cfg(feature = "render")]
pub mod render {
    pub use flowchart_ai_render::model::FlowchartLayout;
    pub use flowchart_ai_render::svg::{
        DEFAULT_DIAGRAM_ID, SvgRenderOptions, render_flowchart_svg,
    };
    pub use flowchart_ai_render::text::{DeterministicTextMeasurer, TextMeasurer};
    pub use flowchart_ai_render::{LayoutOptions, layout_flowchart};

    use flowchart_ai_core::{Engine, Flowchart, FlowchartConfig};

    #[cfg(feature = "raster")]
    pub mod raster;

    /// Fixed prefix of every user-facing render failure.
    pub const RENDER_ERROR_PREFIX: &str = "Failed to render flowchart. Syntax error from AI.";

    #[derive(Debug, thiserror::Error)]
    pub enum HeadlessError {
        #[error(transparent)]
        Parse(#[from] flowchart_ai_core::Error),
        #[error(transparent)]
        Render(#[from] flowchart_ai_render::Error),
    }

    pub type Result<T> = std::result::Result<T, HeadlessError>;

    /// A render failure as shown in place of the diagram.
    ///
    /// Displays as [`RENDER_ERROR_PREFIX`], followed by a space and `details` when there are any.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct RenderError {
        pub details: String,
    }

    impl RenderError {
        pub fn new(details: impl Into<String>) -> Self {
            Self {
                details: details.into(),
            }
        }
    }

    impl std::fmt::Display for RenderError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            if self.details.is_empty() {
                f.write_str(RENDER_ERROR_PREFIX)
            } else {
                write!(f, "{RENDER_ERROR_PREFIX} {}", self.details)
            }
        }
    }

    impl std::error::Error for RenderError {}

    impl From<HeadlessError> for RenderError {
        fn from(err: HeadlessError) -> Self {
            Self::new(err.to_string())
        }
    }

    /// SVG markup produced by one successful render.
    ///
    /// `render_id` is unique per render call and never embedded in `svg`; equality only looks at
    /// the markup.
    #[derive(Debug, Clone)]
    pub struct RenderedDiagram {
        pub render_id: String,
        pub svg: String,
    }

    impl PartialEq for RenderedDiagram {
        fn eq(&self, other: &Self) -> bool {
            self.svg == other.svg
        }
    }

    impl Eq for RenderedDiagram {}

    /// Converts an arbitrary string into a conservative SVG `id` token.
    ///
    /// The root id prefixes the marker ids under `<defs>`, so two inlined diagrams sharing an id
    /// would share markers too. Unsupported characters become `-`, runs of `-` collapse, and an
    /// id that does not start with an ASCII letter gets an `fc-` prefix.
    pub fn sanitize_svg_id(raw: &str) -> String {
        let mut out = String::with_capacity(raw.len() + 3);
        for ch in raw.trim().chars() {
            let ch = if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | ':' | '.') {
                ch
            } else {
                '-'
            };
            if ch == '-' && out.ends_with('-') {
                continue;
            }
            out.push(ch);
        }

        let trimmed = out.trim_matches('-');
        if trimmed.is_empty() {
            return DEFAULT_DIAGRAM_ID.to_string();
        }
        if trimmed.starts_with(|c: char| c.is_ascii_alphabetic()) {
            trimmed.to_string()
        } else {
            format!("fc-{trimmed}")
        }
    }

    /// Synchronous parse + layout helper (executor-free).
    pub fn layout_flowchart_sync(
        engine: &Engine,
        text: &str,
        layout_options: &LayoutOptions,
    ) -> Result<(Flowchart, FlowchartLayout)> {
        let chart = engine.parse_flowchart_sync(text)?;
        let layout = flowchart_ai_render::layout(&chart, engine.config(), layout_options)?;
        Ok((chart, layout))
    }

    pub async fn layout_flowchart_text(
        engine: &Engine,
        text: &str,
        layout_options: &LayoutOptions,
    ) -> Result<(Flowchart, FlowchartLayout)> {
        layout_flowchart_sync(engine, text, layout_options)
    }

    /// Synchronous SVG render helper (executor-free).
    pub fn render_svg_sync(
        engine: &Engine,
        text: &str,
        layout_options: &LayoutOptions,
        svg_options: &SvgRenderOptions,
    ) -> Result<String> {
        let (chart, layout) = layout_flowchart_sync(engine, text, layout_options)?;
        Ok(render_flowchart_svg(
            &layout,
            &chart,
            engine.config(),
            svg_options,
        ))
    }

    pub async fn render_svg(
        engine: &Engine,
        text: &str,
        layout_options: &LayoutOptions,
        svg_options: &SvgRenderOptions,
    ) -> Result<String> {
        render_svg_sync(engine, text, layout_options, svg_options)
    }

    /// Bundles an [`Engine`] with layout and SVG options.
    ///
    /// All work is CPU-bound and performs no I/O, so the async methods simply run inline and
    /// work under any executor.
    #[derive(Debug, Clone, Default)]
    pub struct HeadlessRenderer {
        pub engine: Engine,
        pub layout: LayoutOptions,
        pub svg: SvgRenderOptions,
    }

    impl HeadlessRenderer {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_config(mut self, config: FlowchartConfig) -> Self {
            self.engine = self.engine.with_config(config);
            self
        }

        pub fn with_diagram_id(mut self, diagram_id: &str) -> Self {
            self.svg.diagram_id = Some(sanitize_svg_id(diagram_id));
            self
        }

        pub fn parse_flowchart_sync(&self, text: &str) -> Result<Flowchart> {
            Ok(self.engine.parse_flowchart_sync(text)?)
        }

        pub fn layout_flowchart_sync(&self, text: &str) -> Result<(Flowchart, FlowchartLayout)> {
            layout_flowchart_sync(&self.engine, text, &self.layout)
        }

        pub fn render_svg_sync(&self, text: &str) -> Result<String> {
            render_svg_sync(&self.engine, text, &self.layout, &self.svg)
        }

        /// Renders a diagram source into a [`RenderedDiagram`] with a fresh `render_id`.
        pub fn render_sync(&self, source: &str) -> std::result::Result<RenderedDiagram, RenderError> {
            let svg = self.render_svg_sync(source).map_err(|err| {
                tracing::debug!(%err, "flowchart render failed");
                RenderError::from(err)
            })?;
            Ok(RenderedDiagram {
                render_id: uuid::Uuid::new_v4().to_string(),
                svg,
            })
        }

        pub async fn render(
            &self,
            source: &str,
        ) -> std::result::Result<RenderedDiagram, RenderError> {
            self.render_sync(source)
        }

        #[cfg(feature = "raster")]
        pub fn render_png_sync(
            &self,
            text: &str,
            raster: &raster::RasterOptions,
        ) -> raster::Result<Vec<u8>> {
            let svg = self.render_svg_sync(text)?;
            raster::svg_to_png(&svg, raster)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        const BASIC: &str = "graph TD\n    A([\"Start\"]) --> B{\"ok?\"}\n    B -->|Yes| C[\"Done\"]\n";

        #[test]
        fn render_error_display_carries_the_fixed_prefix() {
            assert_eq!(RenderError::new("").to_string(), RENDER_ERROR_PREFIX);
            assert_eq!(
                RenderError::new("Parse error on line 2: boom").to_string(),
                "Failed to render flowchart. Syntax error from AI. Parse error on line 2: boom"
            );
        }

        #[test]
        fn render_is_deterministic_and_ids_are_fresh() {
            let renderer = HeadlessRenderer::new();
            let a = renderer.render_sync(BASIC).unwrap();
            let b = renderer.render_sync(BASIC).unwrap();
            assert_eq!(a.svg, b.svg);
            assert_eq!(a, b);
            assert_ne!(a.render_id, b.render_id);
            assert!(!a.svg.contains(&a.render_id));
        }

        #[test]
        fn fenced_source_renders_like_the_bare_source() {
            let renderer = HeadlessRenderer::new();
            let fenced = format!("```mermaid\n{BASIC}```\n");
            assert_eq!(
                renderer.render_sync(&fenced).unwrap().svg,
                renderer.render_sync(BASIC).unwrap().svg
            );
        }

        #[test]
        fn malformed_source_reports_line_number_with_prefix() {
            let renderer = HeadlessRenderer::new();
            let err = renderer
                .render_sync("graph TD\n    A[\"unterminated --> B\n")
                .unwrap_err();
            let msg = err.to_string();
            assert!(msg.starts_with(RENDER_ERROR_PREFIX), "{msg}");
            assert!(msg.contains("line 2"), "{msg}");
        }

        #[test]
        fn async_render_matches_sync() {
            let renderer = HeadlessRenderer::new();
            let sync = renderer.render_sync(BASIC).unwrap();
            let async_ = futures::executor::block_on(renderer.render(BASIC)).unwrap();
            assert_eq!(sync, async_);
        }

        #[test]
        fn async_free_functions_match_sync() {
            let engine = Engine::new();
            let layout_options = LayoutOptions::default();
            let svg_options = SvgRenderOptions::default();

            let laid_out = futures::executor::block_on(layout_flowchart_text(
                &engine,
                BASIC,
                &layout_options,
            ))
            .unwrap();
            assert_eq!(
                laid_out,
                layout_flowchart_sync(&engine, BASIC, &layout_options).unwrap()
            );
            assert_eq!(laid_out.1.nodes.len(), 3);

            let svg = futures::executor::block_on(render_svg(
                &engine,
                BASIC,
                &layout_options,
                &svg_options,
            ))
            .unwrap();
            assert_eq!(
                svg,
                render_svg_sync(&engine, BASIC, &layout_options, &svg_options).unwrap()
            );

            let err = futures::executor::block_on(render_svg(
                &engine,
                "graph TD\n    A[\"unterminated --> B\n",
                &layout_options,
                &svg_options,
            ))
            .unwrap_err();
            assert!(matches!(err, HeadlessError::Parse(_)), "{err:?}");
        }

        #[cfg(feature = "raster")]
        #[test]
        fn render_png_sync_rasterizes_at_the_requested_scale() {
            fn png_width(bytes: &[u8]) -> u32 {
                png::Decoder::new(bytes).read_info().unwrap().info().width
            }

            let renderer = HeadlessRenderer::new();
            let png = renderer
                .render_png_sync(BASIC, &raster::RasterOptions::default())
                .unwrap();
            assert!(png.starts_with(b"\x89PNG\r\n\x1a\n"));
            assert_eq!(
                png,
                raster::svg_to_png(
                    &renderer.render_svg_sync(BASIC).unwrap(),
                    &raster::RasterOptions::default()
                )
                .unwrap()
            );

            let unscaled = renderer
                .render_png_sync(
                    BASIC,
                    &raster::RasterOptions {
                        scale: 1.0,
                        background: None,
                    },
                )
                .unwrap();
            let (w1, w5) = (png_width(&unscaled), png_width(&png));
            assert!(w5.abs_diff(5 * w1) <= 5, "{w1} vs {w5}");

            let err = renderer
                .render_png_sync("graph TD\n    A[\"unterminated --> B\n", &Default::default())
                .unwrap_err();
            assert!(matches!(err, raster::RasterError::Headless(_)), "{err:?}");
        }

        #[test]
        fn diagram_id_prefixes_markers() {
            let renderer = HeadlessRenderer::new().with_diagram_id("my chart");
            let svg = renderer.render_svg_sync(BASIC).unwrap();
            assert!(svg.contains(r#"id="my-chart""#), "{svg}");
            assert!(svg.contains("my-chart_flowchart-pointEnd"));
        }

        #[test]
        fn sanitize_svg_id_is_conservative() {
            assert_eq!(sanitize_svg_id("  "), DEFAULT_DIAGRAM_ID);
            assert_eq!(sanitize_svg_id("a b//c"), "a-b-c");
            assert_eq!(sanitize_svg_id("9lives"), "fc-9lives");
            assert_eq!(sanitize_svg_id("--x--"), "x");
        }
    }
}
