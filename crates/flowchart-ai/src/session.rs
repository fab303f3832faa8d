//! The diagram session: one owned value holding everything a flowchart view needs.
//!
//! State changes only through [`Command`]s. [`DiagramSession::apply`] is the pure transition and
//! hands back a [`RenderRequest`] when the new state needs a render; the caller runs the render
//! (synchronously or on an executor) and reports it through [`DiagramSession::complete_render`].
//! Every request carries a generation number, so a completion that arrives after a newer request
//! was issued is discarded.

use crate::render::raster::{ExportedImage, RasterOptions, export_png};
use crate::render::{HeadlessRenderer, RenderError, RenderedDiagram};
use flowchart_ai_core::ResultBundle;
use flowchart_ai_core::autoformat::{normalize_indentation, normalize_numbered_list};

pub const MIN_ZOOM_TENTHS: u8 = 5;
pub const MAX_ZOOM_TENTHS: u8 = 20;
pub const DEFAULT_ZOOM_TENTHS: u8 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Viewing,
    Editing,
}

impl Mode {
    pub fn toggled(self) -> Self {
        match self {
            Self::Viewing => Self::Editing,
            Self::Editing => Self::Viewing,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomStep {
    In,
    Out,
}

/// Display zoom, kept in tenths so repeated steps never accumulate float error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewTransform {
    tenths: u8,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            tenths: DEFAULT_ZOOM_TENTHS,
        }
    }
}

impl ViewTransform {
    pub fn scale(self) -> f64 {
        f64::from(self.tenths) / 10.0
    }

    pub fn tenths(self) -> u8 {
        self.tenths
    }

    /// Zoom as a whole percentage, for labels such as `150%`.
    pub fn percent(self) -> u32 {
        (self.scale() * 100.0).round() as u32
    }

    pub fn zoom_in(&mut self) {
        self.tenths = (self.tenths + 1).min(MAX_ZOOM_TENTHS);
    }

    pub fn zoom_out(&mut self) {
        self.tenths = self.tenths.saturating_sub(1).max(MIN_ZOOM_TENTHS);
    }

    pub fn reset(&mut self) {
        self.tenths = DEFAULT_ZOOM_TENTHS;
    }

    pub fn step(&mut self, step: ZoomStep) {
        match step {
            ZoomStep::In => self.zoom_in(),
            ZoomStep::Out => self.zoom_out(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    EditSource(String),
    ToggleMode,
    Zoom(ZoomStep),
    ResetZoom,
    ReplaceBundle(ResultBundle),
    EditAlgorithm(String),
    EditPseudoCode(String),
    FormatAlgorithm,
    FormatPseudoCode,
}

/// A render the session wants performed, with the source snapshot it applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    pub generation: u64,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    Rendered(RenderedDiagram),
    Failed(RenderError),
}

#[derive(Debug, Default)]
pub struct DiagramSession {
    bundle: ResultBundle,
    mode: Mode,
    view: ViewTransform,
    outcome: Option<RenderOutcome>,
    generation: u64,
    renderer: HeadlessRenderer,
}

impl DiagramSession {
    pub fn new(renderer: HeadlessRenderer) -> Self {
        Self {
            renderer,
            ..Self::default()
        }
    }

    pub fn bundle(&self) -> &ResultBundle {
        &self.bundle
    }

    pub fn source(&self) -> &str {
        &self.bundle.flowchart
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn view(&self) -> ViewTransform {
        self.view
    }

    pub fn outcome(&self) -> Option<&RenderOutcome> {
        self.outcome.as_ref()
    }

    pub fn rendered(&self) -> Option<&RenderedDiagram> {
        match &self.outcome {
            Some(RenderOutcome::Rendered(diagram)) => Some(diagram),
            _ => None,
        }
    }

    pub fn render_error(&self) -> Option<&RenderError> {
        match &self.outcome {
            Some(RenderOutcome::Failed(err)) => Some(err),
            _ => None,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn renderer(&self) -> &HeadlessRenderer {
        &self.renderer
    }

    /// Applies a command and returns the render it calls for, if any.
    pub fn apply(&mut self, command: Command) -> Option<RenderRequest> {
        match command {
            Command::EditSource(source) => {
                self.bundle.flowchart = source;
                self.render_if_viewing()
            }
            Command::ToggleMode => {
                self.mode = self.mode.toggled();
                tracing::debug!(mode = ?self.mode, "diagram mode toggled");
                self.render_if_viewing()
            }
            Command::Zoom(step) => {
                if self.mode == Mode::Viewing {
                    self.view.step(step);
                }
                None
            }
            Command::ResetZoom => {
                if self.mode == Mode::Viewing {
                    self.view.reset();
                }
                None
            }
            Command::ReplaceBundle(bundle) => {
                self.bundle = bundle;
                self.render_if_viewing()
            }
            Command::EditAlgorithm(text) => {
                self.bundle.algorithm = text;
                None
            }
            Command::EditPseudoCode(text) => {
                self.bundle.pseudo_code = text;
                None
            }
            Command::FormatAlgorithm => {
                self.bundle.algorithm = normalize_numbered_list(&self.bundle.algorithm);
                None
            }
            Command::FormatPseudoCode => {
                self.bundle.pseudo_code = normalize_indentation(&self.bundle.pseudo_code);
                None
            }
        }
    }

    fn render_if_viewing(&mut self) -> Option<RenderRequest> {
        if self.mode == Mode::Editing {
            return None;
        }
        // Any older request in flight is stale from here on.
        self.generation += 1;
        if self.bundle.flowchart.trim().is_empty() {
            self.outcome = None;
            return None;
        }
        Some(RenderRequest {
            generation: self.generation,
            source: self.bundle.flowchart.clone(),
        })
    }

    /// Stores the result of `request`. Returns `false` (and keeps the current outcome) when a
    /// newer request has been issued since.
    pub fn complete_render(
        &mut self,
        request: &RenderRequest,
        result: Result<RenderedDiagram, RenderError>,
    ) -> bool {
        if request.generation != self.generation {
            tracing::warn!(
                stale = request.generation,
                latest = self.generation,
                "dropping stale render result"
            );
            return false;
        }
        self.outcome = Some(match result {
            Ok(diagram) => RenderOutcome::Rendered(diagram),
            Err(err) => RenderOutcome::Failed(err),
        });
        true
    }

    /// Applies a command and runs any resulting render inline.
    pub fn dispatch(&mut self, command: Command) {
        if let Some(request) = self.apply(command) {
            let result = self.renderer.render_sync(&request.source);
            self.complete_render(&request, result);
        }
    }

    /// Applies a command and awaits any resulting render.
    pub async fn dispatch_async(&mut self, command: Command) {
        if let Some(request) = self.apply(command) {
            let result = self.renderer.render(&request.source).await;
            self.complete_render(&request, result);
        }
    }

    /// Rasterizes the current diagram.
    ///
    /// Returns `None` while editing, when the last render failed or never happened, and when
    /// rasterization itself fails.
    pub fn export(&self) -> Option<ExportedImage> {
        if self.mode == Mode::Editing {
            return None;
        }
        let diagram = self.rendered()?;
        match export_png(diagram, &RasterOptions::default()) {
            Ok(image) => Some(image),
            Err(err) => {
                tracing::warn!(%err, render_id = %diagram.render_id, "PNG export failed");
                None
            }
        }
    }
}
