#![forbid(unsafe_code)]

//! PNG export of rendered flowcharts.
//!
//! Exports are supersampled by [`EXPORT_SCALE`] regardless of any display zoom, and drawn over
//! an opaque background so the PNG never carries transparency.

use crate::render::{HeadlessError, RenderedDiagram};

/// Supersampling factor applied to the intrinsic diagram size.
pub const EXPORT_SCALE: f32 = 5.0;

#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    #[error(transparent)]
    Headless(#[from] HeadlessError),
    #[error("SVG markup has no <svg> root element")]
    MissingSvgRoot,
    #[error("failed to parse SVG")]
    SvgParse,
    #[error("failed to allocate pixmap for raster rendering")]
    PixmapAlloc,
    #[error("failed to encode PNG")]
    PngEncode,
}

pub type Result<T> = std::result::Result<T, RasterError>;

#[derive(Debug, Clone)]
pub struct RasterOptions {
    pub scale: f32,
    /// CSS-ish colour (`white`, `#rrggbb`, ...). `None` leaves the pixmap transparent.
    pub background: Option<String>,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            scale: EXPORT_SCALE,
            background: Some("white".to_string()),
        }
    }
}

/// A PNG ready to be saved under `file_name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedImage {
    pub file_name: String,
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}

/// `flowchart-ai-<unix epoch ms>.png`
pub fn export_file_name(epoch_ms: i64) -> String {
    format!("flowchart-ai-{epoch_ms}.png")
}

/// Rasterizes a rendered diagram into a PNG named after the current time.
pub fn export_png(diagram: &RenderedDiagram, options: &RasterOptions) -> Result<ExportedImage> {
    let pixmap = svg_to_pixmap(&diagram.svg, options)?;
    let png = pixmap.encode_png().map_err(|_| RasterError::PngEncode)?;
    let file_name = export_file_name(chrono::Utc::now().timestamp_millis());
    tracing::debug!(
        render_id = %diagram.render_id,
        width = pixmap.width(),
        height = pixmap.height(),
        bytes = png.len(),
        "exported PNG"
    );
    Ok(ExportedImage {
        file_name,
        width: pixmap.width(),
        height: pixmap.height(),
        png,
    })
}

pub fn svg_to_png(svg: &str, options: &RasterOptions) -> Result<Vec<u8>> {
    let pixmap = svg_to_pixmap(svg, options)?;
    pixmap.encode_png().map_err(|_| RasterError::PngEncode)
}

/// Size declared by the root `viewBox`, if it is usable.
///
/// Errors when the markup is not XML or its root element is not `<svg>`.
fn intrinsic_size(svg: &str) -> Result<Option<(f32, f32)>> {
    let doc = roxmltree::Document::parse(svg).map_err(|_| RasterError::SvgParse)?;
    let root = doc.root_element();
    if root.tag_name().name() != "svg" {
        return Err(RasterError::MissingSvgRoot);
    }
    Ok(root.attribute("viewBox").and_then(parse_view_box))
}

fn parse_view_box(raw: &str) -> Option<(f32, f32)> {
    let nums = raw
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|part| !part.is_empty())
        .map(|part| part.parse::<f32>().ok())
        .collect::<Option<Vec<_>>>()?;
    let [_min_x, _min_y, width, height] = nums[..] else {
        return None;
    };
    (width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0)
        .then_some((width, height))
}

fn svg_to_pixmap(svg: &str, options: &RasterOptions) -> Result<tiny_skia::Pixmap> {
    let declared = intrinsic_size(svg)?;

    let mut opt = usvg::Options::default();
    opt.fontdb_mut().load_system_fonts();
    // The SVG asks for a sans-serif stack; pin a common face so exports look alike across hosts.
    opt.font_family = "Arial".to_string();

    let tree = usvg::Tree::from_str(svg, &opt).map_err(|_| RasterError::SvgParse)?;
    let size = tree.size();
    let (width, height) = declared.unwrap_or((size.width(), size.height()));

    let width_px = (width * options.scale).ceil().max(1.0) as u32;
    let height_px = (height * options.scale).ceil().max(1.0) as u32;
    let mut pixmap =
        tiny_skia::Pixmap::new(width_px, height_px).ok_or(RasterError::PixmapAlloc)?;

    if let Some(color) = options.background.as_deref().and_then(parse_tiny_skia_color) {
        pixmap.fill(color);
    }

    // Stretch the drawing over the whole pixmap, whatever its displayed size.
    let transform = tiny_skia::Transform::from_scale(
        width_px as f32 / size.width(),
        height_px as f32 / size.height(),
    );
    resvg::render(&tree, transform, &mut pixmap.as_mut());
    Ok(pixmap)
}

fn parse_tiny_skia_color(text: &str) -> Option<tiny_skia::Color> {
    let s = text.trim().to_ascii_lowercase();
    match s.as_str() {
        "transparent" => return Some(tiny_skia::Color::TRANSPARENT),
        "white" => return Some(tiny_skia::Color::WHITE),
        "black" => return Some(tiny_skia::Color::BLACK),
        _ => {}
    }

    let hex = s.strip_prefix('#')?;
    let digit = |b: u8| (b as char).to_digit(16).map(|v| v as u8);
    let bytes = hex.as_bytes();
    let channels: Vec<u8> = match bytes.len() {
        3 | 4 => bytes
            .iter()
            .map(|&b| digit(b).map(|v| (v << 4) | v))
            .collect::<Option<_>>()?,
        6 | 8 => bytes
            .chunks_exact(2)
            .map(|pair| Some((digit(pair[0])? << 4) | digit(pair[1])?))
            .collect::<Option<_>>()?,
        _ => return None,
    };
    let alpha = channels.get(3).copied().unwrap_or(255);
    Some(tiny_skia::Color::from_rgba8(
        channels[0],
        channels[1],
        channels[2],
        alpha,
    ))
}
