mod args;

use args::{Args, Command, FormatKind, RenderFormat};
use clap::Parser;
use flowchart_ai::autoformat::{normalize_indentation, normalize_numbered_list};
use flowchart_ai::render::raster::{RasterError, RasterOptions, export_png};
use flowchart_ai::render::{HeadlessError, HeadlessRenderer, RenderError};
use flowchart_ai::{FlowchartConfig, GenerationError, parse_generation_response};
use futures::executor::block_on;
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum CliError {
    Io(std::io::Error),
    Flowchart(flowchart_ai::Error),
    Headless(HeadlessError),
    Render(RenderError),
    Raster(RasterError),
    Generation(GenerationError),
    Json(serde_json::Error),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Flowchart(err) => write!(f, "{err}"),
            CliError::Headless(err) => write!(f, "{err}"),
            CliError::Render(err) => write!(f, "{err}"),
            CliError::Raster(err) => write!(f, "PNG export failed: {err}"),
            CliError::Generation(err) => write!(f, "{err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<flowchart_ai::Error> for CliError {
    fn from(value: flowchart_ai::Error) -> Self {
        Self::Flowchart(value)
    }
}

impl From<HeadlessError> for CliError {
    fn from(value: HeadlessError) -> Self {
        Self::Headless(value)
    }
}

impl From<RenderError> for CliError {
    fn from(value: RenderError) -> Self {
        Self::Render(value)
    }
}

impl From<RasterError> for CliError {
    fn from(value: RasterError) -> Self {
        Self::Raster(value)
    }
}

impl From<GenerationError> for CliError {
    fn from(value: GenerationError) -> Self {
        Self::Generation(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn read_input(input: Option<&str>) -> Result<String, CliError> {
    match input {
        None | Some("-") => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
        Some(path) => Ok(std::fs::read_to_string(path)?),
    }
}

fn write_json(value: &impl Serialize, pretty: bool) -> Result<(), CliError> {
    if pretty {
        serde_json::to_writer_pretty(std::io::stdout().lock(), value)?;
    } else {
        serde_json::to_writer(std::io::stdout().lock(), value)?;
    }
    println!();
    Ok(())
}

fn load_config(path: &Path) -> Result<FlowchartConfig, CliError> {
    let text = std::fs::read_to_string(path)?;
    Ok(FlowchartConfig::from_json_str(&text)?)
}

/// Directory of the input file, or the working directory for stdin.
fn default_out_dir(input: Option<&str>) -> PathBuf {
    match input {
        Some(path) if path != "-" => Path::new(path)
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default(),
        _ => PathBuf::new(),
    }
}

fn run(args: Args) -> Result<(), CliError> {
    let mut renderer = HeadlessRenderer::new();
    if let Some(path) = &args.config {
        renderer = renderer.with_config(load_config(path)?);
        tracing::debug!(config = %path.display(), "loaded flowchart config");
    }

    match args.command {
        Command::Parse { pretty, input } => {
            let text = read_input(input.as_deref())?;
            let chart = block_on(renderer.engine.parse_flowchart(&text))?;
            write_json(&chart, pretty)
        }
        Command::Layout { pretty, input } => {
            let text = read_input(input.as_deref())?;
            let (_, layout) = renderer.layout_flowchart_sync(&text)?;
            write_json(&layout, pretty)
        }
        Command::Render {
            format,
            out,
            id,
            input,
        } => {
            if let Some(id) = &id {
                renderer = renderer.with_diagram_id(id);
            }
            let text = read_input(input.as_deref())?;
            let diagram = block_on(renderer.render(&text))?;
            match format {
                RenderFormat::Svg => match out {
                    Some(path) => std::fs::write(path, &diagram.svg)?,
                    None => print!("{}", diagram.svg),
                },
                RenderFormat::Png => {
                    let image = export_png(&diagram, &RasterOptions::default())?;
                    let path = out.unwrap_or_else(|| {
                        default_out_dir(input.as_deref()).join(&image.file_name)
                    });
                    std::fs::write(&path, &image.png)?;
                    println!("{}", path.display());
                }
            }
            Ok(())
        }
        Command::Format { kind, input } => {
            let text = read_input(input.as_deref())?;
            let formatted = match kind {
                FormatKind::Algorithm => normalize_numbered_list(&text),
                FormatKind::Pseudocode => normalize_indentation(&text),
            };
            println!("{formatted}");
            Ok(())
        }
        Command::Bundle {
            out_dir,
            format_text,
            input,
        } => {
            let raw = read_input(input.as_deref())?;
            let mut bundle = parse_generation_response(&raw)?;
            if format_text {
                bundle.algorithm = normalize_numbered_list(&bundle.algorithm);
                bundle.pseudo_code = normalize_indentation(&bundle.pseudo_code);
            }

            let dir = out_dir.unwrap_or_default();
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(&dir)?;
            }
            let mut written = vec![
                (dir.join("flowchart.mmd"), bundle.flowchart.as_str()),
                (dir.join("algorithm.txt"), bundle.algorithm.as_str()),
                (dir.join("pseudocode.txt"), bundle.pseudo_code.as_str()),
            ];
            let rendered = renderer.render_sync(&bundle.flowchart);
            match &rendered {
                Ok(diagram) => written.push((dir.join("flowchart.svg"), diagram.svg.as_str())),
                Err(err) => eprintln!("{err}"),
            }
            for (path, contents) in written {
                std::fs::write(&path, contents)?;
                println!("{}", path.display());
            }
            Ok(())
        }
        Command::HelpSyntax => {
            print!("{}", flowchart_ai::help::syntax_guide());
            Ok(())
        }
    }
}

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);
    tracing::debug!(?args, "parsed arguments");

    if let Err(err) = run(args) {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
