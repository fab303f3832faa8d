//! Command-line arguments for `flowchart-ai`.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Parse, lay out and render AI-generated flowcharts, and tidy their companion text.
#[derive(Parser, Debug)]
#[command(name = "flowchart-ai", author, version, about, long_about = None)]
pub struct Args {
    /// Flowchart config (JSON, camelCase keys) used for layout and rendering
    #[arg(long, global = true, value_name = "JSON")]
    pub config: Option<PathBuf>,

    /// Log debug output to stderr (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the semantic model of a flowchart as JSON
    Parse {
        #[arg(long)]
        pretty: bool,
        /// Input file; stdin when omitted or `-`
        input: Option<String>,
    },
    /// Print the computed layout of a flowchart as JSON
    Layout {
        #[arg(long)]
        pretty: bool,
        /// Input file; stdin when omitted or `-`
        input: Option<String>,
    },
    /// Render a flowchart to SVG (stdout by default) or PNG
    Render {
        #[arg(long, value_enum, default_value_t = RenderFormat::Svg)]
        format: RenderFormat,
        /// Output path. PNG defaults to `flowchart-ai-<ms>.png` next to the input
        #[arg(long)]
        out: Option<PathBuf>,
        /// Root SVG id, also used as the marker id prefix
        #[arg(long, value_name = "DIAGRAM_ID")]
        id: Option<String>,
        /// Input file; stdin when omitted or `-`
        input: Option<String>,
    },
    /// Normalize algorithm steps or pseudo-code and print the result
    Format {
        #[arg(value_enum)]
        kind: FormatKind,
        /// Input file; stdin when omitted or `-`
        input: Option<String>,
    },
    /// Validate a generation response and split it into files
    Bundle {
        /// Directory receiving the artifacts (defaults to the current directory)
        #[arg(long)]
        out_dir: Option<PathBuf>,
        /// Run the auto-formatters over the algorithm and pseudo-code first
        #[arg(long)]
        format_text: bool,
        /// Input file; stdin when omitted or `-`
        input: Option<String>,
    },
    /// Print the flowchart syntax cheat sheet
    HelpSyntax,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderFormat {
    #[default]
    Svg,
    Png,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatKind {
    /// Numbered steps (`1. `, `2. `, ...)
    Algorithm,
    /// Keyword-driven indentation
    Pseudocode,
}
