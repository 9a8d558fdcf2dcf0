use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Inspect how locations map onto a linear genome view
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Cli {
    /// Reference sequence list, `name<TAB>length` per line (chrom.sizes or .fai)
    #[arg(long)]
    pub refs: PathBuf,

    /// Reference name aliases, `alias<TAB>name` per line
    #[arg(long)]
    pub aliases: Option<PathBuf>,

    /// Assembly the reference list belongs to
    #[arg(long)]
    pub assembly: Option<String>,

    /// View config in RON format; defaults to the one in the user config directory
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Store the effective view config in the user config directory
    #[arg(long)]
    pub save_config: bool,

    /// Viewport width in pixels
    #[arg(long)]
    pub width: Option<f64>,

    /// Zoom level; all regions are shown if omitted
    #[arg(long)]
    pub bp_per_px: Option<f64>,

    /// Scroll offset in pixels
    #[arg(long, allow_negative_numbers = true)]
    pub offset_px: Option<f64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Parse and normalize location strings
    Parse {
        #[arg(required = true)]
        locs: Vec<String>,
    },

    /// Print the static and dynamic blocks of a view over the locations
    Blocks {
        #[arg(required = true)]
        locs: Vec<String>,
    },

    /// Map viewport pixels to base pairs and back
    Px {
        /// Pixel relative to the viewport's left edge; may be repeated
        #[arg(long = "px", required = true, allow_negative_numbers = true)]
        px: Vec<f64>,

        #[arg(required = true)]
        locs: Vec<String>,
    },

    /// Summarize a bedGraph score track over the visible blocks
    Stats {
        bedgraph: PathBuf,

        #[arg(required = true)]
        locs: Vec<String>,
    },
}
