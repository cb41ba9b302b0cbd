//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint};

use crate::domain::StandIdentity;

/// Stand-level trees-per-acre estimation from validation plots
#[derive(Parser, Debug)]
#[command(name = "tpacalc")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub debug: u8,

    /// Explicit config file, layered over the global one
    #[arg(long, global = true, env = "TPACALC_CONFIG", value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Stand identity given as three positionals.
#[derive(Args, Debug, Clone)]
pub struct StandArgs {
    /// Client identifier
    pub client: String,
    /// Project identifier
    pub project: String,
    /// Stand identifier
    pub stand: String,
}

impl StandArgs {
    pub fn identity(&self) -> StandIdentity {
        StandIdentity::new(
            self.client.as_str(),
            self.project.as_str(),
            self.stand.as_str(),
        )
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Estimate one stand via the storage and database services
    Run {
        #[command(flatten)]
        stand: StandArgs,
        /// Confidence level in (0, 1) (default: from config)
        #[arg(short, long)]
        confidence: Option<f64>,
        /// Do not store the result in the database
        #[arg(long)]
        no_persist: bool,
        /// Print the full estimate as JSON
        #[arg(long)]
        json: bool,
    },

    /// Estimate many stands listed in a file (client,project,stand per line)
    Batch {
        /// Stand list file
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// Confidence level in (0, 1) (default: from config)
        #[arg(short, long)]
        confidence: Option<f64>,
        /// Do not store results in the database
        #[arg(long)]
        no_persist: bool,
        /// Worker threads (default: number of CPUs)
        #[arg(short, long)]
        jobs: Option<usize>,
    },

    /// Estimate from local GeoJSON files without any service calls
    Estimate {
        /// AOI polygon files, one per plot
        #[arg(long, num_args = 1.., required = true, value_hint = ValueHint::FilePath)]
        aoi: Vec<PathBuf>,
        /// Tree point files, paired with --aoi by position
        #[arg(long, num_args = 1.., required = true, value_hint = ValueHint::FilePath)]
        trees: Vec<PathBuf>,
        /// Stand label as client/project/stand
        #[arg(long, default_value = "local/local/local")]
        stand: StandIdentity,
        /// Confidence level in (0, 1) (default: from config)
        #[arg(short, long)]
        confidence: Option<f64>,
        /// Write the report text here
        #[arg(long, value_hint = ValueHint::FilePath)]
        report: Option<PathBuf>,
        /// Write the SVG chart here
        #[arg(long, value_hint = ValueHint::FilePath)]
        chart: Option<PathBuf>,
        /// Print the full estimate as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show resolved validation paths and stand info
    Paths {
        #[command(flatten)]
        stand: StandArgs,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Show config paths
    Path,
}
