use clap::{Parser, Subcommand, ValueEnum, ValueHint};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Energy system model builder", long_about = None)]
pub struct Cli {
    /// Set the logging level
    #[arg(long, default_value = "info", global = true)]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Assemble a model directory and print its sets and constraint blocks
    Build {
        /// Model directory containing model.toml, FiE.csv, FoE.csv and parameter tables
        #[arg(value_hint = ValueHint::DirPath)]
        dir: PathBuf,
        /// Output format for the summary
        #[arg(long, value_enum, default_value_t = SummaryFormat::Plain)]
        format: SummaryFormat,
    },
    /// Assemble and solve a model directory
    Solve {
        #[arg(value_hint = ValueHint::DirPath)]
        dir: PathBuf,
        /// Write non-zero variable values to this CSV file
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        out: Option<PathBuf>,
        /// Residual above which a constraint counts as violated
        #[arg(long, default_value_t = 1e-6)]
        tolerance: f64,
        /// Magnitude below which a value is omitted from the output
        #[arg(long, default_value_t = 1e-9)]
        zero: f64,
    },
    /// Cluster one hourly load profile into representative days
    Cluster {
        /// Profile CSV: one row per day, the first column is the day index
        #[arg(value_hint = ValueHint::FilePath)]
        profile: PathBuf,
        /// Number of representative days
        #[arg(short = 'k', long, default_value_t = 4)]
        days: usize,
        /// Slot length in hours
        #[arg(long, default_value_t = 1)]
        hour_slice: usize,
        /// Seed for the k-means initialisation
        #[arg(long, default_value_t = 0)]
        seed: u64,
        /// Rescale the shapes to this annual total
        #[arg(long)]
        total: Option<f64>,
        /// Write `day,ratio,slot,demand` rows to this CSV file
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        out: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SummaryFormat {
    Plain,
    Json,
}
