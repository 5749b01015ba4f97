//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    chart::ChartCommands, completions::CompletionsArgs, init::InitArgs, ncr::NcrCommands,
    plan::PlanCommands, sample::SampleCommands,
};

#[derive(Parser)]
#[command(name = "mqt")]
#[command(author, version, about = "Meridian Quality Toolkit")]
#[command(
    long_about = "A Unix-style toolkit for statistical quality control: acceptance sampling, control charts, and non-conformance tracking as plain text files under git version control."
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Project root (default: auto-detect by finding .mqt/)
    #[arg(long, global = true)]
    pub project: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new MQT project
    Init(InitArgs),

    /// Inspection plan management
    #[command(subcommand)]
    Plan(PlanCommands),

    /// Acceptance sampling: resolve plans and evaluate lots
    #[command(subcommand)]
    Sample(SampleCommands),

    /// Control chart management and analysis
    #[command(subcommand)]
    Chart(ChartCommands),

    /// Non-conformance report management
    #[command(subcommand)]
    Ncr(NcrCommands),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Automatically detect based on context (yaml for show, tsv for list)
    #[default]
    Auto,
    /// YAML format (full fidelity)
    Yaml,
    /// Tab-separated values (for piping)
    Tsv,
    /// JSON format (for programming)
    Json,
    /// CSV format (for spreadsheets)
    Csv,
    /// Markdown tables
    Md,
    /// Just IDs, one per line
    Id,
}
