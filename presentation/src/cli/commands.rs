//! CLI command definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for the final report
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Outcome, phase table and the latest written output
    Summary,
    /// The full markdown report
    Markdown,
    /// JSON output
    Json,
}

/// How approval requests are answered
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum HilArg {
    Interactive,
    AutoApprove,
    AutoRevise,
}

/// CLI arguments for cadence
#[derive(Parser, Debug)]
#[command(name = "cadence")]
#[command(author, version, about = "Iterative agent pipeline with model fallback")]
#[command(long_about = r#"
Cadence works towards an objective in iterations. Each iteration plans,
executes, validates, writes and critiques, then a decision model asks whether
the objective is met. Every model call walks a fallback chain of candidates.

Configuration files are loaded from (in priority order):
1. CADENCE_* environment variables (CADENCE_RUN__MAX_ITERATIONS=3)
2. --config <path>     Explicit config file
3. ./cadence.toml      Project-level config
4. ~/.config/cadence/config.toml   Global config

Example:
  cadence run "Write a migration guide for the v2 API" --workspace ./out
  cadence run "Survey caching options" -w ./survey --max-iterations 3 --hil auto-approve
  cadence config
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Also write diagnostic logs to this file
    #[arg(long, value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the pipeline towards an objective
    Run(RunArgs),
    /// Show configuration sources and validation issues
    Config,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// What the run should achieve
    pub objective: String,

    /// Directory receiving per-iteration artifacts and the report
    #[arg(short, long, value_name = "DIR")]
    pub workspace: PathBuf,

    #[arg(long, value_name = "N")]
    pub max_iterations: Option<u32>,

    /// Attempt budget for the execution retry loop
    #[arg(long, value_name = "N")]
    pub max_step_attempts: Option<u32>,

    #[arg(long, value_name = "N")]
    pub max_approval_revisions: Option<u32>,

    /// Approval mode (overrides run.hil_mode)
    #[arg(long = "hil", value_enum, value_name = "MODE")]
    pub hil: Option<HilArg>,

    /// Write lifecycle events as JSON lines (overrides logging.events_jsonl)
    #[arg(long, value_name = "PATH")]
    pub events: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "summary")]
    pub output: OutputFormat,

    /// Suppress progress indicators
    #[arg(short, long)]
    pub quiet: bool,
}
