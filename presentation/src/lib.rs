//! Presentation layer for cadence
//!
//! This crate contains CLI definitions, the terminal approval prompt,
//! progress reporters and report formatters.

pub mod approval;
pub mod cli;
pub mod output;
pub mod progress;

// Re-export commonly used types
pub use approval::ConsoleHumanChannel;
pub use cli::commands::{Cli, Command, HilArg, OutputFormat, RunArgs};
pub use output::console::ConsoleFormatter;
pub use progress::reporter::{ProgressReporter, SimpleProgress};
