//! Application-level configuration.
//!
//! - [`RunOptions`]: loop budgets, approval point, strategy bands and the
//!   fallback chain for each agent role

pub mod run_options;

pub use run_options::{GenerationParams, RoleChains, RunOptions};
