//! Log destinations from TOML (`[logging]` section)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// Lifecycle events as JSON lines
    pub events_jsonl: Option<PathBuf>,
    /// Diagnostic tracing output (in addition to stderr)
    pub log_file: Option<PathBuf>,
}
