//! JSONL file writer for run events.
//!
//! Each [`RunEvent`] is serialized as a single JSON line carrying its `type`
//! tag plus a `timestamp`, appended to the file via a buffered writer.

use cadence_application::ports::event_sink::{EventSink, EventSinkError};
use cadence_domain::RunEvent;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// JSONL event sink that writes one JSON object per line.
///
/// Thread-safe via `Mutex<BufWriter<File>>`. Flushes on `Drop`.
pub struct JsonlEventSink {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl JsonlEventSink {
    /// Create a new sink writing to the given path.
    ///
    /// Creates the file (and parent directories) if they don't exist.
    /// Returns `None` if the file cannot be created.
    pub fn new(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            warn!(
                "Could not create event log directory {}: {}",
                parent.display(),
                e
            );
            return None;
        }

        let file = match File::create(path) {
            Ok(f) => f,
            Err(e) => {
                warn!("Could not create event log file {}: {}", path.display(), e);
                return None;
            }
        };

        Some(Self {
            writer: Mutex::new(BufWriter::new(file)),
            path: path.to_path_buf(),
        })
    }

    /// Get the path to the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn record(event: &RunEvent) -> Result<String, EventSinkError> {
        let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        let mut value =
            serde_json::to_value(event).map_err(|e| EventSinkError::Serialization(e.to_string()))?;
        if let serde_json::Value::Object(map) = &mut value {
            map.insert("timestamp".to_string(), serde_json::Value::String(timestamp));
        }
        serde_json::to_string(&value).map_err(|e| EventSinkError::Serialization(e.to_string()))
    }
}

impl EventSink for JsonlEventSink {
    fn name(&self) -> &str {
        "jsonl"
    }

    fn emit(&self, event: &RunEvent) -> Result<(), EventSinkError> {
        let line = Self::record(event)?;
        let mut writer = self.writer.lock().map_err(|_| EventSinkError::Closed)?;
        writeln!(writer, "{}", line).map_err(|e| EventSinkError::Io(e.to_string()))?;
        // JSONL is append-only; flush each line so a crash keeps the transcript
        writer.flush().map_err(|e| EventSinkError::Io(e.to_string()))
    }
}

impl Drop for JsonlEventSink {
    fn drop(&mut self) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.flush();
        }
    }
}
