//! Workspace storage port.
//!
//! Durable storage for intermediate artifacts (plans, execution logs,
//! reports). The pipeline builds relative paths and never interprets file
//! contents; adapters own concurrency control for overlapping paths.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkspaceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("I/O error: {0}")]
    Io(String),
}

#[async_trait]
pub trait WorkspaceStore: Send + Sync {
    async fn read(&self, path: &str) -> Result<Vec<u8>, WorkspaceError>;

    async fn write(&self, path: &str, contents: &[u8]) -> Result<(), WorkspaceError>;

    async fn exists(&self, path: &str) -> bool;
}

/// Process-local store; nothing survives the process.
#[derive(Default)]
pub struct InMemoryWorkspace {
    files: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Paths written so far, sorted.
    pub fn paths(&self) -> Vec<String> {
        match self.files.lock() {
            Ok(files) => files.keys().cloned().collect(),
            Err(_) => Vec::new(),
        }
    }

    fn lock_error() -> WorkspaceError {
        WorkspaceError::Io("workspace lock poisoned".to_string())
    }
}

#[async_trait]
impl WorkspaceStore for InMemoryWorkspace {
    async fn read(&self, path: &str) -> Result<Vec<u8>, WorkspaceError> {
        let files = self.files.lock().map_err(|_| Self::lock_error())?;
        files
            .get(path)
            .cloned()
            .ok_or_else(|| WorkspaceError::NotFound(path.to_string()))
    }

    async fn write(&self, path: &str, contents: &[u8]) -> Result<(), WorkspaceError> {
        if path.trim().is_empty() {
            return Err(WorkspaceError::InvalidPath("empty path".to_string()));
        }
        let mut files = self.files.lock().map_err(|_| Self::lock_error())?;
        files.insert(path.to_string(), contents.to_vec());
        Ok(())
    }

    async fn exists(&self, path: &str) -> bool {
        self.files
            .lock()
            .map(|files| files.contains_key(path))
            .unwrap_or(false)
    }
}
