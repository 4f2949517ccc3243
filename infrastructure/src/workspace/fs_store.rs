use async_trait::async_trait;
use cadence_application::ports::workspace::{WorkspaceError, WorkspaceStore};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Workspace store rooted at a directory.
///
/// Paths are relative to the root; absolute paths and `..` components are
/// rejected. Writes go to a sibling temporary file that is renamed into
/// place, so readers never observe a partial artifact.
pub struct FsWorkspaceStore {
    root: PathBuf,
    sequence: AtomicU64,
}

impl FsWorkspaceStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            sequence: AtomicU64::new(0),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a workspace path onto the filesystem.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, WorkspaceError> {
        let relative = Path::new(path);
        if path.trim().is_empty() {
            return Err(WorkspaceError::InvalidPath("empty path".to_string()));
        }
        for component in relative.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                Component::ParentDir => {
                    return Err(WorkspaceError::InvalidPath(format!(
                        "'{}' escapes the workspace",
                        path
                    )));
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(WorkspaceError::InvalidPath(format!(
                        "'{}' must be relative",
                        path
                    )));
                }
            }
        }
        Ok(self.root.join(relative))
    }

    fn temp_path(&self, target: &Path) -> PathBuf {
        let n = self.sequence.fetch_add(1, Ordering::Relaxed);
        let name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        target.with_file_name(format!(".{}.{}.{}.tmp", name, std::process::id(), n))
    }
}

fn io_error(path: &Path, e: std::io::Error) -> WorkspaceError {
    if e.kind() == ErrorKind::NotFound {
        WorkspaceError::NotFound(path.display().to_string())
    } else {
        WorkspaceError::Io(format!("{}: {}", path.display(), e))
    }
}

#[async_trait]
impl WorkspaceStore for FsWorkspaceStore {
    async fn read(&self, path: &str) -> Result<Vec<u8>, WorkspaceError> {
        let full = self.resolve(path)?;
        tokio::fs::read(&full).await.map_err(|e| io_error(&full, e))
    }

    async fn write(&self, path: &str, contents: &[u8]) -> Result<(), WorkspaceError> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(parent, e))?;
        }

        let temp = self.temp_path(&full);
        if let Err(e) = tokio::fs::write(&temp, contents).await {
            return Err(io_error(&temp, e));
        }
        if let Err(e) = tokio::fs::rename(&temp, &full).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(io_error(&full, e));
        }
        debug!("Wrote {} bytes to {}", contents.len(), full.display());
        Ok(())
    }

    async fn exists(&self, path: &str) -> bool {
        match self.resolve(path) {
            Ok(full) => tokio::fs::try_exists(&full).await.unwrap_or(false),
            Err(_) => false,
        }
    }
}
