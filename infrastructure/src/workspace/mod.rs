//! Filesystem-backed workspace storage.

mod fs_store;

pub use fs_store::FsWorkspaceStore;
