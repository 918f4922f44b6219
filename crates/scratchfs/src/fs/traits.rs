//! File provider trait definitions

use async_trait::async_trait;
use serde::Serialize;
use std::time::SystemTime;

use super::watch::{WatchCallback, WatchHandle, WatchOptions, WriteContext};
use crate::error::{Error, Result};

/// Async file provider contract consumed by the editor workspace.
///
/// Addresses are plain path-like strings; bare names are rooted at `/`.
/// Implementations run each call to completion without suspending, so the
/// futures resolve on first poll.
#[async_trait]
pub trait FileProvider: Send + Sync {
    /// Get entry metadata.
    async fn stat(&self, path: &str) -> Result<Stat>;

    /// Check if an entry exists.
    async fn exists(&self, path: &str) -> Result<bool> {
        match self.stat(path).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Create a directory and any missing ancestors.
    async fn create_directory(&self, path: &str) -> Result<()>;

    /// List the direct children of a directory, sorted by name.
    async fn read_directory(&self, path: &str) -> Result<Vec<DirEntry>>;

    /// Read a file's contents.
    async fn read_file(&self, path: &str) -> Result<Vec<u8>>;

    /// Read a file as UTF-8 text, replacing invalid sequences with U+FFFD.
    async fn read_text_file(&self, path: &str) -> Result<String> {
        let bytes = self.read_file(path).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Write a file, creating it if absent.
    async fn write_file(&self, path: &str, content: &[u8]) -> Result<()> {
        self.write_file_with(path, content, None).await
    }

    /// Write a file and hand `context` through to the watchers it triggers.
    async fn write_file_with(
        &self,
        path: &str,
        content: &[u8],
        context: Option<WriteContext>,
    ) -> Result<()>;

    /// Append to a file, creating it if absent.
    async fn append_file(&self, path: &str, content: &[u8]) -> Result<()>;

    /// Remove a file or directory.
    async fn delete(&self, path: &str, options: DeleteOptions) -> Result<()>;

    /// Move a file or directory, with its whole subtree.
    async fn rename(&self, from: &str, to: &str, options: RenameOptions) -> Result<()>;

    /// Duplicate a file or directory, with its whole subtree.
    async fn copy(&self, from: &str, to: &str, options: CopyOptions) -> Result<()> {
        let _ = (from, to, options);
        Err(Error::Unsupported {
            operation: "copy".to_string(),
        })
    }

    /// Register a change callback. The watcher stays registered until
    /// [`WatchHandle::dispose`] is called.
    fn watch(
        &self,
        path: &str,
        options: WatchOptions,
        callback: WatchCallback,
    ) -> Result<WatchHandle>;
}

/// Entry metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stat {
    /// Entry kind
    pub kind: EntryKind,
    /// Creation time, fixed for the entry's lifetime
    pub created: SystemTime,
    /// Time of the last mutation
    pub modified: SystemTime,
    /// Starts at 1, incremented by each successful write
    pub version: u64,
    /// Content length in bytes; 0 for directories
    pub size: u64,
}

impl Stat {
    pub(crate) fn new(kind: EntryKind, size: u64) -> Self {
        let now = SystemTime::now();
        Self {
            kind,
            created: now,
            modified: now,
            version: 1,
            size,
        }
    }

    pub fn is_file(&self) -> bool {
        self.kind.is_file()
    }

    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }
}

/// Entry kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Regular file
    File,
    /// Directory
    Directory,
}

impl EntryKind {
    /// Check if this is a file.
    pub fn is_file(&self) -> bool {
        matches!(self, EntryKind::File)
    }

    /// Check if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, EntryKind::Directory)
    }
}

/// Directory listing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirEntry {
    /// Entry name (not full path)
    pub name: String,
    /// Entry kind
    pub kind: EntryKind,
}

/// Options for [`FileProvider::delete`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DeleteOptions {
    /// Remove a non-empty directory together with its subtree.
    pub recursive: bool,
}

impl DeleteOptions {
    pub fn recursive() -> Self {
        Self { recursive: true }
    }
}

/// Options for [`FileProvider::rename`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RenameOptions {
    /// Replace an existing destination (deleted recursively first).
    pub overwrite: bool,
}

impl RenameOptions {
    pub fn overwrite() -> Self {
        Self { overwrite: true }
    }
}

/// Options for [`FileProvider::copy`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyOptions {
    /// Replace an existing destination (deleted recursively first).
    pub overwrite: bool,
}

impl CopyOptions {
    pub fn overwrite() -> Self {
        Self { overwrite: true }
    }
}
