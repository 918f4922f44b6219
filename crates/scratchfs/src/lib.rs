//! scratchfs - In-memory virtual file system for editor workspaces
//!
//! Holds scratch buffers, generated files and other unsaved content in a
//! hierarchical tree that never touches disk, behind the same async
//! [`FileProvider`] contract a real provider would implement. Watchers are
//! notified of every created, modified and removed entry.
//!
//! # Example
//!
//! ```rust
//! use scratchfs::{ChangeKind, FileProvider, VirtualFileSystem, WatchOptions};
//! use std::sync::{Arc, Mutex};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let fs = VirtualFileSystem::new();
//!
//!     let seen = Arc::new(Mutex::new(Vec::new()));
//!     let sink = Arc::clone(&seen);
//!     let handle = fs.watch(
//!         "/notes",
//!         WatchOptions::recursive(),
//!         Arc::new(move |change: &scratchfs::FileChange| {
//!             sink.lock().unwrap().push((change.kind, change.address.to_string()));
//!         }),
//!     )?;
//!
//!     fs.create_directory("/notes").await?;
//!     fs.write_file("/notes/todo.md", b"- ship it").await?;
//!     handle.dispose();
//!
//!     assert_eq!(
//!         *seen.lock().unwrap(),
//!         vec![
//!             (ChangeKind::Created, "/notes".to_string()),
//!             (ChangeKind::Created, "/notes/todo.md".to_string()),
//!         ]
//!     );
//!     Ok(())
//! }
//! ```
//!
//! # Resource limits
//!
//! See [`FsLimits`]. Rejected operations leave the tree untouched.
//!
//! # Logging
//!
//! Events go through `tracing`; see [`LogConfig`] for what is redacted.

mod error;
mod fs;
pub mod limits;
mod logging_impl;

pub use async_trait::async_trait;
pub use error::{Error, ErrorKind, Result};
pub use fs::{
    Address, ChangeKind, CopyOptions, DeleteOptions, DirEntry, EntryKind, FileChange,
    FileProvider, RenameOptions, Stat, VirtualFileSystem, VirtualFileSystemBuilder,
    WatchCallback, WatchHandle, WatchId, WatchOptions, WriteContext,
};
pub use limits::{FsLimitExceeded, FsLimits, FsUsage};
pub use logging_impl::LogConfig;
