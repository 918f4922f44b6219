//! Virtual file system for scratchfs
//!
//! Provides the async [`FileProvider`] contract and its in-memory
//! implementation:
//! - `Address`: normalized entry path, the table key
//! - `VirtualFileSystem`: ordered entry table plus watcher registry
//! - `FileChange` / `WatchHandle`: change notification

mod address;
mod memory;
mod traits;
mod watch;

pub use address::Address;
pub use memory::{VirtualFileSystem, VirtualFileSystemBuilder};
pub use traits::{
    CopyOptions, DeleteOptions, DirEntry, EntryKind, FileProvider, RenameOptions, Stat,
};
pub use watch::{
    ChangeKind, FileChange, WatchCallback, WatchHandle, WatchId, WatchOptions, WriteContext,
};
