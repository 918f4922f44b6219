//! In-memory virtual file system
//!
//! [`VirtualFileSystem`] keeps every entry in one ordered map keyed by
//! [`Address`]. Because addresses order by path string, a directory's
//! descendants form a contiguous key run, so subtree operations are range
//! scans over a snapshot of keys taken before anything is mutated.
//!
//! # Event ordering
//!
//! | Operation | Events |
//! |-----------|--------|
//! | `create_directory` | `Created` per new directory, ancestors first |
//! | `write_file` / `append_file` | one `Created` (new) or `Modified` (existing) |
//! | `delete` | `Removed` per entry, deepest first, the target last |
//! | `rename` | overwritten destination's `Removed`s, then per moved entry (parent first) `Removed` at the old address immediately followed by `Created` at the new one |
//! | `copy` | overwritten destination's `Removed`s, then `Created` per copied entry, parent first |

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use super::address::Address;
use super::traits::{
    CopyOptions, DeleteOptions, DirEntry, EntryKind, FileProvider, RenameOptions, Stat,
};
use super::watch::{
    ChangeKind, FileChange, WatchCallback, WatchHandle, WatchOptions, WatchRegistry, WriteContext,
};
use crate::error::{Error, Result};
use crate::limits::{FsLimits, FsUsage};
use crate::logging_impl::{LogConfig, format_content_for_log, sanitize_for_log};

/// In-memory virtual file system.
///
/// Each workspace owns one instance; share it behind an `Arc`. All state is
/// lost when it is dropped.
///
/// # Example
///
/// ```rust
/// use scratchfs::{FileProvider, VirtualFileSystem};
///
/// # #[tokio::main]
/// # async fn main() -> scratchfs::Result<()> {
/// let fs = VirtualFileSystem::new();
/// fs.create_directory("/src").await?;
/// fs.write_file("/src/main.rs", b"fn main() {}").await?;
///
/// let stat = fs.stat("/src/main.rs").await?;
/// assert_eq!(stat.size, 12);
/// assert_eq!(stat.version, 1);
/// assert_eq!(fs.read_text_file("src/main.rs").await?, "fn main() {}");
/// # Ok(())
/// # }
/// ```
pub struct VirtualFileSystem {
    state: Mutex<FsState>,
    watchers: WatchRegistry,
    limits: FsLimits,
    log_config: LogConfig,
}

#[derive(Debug, Clone)]
enum Entry {
    File { stat: Stat, content: Vec<u8> },
    Directory { stat: Stat },
}

impl Entry {
    fn directory() -> Self {
        Entry::Directory {
            stat: Stat::new(EntryKind::Directory, 0),
        }
    }

    fn file(content: Vec<u8>) -> Self {
        Entry::File {
            stat: Stat::new(EntryKind::File, content.len() as u64),
            content,
        }
    }

    fn stat(&self) -> &Stat {
        match self {
            Entry::File { stat, .. } | Entry::Directory { stat } => stat,
        }
    }

    fn kind(&self) -> EntryKind {
        self.stat().kind
    }

    /// Same kind and bytes under a fresh stat.
    fn duplicate(&self) -> Self {
        match self {
            Entry::File { content, .. } => Entry::file(content.clone()),
            Entry::Directory { .. } => Entry::directory(),
        }
    }
}

/// The entry table plus running totals for limit checks.
#[derive(Debug)]
struct FsState {
    entries: BTreeMap<Address, Entry>,
    total_bytes: u64,
    file_count: u64,
}

impl FsState {
    fn new() -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(Address::root(), Entry::directory());
        Self {
            entries,
            total_bytes: 0,
            file_count: 0,
        }
    }

    fn get(&self, address: &Address) -> Option<&Entry> {
        self.entries.get(address)
    }

    fn account(&mut self, entry: &Entry, added: bool) {
        if let Entry::File { content, .. } = entry {
            let len = content.len() as u64;
            if added {
                self.total_bytes += len;
                self.file_count += 1;
            } else {
                self.total_bytes = self.total_bytes.saturating_sub(len);
                self.file_count = self.file_count.saturating_sub(1);
            }
        }
    }

    fn insert(&mut self, address: Address, entry: Entry) -> Option<Entry> {
        self.account(&entry, true);
        let previous = self.entries.insert(address, entry);
        if let Some(old) = &previous {
            self.account(old, false);
        }
        previous
    }

    fn remove(&mut self, address: &Address) -> Option<Entry> {
        let removed = self.entries.remove(address);
        if let Some(old) = &removed {
            self.account(old, false);
        }
        removed
    }

    /// Strict descendants of `dir`, in ascending key order.
    fn descendants(&self, dir: &Address) -> Vec<Address> {
        self.entries
            .range(dir.subtree_floor()..)
            .map(|(key, _)| key)
            .skip_while(|key| *key == dir)
            .take_while(|key| key.is_descendant_of(dir))
            .cloned()
            .collect()
    }

    /// `address` followed by its descendants, ascending.
    fn subtree(&self, address: &Address) -> Vec<Address> {
        let mut keys = vec![address.clone()];
        if matches!(self.get(address), Some(Entry::Directory { .. })) {
            keys.extend(self.descendants(address));
        }
        keys
    }

    /// Bytes, files and directories held by a subtree.
    fn subtree_usage(&self, keys: &[Address]) -> FsUsage {
        let mut usage = FsUsage::default();
        for key in keys {
            match self.get(key) {
                Some(Entry::File { content, .. }) => {
                    usage.total_bytes += content.len() as u64;
                    usage.file_count += 1;
                }
                Some(Entry::Directory { .. }) => usage.dir_count += 1,
                None => {}
            }
        }
        usage
    }

    fn dir_count(&self) -> u64 {
        self.entries.len() as u64 - self.file_count
    }

    fn require_parent_dir(&self, address: &Address) -> Result<()> {
        let Some(parent) = address.parent() else {
            return Ok(());
        };
        match self.get(&parent) {
            Some(Entry::Directory { .. }) => Ok(()),
            Some(Entry::File { .. }) | None => Err(Error::parent_missing(address)),
        }
    }

    /// Remove `address` and everything below it, deepest first.
    fn remove_subtree(&mut self, address: &Address, changes: &mut Vec<FileChange>) {
        for key in self.subtree(address).into_iter().rev() {
            if self.remove(&key).is_some() {
                changes.push(FileChange::new(ChangeKind::Removed, key));
            }
        }
    }

    fn usage(&self) -> FsUsage {
        FsUsage {
            total_bytes: self.total_bytes,
            file_count: self.file_count,
            dir_count: self.dir_count(),
        }
    }
}

/// Validated plan shared by `rename` and `copy`.
struct Relocation {
    /// (old, new) pairs, parent first.
    moves: Vec<(Address, Address)>,
    /// Destination is occupied and will be deleted first.
    replaces: bool,
}

impl Default for VirtualFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualFileSystem {
    /// Create an empty file system (only `/`) with default limits.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Create an empty file system with custom limits.
    pub fn with_limits(limits: FsLimits) -> Self {
        Self::builder().limits(limits).build()
    }

    /// Create a builder for customized configuration.
    pub fn builder() -> VirtualFileSystemBuilder {
        VirtualFileSystemBuilder::default()
    }

    /// Configured resource limits.
    pub fn limits(&self) -> &FsLimits {
        &self.limits
    }

    /// Configured logging behavior.
    pub fn log_config(&self) -> &LogConfig {
        &self.log_config
    }

    /// Current byte and entry counts.
    pub fn usage(&self) -> FsUsage {
        self.lock().usage()
    }

    /// Number of registered watchers.
    pub fn watcher_count(&self) -> usize {
        self.watchers.len()
    }

    /// Watch `path` and receive matching changes on a channel.
    ///
    /// The sender lives in the watcher, so the channel stays open until the
    /// handle is disposed.
    pub fn watch_channel(
        &self,
        path: &str,
        options: WatchOptions,
    ) -> Result<(WatchHandle, mpsc::UnboundedReceiver<FileChange>)> {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = self.watch(
            path,
            options,
            Arc::new(move |change: &FileChange| {
                let _ = tx.send(change.clone());
            }),
        )?;
        Ok((handle, rx))
    }

    fn lock(&self) -> MutexGuard<'_, FsState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run a mutation under the table lock, then notify watchers.
    fn apply<T>(
        &self,
        op: impl FnOnce(&mut FsState, &mut Vec<FileChange>) -> Result<T>,
    ) -> Result<T> {
        let mut changes = Vec::new();
        let result = {
            let mut state = self.lock();
            op(&mut state, &mut changes)
        };
        if result.is_ok() {
            self.watchers.dispatch(&changes);
        }
        result
    }

    fn store_file(
        &self,
        path: &str,
        content: &[u8],
        append: bool,
        context: Option<WriteContext>,
    ) -> Result<()> {
        let address = Address::parse(path)?;
        let op = if append { "append" } else { "write" };
        self.apply(|state, changes| {
            let (kind, entry) = match state.get(&address) {
                Some(Entry::Directory { .. }) => return Err(Error::is_a_directory(&address)),
                Some(Entry::File {
                    stat,
                    content: existing,
                }) => {
                    let mut next = if append { existing.clone() } else { Vec::new() };
                    next.extend_from_slice(content);
                    let new_size = next.len() as u64;
                    self.limits.check_file_size(new_size)?;
                    self.limits.check_total_bytes(
                        state.total_bytes - existing.len() as u64,
                        new_size,
                    )?;
                    let stat = Stat {
                        version: stat.version + 1,
                        modified: SystemTime::now(),
                        size: new_size,
                        ..stat.clone()
                    };
                    (
                        ChangeKind::Modified,
                        Entry::File {
                            stat,
                            content: next,
                        },
                    )
                }
                None => {
                    state.require_parent_dir(&address)?;
                    self.limits.validate_address(&address)?;
                    self.limits.check_file_size(content.len() as u64)?;
                    self.limits.check_file_count(state.file_count, 1)?;
                    self.limits
                        .check_total_bytes(state.total_bytes, content.len() as u64)?;
                    (ChangeKind::Created, Entry::file(content.to_vec()))
                }
            };

            debug!(
                op,
                path = %sanitize_for_log(address.as_str()),
                version = entry.stat().version,
                size = entry.stat().size,
                content = %format_content_for_log(content, &self.log_config),
                "store file"
            );
            state.insert(address.clone(), entry);
            changes.push(FileChange {
                kind,
                address,
                context,
            });
            Ok(())
        })
    }

    /// Check every precondition of a rename or copy before anything moves.
    ///
    /// Returns `None` when source and destination are the same address.
    fn plan_relocation(
        &self,
        state: &FsState,
        from: &Address,
        to: &Address,
        overwrite: bool,
    ) -> Result<Option<Relocation>> {
        if state.get(from).is_none() {
            return Err(Error::not_found(from));
        }
        if from.is_root() || to.is_root() {
            return Err(Error::invalid_operation(
                if from.is_root() { from } else { to },
                "cannot move or replace the root directory",
            ));
        }
        if from == to {
            return Ok(None);
        }
        state.require_parent_dir(to)?;
        if to.is_descendant_of(from) {
            return Err(Error::invalid_operation(
                to,
                "cannot move a directory into itself",
            ));
        }

        let replaces = state.get(to).is_some();
        if replaces && !overwrite {
            return Err(Error::already_exists(to));
        }
        if from.is_descendant_of(to) {
            return Err(Error::invalid_operation(
                to,
                "cannot replace an ancestor of the source",
            ));
        }

        let mut moves = Vec::new();
        for old in state.subtree(from) {
            if let Some(new) = old.rebase(from, to) {
                self.limits.validate_address(&new)?;
                moves.push((old, new));
            }
        }
        Ok(Some(Relocation { moves, replaces }))
    }
}

#[async_trait]
impl FileProvider for VirtualFileSystem {
    async fn stat(&self, path: &str) -> Result<Stat> {
        let address = Address::parse(path)?;
        let state = self.lock();
        match state.get(&address) {
            Some(entry) => Ok(entry.stat().clone()),
            None => Err(Error::not_found(&address)),
        }
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let address = Address::parse(path)?;
        Ok(self.lock().get(&address).is_some())
    }

    async fn create_directory(&self, path: &str) -> Result<()> {
        let address = Address::parse(path)?;
        self.apply(|state, changes| {
            match state.get(&address) {
                Some(Entry::Directory { .. }) => return Ok(()),
                Some(Entry::File { .. }) => return Err(Error::already_exists(&address)),
                None => {}
            }
            self.limits.validate_address(&address)?;

            let mut missing = Vec::new();
            for ancestor in address.ancestors() {
                match state.get(&ancestor) {
                    Some(Entry::Directory { .. }) => {}
                    Some(Entry::File { .. }) => return Err(Error::parent_missing(&address)),
                    None => missing.push(ancestor),
                }
            }
            missing.push(address.clone());
            self.limits
                .check_dir_count(state.dir_count(), missing.len() as u64)?;

            debug!(
                path = %sanitize_for_log(address.as_str()),
                created = missing.len(),
                "create directory"
            );
            for dir in missing {
                state.insert(dir.clone(), Entry::directory());
                changes.push(FileChange::new(ChangeKind::Created, dir));
            }
            Ok(())
        })
    }

    async fn read_directory(&self, path: &str) -> Result<Vec<DirEntry>> {
        let address = Address::parse(path)?;
        let state = self.lock();
        match state.get(&address) {
            None => return Err(Error::not_found(&address)),
            Some(Entry::File { .. }) => return Err(Error::not_a_directory(&address)),
            Some(Entry::Directory { .. }) => {}
        }

        // Siblings share a prefix, so key order is name order.
        let listing: Vec<DirEntry> = state
            .descendants(&address)
            .into_iter()
            .filter(|key| key.is_child_of(&address))
            .filter_map(|key| {
                let kind = state.get(&key)?.kind();
                Some(DirEntry {
                    name: key.name()?.to_string(),
                    kind,
                })
            })
            .collect();
        trace!(path = %sanitize_for_log(address.as_str()), entries = listing.len(), "read directory");
        Ok(listing)
    }

    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let address = Address::parse(path)?;
        let state = self.lock();
        match state.get(&address) {
            Some(Entry::File { content, .. }) => {
                trace!(path = %sanitize_for_log(address.as_str()), size = content.len(), "read file");
                Ok(content.clone())
            }
            Some(Entry::Directory { .. }) => Err(Error::is_a_directory(&address)),
            None => Err(Error::not_found(&address)),
        }
    }

    async fn write_file_with(
        &self,
        path: &str,
        content: &[u8],
        context: Option<WriteContext>,
    ) -> Result<()> {
        self.store_file(path, content, false, context)
    }

    async fn append_file(&self, path: &str, content: &[u8]) -> Result<()> {
        self.store_file(path, content, true, None)
    }

    async fn delete(&self, path: &str, options: DeleteOptions) -> Result<()> {
        let address = Address::parse(path)?;
        self.apply(|state, changes| {
            match state.get(&address) {
                None => return Err(Error::not_found(&address)),
                Some(_) if address.is_root() => {
                    return Err(Error::invalid_operation(
                        &address,
                        "cannot delete the root directory",
                    ));
                }
                Some(Entry::Directory { .. })
                    if !options.recursive && !state.descendants(&address).is_empty() =>
                {
                    return Err(Error::not_empty(&address));
                }
                Some(_) => {}
            }

            state.remove_subtree(&address, changes);
            debug!(
                path = %sanitize_for_log(address.as_str()),
                removed = changes.len(),
                recursive = options.recursive,
                "delete"
            );
            Ok(())
        })
    }

    async fn rename(&self, from: &str, to: &str, options: RenameOptions) -> Result<()> {
        let from = Address::parse(from)?;
        let to = Address::parse(to)?;
        self.apply(|state, changes| {
            let Some(plan) = self.plan_relocation(state, &from, &to, options.overwrite)? else {
                return Ok(());
            };
            if plan.replaces {
                state.remove_subtree(&to, changes);
            }

            for (old, new) in plan.moves {
                if let Some(entry) = state.remove(&old) {
                    state.insert(new.clone(), entry);
                    changes.push(FileChange::new(ChangeKind::Removed, old));
                    changes.push(FileChange::new(ChangeKind::Created, new));
                }
            }
            debug!(
                from = %sanitize_for_log(from.as_str()),
                to = %sanitize_for_log(to.as_str()),
                replaced = plan.replaces,
                "rename"
            );
            Ok(())
        })
    }

    async fn copy(&self, from: &str, to: &str, options: CopyOptions) -> Result<()> {
        let from = Address::parse(from)?;
        let to = Address::parse(to)?;
        self.apply(|state, changes| {
            let Some(plan) = self.plan_relocation(state, &from, &to, options.overwrite)? else {
                return Err(Error::invalid_operation(
                    &to,
                    "source and destination are the same",
                ));
            };

            let sources: Vec<Address> = plan.moves.iter().map(|(old, _)| old.clone()).collect();
            let added = state.subtree_usage(&sources);
            let freed = if plan.replaces {
                state.subtree_usage(&state.subtree(&to))
            } else {
                FsUsage::default()
            };
            self.limits
                .check_file_count(state.file_count - freed.file_count, added.file_count)?;
            self.limits
                .check_dir_count(state.dir_count() - freed.dir_count, added.dir_count)?;
            self.limits
                .check_total_bytes(state.total_bytes - freed.total_bytes, added.total_bytes)?;

            let copies: Vec<(Address, Entry)> = plan
                .moves
                .into_iter()
                .filter_map(|(old, new)| Some((new, state.get(&old)?.duplicate())))
                .collect();
            if plan.replaces {
                state.remove_subtree(&to, changes);
            }
            for (new, entry) in copies {
                state.insert(new.clone(), entry);
                changes.push(FileChange::new(ChangeKind::Created, new));
            }
            debug!(
                from = %sanitize_for_log(from.as_str()),
                to = %sanitize_for_log(to.as_str()),
                bytes = added.total_bytes,
                files = added.file_count,
                dirs = added.dir_count,
                "copy"
            );
            Ok(())
        })
    }

    fn watch(
        &self,
        path: &str,
        options: WatchOptions,
        callback: WatchCallback,
    ) -> Result<WatchHandle> {
        let address = Address::parse(path)?;
        Ok(self.watchers.register(address, options, callback))
    }
}

/// Builder for [`VirtualFileSystem`].
#[derive(Debug, Clone, Default)]
pub struct VirtualFileSystemBuilder {
    limits: FsLimits,
    log_config: LogConfig,
}

impl VirtualFileSystemBuilder {
    /// Set resource limits.
    pub fn limits(mut self, limits: FsLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Set logging behavior.
    pub fn log_config(mut self, log_config: LogConfig) -> Self {
        self.log_config = log_config;
        self
    }

    pub fn build(self) -> VirtualFileSystem {
        VirtualFileSystem {
            state: Mutex::new(FsState::new()),
            watchers: WatchRegistry::default(),
            limits: self.limits,
            log_config: self.log_config,
        }
    }
}
