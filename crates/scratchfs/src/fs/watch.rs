//! Change notification.
//!
//! Watchers live in an id-keyed registry. A mutating operation collects its
//! [`FileChange`]s while it holds the entry table, then dispatches them after
//! the table is released and before the operation returns. Each change is
//! delivered against a snapshot of the matching watchers, and a watcher that
//! was disposed in the meantime is skipped, so callbacks may dispose any
//! handle (their own included) or call back into the file system.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use serde::Serialize;
use tracing::{trace, warn};

use super::address::Address;
use crate::logging_impl::sanitize_for_log;

/// Opaque value a writer attaches to a write; watchers receive it unchanged.
pub type WriteContext = Arc<dyn Any + Send + Sync>;

/// Watcher callback.
pub type WatchCallback = Arc<dyn Fn(&FileChange) + Send + Sync>;

/// Kind of change. A move is reported as `Removed` at the old address
/// followed by `Created` at the new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
}

/// A single change event.
#[derive(Clone)]
pub struct FileChange {
    pub kind: ChangeKind,
    pub address: Address,
    /// Present only for changes produced by a write that supplied one.
    pub context: Option<WriteContext>,
}

impl FileChange {
    pub(crate) fn new(kind: ChangeKind, address: Address) -> Self {
        Self {
            kind,
            address,
            context: None,
        }
    }

    /// Downcast the write context.
    pub fn context_as<T: Any>(&self) -> Option<&T> {
        self.context.as_deref()?.downcast_ref::<T>()
    }
}

impl fmt::Debug for FileChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileChange")
            .field("kind", &self.kind)
            .field("address", &self.address)
            .field("context", &self.context.as_ref().map(|_| ".."))
            .finish()
    }
}

/// Options for registering a watcher.
#[derive(Debug, Clone, Copy, Default)]
pub struct WatchOptions {
    /// Also report changes strictly below the watched address.
    pub recursive: bool,
}

impl WatchOptions {
    pub fn recursive() -> Self {
        Self { recursive: true }
    }
}

/// Registry-assigned watcher id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatchId(u64);

impl fmt::Display for WatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "watch#{}", self.0)
    }
}

struct Watcher {
    id: WatchId,
    address: Address,
    recursive: bool,
    active: AtomicBool,
    callback: WatchCallback,
}

impl Watcher {
    fn matches(&self, address: &Address) -> bool {
        *address == self.address || (self.recursive && address.is_descendant_of(&self.address))
    }
}

#[derive(Default)]
struct RegistryState {
    next_id: u64,
    watchers: BTreeMap<WatchId, Arc<Watcher>>,
}

/// Watcher registry owned by one file system instance.
#[derive(Default)]
pub(crate) struct WatchRegistry {
    state: Arc<Mutex<RegistryState>>,
}

impl WatchRegistry {
    pub(crate) fn register(
        &self,
        address: Address,
        options: WatchOptions,
        callback: WatchCallback,
    ) -> WatchHandle {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.next_id += 1;
        let id = WatchId(state.next_id);
        trace!(%id, path = %sanitize_for_log(address.as_str()), recursive = options.recursive, "watch");
        state.watchers.insert(
            id,
            Arc::new(Watcher {
                id,
                address,
                recursive: options.recursive,
                active: AtomicBool::new(true),
                callback,
            }),
        );
        WatchHandle {
            id,
            registry: Arc::downgrade(&self.state),
            disposed: AtomicBool::new(false),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .watchers
            .len()
    }

    /// Deliver `changes` in order. Must be called without the entry table held.
    pub(crate) fn dispatch(&self, changes: &[FileChange]) {
        for change in changes {
            let targets: Vec<Arc<Watcher>> = {
                let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
                state
                    .watchers
                    .values()
                    .filter(|w| w.matches(&change.address))
                    .cloned()
                    .collect()
            };

            for watcher in targets {
                if !watcher.active.load(Ordering::Acquire) {
                    continue;
                }
                trace!(id = %watcher.id, kind = ?change.kind, path = %sanitize_for_log(change.address.as_str()), "notify");
                let callback = &watcher.callback;
                if panic::catch_unwind(AssertUnwindSafe(|| callback(change))).is_err() {
                    warn!(
                        id = %watcher.id,
                        kind = ?change.kind,
                        path = %sanitize_for_log(change.address.as_str()),
                        "watcher callback panicked; continuing with remaining watchers"
                    );
                }
            }
        }
    }
}

/// Disposer returned by `watch`.
///
/// Dropping the handle does not unregister the watcher; call
/// [`WatchHandle::dispose`]. Disposing twice is a no-op.
pub struct WatchHandle {
    id: WatchId,
    registry: Weak<Mutex<RegistryState>>,
    disposed: AtomicBool,
}

impl WatchHandle {
    pub fn id(&self) -> WatchId {
        self.id
    }

    /// Unregister the watcher. No event is delivered to it afterwards.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let Some(state) = self.registry.upgrade() else {
            return;
        };
        let removed = state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .watchers
            .remove(&self.id);
        if let Some(watcher) = removed {
            watcher.active.store(false, Ordering::Release);
            trace!(id = %self.id, "dispose");
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

impl fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchHandle")
            .field("id", &self.id)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
