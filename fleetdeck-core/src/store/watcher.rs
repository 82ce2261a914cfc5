//! Watcher types for atoms.
//!
//! A Watcher is anything that wants to hear that an atom was replaced.
//! Views, derived caches and refresh triggers all register as watchers.

use std::borrow::Borrow;
use std::fmt;
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::RwLock;

/// Key a watcher is registered under.
///
/// Keys are unique per atom. Registering twice under the same key replaces
/// the first callback, which makes "mount" idempotent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatchKey(String);

impl WatchKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for WatchKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for WatchKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl Borrow<str> for WatchKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Something to notify when an atom's value is replaced.
///
/// The notification carries no data. A watcher that needs the new value
/// reads it from the atom.
pub trait Watcher: Send + Sync {
    fn notify(&self);
}

impl<F> Watcher for F
where
    F: Fn() + Send + Sync,
{
    fn notify(&self) {
        self()
    }
}

pub(crate) type WatcherTable = RwLock<IndexMap<WatchKey, Arc<dyn Watcher>>>;

/// Removes a watch when dropped.
///
/// Returned by [`Atom::watch`](super::Atom::watch) so that a consumer's
/// teardown cannot forget the matching `remove_watch`. If the key was
/// re-registered by someone else in the meantime, the newer watcher is
/// left alone.
#[must_use = "dropping the guard removes the watch immediately"]
pub struct WatchGuard {
    key: WatchKey,
    watcher: Weak<dyn Watcher>,
    table: Weak<WatcherTable>,
}

impl WatchGuard {
    pub(crate) fn new(key: WatchKey, watcher: &Arc<dyn Watcher>, table: &Arc<WatcherTable>) -> Self {
        Self {
            key,
            watcher: Arc::downgrade(watcher),
            table: Arc::downgrade(table),
        }
    }

    pub fn key(&self) -> &WatchKey {
        &self.key
    }
}

impl Drop for WatchGuard {
    fn drop(&mut self) {
        let Some(table) = self.table.upgrade() else {
            return;
        };
        let mut table = table.write();
        let ours = match (table.get(self.key.as_str()), self.watcher.upgrade()) {
            (Some(current), Some(mine)) => Arc::ptr_eq(current, &mine),
            _ => false,
        };
        if ours {
            table.shift_remove(self.key.as_str());
        }
    }
}

impl fmt::Debug for WatchGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchGuard").field("key", &self.key).finish()
    }
}
