//! Atom Implementation
//!
//! An Atom is the storage primitive of the store. It holds the last known
//! snapshot of one logical resource and tells its watchers when that
//! snapshot is replaced.
//!
//! # How Atoms Work
//!
//! 1. `get` returns the current snapshot as an `Arc<T>`. Readers never
//!    block writers for longer than a pointer swap.
//!
//! 2. `reset` swaps in a new snapshot, then calls every registered watcher
//!    exactly once, synchronously, in registration order.
//!
//! 3. Watchers receive no arguments. They call `get` themselves.
//!
//! # Snapshots
//!
//! The value is stored as `Arc<T>` and replaced wholesale, so a reader holds
//! either the old snapshot or the new one, never a mix. There is no
//! in-place mutation API.
//!
//! # Callbacks and Locks
//!
//! The watcher table is copied out before any watcher runs, so a watcher
//! may read the atom, add or remove watches, or reset another atom without
//! deadlocking. A watch removed during a notification round still receives
//! that round.

use std::fmt::Debug;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use super::watcher::{WatchGuard, WatchKey, Watcher, WatcherTable};

/// Counter for generating unique atom IDs.
static ATOM_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_atom_id() -> u64 {
    ATOM_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// An observable cell holding an immutable snapshot of type `T`.
///
/// Cloning an `Atom` yields another handle to the same cell.
///
/// # Example
///
/// ```rust,ignore
/// let devices = Atom::named("devices", Vec::<Device>::new());
///
/// devices.add_watch("devices-table", move || render(&devices_view.get()));
/// devices.reset(fetched);   // "devices-table" runs once
/// devices.remove_watch("devices-table");
/// ```
pub struct Atom<T>
where
    T: Send + Sync + 'static,
{
    id: u64,

    /// Resource name, used in logs.
    name: &'static str,

    value: Arc<RwLock<Arc<T>>>,

    watchers: Arc<WatcherTable>,
}

impl<T> Atom<T>
where
    T: Send + Sync + 'static,
{
    /// Create an unnamed atom holding `value`.
    pub fn new(value: T) -> Self {
        Self::named("anonymous", value)
    }

    /// Create an atom for the resource `name`.
    pub fn named(name: &'static str, value: T) -> Self {
        Self {
            id: next_atom_id(),
            name,
            value: Arc::new(RwLock::new(Arc::new(value))),
            watchers: Arc::new(RwLock::new(IndexMap::new())),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The current snapshot.
    pub fn get(&self) -> Arc<T> {
        Arc::clone(&self.value.read())
    }

    /// Replace the snapshot and notify every watcher once.
    pub fn reset(&self, value: T) {
        {
            let mut guard = self.value.write();
            *guard = Arc::new(value);
        }

        self.notify_watchers();
    }

    /// Register `watcher` under `key`, replacing any watcher already there.
    pub fn add_watch<K, W>(&self, key: K, watcher: W)
    where
        K: Into<WatchKey>,
        W: Watcher + 'static,
    {
        self.insert_watch(key.into(), Arc::new(watcher));
    }

    /// Remove the watcher under `key`.
    ///
    /// Returns whether a watcher was removed; removing an absent key is a
    /// no-op.
    pub fn remove_watch(&self, key: &str) -> bool {
        self.watchers.write().shift_remove(key).is_some()
    }

    /// Register `watcher` under `key` and return a guard that removes it.
    pub fn watch<K, W>(&self, key: K, watcher: W) -> WatchGuard
    where
        K: Into<WatchKey>,
        W: Watcher + 'static,
    {
        let key = key.into();
        let watcher: Arc<dyn Watcher> = Arc::new(watcher);
        let guard = WatchGuard::new(key.clone(), &watcher, &self.watchers);
        self.insert_watch(key, watcher);
        guard
    }

    pub fn is_watched_by(&self, key: &str) -> bool {
        self.watchers.read().contains_key(key)
    }

    pub fn watcher_count(&self) -> usize {
        self.watchers.read().len()
    }

    fn insert_watch(&self, key: WatchKey, watcher: Arc<dyn Watcher>) {
        let replaced = self.watchers.write().insert(key.clone(), watcher).is_some();
        if replaced {
            tracing::trace!(atom = self.name, %key, "watch replaced");
        }
    }

    fn notify_watchers(&self) {
        let watchers: Vec<(WatchKey, Arc<dyn Watcher>)> = self
            .watchers
            .read()
            .iter()
            .map(|(key, watcher)| (key.clone(), Arc::clone(watcher)))
            .collect();

        for (key, watcher) in watchers {
            if catch_unwind(AssertUnwindSafe(|| watcher.notify())).is_err() {
                tracing::error!(atom = self.name, %key, "watcher panicked");
            }
        }
    }
}

impl<T> Atom<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Clone the current value out of its snapshot.
    pub fn get_cloned(&self) -> T {
        T::clone(&self.get())
    }
}

impl<T> Clone for Atom<T>
where
    T: Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            name: self.name,
            value: Arc::clone(&self.value),
            watchers: Arc::clone(&self.watchers),
        }
    }
}

impl<T> Debug for Atom<T>
where
    T: Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Atom")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("value", &self.get())
            .field("watcher_count", &self.watcher_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicI32, Ordering};

    fn counter() -> (Arc<AtomicI32>, impl Fn() + Send + Sync + 'static) {
        let count = Arc::new(AtomicI32::new(0));
        let count_clone = count.clone();
        (count, move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn atom_get_and_reset() {
        let atom = Atom::new(0);
        assert_eq!(*atom.get(), 0);

        atom.reset(42);
        assert_eq!(*atom.get(), 42);
    }

    #[test]
    fn every_reset_is_observed_in_order() {
        let atom = Atom::new(Vec::<i32>::new());
        for n in 1..=5 {
            atom.reset(vec![n; n as usize]);
            assert_eq!(*atom.get(), vec![n; n as usize]);
        }
    }

    #[test]
    fn old_snapshots_stay_intact() {
        let atom = Atom::new(vec![1, 2, 3]);
        let before = atom.get();

        atom.reset(vec![9]);

        assert_eq!(*before, vec![1, 2, 3]);
        assert_eq!(*atom.get(), vec![9]);
    }

    #[test]
    fn each_watcher_fires_once_per_reset() {
        let atom = Atom::new(0);
        let (first, first_cb) = counter();
        let (second, second_cb) = counter();

        atom.add_watch("k1", first_cb);
        atom.add_watch("k2", second_cb);

        atom.reset(1);
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 1);

        atom.remove_watch("k1");
        atom.reset(2);
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn watchers_fire_in_registration_order() {
        let atom = Atom::new(0);
        let order = Arc::new(Mutex::new(Vec::new()));

        for key in ["c", "a", "b"] {
            let order = order.clone();
            atom.add_watch(key, move || order.lock().push(key));
        }

        atom.reset(1);
        assert_eq!(*order.lock(), vec!["c", "a", "b"]);
    }

    #[test]
    fn same_key_replaces_previous_watcher() {
        let atom = Atom::new(0);
        let (old, old_cb) = counter();
        let (new, new_cb) = counter();

        atom.add_watch("view", old_cb);
        atom.add_watch("view", new_cb);
        assert_eq!(atom.watcher_count(), 1);

        atom.reset(1);
        assert_eq!(old.load(Ordering::SeqCst), 0);
        assert_eq!(new.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn removing_twice_is_a_no_op() {
        let atom = Atom::new(0);
        let (_, cb) = counter();
        atom.add_watch("k", cb);

        assert!(atom.remove_watch("k"));
        assert!(!atom.remove_watch("k"));
        assert!(!atom.remove_watch("never-added"));
    }

    #[test]
    fn watcher_reads_the_new_value() {
        let atom = Atom::new(String::new());
        let seen = Arc::new(Mutex::new(Vec::new()));

        let reader = atom.clone();
        let seen_clone = seen.clone();
        atom.add_watch("reader", move || {
            seen_clone.lock().push(reader.get_cloned());
        });

        atom.reset("first".into());
        atom.reset("second".into());
        assert_eq!(*seen.lock(), vec!["first".to_string(), "second".to_string()]);
    }

    #[test]
    fn watcher_can_remove_itself() {
        let atom = Atom::new(0);
        let (count, _) = counter();

        let handle = atom.clone();
        let count_clone = count.clone();
        atom.add_watch("once", move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
            handle.remove_watch("once");
        });

        atom.reset(1);
        atom.reset(2);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(atom.watcher_count(), 0);
    }

    #[test]
    fn panicking_watcher_does_not_starve_others() {
        let atom = Atom::new(0);
        let (count, cb) = counter();

        atom.add_watch("broken", || panic!("render failed"));
        atom.add_watch("healthy", cb);

        atom.reset(1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(*atom.get(), 1);
    }

    #[test]
    fn guard_removes_watch_on_drop() {
        let atom = Atom::new(0);
        let (count, cb) = counter();

        let guard = atom.watch("mounted", cb);
        atom.reset(1);
        drop(guard);
        atom.reset(2);

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!atom.is_watched_by("mounted"));
    }

    #[test]
    fn guard_leaves_replacement_alone() {
        let atom = Atom::new(0);
        let (_, first_cb) = counter();
        let (second, second_cb) = counter();

        let guard = atom.watch("view", first_cb);
        atom.add_watch("view", second_cb);
        drop(guard);

        atom.reset(1);
        assert_eq!(second.load(Ordering::SeqCst), 1);
        assert!(atom.is_watched_by("view"));
    }

    #[test]
    fn clone_shares_state() {
        let atom1 = Atom::named("devices", 0);
        let atom2 = atom1.clone();
        let (count, cb) = counter();
        atom2.add_watch("k", cb);

        atom1.reset(42);
        assert_eq!(*atom2.get(), 42);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(atom1.id(), atom2.id());
        assert_eq!(atom2.name(), "devices");
    }

    #[test]
    fn atom_ids_are_unique() {
        let a1 = Atom::new(0);
        let a2 = Atom::new(0);
        let a3 = Atom::new(0);

        assert_ne!(a1.id(), a2.id());
        assert_ne!(a2.id(), a3.id());
        assert_ne!(a1.id(), a3.id());
    }
}
