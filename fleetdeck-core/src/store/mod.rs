//! Reactive Store
//!
//! The store is a set of atoms, each holding the last known server state for
//! one resource. Handlers write to atoms with `reset`; presentation
//! consumers read with `get` and register watchers to hear about changes.
//!
//! # Concepts
//!
//! ## Atoms
//!
//! An [`Atom`] is a cell with a replace-only API. Every `reset` notifies
//! every watcher exactly once. There is no diffing and no partial update.
//!
//! ## Watchers
//!
//! A [`Watcher`] is a zero-argument "something changed" signal registered
//! under a [`WatchKey`]. Consumers pair `add_watch` with `remove_watch`, or
//! hold a [`WatchGuard`] that removes the watch when dropped.
//!
//! ## Db
//!
//! [`Db`] is the constructed collection of named atoms that handlers and
//! views share. It is passed around explicitly; there is no global instance.

mod atom;
mod db;
mod watcher;

pub use atom::Atom;
pub use db::{empty_record, Db, Listing};
pub use watcher::{WatchGuard, WatchKey, Watcher};
