//! Dispatch Scope
//!
//! Tracks which dispatchers are broadcasting on the current thread, so a
//! handler that calls `dispatch` on the dispatcher currently invoking it can
//! be caught instead of starting a nested broadcast.
//!
//! # Implementation
//!
//! We use a thread-local stack of dispatcher IDs. Entering a broadcast
//! pushes the dispatcher's ID; the guard pops it when dropped, including
//! when a handler panics. Distinct dispatchers may nest; the same one may
//! not.

use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, Ordering};

thread_local! {
    static DISPATCH_STACK: RefCell<Vec<DispatcherId>> = const { RefCell::new(Vec::new()) };
}

/// Unique identifier for a dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DispatcherId(u64);

impl DispatcherId {
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for DispatcherId {
    fn default() -> Self {
        Self::new()
    }
}

/// Guard marking a broadcast in progress on this thread.
pub struct DispatchScope {
    dispatcher: DispatcherId,
}

impl DispatchScope {
    /// Enter a broadcast for `dispatcher`.
    ///
    /// Returns `None` if that dispatcher is already broadcasting further up
    /// this thread's stack.
    pub fn enter(dispatcher: DispatcherId) -> Option<Self> {
        DISPATCH_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            if stack.contains(&dispatcher) {
                return None;
            }
            stack.push(dispatcher);
            Some(Self { dispatcher })
        })
    }

    /// Whether `dispatcher` is broadcasting on this thread.
    pub fn is_dispatching(dispatcher: DispatcherId) -> bool {
        DISPATCH_STACK.with(|stack| stack.borrow().contains(&dispatcher))
    }

    /// Number of broadcasts currently nested on this thread.
    pub fn depth() -> usize {
        DISPATCH_STACK.with(|stack| stack.borrow().len())
    }
}

impl Drop for DispatchScope {
    fn drop(&mut self) {
        DISPATCH_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();
            debug_assert_eq!(
                popped,
                Some(self.dispatcher),
                "DispatchScope mismatch: expected {:?}, got {:?}",
                self.dispatcher,
                popped
            );
        });
    }
}
