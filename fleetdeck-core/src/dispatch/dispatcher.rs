//! Dispatcher
//!
//! The dispatcher is the single broadcast point for actions. Every
//! registered handler sees every action, in registration order, before
//! `dispatch` returns.
//!
//! # Guarantees
//!
//! 1. Fan-out: each handler registered when a broadcast starts receives the
//!    action exactly once, by reference, so all handlers see the same value.
//!
//! 2. Isolation: a handler that returns an error or panics is logged and
//!    skipped; the rest still receive the action.
//!
//! 3. No nesting: a handler calling `dispatch` on the dispatcher that is
//!    invoking it gets [`DispatchError::Reentrant`] and the inner action is
//!    dropped. Chained actions must be issued from async continuations,
//!    after the outer broadcast has finished.
//!
//! 4. Serialization: broadcasts issued from different threads run one at a
//!    time.
//!
//! # Registration
//!
//! `register` returns a [`Subscription`]. Dropping it unregisters the
//! handler, so a consumer cannot outlive its registration by accident.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};

use super::action::Action;
use super::scope::{DispatchScope, DispatcherId};
use crate::error::{DispatchError, HandlerError};

/// Domain logic invoked for every dispatched action.
///
/// Handlers ignore the action kinds they do not own. Anything slow must be
/// spawned; `handle` runs on the dispatcher's stack.
pub trait Handler: Send + Sync {
    fn handle(&self, action: &Action) -> Result<(), HandlerError>;
}

impl<F> Handler for F
where
    F: Fn(&Action) -> Result<(), HandlerError> + Send + Sync,
{
    fn handle(&self, action: &Action) -> Result<(), HandlerError> {
        self(action)
    }
}

struct Registered {
    id: u64,
    name: Arc<str>,
    handler: Arc<dyn Handler>,
}

struct Inner {
    id: DispatcherId,
    handlers: RwLock<Vec<Registered>>,
    /// Held for the length of a broadcast.
    serial: Mutex<()>,
    next_handler_id: AtomicU64,
}

/// Outcome of one broadcast.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Handlers that were invoked.
    pub delivered: usize,
    /// Names of handlers that returned an error or panicked.
    pub failed: Vec<String>,
}

impl DispatchReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Broadcasts actions to registered handlers.
///
/// Cloning yields another handle to the same dispatcher.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                id: DispatcherId::new(),
                handlers: RwLock::new(Vec::new()),
                serial: Mutex::new(()),
                next_handler_id: AtomicU64::new(0),
            }),
        }
    }

    pub fn id(&self) -> DispatcherId {
        self.inner.id
    }

    /// Add `handler` to the end of the broadcast list.
    pub fn register<H>(&self, name: impl Into<String>, handler: H) -> Subscription
    where
        H: Handler + 'static,
    {
        let id = self.inner.next_handler_id.fetch_add(1, Ordering::Relaxed);
        let name: Arc<str> = Arc::from(name.into());
        tracing::debug!(handler = %name, "handler registered");

        self.inner.handlers.write().push(Registered {
            id,
            name: Arc::clone(&name),
            handler: Arc::new(handler),
        });

        Subscription {
            handler_id: id,
            name,
            dispatcher: Arc::downgrade(&self.inner),
            detached: false,
        }
    }

    /// Deliver `action` to every registered handler, in order.
    pub fn dispatch(&self, action: &Action) -> Result<DispatchReport, DispatchError> {
        let kind = action.kind();
        let Some(_scope) = DispatchScope::enter(self.inner.id) else {
            tracing::error!(kind, "dispatch issued from inside a handler; action dropped");
            return Err(DispatchError::Reentrant { kind });
        };
        let _serial = self.inner.serial.lock();

        // Snapshot so handlers may register or unregister while we iterate.
        let handlers: Vec<(Arc<str>, Arc<dyn Handler>)> = self
            .inner
            .handlers
            .read()
            .iter()
            .map(|r| (Arc::clone(&r.name), Arc::clone(&r.handler)))
            .collect();

        let mut report = DispatchReport::default();
        for (name, handler) in handlers {
            report.delivered += 1;
            match catch_unwind(AssertUnwindSafe(|| handler.handle(action))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    tracing::error!(handler = %name, kind, error = %err, "handler failed");
                    report.failed.push(name.to_string());
                }
                Err(_) => {
                    tracing::error!(handler = %name, kind, "handler panicked");
                    report.failed.push(name.to_string());
                }
            }
        }

        Ok(report)
    }

    /// A weak handle for issuing follow-up actions from continuations.
    pub fn handle(&self) -> DispatchHandle {
        DispatchHandle {
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub fn handler_count(&self) -> usize {
        self.inner.handlers.read().len()
    }

    /// Names of registered handlers, in broadcast order.
    pub fn handler_names(&self) -> Vec<String> {
        self.inner
            .handlers
            .read()
            .iter()
            .map(|r| r.name.to_string())
            .collect()
    }

    /// Whether a broadcast is in progress on the current thread.
    pub fn is_dispatching(&self) -> bool {
        DispatchScope::is_dispatching(self.inner.id)
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("id", &self.inner.id)
            .field("handlers", &self.handler_names())
            .finish()
    }
}

/// Handle to a registered handler.
///
/// Dropping the subscription unregisters the handler.
#[must_use = "dropping the subscription unregisters the handler"]
pub struct Subscription {
    handler_id: u64,
    name: Arc<str>,
    dispatcher: Weak<Inner>,
    detached: bool,
}

impl Subscription {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Keep the handler registered for the dispatcher's whole lifetime.
    pub fn detach(mut self) {
        self.detached = true;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if self.detached {
            return;
        }
        if let Some(inner) = self.dispatcher.upgrade() {
            inner.handlers.write().retain(|r| r.id != self.handler_id);
            tracing::debug!(handler = %self.name, "handler unregistered");
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("name", &self.name)
            .field("detached", &self.detached)
            .finish()
    }
}

/// Weak dispatcher handle held by handlers and their continuations.
///
/// Holding a strong reference from inside a handler would keep the
/// dispatcher alive through its own handler list.
#[derive(Clone)]
pub struct DispatchHandle {
    inner: Weak<Inner>,
}

impl DispatchHandle {
    /// Dispatch `action` if the dispatcher is still alive.
    pub fn dispatch(&self, action: &Action) -> Result<DispatchReport, DispatchError> {
        let inner = self.inner.upgrade().ok_or(DispatchError::Closed)?;
        Dispatcher { inner }.dispatch(action)
    }

    pub fn is_closed(&self) -> bool {
        self.inner.strong_count() == 0
    }
}

impl fmt::Debug for DispatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchHandle")
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex as PlMutex;

    /// (handler name, address of the action it received)
    type Log = Arc<PlMutex<Vec<(String, usize)>>>;

    fn recorder(name: &'static str, log: &Log) -> impl Handler + 'static {
        let log = Arc::clone(log);
        move |action: &Action| -> Result<(), HandlerError> {
            log.lock()
                .push((name.to_string(), action as *const Action as usize));
            Ok(())
        }
    }

    #[test]
    fn fans_out_in_registration_order() {
        let dispatcher = Dispatcher::new();
        let log: Log = Arc::default();

        let _h1 = dispatcher.register("h1", recorder("h1", &log));
        let _h2 = dispatcher.register("h2", recorder("h2", &log));
        let _h3 = dispatcher.register("h3", recorder("h3", &log));

        let action = Action::GetDevices;
        let report = dispatcher.dispatch(&action).unwrap();

        assert_eq!(report.delivered, 3);
        assert!(report.is_clean());

        let log = log.lock();
        let names: Vec<_> = log.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["h1", "h2", "h3"]);
        // Same message instance for every handler.
        let address = &action as *const Action as usize;
        assert!(log.iter().all(|(_, seen)| *seen == address));
    }

    #[test]
    fn failing_handlers_do_not_block_others() {
        let dispatcher = Dispatcher::new();
        let seen = Arc::new(PlMutex::new(Vec::new()));

        let s1 = Arc::clone(&seen);
        let _h1 = dispatcher.register("h1", move |_: &Action| -> Result<(), HandlerError> {
            s1.lock().push("h1");
            Ok(())
        });
        let _h2 = dispatcher.register("h2", |_: &Action| -> Result<(), HandlerError> {
            panic!("packages handler bug")
        });
        let _h2b = dispatcher.register("h2b", |action: &Action| -> Result<(), HandlerError> {
            Err(HandlerError::InvalidPayload {
                kind: action.kind(),
                reason: "bad".into(),
            })
        });
        let s3 = Arc::clone(&seen);
        let _h3 = dispatcher.register("h3", move |_: &Action| -> Result<(), HandlerError> {
            s3.lock().push("h3");
            Ok(())
        });

        let report = dispatcher.dispatch(&Action::GetDevices).unwrap();

        assert_eq!(*seen.lock(), vec!["h1", "h3"]);
        assert_eq!(report.delivered, 4);
        assert_eq!(report.failed, vec!["h2".to_string(), "h2b".to_string()]);
    }

    #[test]
    fn nested_dispatch_is_rejected() {
        let dispatcher = Dispatcher::new();
        let handle = dispatcher.handle();
        let nested = Arc::new(PlMutex::new(None));
        let calls = Arc::new(AtomicU64::new(0));

        let nested_clone = Arc::clone(&nested);
        let calls_clone = Arc::clone(&calls);
        let _h = dispatcher.register("chain", move |action: &Action| -> Result<(), HandlerError> {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            if matches!(action, Action::GetDevices) {
                *nested_clone.lock() = Some(handle.dispatch(&Action::GetPackages));
            }
            Ok(())
        });

        dispatcher.dispatch(&Action::GetDevices).unwrap();

        assert_eq!(
            *nested.lock(),
            Some(Err(DispatchError::Reentrant {
                kind: "get-packages"
            }))
        );
        // The nested action never reached anyone.
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!dispatcher.is_dispatching());
    }

    #[test]
    fn dispatch_after_broadcast_is_allowed() {
        let dispatcher = Dispatcher::new();
        let count = Arc::new(AtomicU64::new(0));
        let count_clone = Arc::clone(&count);
        let _h = dispatcher.register("count", move |_: &Action| -> Result<(), HandlerError> {
            count_clone.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        dispatcher.dispatch(&Action::GetDevices).unwrap();
        dispatcher.handle().dispatch(&Action::GetPackages).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn dropping_subscription_unregisters() {
        let dispatcher = Dispatcher::new();
        let sub = dispatcher.register("temp", |_: &Action| -> Result<(), HandlerError> { Ok(()) });
        assert_eq!(dispatcher.handler_count(), 1);
        assert_eq!(sub.name(), "temp");

        drop(sub);
        assert_eq!(dispatcher.handler_count(), 0);
    }

    #[test]
    fn detached_subscription_stays_registered() {
        let dispatcher = Dispatcher::new();
        dispatcher.register("forever", |_: &Action| -> Result<(), HandlerError> { Ok(()) }).detach();
        assert_eq!(dispatcher.handler_names(), vec!["forever".to_string()]);
    }

    #[test]
    fn handle_reports_closed_dispatcher() {
        let dispatcher = Dispatcher::new();
        let handle = dispatcher.handle();
        assert!(!handle.is_closed());

        drop(dispatcher);
        assert!(handle.is_closed());
        assert_eq!(
            handle.dispatch(&Action::GetDevices),
            Err(DispatchError::Closed)
        );
    }

    #[test]
    fn handler_can_unregister_during_broadcast() {
        let dispatcher = Dispatcher::new();
        let slot: Arc<PlMutex<Option<Subscription>>> = Arc::default();

        let slot_clone = Arc::clone(&slot);
        let sub = dispatcher.register("self-removing", move |_: &Action| -> Result<(), HandlerError> {
            slot_clone.lock().take();
            Ok(())
        });
        *slot.lock() = Some(sub);

        dispatcher.dispatch(&Action::GetDevices).unwrap();
        assert_eq!(dispatcher.handler_count(), 0);
    }
}
