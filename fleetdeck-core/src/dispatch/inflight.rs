//! In-flight request continuations.
//!
//! Handlers never await on the dispatcher's stack. They hand their network
//! work to [`InFlight::spawn`], which runs it on the ambient tokio runtime
//! and remembers the task so [`InFlight::settle`] can wait for quiescence.

use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::error::HandlerError;

/// Tracker for spawned request continuations.
///
/// Cloning yields another handle to the same tracker.
#[derive(Clone, Default)]
pub struct InFlight {
    tasks: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `work` as a continuation of the action `label`.
    ///
    /// Fails if called outside a tokio runtime.
    pub fn spawn<F>(&self, label: &'static str, work: F) -> Result<(), HandlerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| HandlerError::NoRuntime(label))?;
        let task = runtime.spawn(work.instrument(tracing::debug_span!("continuation", action = label)));

        let mut tasks = self.tasks.lock();
        tasks.retain(|t| !t.is_finished());
        tasks.push(task);
        Ok(())
    }

    /// Continuations that have not finished yet.
    pub fn pending(&self) -> usize {
        self.tasks.lock().iter().filter(|t| !t.is_finished()).count()
    }

    /// Wait until every continuation has finished, including ones spawned
    /// by continuations while waiting.
    pub async fn settle(&self) {
        loop {
            let batch = std::mem::take(&mut *self.tasks.lock());
            if batch.is_empty() {
                return;
            }
            for task in batch {
                if let Err(err) = task.await {
                    if err.is_panic() {
                        tracing::error!("request continuation panicked");
                    }
                }
            }
        }
    }
}

impl std::fmt::Debug for InFlight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InFlight")
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, Ordering};

    #[tokio::test]
    async fn settle_waits_for_chained_work() {
        let in_flight = InFlight::new();
        let done = Arc::new(AtomicI32::new(0));

        let chained = in_flight.clone();
        let done_outer = done.clone();
        in_flight
            .spawn("outer", async move {
                tokio::task::yield_now().await;
                done_outer.fetch_add(1, Ordering::SeqCst);
                let done_inner = done_outer.clone();
                chained
                    .spawn("inner", async move {
                        tokio::task::yield_now().await;
                        done_inner.fetch_add(1, Ordering::SeqCst);
                    })
                    .unwrap();
            })
            .unwrap();

        in_flight.settle().await;
        assert_eq!(done.load(Ordering::SeqCst), 2);
        assert_eq!(in_flight.pending(), 0);
    }

    #[tokio::test]
    async fn panicking_continuation_does_not_poison_settle() {
        let in_flight = InFlight::new();
        in_flight
            .spawn("broken", async { panic!("decoder bug") })
            .unwrap();
        in_flight.settle().await;
        assert_eq!(in_flight.pending(), 0);
    }

    #[test]
    fn spawn_outside_runtime_is_an_error() {
        let in_flight = InFlight::new();
        let err = in_flight.spawn("get-devices", async {}).unwrap_err();
        assert!(matches!(err, HandlerError::NoRuntime("get-devices")));
    }
}
