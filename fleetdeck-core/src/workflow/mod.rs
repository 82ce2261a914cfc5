//! Multi-step Workflows
//!
//! Some actions need several dependent requests. A workflow runs them as an
//! explicit sequence of named steps: step N+1 is issued only after step N
//! succeeded, and the first failure ends the run.
//!
//! # Partial Failure
//!
//! Nothing is rolled back. If a write step succeeded before a later step
//! failed, the backends keep that write. [`WorkflowFailure`] records which
//! steps completed so callers can see, log and test the gap;
//! [`WorkflowFailure::is_partial`] says whether server state was changed.

mod create_device;
mod ids;

pub use create_device::{CreateDevice, CreateDeviceStep};
pub use ids::{IdGenerator, RandomIds, SequentialIds};

use std::fmt::Debug;
use std::future::Future;

use crate::error::StoreError;

/// A named step of a workflow.
pub trait WorkflowStep: Debug + Copy + Send + 'static {
    /// Whether the step changes server state.
    fn is_write(&self) -> bool;
}

/// Why a workflow stopped.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{failed_at:?} failed after {completed:?}: {error}")]
pub struct WorkflowFailure<S: WorkflowStep> {
    pub failed_at: S,
    /// Steps that succeeded before the failure, in order.
    pub completed: Vec<S>,
    pub error: StoreError,
}

impl<S: WorkflowStep> WorkflowFailure<S> {
    /// Whether a completed step had already written to a backend.
    pub fn is_partial(&self) -> bool {
        self.completed.iter().any(|step| step.is_write())
    }
}

/// Runs steps in order and remembers which ones finished.
#[derive(Debug)]
pub struct Progress<S: WorkflowStep> {
    completed: Vec<S>,
}

impl<S: WorkflowStep> Progress<S> {
    pub fn new() -> Self {
        Self {
            completed: Vec::new(),
        }
    }

    /// Await `work` as `step`. On failure nothing further should run; the
    /// returned error carries every step completed so far.
    pub async fn step<T, F>(&mut self, step: S, work: F) -> Result<T, WorkflowFailure<S>>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match work.await {
            Ok(value) => {
                tracing::debug!(?step, "workflow step completed");
                self.completed.push(step);
                Ok(value)
            }
            Err(error) => Err(WorkflowFailure {
                failed_at: step,
                completed: self.completed.clone(),
                error,
            }),
        }
    }

    pub fn completed(&self) -> &[S] {
        &self.completed
    }
}

impl<S: WorkflowStep> Default for Progress<S> {
    fn default() -> Self {
        Self::new()
    }
}
