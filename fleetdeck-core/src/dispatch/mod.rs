//! Action Dispatch
//!
//! Views express intents as [`Action`] values and hand them to the
//! [`Dispatcher`], which broadcasts each one synchronously to every
//! registered [`Handler`]. Handlers start network requests as
//! continuations tracked by [`InFlight`]; when those complete they reset
//! atoms, and may dispatch follow-up actions through a [`DispatchHandle`].
//!
//! # Ordering
//!
//! A broadcast runs to completion before `dispatch` returns. Continuations
//! run later, on the async runtime, never inside a broadcast. That is what
//! lets a chained workflow dispatch its next action without nesting.

mod action;
mod dispatcher;
mod inflight;
mod scope;

pub use action::Action;
pub use dispatcher::{DispatchHandle, DispatchReport, Dispatcher, Handler, Subscription};
pub use inflight::InFlight;
pub use scope::{DispatchScope, DispatcherId};
