//! Crate-level error types.
//!
//! `StoreError` is what a network continuation produces and what the
//! [`ErrorFunnel`](crate::funnel::ErrorFunnel) classifies. `HandlerError`
//! covers the synchronous part of a handler (before anything is in flight),
//! and `DispatchError` is returned by the dispatcher itself.

use crate::transport::HttpError;

/// Failure of a request issued on behalf of an action.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    /// The backend rejected the request, or it never reached the backend.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// The backend answered, but the body did not have the expected shape.
    #[error("malformed response from {path}: {reason}")]
    Malformed {
        /// Request path that produced the body.
        path: String,
        /// Decoder message.
        reason: String,
    },

    /// A client-side precondition failed, e.g. the resource already exists.
    #[error("{0}")]
    Conflict(String),

    /// A follow-up action could not be dispatched.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

impl StoreError {
    /// Build a `Malformed` error from a decoder failure.
    pub fn malformed(path: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Malformed {
            path: path.into(),
            reason: err.to_string(),
        }
    }
}

/// Error returned by [`Dispatcher::dispatch`](crate::dispatch::Dispatcher::dispatch).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// A handler tried to dispatch while the same dispatcher was still
    /// broadcasting on the current call stack. The message was dropped.
    #[error("cannot dispatch `{kind}` while another action is being dispatched")]
    Reentrant {
        /// Kind of the rejected action.
        kind: &'static str,
    },

    /// The dispatcher behind a [`DispatchHandle`](crate::dispatch::DispatchHandle)
    /// has been dropped.
    #[error("dispatcher is no longer running")]
    Closed,
}

/// Error raised synchronously by a handler while it prepares its requests.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// The action payload is unusable (e.g. an empty identifier).
    #[error("invalid payload for `{kind}`: {reason}")]
    InvalidPayload {
        /// Kind of the offending action.
        kind: &'static str,
        /// What was wrong with it.
        reason: String,
    },

    /// No async runtime is available to run the request continuation.
    #[error("no async runtime available to run `{0}`")]
    NoRuntime(&'static str),
}

/// Error returned when loading a [`StoreConfig`](crate::config::StoreConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The TOML document could not be parsed.
    #[error("invalid store config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A field parsed but holds an unusable value.
    #[error("invalid store config: {0}")]
    Invalid(String),
}
