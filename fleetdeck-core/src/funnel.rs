//! Error and session funnel.
//!
//! Every failed request ends up here, once. The funnel decides whether the
//! failure means the session is gone (start over) or is something to show
//! the user (write it to the shared post-status atom).

use std::sync::Arc;

use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::store::Db;

/// How a failure is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Network failure or a non-success status.
    Transport,
    /// The resource already exists, client-side probe or server-side.
    Conflict,
    /// Authentication expired; the application must start over.
    SessionExpired,
    /// The response could not be decoded. Shown like a transport failure.
    Malformed,
}

impl FailureClass {
    /// Whether the failure is written to the post-status atom.
    pub fn is_displayed(&self) -> bool {
        !matches!(self, Self::SessionExpired)
    }
}

/// Reacts to an expired session.
pub trait SessionListener: Send + Sync {
    fn session_expired(&self);
}

impl<F> SessionListener for F
where
    F: Fn() + Send + Sync,
{
    fn session_expired(&self) {
        self()
    }
}

/// Default listener: wipe every atom, as a fresh page load would.
pub struct ResetOnExpiry {
    db: Arc<Db>,
}

impl ResetOnExpiry {
    pub fn new(db: Arc<Db>) -> Self {
        Self { db }
    }
}

impl SessionListener for ResetOnExpiry {
    fn session_expired(&self) {
        self.db.clear();
    }
}

/// Classifies failed requests and routes them.
#[derive(Clone)]
pub struct ErrorFunnel {
    db: Arc<Db>,
    config: Arc<StoreConfig>,
    session: Arc<dyn SessionListener>,
}

impl ErrorFunnel {
    pub fn new(db: Arc<Db>, config: Arc<StoreConfig>, session: Arc<dyn SessionListener>) -> Self {
        Self {
            db,
            config,
            session,
        }
    }

    pub fn classify(&self, err: &StoreError) -> FailureClass {
        match err {
            StoreError::Http(http) => match http.status() {
                Some(status) if status == self.config.session_expired_status => {
                    FailureClass::SessionExpired
                }
                Some(status) if status == self.config.conflict_status => FailureClass::Conflict,
                _ => FailureClass::Transport,
            },
            StoreError::Conflict(_) => FailureClass::Conflict,
            StoreError::Malformed { .. } => FailureClass::Malformed,
            StoreError::Dispatch(_) => FailureClass::Transport,
        }
    }

    /// Route one failure. Returns how it was classified.
    pub fn report(&self, err: &StoreError) -> FailureClass {
        let class = self.classify(err);
        match class {
            FailureClass::SessionExpired => {
                tracing::warn!("session expired; resetting application state");
                self.session.session_expired();
            }
            _ => {
                let message = user_message(err);
                tracing::warn!(?class, %message, "request failed");
                self.db.post_status.reset(message);
            }
        }
        class
    }
}

impl std::fmt::Debug for ErrorFunnel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorFunnel")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Text shown to the user for `err`: the server's `errorMsg` when it sent
/// one, otherwise the error's own description.
pub fn user_message(err: &StoreError) -> String {
    match err {
        StoreError::Http(http) => http
            .server_message()
            .map(str::to_string)
            .unwrap_or_else(|| http.to_string()),
        other => other.to_string(),
    }
}
