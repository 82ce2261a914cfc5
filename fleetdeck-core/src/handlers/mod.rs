//! Action Handlers
//!
//! One handler per backend domain. Each is registered with the dispatcher,
//! looks at every action, and acts on the kinds it owns. Handlers hold no
//! state of their own: everything they learn goes into atoms.
//!
//! Per invocation a handler goes `Idle -> RequestInFlight -> Idle`: it
//! spawns its requests and returns. On success the continuation resets
//! atoms (or dispatches a follow-up); on failure it reports to the
//! [`ErrorFunnel`] and leaves atoms untouched.

mod activity;
mod components;
mod devices;
mod filters;
mod firmware;
mod package_filters;
mod packages;
mod updates;

pub use activity::ActivityHandler;
pub use components::ComponentsHandler;
pub use devices::DevicesHandler;
pub use filters::FiltersHandler;
pub use firmware::FirmwareHandler;
pub use package_filters::PackageFiltersHandler;
pub use packages::PackagesHandler;
pub use updates::UpdatesHandler;

use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::StoreConfig;
use crate::dispatch::{Action, DispatchHandle, InFlight};
use crate::error::{HandlerError, StoreError};
use crate::funnel::ErrorFunnel;
use crate::store::{Atom, Db};
use crate::transport::{Method, Transport};
use crate::workflow::IdGenerator;

/// Everything a handler needs, passed in explicitly.
#[derive(Clone)]
pub struct HandlerContext {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) db: Arc<Db>,
    pub(crate) config: Arc<StoreConfig>,
    pub(crate) funnel: ErrorFunnel,
    pub(crate) dispatcher: DispatchHandle,
    pub(crate) in_flight: InFlight,
    pub(crate) ids: Arc<dyn IdGenerator>,
}

impl HandlerContext {
    pub fn new(
        transport: Arc<dyn Transport>,
        db: Arc<Db>,
        config: Arc<StoreConfig>,
        funnel: ErrorFunnel,
        dispatcher: DispatchHandle,
        in_flight: InFlight,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            transport,
            db,
            config,
            funnel,
            dispatcher,
            in_flight,
            ids,
        }
    }

    pub fn db(&self) -> &Arc<Db> {
        &self.db
    }

    /// Absolute path for an API-relative `path`.
    pub fn url(&self, path: &str) -> String {
        self.config.url(path)
    }

    /// Issue a request and return the raw response body.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, StoreError> {
        tracing::debug!(%method, path, "request");
        Ok(self.transport.request(method, path, body).await?)
    }

    /// GET `path` and decode the body as `T`.
    pub async fn fetch<T: DeserializeOwned>(&self, path: &str) -> Result<T, StoreError> {
        let body = self.send(Method::Get, path, None).await?;
        serde_json::from_value(body).map_err(|err| StoreError::malformed(path, err))
    }

    /// Succeed only if `path` does not exist yet.
    ///
    /// A found resource is a conflict named after `what`; a 404 means go
    /// ahead; anything else is a failure in its own right. The answer can
    /// be stale by the time the caller writes, so the write must still
    /// handle a server-side conflict.
    pub async fn probe_absent(&self, path: &str, what: &str) -> Result<(), StoreError> {
        match self.send(Method::Get, path, None).await {
            Ok(_) => Err(StoreError::Conflict(format!("{what} already exists"))),
            Err(StoreError::Http(err)) if err.is_not_found() => Ok(()),
            Err(err) => Err(err),
        }
    }

    /// Dispatch a follow-up action from a continuation.
    pub fn follow_up(&self, action: &Action) -> Result<(), StoreError> {
        self.dispatcher.dispatch(action)?;
        Ok(())
    }

    /// Run `work` as a continuation; its failure goes to the funnel.
    pub(crate) fn run<F>(&self, label: &'static str, work: F) -> Result<(), HandlerError>
    where
        F: Future<Output = Result<(), StoreError>> + Send + 'static,
    {
        let funnel = self.funnel.clone();
        self.in_flight.spawn(label, async move {
            if let Err(err) = work.await {
                funnel.report(&err);
            }
        })
    }

    /// GET `path` and replace `atom` with the decoded body.
    pub(crate) fn load_into<T>(
        &self,
        label: &'static str,
        path: String,
        atom: &Atom<T>,
    ) -> Result<(), HandlerError>
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        self.load_projected(label, path, atom, |body: T| body)
    }

    /// GET `path`, decode it as `R`, and replace `atom` with `project(R)`.
    pub(crate) fn load_projected<R, T, P>(
        &self,
        label: &'static str,
        path: String,
        atom: &Atom<T>,
        project: P,
    ) -> Result<(), HandlerError>
    where
        R: DeserializeOwned + Send + 'static,
        T: Send + Sync + 'static,
        P: FnOnce(R) -> T + Send + 'static,
    {
        let ctx = self.clone();
        let atom = atom.clone();
        self.run(label, async move {
            let body: R = ctx.fetch(&path).await?;
            atom.reset(project(body));
            Ok(())
        })
    }

    /// Issue a write, then dispatch `follow_ups` in order once it succeeds.
    pub(crate) fn write_then(
        &self,
        label: &'static str,
        method: Method,
        path: String,
        body: Option<Value>,
        follow_ups: Vec<Action>,
    ) -> Result<(), HandlerError> {
        let ctx = self.clone();
        self.run(label, async move {
            ctx.send(method, &path, body).await?;
            for action in &follow_ups {
                ctx.follow_up(action)?;
            }
            Ok(())
        })
    }
}

impl std::fmt::Debug for HandlerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerContext")
            .field("config", &self.config)
            .field("in_flight", &self.in_flight)
            .finish_non_exhaustive()
    }
}

/// `?regex=R` when a pattern was given, nothing otherwise (match-all).
pub(crate) fn regex_query(regex: Option<&str>) -> String {
    match regex {
        Some(pattern) if !pattern.is_empty() => format!("?regex={pattern}"),
        _ => String::new(),
    }
}

/// Reject an empty identifier before any request is issued.
pub(crate) fn require(kind: &'static str, field: &str, value: &str) -> Result<(), HandlerError> {
    if value.trim().is_empty() {
        return Err(HandlerError::InvalidPayload {
            kind,
            reason: format!("`{field}` must not be empty"),
        });
    }
    Ok(())
}

/// Project device records to their uuids.
pub(crate) fn device_uuids(devices: Vec<crate::model::DeviceRef>) -> Vec<String> {
    devices.into_iter().map(|device| device.uuid).collect()
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use crate::transport::MockTransport;
    use crate::workflow::SequentialIds;
    use crate::FleetStore;

    /// A full store over a scripted transport with predictable ids.
    pub(crate) fn store() -> (FleetStore, Arc<MockTransport>) {
        let transport = Arc::new(MockTransport::new());
        let store = FleetStore::builder(transport.clone())
            .id_generator(SequentialIds::new("id"))
            .build();
        (store, transport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regex_query_defaults_to_match_all() {
        assert_eq!(regex_query(None), "");
        assert_eq!(regex_query(Some("")), "");
        assert_eq!(regex_query(Some(".")), "?regex=.");
    }

    #[test]
    fn blank_identifiers_are_rejected() {
        assert!(require("get-package", "name", "  ").is_err());
        assert!(require("get-package", "name", "vim").is_ok());
    }
}
