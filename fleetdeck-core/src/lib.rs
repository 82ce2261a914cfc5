//! Fleetdeck Core
//!
//! The client-side state core of the fleet management console. It holds
//! the last known server state in observable atoms, routes user intents to
//! per-domain handlers, and funnels every failed request through one place.
//!
//! - Reactive atoms with change watchers (`store`)
//! - Synchronous action broadcast with re-entrancy detection (`dispatch`)
//! - One handler per backend domain (`handlers`)
//! - Multi-step workflows with explicit partial-failure reporting (`workflow`)
//! - Error and session funnel (`funnel`)
//!
//! Rendering, routing and the HTTP client itself live outside this crate;
//! requests go through the [`transport::Transport`] trait.
//!
//! # Architecture
//!
//! [`FleetStore`] wires everything together: it builds the [`store::Db`],
//! the [`dispatch::Dispatcher`] and the [`funnel::ErrorFunnel`], then
//! registers the handlers in a fixed order. The activity handler goes
//! first so each dispatch starts by clearing the previous failure message.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use fleetdeck_core::{dispatch::Action, FleetStore};
//!
//! let store = FleetStore::new(Arc::new(my_transport));
//!
//! let _guard = store.db().searchable_devices.watch("device-table", || {
//!     // schedule a redraw
//! });
//!
//! store.dispatch(&Action::SearchDevicesByRegex { regex: None })?;
//! store.settle().await;
//! ```

pub mod config;
pub mod dispatch;
pub mod error;
pub mod funnel;
pub mod handlers;
pub mod model;
pub mod store;
pub mod transport;
pub mod workflow;

use std::sync::Arc;

use config::StoreConfig;
use dispatch::{Action, DispatchReport, Dispatcher, InFlight, Subscription};
use error::DispatchError;
use funnel::{ErrorFunnel, ResetOnExpiry, SessionListener};
use handlers::{
    ActivityHandler, ComponentsHandler, DevicesHandler, FiltersHandler, FirmwareHandler,
    HandlerContext, PackageFiltersHandler, PackagesHandler, UpdatesHandler,
};
use store::Db;
use transport::Transport;
use workflow::{IdGenerator, RandomIds};

/// A fully wired console store.
///
/// Dropping it unregisters every handler. Continuations still in flight
/// keep running; any follow-up they dispatch is dropped.
pub struct FleetStore {
    db: Arc<Db>,
    dispatcher: Dispatcher,
    in_flight: InFlight,
    funnel: ErrorFunnel,
    context: HandlerContext,
    _subscriptions: Vec<Subscription>,
}

impl FleetStore {
    /// A store with default configuration, random ids and the
    /// reset-on-expiry session policy.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::builder(transport).build()
    }

    pub fn builder(transport: Arc<dyn Transport>) -> FleetStoreBuilder {
        FleetStoreBuilder {
            transport,
            config: StoreConfig::default(),
            ids: Arc::new(RandomIds),
            session: None,
        }
    }

    pub fn db(&self) -> &Arc<Db> {
        &self.db
    }

    /// Broadcast `action` to every handler.
    pub fn dispatch(&self, action: &Action) -> Result<DispatchReport, DispatchError> {
        self.dispatcher.dispatch(action)
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn funnel(&self) -> &ErrorFunnel {
        &self.funnel
    }

    /// The context the built-in handlers share, for running workflows or
    /// registering additional handlers.
    pub fn context(&self) -> HandlerContext {
        self.context.clone()
    }

    /// Wait until every request continuation, and everything they chained,
    /// has finished.
    pub async fn settle(&self) {
        self.in_flight.settle().await
    }

    /// Continuations that have not finished yet.
    pub fn pending(&self) -> usize {
        self.in_flight.pending()
    }
}

impl std::fmt::Debug for FleetStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FleetStore")
            .field("handlers", &self.dispatcher.handler_names())
            .field("in_flight", &self.in_flight)
            .finish_non_exhaustive()
    }
}

/// Builder for [`FleetStore`].
pub struct FleetStoreBuilder {
    transport: Arc<dyn Transport>,
    config: StoreConfig,
    ids: Arc<dyn IdGenerator>,
    session: Option<Arc<dyn SessionListener>>,
}

impl FleetStoreBuilder {
    pub fn config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    pub fn id_generator(mut self, ids: impl IdGenerator + 'static) -> Self {
        self.ids = Arc::new(ids);
        self
    }

    /// Replace the default session policy, which clears every atom.
    pub fn session_listener(mut self, listener: impl SessionListener + 'static) -> Self {
        self.session = Some(Arc::new(listener));
        self
    }

    pub fn build(self) -> FleetStore {
        let db = Arc::new(Db::new());
        let config = Arc::new(self.config);
        let session: Arc<dyn SessionListener> = match self.session {
            Some(listener) => listener,
            None => Arc::new(ResetOnExpiry::new(db.clone())),
        };
        let funnel = ErrorFunnel::new(db.clone(), config.clone(), session);
        let dispatcher = Dispatcher::new();
        let in_flight = InFlight::new();

        let context = HandlerContext::new(
            self.transport,
            db.clone(),
            config,
            funnel.clone(),
            dispatcher.handle(),
            in_flight.clone(),
            self.ids,
        );

        let subscriptions = vec![
            dispatcher.register("activity", ActivityHandler::new(db.clone())),
            dispatcher.register("devices", DevicesHandler::new(context.clone())),
            dispatcher.register("packages", PackagesHandler::new(context.clone())),
            dispatcher.register("filters", FiltersHandler::new(context.clone())),
            dispatcher.register(
                "package-filters",
                PackageFiltersHandler::new(context.clone()),
            ),
            dispatcher.register("components", ComponentsHandler::new(context.clone())),
            dispatcher.register("firmware", FirmwareHandler::new(context.clone())),
            dispatcher.register("updates", UpdatesHandler::new(context.clone())),
        ];
        tracing::debug!(handlers = subscriptions.len(), "store ready");

        FleetStore {
            db,
            dispatcher,
            in_flight,
            funnel,
            context,
            _subscriptions: subscriptions,
        }
    }
}
