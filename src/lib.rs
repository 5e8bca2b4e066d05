pub mod app;
pub mod catalog;
pub mod commands;
pub mod config;
pub mod events;
pub mod model;
pub mod net;
pub mod reconcile;
pub mod schema;
pub mod store;
pub mod transport;

pub use app::{init_tracing, AppServices};
pub use catalog::{Catalog, CatalogError};
pub use commands::{CommandHandle, CommandKind, Dispatch, Dispatcher};
pub use config::AppConfig;
pub use events::StoreEvent;
pub use model::{
    price_for, Batch, BatchId, NewBatch, Polygon, PolygonPool, Pool, PoolId, PricedPolygon,
    RunOptions,
};
pub use net::normalize_server_base;
pub use reconcile::{ReconcileHandle, Reconciler, TickOutcome};
pub use schema::{validate_form, FormKind, FormSchema, Violation};
pub use store::{Store, StoreObserver, StoreSnapshot, SubscriptionId};
pub use transport::{BatchTransport, HttpTransport, TransportError};

// Test support infrastructure (test_support/) is only compiled for unit tests.
#[cfg(test)]
pub mod test_support;
