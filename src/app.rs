use std::sync::Arc;

use anyhow::{Context, Result};

use crate::{
    catalog::Catalog,
    commands::Dispatcher,
    config::{
        errors::{ERR_CATALOG_LOAD, ERR_TRANSPORT_CLIENT},
        AppConfig,
    },
    reconcile::{ReconcileHandle, Reconciler},
    store::Store,
    transport::{BatchTransport, HttpTransport},
};

// Initialize tracing once; later calls are no-ops.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
    tracing::debug!(target = "poolmap", "tracing initialized");
}

/// Everything a front end needs: the shared store, a command dispatcher and,
/// when a server is configured, the running reconciliation loop.
pub struct AppServices {
    pub store: Arc<Store>,
    pub dispatcher: Dispatcher,
    reconciler: Option<ReconcileHandle>,
}

impl AppServices {
    /// Load the catalog, build the HTTP transport and start reconciling.
    /// Must be called inside a tokio runtime.
    pub fn init(config: &AppConfig) -> Result<Self> {
        let catalog = Catalog::load(config)
            .with_context(|| format!("{ERR_CATALOG_LOAD}: catalog load failed"))?;
        let transport = HttpTransport::new(config.http_timeout())
            .with_context(|| format!("{ERR_TRANSPORT_CLIENT}: http client init failed"))?;
        Ok(Self::with_transport(config, catalog, Arc::new(transport)))
    }

    pub fn with_transport(
        config: &AppConfig,
        catalog: Catalog,
        transport: Arc<dyn BatchTransport>,
    ) -> Self {
        let store = Arc::new(
            Store::new(catalog, config.server.clone()).with_map_token(config.map_token.clone()),
        );
        let dispatcher = Dispatcher::new(Arc::clone(&store), Arc::clone(&transport));

        let reconciler = match store.server_base() {
            Some(base) => {
                tracing::info!(
                    target = "poolmap",
                    server = %base,
                    interval_ms = config.reconcile_interval_ms,
                    "starting reconciler"
                );
                Some(
                    Reconciler::new(Arc::clone(&store), transport)
                        .spawn(config.reconcile_interval()),
                )
            }
            None => {
                tracing::info!(target = "poolmap", "no server configured; running offline");
                None
            }
        };

        Self {
            store,
            dispatcher,
            reconciler,
        }
    }

    pub fn is_reconciling(&self) -> bool {
        self.reconciler
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    pub async fn shutdown(mut self) {
        if let Some(handle) = self.reconciler.take() {
            handle.stop().await;
        }
    }
}
