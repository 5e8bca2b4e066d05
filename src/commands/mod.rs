//! Outbound commands against the batches server.
//!
//! Commands are fire-and-forget with respect to the store: nothing they return
//! is merged into local state, the next reconciliation tick is the only
//! feedback path. Callers still get a handle and may await the outcome.

pub mod batches;
pub mod polygons;

use std::{fmt, future::Future, sync::Arc};

use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::{
    store::Store,
    transport::{BatchTransport, TransportError},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    CreateBatch,
    RunBatch,
    TriggerOsm,
}

impl CommandKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreateBatch => "create-batch",
            Self::RunBatch => "run-batch",
            Self::TriggerOsm => "trigger-osm",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// In-flight command. Dropping it detaches the request; it still completes.
#[derive(Debug)]
pub struct CommandHandle {
    kind: CommandKind,
    task: JoinHandle<Result<(), TransportError>>,
}

impl CommandHandle {
    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub async fn outcome(self) -> Result<(), TransportError> {
        self.task
            .await
            .map_err(|e| TransportError::Task(e.to_string()))?
    }
}

/// Result of asking for a command: either sent, or skipped because no
/// server is configured.
#[derive(Debug)]
pub enum Dispatch {
    Offline,
    Sent(CommandHandle),
}

impl Dispatch {
    pub fn is_offline(&self) -> bool {
        matches!(self, Self::Offline)
    }

    /// Await the request, if one was sent.
    pub async fn outcome(self) -> Option<Result<(), TransportError>> {
        match self {
            Self::Offline => None,
            Self::Sent(handle) => Some(handle.outcome().await),
        }
    }
}

/// Sends commands on behalf of the UI using the endpoint held by the store.
#[derive(Clone)]
pub struct Dispatcher {
    store: Arc<Store>,
    transport: Arc<dyn BatchTransport>,
}

impl Dispatcher {
    pub fn new(store: Arc<Store>, transport: Arc<dyn BatchTransport>) -> Self {
        Self { store, transport }
    }

    /// Spawn `call` against the configured server, or return `Offline`
    /// without touching the network.
    fn dispatch<F, Fut>(&self, kind: CommandKind, call: F) -> Dispatch
    where
        F: FnOnce(Arc<dyn BatchTransport>, String) -> Fut,
        Fut: Future<Output = Result<(), TransportError>> + Send + 'static,
    {
        let Some(base) = self.store.server_base() else {
            tracing::debug!(target = "poolmap", command = %kind, "no server configured; command skipped");
            return Dispatch::Offline;
        };
        let span = tracing::info_span!("command", command = %kind);
        let fut = call(Arc::clone(&self.transport), base);
        let task = tokio::spawn(
            async move {
                let started = std::time::Instant::now();
                let result = fut.await;
                let ms = started.elapsed().as_millis() as u64;
                match &result {
                    Ok(()) => tracing::info!(target = "poolmap", duration_ms = ms, "command sent"),
                    Err(e) => {
                        tracing::warn!(target = "poolmap", duration_ms = ms, error = %e, "command failed")
                    }
                }
                result
            }
            .instrument(span),
        );
        Dispatch::Sent(CommandHandle { kind, task })
    }
}
