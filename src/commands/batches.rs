//! Batch commands: create, run, and the OSM enrichment trigger.

use crate::model::{BatchId, NewBatch, RunOptions};

use super::{CommandKind, Dispatch, Dispatcher};

impl Dispatcher {
    /// POST a new batch. The created record shows up on the next tick.
    pub fn add_batch(&self, batch: NewBatch) -> Dispatch {
        self.dispatch(CommandKind::CreateBatch, move |transport, base| async move {
            transport.create_batch(&base, &batch).await
        })
    }

    /// Start processing an existing batch. `options` are expected to have
    /// passed the run form's validation already.
    pub fn run_batch(&self, id: BatchId, options: RunOptions) -> Dispatch {
        self.dispatch(CommandKind::RunBatch, move |transport, base| async move {
            transport.run_batch(&base, &id, &options).await
        })
    }

    /// Ask the server to enrich a batch with OpenStreetMap data. No payload.
    pub fn trigger_osm(&self, id: BatchId) -> Dispatch {
        self.dispatch(CommandKind::TriggerOsm, move |transport, base| async move {
            transport.trigger_osm(&base, &id).await
        })
    }
}
