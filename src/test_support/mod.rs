//! Test support infrastructure.
//!
//! Only compiled for unit tests. No runtime code may depend on anything here.

#![cfg(test)]

use std::{collections::VecDeque, time::Duration};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::{
    model::{Batch, BatchId, NewBatch, PolygonPool, RunOptions},
    transport::{BatchTransport, TransportError},
};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    FetchBatches { base: String },
    CreateBatch { base: String, batch: NewBatch },
    RunBatch { base: String, id: BatchId, options: RunOptions },
    TriggerOsm { base: String, id: BatchId },
    PolygonPools { base: String, polygon_id: u64 },
}

/// One scripted answer to `fetch_batches`.
pub struct FetchStep {
    pub delay: Duration,
    /// `Err(status)` simulates a non-success HTTP answer.
    pub result: Result<Vec<Batch>, u16>,
}

impl FetchStep {
    pub fn ok(batches: Vec<Batch>) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Ok(batches),
        }
    }

    pub fn fail(status: u16) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Err(status),
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// In-memory transport that records every call. Fetches follow the script and
/// answer an empty list once it runs out.
#[derive(Default)]
pub struct RecordingTransport {
    calls: Mutex<Vec<Call>>,
    fetches: Mutex<VecDeque<FetchStep>>,
    command_status: Mutex<Option<u16>>,
}

impl RecordingTransport {
    pub fn scripted(steps: impl IntoIterator<Item = FetchStep>) -> Self {
        let transport = Self::default();
        transport.fetches.lock().extend(steps);
        transport
    }

    pub fn push_fetch(&self, step: FetchStep) {
        self.fetches.lock().push_back(step);
    }

    pub fn fail_commands_with(&self, status: u16) {
        *self.command_status.lock() = Some(status);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, Call::FetchBatches { .. }))
            .count()
    }

    fn command_result(&self, base: &str) -> Result<(), TransportError> {
        match *self.command_status.lock() {
            Some(status) => Err(TransportError::Status {
                url: base.to_string(),
                status,
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl BatchTransport for RecordingTransport {
    async fn fetch_batches(&self, base: &str) -> Result<Vec<Batch>, TransportError> {
        self.calls.lock().push(Call::FetchBatches {
            base: base.to_string(),
        });
        let step = self
            .fetches
            .lock()
            .pop_front()
            .unwrap_or_else(|| FetchStep::ok(Vec::new()));
        if !step.delay.is_zero() {
            tokio::time::sleep(step.delay).await;
        }
        step.result.map_err(|status| TransportError::Status {
            url: format!("{base}batches"),
            status,
        })
    }

    async fn create_batch(&self, base: &str, batch: &NewBatch) -> Result<(), TransportError> {
        self.calls.lock().push(Call::CreateBatch {
            base: base.to_string(),
            batch: batch.clone(),
        });
        self.command_result(base)
    }

    async fn run_batch(
        &self,
        base: &str,
        id: &BatchId,
        options: &RunOptions,
    ) -> Result<(), TransportError> {
        self.calls.lock().push(Call::RunBatch {
            base: base.to_string(),
            id: id.clone(),
            options: options.clone(),
        });
        self.command_result(base)
    }

    async fn trigger_osm(&self, base: &str, id: &BatchId) -> Result<(), TransportError> {
        self.calls.lock().push(Call::TriggerOsm {
            base: base.to_string(),
            id: id.clone(),
        });
        self.command_result(base)
    }

    async fn polygon_pools(
        &self,
        base: &str,
        polygon_id: u64,
    ) -> Result<Vec<PolygonPool>, TransportError> {
        self.calls.lock().push(Call::PolygonPools {
            base: base.to_string(),
            polygon_id,
        });
        Ok(Vec::new())
    }
}
