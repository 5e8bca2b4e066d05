//! Periodic batch reconciliation.
//!
//! Every tick fetches the full batch list and replaces the store's copy.
//! A failed fetch replaces it with an empty list. Ticks never overlap: a tick
//! that finds another fetch still outstanding is skipped, and each fetch
//! carries a sequence number so a late answer cannot overwrite a newer one.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};
use tracing::Instrument;

use crate::{store::Store, transport::BatchTransport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No server configured; nothing fetched.
    Offline,
    /// Another fetch was still in flight.
    Skipped,
    Applied { seq: u64, count: usize },
    /// Fetch failed and the batch list was emptied.
    Failed { seq: u64 },
    /// A newer snapshot had already been applied; this one was dropped.
    Stale { seq: u64 },
}

#[derive(Clone)]
pub struct Reconciler {
    store: Arc<Store>,
    transport: Arc<dyn BatchTransport>,
    in_flight: Arc<AtomicBool>,
}

/// Clears the in-flight flag however the tick ends, including cancellation.
struct InFlight(Arc<AtomicBool>);

impl InFlight {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(Arc::clone(flag)))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Reconciler {
    pub fn new(store: Arc<Store>, transport: Arc<dyn BatchTransport>) -> Self {
        Self {
            store,
            transport,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Run one fetch-and-replace cycle.
    pub async fn tick(&self) -> TickOutcome {
        let Some(base) = self.store.server_base() else {
            return TickOutcome::Offline;
        };
        let Some(_guard) = InFlight::acquire(&self.in_flight) else {
            tracing::debug!(target = "poolmap", "reconcile tick skipped; fetch in flight");
            return TickOutcome::Skipped;
        };

        let seq = self.store.begin_sync();
        let span = tracing::info_span!("reconcile_tick", seq);
        async {
            let started = Instant::now();
            let fetched = self.transport.fetch_batches(&base).await;
            let ms = started.elapsed().as_millis() as u64;
            match fetched {
                Ok(batches) => {
                    let count = batches.len();
                    if self.store.apply_batches(seq, batches) {
                        tracing::info!(target = "poolmap", duration_ms = ms, count, "batches synced");
                        TickOutcome::Applied { seq, count }
                    } else {
                        TickOutcome::Stale { seq }
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        target = "poolmap",
                        duration_ms = ms,
                        error = %e,
                        "batch fetch failed; clearing batches"
                    );
                    if self.store.apply_batches(seq, Vec::new()) {
                        TickOutcome::Failed { seq }
                    } else {
                        TickOutcome::Stale { seq }
                    }
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Tick immediately, then every `period`, until the handle is stopped.
    pub fn spawn(self, period: Duration) -> ReconcileHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            let mut ticker = interval(period);
            // A slow fetch pushes the schedule back instead of bursting to catch up.
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = stop_rx.changed() => break,
                    _ = ticker.tick() => {
                        tokio::select! {
                            biased;
                            _ = stop_rx.changed() => break,
                            _ = self.tick() => {}
                        }
                    }
                }
            }
            tracing::info!(target = "poolmap", "reconciler stopped");
        });
        ReconcileHandle { stop_tx, task }
    }
}

/// Owner of a running reconciliation loop.
pub struct ReconcileHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ReconcileHandle {
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the loop, cancelling a fetch in progress, and wait for it to exit.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        if let Err(e) = self.task.await {
            tracing::warn!(target = "poolmap", error = %e, "reconciler task ended abnormally");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        catalog::Catalog,
        model::Batch,
        test_support::{FetchStep, RecordingTransport},
    };
    use serde_json::json;

    fn batch(id: &str) -> Batch {
        Batch::from(json!({ "id": id }))
    }

    fn online_store() -> Arc<Store> {
        Arc::new(Store::new(Catalog::default(), Some("http://api.test".into())))
    }

    #[tokio::test]
    async fn offline_tick_does_nothing() {
        let transport = Arc::new(RecordingTransport::default());
        let store = Arc::new(Store::new(Catalog::default(), None));
        let reconciler = Reconciler::new(store, transport.clone());
        assert_eq!(reconciler.tick().await, TickOutcome::Offline);
        assert_eq!(transport.fetch_count(), 0);
    }

    #[tokio::test]
    async fn failure_empties_previously_synced_batches() {
        let transport = Arc::new(RecordingTransport::scripted([FetchStep::ok(vec![batch(
            "b1",
        )])]));
        let store = online_store();
        let reconciler = Reconciler::new(Arc::clone(&store), transport.clone());

        assert_eq!(
            reconciler.tick().await,
            TickOutcome::Applied { seq: 1, count: 1 }
        );
        assert_eq!(store.batches(), vec![batch("b1")]);

        transport.push_fetch(FetchStep::fail(502));

        assert_eq!(reconciler.tick().await, TickOutcome::Failed { seq: 2 });
        assert!(store.batches().is_empty());
    }

    #[tokio::test]
    async fn overlapping_tick_is_skipped() {
        let transport = Arc::new(RecordingTransport::scripted([FetchStep::ok(vec![batch(
            "slow",
        )])
        .delayed(Duration::from_millis(200))]));
        let store = online_store();
        let reconciler = Reconciler::new(Arc::clone(&store), transport.clone());

        let first = {
            let r = reconciler.clone();
            tokio::spawn(async move { r.tick().await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(reconciler.tick().await, TickOutcome::Skipped);

        assert_eq!(
            first.await.unwrap(),
            TickOutcome::Applied { seq: 1, count: 1 }
        );
        assert_eq!(transport.fetch_count(), 1);
        // Flag is released once the slow tick finishes.
        assert!(matches!(
            reconciler.tick().await,
            TickOutcome::Applied { seq: 2, .. }
        ));
    }

    #[tokio::test]
    async fn late_answer_from_other_writer_is_dropped() {
        let store = online_store();
        let transport = Arc::new(RecordingTransport::scripted([FetchStep::ok(vec![batch(
            "late",
        )])
        .delayed(Duration::from_millis(100))]));
        let reconciler = Reconciler::new(Arc::clone(&store), transport);

        let pending = {
            let r = reconciler.clone();
            tokio::spawn(async move { r.tick().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        // A newer snapshot lands while the fetch is still outstanding.
        store.set_batches(vec![batch("fresh")]);

        assert_eq!(pending.await.unwrap(), TickOutcome::Stale { seq: 1 });
        assert_eq!(store.batches(), vec![batch("fresh")]);
    }

    #[tokio::test]
    async fn loop_ticks_immediately_and_stops_on_request() {
        let transport = Arc::new(RecordingTransport::scripted([FetchStep::ok(vec![batch(
            "b1",
        )])]));
        let store = online_store();
        let handle =
            Reconciler::new(Arc::clone(&store), transport.clone()).spawn(Duration::from_secs(60));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(transport.fetch_count(), 1);
        assert_eq!(store.batches(), vec![batch("b1")]);

        handle.stop().await;
        assert_eq!(transport.fetch_count(), 1);
    }

    #[tokio::test]
    async fn loop_repeats_on_period() {
        let transport = Arc::new(RecordingTransport::default());
        let store = online_store();
        let handle =
            Reconciler::new(Arc::clone(&store), transport.clone()).spawn(Duration::from_millis(100));

        tokio::time::sleep(Duration::from_millis(350)).await;
        handle.stop().await;
        let fetches = transport.fetch_count();
        assert!(
            (3..=5).contains(&fetches),
            "expected roughly one fetch per period, got {fetches}"
        );
    }
}
