//! Client-side state store.
//!
//! One owned `Store` (shared as `Arc<Store>`) holds everything the map UI
//! observes. Reads go through getters that hand out copies; writes go through
//! the mutation methods below, which are the only way to change state. Every
//! effective change is announced to subscribers after the lock is released.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

use crate::{
    catalog::Catalog,
    events::StoreEvent,
    model::{Batch, BatchId, Polygon, Pool, PoolId, PricedPolygon},
    net::normalize_server_base,
};

/// Receives store events. Closures taking `&StoreEvent` implement it directly.
pub trait StoreObserver: Send + Sync {
    fn on_event(&self, event: &StoreEvent);
}

impl<F> StoreObserver for F
where
    F: Fn(&StoreEvent) + Send + Sync,
{
    fn on_event(&self, event: &StoreEvent) {
        self(event)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Debug, Default)]
struct StoreState {
    pools: Vec<Pool>,
    polygons: Vec<Polygon>,
    cart: Vec<PoolId>,
    batches: Vec<Batch>,
    server: Option<String>,
    map_token: Option<String>,
    /// Sequence number of the batch snapshot currently held.
    applied_seq: u64,
    /// Bumped on every effective change, under the write lock.
    revision: u64,
    synced_at: Option<DateTime<Utc>>,
}

/// Serializable copy of the whole store, as handed to a UI bridge.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    pub pools: Vec<Pool>,
    pub polygons: Vec<PricedPolygon>,
    pub cart: Vec<PoolId>,
    pub batches: Vec<Batch>,
    pub server: Option<String>,
    pub map_token: Option<String>,
    pub synced_at: Option<DateTime<Utc>>,
    pub revision: u64,
}

pub struct Store {
    state: RwLock<StoreState>,
    observers: RwLock<Vec<(SubscriptionId, Arc<dyn StoreObserver>)>>,
    next_subscription: AtomicU64,
    /// Last sequence number handed out for a batch snapshot.
    issued_seq: AtomicU64,
}

impl Store {
    pub fn new(catalog: Catalog, server: Option<String>) -> Self {
        Self {
            state: RwLock::new(StoreState {
                pools: catalog.pools,
                polygons: catalog.polygons,
                server,
                ..StoreState::default()
            }),
            observers: RwLock::new(Vec::new()),
            next_subscription: AtomicU64::new(1),
            issued_seq: AtomicU64::new(0),
        }
    }

    pub fn with_map_token(self, token: Option<String>) -> Self {
        self.state.write().map_token = token;
        self
    }

    // ------------------------------------------------------------------
    // Getters
    // ------------------------------------------------------------------

    pub fn pools(&self) -> Vec<Pool> {
        self.state.read().pools.clone()
    }

    /// Polygons with their price derived from the current pool count.
    pub fn polygons(&self) -> Vec<PricedPolygon> {
        self.state
            .read()
            .polygons
            .iter()
            .map(PricedPolygon::from)
            .collect()
    }

    pub fn cart(&self) -> Vec<PoolId> {
        self.state.read().cart.clone()
    }

    pub fn in_cart(&self, id: &PoolId) -> bool {
        self.state.read().cart.contains(id)
    }

    pub fn batches(&self) -> Vec<Batch> {
        self.state.read().batches.clone()
    }

    pub fn batch(&self, id: &BatchId) -> Option<Batch> {
        self.state
            .read()
            .batches
            .iter()
            .find(|b| b.id().as_ref() == Some(id))
            .cloned()
    }

    /// Configured endpoint with exactly one trailing slash, or `None` offline.
    pub fn server_base(&self) -> Option<String> {
        normalize_server_base(self.state.read().server.as_deref())
    }

    pub fn map_token(&self) -> Option<String> {
        self.state.read().map_token.clone()
    }

    pub fn synced_at(&self) -> Option<DateTime<Utc>> {
        self.state.read().synced_at
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        let state = self.state.read();
        StoreSnapshot {
            pools: state.pools.clone(),
            polygons: state.polygons.iter().map(PricedPolygon::from).collect(),
            cart: state.cart.clone(),
            batches: state.batches.clone(),
            server: normalize_server_base(state.server.as_deref()),
            map_token: state.map_token.clone(),
            synced_at: state.synced_at,
            revision: state.revision,
        }
    }

    /// Revision of the latest effective change; matches the last event issued.
    pub fn revision(&self) -> u64 {
        self.state.read().revision
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Put `id` in the cart exactly once. Re-adding moves it to the end.
    pub fn add_to_cart(&self, id: PoolId) {
        let event = {
            let mut state = self.state.write();
            if state.cart.last() == Some(&id) {
                None
            } else {
                state.cart.retain(|c| c != &id);
                state.cart.push(id);
                state.revision += 1;
                Some(StoreEvent::CartChanged {
                    revision: state.revision,
                    cart: state.cart.clone(),
                })
            }
        };
        if let Some(event) = event {
            self.notify(&event);
        }
    }

    /// Drop every occurrence of `id`; absent ids are a silent no-op.
    pub fn remove_from_cart(&self, id: &PoolId) {
        let event = {
            let mut state = self.state.write();
            let before = state.cart.len();
            state.cart.retain(|c| c != id);
            if state.cart.len() == before {
                None
            } else {
                state.revision += 1;
                Some(StoreEvent::CartChanged {
                    revision: state.revision,
                    cart: state.cart.clone(),
                })
            }
        };
        if let Some(event) = event {
            self.notify(&event);
        }
    }

    /// Replace the batch collection wholesale with a fresh snapshot.
    pub fn set_batches(&self, batches: Vec<Batch>) {
        let seq = self.begin_sync();
        self.apply_batches(seq, batches);
    }

    /// Reserve the sequence number for a snapshot that is about to be fetched.
    pub fn begin_sync(&self) -> u64 {
        self.issued_seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Replace the batch collection with the snapshot numbered `seq`.
    ///
    /// Returns `false` without touching state when a snapshot with an equal or
    /// newer number was already applied, so a slow response can never roll
    /// the list back.
    pub fn apply_batches(&self, seq: u64, batches: Vec<Batch>) -> bool {
        let event = {
            let mut state = self.state.write();
            if seq <= state.applied_seq {
                tracing::debug!(
                    target = "poolmap",
                    seq,
                    applied = state.applied_seq,
                    "stale batch snapshot dropped"
                );
                return false;
            }
            state.applied_seq = seq;
            state.synced_at = Some(Utc::now());
            if state.batches == batches {
                None
            } else {
                let count = batches.len();
                state.batches = batches;
                state.revision += 1;
                Some(StoreEvent::BatchesReplaced {
                    revision: state.revision,
                    seq,
                    count,
                })
            }
        };
        if let Some(event) = event {
            self.notify(&event);
        }
        true
    }

    // ------------------------------------------------------------------
    // Subscriptions
    // ------------------------------------------------------------------

    pub fn subscribe(&self, observer: impl StoreObserver + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        let observer: Arc<dyn StoreObserver> = Arc::new(observer);
        self.observers.write().push((id, observer));
        id
    }

    /// Returns `false` when `id` was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self.observers.write();
        let before = observers.len();
        observers.retain(|(sid, _)| *sid != id);
        observers.len() != before
    }

    fn notify(&self, event: &StoreEvent) {
        // Snapshot the list so observers may (un)subscribe from inside a callback.
        let observers: Vec<Arc<dyn StoreObserver>> = self
            .observers
            .read()
            .iter()
            .map(|(_, o)| Arc::clone(o))
            .collect();
        for observer in observers {
            observer.on_event(event);
        }
    }
}
