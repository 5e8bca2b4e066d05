use serde_json::{json, Value};

use crate::model::PoolId;

// Channel names shared with the UI bridge so both sides agree on spelling.
pub const EVENT_CART_CHANGED: &str = "cart-changed";
pub const EVENT_BATCHES_REPLACED: &str = "batches-replaced";

/// State transition announced to store subscribers after the write lock is released.
///
/// Delivery happens outside the lock, so two writers may deliver out of order.
/// `revision` is assigned under the lock and strictly increases with every
/// change; a subscriber drops any event whose revision is not above the last
/// one it saw.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    CartChanged { revision: u64, cart: Vec<PoolId> },
    BatchesReplaced { revision: u64, seq: u64, count: usize },
}

impl StoreEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::CartChanged { .. } => EVENT_CART_CHANGED,
            Self::BatchesReplaced { .. } => EVENT_BATCHES_REPLACED,
        }
    }

    pub fn revision(&self) -> u64 {
        match self {
            Self::CartChanged { revision, .. } | Self::BatchesReplaced { revision, .. } => *revision,
        }
    }

    pub fn payload(&self) -> Value {
        match self {
            Self::CartChanged { revision, cart } => json!({ "revision": revision, "cart": cart }),
            Self::BatchesReplaced {
                revision,
                seq,
                count,
            } => json!({ "revision": revision, "seq": seq, "count": count }),
        }
    }
}
