//! Domain records shared by the store, the transport and the CLI.
//!
//! Pools and polygons come from a bundled feed and are never mutated locally.
//! Batches are server-owned; only the identifier is interpreted here, every
//! other field is carried through untouched.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::config::limits::{PRICE_DECIMALS, PRICE_PER_POOL};

// ----------------------------------------------------------------------------
// Identifiers
// ----------------------------------------------------------------------------

/// Identifier of a selectable pool. Feeds use either OSM numeric ids or
/// database object ids, so both forms deserialize into the same string key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PoolId(String);

impl PoolId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PoolId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for PoolId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<u64> for PoolId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for PoolId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Num(u64),
            Str(String),
        }
        Ok(match RawId::deserialize(deserializer)? {
            RawId::Num(n) => Self::from(n),
            RawId::Str(s) => Self(s),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(String);

impl BatchId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BatchId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

// ----------------------------------------------------------------------------
// Catalog records
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pool {
    #[serde(alias = "_id")]
    pub id: PoolId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<[f64; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clean: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Administrative boundary with the number of pools detected inside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub id: u64,
    /// Outer rings, each a list of `[lat, lon]` points.
    #[serde(default)]
    pub nodes: Vec<Vec<[f64; 2]>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default)]
    pub pools: Option<f64>,
}

impl Polygon {
    pub fn pool_count(&self) -> f64 {
        self.pools.unwrap_or(0.0)
    }

    pub fn price(&self) -> f64 {
        price_for(self.pool_count())
    }
}

/// Polygon as handed to the UI: the stored record plus its derived price.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricedPolygon {
    #[serde(flatten)]
    pub polygon: Polygon,
    pub price: f64,
}

impl From<&Polygon> for PricedPolygon {
    fn from(polygon: &Polygon) -> Self {
        Self {
            price: polygon.price(),
            polygon: polygon.clone(),
        }
    }
}

pub fn price_for(pools: f64) -> f64 {
    let scale = 10f64.powi(PRICE_DECIMALS);
    (pools * PRICE_PER_POOL * scale).round() / scale
}

/// One pool row returned by the polygon lookup endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolygonPool {
    #[serde(default)]
    pub clean: Option<bool>,
    #[serde(default)]
    pub address: Option<Value>,
}

// ----------------------------------------------------------------------------
// Batches
// ----------------------------------------------------------------------------

/// Server-owned batch summary. Kept verbatim; accessors only read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Batch(Map<String, Value>);

impl Batch {
    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// The server reports `batch_id` (mirroring `_id`); plain `id` is accepted too.
    pub fn id(&self) -> Option<BatchId> {
        ["batch_id", "_id", "id"]
            .iter()
            .find_map(|key| self.0.get(*key).and_then(Value::as_str))
            .map(BatchId::from)
    }

    pub fn name(&self) -> Option<&str> {
        self.0.get("name").and_then(Value::as_str)
    }

    pub fn is_working(&self) -> bool {
        self.0
            .get("is_working")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn osm_done(&self) -> bool {
        self.0.get("osm_done").and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn progress(&self) -> Option<f64> {
        self.0.get("progress").and_then(Value::as_f64)
    }

    pub fn todo(&self) -> Option<u64> {
        self.0.get("todo").and_then(Value::as_u64)
    }

    pub fn done(&self) -> Option<u64> {
        self.0.get("done").and_then(Value::as_u64)
    }

    pub fn pools_detected(&self) -> Option<i64> {
        self.0.get("pools_detected").and_then(Value::as_i64)
    }
}

impl From<Value> for Batch {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            other => {
                let mut map = Map::new();
                map.insert("value".into(), other);
                Self(map)
            }
        }
    }
}

// ----------------------------------------------------------------------------
// Command payloads
// ----------------------------------------------------------------------------

/// Body of a batch creation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBatch {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub zoom_level: u32,
    /// Area to photograph as `[lat, lon]` points.
    #[serde(default)]
    pub nodes: Vec<[f64; 2]>,
}

/// Body of a batch run request. Field names are snake_case on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOptions {
    pub coverage: f64,
    pub sleep_min: u32,
    pub sleep_max: u32,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            coverage: 0.005,
            sleep_min: 0,
            sleep_max: 3,
        }
    }
}
