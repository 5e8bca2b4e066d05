//! HTTP surface of the batches server.
//!
//! The store owns the endpoint, so every call receives the normalized base url
//! and the transport itself stays stateless apart from its connection pool.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

use crate::{
    config::{limits::MAX_BATCHES_RESPONSE_BYTES, timeouts::DEFAULT_CONNECT_TIMEOUT_MS},
    model::{Batch, BatchId, NewBatch, PolygonPool, RunOptions},
    net::endpoint_url,
};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("E-POOL-0101: request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("E-POOL-0102: {url} answered HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("E-POOL-0103: could not decode response from {url}: {reason}")]
    Decode { url: String, reason: String },
    #[error("E-POOL-0104: invalid endpoint: {0}")]
    Url(#[from] url::ParseError),
    #[error("E-POOL-0105: command task ended abnormally: {0}")]
    Task(String),
}

impl TransportError {
    /// HTTP status when the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Calls the batches server understands. Implementations must not touch the
/// store; results flow back only through return values.
#[async_trait]
pub trait BatchTransport: Send + Sync {
    /// GET `batches`
    async fn fetch_batches(&self, base: &str) -> Result<Vec<Batch>, TransportError>;

    /// POST `batches`
    async fn create_batch(&self, base: &str, batch: &NewBatch) -> Result<(), TransportError>;

    /// POST `batches/{id}/run`
    async fn run_batch(
        &self,
        base: &str,
        id: &BatchId,
        options: &RunOptions,
    ) -> Result<(), TransportError>;

    /// POST `batches/{id}/osm`
    async fn trigger_osm(&self, base: &str, id: &BatchId) -> Result<(), TransportError>;

    /// GET `polygon/{id}`
    async fn polygon_pools(
        &self,
        base: &str,
        polygon_id: u64,
    ) -> Result<Vec<PolygonPool>, TransportError>;
}

#[derive(Clone)]
pub struct HttpTransport {
    http: Client,
    max_body_bytes: usize,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS))
            .build()
            .map_err(|source| TransportError::Request {
                url: String::from("<client>"),
                source,
            })?;
        Ok(Self::with_client(http))
    }

    pub fn with_client(http: Client) -> Self {
        Self {
            http,
            max_body_bytes: MAX_BATCHES_RESPONSE_BYTES,
        }
    }

    /// Cap on a decoded response body. Larger answers are refused before
    /// they are buffered.
    pub fn with_body_limit(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    async fn get_json<T: DeserializeOwned>(&self, base: &str, path: &[&str]) -> Result<T, TransportError> {
        let url = endpoint_url(base, path)?;
        let url_str = url.to_string();
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|source| TransportError::Request {
                url: url_str.clone(),
                source,
            })?;
        let mut resp = ensure_success(resp, &url_str)?;

        let limit = self.max_body_bytes;
        if let Some(len) = resp.content_length() {
            if len > limit as u64 {
                return Err(body_too_large(url_str, len, limit));
            }
        }
        // Content-Length may be absent (chunked); enforce the cap while reading.
        let mut body = Vec::new();
        while let Some(chunk) = resp.chunk().await.map_err(|source| TransportError::Request {
            url: url_str.clone(),
            source,
        })? {
            if body.len() + chunk.len() > limit {
                return Err(body_too_large(url_str, (body.len() + chunk.len()) as u64, limit));
            }
            body.extend_from_slice(&chunk);
        }
        serde_json::from_slice(&body).map_err(|e| TransportError::Decode {
            url: url_str,
            reason: e.to_string(),
        })
    }

    async fn post(
        &self,
        base: &str,
        path: &[&str],
        body: Option<&(impl Serialize + Sync)>,
    ) -> Result<(), TransportError> {
        let url = endpoint_url(base, path)?;
        let url_str = url.to_string();
        let mut req = self.http.post(url);
        if let Some(body) = body {
            req = req.json(body);
        }
        let resp = req.send().await.map_err(|source| TransportError::Request {
            url: url_str.clone(),
            source,
        })?;
        // Response body is not part of the contract; only the status matters.
        ensure_success(resp, &url_str).map(|_| ())
    }
}

fn body_too_large(url: String, len: u64, limit: usize) -> TransportError {
    TransportError::Decode {
        url,
        reason: format!("body of {len} bytes exceeds limit of {limit}"),
    }
}

fn ensure_success(resp: Response, url: &str) -> Result<Response, TransportError> {
    let status = resp.status();
    if status.is_success() {
        Ok(resp)
    } else {
        Err(TransportError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        })
    }
}

#[async_trait]
impl BatchTransport for HttpTransport {
    async fn fetch_batches(&self, base: &str) -> Result<Vec<Batch>, TransportError> {
        self.get_json(base, &["batches"]).await
    }

    async fn create_batch(&self, base: &str, batch: &NewBatch) -> Result<(), TransportError> {
        self.post(base, &["batches"], Some(batch)).await
    }

    async fn run_batch(
        &self,
        base: &str,
        id: &BatchId,
        options: &RunOptions,
    ) -> Result<(), TransportError> {
        self.post(base, &["batches", id.as_str(), "run"], Some(options))
            .await
    }

    async fn trigger_osm(&self, base: &str, id: &BatchId) -> Result<(), TransportError> {
        self.post(base, &["batches", id.as_str(), "osm"], None::<&()>)
            .await
    }

    async fn polygon_pools(
        &self,
        base: &str,
        polygon_id: u64,
    ) -> Result<Vec<PolygonPool>, TransportError> {
        let id = polygon_id.to_string();
        self.get_json(base, &["polygon", id.as_str()]).await
    }
}
