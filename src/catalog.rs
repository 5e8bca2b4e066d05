//! Static pool and polygon feed bundled with the UI.
//!
//! Loaded once at start; a missing path yields an empty list rather than an error.

use std::{fs, path::Path};

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::{
    config::AppConfig,
    model::{Polygon, Pool},
};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("E-POOL-0201: read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("E-POOL-0202: parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    pub pools: Vec<Pool>,
    pub polygons: Vec<Polygon>,
}

impl Catalog {
    pub fn new(pools: Vec<Pool>, polygons: Vec<Polygon>) -> Self {
        Self { pools, polygons }
    }

    pub fn load(config: &AppConfig) -> Result<Self, CatalogError> {
        let pools = match &config.pools_path {
            Some(path) => load_pools(path)?,
            None => Vec::new(),
        };
        let polygons = match &config.polygons_path {
            Some(path) => load_polygons(path)?,
            None => Vec::new(),
        };
        tracing::info!(
            target = "poolmap",
            pools = pools.len(),
            polygons = polygons.len(),
            "catalog loaded"
        );
        Ok(Self { pools, polygons })
    }
}

pub fn load_pools(path: &Path) -> Result<Vec<Pool>, CatalogError> {
    read_json(path)
}

pub fn load_polygons(path: &Path) -> Result<Vec<Polygon>, CatalogError> {
    read_json(path)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CatalogError> {
    let text = fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| CatalogError::Parse {
        path: path.display().to_string(),
        source,
    })
}
