//! Reference Table Cache
//!
//! `GeoTable::load` rereads the file on every call. Long-running callers that
//! enrich many batches hold a `GeoTableCache` instead, which loads each
//! reference file once and hands out shared read-only handles.

use moka::sync::Cache;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::config::PrepConfig;
use crate::error::{PrepError, Result};
use crate::geo::GeoTable;

/// Loaded reference tables keyed by canonical path
#[derive(Clone)]
pub struct GeoTableCache {
    tables: Cache<PathBuf, Arc<GeoTable>>,
    config: PrepConfig,
}

impl GeoTableCache {
    /// `capacity` is the number of distinct reference files kept
    pub fn new(capacity: u64, config: PrepConfig) -> Self {
        GeoTableCache {
            tables: Cache::new(capacity),
            config,
        }
    }

    /// Cached table for `path`, loading it on first use
    ///
    /// Failed loads are not cached; the next call tries again.
    pub fn get_or_load(&self, path: &Path) -> Result<Arc<GeoTable>> {
        let key = path
            .canonicalize()
            .map_err(|e| PrepError::unavailable(path, e))?;

        if let Some(table) = self.tables.get(&key) {
            debug!("Reference cache hit: {}", key.display());
            return Ok(table);
        }

        let table = Arc::new(GeoTable::load(&key, &self.config)?);
        self.tables.insert(key, Arc::clone(&table));
        Ok(table)
    }

    /// Drop a cached table so the next lookup rereads the file
    pub fn invalidate(&self, path: &Path) {
        if let Ok(key) = path.canonicalize() {
            self.tables.invalidate(&key);
        }
    }

    pub fn config(&self) -> &PrepConfig {
        &self.config
    }
}
