//! Process-wide schema cache.
//!
//! The data dictionary is computed once and reused until explicitly
//! invalidated. The cache is an ordinary object shared by `Arc`, so tests and
//! independent databases never share state.
//!
//! With a cache file configured, the dictionary also survives restarts: a
//! cold cache reads the file before introspecting the database, and every
//! build writes it back. Descriptions edited into the file are carried over
//! when the dictionary is refreshed.

use crate::database::{DataDictionary, SchemaIntrospector};
use crate::error::GuardError;
use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Cache statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups served from the cached dictionary.
    pub hits: u64,

    /// Lookups that found the cache empty.
    pub misses: u64,

    /// Number of times the dictionary was built from the database.
    pub loads: u64,

    /// Number of times the dictionary was read from the cache file.
    pub file_loads: u64,
}

impl CacheStats {
    /// Calculate hit rate as a percentage.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

/// Compute-once cache for the [`DataDictionary`].
pub struct SchemaCache {
    entry: RwLock<Option<Arc<DataDictionary>>>,
    sample_values: usize,
    cache_file: Option<PathBuf>,
    hits: AtomicU64,
    misses: AtomicU64,
    loads: AtomicU64,
    file_loads: AtomicU64,
}

impl SchemaCache {
    /// Create an empty cache that samples `sample_values` values per column.
    pub fn new(sample_values: usize) -> Self {
        Self {
            entry: RwLock::new(None),
            sample_values,
            cache_file: None,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            loads: AtomicU64::new(0),
            file_loads: AtomicU64::new(0),
        }
    }

    /// Persist the dictionary as JSON at `path`.
    pub fn with_cache_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_file = Some(path.into());
        self
    }

    /// Whether a dictionary is currently cached.
    pub fn is_loaded(&self) -> bool {
        self.entry.read().is_some()
    }

    /// Get the cached dictionary, building it on first use.
    pub fn get_or_load(
        &self,
        introspector: &SchemaIntrospector,
    ) -> Result<Arc<DataDictionary>, GuardError> {
        if let Some(dictionary) = self.entry.read().as_ref() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(dictionary));
        }

        let mut entry = self.entry.write();
        // Another caller may have loaded it while we waited.
        if let Some(dictionary) = entry.as_ref() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(dictionary));
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let dictionary = match self.read_cache_file() {
            Some(dictionary) => dictionary,
            None => {
                let dictionary = self.build(introspector)?;
                self.write_cache_file(&dictionary);
                dictionary
            }
        };
        let dictionary = Arc::new(dictionary);
        *entry = Some(Arc::clone(&dictionary));
        Ok(dictionary)
    }

    /// Rebuild the dictionary from the database and rewrite the cache file.
    pub fn refresh(
        &self,
        introspector: &SchemaIntrospector,
    ) -> Result<Arc<DataDictionary>, GuardError> {
        let mut entry = self.entry.write();
        let mut dictionary = self.build(introspector)?;

        let previous = entry
            .as_ref()
            .map(Arc::clone)
            .or_else(|| self.read_cache_file().map(Arc::new));
        if let Some(previous) = previous {
            dictionary.merge_descriptions(&previous);
        }
        self.write_cache_file(&dictionary);

        let dictionary = Arc::new(dictionary);
        *entry = Some(Arc::clone(&dictionary));
        Ok(dictionary)
    }

    /// Drop the in-memory dictionary; the next lookup loads it again.
    pub fn invalidate(&self) {
        if self.entry.write().take().is_some() {
            info!("Schema cache invalidated");
        }
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            loads: self.loads.load(Ordering::Relaxed),
            file_loads: self.file_loads.load(Ordering::Relaxed),
        }
    }

    /// Read the cache file; a missing or unreadable file is a cache miss.
    fn read_cache_file(&self) -> Option<DataDictionary> {
        let path = self.cache_file.as_ref()?;
        if !path.is_file() {
            return None;
        }

        match DataDictionary::load(path) {
            Ok(dictionary) => {
                info!("Loaded data dictionary from {}", path.display());
                self.file_loads.fetch_add(1, Ordering::Relaxed);
                Some(dictionary)
            }
            Err(e) => {
                warn!("Ignoring unreadable dictionary cache {}: {}", path.display(), e);
                None
            }
        }
    }

    fn write_cache_file(&self, dictionary: &DataDictionary) {
        let Some(path) = self.cache_file.as_ref() else {
            return;
        };
        match dictionary.save(path) {
            Ok(()) => debug!("Saved data dictionary to {}", path.display()),
            Err(e) => warn!("Failed to save dictionary cache {}: {}", path.display(), e),
        }
    }

    fn build(&self, introspector: &SchemaIntrospector) -> Result<DataDictionary, GuardError> {
        debug!("Building data dictionary");
        let dictionary = introspector.build_dictionary(self.sample_values)?;
        self.loads.fetch_add(1, Ordering::Relaxed);
        Ok(dictionary)
    }
}
