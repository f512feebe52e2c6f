//! Cache store.

use super::backend::PersistedStore;
use super::clock::{Clock, SystemClock};
use super::key::{CacheKey, DEFAULT_KEY_PREFIX};
use crate::fingerprint::FingerprintGenerator;
use crate::types::{RequestDescriptor, Response};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, warn};

/// Default expiry applied to writes until [`CacheStore::set_expiry`] is called.
pub const DEFAULT_EXPIRY: Duration = Duration::from_secs(2 * 60 * 60);

#[derive(Debug, Clone, Default)]
pub struct CacheStats { pub hits: u64, pub misses: u64, pub sets: u64, pub deletes: u64, pub errors: u64 }

impl CacheStats {
    pub fn hit_ratio(&self) -> f64 { let total = self.hits + self.misses; if total == 0 { 0.0 } else { self.hits as f64 / total as f64 } }
}

struct AtomicStats { hits: AtomicU64, misses: AtomicU64, sets: AtomicU64, deletes: AtomicU64, errors: AtomicU64 }
impl AtomicStats {
    fn new() -> Self { Self { hits: AtomicU64::new(0), misses: AtomicU64::new(0), sets: AtomicU64::new(0), deletes: AtomicU64::new(0), errors: AtomicU64::new(0) } }
    fn to_stats(&self) -> CacheStats { CacheStats { hits: self.hits.load(Ordering::Relaxed), misses: self.misses.load(Ordering::Relaxed), sets: self.sets.load(Ordering::Relaxed), deletes: self.deletes.load(Ordering::Relaxed), errors: self.errors.load(Ordering::Relaxed) } }
}

/// Persisted form of a cache entry.
#[derive(Debug, Serialize, Deserialize)]
struct CacheRecord {
    response: Response,
    /// Epoch milliseconds of the last write or refreshing read.
    timestamp: u64,
    /// Expiry in milliseconds.
    expire: u64,
}

impl CacheRecord {
    fn is_fresh(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.timestamp) < self.expire
    }
}

/// Response cache: an in-memory index of owned fingerprints mirrored into a
/// [`PersistedStore`].
///
/// Expiry is checked lazily on access; nothing sweeps entries in the background.
/// A still-fresh entry is never overwritten, and a read of a fresh entry
/// refreshes its timestamp.
pub struct CacheStore {
    fingerprints: Arc<FingerprintGenerator>,
    store: Arc<dyn PersistedStore>,
    clock: Arc<dyn Clock>,
    key_prefix: String,
    expiry_ms: AtomicU64,
    index: Mutex<HashSet<String>>,
    stats: AtomicStats,
}

impl CacheStore {
    pub fn new(fingerprints: Arc<FingerprintGenerator>, store: Arc<dyn PersistedStore>) -> Self {
        Self {
            fingerprints,
            store,
            clock: Arc::new(SystemClock),
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            expiry_ms: AtomicU64::new(DEFAULT_EXPIRY.as_millis() as u64),
            index: Mutex::new(HashSet::new()),
            stats: AtomicStats::new(),
        }
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Default expiry for subsequent writes.
    pub fn set_expiry(&self, expiry: Duration) {
        self.expiry_ms
            .store(expiry.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn expiry(&self) -> Duration {
        Duration::from_millis(self.expiry_ms.load(Ordering::Relaxed))
    }

    fn index(&self) -> MutexGuard<'_, HashSet<String>> {
        self.index.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn key(&self, fingerprint: &str) -> CacheKey {
        CacheKey::new(&self.key_prefix, fingerprint)
    }

    pub fn has(&self, fingerprint: &str) -> bool {
        self.index().contains(fingerprint)
    }

    pub fn is_fresh(&self, fingerprint: &str) -> bool {
        if !self.has(fingerprint) {
            return false;
        }
        self.load(fingerprint)
            .map(|r| r.is_fresh(self.clock.now_ms()))
            .unwrap_or(false)
    }

    /// Read a persisted record; unreadable values count as absent.
    fn load(&self, fingerprint: &str) -> Option<CacheRecord> {
        let key = self.key(fingerprint);
        let raw = match self.store.get(key.as_str()) {
            Ok(raw) => raw?,
            Err(e) => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                warn!(key = key.as_str(), error = %e, "cache store read failed");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(record) => Some(record),
            Err(e) => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                warn!(key = key.as_str(), error = %e, "discarding unreadable cache record");
                None
            }
        }
    }

    fn persist(&self, fingerprint: &str, response: &Response, expire: u64) -> Result<()> {
        let mut response = response.clone();
        response.from_cache = false;
        let record = CacheRecord {
            response,
            timestamp: self.clock.now_ms(),
            expire,
        };
        let raw = serde_json::to_string(&record)?;
        let key = self.key(fingerprint);
        self.store.set(key.as_str(), &raw).map_err(|e| {
            self.stats.errors.fetch_add(1, Ordering::Relaxed);
            e
        })
    }

    /// Store `response` under its originating request with the default expiry.
    ///
    /// Returns `false` when a fresh entry already exists and was left untouched.
    pub fn write(&self, response: &Response) -> Result<bool> {
        self.write_with_expiry(response, self.expiry())
    }

    pub fn write_with_expiry(&self, response: &Response, expiry: Duration) -> Result<bool> {
        let fingerprint = self.fingerprints.identify(&response.request);
        if self.is_fresh(&fingerprint) {
            return Ok(false);
        }
        self.persist(&fingerprint, response, expiry.as_millis() as u64)?;
        self.index().insert(fingerprint.clone());
        self.stats.sets.fetch_add(1, Ordering::Relaxed);
        debug!(
            fingerprint = fingerprint.as_str(),
            expiry_ms = expiry.as_millis() as u64,
            "response cached"
        );
        Ok(true)
    }

    /// Return a fresh cached response for `desc`, sliding its expiry forward.
    pub fn read(&self, desc: &RequestDescriptor) -> Option<Response> {
        let fingerprint = self.fingerprints.identify(desc);
        let record = if self.has(&fingerprint) {
            self.load(&fingerprint)
                .filter(|r| r.is_fresh(self.clock.now_ms()))
        } else {
            None
        };
        let Some(record) = record else {
            self.stats.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        };

        if let Err(e) = self.persist(&fingerprint, &record.response, record.expire) {
            warn!(fingerprint = fingerprint.as_str(), error = %e, "failed to refresh cache entry");
        }
        self.stats.hits.fetch_add(1, Ordering::Relaxed);
        let mut response = record.response;
        response.from_cache = true;
        Some(response)
    }

    /// Drop the fresh entry for `desc`, if any.
    pub fn invalidate(&self, desc: &RequestDescriptor) -> Result<bool> {
        let fingerprint = self.fingerprints.identify(desc);
        if !self.is_fresh(&fingerprint) {
            return Ok(false);
        }
        self.index().remove(&fingerprint);
        let key = self.key(&fingerprint);
        self.store.remove(key.as_str()).map_err(|e| {
            self.stats.errors.fetch_add(1, Ordering::Relaxed);
            e
        })?;
        self.stats.deletes.fetch_add(1, Ordering::Relaxed);
        Ok(true)
    }

    /// Remove every owned entry from the persisted store and empty the index.
    pub fn clear_all(&self) -> Result<()> {
        let owned: Vec<String> = self.index().drain().collect();
        let mut first_err = None;
        for fingerprint in owned {
            let key = self.key(&fingerprint);
            match self.store.remove(key.as_str()) {
                Ok(()) => {
                    self.stats.deletes.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    self.stats.errors.fetch_add(1, Ordering::Relaxed);
                    warn!(key = key.as_str(), error = %e, "failed to remove cache entry");
                    first_err.get_or_insert(e);
                }
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn len(&self) -> usize {
        self.index().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats { self.stats.to_stats() }
    pub fn backend_name(&self) -> &'static str { self.store.name() }
}
