//! Two-tier TTL cache: an in-process map backed by one JSON record per key on disk.
//!
//! Keys are a SHA-256 over the namespace and the sorted parameter map, so every
//! upstream operation shares one store with its own TTL. The memory tier is
//! authoritative for the life of the process; the disk tier only survives restarts.
//!
//! Expired entries are evicted lazily on read, or in bulk by [`CacheStore::clear_expired`].
//! A write with a TTL of zero or less is an invalidation and removes both tiers.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::{WechatError, WechatResult};

/// Source of the current time for expiry checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Parameters that, together with a namespace, identify a cache entry.
///
/// Stored sorted, so insertion order never affects the derived key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheParams(BTreeMap<String, Value>);

impl CacheParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter. `None` values are kept and serialize as `null`.
    pub fn with(mut self, name: &str, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.0.insert(name.to_string(), value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Derive the hex-encoded cache key for a namespace and parameter set.
pub fn cache_key(namespace: &str, params: &CacheParams) -> String {
    let canonical = serde_json::to_string(&params.0).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(namespace.as_bytes());
    hasher.update(b"_");
    hasher.update(canonical.as_bytes());
    hex::encode(hasher.finalize())
}

/// A cached payload with its lifetime. Also the on-disk record format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Lifetime the entry was written with.
    pub fn ttl(&self) -> chrono::Duration {
        self.expires_at - self.created_at
    }
}

/// Snapshot of the cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    pub invalidations: u64,
    pub evictions: u64,
    pub entries: usize,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    invalidations: AtomicU64,
    evictions: AtomicU64,
    temp_seq: AtomicU64,
}

/// Shared response cache.
pub struct CacheStore {
    memory: DashMap<String, Arc<CacheEntry>>,
    dir: Option<PathBuf>,
    clock: Arc<dyn Clock>,
    counters: Counters,
}

impl CacheStore {
    /// Open a store persisting to `dir`, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> WechatResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| {
            WechatError::Configuration(format!(
                "Failed to create cache directory {}: {e}",
                dir.display()
            ))
        })?;
        tracing::debug!("Cache directory: {}", dir.display());
        Ok(Self {
            memory: DashMap::new(),
            dir: Some(dir),
            clock: Arc::new(SystemClock),
            counters: Counters::default(),
        })
    }

    /// A store without a persistent tier.
    pub fn in_memory() -> Self {
        Self {
            memory: DashMap::new(),
            dir: None,
            clock: Arc::new(SystemClock),
            counters: Counters::default(),
        }
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Look up a live value, promoting disk records into memory.
    pub fn get<T: DeserializeOwned>(
        &self,
        namespace: impl AsRef<str>,
        params: &CacheParams,
    ) -> Option<T> {
        let namespace = namespace.as_ref();
        let key = cache_key(namespace, params);
        let now = self.clock.now();

        let found = self.lookup_memory(&key, now).or_else(|| {
            let record = self.load_record(&key, now)?;
            let record = Arc::new(record);
            self.memory.insert(key.clone(), Arc::clone(&record));
            Some(record)
        });

        let decoded = found.and_then(|entry| {
            serde_json::from_value(entry.payload.clone())
                .map_err(|e| tracing::debug!("Cached {namespace} payload has a different shape: {e}"))
                .ok()
        });

        match decoded {
            Some(value) => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("Cache hit: {namespace}");
                Some(value)
            }
            None => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("Cache miss: {namespace}");
                None
            }
        }
    }

    /// Store a value for `ttl_secs`. A TTL of zero or less invalidates the entry.
    pub fn set<T: Serialize>(
        &self,
        namespace: impl AsRef<str>,
        value: &T,
        ttl_secs: i64,
        params: &CacheParams,
    ) {
        let namespace = namespace.as_ref();
        let key = cache_key(namespace, params);

        if ttl_secs <= 0 {
            self.memory.remove(&key);
            self.remove_record(&key);
            self.counters.invalidations.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("Cache invalidated: {namespace}");
            return;
        }

        let payload = match serde_json::to_value(value) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!("Not caching {namespace}: payload does not serialize: {e}");
                return;
            }
        };

        let created_at = self.clock.now();
        let Some(expires_at) = chrono::TimeDelta::try_seconds(ttl_secs)
            .and_then(|ttl| created_at.checked_add_signed(ttl))
        else {
            tracing::warn!("Not caching {namespace}: TTL of {ttl_secs}s is out of range");
            return;
        };
        let entry = Arc::new(CacheEntry {
            key: key.clone(),
            payload,
            created_at,
            expires_at,
        });

        self.memory.insert(key, Arc::clone(&entry));
        self.counters.writes.fetch_add(1, Ordering::Relaxed);

        if let Err(e) = self.persist(&entry) {
            tracing::debug!("Cache record for {namespace} not persisted: {e}");
        }
    }

    /// Peek at a live entry without promoting it or touching the counters.
    pub fn entry(&self, namespace: impl AsRef<str>, params: &CacheParams) -> Option<CacheEntry> {
        let key = cache_key(namespace.as_ref(), params);
        let now = self.clock.now();
        if let Some(entry) = self.memory.get(&key) {
            if !entry.is_expired(now) {
                return Some(entry.as_ref().clone());
            }
        }
        let path = self.record_path(&key)?;
        let record = read_record(&path).ok()?;
        (!record.is_expired(now)).then_some(record)
    }

    /// Evict every expired entry from both tiers. Returns how many were removed.
    pub fn clear_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.memory.len();
        self.memory.retain(|_, entry| !entry.is_expired(now));
        let mut removed = before.saturating_sub(self.memory.len());

        if let Some(dir) = &self.dir {
            if let Ok(entries) = std::fs::read_dir(dir) {
                for entry in entries.flatten() {
                    let path = entry.path();
                    if path.extension().and_then(|e| e.to_str()) != Some("json") {
                        continue;
                    }
                    let stale = match read_record(&path) {
                        Ok(record) => record.is_expired(now),
                        Err(_) => true,
                    };
                    if stale && std::fs::remove_file(&path).is_ok() {
                        removed += 1;
                    }
                }
            }
        }

        self.counters
            .evictions
            .fetch_add(removed as u64, Ordering::Relaxed);
        if removed > 0 {
            tracing::debug!("Cleared {removed} expired cache entries");
        }
        removed
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            writes: self.counters.writes.load(Ordering::Relaxed),
            invalidations: self.counters.invalidations.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
            entries: self.memory.len(),
        }
    }

    fn lookup_memory(&self, key: &str, now: DateTime<Utc>) -> Option<Arc<CacheEntry>> {
        let entry = self.memory.get(key).map(|e| Arc::clone(e.value()))?;
        if !entry.is_expired(now) {
            return Some(entry);
        }
        // Only drop the entry we inspected; a concurrent writer may have replaced it.
        self.memory
            .remove_if(key, |_, current| Arc::ptr_eq(current, &entry));
        self.counters.evictions.fetch_add(1, Ordering::Relaxed);
        None
    }

    fn load_record(&self, key: &str, now: DateTime<Utc>) -> Option<CacheEntry> {
        let path = self.record_path(key)?;
        if !path.exists() {
            return None;
        }
        match read_record(&path) {
            Ok(record) if !record.is_expired(now) => Some(record),
            Ok(_) => {
                self.remove_record(key);
                self.counters.evictions.fetch_add(1, Ordering::Relaxed);
                None
            }
            Err(e) => {
                tracing::debug!("Dropping unreadable cache record {}: {e}", path.display());
                self.remove_record(key);
                None
            }
        }
    }

    fn persist(&self, entry: &CacheEntry) -> std::io::Result<()> {
        let (Some(dir), Some(path)) = (&self.dir, self.record_path(&entry.key)) else {
            return Ok(());
        };
        let seq = self.counters.temp_seq.fetch_add(1, Ordering::Relaxed);
        let tmp = dir.join(format!(".{}.{}.{seq}.tmp", entry.key, std::process::id()));
        let bytes = serde_json::to_vec_pretty(entry).map_err(std::io::Error::other)?;
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, &path).inspect_err(|_| {
            let _ = std::fs::remove_file(&tmp);
        })
    }

    fn remove_record(&self, key: &str) {
        if let Some(path) = self.record_path(key) {
            let _ = std::fs::remove_file(path);
        }
    }

    fn record_path(&self, key: &str) -> Option<PathBuf> {
        self.dir.as_ref().map(|dir| dir.join(format!("{key}.json")))
    }
}

fn read_record(path: &Path) -> WechatResult<CacheEntry> {
    let bytes = std::fs::read(path).map_err(|e| WechatError::Parse(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| WechatError::Parse(e.to_string()))
}
