//! Best-effort read-through cache for predictions.
//!
//! Nothing in here returns an error to the caller: a store that fails or
//! holds garbage behaves like an empty cache and the failure is logged.

use serde::{Serialize, de::DeserializeOwned};
use std::{
    collections::HashMap,
    sync::{
        PoisonError, RwLock,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};
use thiserror::Error;
use tracing::{debug, error, info};

/// Separates key components. Only the departure time may contain it.
pub const KEY_DELIMITER: char = ':';
const WILDCARD: char = '*';

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache store unavailable: {0}")]
    Unavailable(String),
    #[error("Cache value is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// String key-value store with expiry and `*` glob patterns.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    fn set_with_ttl(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;
    /// Deletes every live key matching `pattern` and returns how many went.
    fn delete_by_pattern(&self, pattern: &str) -> Result<usize, CacheError>;
    fn keys(&self, pattern: &str) -> Result<Vec<String>, CacheError>;
}

#[derive(Debug)]
struct Entry {
    value: String,
    expires_at: Instant,
}

/// In-process [`KeyValueStore`]. Expired entries are dropped lazily.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Default::default()
    }
}

fn poisoned<T>(_: T) -> CacheError {
    CacheError::Unavailable("memory store lock poisoned".into())
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let entries = self.entries.read().map_err(poisoned)?;
        Ok(entries
            .get(key)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.value.clone()))
    }

    fn set_with_ttl(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        let now = Instant::now();
        entries.retain(|_, entry| entry.expires_at > now);
        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    fn delete_by_pattern(&self, pattern: &str) -> Result<usize, CacheError> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        let now = Instant::now();
        let before = entries.len();
        entries.retain(|key, entry| entry.expires_at > now && !glob_match(pattern, key));
        Ok(before - entries.len())
    }

    fn keys(&self, pattern: &str) -> Result<Vec<String>, CacheError> {
        let entries = self.entries.read().map_err(poisoned)?;
        let now = Instant::now();
        let mut keys: Vec<String> = entries
            .iter()
            .filter(|(key, entry)| entry.expires_at > now && glob_match(pattern, key))
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort_unstable();
        Ok(keys)
    }
}

/// Matches `key` against a pattern where `*` stands for any run of characters.
pub fn glob_match(pattern: &str, key: &str) -> bool {
    let mut parts = pattern.split(WILDCARD);
    let Some(first) = parts.next() else {
        return key.is_empty();
    };
    let Some(mut rest) = key.strip_prefix(first) else {
        return false;
    };
    let middle: Vec<&str> = parts.collect();
    let Some((last, middle)) = middle.split_last() else {
        // No wildcard at all.
        return rest.is_empty();
    };
    for part in middle {
        match rest.find(part) {
            Some(at) => rest = &rest[at + part.len()..],
            None => return false,
        }
    }
    rest.len() >= last.len() && rest.ends_with(last)
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub ttl: Duration,
    pub prefix: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(3600),
            prefix: "prediction".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

pub struct PredictionCache<K: KeyValueStore> {
    store: K,
    config: CacheConfig,
    hits: AtomicU64,
    misses: AtomicU64,
    /// Bumped by every invalidation. Writers hold it shared, invalidation
    /// holds it exclusively, so a write cannot land between the bump and the
    /// delete.
    generation: RwLock<u64>,
}

impl<K: KeyValueStore> PredictionCache<K> {
    pub fn new(store: K, config: CacheConfig) -> Self {
        Self {
            store,
            config,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            generation: RwLock::new(0),
        }
    }

    pub fn store(&self) -> &K {
        &self.store
    }

    /// `{prefix}:{trip}:{stop}:{time}:{date}`, or `None` when a component
    /// could collide with another key or match a foreign pattern.
    ///
    /// The departure time is `HH:MM:SS` and may hold the delimiter. Every
    /// other component must not, which keeps the key unambiguous.
    pub fn key(&self, trip_id: &str, stop_id: &str, departure_time: &str, date: &str) -> Option<String> {
        let components = [trip_id, stop_id, departure_time, date];
        let unsafe_component = [trip_id, stop_id, date]
            .iter()
            .any(|component| component.contains([KEY_DELIMITER, WILDCARD]))
            || departure_time.contains(WILDCARD);
        if unsafe_component {
            debug!("Not caching prediction for unsafe key components {components:?}");
            return None;
        }
        Some(format!(
            "{}{KEY_DELIMITER}{}",
            self.config.prefix,
            components.join(&KEY_DELIMITER.to_string())
        ))
    }

    pub fn get<T>(&self, trip_id: &str, stop_id: &str, departure_time: &str, date: &str) -> Option<T>
    where
        T: DeserializeOwned,
    {
        let key = self.key(trip_id, stop_id, departure_time, date)?;
        let value = match self.store.get(&key) {
            Ok(Some(raw)) => serde_json::from_str(&raw).map_err(CacheError::from),
            Ok(None) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
            Err(err) => Err(err),
        };
        match value {
            Ok(value) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                info!("Cache hit for {key}");
                Some(value)
            }
            Err(err) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                error!("Error getting {key} from cache: {err}");
                None
            }
        }
    }

    /// Number of invalidations so far. Read it before computing a value and
    /// hand it to [`Self::set_since`].
    pub fn generation(&self) -> u64 {
        *self.generation.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores `value` for the configured TTL. Returns whether it was stored.
    pub fn set<T>(&self, trip_id: &str, stop_id: &str, departure_time: &str, date: &str, value: &T) -> bool
    where
        T: Serialize,
    {
        let _generation = self.generation.read().unwrap_or_else(PoisonError::into_inner);
        self.write(trip_id, stop_id, departure_time, date, value)
    }

    /// Like [`Self::set`], but skips the write when an invalidation ran after
    /// `generation` was read, since `value` may predate the invalidated data.
    pub fn set_since<T>(
        &self,
        generation: u64,
        trip_id: &str,
        stop_id: &str,
        departure_time: &str,
        date: &str,
        value: &T,
    ) -> bool
    where
        T: Serialize,
    {
        let current = self.generation.read().unwrap_or_else(PoisonError::into_inner);
        if *current != generation {
            debug!("Not caching prediction for {trip_id}:{stop_id}, invalidated while computing");
            return false;
        }
        self.write(trip_id, stop_id, departure_time, date, value)
    }

    fn write<T>(&self, trip_id: &str, stop_id: &str, departure_time: &str, date: &str, value: &T) -> bool
    where
        T: Serialize,
    {
        let Some(key) = self.key(trip_id, stop_id, departure_time, date) else {
            return false;
        };
        let result = serde_json::to_string(value)
            .map_err(CacheError::from)
            .and_then(|raw| self.store.set_with_ttl(&key, raw, self.config.ttl));
        match result {
            Ok(()) => {
                debug!("Cached prediction for {key}");
                true
            }
            Err(err) => {
                error!("Error setting {key} in cache: {err}");
                false
            }
        }
    }

    /// Drops cached predictions for a trip, a stop, both, or everything.
    pub fn invalidate(&self, trip_id: Option<&str>, stop_id: Option<&str>) -> usize {
        let prefix = &self.config.prefix;
        let pattern = match (trip_id, stop_id) {
            (Some(trip), Some(stop)) => format!("{prefix}:{trip}:{stop}:*"),
            (Some(trip), None) => format!("{prefix}:{trip}:*"),
            (None, Some(stop)) => format!("{prefix}:*:{stop}:*"),
            (None, None) => format!("{prefix}:*"),
        };
        let mut generation = self.generation.write().unwrap_or_else(PoisonError::into_inner);
        *generation += 1;
        match self.store.delete_by_pattern(&pattern) {
            Ok(count) => {
                if count > 0 {
                    info!("Invalidated {count} cached predictions");
                }
                count
            }
            Err(err) => {
                error!("Error invalidating cache with {pattern}: {err}");
                0
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self
            .store
            .keys(&format!("{}:*", self.config.prefix))
            .map(|keys| keys.len())
            .unwrap_or_else(|err| {
                error!("Error getting cache stats: {err}");
                0
            });
        CacheStats {
            entries,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
