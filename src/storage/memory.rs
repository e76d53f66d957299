//! In-memory key-value store.
//!
//! Behaves like the hosted edge store the database targets:
//!
//! - expiring keys (`expiration_ttl`, at least 60 seconds)
//! - lexicographically ordered, cursor-paged prefix listings
//! - optionally, stale listings: with [`Consistency::StaleListings`] a deleted
//!   key keeps showing up in listings (but not in `get`) until
//!   [`MemoryStore::converge`] is called
//!
//! The clock can be moved forward with [`MemoryStore::advance`] so expiry can
//! be observed without waiting.

use crate::storage::engine::{
    KeyInfo, KvStore, ListOptions, ListResult, PutOptions, StoreError, StoreResult,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::{DashMap, DashSet};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Smallest expiration TTL the store accepts, in seconds.
pub const MIN_EXPIRATION_TTL: u64 = 60;

/// Page size used when a listing does not ask for one.
pub const DEFAULT_LIST_LIMIT: usize = 1000;

/// How quickly listings reflect deletes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Consistency {
    /// Listings reflect every completed write.
    #[default]
    Strong,
    /// Deleted keys linger in listings until [`MemoryStore::converge`].
    StaleListings,
}

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

impl Entry {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

struct Inner {
    entries: DashMap<String, Entry>,
    /// Deleted keys still visible to listings.
    stale: DashSet<String>,
    consistency: Consistency,
    clock_offset: Mutex<Duration>,
}

/// Concurrent in-memory store. Clones share the same data.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("entries", &self.inner.entries.len())
            .field("consistency", &self.inner.consistency)
            .finish()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create a store whose listings are always up to date.
    pub fn new() -> Self {
        Self::with_consistency(Consistency::Strong)
    }

    pub fn with_consistency(consistency: Consistency) -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: DashMap::new(),
                stale: DashSet::new(),
                consistency,
                clock_offset: Mutex::new(Duration::zero()),
            }),
        }
    }

    /// Drop deleted keys from listings.
    pub fn converge(&self) {
        let lingering = self.inner.stale.len();
        self.inner.stale.clear();
        debug!(lingering, "memory store converged");
    }

    /// Move the store's clock forward.
    pub fn advance(&self, by: Duration) {
        let mut offset = self.inner.clock_offset.lock();
        *offset = *offset + by;
    }

    /// Number of live (unexpired) values.
    pub fn len(&self) -> usize {
        let now = self.now();
        self.inner
            .entries
            .iter()
            .filter(|entry| entry.value().is_live(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove `key` only if the entry stored now is still expired at `now`,
    /// so a value written since it was looked up survives.
    fn evict_expired(&self, key: &str, now: DateTime<Utc>) -> bool {
        let evicted = self
            .inner
            .entries
            .remove_if(key, |_, entry| !entry.is_live(now))
            .is_some();
        if evicted {
            debug!(key, "expired key removed");
        }
        evicted
    }

    fn now(&self) -> DateTime<Utc> {
        Utc::now() + *self.inner.clock_offset.lock()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let now = self.now();
        let found = self
            .inner
            .entries
            .get(key)
            .map(|entry| (entry.is_live(now), entry.value.clone()));

        match found {
            Some((true, value)) => Ok(Some(value)),
            Some((false, _)) => {
                self.evict_expired(key, now);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, value: String, options: PutOptions) -> StoreResult<()> {
        let expires_at = match options.expiration_ttl {
            Some(ttl) if ttl < MIN_EXPIRATION_TTL => {
                return Err(StoreError::Rejected(format!(
                    "expiration_ttl {ttl} is below the minimum of {MIN_EXPIRATION_TTL} seconds"
                )));
            }
            Some(ttl) => {
                let expires_at = i64::try_from(ttl)
                    .ok()
                    .and_then(Duration::try_seconds)
                    .and_then(|ttl| self.now().checked_add_signed(ttl))
                    .ok_or_else(|| {
                        StoreError::Rejected(format!("expiration_ttl {ttl} is out of range"))
                    })?;
                Some(expires_at)
            }
            None => None,
        };

        self.inner.stale.remove(key);
        self.inner
            .entries
            .insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let existed = self.inner.entries.remove(key).is_some();
        if existed && self.inner.consistency == Consistency::StaleListings {
            self.inner.stale.insert(key.to_string());
        }
        Ok(())
    }

    async fn list(&self, options: ListOptions) -> StoreResult<ListResult> {
        let now = self.now();
        let limit = options.limit.unwrap_or(DEFAULT_LIST_LIMIT).max(1);

        let mut matching: BTreeMap<String, Option<i64>> = BTreeMap::new();
        for entry in self.inner.entries.iter() {
            if entry.key().starts_with(&options.prefix) && entry.value().is_live(now) {
                let expiration = entry.value().expires_at.map(|at| at.timestamp());
                matching.insert(entry.key().clone(), expiration);
            }
        }
        for key in self.inner.stale.iter() {
            if key.starts_with(&options.prefix) {
                matching.entry(key.clone()).or_insert(None);
            }
        }

        let mut remaining = matching
            .into_iter()
            .filter(|(name, _)| options.cursor.as_deref().map_or(true, |after| name.as_str() > after))
            .peekable();

        let mut keys = Vec::new();
        while keys.len() < limit {
            match remaining.next() {
                Some((name, expiration)) => keys.push(KeyInfo { name, expiration }),
                None => break,
            }
        }

        let list_complete = remaining.peek().is_none();
        let cursor = if list_complete {
            None
        } else {
            keys.last().map(|key| key.name.clone())
        };

        Ok(ListResult {
            keys,
            list_complete,
            cursor,
        })
    }
}
