//! Key-value substrate trait

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::trace;

/// Failure reported by the key-value substrate.
///
/// The core never retries; these are surfaced to the caller as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store timed out: {0}")]
    Timeout(String),

    #[error("store rejected request: {0}")]
    Rejected(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Options for [`KvStore::put`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PutOptions {
    /// Seconds until the store expires the key.
    pub expiration_ttl: Option<u64>,
}

impl PutOptions {
    pub fn expiring_after(seconds: u64) -> Self {
        Self {
            expiration_ttl: Some(seconds),
        }
    }
}

/// Options for [`KvStore::list`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    pub prefix: String,
    /// Cursor returned by the previous page, if any.
    pub cursor: Option<String>,
    /// Maximum number of keys in one page. The store picks a default when unset.
    pub limit: Option<usize>,
}

/// A key returned from a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInfo {
    pub name: String,
    /// Expiration as seconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<i64>,
}

/// One page of a prefix listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListResult {
    pub keys: Vec<KeyInfo>,
    pub list_complete: bool,
    pub cursor: Option<String>,
}

/// Eventually-consistent key-value store.
///
/// A listing may still return keys whose value was already deleted, and a
/// `get` right after a `put` is not guaranteed to observe it.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;
    async fn put(&self, key: &str, value: String, options: PutOptions) -> StoreResult<()>;
    async fn delete(&self, key: &str) -> StoreResult<()>;
    async fn list(&self, options: ListOptions) -> StoreResult<ListResult>;
}

/// Main storage interface
pub struct Storage {
    engine: Box<dyn KvStore>,
    page_size: Option<usize>,
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("page_size", &self.page_size)
            .finish()
    }
}

impl Storage {
    pub fn new(engine: Box<dyn KvStore>) -> Self {
        Self {
            engine,
            page_size: None,
        }
    }

    /// Request pages of at most `page_size` keys when scanning.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.engine.get(key).await
    }

    pub async fn put(&self, key: &str, value: String, options: PutOptions) -> StoreResult<()> {
        self.engine.put(key, value, options).await
    }

    pub async fn delete(&self, key: &str) -> StoreResult<()> {
        self.engine.delete(key).await
    }

    /// List every key under `prefix`, following cursors until the store
    /// reports the listing complete.
    pub async fn scan_prefix(&self, prefix: &str) -> StoreResult<Vec<KeyInfo>> {
        let mut keys = Vec::new();
        let mut cursor = None;
        loop {
            let page = self
                .engine
                .list(ListOptions {
                    prefix: prefix.to_string(),
                    cursor: cursor.take(),
                    limit: self.page_size,
                })
                .await?;
            trace!(prefix, count = page.keys.len(), "listed page");
            keys.extend(page.keys);

            match page.cursor {
                Some(next) if !page.list_complete => cursor = Some(next),
                _ => break,
            }
        }
        Ok(keys)
    }
}
