//! Mock storage for testing
//!
//! A plain in-memory map with two test hooks: any operation can be made to
//! fail, and every call is counted so tests can assert that no write happened.

use crate::storage::engine::{
    KeyInfo, KvStore, ListOptions, ListResult, PutOptions, StoreError, StoreResult,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// Store operation, for failure injection and call counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Get,
    Put,
    Delete,
    List,
}

#[derive(Default)]
struct State {
    data: BTreeMap<String, String>,
    failing: HashSet<Operation>,
    calls: Vec<(Operation, String)>,
}

/// In-memory mock storage for testing
#[derive(Clone, Default)]
pub struct MockStore {
    state: Arc<Mutex<State>>,
}

impl MockStore {
    /// Create a new mock storage instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call of `operation` fail.
    pub fn fail(&self, operation: Operation) {
        self.state.lock().failing.insert(operation);
    }

    /// Let `operation` succeed again.
    pub fn heal(&self, operation: Operation) {
        self.state.lock().failing.remove(&operation);
    }

    /// Write a raw value, bypassing failure injection and call counting.
    pub fn insert_raw(&self, key: &str, value: &str) {
        self.state
            .lock()
            .data
            .insert(key.to_string(), value.to_string());
    }

    /// Raw stored value, bypassing failure injection and call counting.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.state.lock().data.get(key).cloned()
    }

    /// Number of calls made for `operation`, including failed ones.
    pub fn calls(&self, operation: Operation) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|(op, _)| *op == operation)
            .count()
    }

    /// Get the number of items stored
    pub fn len(&self) -> usize {
        self.state.lock().data.len()
    }

    /// Check if storage is empty
    pub fn is_empty(&self) -> bool {
        self.state.lock().data.is_empty()
    }

    fn record(&self, operation: Operation, key: &str) -> StoreResult<()> {
        let mut state = self.state.lock();
        state.calls.push((operation, key.to_string()));
        if state.failing.contains(&operation) {
            return Err(StoreError::Unavailable(format!(
                "injected {operation:?} failure for {key:?}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl KvStore for MockStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.record(Operation::Get, key)?;
        Ok(self.state.lock().data.get(key).cloned())
    }

    async fn put(&self, key: &str, value: String, _options: PutOptions) -> StoreResult<()> {
        self.record(Operation::Put, key)?;
        self.state.lock().data.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.record(Operation::Delete, key)?;
        self.state.lock().data.remove(key);
        Ok(())
    }

    async fn list(&self, options: ListOptions) -> StoreResult<ListResult> {
        self.record(Operation::List, &options.prefix)?;
        let keys = self
            .state
            .lock()
            .data
            .keys()
            .filter(|name| name.starts_with(&options.prefix))
            .map(|name| KeyInfo {
                name: name.clone(),
                expiration: None,
            })
            .collect();
        Ok(ListResult {
            keys,
            list_complete: true,
            cursor: None,
        })
    }
}
