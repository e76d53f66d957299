//! Database facade.
//!
//! # Overview
//!
//! [`Db`] ties the pieces together over one key-value store:
//!
//! ```text
//! token ──resolve_token──▶ Session(area)
//!                             │
//!          ┌──────────────────┼───────────────────┐
//!     create/read/       list(type, filter)    list_types
//!     replace/destroy          │                   │
//!          │                   │                   │
//!      db_data_{area}_{type}_{id}  ◀── prefix scans ┘
//! ```
//!
//! Every data operation takes the [`Session`] it runs in; there is no
//! "current area" stored anywhere, so one `Db` can serve any number of
//! areas concurrently.
//!
//! # Examples
//!
//! ```rust
//! use areadb::{Db, DbConfig, MemoryStore};
//! use serde_json::json;
//!
//! # async fn example() -> areadb::Result<()> {
//! let db = Db::new(Box::new(MemoryStore::new()), DbConfig::default());
//!
//! let token = db.issue_token("user1", 3600).await?;
//! let session = db.resolve_token(&token.id).await?;
//!
//! let alice = db.create(&session, "person", json!({"name": "Alice", "age": 44})).await?;
//! let found = db.list(&session, "person", &json!({"gt": {"age": 40}})).await?;
//! assert_eq!(found, vec![alice]);
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod list;
pub mod records;

pub use catalog::TypeEntry;

use crate::auth::{IssuedToken, Session, TokenManager};
use crate::config::DbConfig;
use crate::error::{ErrorKind, Result};
use crate::metrics;
use crate::storage::{KvStore, Storage};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Multi-tenant document store over a key-value store.
pub struct Db {
    storage: Arc<Storage>,
    tokens: TokenManager,
    config: DbConfig,
}

impl Db {
    pub fn new(store: Box<dyn KvStore>, config: DbConfig) -> Self {
        metrics::init_metrics();
        let storage = Arc::new(Storage::new(store).with_page_size(config.scan.page_size));
        let tokens = TokenManager::new(storage.clone(), config.tokens.min_ttl_secs);
        info!(
            min_ttl_secs = tokens.min_ttl_secs(),
            page_size = config.scan.page_size,
            "Database initialized"
        );
        Self {
            storage,
            tokens,
            config,
        }
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    pub fn storage(&self) -> &Arc<Storage> {
        &self.storage
    }

    /// Issue a token for `area` that expires after `ttl_secs`.
    pub async fn issue_token(&self, area: &str, ttl_secs: u64) -> Result<IssuedToken> {
        observe("issue_token", self.tokens.issue_token(area, ttl_secs)).await
    }

    /// Issue a token with the configured default TTL.
    pub async fn issue_default_token(&self, area: &str) -> Result<IssuedToken> {
        self.issue_token(area, self.config.tokens.default_ttl_secs)
            .await
    }

    pub async fn resolve_token(&self, token_id: &str) -> Result<Session> {
        observe("resolve_token", self.tokens.resolve_token(token_id)).await
    }

    /// See [`records::create`].
    pub async fn create(&self, session: &Session, type_name: &str, record: Value) -> Result<Value> {
        observe(
            "create",
            records::create(&self.storage, session, type_name, record),
        )
        .await
    }

    /// See [`records::read`].
    pub async fn read(&self, session: &Session, type_name: &str, record: &Value) -> Result<Value> {
        observe("read", records::read(&self.storage, session, type_name, record)).await
    }

    /// See [`records::replace`].
    pub async fn replace(
        &self,
        session: &Session,
        type_name: &str,
        record: Value,
    ) -> Result<Value> {
        observe(
            "replace",
            records::replace(&self.storage, session, type_name, record),
        )
        .await
    }

    /// See [`records::destroy`].
    pub async fn destroy(&self, session: &Session, type_name: &str, record: &Value) -> Result<()> {
        observe(
            "destroy",
            records::destroy(&self.storage, session, type_name, record),
        )
        .await
    }

    /// See [`list::list`].
    pub async fn list(
        &self,
        session: &Session,
        type_name: &str,
        expression: &Value,
    ) -> Result<Vec<Value>> {
        observe(
            "list",
            list::list(&self.storage, session, type_name, expression),
        )
        .await
    }

    /// See [`catalog::list_types`].
    pub async fn list_types(&self, session: &Session) -> Result<Vec<TypeEntry>> {
        observe("list_types", catalog::list_types(&self.storage, session)).await
    }
}

/// Time an operation, count its outcome and log failures.
async fn observe<T>(op: &'static str, operation: impl Future<Output = Result<T>>) -> Result<T> {
    let start = Instant::now();
    let result = operation.await;
    metrics::record_operation(op, result.is_ok(), start.elapsed());

    if let Err(e) = &result {
        match e.kind() {
            ErrorKind::Store => error!(op, code = e.code(), error = %e, "Operation failed"),
            _ => warn!(op, code = e.code(), error = %e, "Operation rejected"),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, MockStore, Operation};
    use serde_json::json;

    fn db() -> Db {
        Db::new(Box::new(MemoryStore::new()), DbConfig::default())
    }

    #[tokio::test]
    async fn test_session_scopes_every_operation() -> Result<()> {
        let db = db();
        let token = db.issue_token("user1", 60).await?;
        let session = db.resolve_token(&token.id).await?;

        let created = db.create(&session, "person", json!({"name": "Alice"})).await?;
        assert_eq!(db.read(&session, "person", &created).await?, created);
        assert_eq!(db.list_types(&session).await?, vec![TypeEntry {
            name: "person".to_string()
        }]);

        db.destroy(&session, "person", &created).await?;
        assert!(db.list(&session, "person", &Value::Null).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_default_ttl() -> Result<()> {
        let store = MockStore::new();
        let db = Db::new(Box::new(store.clone()), DbConfig::default());
        db.issue_default_token("user1").await?;
        assert_eq!(store.calls(Operation::Put), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_failures_are_counted() {
        let db = db();
        let before = metrics::OPERATIONS_TOTAL
            .with_label_values(&["resolve_token", "error"])
            .get();
        assert!(db.resolve_token("missing").await.is_err());
        assert!(
            metrics::OPERATIONS_TOTAL
                .with_label_values(&["resolve_token", "error"])
                .get()
                > before
        );
    }

    #[tokio::test]
    async fn test_page_size_is_applied() -> Result<()> {
        let mut config = DbConfig::default();
        config.scan.page_size = 2;
        let db = Db::new(Box::new(MemoryStore::new()), config);
        let session = db.issue_token("user1", 60).await?.session;

        for n in 0..5 {
            db.create(&session, "item", json!({"n": n})).await?;
        }
        assert_eq!(db.list(&session, "item", &Value::Null).await?.len(), 5);
        Ok(())
    }
}
