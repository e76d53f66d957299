//! Storage layer
//!
//! # Architecture
//!
//! Records live in an external key-value store that offers only `get`, `put`
//! (with optional expiry), `delete` and paged prefix `list`. It has no
//! transactions, no secondary indexes and no read-after-write guarantee.
//!
//! ```text
//! db_meta_token_{token}          {"area": "user1"}       expires with the token
//! db_data_{area}_{type}_{id}     {"id": "...", ...}      one record
//! ```
//!
//! Tenant isolation is purely a matter of key prefixes, which is why
//! [`keys`] is the only place keys are built.
//!
//! ## Implementations
//!
//! - [`MemoryStore`]: concurrent in-memory store with expiry and an optional
//!   stale-listing mode
//! - [`MockStore`]: test double with failure injection

pub mod engine;
pub mod keys;
pub mod memory;
pub mod mock;

pub use engine::{
    KeyInfo, KvStore, ListOptions, ListResult, PutOptions, Storage, StoreError, StoreResult,
};
pub use memory::{Consistency, MemoryStore};
pub use mock::{MockStore, Operation};
