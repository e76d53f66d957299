// AreaDB - multi-tenant JSON document store
// Typed records and filter queries over an eventually-consistent key-value store

#![warn(rust_2018_idioms)]

pub mod auth;
pub mod config;
pub mod db;
pub mod metrics;
pub mod naming;
pub mod query;
pub mod storage;
pub mod telemetry;

// Re-exports for convenience
pub use crate::auth::{IssuedToken, Session, TokenManager};
pub use crate::config::DbConfig;
pub use crate::db::{Db, TypeEntry};
pub use crate::error::{Error, ErrorKind, Result};
pub use crate::naming::Area;
pub use crate::storage::{KvStore, MemoryStore, Storage};

/// AreaDB error types
///
/// Every error carries a stable code (`A003`, `ST002`, ...) naming the
/// operation step that failed, and displays as `"<CODE>: <message>"`.
pub mod error {
    use crate::naming::NamingError;
    use crate::query::QueryError;
    use crate::storage::StoreError;
    use thiserror::Error;

    /// Broad classification of an [`Error`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum ErrorKind {
        /// Rejected before any store access.
        Validation,
        /// Unknown, expired or corrupt token.
        Unauthorized,
        /// Absent record, or a stored value that is `null` or not JSON.
        NotFound,
        /// The key-value store failed.
        Store,
        /// Malformed filter expression.
        Query,
    }

    #[derive(Error, Debug, Clone, PartialEq)]
    pub enum Error {
        #[error("{code}: {source}")]
        InvalidIdentifier {
            code: &'static str,
            source: NamingError,
        },

        #[error("{code}: {message}")]
        InvalidInput { code: &'static str, message: String },

        #[error("{code}: {reason}")]
        Unauthorized {
            code: &'static str,
            reason: &'static str,
        },

        #[error("{code}: Record \"{id}\" not found.")]
        NotFound { code: &'static str, id: String },

        #[error("{code}: {context}: {source}")]
        Store {
            code: &'static str,
            context: &'static str,
            source: StoreError,
        },

        #[error("{code}: Stored value of \"{id}\" is not valid JSON: {message}")]
        Corrupt {
            code: &'static str,
            id: String,
            message: String,
        },

        #[error("{code}: {source}")]
        Query {
            code: &'static str,
            source: QueryError,
        },
    }

    impl Error {
        /// Stable error code, e.g. `"G002"`.
        pub fn code(&self) -> &'static str {
            match self {
                Error::InvalidIdentifier { code, .. }
                | Error::InvalidInput { code, .. }
                | Error::Unauthorized { code, .. }
                | Error::NotFound { code, .. }
                | Error::Store { code, .. }
                | Error::Corrupt { code, .. }
                | Error::Query { code, .. } => code,
            }
        }

        pub fn kind(&self) -> ErrorKind {
            match self {
                Error::InvalidIdentifier { .. } | Error::InvalidInput { .. } => {
                    ErrorKind::Validation
                }
                Error::Unauthorized { .. } => ErrorKind::Unauthorized,
                Error::NotFound { .. } | Error::Corrupt { .. } => ErrorKind::NotFound,
                Error::Store { .. } => ErrorKind::Store,
                Error::Query { .. } => ErrorKind::Query,
            }
        }

        /// `map_err` adapter for identifier validation.
        pub fn identifier(code: &'static str) -> impl FnOnce(NamingError) -> Error {
            move |source| Error::InvalidIdentifier { code, source }
        }

        /// `map_err` adapter for store failures.
        pub fn store(code: &'static str, context: &'static str) -> impl FnOnce(StoreError) -> Error {
            move |source| Error::Store {
                code,
                context,
                source,
            }
        }
    }

    pub type Result<T> = std::result::Result<T, Error>;

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::naming::IdentifierKind;

        #[test]
        fn test_display_starts_with_code() {
            let err = Error::identifier("G001")(NamingError::Missing {
                kind: IdentifierKind::Id,
            });
            assert_eq!(err.to_string(), "G001: VN001: Id is missing.");
            assert_eq!(err.code(), "G001");
            assert_eq!(err.kind(), ErrorKind::Validation);

            let err = Error::store("A003", "Could not write record")(StoreError::Timeout(
                "put".to_string(),
            ));
            assert_eq!(
                err.to_string(),
                "A003: Could not write record: store timed out: put"
            );
            assert_eq!(err.kind(), ErrorKind::Store);
        }

        #[test]
        fn test_corrupt_values_are_not_found() {
            let err = Error::Corrupt {
                code: "G004",
                id: "abc".to_string(),
                message: "expected value".to_string(),
            };
            assert_eq!(err.kind(), ErrorKind::NotFound);
            assert!(err.to_string().starts_with("G004: "));
        }
    }
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
