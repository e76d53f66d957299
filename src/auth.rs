//! Token authentication
//!
//! A token is an opaque random id stored under `db_meta_token_{id}` with the
//! area it grants access to. The store expires it; nothing here tracks time.
//! Resolving a token yields a [`Session`], which every data operation takes.

use crate::error::{Error, Result};
use crate::naming::{validate, Area, IdentifierKind};
use crate::storage::keys::token_key;
use crate::storage::{PutOptions, Storage};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Smallest TTL the key-value store accepts.
pub const MIN_TOKEN_TTL_SECS: u64 = 60;

/// Stored value of a token key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub area: String,
}

/// An authenticated area binding.
///
/// Obtained only from [`TokenManager::issue_token`] or
/// [`TokenManager::resolve_token`]; switching areas means resolving another
/// token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    area: Area,
}

impl Session {
    pub(crate) fn new(area: Area) -> Self {
        Self { area }
    }

    pub fn area(&self) -> &Area {
        &self.area
    }
}

/// A freshly issued token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub id: String,
    pub session: Session,
}

/// Issues and resolves area tokens
pub struct TokenManager {
    storage: Arc<Storage>,
    min_ttl_secs: u64,
}

impl TokenManager {
    /// Create a token manager. `min_ttl_secs` is raised to
    /// [`MIN_TOKEN_TTL_SECS`] if lower.
    pub fn new(storage: Arc<Storage>, min_ttl_secs: u64) -> Self {
        Self {
            storage,
            min_ttl_secs: min_ttl_secs.max(MIN_TOKEN_TTL_SECS),
        }
    }

    pub fn min_ttl_secs(&self) -> u64 {
        self.min_ttl_secs
    }

    /// Issue a token for `area` that the store expires after `ttl_secs`.
    #[instrument(skip(self))]
    pub async fn issue_token(&self, area: &str, ttl_secs: u64) -> Result<IssuedToken> {
        let area = Area::parse(area).map_err(Error::identifier("GT001"))?;
        if ttl_secs < self.min_ttl_secs {
            return Err(Error::InvalidInput {
                code: "GT002",
                message: format!(
                    "Token TTL must be at least {} seconds, got {ttl_secs}.",
                    self.min_ttl_secs
                ),
            });
        }

        let id = Uuid::new_v4().simple().to_string();
        let key = token_key(&id).map_err(Error::identifier("GT001"))?;
        let value = serde_json::to_string(&TokenRecord {
            area: area.as_str().to_string(),
        })
        .map_err(|e| Error::InvalidInput {
            code: "GT001",
            message: e.to_string(),
        })?;

        self.storage
            .put(&key, value, PutOptions::expiring_after(ttl_secs))
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to store token");
                Error::store("GT003", "Could not store token")(e)
            })?;

        info!(code = "GT004", area = %area, ttl_secs, "Issued token");
        Ok(IssuedToken {
            id,
            session: Session::new(area),
        })
    }

    /// Resolve a token id to the session it grants.
    ///
    /// Unknown, expired and corrupt tokens are all authorization failures;
    /// none of them reveal what the token was bound to.
    #[instrument(skip_all)]
    pub async fn resolve_token(&self, token_id: &str) -> Result<Session> {
        validate(IdentifierKind::Token, token_id).map_err(|e| {
            debug!(error = %e, "Rejected token id");
            Error::Unauthorized {
                code: "ST001",
                reason: "Token is invalid.",
            }
        })?;
        let key = token_key(token_id).map_err(|_| Error::Unauthorized {
            code: "ST001",
            reason: "Token is invalid.",
        })?;

        let stored = self.storage.get(&key).await.map_err(|e| {
            error!(error = %e, "Failed to read token");
            Error::store("ST005", "Could not read token")(e)
        })?;

        let stored = match stored {
            Some(text) if !text.is_empty() => text,
            _ => {
                debug!("Token not found");
                return Err(Error::Unauthorized {
                    code: "ST002",
                    reason: "Token is unknown or expired.",
                });
            }
        };

        let area = serde_json::from_str::<TokenRecord>(&stored)
            .ok()
            .and_then(|record| Area::parse(&record.area).ok())
            .ok_or_else(|| {
                warn!("Stored token value is corrupt");
                Error::Unauthorized {
                    code: "ST004",
                    reason: "Token is corrupt.",
                }
            })?;

        debug!(code = "ST003", "Resolved token");
        Ok(Session::new(area))
    }
}
