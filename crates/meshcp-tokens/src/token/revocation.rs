//! Per-token revocation.
//!
//! Each scope keeps a single record whose payload is a comma separated list
//! of revoked token ids. Writes to that record belong to higher-level code;
//! this module only reads it.
//!
//! # Caching
//!
//! The record is read on every check. Callers that cache results must
//! invalidate on every write to the revocation record.

use async_trait::async_trait;
use meshcp_secrets::{DynSecretStore, SecretKey};

use crate::TokenResult;

/// Reports whether a token id has been explicitly revoked.
#[async_trait]
pub trait Revocations: Send + Sync {
    /// Returns `true` if `id` is on the revocation list.
    ///
    /// # Errors
    ///
    /// Returns an error if the revocation list cannot be read. A missing
    /// list is not an error.
    async fn is_revoked(&self, id: &str) -> TokenResult<bool>;
}

/// Revocation list stored in a secret record.
pub struct SecretRevocations {
    store: DynSecretStore,
    key: SecretKey,
}

impl SecretRevocations {
    /// Creates a revocation check against the record `key`.
    #[must_use]
    pub fn new(store: DynSecretStore, key: SecretKey) -> Self {
        Self { store, key }
    }

    /// Returns the key of the backing record.
    #[must_use]
    pub fn key(&self) -> &SecretKey {
        &self.key
    }
}

#[async_trait]
impl Revocations for SecretRevocations {
    async fn is_revoked(&self, id: &str) -> TokenResult<bool> {
        if id.is_empty() {
            return Ok(false);
        }

        let record = match self.store.get(&self.key).await {
            Ok(record) => record,
            Err(err) if err.is_not_found() => return Ok(false),
            Err(err) => return Err(err.into()),
        };

        let list = String::from_utf8_lossy(&record.data);
        Ok(list.split(',').map(str::trim).any(|entry| entry == id))
    }
}

/// Revocation check that never revokes anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRevocations;

#[async_trait]
impl Revocations for NoRevocations {
    async fn is_revoked(&self, _id: &str) -> TokenResult<bool> {
        Ok(false)
    }
}
