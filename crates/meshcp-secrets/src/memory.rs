//! In-memory secret store backend.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::SecretStoreResult;
use crate::error::SecretStoreError;
use crate::traits::SecretStore;
use crate::types::{Scope, SecretKey, SecretRecord};

/// In-memory secret store backed by a `DashMap`.
///
/// Suitable for tests and single-instance deployments. `create` goes through
/// the map's entry API, so it is atomic with respect to concurrent creates
/// of the same key.
#[derive(Debug, Default)]
pub struct InMemorySecretStore {
    records: DashMap<SecretKey, SecretRecord>,
}

impl InMemorySecretStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of records across all scopes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if the store holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl SecretStore for InMemorySecretStore {
    async fn get(&self, key: &SecretKey) -> SecretStoreResult<SecretRecord> {
        self.records
            .get(key)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| SecretStoreError::not_found(&key.name, key.scope.clone()))
    }

    async fn list(
        &self,
        scope: &Scope,
        prefix: &str,
    ) -> SecretStoreResult<Vec<SecretRecord>> {
        Ok(self
            .records
            .iter()
            .filter(|entry| &entry.key().scope == scope && entry.key().name.starts_with(prefix))
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn create(
        &self,
        key: &SecretKey,
        data: Vec<u8>,
    ) -> SecretStoreResult<SecretRecord> {
        match self.records.entry(key.clone()) {
            Entry::Occupied(_) => Err(SecretStoreError::already_exists(
                &key.name,
                key.scope.clone(),
            )),
            Entry::Vacant(vacant) => {
                let record = SecretRecord::new(key.clone(), data);
                vacant.insert(record.clone());
                tracing::trace!(secret = %key, "created secret record");
                Ok(record)
            }
        }
    }

    async fn put(&self, key: &SecretKey, data: Vec<u8>) -> SecretStoreResult<SecretRecord> {
        let record = SecretRecord::new(key.clone(), data);
        self.records.insert(key.clone(), record.clone());
        Ok(record)
    }

    async fn delete(&self, key: &SecretKey) -> SecretStoreResult<()> {
        self.records
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| SecretStoreError::not_found(&key.name, key.scope.clone()))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
