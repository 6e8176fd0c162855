//! The secret store contract.

use async_trait::async_trait;

use crate::SecretStoreResult;
use crate::types::{Scope, SecretKey, SecretRecord};

/// A key/value store of named secret records.
///
/// Backends must provide per-record atomicity: [`create`](Self::create) is
/// create-if-absent and two concurrent creates of the same name must not
/// both succeed. Control-plane instances coordinate exclusively through
/// this guarantee. Implementations must be thread-safe (`Send + Sync`).
///
/// # Example
///
/// ```ignore
/// use meshcp_secrets::{SecretKey, SecretStore, SecretStoreResult};
///
/// async fn read_key(store: &dyn SecretStore) -> SecretStoreResult<Vec<u8>> {
///     let record = store.get(&SecretKey::global("user-token-signing-key-1")).await?;
///     Ok(record.data)
/// }
/// ```
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Reads a record.
    ///
    /// # Errors
    ///
    /// Returns `SecretStoreError::NotFound` if no record has this name in this scope.
    async fn get(&self, key: &SecretKey) -> SecretStoreResult<SecretRecord>;

    /// Lists the records of `scope` whose name starts with `prefix`.
    ///
    /// The order of the returned records is unspecified.
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure issues; an empty match is `Ok(vec![])`.
    async fn list(&self, scope: &Scope, prefix: &str) -> SecretStoreResult<Vec<SecretRecord>>;

    /// Creates a record if, and only if, none exists under `key`.
    ///
    /// # Errors
    ///
    /// Returns `SecretStoreError::AlreadyExists` if the name is taken.
    async fn create(&self, key: &SecretKey, data: Vec<u8>) -> SecretStoreResult<SecretRecord>;

    /// Creates or replaces a record.
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure issues.
    async fn put(&self, key: &SecretKey, data: Vec<u8>) -> SecretStoreResult<SecretRecord>;

    /// Deletes a record.
    ///
    /// # Errors
    ///
    /// Returns `SecretStoreError::NotFound` if the record does not exist.
    async fn delete(&self, key: &SecretKey) -> SecretStoreResult<()>;

    /// Returns the name of this backend for logging/debugging.
    fn backend_name(&self) -> &'static str;
}
