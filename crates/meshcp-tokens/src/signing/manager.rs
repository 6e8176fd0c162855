//! Write side of key rotation.
//!
//! A signing-key namespace is a `(prefix, scope)` pair. Keys in a namespace
//! are stored as records named `"{prefix}-{serial}"`; the key used for
//! minting is always the one with the highest serial number present.

use std::fmt;

use async_trait::async_trait;
use meshcp_secrets::{DynSecretStore, Scope, SecretKey};
use rsa::RsaPrivateKey;

use crate::TokenResult;
use crate::error::TokenError;
use crate::key::{
    DEFAULT_KEY_BITS, DEFAULT_SERIAL_NUMBER, decode_private_key, generate_private_key_pem,
    signing_key_name, signing_key_serial,
};

/// A decoded private signing key and its serial number.
#[derive(Clone)]
pub struct SigningKey {
    /// Serial number; carried as `kid` in issued tokens.
    pub serial: u32,
    /// The private key.
    pub private_key: RsaPrivateKey,
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("serial", &self.serial)
            .finish_non_exhaustive()
    }
}

/// Creates signing keys and resolves the latest one for minting.
#[async_trait]
pub trait SigningKeyManager: Send + Sync {
    /// Returns the key with the highest serial number in the namespace.
    ///
    /// # Errors
    ///
    /// Returns `NoSigningKey` if the namespace holds no key.
    async fn get_latest_signing_key(&self) -> TokenResult<SigningKey>;

    /// Creates the key with the default serial number unless it exists.
    ///
    /// A concurrent create by another instance is not an error.
    async fn create_default_signing_key(&self) -> TokenResult<()>;

    /// Creates a fresh key with `serial`.
    ///
    /// # Errors
    ///
    /// Returns `SigningKeyAlreadyExists` if the serial number is taken.
    async fn create_signing_key(&self, serial: u32) -> TokenResult<()>;

    /// Returns the record name prefix of the namespace.
    fn prefix(&self) -> &str;

    /// Returns the scope of the namespace.
    fn scope(&self) -> &Scope;
}

/// Signing-key manager backed by a [`SecretStore`](meshcp_secrets::SecretStore).
pub struct SecretSigningKeyManager {
    store: DynSecretStore,
    prefix: String,
    scope: Scope,
    key_bits: usize,
}

impl SecretSigningKeyManager {
    /// Creates a manager for the namespace `(prefix, scope)`.
    #[must_use]
    pub fn new(store: DynSecretStore, prefix: impl Into<String>, scope: Scope) -> Self {
        Self {
            store,
            prefix: prefix.into(),
            scope,
            key_bits: DEFAULT_KEY_BITS,
        }
    }

    /// Creates a manager for a control-plane wide namespace.
    #[must_use]
    pub fn global(store: DynSecretStore, prefix: impl Into<String>) -> Self {
        Self::new(store, prefix, Scope::Global)
    }

    /// Creates a manager for a namespace owned by `mesh`.
    #[must_use]
    pub fn mesh(store: DynSecretStore, prefix: impl Into<String>, mesh: impl Into<String>) -> Self {
        Self::new(store, prefix, Scope::mesh(mesh))
    }

    /// Sets the RSA modulus size of generated keys.
    #[must_use]
    pub fn with_key_bits(mut self, key_bits: usize) -> Self {
        self.key_bits = key_bits;
        self
    }

    async fn generate_and_create(&self, serial: u32) -> TokenResult<SecretKey> {
        let key = SecretKey::new(signing_key_name(&self.prefix, serial), self.scope.clone());
        let bits = self.key_bits;
        // RSA generation takes long enough to stall a runtime worker.
        let pem = tokio::task::spawn_blocking(move || generate_private_key_pem(bits))
            .await
            .map_err(|e| TokenError::key_generation(e.to_string()))??;

        self.store.create(&key, pem).await?;
        Ok(key)
    }
}

#[async_trait]
impl SigningKeyManager for SecretSigningKeyManager {
    async fn get_latest_signing_key(&self) -> TokenResult<SigningKey> {
        let records = self.store.list(&self.scope, &self.prefix).await?;

        let latest = records
            .into_iter()
            .filter_map(|record| {
                signing_key_serial(record.name(), &self.prefix).map(|serial| (serial, record))
            })
            .max_by_key(|(serial, _)| *serial);

        let Some((serial, record)) = latest else {
            return Err(TokenError::no_signing_key(&self.prefix, self.scope.clone()));
        };

        tracing::debug!(
            prefix = %self.prefix,
            scope = %self.scope,
            serial,
            "Resolved latest signing key"
        );

        Ok(SigningKey {
            serial,
            private_key: decode_private_key(&record.data)?,
        })
    }

    async fn create_default_signing_key(&self) -> TokenResult<()> {
        match self.generate_and_create(DEFAULT_SERIAL_NUMBER).await {
            Ok(key) => {
                tracing::info!(
                    name = %key.name,
                    scope = %self.scope,
                    serial = DEFAULT_SERIAL_NUMBER,
                    "Created default signing key"
                );
                Ok(())
            }
            Err(TokenError::Storage(err)) if err.is_already_exists() => {
                tracing::debug!(
                    prefix = %self.prefix,
                    scope = %self.scope,
                    "Default signing key already exists"
                );
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    async fn create_signing_key(&self, serial: u32) -> TokenResult<()> {
        match self.generate_and_create(serial).await {
            Ok(key) => {
                tracing::info!(
                    name = %key.name,
                    scope = %self.scope,
                    serial,
                    backend = self.store.backend_name(),
                    "Created signing key"
                );
                Ok(())
            }
            Err(TokenError::Storage(err)) if err.is_already_exists() => {
                Err(TokenError::SigningKeyAlreadyExists {
                    name: signing_key_name(&self.prefix, serial),
                    scope: self.scope.clone(),
                })
            }
            Err(err) => Err(err),
        }
    }

    fn prefix(&self) -> &str {
        &self.prefix
    }

    fn scope(&self) -> &Scope {
        &self.scope
    }
}
