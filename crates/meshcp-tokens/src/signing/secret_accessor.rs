//! Accessor reading signing keys from the secret store.

use async_trait::async_trait;
use meshcp_secrets::{DynSecretStore, Scope, SecretKey, SecretRecord};
use rsa::RsaPublicKey;

use super::accessor::SigningKeyAccessor;
use crate::TokenResult;
use crate::error::TokenError;
use crate::key::{
    decode_private_key, decode_public_key, legacy_key_bytes, parse_serial, signing_key_name,
};

/// What the records of a namespace hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Material {
    /// Private keys; the public key is derived.
    Private,
    /// Public-key mirrors of keys signed elsewhere.
    Public,
}

/// Resolves keys by serial number from records `"{prefix}-{serial}"`.
pub struct SecretSigningKeyAccessor {
    store: DynSecretStore,
    prefix: String,
    scope: Scope,
    material: Material,
    name: String,
}

impl SecretSigningKeyAccessor {
    fn new(store: DynSecretStore, prefix: String, scope: Scope, material: Material) -> Self {
        let kind = match material {
            Material::Private => "secrets",
            Material::Public => "public-secrets",
        };
        let name = format!("{kind}:{scope}/{prefix}");
        Self {
            store,
            prefix,
            scope,
            material,
            name,
        }
    }

    /// Creates an accessor over control-plane wide private signing keys.
    #[must_use]
    pub fn global(store: DynSecretStore, prefix: impl Into<String>) -> Self {
        Self::new(store, prefix.into(), Scope::Global, Material::Private)
    }

    /// Creates an accessor over the private signing keys of `mesh`.
    #[must_use]
    pub fn mesh(store: DynSecretStore, prefix: impl Into<String>, mesh: impl Into<String>) -> Self {
        Self::new(store, prefix.into(), Scope::mesh(mesh), Material::Private)
    }

    /// Creates an accessor over public-key mirror records.
    ///
    /// Used on instances that verify tokens but never sign them. The legacy
    /// scheme cannot be served from such records.
    #[must_use]
    pub fn public_only(
        store: DynSecretStore,
        public_prefix: impl Into<String>,
        scope: Scope,
    ) -> Self {
        Self::new(store, public_prefix.into(), scope, Material::Public)
    }

    async fn load(&self, kid: &str) -> TokenResult<SecretRecord> {
        let Some(serial) = parse_serial(kid) else {
            return Err(TokenError::signing_key_not_found(kid, &self.name));
        };
        let key = SecretKey::new(signing_key_name(&self.prefix, serial), self.scope.clone());
        match self.store.get(&key).await {
            Ok(record) => Ok(record),
            Err(err) if err.is_not_found() => {
                Err(TokenError::signing_key_not_found(kid, &self.name))
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[async_trait]
impl SigningKeyAccessor for SecretSigningKeyAccessor {
    async fn get_public_key(&self, kid: &str) -> TokenResult<RsaPublicKey> {
        let record = self.load(kid).await?;
        match self.material {
            Material::Private => Ok(decode_private_key(&record.data)?.to_public_key()),
            Material::Public => decode_public_key(&record.data),
        }
    }

    async fn get_legacy_key(&self, kid: &str) -> TokenResult<Vec<u8>> {
        if self.material == Material::Public {
            return Err(TokenError::unsupported_legacy_key(&self.name));
        }
        let record = self.load(kid).await?;
        legacy_key_bytes(&decode_private_key(&record.data)?)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
