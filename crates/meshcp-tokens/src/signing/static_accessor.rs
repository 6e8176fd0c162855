//! Accessor over operator-configured public keys.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use rsa::RsaPublicKey;

use super::accessor::SigningKeyAccessor;
use crate::TokenResult;
use crate::error::TokenError;
use crate::key::decode_public_key;

const NAME: &str = "static";

/// A public key distributed out of band and named by an arbitrary `kid`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticPublicKey {
    /// Key identifier tokens carry in their header.
    pub kid: String,
    /// The verification key.
    pub key: RsaPublicKey,
}

impl StaticPublicKey {
    /// Parses a PEM public key.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKey` if `pem` is not an RSA public key.
    pub fn from_pem(kid: impl Into<String>, pem: &[u8]) -> TokenResult<Self> {
        let kid = kid.into();
        let key = decode_public_key(pem)
            .map_err(|e| TokenError::invalid_key(format!("static key {kid}: {e}")))?;
        Ok(Self { kid, key })
    }

    /// Reads a PEM public key from `path`.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the file cannot be read, or `InvalidKey`
    /// if it does not hold an RSA public key.
    pub fn from_file(kid: impl Into<String>, path: impl AsRef<Path>) -> TokenResult<Self> {
        let path = path.as_ref();
        let pem = std::fs::read(path).map_err(|e| {
            TokenError::configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_pem(kid, &pem)
    }
}

/// Resolves keys from a fixed map built once at startup.
///
/// Static keys are public halves only, so the legacy scheme is never served.
#[derive(Debug, Default)]
pub struct StaticSigningKeyAccessor {
    keys: HashMap<String, RsaPublicKey>,
}

impl StaticSigningKeyAccessor {
    /// Builds the accessor.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if two keys share a `kid`.
    pub fn new(keys: Vec<StaticPublicKey>) -> TokenResult<Self> {
        let mut map = HashMap::with_capacity(keys.len());
        for StaticPublicKey { kid, key } in keys {
            if map.contains_key(&kid) {
                return Err(TokenError::configuration(format!(
                    "duplicate static public key id {kid}"
                )));
            }
            map.insert(kid, key);
        }
        Ok(Self { keys: map })
    }

    /// Returns the number of configured keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns `true` if no key is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[async_trait]
impl SigningKeyAccessor for StaticSigningKeyAccessor {
    async fn get_public_key(&self, kid: &str) -> TokenResult<RsaPublicKey> {
        self.keys
            .get(kid)
            .cloned()
            .ok_or_else(|| TokenError::signing_key_not_found(kid, NAME))
    }

    async fn get_legacy_key(&self, _kid: &str) -> TokenResult<Vec<u8>> {
        Err(TokenError::unsupported_legacy_key(NAME))
    }

    fn name(&self) -> &str {
        NAME
    }
}
