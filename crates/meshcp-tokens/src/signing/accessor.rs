//! Verification key resolution.

use std::sync::Arc;

use async_trait::async_trait;
use rsa::RsaPublicKey;

use crate::TokenResult;
use crate::error::TokenError;

/// Resolves verification material for a key identifier.
///
/// Implementations differ in where the material lives (secret store,
/// operator configuration) and in what they can offer: only accessors that
/// hold the private half can serve the legacy symmetric scheme.
#[async_trait]
pub trait SigningKeyAccessor: Send + Sync {
    /// Returns the RSA public key for `kid`.
    ///
    /// # Errors
    ///
    /// Returns `SigningKeyNotFound` if this accessor knows no key `kid`.
    async fn get_public_key(&self, kid: &str) -> TokenResult<RsaPublicKey>;

    /// Returns the HMAC secret of the legacy scheme for `kid`.
    ///
    /// # Errors
    ///
    /// Returns `SigningKeyNotFound` if this accessor knows no key `kid`, or
    /// `UnsupportedLegacyKey` if it never holds private key material.
    async fn get_legacy_key(&self, kid: &str) -> TokenResult<Vec<u8>>;

    /// Returns a short description used in errors and logs.
    fn name(&self) -> &str;
}

/// Type alias for a shareable accessor trait object.
pub type DynSigningKeyAccessor = Arc<dyn SigningKeyAccessor>;

/// An ordered list of accessors tried in turn.
///
/// The first member that resolves the key wins. Members that do not know the
/// key, or cannot serve the requested kind of material, are skipped. Any
/// other failure (a store outage, undecodable key material) is remembered
/// and returned if no later member succeeds, so that it is not mistaken for
/// a rotated-away key.
pub struct SigningKeyAccessorChain {
    accessors: Vec<DynSigningKeyAccessor>,
    name: String,
}

impl SigningKeyAccessorChain {
    /// Creates a chain trying `accessors` in order.
    #[must_use]
    pub fn new(accessors: Vec<DynSigningKeyAccessor>) -> Self {
        let names: Vec<&str> = accessors.iter().map(|a| a.name()).collect();
        let name = format!("chain[{}]", names.join(", "));
        Self { accessors, name }
    }

    /// Returns the number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.accessors.len()
    }

    /// Returns `true` if the chain has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accessors.is_empty()
    }
}

/// Failures collected while walking the chain.
#[derive(Default)]
struct Misses {
    failure: Option<TokenError>,
    unsupported: Option<TokenError>,
    not_found: bool,
}

impl Misses {
    fn record(&mut self, accessor: &str, kid: &str, err: TokenError) {
        tracing::debug!(kid, accessor, error = %err, "Accessor could not resolve signing key");
        if err.is_not_found() {
            self.not_found = true;
        } else if matches!(err, TokenError::UnsupportedLegacyKey { .. }) {
            self.unsupported.get_or_insert(err);
        } else {
            self.failure.get_or_insert(err);
        }
    }

    fn into_error(self, kid: &str, chain: &str) -> TokenError {
        if let Some(failure) = self.failure {
            return failure;
        }
        match self.unsupported {
            // No member could even have held the key.
            Some(unsupported) if !self.not_found => unsupported,
            _ => TokenError::signing_key_not_found(kid, chain),
        }
    }
}

#[async_trait]
impl SigningKeyAccessor for SigningKeyAccessorChain {
    async fn get_public_key(&self, kid: &str) -> TokenResult<RsaPublicKey> {
        let mut misses = Misses::default();
        for accessor in &self.accessors {
            match accessor.get_public_key(kid).await {
                Ok(key) => {
                    tracing::debug!(kid, accessor = accessor.name(), "Resolved public key");
                    return Ok(key);
                }
                Err(err) => misses.record(accessor.name(), kid, err),
            }
        }
        Err(misses.into_error(kid, &self.name))
    }

    async fn get_legacy_key(&self, kid: &str) -> TokenResult<Vec<u8>> {
        let mut misses = Misses::default();
        for accessor in &self.accessors {
            match accessor.get_legacy_key(kid).await {
                Ok(key) => {
                    tracing::debug!(kid, accessor = accessor.name(), "Resolved legacy key");
                    return Ok(key);
                }
                Err(err) => misses.record(accessor.name(), kid, err),
            }
        }
        Err(misses.into_error(kid, &self.name))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
