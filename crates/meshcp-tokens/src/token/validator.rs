//! Token validation.
//!
//! A token is trusted only after four checks pass, in order:
//!
//! 1. the key identifier resolves to verification material
//! 2. the signature verifies under the algorithm the header declares
//! 3. the temporal claims admit the current time
//! 4. the token id is not revoked
//!
//! Two signing schemes are accepted. Current tokens are RS256 and carry a
//! `kid`. Legacy tokens are HS256 over the PKCS#1 DER bytes of the private
//! key, may lack `kid` (the claims type then supplies a fallback) and may
//! lack temporal claims.

use std::sync::Arc;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};

use super::claims::Claims;
use super::revocation::Revocations;
use crate::TokenResult;
use crate::clock::{Clock, SystemClock};
use crate::error::TokenError;
use crate::key::decoding_key;
use crate::signing::SigningKeyAccessor;

/// Validates tokens against an accessor and a revocation list.
pub struct TokenValidator {
    accessor: Arc<dyn SigningKeyAccessor>,
    revocations: Arc<dyn Revocations>,
    clock: Arc<dyn Clock>,
}

impl TokenValidator {
    /// Creates a validator using the system clock.
    #[must_use]
    pub fn new(accessor: Arc<dyn SigningKeyAccessor>, revocations: Arc<dyn Revocations>) -> Self {
        Self {
            accessor,
            revocations,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replaces the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Validates `token` and returns its claims.
    ///
    /// # Errors
    ///
    /// - `SigningKeyNotFound` if no accessor knows the key (rotated away or
    ///   deleted)
    /// - `InvalidSignature` or `Malformed` if the token was tampered with
    /// - `Expired` / `NotYetValid` outside the validity window
    /// - `Revoked` if the token id is on the revocation list
    pub async fn validate<C: Claims>(&self, token: &str) -> TokenResult<C> {
        let result = self.validate_inner(token).await;
        if let Err(err) = &result {
            tracing::debug!(
                accessor = self.accessor.name(),
                category = %err.category(),
                error = %err,
                "Rejected token"
            );
        }
        result
    }

    async fn validate_inner<C: Claims>(&self, token: &str) -> TokenResult<C> {
        let header = decode_header(token)?;
        let kid = match header.kid {
            Some(kid) => kid,
            None => unverified_claims::<C>(token)?
                .key_id_fallback()
                .ok_or_else(|| TokenError::malformed("token has no kid"))?,
        };

        let key = match header.alg {
            Algorithm::RS256 => decoding_key(&self.accessor.get_public_key(&kid).await?)?,
            Algorithm::HS256 => DecodingKey::from_secret(&self.accessor.get_legacy_key(&kid).await?),
            other => {
                return Err(TokenError::malformed(format!(
                    "unsupported signing algorithm {other:?}"
                )));
            }
        };

        // Temporal claims are checked against our own clock below.
        let mut validation = Validation::new(header.alg);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let claims = decode::<C>(token, &key, &validation)?.claims;
        self.check_temporal(&claims, header.alg)?;

        if self.revocations.is_revoked(claims.id()).await? {
            return Err(TokenError::Revoked);
        }

        tracing::debug!(kid = %kid, jti = claims.id(), "Validated token");
        Ok(claims)
    }

    fn check_temporal<C: Claims>(&self, claims: &C, alg: Algorithm) -> TokenResult<()> {
        let now = self.clock.now().unix_timestamp();
        let registered = claims.registered();

        match registered.exp {
            Some(exp) if exp <= now => return Err(TokenError::Expired),
            Some(_) => {}
            None if alg == Algorithm::HS256 => {}
            None => return Err(TokenError::malformed("token has no exp claim")),
        }

        match registered.nbf {
            Some(nbf) if nbf > now => Err(TokenError::NotYetValid),
            _ => Ok(()),
        }
    }
}

/// Reads the claims without verifying the signature.
///
/// Only used to pick a fallback key id; nothing read here is trusted.
fn unverified_claims<C: Claims>(token: &str) -> TokenResult<C> {
    let payload = token
        .split('.')
        .nth(1)
        .ok_or_else(|| TokenError::malformed("token has no payload segment"))?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| TokenError::malformed(format!("payload is not base64url: {e}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| TokenError::malformed(format!("payload is not valid claims: {e}")))
}
