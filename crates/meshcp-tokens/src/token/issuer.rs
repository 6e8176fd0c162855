//! Token minting.

use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::{Algorithm, Header, encode};
use time::OffsetDateTime;

use super::claims::{Claims, RegisteredClaims};
use crate::TokenResult;
use crate::clock::{Clock, SystemClock};
use crate::error::TokenError;
use crate::key::encoding_key;
use crate::signing::SigningKeyManager;

/// Default allowance for clock drift between issuing and verifying nodes.
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(5);

/// A signed, encoded token.
pub type Token = String;

/// Mints RS256 tokens with the latest signing key of one namespace.
pub struct TokenIssuer {
    manager: Arc<dyn SigningKeyManager>,
    clock: Arc<dyn Clock>,
    clock_skew: Duration,
}

impl TokenIssuer {
    /// Creates an issuer using the system clock and the default skew.
    #[must_use]
    pub fn new(manager: Arc<dyn SigningKeyManager>) -> Self {
        Self {
            manager,
            clock: Arc::new(SystemClock),
            clock_skew: DEFAULT_CLOCK_SKEW,
        }
    }

    /// Replaces the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Sets the clock skew allowance.
    #[must_use]
    pub fn with_clock_skew(mut self, clock_skew: Duration) -> Self {
        self.clock_skew = clock_skew;
        self
    }

    /// Signs `claims` with the latest signing key.
    ///
    /// The registered claims are overwritten: a fresh `jti`, `iat` and `nbf`
    /// set to now minus the skew, `exp` set to now plus `valid_for` plus the
    /// skew. The header `kid` is the signing key's serial number.
    ///
    /// # Errors
    ///
    /// Returns `InvalidLifetime` if the expiry falls outside the range of
    /// representable dates, or `IssuingDisabled` if the namespace has no
    /// signing key yet.
    pub async fn generate<C: Claims>(&self, mut claims: C, valid_for: Duration) -> TokenResult<Token> {
        let (not_before, expires_at) = validity_window(self.clock.now(), valid_for, self.clock_skew)?;

        let signing_key = match self.manager.get_latest_signing_key().await {
            Ok(key) => key,
            Err(TokenError::NoSigningKey { prefix, scope }) => {
                return Err(TokenError::IssuingDisabled { prefix, scope });
            }
            Err(err) => return Err(err),
        };

        claims.set_registered(RegisteredClaims {
            jti: uuid::Uuid::new_v4().to_string(),
            iat: Some(not_before),
            nbf: Some(not_before),
            exp: Some(expires_at),
        });

        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(signing_key.serial.to_string());

        let token = encode(&header, &claims, &encoding_key(&signing_key.private_key)?)
            .map_err(|e| TokenError::encoding(e.to_string()))?;

        tracing::debug!(
            prefix = self.manager.prefix(),
            scope = %self.manager.scope(),
            serial = signing_key.serial,
            jti = claims.id(),
            "Issued token"
        );

        Ok(token)
    }
}

/// Returns `(now - skew, now + valid_for + skew)` as unix timestamps.
fn validity_window(
    now: OffsetDateTime,
    valid_for: Duration,
    clock_skew: Duration,
) -> TokenResult<(i64, i64)> {
    let out_of_range = || {
        TokenError::invalid_lifetime(format!(
            "validity {valid_for:?} with clock skew {clock_skew:?} is out of range"
        ))
    };

    let skew = time::Duration::try_from(clock_skew).map_err(|_| out_of_range())?;
    let lifetime = time::Duration::try_from(valid_for)
        .ok()
        .and_then(|d| d.checked_add(skew))
        .ok_or_else(out_of_range)?;

    let not_before = now.checked_sub(skew).ok_or_else(out_of_range)?;
    let expires_at = now.checked_add(lifetime).ok_or_else(out_of_range)?;
    Ok((not_before.unix_timestamp(), expires_at.unix_timestamp()))
}
