//! Assembly of issuer and validator from configuration.

use std::sync::Arc;
use std::time::Duration;

use meshcp_secrets::{DynSecretStore, Scope};

use crate::TokenResult;
use crate::bootstrap::ensure_default_signing_key;
use crate::clock::{Clock, SystemClock};
use crate::config::TokensConfig;
use crate::error::TokenError;
use crate::signing::{
    DynSigningKeyAccessor, SecretSigningKeyAccessor, SecretSigningKeyManager, SigningKeyAccessor,
    SigningKeyAccessorChain, StaticSigningKeyAccessor,
};
use crate::token::{Claims, SecretRevocations, Token, TokenIssuer, TokenKind, TokenValidator};

/// Issuer and validator for one token kind.
pub struct TokenTrust {
    kind: TokenKind,
    manager: Option<Arc<SecretSigningKeyManager>>,
    issuer: Option<TokenIssuer>,
    validator: TokenValidator,
    config: TokensConfig,
}

impl TokenTrust {
    /// Builds the trust setup for `kind` using the system clock.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the configuration is invalid, or an error
    /// if a static public key cannot be loaded.
    pub fn from_config(
        config: &TokensConfig,
        store: DynSecretStore,
        kind: TokenKind,
    ) -> TokenResult<Self> {
        Self::from_config_with_clock(config, store, kind, Arc::new(SystemClock))
    }

    /// Builds the trust setup for `kind` with an explicit clock.
    ///
    /// The validator tries statically configured keys of this kind (and,
    /// for dataplane tokens, this mesh) first, then the secret store (private signing keys, or
    /// their public mirrors when `public_keys_only` is set).
    ///
    /// # Errors
    ///
    /// Same as [`from_config`](Self::from_config).
    pub fn from_config_with_clock(
        config: &TokensConfig,
        store: DynSecretStore,
        kind: TokenKind,
        clock: Arc<dyn Clock>,
    ) -> TokenResult<Self> {
        config
            .validate()
            .map_err(|e| TokenError::configuration(e.to_string()))?;

        let scope = kind.scope();
        let prefix = kind.signing_key_prefix();
        let mut accessors: Vec<DynSigningKeyAccessor> = Vec::new();

        let static_keys = config
            .validator
            .public_keys
            .iter()
            .filter(|key| key.applies_to(&kind))
            .map(|key| key.load())
            .collect::<TokenResult<Vec<_>>>()?;
        if !static_keys.is_empty() {
            accessors.push(Arc::new(StaticSigningKeyAccessor::new(static_keys)?));
        }

        if config.validator.use_secrets {
            let accessor = if config.validator.public_keys_only {
                SecretSigningKeyAccessor::public_only(
                    store.clone(),
                    kind.public_key_prefix(),
                    scope.clone(),
                )
            } else {
                match &scope {
                    Scope::Global => SecretSigningKeyAccessor::global(store.clone(), &prefix),
                    Scope::Mesh(mesh) => {
                        SecretSigningKeyAccessor::mesh(store.clone(), &prefix, mesh)
                    }
                }
            };
            accessors.push(Arc::new(accessor));
        }

        let chain = SigningKeyAccessorChain::new(accessors);
        tracing::debug!(kind = %kind, accessor = chain.name(), "Configured token validation");

        let validator = TokenValidator::new(
            Arc::new(chain),
            Arc::new(SecretRevocations::new(store.clone(), kind.revocations_key())),
        )
        .with_clock(clock.clone());

        let (manager, issuer) = if config.enable_issuer {
            let manager = Arc::new(
                SecretSigningKeyManager::new(store, prefix, scope).with_key_bits(config.key_bits),
            );
            let issuer = TokenIssuer::new(manager.clone())
                .with_clock(clock)
                .with_clock_skew(config.clock_skew);
            (Some(manager), Some(issuer))
        } else {
            (None, None)
        };

        Ok(Self {
            kind,
            manager,
            issuer,
            validator,
            config: config.clone(),
        })
    }

    /// Returns the token kind.
    #[must_use]
    pub fn kind(&self) -> &TokenKind {
        &self.kind
    }

    /// Returns the signing key manager, if this instance issues tokens.
    #[must_use]
    pub fn manager(&self) -> Option<&Arc<SecretSigningKeyManager>> {
        self.manager.as_ref()
    }

    /// Returns the validator.
    #[must_use]
    pub fn validator(&self) -> &TokenValidator {
        &self.validator
    }

    /// Creates the default signing key if this instance issues tokens.
    ///
    /// # Errors
    ///
    /// See [`ensure_default_signing_key`].
    pub async fn bootstrap(&self) -> TokenResult<()> {
        match &self.manager {
            Some(manager) => {
                ensure_default_signing_key(manager.as_ref(), &self.config.bootstrap).await
            }
            None => Ok(()),
        }
    }

    /// Issues a token.
    ///
    /// # Errors
    ///
    /// Returns `IssuingDisabled` if this instance does not issue tokens or
    /// no signing key exists yet.
    pub async fn issue<C: Claims>(&self, claims: C, valid_for: Duration) -> TokenResult<Token> {
        match &self.issuer {
            Some(issuer) => issuer.generate(claims, valid_for).await,
            None => Err(TokenError::IssuingDisabled {
                prefix: self.kind.signing_key_prefix(),
                scope: self.kind.scope(),
            }),
        }
    }

    /// Validates a token.
    ///
    /// # Errors
    ///
    /// See [`TokenValidator::validate`].
    pub async fn validate<C: Claims>(&self, token: &str) -> TokenResult<C> {
        self.validator.validate(token).await
    }
}

#[cfg(test)]
mod tests {
    use meshcp_secrets::InMemorySecretStore;

    use super::*;
    use crate::config::StaticPublicKeyConfig;
    use crate::key::{DEFAULT_KEY_BITS, generate_private_key_pem, public_key_pem_from_private};
    use crate::token::{DataplaneClaims, TokenKindName, UserClaims, ZoneClaims};

    fn store() -> DynSecretStore {
        Arc::new(InMemorySecretStore::new())
    }

    #[tokio::test]
    async fn test_issue_and_validate() {
        let trust =
            TokenTrust::from_config(&TokensConfig::default(), store(), TokenKind::User).unwrap();
        trust.bootstrap().await.unwrap();

        let token = trust
            .issue(UserClaims::new("admin", vec![]), Duration::from_secs(60))
            .await
            .unwrap();
        let claims: UserClaims = trust.validate(&token).await.unwrap();
        assert_eq!(claims.name, "admin");
    }

    #[tokio::test]
    async fn test_issue_before_bootstrap_is_disabled() {
        let trust =
            TokenTrust::from_config(&TokensConfig::default(), store(), TokenKind::Zone).unwrap();
        let err = trust
            .issue(UserClaims::new("admin", vec![]), Duration::from_secs(60))
            .await
            .unwrap_err();
        assert!(matches!(err, TokenError::IssuingDisabled { .. }));
    }

    #[tokio::test]
    async fn test_validate_only_instance() {
        let store = store();
        let issuing =
            TokenTrust::from_config(&TokensConfig::default(), store.clone(), TokenKind::User)
                .unwrap();
        issuing.bootstrap().await.unwrap();
        let token = issuing
            .issue(UserClaims::new("admin", vec![]), Duration::from_secs(60))
            .await
            .unwrap();

        let mut config = TokensConfig::default();
        config.enable_issuer = false;
        let verifying = TokenTrust::from_config(&config, store, TokenKind::User).unwrap();
        assert!(verifying.manager().is_none());
        verifying.bootstrap().await.unwrap();

        assert!(verifying.validate::<UserClaims>(&token).await.is_ok());
        let err = verifying
            .issue(UserClaims::new("admin", vec![]), Duration::from_secs(60))
            .await
            .unwrap_err();
        assert!(matches!(err, TokenError::IssuingDisabled { .. }));
    }

    #[tokio::test]
    async fn test_static_keys_are_filtered_by_scope() {
        let private = generate_private_key_pem(DEFAULT_KEY_BITS).unwrap();
        let public = String::from_utf8(public_key_pem_from_private(&private).unwrap()).unwrap();

        let mut config = TokensConfig::default();
        config.enable_issuer = false;
        config.validator.use_secrets = false;
        config.validator.public_keys = vec![
            StaticPublicKeyConfig {
                kid: "global-1".to_string(),
                key: Some(public.clone()),
                kind: Some(TokenKindName::Zone),
                ..StaticPublicKeyConfig::default()
            },
            StaticPublicKeyConfig {
                kid: "demo-1".to_string(),
                key: Some(public),
                kind: Some(TokenKindName::Dataplane),
                mesh: Some("demo".to_string()),
                ..StaticPublicKeyConfig::default()
            },
        ];

        let trust = TokenTrust::from_config(&config, store(), TokenKind::dataplane("demo")).unwrap();
        assert_eq!(trust.kind(), &TokenKind::dataplane("demo"));

        let validator = trust.validator();
        let err = validator
            .validate::<DataplaneClaims>("eyJhbGciOiJSUzI1NiIsImtpZCI6Imdsb2JhbC0xIn0.e30.c2ln")
            .await
            .unwrap_err();
        // "global-1" is not trusted for mesh "demo".
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_static_zone_key_does_not_verify_user_tokens() {
        let primary_store = store();
        let zone =
            TokenTrust::from_config(&TokensConfig::default(), primary_store.clone(), TokenKind::Zone)
                .unwrap();
        zone.bootstrap().await.unwrap();

        let zone_key = primary_store
            .get(&meshcp_secrets::SecretKey::global("zone-token-signing-key-1"))
            .await
            .unwrap();
        let public =
            String::from_utf8(public_key_pem_from_private(&zone_key.data).unwrap()).unwrap();

        let mut config = TokensConfig::default();
        config.enable_issuer = false;
        config.validator.public_keys = vec![StaticPublicKeyConfig {
            kid: "1".to_string(),
            key: Some(public),
            kind: Some(TokenKindName::Zone),
            ..StaticPublicKeyConfig::default()
        }];

        // A user token signed with the zone key, under the zone key's kid.
        let forged = zone
            .issue(
                UserClaims::new("admin", vec!["mesh-system:admin".to_string()]),
                Duration::from_secs(60),
            )
            .await
            .unwrap();

        let secondary_user = TokenTrust::from_config(&config, store(), TokenKind::User).unwrap();
        let err = secondary_user
            .validate::<UserClaims>(&forged)
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        let secondary_zone = TokenTrust::from_config(&config, store(), TokenKind::Zone).unwrap();
        let zone_token = zone
            .issue(ZoneClaims::new("east", vec![]), Duration::from_secs(60))
            .await
            .unwrap();
        assert!(secondary_zone.validate::<ZoneClaims>(&zone_token).await.is_ok());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = TokensConfig::default();
        config.key_bits = 512;
        let err = TokenTrust::from_config(&config, store(), TokenKind::User)
            .err()
            .unwrap();
        assert!(matches!(err, TokenError::Configuration { .. }));
    }
}
