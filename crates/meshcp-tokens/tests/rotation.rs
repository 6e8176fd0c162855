use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use meshcp_secrets::{
    InMemorySecretStore, Scope, SecretKey, SecretRecord, SecretStore, SecretStoreError,
};
use meshcp_tokens::key::{decode_private_key, legacy_key_bytes, public_key_mirror};
use meshcp_tokens::{
    Claims, DataplaneClaims, FixedClock, SecretSigningKeyManager, SigningKeyManager, TokenError,
    TokenKind, TokenTrust, TokensConfig, UserClaims, ZoneClaims,
};
use rsa::pkcs1::EncodeRsaPrivateKey;
use time::macros::datetime;

const HOUR: Duration = Duration::from_secs(3600);

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("meshcp_tokens=debug")
        .try_init();
}

fn clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::new(datetime!(2024-03-01 12:00 UTC)))
}

fn trust(store: &Arc<InMemorySecretStore>, kind: TokenKind, clock: &Arc<FixedClock>) -> TokenTrust {
    TokenTrust::from_config_with_clock(
        &TokensConfig::default(),
        store.clone(),
        kind,
        clock.clone(),
    )
    .expect("valid config")
}

fn admin() -> UserClaims {
    UserClaims::new("admin", vec!["mesh-system:admin".to_string()])
}

#[tokio::test]
async fn rotation_deletion_and_revocation_scenario() {
    init_tracing();
    let store = Arc::new(InMemorySecretStore::new());
    let clock = clock();
    let trust = trust(&store, TokenKind::User, &clock);
    let manager = trust.manager().expect("issuer enabled").clone();

    // Default key, serial 1.
    trust.bootstrap().await.unwrap();
    let token_a = trust.issue(admin(), HOUR).await.unwrap();

    // Rotate to serial 2.
    manager.create_signing_key(2).await.unwrap();
    let token_b = trust.issue(admin(), HOUR).await.unwrap();

    let claims_a: UserClaims = trust.validate(&token_a).await.unwrap();
    let claims_b: UserClaims = trust.validate(&token_b).await.unwrap();
    assert_ne!(claims_a.id(), claims_b.id());

    // Deleting serial 1 revokes everything it signed.
    store
        .delete(&SecretKey::global("user-token-signing-key-1"))
        .await
        .unwrap();
    let err = trust.validate::<UserClaims>(&token_a).await.unwrap_err();
    assert!(matches!(err, TokenError::SigningKeyNotFound { ref kid, .. } if kid == "1"));
    assert!(err.is_not_found());
    assert!(trust.validate::<UserClaims>(&token_b).await.is_ok());

    // Revoking another id leaves B alone.
    let revocations = TokenKind::User.revocations_key();
    store
        .put(&revocations, claims_a.id().as_bytes().to_vec())
        .await
        .unwrap();
    assert!(trust.validate::<UserClaims>(&token_b).await.is_ok());

    // Revoking B's id rejects it.
    store
        .put(
            &revocations,
            format!("{},{}", claims_a.id(), claims_b.id()).into_bytes(),
        )
        .await
        .unwrap();
    let err = trust.validate::<UserClaims>(&token_b).await.unwrap_err();
    assert!(matches!(err, TokenError::Revoked));
}

#[tokio::test]
async fn rotation_keeps_old_tokens_valid_per_mesh() {
    let store = Arc::new(InMemorySecretStore::new());
    let clock = clock();
    let demo = trust(&store, TokenKind::dataplane("demo"), &clock);
    let other = trust(&store, TokenKind::dataplane("other"), &clock);
    demo.bootstrap().await.unwrap();
    other.bootstrap().await.unwrap();

    let claims = DataplaneClaims::new("web-01", "demo").with_tag("meshcp.io/service", "web");
    let before = demo.issue(claims.clone(), HOUR).await.unwrap();

    let manager = demo.manager().unwrap();
    manager.create_signing_key(2).await.unwrap();
    manager.create_signing_key(3).await.unwrap();
    let after = demo.issue(claims, HOUR).await.unwrap();

    let validated: DataplaneClaims = demo.validate(&before).await.unwrap();
    assert_eq!(validated.tags["meshcp.io/service"].len(), 1);
    assert!(demo.validate::<DataplaneClaims>(&after).await.is_ok());

    // Serial 1 of mesh "other" is a different key.
    let err = other.validate::<DataplaneClaims>(&before).await.unwrap_err();
    assert!(matches!(err, TokenError::InvalidSignature));
    // Mesh "other" has no serial 3.
    let err = other.validate::<DataplaneClaims>(&after).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn expiry_is_monotonic() {
    let store = Arc::new(InMemorySecretStore::new());
    let clock = clock();
    let trust = trust(&store, TokenKind::Zone, &clock);
    trust.bootstrap().await.unwrap();

    let valid_for = Duration::from_secs(600);
    let token = trust
        .issue(ZoneClaims::new("east", vec!["egress".to_string()]), valid_for)
        .await
        .unwrap();
    assert!(trust.validate::<ZoneClaims>(&token).await.is_ok());

    // now + d + skew is the first instant the token is rejected.
    clock.advance(time::Duration::seconds(600 + 5 - 1));
    assert!(trust.validate::<ZoneClaims>(&token).await.is_ok());

    clock.advance(time::Duration::seconds(1));
    let err = trust.validate::<ZoneClaims>(&token).await.unwrap_err();
    assert!(matches!(err, TokenError::Expired));

    clock.advance(time::Duration::days(365));
    let err = trust.validate::<ZoneClaims>(&token).await.unwrap_err();
    assert!(matches!(err, TokenError::Expired));
}

#[tokio::test]
async fn legacy_hs256_token_without_kid_validates_against_der_key() {
    let store = Arc::new(InMemorySecretStore::new());
    let clock = clock();
    let kind = TokenKind::dataplane("default");

    // Pre-rotation deployment: one key under the bare prefix, raw DER.
    let legacy_pem = meshcp_tokens::key::generate_private_key_pem(2048).unwrap();
    let legacy_key = decode_private_key(&legacy_pem).unwrap();
    let der = legacy_key.to_pkcs1_der().unwrap().as_bytes().to_vec();
    store
        .create(&SecretKey::mesh(kind.signing_key_prefix(), "default"), der)
        .await
        .unwrap();

    let legacy_token = encode(
        &Header::new(Algorithm::HS256),
        &DataplaneClaims::new("backend-01", "default"),
        &EncodingKey::from_secret(&legacy_key_bytes(&legacy_key).unwrap()),
    )
    .unwrap();

    let trust = trust(&store, kind, &clock);
    trust.bootstrap().await.unwrap();
    let fresh_token = trust
        .issue(DataplaneClaims::new("web-01", "default"), HOUR)
        .await
        .unwrap();

    let legacy: DataplaneClaims = trust.validate(&legacy_token).await.unwrap();
    assert_eq!(legacy.name, "backend-01");
    assert!(legacy.registered.exp.is_none());

    let fresh: DataplaneClaims = trust.validate(&fresh_token).await.unwrap();
    assert_eq!(fresh.name, "web-01");

    // Issuing uses serial 1, not the legacy key.
    let header = jsonwebtoken::decode_header(&fresh_token).unwrap();
    assert_eq!(header.kid.as_deref(), Some("1"));

    // A forged legacy token is still a signature failure.
    let forged = encode(
        &Header::new(Algorithm::HS256),
        &DataplaneClaims::new("backend-01", "default"),
        &EncodingKey::from_secret(b"guess"),
    )
    .unwrap();
    let err = trust.validate::<DataplaneClaims>(&forged).await.unwrap_err();
    assert!(matches!(err, TokenError::InvalidSignature));
}

#[tokio::test]
async fn public_key_mirror_instance_validates_but_cannot_serve_legacy() {
    let primary_store = Arc::new(InMemorySecretStore::new());
    let mirror_store = Arc::new(InMemorySecretStore::new());
    let clock = clock();

    let primary = trust(&primary_store, TokenKind::Zone, &clock);
    primary.bootstrap().await.unwrap();
    let token = primary
        .issue(ZoneClaims::new("east", vec![]), HOUR)
        .await
        .unwrap();

    // Synchronise public halves only.
    let kind = TokenKind::Zone;
    for record in primary_store
        .list(&Scope::Global, &kind.signing_key_prefix())
        .await
        .unwrap()
    {
        let (key, pem) = public_key_mirror(
            &record,
            &kind.signing_key_prefix(),
            &kind.public_key_prefix(),
        )
        .unwrap();
        mirror_store.create(&key, pem).await.unwrap();
    }

    let mut config = TokensConfig::default();
    config.enable_issuer = false;
    config.validator.public_keys_only = true;
    let mirror =
        TokenTrust::from_config_with_clock(&config, mirror_store.clone(), kind, clock.clone())
            .unwrap();

    let claims: ZoneClaims = mirror.validate(&token).await.unwrap();
    assert_eq!(claims.zone, "east");

    let mut header = Header::new(Algorithm::HS256);
    header.kid = Some("1".to_string());
    let legacy = encode(
        &header,
        &ZoneClaims::new("east", vec![]),
        &EncodingKey::from_secret(b"whatever"),
    )
    .unwrap();
    let err = mirror.validate::<ZoneClaims>(&legacy).await.unwrap_err();
    assert!(matches!(err, TokenError::UnsupportedLegacyKey { .. }));

    // The mirror holds no private material at all.
    let mirrored = mirror_store
        .get(&SecretKey::global("zone-token-signing-public-key-1"))
        .await
        .unwrap();
    assert!(mirrored.data.starts_with(b"-----BEGIN PUBLIC KEY-----"));
}

#[tokio::test]
async fn static_public_key_from_file_trusts_primary() {
    let primary_store = Arc::new(InMemorySecretStore::new());
    let clock = clock();
    let primary = trust(&primary_store, TokenKind::User, &clock);
    primary.bootstrap().await.unwrap();
    let token = primary.issue(admin(), HOUR).await.unwrap();

    let record = primary_store
        .get(&SecretKey::global("user-token-signing-key-1"))
        .await
        .unwrap();
    let public_pem = meshcp_tokens::key::public_key_pem_from_private(&record.data).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("primary-1.pem");
    std::fs::write(&path, &public_pem).unwrap();

    let config = TokensConfig::from_toml_str(&format!(
        r#"
        enable_issuer = false

        [validator]
        use_secrets = false

        [[validator.public_keys]]
        kid = "1"
        kind = "user"
        key_file = "{}"
        "#,
        path.display()
    ))
    .unwrap();

    // The secondary has its own, empty store.
    let secondary = TokenTrust::from_config_with_clock(
        &config,
        Arc::new(InMemorySecretStore::new()),
        TokenKind::User,
        clock.clone(),
    )
    .unwrap();

    let claims: UserClaims = secondary.validate(&token).await.unwrap();
    assert_eq!(claims.name, "admin");

    // A token from a later rotation is not trusted until configured.
    primary.manager().unwrap().create_signing_key(2).await.unwrap();
    let rotated = primary.issue(admin(), HOUR).await.unwrap();
    let err = secondary.validate::<UserClaims>(&rotated).await.unwrap_err();
    assert!(err.is_not_found());
}

/// Fails the first `failures` creates with a connection error.
struct FlakyStore {
    inner: InMemorySecretStore,
    failures: u32,
    creates: AtomicU32,
}

#[async_trait]
impl SecretStore for FlakyStore {
    async fn get(&self, key: &SecretKey) -> Result<SecretRecord, SecretStoreError> {
        self.inner.get(key).await
    }

    async fn list(
        &self,
        scope: &Scope,
        prefix: &str,
    ) -> Result<Vec<SecretRecord>, SecretStoreError> {
        self.inner.list(scope, prefix).await
    }

    async fn create(
        &self,
        key: &SecretKey,
        data: Vec<u8>,
    ) -> Result<SecretRecord, SecretStoreError> {
        if self.creates.fetch_add(1, Ordering::SeqCst) < self.failures {
            return Err(SecretStoreError::connection_error("store not ready"));
        }
        self.inner.create(key, data).await
    }

    async fn put(&self, key: &SecretKey, data: Vec<u8>) -> Result<SecretRecord, SecretStoreError> {
        self.inner.put(key, data).await
    }

    async fn delete(&self, key: &SecretKey) -> Result<(), SecretStoreError> {
        self.inner.delete(key).await
    }

    fn backend_name(&self) -> &'static str {
        "flaky"
    }
}

#[tokio::test]
async fn bootstrap_retries_until_store_is_ready() {
    init_tracing();
    let store = Arc::new(FlakyStore {
        inner: InMemorySecretStore::new(),
        failures: 2,
        creates: AtomicU32::new(0),
    });

    let config = TokensConfig::from_toml_str(
        r#"
        [bootstrap]
        initial_backoff = "1ms"
        max_backoff = "5ms"
        max_retries = 5
        "#,
    )
    .unwrap();
    let trust = TokenTrust::from_config(&config, store.clone(), TokenKind::User).unwrap();

    trust.bootstrap().await.unwrap();
    assert_eq!(store.creates.load(Ordering::SeqCst), 3);

    let token = trust.issue(admin(), HOUR).await.unwrap();
    assert!(trust.validate::<UserClaims>(&token).await.is_ok());
}

#[tokio::test]
async fn concurrent_bootstrap_converges_on_one_key() {
    let store = Arc::new(InMemorySecretStore::new());

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let manager = SecretSigningKeyManager::global(store.clone(), "user-token-signing-key");
            tokio::spawn(async move { manager.create_default_signing_key().await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let records = store
        .list(&Scope::Global, "user-token-signing-key")
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name(), "user-token-signing-key-1");
}
