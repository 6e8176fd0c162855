//! Token subsystem configuration.
//!
//! # Example (TOML)
//!
//! ```toml
//! clock_skew = "5s"
//! key_bits = 2048
//! enable_issuer = true
//!
//! [validator]
//! use_secrets = true
//!
//! [[validator.public_keys]]
//! kid = "primary-1"
//! kind = "user"
//! key_file = "/etc/meshcp/primary-1.pem"
//!
//! [[validator.public_keys]]
//! kid = "demo-1"
//! kind = "dataplane"
//! mesh = "demo"
//! key = """
//! -----BEGIN PUBLIC KEY-----
//! ...
//! -----END PUBLIC KEY-----
//! """
//!
//! [bootstrap]
//! initial_backoff = "100ms"
//! max_backoff = "5s"
//! max_retries = 10
//! ```

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::TokenResult;
use crate::key::DEFAULT_KEY_BITS;
use crate::signing::StaticPublicKey;
use crate::token::{DEFAULT_CLOCK_SKEW, TokenKind, TokenKindName};

/// Smallest RSA modulus accepted for generated keys.
const MIN_KEY_BITS: usize = 2048;

/// Largest accepted clock skew allowance.
const MAX_CLOCK_SKEW: Duration = Duration::from_secs(3600);

/// Root token configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TokensConfig {
    /// Allowance for clock drift between issuing and verifying nodes.
    #[serde(with = "humantime_serde")]
    pub clock_skew: Duration,

    /// RSA modulus size of generated signing keys.
    pub key_bits: usize,

    /// Whether this instance issues tokens (and bootstraps signing keys).
    /// Instances that only verify tokens signed elsewhere turn this off.
    pub enable_issuer: bool,

    /// Validation settings.
    pub validator: ValidatorConfig,

    /// Default signing key bootstrap settings.
    pub bootstrap: BootstrapConfig,
}

impl Default for TokensConfig {
    fn default() -> Self {
        Self {
            clock_skew: DEFAULT_CLOCK_SKEW,
            key_bits: DEFAULT_KEY_BITS,
            enable_issuer: true,
            validator: ValidatorConfig::default(),
            bootstrap: BootstrapConfig::default(),
        }
    }
}

/// Where verification keys come from.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Resolve keys from the secret store.
    pub use_secrets: bool,

    /// Read public-key mirror records instead of private signing keys.
    /// Set on instances that never hold the private half; legacy HS256
    /// tokens cannot be validated there.
    pub public_keys_only: bool,

    /// Statically trusted public keys, tried before the secret store.
    pub public_keys: Vec<StaticPublicKeyConfig>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            use_secrets: true,
            public_keys_only: false,
            public_keys: Vec::new(),
        }
    }
}

/// One statically trusted public key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct StaticPublicKeyConfig {
    /// Key identifier matched against the token `kid`.
    pub kid: String,

    /// Inline PEM public key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    /// Path to a PEM public key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_file: Option<PathBuf>,

    /// The token kind the key verifies. Required.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<TokenKindName>,

    /// The mesh of dataplane tokens the key verifies. Required for
    /// dataplane keys, rejected for every other kind.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mesh: Option<String>,
}

impl StaticPublicKeyConfig {
    /// Returns `true` if the key verifies tokens of `kind`.
    #[must_use]
    pub fn applies_to(&self, kind: &TokenKind) -> bool {
        self.kind == Some(kind.name()) && self.mesh.as_deref() == kind.mesh()
    }

    /// Loads the configured key.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the PEM is invalid.
    pub fn load(&self) -> TokenResult<StaticPublicKey> {
        match (&self.key, &self.key_file) {
            (Some(pem), _) => StaticPublicKey::from_pem(&self.kid, pem.as_bytes()),
            (None, Some(path)) => StaticPublicKey::from_file(&self.kid, path),
            (None, None) => Err(crate::error::TokenError::configuration(format!(
                "public key {} has neither key nor key_file",
                self.kid
            ))),
        }
    }
}

/// Retry policy for creating the default signing key at startup.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Delay before the first retry.
    #[serde(with = "humantime_serde")]
    pub initial_backoff: Duration,

    /// Upper bound of the delay between retries.
    #[serde(with = "humantime_serde")]
    pub max_backoff: Duration,

    /// Number of retries after the first attempt.
    pub max_retries: u32,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(5),
            max_retries: 10,
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),
}

impl TokensConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the document does not parse
    /// or fails [`validate`](Self::validate).
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(input).map_err(|e| ConfigError::InvalidValue(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - `key_bits` is below 2048
    /// - `clock_skew` exceeds one hour
    /// - a public key sets both `key` and `key_file`, sets `mesh` for a
    ///   kind other than dataplane, or repeats a `kid` within one kind
    /// - the bootstrap backoff is zero or its bounds are inverted
    /// - the validator has no key source at all
    ///
    /// Returns `ConfigError::Missing` if a public key has no `kid`, no
    /// `kind`, neither `key` nor `key_file`, or is a dataplane key without
    /// a `mesh`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.key_bits < MIN_KEY_BITS {
            return Err(ConfigError::InvalidValue(format!(
                "key_bits must be at least {MIN_KEY_BITS}, got {}",
                self.key_bits
            )));
        }

        if self.clock_skew > MAX_CLOCK_SKEW {
            return Err(ConfigError::InvalidValue(format!(
                "clock_skew must be at most {MAX_CLOCK_SKEW:?}, got {:?}",
                self.clock_skew
            )));
        }

        if !self.validator.use_secrets && self.validator.public_keys.is_empty() {
            return Err(ConfigError::InvalidValue(
                "validator needs use_secrets or at least one public key".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for (index, key) in self.validator.public_keys.iter().enumerate() {
            if key.kid.is_empty() {
                return Err(ConfigError::Missing(format!(
                    "validator.public_keys[{index}].kid"
                )));
            }
            match (&key.key, &key.key_file) {
                (Some(_), Some(_)) => {
                    return Err(ConfigError::InvalidValue(format!(
                        "public key {} sets both key and key_file",
                        key.kid
                    )));
                }
                (None, None) => {
                    return Err(ConfigError::Missing(format!(
                        "validator.public_keys[{index}].key or key_file"
                    )));
                }
                _ => {}
            }
            match (key.kind, &key.mesh) {
                (None, _) => {
                    return Err(ConfigError::Missing(format!(
                        "validator.public_keys[{index}].kind"
                    )));
                }
                (Some(TokenKindName::Dataplane), None) => {
                    return Err(ConfigError::Missing(format!(
                        "validator.public_keys[{index}].mesh"
                    )));
                }
                (Some(kind), Some(_)) if kind != TokenKindName::Dataplane => {
                    return Err(ConfigError::InvalidValue(format!(
                        "public key {} sets mesh for {kind} tokens",
                        key.kid
                    )));
                }
                _ => {}
            }
            if !seen.insert((key.kind, key.mesh.as_deref(), key.kid.as_str())) {
                return Err(ConfigError::InvalidValue(format!(
                    "duplicate public key id {}",
                    key.kid
                )));
            }
        }

        let bootstrap = &self.bootstrap;
        if bootstrap.initial_backoff.is_zero() {
            return Err(ConfigError::InvalidValue(
                "bootstrap.initial_backoff must be greater than zero".to_string(),
            ));
        }
        if bootstrap.max_backoff < bootstrap.initial_backoff {
            return Err(ConfigError::InvalidValue(
                "bootstrap.max_backoff must not be less than initial_backoff".to_string(),
            ));
        }

        Ok(())
    }
}
