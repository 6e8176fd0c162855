//! # meshcp-tokens
//!
//! Signing-key lifecycle and bearer token trust for the meshcp control plane.
//!
//! This crate provides:
//! - Signing key creation and rotation by serial number
//! - Verification key resolution from the secret store and static configuration
//! - RS256 token issuing with a `kid` header
//! - Token validation, including legacy HS256 tokens without `kid`
//! - Per-token revocation lists
//!
//! ## Overview
//!
//! Signing keys are secret records named `"{prefix}-{serial}"`. Issuing always
//! uses the highest serial present, so rotation is additive: creating a new
//! key never invalidates tokens signed with an older one. Deleting a key
//! record invalidates every token it signed.
//!
//! ## Modules
//!
//! - [`key`] - Key naming and encoding helpers
//! - [`signing`] - Signing key manager and accessors
//! - [`token`] - Claims, issuer, validator and revocations
//! - [`config`] - Token configuration
//! - [`bootstrap`] - Default signing key creation at startup
//! - [`trust`] - Assembly of issuer and validator from configuration
//!
//! ## Example
//!
//! ```ignore
//! use meshcp_tokens::prelude::*;
//!
//! let trust = TokenTrust::from_config(&config, store, TokenKind::User)?;
//! trust.bootstrap().await?;
//!
//! let token = trust.issue(UserClaims::new("admin", groups), valid_for).await?;
//! let claims: UserClaims = trust.validate(&token).await?;
//! ```

pub mod bootstrap;
pub mod clock;
pub mod config;
pub mod error;
pub mod key;
pub mod signing;
pub mod token;
pub mod trust;

pub use bootstrap::ensure_default_signing_key;
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{BootstrapConfig, ConfigError, StaticPublicKeyConfig, TokensConfig, ValidatorConfig};
pub use error::{ErrorCategory, TokenError};
pub use key::KeyId;
pub use signing::{
    DynSigningKeyAccessor, SecretSigningKeyAccessor, SecretSigningKeyManager, SigningKey,
    SigningKeyAccessor, SigningKeyAccessorChain, SigningKeyManager, StaticPublicKey,
    StaticSigningKeyAccessor,
};
pub use token::{
    Claims, DEFAULT_CLOCK_SKEW, DataplaneClaims, NoRevocations, RegisteredClaims, Revocations,
    SecretRevocations, Token, TokenIssuer, TokenKind, TokenKindName, TokenValidator, UserClaims,
    ZoneClaims,
};
pub use trust::TokenTrust;

/// Type alias for token subsystem results.
pub type TokenResult<T> = Result<T, TokenError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use meshcp_tokens::prelude::*;
/// ```
pub mod prelude {
    pub use crate::TokenResult;
    pub use crate::config::{ConfigError, TokensConfig};
    pub use crate::error::{ErrorCategory, TokenError};
    pub use crate::signing::{SigningKeyAccessor, SigningKeyManager};
    pub use crate::token::{
        Claims, DataplaneClaims, Token, TokenIssuer, TokenKind, TokenValidator, UserClaims,
        ZoneClaims,
    };
    pub use crate::trust::TokenTrust;
}
