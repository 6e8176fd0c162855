//! Token subsystem error types.
//!
//! Every failure of the issuing and validation paths is reported through
//! [`TokenError`]. A token signed by a deleted key, a forged signature, an
//! expired token and a revoked token each map to a distinct variant.

use std::fmt;

use meshcp_secrets::{Scope, SecretStoreError};

/// Errors that can occur while managing signing keys or issuing and
/// validating tokens.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// No signing key exists under the prefix.
    #[error("No signing key with prefix {prefix} in {scope}")]
    NoSigningKey {
        /// The signing key name prefix.
        prefix: String,
        /// The scope that was searched.
        scope: Scope,
    },

    /// Tokens cannot be issued because no signing key exists yet.
    #[error("Token issuing is disabled: no signing key with prefix {prefix} in {scope}")]
    IssuingDisabled {
        /// The signing key name prefix.
        prefix: String,
        /// The scope that was searched.
        scope: Scope,
    },

    /// No verification material exists for the key identifier.
    #[error("Signing key not found: kid {kid} ({accessor})")]
    SigningKeyNotFound {
        /// The key identifier taken from the token.
        kid: String,
        /// The accessor(s) that were asked.
        accessor: String,
    },

    /// A signing key with the same serial number already exists.
    #[error("Signing key already exists: {name} in {scope}")]
    SigningKeyAlreadyExists {
        /// Name of the existing record.
        name: String,
        /// Scope of the existing record.
        scope: Scope,
    },

    /// The token signature does not match the resolved key.
    #[error("Invalid signature")]
    InvalidSignature,

    /// The token could not be parsed or uses a disallowed shape.
    #[error("Malformed token: {message}")]
    Malformed {
        /// Description of what is wrong with the token.
        message: String,
    },

    /// The token has expired.
    #[error("Token expired")]
    Expired,

    /// The token is not valid yet.
    #[error("Token not yet valid")]
    NotYetValid,

    /// The token id is on the revocation list.
    #[error("Token revoked")]
    Revoked,

    /// The accessor cannot produce legacy symmetric key material.
    #[error("Legacy signing keys are not available from {accessor}")]
    UnsupportedLegacyKey {
        /// The accessor that was asked.
        accessor: String,
    },

    /// Stored or configured key material could not be decoded.
    #[error("Invalid key: {message}")]
    InvalidKey {
        /// Description of why the key is invalid.
        message: String,
    },

    /// Failed to generate a key pair.
    #[error("Key generation error: {message}")]
    KeyGeneration {
        /// Description of the key generation error.
        message: String,
    },

    /// Failed to sign a token.
    #[error("Failed to encode token: {message}")]
    Encoding {
        /// Description of the encoding error.
        message: String,
    },

    /// The requested validity window cannot be represented.
    #[error("Invalid token lifetime: {message}")]
    InvalidLifetime {
        /// Description of the rejected lifetime.
        message: String,
    },

    /// The secret store failed.
    #[error("Storage error: {0}")]
    Storage(#[from] SecretStoreError),

    /// The subsystem is configured inconsistently.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },
}

impl TokenError {
    /// Creates a new `NoSigningKey` error.
    #[must_use]
    pub fn no_signing_key(prefix: impl Into<String>, scope: Scope) -> Self {
        Self::NoSigningKey {
            prefix: prefix.into(),
            scope,
        }
    }

    /// Creates a new `SigningKeyNotFound` error.
    #[must_use]
    pub fn signing_key_not_found(kid: impl Into<String>, accessor: impl Into<String>) -> Self {
        Self::SigningKeyNotFound {
            kid: kid.into(),
            accessor: accessor.into(),
        }
    }

    /// Creates a new `Malformed` error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    /// Creates a new `UnsupportedLegacyKey` error.
    #[must_use]
    pub fn unsupported_legacy_key(accessor: impl Into<String>) -> Self {
        Self::UnsupportedLegacyKey {
            accessor: accessor.into(),
        }
    }

    /// Creates a new `InvalidKey` error.
    #[must_use]
    pub fn invalid_key(message: impl Into<String>) -> Self {
        Self::InvalidKey {
            message: message.into(),
        }
    }

    /// Creates a new `KeyGeneration` error.
    #[must_use]
    pub fn key_generation(message: impl Into<String>) -> Self {
        Self::KeyGeneration {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidLifetime` error.
    #[must_use]
    pub fn invalid_lifetime(message: impl Into<String>) -> Self {
        Self::InvalidLifetime {
            message: message.into(),
        }
    }

    /// Creates a new `Encoding` error.
    #[must_use]
    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding {
            message: message.into(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Returns `true` if key material was missing.
    ///
    /// A missing key means rotation or deletion happened; the caller should
    /// obtain a fresh token rather than treat the request as an attack.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NoSigningKey { .. }
                | Self::IssuingDisabled { .. }
                | Self::SigningKeyNotFound { .. }
        )
    }

    /// Returns `true` if this is a hard rejection of a presented token.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::InvalidSignature
                | Self::Malformed { .. }
                | Self::Expired
                | Self::NotYetValid
                | Self::Revoked
        )
    }

    /// Returns `true` if repeating the same call later may succeed.
    ///
    /// Authentication failures are never retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(err) if err.is_transient())
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NoSigningKey { .. }
            | Self::IssuingDisabled { .. }
            | Self::SigningKeyNotFound { .. } => ErrorCategory::NotFound,
            Self::SigningKeyAlreadyExists { .. } => ErrorCategory::Conflict,
            Self::InvalidSignature | Self::Malformed { .. } => ErrorCategory::Invalid,
            Self::Expired | Self::NotYetValid => ErrorCategory::Temporal,
            Self::Revoked => ErrorCategory::Revoked,
            Self::InvalidKey { .. } | Self::KeyGeneration { .. } | Self::Encoding { .. } => {
                ErrorCategory::Key
            }
            Self::UnsupportedLegacyKey { .. }
            | Self::InvalidLifetime { .. }
            | Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Storage(_) => ErrorCategory::Infrastructure,
        }
    }
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::InvalidSignature => Self::InvalidSignature,
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::ImmatureSignature => Self::NotYetValid,
            ErrorKind::InvalidRsaKey(_) | ErrorKind::InvalidKeyFormat => {
                Self::invalid_key(err.to_string())
            }
            _ => Self::malformed(err.to_string()),
        }
    }
}

/// Categories of token errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Key material is missing.
    NotFound,
    /// Key material already exists.
    Conflict,
    /// Signature or structure is invalid.
    Invalid,
    /// Outside the token's validity window.
    Temporal,
    /// Explicitly revoked.
    Revoked,
    /// Key decoding, generation or signing failure.
    Key,
    /// Misconfiguration or programming error.
    Configuration,
    /// Store failure.
    Infrastructure,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::Conflict => write!(f, "conflict"),
            Self::Invalid => write!(f, "invalid"),
            Self::Temporal => write!(f, "temporal"),
            Self::Revoked => write!(f, "revoked"),
            Self::Key => write!(f, "key"),
            Self::Configuration => write!(f, "configuration"),
            Self::Infrastructure => write!(f, "infrastructure"),
        }
    }
}
