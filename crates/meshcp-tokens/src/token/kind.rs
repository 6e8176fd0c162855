//! Token kinds and the record names they own.

use std::fmt;

use meshcp_secrets::{Scope, SecretKey};
use serde::{Deserialize, Serialize};

/// The kinds of tokens the control plane issues.
///
/// Each kind owns a signing-key namespace, a public-key mirror namespace and
/// a revocation record. Dataplane tokens are bound to a mesh; zone and user
/// tokens are trusted control-plane wide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Tokens identifying data plane proxies of one mesh.
    Dataplane {
        /// The mesh the tokens are bound to.
        mesh: String,
    },
    /// Tokens identifying zone control planes and zone proxies.
    Zone,
    /// Tokens identifying human operators.
    User,
}

/// A token kind without its mesh, as written in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKindName {
    /// Dataplane tokens.
    Dataplane,
    /// Zone tokens.
    Zone,
    /// User tokens.
    User,
}

impl fmt::Display for TokenKindName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dataplane => write!(f, "dataplane"),
            Self::Zone => write!(f, "zone"),
            Self::User => write!(f, "user"),
        }
    }
}

impl TokenKind {
    /// Creates the dataplane token kind for `mesh`.
    #[must_use]
    pub fn dataplane(mesh: impl Into<String>) -> Self {
        Self::Dataplane { mesh: mesh.into() }
    }

    #[must_use]
    pub fn name(&self) -> TokenKindName {
        match self {
            Self::Dataplane { .. } => TokenKindName::Dataplane,
            Self::Zone => TokenKindName::Zone,
            Self::User => TokenKindName::User,
        }
    }

    /// Returns the mesh of dataplane tokens.
    #[must_use]
    pub fn mesh(&self) -> Option<&str> {
        match self {
            Self::Dataplane { mesh } => Some(mesh),
            Self::Zone | Self::User => None,
        }
    }

    /// Returns the scope signing keys and revocations of this kind live in.
    #[must_use]
    pub fn scope(&self) -> Scope {
        match self {
            Self::Dataplane { mesh } => Scope::Mesh(mesh.clone()),
            Self::Zone | Self::User => Scope::Global,
        }
    }

    /// Returns the name prefix of private signing-key records.
    #[must_use]
    pub fn signing_key_prefix(&self) -> String {
        match self {
            Self::Dataplane { mesh } => format!("dataplane-token-signing-key-{mesh}"),
            Self::Zone => "zone-token-signing-key".to_string(),
            Self::User => "user-token-signing-key".to_string(),
        }
    }

    /// Returns the name prefix of public-key mirror records.
    #[must_use]
    pub fn public_key_prefix(&self) -> String {
        match self {
            Self::Dataplane { mesh } => format!("dataplane-token-signing-public-key-{mesh}"),
            Self::Zone => "zone-token-signing-public-key".to_string(),
            Self::User => "user-token-signing-public-key".to_string(),
        }
    }

    /// Returns the key of the revocation record for this kind.
    #[must_use]
    pub fn revocations_key(&self) -> SecretKey {
        let name = match self {
            Self::Dataplane { mesh } => format!("dataplane-token-revocations-{mesh}"),
            Self::Zone => "zone-token-revocations".to_string(),
            Self::User => "user-token-revocations".to_string(),
        };
        SecretKey::new(name, self.scope())
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dataplane { mesh } => write!(f, "dataplane({mesh})"),
            Self::Zone => write!(f, "zone"),
            Self::User => write!(f, "user"),
        }
    }
}
