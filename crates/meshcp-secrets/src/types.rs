//! Secret store types.
//!
//! This module defines all data types used by the [`SecretStore`](crate::SecretStore) trait.

use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// The namespace a secret record belongs to.
///
/// Records are either control-plane wide (`Global`) or owned by a single
/// mesh (tenant). Two records with the same name in different scopes are
/// unrelated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Control-plane wide.
    Global,
    /// Owned by the named mesh.
    Mesh(String),
}

impl Scope {
    /// Creates a mesh scope.
    #[must_use]
    pub fn mesh(name: impl Into<String>) -> Self {
        Self::Mesh(name.into())
    }

    /// Returns the mesh name, if this is a mesh scope.
    #[must_use]
    pub fn mesh_name(&self) -> Option<&str> {
        match self {
            Self::Global => None,
            Self::Mesh(name) => Some(name),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => write!(f, "global"),
            Self::Mesh(name) => write!(f, "mesh:{name}"),
        }
    }
}

/// Identity of a single secret record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SecretKey {
    /// Record name, unique within its scope.
    pub name: String,
    /// Scope the record lives in.
    pub scope: Scope,
}

impl SecretKey {
    /// Creates a new key.
    #[must_use]
    pub fn new(name: impl Into<String>, scope: Scope) -> Self {
        Self {
            name: name.into(),
            scope,
        }
    }

    /// Creates a key in the global scope.
    #[must_use]
    pub fn global(name: impl Into<String>) -> Self {
        Self::new(name, Scope::Global)
    }

    /// Creates a key in the scope of `mesh`.
    #[must_use]
    pub fn mesh(name: impl Into<String>, mesh: impl Into<String>) -> Self {
        Self::new(name, Scope::mesh(mesh))
    }
}

impl fmt::Display for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.scope, self.name)
    }
}

/// A secret record as held by the store.
///
/// The payload is opaque to the store; interpreting it (PEM or DER key
/// material, comma separated id lists) is the caller's job.
#[derive(Clone)]
pub struct SecretRecord {
    /// Identity of the record.
    pub key: SecretKey,
    /// Raw payload.
    pub data: Vec<u8>,
    /// When the record was created (or last replaced).
    pub created_at: OffsetDateTime,
}

impl SecretRecord {
    /// Creates a new record stamped with the current time.
    #[must_use]
    pub fn new(key: SecretKey, data: Vec<u8>) -> Self {
        Self {
            key,
            data,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    /// Returns the record name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.key.name
    }
}

// Payloads hold private keys; never print them.
impl fmt::Debug for SecretRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretRecord")
            .field("key", &self.key)
            .field("data", &format_args!("<{} bytes>", self.data.len()))
            .field("created_at", &self.created_at)
            .finish()
    }
}
