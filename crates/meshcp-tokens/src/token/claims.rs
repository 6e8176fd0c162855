//! Token claims.
//!
//! Every token carries the [`RegisteredClaims`] stamped by the issuer plus
//! caller-defined claims. The caller-defined part is modelled by the
//! [`Claims`] trait so the issuer and validator stay generic over token
//! kinds.

use std::collections::{BTreeMap, BTreeSet};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::key::{KeyId, LEGACY_SERIAL_NUMBER};

/// Claims stamped by the issuer.
///
/// Temporal claims are optional on the wire because tokens minted before
/// expiry was introduced carry none of them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredClaims {
    /// Unique token id, used for revocation.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub jti: String,

    /// Issued at (Unix timestamp).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Not before (Unix timestamp).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,

    /// Expiration time (Unix timestamp).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

/// A claim set that can be issued and validated.
pub trait Claims: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Returns the registered claims.
    fn registered(&self) -> &RegisteredClaims;

    /// Replaces the registered claims.
    fn set_registered(&mut self, registered: RegisteredClaims);

    /// Returns the unique token id.
    fn id(&self) -> &str {
        &self.registered().jti
    }

    /// Key id to use when the token header carries no `kid`.
    ///
    /// Token kinds that were issued before `kid` existed return the serial
    /// number of the pre-rotation key.
    fn key_id_fallback(&self) -> Option<KeyId> {
        None
    }
}

/// Identity of a data plane proxy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DataplaneClaims {
    /// Registered claims.
    #[serde(flatten)]
    pub registered: RegisteredClaims,

    /// Dataplane name; empty means any dataplane in the mesh.
    #[serde(default)]
    pub name: String,

    /// Mesh the dataplane belongs to.
    pub mesh: String,

    /// Tags the dataplane is allowed to carry.
    #[serde(default)]
    pub tags: BTreeMap<String, BTreeSet<String>>,

    /// Proxy type, e.g. `dataplane` or `ingress`.
    #[serde(default, rename = "Type")]
    pub proxy_type: String,
}

impl DataplaneClaims {
    /// Creates claims for the named dataplane in `mesh`.
    #[must_use]
    pub fn new(name: impl Into<String>, mesh: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mesh: mesh.into(),
            proxy_type: "dataplane".to_string(),
            ..Self::default()
        }
    }

    /// Adds an allowed value for a tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.entry(tag.into()).or_default().insert(value.into());
        self
    }
}

impl Claims for DataplaneClaims {
    fn registered(&self) -> &RegisteredClaims {
        &self.registered
    }

    fn set_registered(&mut self, registered: RegisteredClaims) {
        self.registered = registered;
    }

    fn key_id_fallback(&self) -> Option<KeyId> {
        Some(LEGACY_SERIAL_NUMBER.to_string())
    }
}

/// Identity of a zone control plane or zone proxy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ZoneClaims {
    /// Registered claims.
    #[serde(flatten)]
    pub registered: RegisteredClaims,

    /// Zone name.
    pub zone: String,

    /// What the token may be used for, e.g. `egress`.
    #[serde(default)]
    pub scope: Vec<String>,
}

impl ZoneClaims {
    /// Creates claims for `zone` with the given scopes.
    #[must_use]
    pub fn new(zone: impl Into<String>, scope: Vec<String>) -> Self {
        Self {
            zone: zone.into(),
            scope,
            ..Self::default()
        }
    }
}

impl Claims for ZoneClaims {
    fn registered(&self) -> &RegisteredClaims {
        &self.registered
    }

    fn set_registered(&mut self, registered: RegisteredClaims) {
        self.registered = registered;
    }

    fn key_id_fallback(&self) -> Option<KeyId> {
        Some(LEGACY_SERIAL_NUMBER.to_string())
    }
}

/// Identity of a human operator.
///
/// User tokens always carried `kid`, so there is no fallback key id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserClaims {
    /// Registered claims.
    #[serde(flatten)]
    pub registered: RegisteredClaims,

    /// User name.
    pub name: String,

    /// Groups the user belongs to.
    #[serde(default)]
    pub groups: Vec<String>,
}

impl UserClaims {
    /// Creates claims for `name` in `groups`.
    #[must_use]
    pub fn new(name: impl Into<String>, groups: Vec<String>) -> Self {
        Self {
            name: name.into(),
            groups,
            ..Self::default()
        }
    }
}

impl Claims for UserClaims {
    fn registered(&self) -> &RegisteredClaims {
        &self.registered
    }

    fn set_registered(&mut self, registered: RegisteredClaims) {
        self.registered = registered;
    }
}
