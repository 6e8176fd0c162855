//! # meshcp-secrets
//!
//! Secret record storage contract for the meshcp control plane.
//!
//! Signing keys, public-key mirrors and token revocation lists are all
//! persisted as opaque, named secret records. This crate defines the
//! contract those records are read and written through, and an in-memory
//! backend.
//!
//! ## Overview
//!
//! The main trait is [`SecretStore`], which provides:
//! - `get` by name and scope
//! - `list` by scope and name prefix
//! - `create` with create-if-absent semantics
//! - `put` and `delete` for the higher-level code that owns writes
//!
//! ## Example
//!
//! ```ignore
//! use meshcp_secrets::{InMemorySecretStore, SecretKey, SecretStore};
//!
//! let store = InMemorySecretStore::new();
//! store.create(&SecretKey::global("zone-token-signing-key-1"), pem).await?;
//! ```

mod error;
mod memory;
mod traits;
mod types;

pub use error::{ErrorCategory, SecretStoreError};
pub use memory::InMemorySecretStore;
pub use traits::SecretStore;
pub use types::{Scope, SecretKey, SecretRecord};

/// Type alias for a secret store result.
pub type SecretStoreResult<T> = Result<T, SecretStoreError>;

/// Type alias for a shareable secret store trait object.
pub type DynSecretStore = std::sync::Arc<dyn SecretStore>;
