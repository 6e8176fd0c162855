//! Signing key lifecycle.
//!
//! - [`SigningKeyManager`] creates keys and picks the latest one for minting
//! - [`SigningKeyAccessor`] resolves verification material by key id, with
//!   store-backed and static implementations composed through
//!   [`SigningKeyAccessorChain`]

pub mod accessor;
pub mod manager;
pub mod secret_accessor;
pub mod static_accessor;

pub use accessor::{DynSigningKeyAccessor, SigningKeyAccessor, SigningKeyAccessorChain};
pub use manager::{SecretSigningKeyManager, SigningKey, SigningKeyManager};
pub use secret_accessor::SecretSigningKeyAccessor;
pub use static_accessor::{StaticPublicKey, StaticSigningKeyAccessor};
