//! Token issuing, validation and revocation.
//!
//! This module provides:
//!
//! - Claims types for dataplane, zone and user tokens
//! - The naming scheme of each [`TokenKind`]
//! - [`TokenIssuer`] and [`TokenValidator`]
//! - Per-token revocation lists

pub mod claims;
pub mod issuer;
pub mod kind;
pub mod revocation;
pub mod validator;

pub use claims::{Claims, DataplaneClaims, RegisteredClaims, UserClaims, ZoneClaims};
pub use issuer::{DEFAULT_CLOCK_SKEW, Token, TokenIssuer};
pub use kind::{TokenKind, TokenKindName};
pub use revocation::{NoRevocations, Revocations, SecretRevocations};
pub use validator::TokenValidator;
