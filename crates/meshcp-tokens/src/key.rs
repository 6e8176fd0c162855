//! Signing key naming and encoding helpers.
//!
//! ## Naming
//!
//! Signing keys live in secret records named `"{prefix}-{serial}"`. Serial
//! number 0 is the pre-rotation key and is stored under the bare prefix.
//!
//! ## Encoding
//!
//! Private keys are written as PKCS#1 PEM. Records written before PEM was
//! introduced hold the raw PKCS#1 DER bytes, so decoding tries PEM first and
//! falls back to DER. The legacy HMAC scheme signs with the PKCS#1 DER bytes
//! of the private key, whatever the record encoding.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{DecodingKey, EncodingKey};
use meshcp_secrets::{SecretKey, SecretRecord};
use rand::rngs::OsRng;
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey, EncodeRsaPrivateKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePublicKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};

use crate::TokenResult;
use crate::error::TokenError;

/// Key identifier carried in the token `kid` header.
///
/// Store-backed keys use the decimal serial number; statically configured
/// keys may use any string.
pub type KeyId = String;

/// Serial number of the key created at bootstrap.
pub const DEFAULT_SERIAL_NUMBER: u32 = 1;

/// Serial number of the pre-rotation key stored under the bare prefix.
pub const LEGACY_SERIAL_NUMBER: u32 = 0;

/// Default RSA modulus size.
pub const DEFAULT_KEY_BITS: usize = 2048;

/// Returns the record name of the signing key with `serial`.
#[must_use]
pub fn signing_key_name(prefix: &str, serial: u32) -> String {
    if serial == LEGACY_SERIAL_NUMBER {
        prefix.to_string()
    } else {
        format!("{prefix}-{serial}")
    }
}

/// Parses the serial number out of a record name.
///
/// Returns `None` for names that do not belong to `prefix`, including names
/// that merely share its leading characters (`"{prefix}x-1"`) or carry a
/// non-numeric suffix.
#[must_use]
pub fn signing_key_serial(name: &str, prefix: &str) -> Option<u32> {
    let rest = name.strip_prefix(prefix)?;
    if rest.is_empty() {
        return Some(LEGACY_SERIAL_NUMBER);
    }
    let digits = rest.strip_prefix('-')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Interprets a `kid` as a serial number.
///
/// Only plain non-negative integers qualify; anything else can only name a
/// statically configured key.
#[must_use]
pub fn parse_serial(kid: &str) -> Option<u32> {
    if kid.is_empty() || !kid.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    kid.parse().ok()
}

/// Generates a fresh RSA private key encoded as PKCS#1 PEM.
///
/// # Errors
/// Returns an error if key generation or encoding fails.
pub fn generate_private_key_pem(bits: usize) -> TokenResult<Vec<u8>> {
    let private_key = RsaPrivateKey::new(&mut OsRng, bits)
        .map_err(|e| TokenError::key_generation(e.to_string()))?;
    let pem = private_key
        .to_pkcs1_pem(LineEnding::LF)
        .map_err(|e| TokenError::key_generation(e.to_string()))?;
    Ok(pem.as_bytes().to_vec())
}

/// Decodes stored private key bytes.
///
/// PEM (PKCS#1 or PKCS#8) is tried first; anything that is not PEM is
/// parsed as legacy raw PKCS#1 DER.
///
/// # Errors
/// Returns `InvalidKey` if neither encoding parses.
pub fn decode_private_key(bytes: &[u8]) -> TokenResult<RsaPrivateKey> {
    match pem_text(bytes) {
        Some(pem) if pem.contains("BEGIN RSA PRIVATE KEY") => RsaPrivateKey::from_pkcs1_pem(pem)
            .map_err(|e| TokenError::invalid_key(format!("invalid PKCS#1 PEM: {e}"))),
        Some(pem) => RsaPrivateKey::from_pkcs8_pem(pem)
            .map_err(|e| TokenError::invalid_key(format!("invalid PKCS#8 PEM: {e}"))),
        None => RsaPrivateKey::from_pkcs1_der(bytes)
            .map_err(|e| TokenError::invalid_key(format!("invalid PKCS#1 DER: {e}"))),
    }
}

/// Decodes a PEM public key (`PUBLIC KEY` or `RSA PUBLIC KEY`).
///
/// # Errors
/// Returns `InvalidKey` if the bytes are not a PEM RSA public key.
pub fn decode_public_key(bytes: &[u8]) -> TokenResult<RsaPublicKey> {
    let pem =
        pem_text(bytes).ok_or_else(|| TokenError::invalid_key("public key is not PEM encoded"))?;
    if pem.contains("BEGIN RSA PUBLIC KEY") {
        RsaPublicKey::from_pkcs1_pem(pem)
            .map_err(|e| TokenError::invalid_key(format!("invalid PKCS#1 public key: {e}")))
    } else {
        RsaPublicKey::from_public_key_pem(pem)
            .map_err(|e| TokenError::invalid_key(format!("invalid public key: {e}")))
    }
}

/// Derives the PEM public key from stored private key bytes.
///
/// # Errors
/// Returns an error if the private key cannot be decoded.
pub fn public_key_pem_from_private(bytes: &[u8]) -> TokenResult<Vec<u8>> {
    let private_key = decode_private_key(bytes)?;
    let pem = private_key
        .to_public_key()
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| TokenError::invalid_key(e.to_string()))?;
    Ok(pem.into_bytes())
}

/// Returns the HMAC secret of the legacy signing scheme.
///
/// # Errors
/// Returns an error if DER encoding fails.
pub fn legacy_key_bytes(private_key: &RsaPrivateKey) -> TokenResult<Vec<u8>> {
    let der = private_key
        .to_pkcs1_der()
        .map_err(|e| TokenError::invalid_key(e.to_string()))?;
    Ok(der.as_bytes().to_vec())
}

/// Converts a private key into a `jsonwebtoken` signing key.
///
/// # Errors
/// Returns an error if DER encoding fails.
pub fn encoding_key(private_key: &RsaPrivateKey) -> TokenResult<EncodingKey> {
    let der = private_key
        .to_pkcs1_der()
        .map_err(|e| TokenError::invalid_key(e.to_string()))?;
    Ok(EncodingKey::from_rsa_der(der.as_bytes()))
}

/// Converts a public key into a `jsonwebtoken` verification key.
///
/// # Errors
/// Returns an error if the key components are rejected.
pub fn decoding_key(public_key: &RsaPublicKey) -> TokenResult<DecodingKey> {
    let n = URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be());
    let e = URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be());
    DecodingKey::from_rsa_components(&n, &e).map_err(|e| TokenError::invalid_key(e.to_string()))
}

/// Builds the public-key-only mirror of a private signing key record.
///
/// Instances that must verify but never sign hold copies of signing keys
/// with the private half stripped. The mirror keeps the record's scope and
/// serial suffix and swaps `private_prefix` for `public_prefix`.
///
/// # Errors
/// Returns `InvalidKey` if the record is not a signing key under
/// `private_prefix` or its payload cannot be decoded.
pub fn public_key_mirror(
    record: &SecretRecord,
    private_prefix: &str,
    public_prefix: &str,
) -> TokenResult<(SecretKey, Vec<u8>)> {
    let serial = signing_key_serial(record.name(), private_prefix).ok_or_else(|| {
        TokenError::invalid_key(format!(
            "{} is not a signing key with prefix {private_prefix}",
            record.name()
        ))
    })?;
    let public_pem = public_key_pem_from_private(&record.data)?;
    let key = SecretKey::new(
        signing_key_name(public_prefix, serial),
        record.key.scope.clone(),
    );
    Ok((key, public_pem))
}

fn pem_text(bytes: &[u8]) -> Option<&str> {
    let text = std::str::from_utf8(bytes).ok()?.trim();
    text.starts_with("-----BEGIN").then_some(text)
}
