//! Text encodings for binary fields crossing the request boundary.
//!
//! Ciphertext, nonce, and configured key material arrive as text. A value
//! may carry an explicit `hex:` or `base64:` prefix; without one, a string
//! made only of an even number of hex digits is read as hex and anything
//! else as standard base64 (padding optional).

use data_encoding::{BASE64, BASE64_NOPAD, HEXLOWER, HEXLOWER_PERMISSIVE};

use crate::error::VaultError;

/// Decode `value` as hex or base64. `field` names the value in errors.
///
/// # Errors
///
/// Returns [`VaultError::MalformedInput`] for an empty value or one that
/// decodes under neither codec.
pub fn decode_field(field: &str, value: &str) -> Result<Vec<u8>, VaultError> {
    let value = value.trim();
    let malformed = || VaultError::MalformedInput(format!("{field} is not valid hex or base64"));

    if let Some(hex) = value.strip_prefix("hex:") {
        return decode_hex(hex).ok_or_else(malformed);
    }
    if let Some(b64) = value.strip_prefix("base64:") {
        return decode_base64(b64).ok_or_else(malformed);
    }
    if value.is_empty() {
        return Err(VaultError::MalformedInput(format!("{field} is empty")));
    }

    if looks_like_hex(value) {
        if let Some(bytes) = decode_hex(value) {
            return Ok(bytes);
        }
    }
    decode_base64(value).ok_or_else(malformed)
}

/// Lowercase hex.
#[must_use]
pub fn encode_hex(bytes: &[u8]) -> String {
    HEXLOWER.encode(bytes)
}

/// Standard padded base64.
#[must_use]
pub fn encode_base64(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

fn looks_like_hex(value: &str) -> bool {
    value.len() % 2 == 0 && value.bytes().all(|b| b.is_ascii_hexdigit())
}

fn decode_hex(value: &str) -> Option<Vec<u8>> {
    let value = value.trim();
    let value = value.strip_prefix("0x").unwrap_or(value);
    HEXLOWER_PERMISSIVE.decode(value.as_bytes()).ok()
}

fn decode_base64(value: &str) -> Option<Vec<u8>> {
    let value = value.trim();
    if value.ends_with('=') {
        BASE64.decode(value.as_bytes()).ok()
    } else {
        BASE64_NOPAD.decode(value.as_bytes()).ok()
    }
}
