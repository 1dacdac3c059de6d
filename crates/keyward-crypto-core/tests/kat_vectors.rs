#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

//! Known-answer tests for the three primitives behind vault keys.
//!
//! - AES-256-GCM: NIST SP 800-38D (GCMEncryptExtIV256.rsp) cases 13 and 14
//! - PBKDF2-HMAC-SHA256: RFC 7914 §11 and the widely published "password"/"salt" vectors
//! - HKDF-SHA256: RFC 5869 Appendix A.1 and A.3

use keyward_crypto_core::kdf::{DerivationStrategy, HKDF_ZERO_SALT};
use keyward_crypto_core::symmetric::{open, seal};

fn unhex(s: &str) -> Vec<u8> {
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
        .collect()
}

#[test]
fn aes256_gcm_nist_case_13_empty_plaintext() {
    let sealed = seal(&[0u8; 32], &[0u8; 12], &[]).unwrap();
    assert_eq!(sealed, unhex("530f8afbc74536b9a963b4f1c4cb738b"));
}

#[test]
fn aes256_gcm_nist_case_14() {
    let sealed = seal(&[0u8; 32], &[0u8; 12], &[0u8; 16]).unwrap();
    let expected = unhex(
        "cea7403d4d606b6e074ec5d3baf39d18\
         d0d1c8a799996bf0265b98b5d48ab919",
    );
    assert_eq!(sealed, expected);

    let opened = open(&[0u8; 32], &[0u8; 12], &expected).unwrap();
    assert_eq!(opened.expose(), &[0u8; 16]);
}

#[test]
fn pbkdf2_sha256_password_salt_one_round() {
    let key = DerivationStrategy::Pbkdf2Sha256 { iterations: 1 }
        .derive(b"password", b"salt", b"")
        .unwrap();
    assert_eq!(
        key.expose().to_vec(),
        unhex("120fb6cffcf8b32c43e7225256c4f837a86548c92ccc35480805987cb70be17b")
    );
}

#[test]
fn pbkdf2_sha256_password_salt_two_rounds() {
    let key = DerivationStrategy::Pbkdf2Sha256 { iterations: 2 }
        .derive(b"password", b"salt", b"")
        .unwrap();
    assert_eq!(
        key.expose().to_vec(),
        unhex("ae4d0c95af6b46d32d0adff928f06dd02a303f8ef3c251dfd6e2d85a95474c43")
    );
}

#[test]
fn pbkdf2_sha256_rfc7914_passwd_salt() {
    // RFC 7914 §11 lists a 64-byte output; the first 32 bytes are the key.
    let key = DerivationStrategy::Pbkdf2Sha256 { iterations: 1 }
        .derive(b"passwd", b"salt", b"")
        .unwrap();
    assert_eq!(
        key.expose().to_vec(),
        unhex("55ac046e56e3089fec1691c22544b605f94185216dde0465e68b9d57c20dacbc")
    );
}

#[test]
fn hkdf_sha256_rfc5869_a1() {
    let ikm = [0x0bu8; 22];
    let salt = unhex("000102030405060708090a0b0c");
    let info = unhex("f0f1f2f3f4f5f6f7f8f9");
    let key = DerivationStrategy::HkdfSha256
        .derive(&ikm, &salt, &info)
        .unwrap();
    assert_eq!(
        key.expose().to_vec(),
        unhex("3cb25f25faacd57a90434f64d0362f2a2d2d0a90cf1a5a4c5db02d56ecc4c5bf")
    );
}

#[test]
fn hkdf_sha256_zero_salt_matches_rfc5869_a3() {
    // A.3 uses an absent salt, which HMAC pads to the same all-zero block
    // as the 16 zero bytes used for shared-secret vaults.
    let ikm = [0x0bu8; 22];
    let key = DerivationStrategy::HkdfSha256
        .derive(&ikm, &HKDF_ZERO_SALT, b"")
        .unwrap();
    assert_eq!(
        key.expose().to_vec(),
        unhex("8da4e775a563c18f715f802a063c5a31b8a11f5c5ee1879ec3454e5f3c738d2d")
    );
}
