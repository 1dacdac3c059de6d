#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

//! Property-based tests for derivation determinism and input sensitivity.

use keyward_crypto_core::kdf::{DerivationStrategy, HKDF_ZERO_SALT};
use proptest::prelude::*;

/// Cheap PBKDF2 parameters; the iteration count does not affect the properties.
const PBKDF2: DerivationStrategy = DerivationStrategy::Pbkdf2Sha256 { iterations: 3 };

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn pbkdf2_is_deterministic(
        password in proptest::collection::vec(any::<u8>(), 0..64),
        salt in proptest::collection::vec(any::<u8>(), 0..64),
    ) {
        let a = PBKDF2.derive(&password, &salt, b"").unwrap();
        let b = PBKDF2.derive(&password, &salt, b"").unwrap();
        prop_assert_eq!(a.expose(), b.expose());
    }

    #[test]
    fn pbkdf2_password_change_changes_key(
        password in proptest::collection::vec(any::<u8>(), 0..64),
        extra in any::<u8>(),
    ) {
        let mut other = password.clone();
        other.push(extra);
        let a = PBKDF2.derive(&password, b"wallet", b"").unwrap();
        let b = PBKDF2.derive(&other, b"wallet", b"").unwrap();
        prop_assert_ne!(a.expose(), b.expose());
    }

    #[test]
    fn hkdf_is_deterministic(
        secret in proptest::collection::vec(any::<u8>(), 0..64),
        info in proptest::collection::vec(any::<u8>(), 0..32),
    ) {
        let a = DerivationStrategy::HkdfSha256.derive(&secret, &HKDF_ZERO_SALT, &info).unwrap();
        let b = DerivationStrategy::HkdfSha256.derive(&secret, &HKDF_ZERO_SALT, &info).unwrap();
        prop_assert_eq!(a.expose(), b.expose());
    }

    #[test]
    fn static_key_is_prefix_of_input(
        raw in proptest::collection::vec(any::<u8>(), 32..96),
    ) {
        let key = DerivationStrategy::StaticKey.derive(&raw, b"", b"").unwrap();
        prop_assert_eq!(&key.expose()[..], &raw[..32]);
    }
}
