//! Heap containers for secrets.
//!
//! Key material lives in [`SecretBuffer`] (any length: decrypted private
//! keys, configured secrets) or [`SecretBytes`] (derived AES keys). Both
//! keep their bytes behind a `secrecy` box, so the address is stable for
//! the container's lifetime and the contents are wiped when it drops.
//! Pages are pinned with `mlock` where the OS allows it.

use std::fmt;

use rand::rngs::OsRng;
use rand::RngCore;
use secrecy::{ExposeSecret, SecretBox, SecretSlice};
use zeroize::Zeroize;

use crate::error::CryptoError;

// ---------------------------------------------------------------------------
// SecretBuffer
// ---------------------------------------------------------------------------

/// Variable-length secret.
pub struct SecretBuffer {
    bytes: SecretSlice<u8>,
    pinned: bool,
}

impl SecretBuffer {
    /// Copy `data` into a new buffer. Wiping the source stays with the
    /// caller.
    #[must_use]
    pub fn new(data: &[u8]) -> Self {
        Self::from_vec(data.to_vec())
    }

    /// Take ownership of `data`.
    #[must_use]
    pub fn from_vec(data: Vec<u8>) -> Self {
        let bytes = SecretSlice::from(data);
        let pinned = pages::pin(bytes.expose_secret());
        Self { bytes, pinned }
    }

    #[must_use]
    pub fn expose(&self) -> &[u8] {
        self.bytes.expose_secret()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.expose().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.expose().is_empty()
    }

    /// Whether `mlock` succeeded for this buffer.
    #[must_use]
    pub const fn is_pinned(&self) -> bool {
        self.pinned
    }
}

impl Drop for SecretBuffer {
    fn drop(&mut self) {
        if self.pinned {
            pages::unpin(self.bytes.expose_secret());
        }
    }
}

impl fmt::Debug for SecretBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretBuffer([REDACTED {} bytes])", self.len())
    }
}

// ---------------------------------------------------------------------------
// SecretBytes<N>
// ---------------------------------------------------------------------------

/// Fixed-size secret; every AES key in the crate is a `SecretBytes<32>`.
pub struct SecretBytes<const N: usize> {
    bytes: SecretBox<[u8; N]>,
    pinned: bool,
}

impl<const N: usize> SecretBytes<N> {
    /// Box `data` and wipe the by-value copy.
    #[must_use]
    pub fn new(mut data: [u8; N]) -> Self {
        let bytes = SecretBox::new(Box::new(data));
        data.zeroize();
        let pinned = pages::pin(bytes.expose_secret());
        Self { bytes, pinned }
    }

    /// # Errors
    ///
    /// `CryptoError::InvalidKeyLength` unless `data` is exactly `N` bytes.
    pub fn from_slice(data: &[u8]) -> Result<Self, CryptoError> {
        let array: [u8; N] = data
            .try_into()
            .map_err(|_| CryptoError::InvalidKeyLength(data.len()))?;
        Ok(Self::new(array))
    }

    /// `N` bytes from the OS CSPRNG.
    ///
    /// # Errors
    ///
    /// `CryptoError::SecureMemory` if the CSPRNG is unavailable.
    pub fn random() -> Result<Self, CryptoError> {
        let mut data = [0u8; N];
        OsRng
            .try_fill_bytes(&mut data)
            .map_err(|e| CryptoError::SecureMemory(format!("os rng: {e}")))?;
        Ok(Self::new(data))
    }

    #[must_use]
    pub fn expose(&self) -> &[u8; N] {
        self.bytes.expose_secret()
    }
}

impl<const N: usize> Drop for SecretBytes<N> {
    fn drop(&mut self) {
        if self.pinned {
            pages::unpin(self.bytes.expose_secret());
        }
    }
}

impl<const N: usize> fmt::Debug for SecretBytes<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretBytes<{N}>([REDACTED])")
    }
}

// ---------------------------------------------------------------------------
// Process hardening
// ---------------------------------------------------------------------------

/// Stop the process from writing core files. Does nothing off Unix.
///
/// # Errors
///
/// `CryptoError::SecureMemory` if `setrlimit(RLIMIT_CORE)` is refused.
pub fn disable_core_dumps() -> Result<(), CryptoError> {
    pages::no_core_dumps()
}

#[cfg(unix)]
mod pages {
    use crate::error::CryptoError;

    pub(super) fn pin(bytes: &[u8]) -> bool {
        if bytes.is_empty() {
            return false;
        }
        // SAFETY: the range is a live allocation owned by the caller.
        unsafe { libc::mlock(bytes.as_ptr().cast(), bytes.len()) == 0 }
    }

    pub(super) fn unpin(bytes: &[u8]) {
        // SAFETY: same range that was passed to `pin`.
        unsafe {
            libc::munlock(bytes.as_ptr().cast(), bytes.len());
        }
    }

    pub(super) fn no_core_dumps() -> Result<(), CryptoError> {
        let zero = libc::rlimit {
            rlim_cur: 0,
            rlim_max: 0,
        };
        // SAFETY: `zero` outlives the call.
        if unsafe { libc::setrlimit(libc::RLIMIT_CORE, &zero) } == 0 {
            Ok(())
        } else {
            Err(CryptoError::SecureMemory(format!(
                "setrlimit(RLIMIT_CORE): {}",
                std::io::Error::last_os_error()
            )))
        }
    }
}

#[cfg(not(unix))]
mod pages {
    use crate::error::CryptoError;

    pub(super) const fn pin(_bytes: &[u8]) -> bool {
        false
    }

    pub(super) const fn unpin(_bytes: &[u8]) {}

    pub(super) const fn no_core_dumps() -> Result<(), CryptoError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_reports_length_and_content() {
        let key = b"4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
        let buf = SecretBuffer::new(key);
        assert_eq!(buf.expose(), key);
        assert_eq!(buf.len(), 64);
        assert!(!buf.is_empty());
        assert!(SecretBuffer::from_vec(Vec::new()).is_empty());
    }

    #[test]
    fn debug_output_never_contains_bytes() {
        let buf = SecretBuffer::from_vec(b"hunter2".to_vec());
        assert_eq!(format!("{buf:?}"), "SecretBuffer([REDACTED 7 bytes])");

        let key = SecretBytes::<32>::new([0xAB; 32]);
        let shown = format!("{key:?}");
        assert_eq!(shown, "SecretBytes<32>([REDACTED])");
    }

    #[test]
    fn from_slice_requires_exact_length() {
        assert_eq!(SecretBytes::<32>::from_slice(&[9; 32]).unwrap().expose(), &[9; 32]);
        for len in [0usize, 31, 33] {
            assert!(matches!(
                SecretBytes::<32>::from_slice(&vec![0; len]),
                Err(CryptoError::InvalidKeyLength(n)) if n == len
            ));
        }
    }

    #[test]
    fn random_keys_differ() {
        let a = SecretBytes::<32>::random().unwrap();
        let b = SecretBytes::<32>::random().unwrap();
        assert_ne!(a.expose(), b.expose());
    }

    #[cfg(unix)]
    #[test]
    fn core_limit_is_zero_after_disabling() {
        disable_core_dumps().unwrap();
        let mut limit = libc::rlimit {
            rlim_cur: 1,
            rlim_max: 1,
        };
        // SAFETY: `limit` is a valid out-pointer.
        assert_eq!(unsafe { libc::getrlimit(libc::RLIMIT_CORE, &mut limit) }, 0);
        assert_eq!(limit.rlim_cur, 0);
    }
}
