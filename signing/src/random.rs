//! Secure random material generation.

use zeroize::Zeroizing;

use crate::error::{Result, SigningError};

/// Default key length in bytes.
pub const DEFAULT_KEY_LEN: usize = 64;
/// Default IV length in bytes. Matches the AES-GCM nonce size.
pub const DEFAULT_IV_LEN: usize = 12;
/// Default salt length in bytes.
pub const DEFAULT_SALT_LEN: usize = 64;

/// Fill a fresh buffer of `len` bytes from the operating system RNG.
///
/// The buffer zeroizes itself when dropped.
///
/// # Errors
///
/// Returns [`SigningError::ZeroLengthRequest`] when `len` is zero and
/// [`SigningError::Rng`] when the OS RNG fails.
pub fn random_bytes(len: usize) -> Result<Zeroizing<Vec<u8>>> {
    if len == 0 {
        return Err(SigningError::ZeroLengthRequest);
    }
    let mut bytes = Zeroizing::new(vec![0u8; len]);
    getrandom::fill(bytes.as_mut_slice()).map_err(|e| SigningError::Rng(e.to_string()))?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_length_is_rejected() {
        assert_eq!(random_bytes(0), Err(SigningError::ZeroLengthRequest));
    }

    #[test]
    fn requested_length_is_honored() {
        for len in [1, DEFAULT_IV_LEN, DEFAULT_KEY_LEN] {
            let bytes = random_bytes(len);
            assert!(matches!(&bytes, Ok(b) if b.len() == len));
        }
    }

    #[test]
    fn consecutive_draws_differ() {
        let a = random_bytes(DEFAULT_KEY_LEN);
        let b = random_bytes(DEFAULT_KEY_LEN);
        assert!(matches!((&a, &b), (Ok(x), Ok(y)) if x != y));
    }
}
