//! Symmetric signing algorithm: key/IV/salt material plus the transform.

use aes_gcm::{
    Aes256Gcm,
    aead::{Aead, KeyInit, generic_array::GenericArray},
};
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::{Result, SigningError};
use crate::random::{DEFAULT_IV_LEN, DEFAULT_KEY_LEN, DEFAULT_SALT_LEN, random_bytes};

/// Stateful symmetric signing primitive.
///
/// Holds key, IV and salt material and exposes a deterministic
/// `sign(bytes) -> bytes` transform. Verification is recompute-and-compare,
/// so for a fixed key and IV the transform must map identical inputs to
/// identical outputs — which it does: the cipher runs AES-256-GCM under a
/// key and nonce derived from the stored material alone.
///
/// Each instance exclusively owns its material. Independent copies are
/// obtained through [`Clone`], which deep-copies every buffer; secret bytes
/// are never shared by reference and zeroize on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SigningAlgorithm {
    key: Vec<u8>,
    iv: Vec<u8>,
    salt: Vec<u8>,
}

impl SigningAlgorithm {
    /// Generate an algorithm with fresh random key (64 bytes), IV (12) and
    /// salt (64).
    ///
    /// # Errors
    ///
    /// Returns [`SigningError::Rng`] when the OS RNG fails.
    pub fn generate() -> Result<Self> {
        Ok(Self {
            key: random_bytes(DEFAULT_KEY_LEN)?.to_vec(),
            iv: random_bytes(DEFAULT_IV_LEN)?.to_vec(),
            salt: random_bytes(DEFAULT_SALT_LEN)?.to_vec(),
        })
    }

    /// Build an algorithm from explicit material.
    ///
    /// Any lengths are accepted, including empty; signing with an empty key
    /// is rejected at call time instead.
    #[must_use]
    pub fn from_parts(key: Vec<u8>, iv: Vec<u8>, salt: Vec<u8>) -> Self {
        Self { key, iv, salt }
    }

    /// Key material.
    #[must_use]
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// IV material.
    #[must_use]
    pub fn iv(&self) -> &[u8] {
        &self.iv
    }

    /// Salt material. Carried with the instance but not consumed by
    /// [`sign`](Self::sign).
    #[must_use]
    pub fn salt(&self) -> &[u8] {
        &self.salt
    }

    /// Replace the key material.
    pub fn set_key(&mut self, key: Vec<u8>) {
        self.key.zeroize();
        self.key = key;
    }

    /// Replace the IV material.
    pub fn set_iv(&mut self, iv: Vec<u8>) {
        self.iv.zeroize();
        self.iv = iv;
    }

    /// Replace the salt material.
    pub fn set_salt(&mut self, salt: Vec<u8>) {
        self.salt.zeroize();
        self.salt = salt;
    }

    /// Sign `data`, returning the transform output.
    ///
    /// The cipher key is `SHA-256(key material)` and the nonce is the first
    /// 12 bytes of `SHA-256(IV material)`, so material of any non-empty
    /// length is usable and the output is stable for fixed material.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError::EmptyData`] or [`SigningError::EmptyKey`]
    /// when the respective input is empty, and [`SigningError::Transform`]
    /// if the cipher rejects the input.
    pub fn sign(&self, data: &[u8]) -> Result<Vec<u8>> {
        if data.is_empty() {
            return Err(SigningError::EmptyData);
        }
        if self.key.is_empty() {
            return Err(SigningError::EmptyKey);
        }

        let key = Zeroizing::new(<[u8; 32]>::from(Sha256::digest(&self.key)));
        let cipher = Aes256Gcm::new(GenericArray::from_slice(key.as_slice()));

        let nonce_digest = Sha256::digest(&self.iv);
        let nonce = GenericArray::from_slice(&nonce_digest[..12]);

        cipher
            .encrypt(nonce, data)
            .map_err(|e| SigningError::Transform(e.to_string()))
    }
}

impl Clone for SigningAlgorithm {
    /// Deep copy of key, IV and salt into a new instance.
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            iv: self.iv.clone(),
            salt: self.salt.clone(),
        }
    }
}

impl PartialEq for SigningAlgorithm {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.iv == other.iv && self.salt == other.salt
    }
}

impl Eq for SigningAlgorithm {}

impl std::fmt::Debug for SigningAlgorithm {
    /// Material lengths only; never the bytes.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningAlgorithm")
            .field("key_len", &self.key.len())
            .field("iv_len", &self.iv.len())
            .field("salt_len", &self.salt.len())
            .finish()
    }
}
