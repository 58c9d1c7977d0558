//! Symmetric signing material and transform for PWT tokens.
//!
//! A [`SigningAlgorithm`] owns key/IV/salt byte material and signs data with
//! a deterministic AES-256-GCM transform. Token verification recomputes the
//! signature over the same bytes and compares, so determinism for fixed
//! material is part of the contract here, not an accident.
//!
//! Any fixed-key symmetric primitive with a deterministic
//! `sign(bytes) -> bytes` shape can stand behind the same surface.

#![forbid(unsafe_code)]

mod algorithm;
mod error;
mod random;

pub use algorithm::SigningAlgorithm;
pub use error::{Result, SigningError};
pub use random::{DEFAULT_IV_LEN, DEFAULT_KEY_LEN, DEFAULT_SALT_LEN, random_bytes};
