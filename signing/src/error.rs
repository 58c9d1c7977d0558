//! Signing error types

use thiserror::Error;

/// Signing operation result type
pub type Result<T> = std::result::Result<T, SigningError>;

/// Errors produced while generating material or signing data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SigningError {
    /// A random-material request asked for zero bytes.
    #[error("requested zero random bytes")]
    ZeroLengthRequest,
    /// `sign` was called with empty input data.
    #[error("data to sign is empty")]
    EmptyData,
    /// `sign` was called while the key material is empty.
    #[error("signing key is empty")]
    EmptyKey,
    /// The operating system RNG failed.
    #[error("random generator failure: {0}")]
    Rng(String),
    /// The cipher transform itself failed.
    #[error("signing transform failure: {0}")]
    Transform(String),
}
