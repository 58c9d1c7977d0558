//! Token and pool error types

use pwt_signing::SigningError;
use thiserror::Error;

/// Token operation result type
pub type Result<T> = std::result::Result<T, TokenError>;

/// Hard failures from token construction and encoding.
///
/// Decode and validity checks are deliberately *not* here: malformed or
/// wrongly-signed input is expected traffic and reported as `false`, never
/// as an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// Encode was called while no header is configured.
    #[error("header is not configured")]
    MissingHeader,
    /// Encode was called while no payload is configured.
    #[error("payload is not configured")]
    MissingPayload,
    /// Encode was called while no signing algorithm is configured.
    #[error("signing algorithm is not configured")]
    MissingAlgorithm,
    /// The binary serializer rejected a message.
    #[error("serialization failure: {0}")]
    Serialization(String),
    /// Signing or random-material generation failed.
    #[error(transparent)]
    Signing(#[from] SigningError),
}

/// Failures of the bounded waits on [`TokenInstancePool::get_timeout`]
/// and [`TokenInstancePool::get_cancellable`].
///
/// [`TokenInstancePool::get_timeout`]: crate::TokenInstancePool::get_timeout
/// [`TokenInstancePool::get_cancellable`]: crate::TokenInstancePool::get_cancellable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PoolError {
    /// The deadline passed with the pool still saturated.
    #[error("timed out waiting for a pool instance")]
    Timeout,
    /// The wait was cancelled through its cancel token.
    #[error("wait for a pool instance was cancelled")]
    Cancelled,
}
