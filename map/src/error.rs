//! Map error types

use thiserror::Error;

/// Map operation result type
pub type Result<T> = std::result::Result<T, MapError>;

/// Errors produced by [`ConcurrentMap`](crate::ConcurrentMap) operations.
///
/// Only keyed lookup can fail; every other operation is total.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapError {
    /// The requested key is not present in the map.
    #[error("key not found")]
    NotFound,
}
