//! Thread-safe associative container used across the PWT workspace.
//!
//! [`ConcurrentMap`] backs the claim containers' custom-field storage and
//! the instance pool's identity sets. The whole container is protected by
//! one reader/writer lock, which buys atomic multi-entry operations at the
//! cost of sharding — the working sets here are small, so the trade is
//! deliberate.

#![forbid(unsafe_code)]

mod concurrent_map;
mod error;

pub use concurrent_map::ConcurrentMap;
pub use error::{MapError, Result};
