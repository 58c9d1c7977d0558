//! Umbrella crate re-exporting the token workspace.
//!
//! Pick pieces through features, or take `full` (the default) for the
//! whole stack:
//!
//! - [`map`] — the thread-safe associative container.
//! - [`signing`] — symmetric signing material and the signing transform.
//! - [`token`] — the token model, its binary codec, and the bounded
//!   instance pool.

#![forbid(unsafe_code)]

#[cfg(feature = "map")]
pub use pwt_map as map;

#[cfg(feature = "signing")]
pub use pwt_signing as signing;

#[cfg(feature = "token")]
pub use pwt_token as token;

#[cfg(feature = "token")]
pub use pwt_token::{
    Audience, CancelToken, ExtensionBlob, TokenHeader, TokenInstance, TokenInstancePool,
    TokenPayload,
};
