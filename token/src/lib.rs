//! Binary signed tokens with a bounded instance pool.
//!
//! A token is a header and a payload, each an independent claim container,
//! bound together by a symmetric signature over their serialized forms.
//! [`TokenInstance`] owns the three parts and the codec;
//! [`TokenInstancePool`] recycles configured instances across threads so
//! key material is provisioned once and reused.
//!
//! ```no_run
//! use pwt_token::{Audience, TokenInstance};
//!
//! # fn main() -> Result<(), pwt_token::TokenError> {
//! let token = TokenInstance::new()?;
//! token
//!     .set_issuer("auth.example")
//!     .set_subject("user-42")
//!     .add_audience("billing")
//!     .set_expiration(3600);
//! let wire = token.encode()?;
//! assert!(token.is_token_valid(&wire));
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

mod error;
mod header;
mod instance;
mod payload;
mod pool;
mod time;
mod wire;

pub use error::{PoolError, Result, TokenError};
pub use header::{TokenHeader, DEFAULT_TOKEN_TYPE};
pub use instance::TokenInstance;
pub use payload::{Audience, TokenPayload};
pub use pool::{CancelToken, TokenInstancePool};
pub use time::Timestamp;
pub use wire::ExtensionBlob;
