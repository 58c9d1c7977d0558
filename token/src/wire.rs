//! Binary wire messages: the three nested envelope levels.
//!
//! Level 1 is the token itself (header bytes, payload bytes, signature).
//! Level 2 is the per-part instance frame (schema-fixed head plus optional
//! opaque extension). Level 3 holds the actual claim fields. The codec
//! serializes each level independently so the extension blob passes through
//! untouched and unread.

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TokenError};
use crate::time::Timestamp;

/// Opaque typed extension payload.
///
/// The codec transports the tag and bytes verbatim and never interprets
/// them; application-specific extension happens here rather than through
/// subtyping of the claim containers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub struct ExtensionBlob {
    /// Free-form type tag identifying the encoding of `bytes`.
    pub tag: String,
    /// The opaque payload.
    pub bytes: Vec<u8>,
}

impl ExtensionBlob {
    /// Build a blob from a tag and payload.
    pub fn new(tag: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { tag: tag.into(), bytes }
    }
}

/// Level 1: the complete signed token.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub(crate) struct TokenMessage {
    pub header: Vec<u8>,
    pub payload: Vec<u8>,
    pub signature: Vec<u8>,
}

/// Level 2: one encoded claim container plus its optional extension.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub(crate) struct InstanceFrame {
    pub head: Vec<u8>,
    pub custom: Option<Vec<u8>>,
}

/// One custom claim entry.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub(crate) struct FieldEntry {
    pub key: String,
    pub value: String,
}

/// Level 3: header claims.
#[derive(Debug, Clone, Default, PartialEq, Eq, Encode, Decode)]
pub(crate) struct HeaderMessage {
    pub typ: String,
    pub kid: String,
    pub pwk: String,
    pub x5u: String,
    pub custom: Vec<FieldEntry>,
}

/// Level 3: payload claims.
///
/// The audience travels as either the scalar `aud` or the repeated
/// `aud_list`; a non-empty list wins on decode, otherwise the scalar is
/// taken even when empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Encode, Decode)]
pub(crate) struct PayloadMessage {
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub aud_list: Vec<String>,
    pub nonce: String,
    pub exp: Option<Timestamp>,
    pub nbf: Option<Timestamp>,
    pub iat: Option<Timestamp>,
    pub custom: Vec<FieldEntry>,
}

/// Serialize a wire message.
///
/// # Errors
///
/// Any serializer rejection maps to [`TokenError::Serialization`].
pub(crate) fn encode_message<T: Encode>(msg: &T) -> Result<Vec<u8>> {
    bincode::encode_to_vec(msg, bincode::config::standard())
        .map_err(|e| TokenError::Serialization(e.to_string()))
}

/// Parse a wire message; `None` on any malformed input.
pub(crate) fn decode_message<T: Decode<()>>(bytes: &[u8]) -> Option<T> {
    bincode::decode_from_slice(bytes, bincode::config::standard())
        .ok()
        .map(|(msg, _)| msg)
}

/// Sorted custom-field entries from a snapshot, so an unchanged claim set
/// always serializes to identical bytes regardless of map iteration order.
pub(crate) fn sorted_fields(snapshot: std::collections::HashMap<String, String>) -> Vec<FieldEntry> {
    let mut fields: Vec<FieldEntry> = snapshot
        .into_iter()
        .map(|(key, value)| FieldEntry { key, value })
        .collect();
    fields.sort_by(|a, b| a.key.cmp(&b.key));
    fields
}
