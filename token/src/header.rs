//! Token header: security metadata claims.

use std::collections::HashMap;

use pwt_map::ConcurrentMap;

use crate::error::Result;
use crate::wire::{self, ExtensionBlob, HeaderMessage, InstanceFrame};

/// Default token type tag.
pub const DEFAULT_TOKEN_TYPE: &str = "PWT";

/// Header claim set: token type, key hints and free-form string fields.
///
/// The custom-field map is safe for concurrent access on its own; the
/// header as a whole is protected by the owning instance's lock.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenHeader {
    /// Token type tag.
    pub typ: String,
    /// Key identifier.
    pub kid: String,
    /// Public-key hint.
    pub pwk: String,
    /// X.509 URL.
    pub x5u: String,
    /// Free-form string claims.
    pub custom_fields: ConcurrentMap<String, String>,
    /// Optional opaque extension.
    pub extension: Option<ExtensionBlob>,
}

impl Default for TokenHeader {
    fn default() -> Self {
        Self {
            typ: DEFAULT_TOKEN_TYPE.to_string(),
            kid: String::new(),
            pwk: String::new(),
            x5u: String::new(),
            custom_fields: ConcurrentMap::new(),
            extension: None,
        }
    }
}

impl TokenHeader {
    /// Build a header from explicit claims.
    pub fn new(
        typ: impl Into<String>,
        kid: impl Into<String>,
        pwk: impl Into<String>,
        x5u: impl Into<String>,
        custom_fields: HashMap<String, String>,
        extension: Option<ExtensionBlob>,
    ) -> Self {
        let fields = ConcurrentMap::new();
        fields.copy_from_map(custom_fields);
        Self {
            typ: typ.into(),
            kid: kid.into(),
            pwk: pwk.into(),
            x5u: x5u.into(),
            custom_fields: fields,
            extension,
        }
    }

    /// Serialize to the instance-frame wire form.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Serialization`](crate::TokenError::Serialization)
    /// when the serializer rejects a message.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let head = wire::encode_message(&HeaderMessage {
            typ: self.typ.clone(),
            kid: self.kid.clone(),
            pwk: self.pwk.clone(),
            x5u: self.x5u.clone(),
            custom: wire::sorted_fields(self.custom_fields.snapshot()),
        })?;
        let custom = match &self.extension {
            Some(blob) => Some(wire::encode_message(blob)?),
            None => None,
        };
        wire::encode_message(&InstanceFrame { head, custom })
    }

    /// Parse an encoded header, replacing every field in place.
    ///
    /// Returns `false` on empty or unparseable input and leaves the header
    /// untouched in that case. On success the custom-field map is replaced
    /// wholesale, not merged.
    pub fn decode(&mut self, msg: &[u8]) -> bool {
        if msg.is_empty() {
            return false;
        }
        let Some(frame) = wire::decode_message::<InstanceFrame>(msg) else {
            tracing::debug!("header frame failed to parse");
            return false;
        };
        let Some(head) = wire::decode_message::<HeaderMessage>(&frame.head) else {
            tracing::debug!("header claims failed to parse");
            return false;
        };
        let extension = match frame.custom {
            None => None,
            Some(bytes) if bytes.is_empty() => None,
            Some(bytes) => match wire::decode_message::<ExtensionBlob>(&bytes) {
                Some(blob) => Some(blob),
                None => return false,
            },
        };

        self.typ = head.typ;
        self.kid = head.kid;
        self.pwk = head.pwk;
        self.x5u = head.x5u;
        self.custom_fields
            .copy_from_map(head.custom.into_iter().map(|f| (f.key, f.value)).collect());
        self.extension = extension;
        true
    }
}
