//! Token payload: identity claims, audiences and validity window.

use pwt_map::ConcurrentMap;
use pwt_signing::random_bytes;

use crate::error::Result;
use crate::time::Timestamp;
use crate::wire::{self, ExtensionBlob, InstanceFrame, PayloadMessage};

/// Bytes of entropy behind a freshly generated nonce.
const NONCE_LEN: usize = 16;

fn generate_nonce() -> Result<String> {
    let bytes = random_bytes(NONCE_LEN)?;
    Ok(hex::encode(bytes.as_slice()))
}

/// Intended recipients of a token.
///
/// A single audience stays a scalar on the wire; pushing a second value
/// promotes the claim to a list and it never demotes back.
///
/// An empty scalar is indistinguishable from an absent claim on the wire:
/// `One("")` encodes like `None` and decodes back as `None`. Empty strings
/// survive only inside a `Many` list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Audience {
    /// No audience set.
    None,
    /// Exactly one recipient.
    One(String),
    /// Two or more recipients, in insertion order.
    Many(Vec<String>),
}

impl Audience {
    /// Append a recipient, promoting scalar to list when needed.
    pub fn push(&mut self, aud: impl Into<String>) {
        let aud = aud.into();
        match self {
            Self::None => *self = Self::One(aud),
            Self::One(first) => {
                *self = Self::Many(vec![std::mem::take(first), aud]);
            }
            Self::Many(list) => list.push(aud),
        }
    }

    /// The first recipient, if any.
    #[must_use]
    pub fn first(&self) -> Option<&str> {
        match self {
            Self::None => None,
            Self::One(aud) => Some(aud),
            Self::Many(list) => list.first().map(String::as_str),
        }
    }

    /// All recipients in insertion order.
    #[must_use]
    pub fn all(&self) -> Vec<String> {
        match self {
            Self::None => Vec::new(),
            Self::One(aud) => vec![aud.clone()],
            Self::Many(list) => list.clone(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::None)
    }
}

impl Default for Audience {
    fn default() -> Self {
        Self::None
    }
}

/// Payload claim set.
///
/// Construction always generates a fresh nonce, so there is no `Default`
/// impl; cloning regenerates the nonce as well.
#[derive(Debug, PartialEq)]
pub struct TokenPayload {
    /// Issuer.
    pub iss: String,
    /// Subject.
    pub sub: String,
    /// Audience claim.
    pub aud: Audience,
    /// Unique per-token nonce, hex encoded.
    pub nonce: String,
    /// Expiration time.
    pub exp: Option<Timestamp>,
    /// Not-before time.
    pub nbf: Option<Timestamp>,
    /// Issued-at time.
    pub iat: Option<Timestamp>,
    /// Free-form string claims.
    pub custom_fields: ConcurrentMap<String, String>,
    /// Optional opaque extension.
    pub extension: Option<ExtensionBlob>,
}

impl TokenPayload {
    /// Empty payload with a fresh nonce.
    ///
    /// # Errors
    ///
    /// Returns a signing error when the system RNG fails.
    pub fn new() -> Result<Self> {
        Ok(Self {
            iss: String::new(),
            sub: String::new(),
            aud: Audience::None,
            nonce: generate_nonce()?,
            exp: None,
            nbf: None,
            iat: None,
            custom_fields: ConcurrentMap::new(),
            extension: None,
        })
    }

    /// Build a payload from claims and second offsets relative to now.
    ///
    /// `exp_secs`, `nbf_secs` and `iat_secs` are offsets from the current
    /// time. When the offsets are inconsistent (expiry before issue, or
    /// not-before after expiry) all three timestamps are cleared rather
    /// than producing a token that can never validate.
    ///
    /// # Errors
    ///
    /// Returns a signing error when the system RNG fails.
    pub fn with_claims(
        iss: impl Into<String>,
        sub: impl Into<String>,
        aud: Audience,
        exp_secs: u64,
        nbf_secs: u64,
        iat_secs: u64,
        extension: Option<ExtensionBlob>,
    ) -> Result<Self> {
        let sane = exp_secs >= iat_secs && nbf_secs <= exp_secs;
        let (exp, nbf, iat) = if sane {
            (
                Some(Timestamp::from_now(exp_secs)),
                Some(Timestamp::from_now(nbf_secs)),
                Some(Timestamp::from_now(iat_secs)),
            )
        } else {
            tracing::warn!(exp_secs, nbf_secs, iat_secs, "inconsistent validity offsets, clearing window");
            (None, None, None)
        };
        Ok(Self {
            iss: iss.into(),
            sub: sub.into(),
            aud,
            nonce: generate_nonce()?,
            exp,
            nbf,
            iat,
            custom_fields: ConcurrentMap::new(),
            extension,
        })
    }

    /// Whether the expiry claim is present and strictly in the past.
    ///
    /// A payload with no `exp` claim never expires.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.exp.is_some_and(|exp| exp < Timestamp::now())
    }

    /// Whether the not-before claim allows use at the current time.
    ///
    /// A payload with no `nbf` claim is always usable.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.nbf.map_or(true, |nbf| nbf <= Timestamp::now())
    }

    /// Serialize to the instance-frame wire form.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Serialization`](crate::TokenError::Serialization)
    /// when the serializer rejects a message.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let (aud, aud_list) = match &self.aud {
            Audience::None => (String::new(), Vec::new()),
            Audience::One(one) => (one.clone(), Vec::new()),
            Audience::Many(list) => (String::new(), list.clone()),
        };
        let head = wire::encode_message(&PayloadMessage {
            iss: self.iss.clone(),
            sub: self.sub.clone(),
            aud,
            aud_list,
            nonce: self.nonce.clone(),
            exp: self.exp,
            nbf: self.nbf,
            iat: self.iat,
            custom: wire::sorted_fields(self.custom_fields.snapshot()),
        })?;
        let custom = match &self.extension {
            Some(blob) => Some(wire::encode_message(blob)?),
            None => None,
        };
        wire::encode_message(&InstanceFrame { head, custom })
    }

    /// Parse an encoded payload, replacing every field in place.
    ///
    /// Returns `false` on empty or unparseable input and leaves the
    /// payload untouched in that case. Absent timestamp claims decode to
    /// `None`, never to epoch zero.
    pub fn decode(&mut self, msg: &[u8]) -> bool {
        if msg.is_empty() {
            return false;
        }
        let Some(frame) = wire::decode_message::<InstanceFrame>(msg) else {
            tracing::debug!("payload frame failed to parse");
            return false;
        };
        let Some(head) = wire::decode_message::<PayloadMessage>(&frame.head) else {
            tracing::debug!("payload claims failed to parse");
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

        self.iss = head.iss;
        self.sub = head.sub;
        self.aud = if !head.aud_list.is_empty() {
            Audience::Many(head.aud_list)
        } else if !head.aud.is_empty() {
            Audience::One(head.aud)
        } else {
            Audience::None
        };
        self.nonce = head.nonce;
        self.exp = head.exp;
        self.nbf = head.nbf;
        self.iat = head.iat;
        self.custom_fields
            .copy_from_map(head.custom.into_iter().map(|f| (f.key, f.value)).collect());
        self.extension = extension;
        true
    }
}

impl Clone for TokenPayload {
    /// Clones every claim except the nonce, which is regenerated so two
    /// live payloads never share one.
    fn clone(&self) -> Self {
        Self {
            iss: self.iss.clone(),
            sub: self.sub.clone(),
            aud: self.aud.clone(),
            nonce: generate_nonce().unwrap_or_default(),
            exp: self.exp,
            nbf: self.nbf,
            iat: self.iat,
            custom_fields: self.custom_fields.clone(),
            extension: self.extension.clone(),
        }
    }
}
