//! A complete signable token: header, payload and signing algorithm.

use std::collections::HashMap;

use parking_lot::RwLock;
use pwt_signing::SigningAlgorithm;
use subtle::ConstantTimeEq;

use crate::error::{Result, TokenError};
use crate::header::TokenHeader;
use crate::payload::{Audience, TokenPayload};
use crate::time::Timestamp;
use crate::wire::{self, ExtensionBlob, TokenMessage};

/// Longest accepted token-type tag; setters silently drop longer values.
const MAX_TOKEN_TYPE_LEN: usize = 255;

/// One token: its claims, its algorithm and its wire codec.
///
/// Each part sits behind its own reader/writer lock and may independently
/// be absent. An absent part makes the related setters and getters no-ops
/// and makes `encode` fail; `decode` populates parts that are present.
#[derive(Debug)]
pub struct TokenInstance {
    header: RwLock<Option<TokenHeader>>,
    payload: RwLock<Option<TokenPayload>>,
    algorithm: RwLock<Option<SigningAlgorithm>>,
}

impl TokenInstance {
    /// Fully configured instance with default claims and fresh key material.
    ///
    /// # Errors
    ///
    /// Fails when the system RNG cannot produce key material or a nonce.
    pub fn new() -> Result<Self> {
        Ok(Self {
            header: RwLock::new(Some(TokenHeader::default())),
            payload: RwLock::new(Some(TokenPayload::new()?)),
            algorithm: RwLock::new(Some(SigningAlgorithm::generate()?)),
        })
    }

    /// Assemble an instance from pre-built parts.
    #[must_use]
    pub fn from_parts(
        header: Option<TokenHeader>,
        payload: Option<TokenPayload>,
        algorithm: Option<SigningAlgorithm>,
    ) -> Self {
        Self {
            header: RwLock::new(header),
            payload: RwLock::new(payload),
            algorithm: RwLock::new(algorithm),
        }
    }

    /// Instance with all three parts absent.
    #[must_use]
    pub fn unconfigured() -> Self {
        Self::from_parts(None, None, None)
    }

    // ---- header setters -------------------------------------------------

    /// Set the token type tag. Values longer than 255 characters are
    /// ignored.
    pub fn set_token_type(&self, typ: impl Into<String>) -> &Self {
        let typ = typ.into();
        if typ.len() > MAX_TOKEN_TYPE_LEN {
            tracing::debug!(len = typ.len(), "token type over limit, ignored");
            return self;
        }
        if let Some(header) = self.header.write().as_mut() {
            header.typ = typ;
        }
        self
    }

    pub fn set_key_id(&self, kid: impl Into<String>) -> &Self {
        if let Some(header) = self.header.write().as_mut() {
            header.kid = kid.into();
        }
        self
    }

    pub fn set_public_key_hint(&self, pwk: impl Into<String>) -> &Self {
        if let Some(header) = self.header.write().as_mut() {
            header.pwk = pwk.into();
        }
        self
    }

    pub fn set_x509_url(&self, x5u: impl Into<String>) -> &Self {
        if let Some(header) = self.header.write().as_mut() {
            header.x5u = x5u.into();
        }
        self
    }

    pub fn add_header_field(&self, key: impl Into<String>, value: impl Into<String>) -> &Self {
        if let Some(header) = self.header.read().as_ref() {
            header.custom_fields.store(key.into(), value.into());
        }
        self
    }

    /// Replace the header custom-field map wholesale.
    pub fn set_header_fields(&self, fields: HashMap<String, String>) -> &Self {
        if let Some(header) = self.header.read().as_ref() {
            header.custom_fields.copy_from_map(fields);
        }
        self
    }

    pub fn set_header_extension(&self, extension: Option<ExtensionBlob>) -> &Self {
        if let Some(header) = self.header.write().as_mut() {
            header.extension = extension;
        }
        self
    }

    // ---- payload setters ------------------------------------------------

    pub fn set_issuer(&self, iss: impl Into<String>) -> &Self {
        if let Some(payload) = self.payload.write().as_mut() {
            payload.iss = iss.into();
        }
        self
    }

    pub fn set_subject(&self, sub: impl Into<String>) -> &Self {
        if let Some(payload) = self.payload.write().as_mut() {
            payload.sub = sub.into();
        }
        self
    }

    /// Replace the audience claim entirely.
    pub fn set_audience(&self, aud: Audience) -> &Self {
        if let Some(payload) = self.payload.write().as_mut() {
            payload.aud = aud;
        }
        self
    }

    /// Append one audience, promoting a scalar claim to a list.
    pub fn add_audience(&self, aud: impl Into<String>) -> &Self {
        if let Some(payload) = self.payload.write().as_mut() {
            payload.aud.push(aud);
        }
        self
    }

    /// Append several audiences in order.
    pub fn add_audiences<I, S>(&self, auds: I) -> &Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let Some(payload) = self.payload.write().as_mut() {
            for aud in auds {
                payload.aud.push(aud);
            }
        }
        self
    }

    /// Set the expiry to `offset_secs` seconds from now.
    pub fn set_expiration(&self, offset_secs: u64) -> &Self {
        if let Some(payload) = self.payload.write().as_mut() {
            payload.exp = Some(Timestamp::from_now(offset_secs));
        }
        self
    }

    /// Set the not-before time to `offset_secs` seconds from now.
    pub fn set_not_before(&self, offset_secs: u64) -> &Self {
        if let Some(payload) = self.payload.write().as_mut() {
            payload.nbf = Some(Timestamp::from_now(offset_secs));
        }
        self
    }

    /// Set the issued-at time to `offset_secs` seconds from now.
    pub fn set_issued_at(&self, offset_secs: u64) -> &Self {
        if let Some(payload) = self.payload.write().as_mut() {
            payload.iat = Some(Timestamp::from_now(offset_secs));
        }
        self
    }

    pub fn add_payload_field(&self, key: impl Into<String>, value: impl Into<String>) -> &Self {
        if let Some(payload) = self.payload.read().as_ref() {
            payload.custom_fields.store(key.into(), value.into());
        }
        self
    }

    /// Replace the payload custom-field map wholesale.
    pub fn set_payload_fields(&self, fields: HashMap<String, String>) -> &Self {
        if let Some(payload) = self.payload.read().as_ref() {
            payload.custom_fields.copy_from_map(fields);
        }
        self
    }

    pub fn set_payload_extension(&self, extension: Option<ExtensionBlob>) -> &Self {
        if let Some(payload) = self.payload.write().as_mut() {
            payload.extension = extension;
        }
        self
    }

    // ---- getters --------------------------------------------------------

    #[must_use]
    pub fn token_type(&self) -> Option<String> {
        self.header.read().as_ref().map(|h| h.typ.clone())
    }

    #[must_use]
    pub fn key_id(&self) -> Option<String> {
        self.header.read().as_ref().map(|h| h.kid.clone())
    }

    #[must_use]
    pub fn public_key_hint(&self) -> Option<String> {
        self.header.read().as_ref().map(|h| h.pwk.clone())
    }

    #[must_use]
    pub fn x509_url(&self) -> Option<String> {
        self.header.read().as_ref().map(|h| h.x5u.clone())
    }

    #[must_use]
    pub fn header_fields(&self) -> HashMap<String, String> {
        self.header
            .read()
            .as_ref()
            .map(|h| h.custom_fields.snapshot())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn header_field(&self, key: &str) -> Option<String> {
        self.header
            .read()
            .as_ref()
            .and_then(|h| h.custom_fields.at(&key.to_string()).ok())
    }

    #[must_use]
    pub fn header_extension(&self) -> Option<ExtensionBlob> {
        self.header.read().as_ref().and_then(|h| h.extension.clone())
    }

    #[must_use]
    pub fn issuer(&self) -> Option<String> {
        self.payload.read().as_ref().map(|p| p.iss.clone())
    }

    #[must_use]
    pub fn subject(&self) -> Option<String> {
        self.payload.read().as_ref().map(|p| p.sub.clone())
    }

    /// The first audience, if any.
    #[must_use]
    pub fn audience(&self) -> Option<String> {
        self.payload
            .read()
            .as_ref()
            .and_then(|p| p.aud.first().map(str::to_string))
    }

    /// Every audience in insertion order.
    #[must_use]
    pub fn audiences(&self) -> Vec<String> {
        self.payload
            .read()
            .as_ref()
            .map(|p| p.aud.all())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn nonce(&self) -> Option<String> {
        self.payload.read().as_ref().map(|p| p.nonce.clone())
    }

    #[must_use]
    pub fn expiration(&self) -> Option<Timestamp> {
        self.payload.read().as_ref().and_then(|p| p.exp)
    }

    #[must_use]
    pub fn not_before(&self) -> Option<Timestamp> {
        self.payload.read().as_ref().and_then(|p| p.nbf)
    }

    #[must_use]
    pub fn issued_at(&self) -> Option<Timestamp> {
        self.payload.read().as_ref().and_then(|p| p.iat)
    }

    #[must_use]
    pub fn expiration_string(&self) -> Option<String> {
        self.expiration().map(|at| at.to_string())
    }

    #[must_use]
    pub fn not_before_string(&self) -> Option<String> {
        self.not_before().map(|at| at.to_string())
    }

    #[must_use]
    pub fn issued_at_string(&self) -> Option<String> {
        self.issued_at().map(|at| at.to_string())
    }

    #[must_use]
    pub fn payload_fields(&self) -> HashMap<String, String> {
        self.payload
            .read()
            .as_ref()
            .map(|p| p.custom_fields.snapshot())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn payload_field(&self, key: &str) -> Option<String> {
        self.payload
            .read()
            .as_ref()
            .and_then(|p| p.custom_fields.at(&key.to_string()).ok())
    }

    #[must_use]
    pub fn payload_extension(&self) -> Option<ExtensionBlob> {
        self.payload.read().as_ref().and_then(|p| p.extension.clone())
    }

    /// Whether the payload's expiry lies strictly in the past.
    ///
    /// An unconfigured payload counts as expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.payload
            .read()
            .as_ref()
            .map_or(true, TokenPayload::is_expired)
    }

    // ---- codec ----------------------------------------------------------

    /// Encode and sign the token.
    ///
    /// The signed preimage is the encoded header prefixed by its length as
    /// a little-endian `u64`, followed by the encoded payload, so the
    /// boundary between the two parts is fixed by the signature.
    ///
    /// # Errors
    ///
    /// `MissingHeader`, `MissingPayload` or `MissingAlgorithm` when a part
    /// is unconfigured; `Serialization` or `Signing` on codec and crypto
    /// failures.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let header_bytes = self
            .header
            .read()
            .as_ref()
            .ok_or(TokenError::MissingHeader)?
            .encode()?;
        let payload_bytes = self
            .payload
            .read()
            .as_ref()
            .ok_or(TokenError::MissingPayload)?
            .encode()?;
        let signature = {
            let guard = self.algorithm.read();
            let algorithm = guard.as_ref().ok_or(TokenError::MissingAlgorithm)?;
            algorithm.sign(&signing_input(&header_bytes, &payload_bytes))?
        };
        wire::encode_message(&TokenMessage {
            header: header_bytes,
            payload: payload_bytes,
            signature,
        })
    }

    /// Verify a token and populate this instance's claims from it.
    ///
    /// Returns `false` without modifying anything when the outer message
    /// does not parse, the signature does not verify under the configured
    /// algorithm, or either claim part fails to parse.
    pub fn decode(&self, msg: &[u8]) -> bool {
        let Some(token) = self.verified_message(msg) else {
            return false;
        };
        let mut header = TokenHeader::default();
        if !header.decode(&token.header) {
            return false;
        }
        let Ok(mut payload) = TokenPayload::new() else {
            return false;
        };
        if !payload.decode(&token.payload) {
            return false;
        }
        *self.header.write() = Some(header);
        *self.payload.write() = Some(payload);
        true
    }

    /// Verify a token's signature without touching this instance's claims.
    #[must_use]
    pub fn is_token_valid(&self, msg: &[u8]) -> bool {
        self.verified_message(msg).is_some()
    }

    fn verified_message(&self, msg: &[u8]) -> Option<TokenMessage> {
        if msg.is_empty() {
            return None;
        }
        let token = match wire::decode_message::<TokenMessage>(msg) {
            Some(token) => token,
            None => {
                tracing::debug!("token envelope failed to parse");
                return None;
            }
        };
        let expected = {
            let guard = self.algorithm.read();
            let algorithm = guard.as_ref()?;
            algorithm
                .sign(&signing_input(&token.header, &token.payload))
                .ok()?
        };
        if expected.ct_eq(&token.signature).into() {
            Some(token)
        } else {
            tracing::debug!("token signature mismatch");
            None
        }
    }

    /// Replace this instance's algorithm with a clone of `other`'s.
    ///
    /// Clones out under the source's read lock before taking the
    /// destination's write lock, so two instances copying from each other
    /// cannot deadlock. A self-copy is a no-op.
    pub fn copy_algorithm(&self, other: &Self) {
        if std::ptr::eq(self, other) {
            return;
        }
        let copied = other.algorithm.read().clone();
        *self.algorithm.write() = copied;
    }

    /// Whether an algorithm is configured.
    #[must_use]
    pub fn has_algorithm(&self) -> bool {
        self.algorithm.read().is_some()
    }

    /// Replace the signing algorithm.
    pub fn set_algorithm(&self, algorithm: Option<SigningAlgorithm>) -> &Self {
        *self.algorithm.write() = algorithm;
        self
    }
}

impl Clone for TokenInstance {
    /// Deep copy of all three parts; the payload clone regenerates its
    /// nonce.
    fn clone(&self) -> Self {
        Self {
            header: RwLock::new(self.header.read().clone()),
            payload: RwLock::new(self.payload.read().clone()),
            algorithm: RwLock::new(self.algorithm.read().clone()),
        }
    }
}

fn signing_input(header: &[u8], payload: &[u8]) -> Vec<u8> {
    let mut input = Vec::with_capacity(8 + header.len() + payload.len());
    input.extend_from_slice(&(header.len() as u64).to_le_bytes());
    input.extend_from_slice(header);
    input.extend_from_slice(payload);
    input
}
