//! # Session-Key Authorization Message
//!
//! The small record a wallet signs to authorize a derived key. Its canonical
//! byte form is used twice: as the EIP-712 message payload (field by field)
//! and as HKDF context (the whole JSON string).
//!
//! ## Canonical form
//!
//! ```text
//! {"context":"<context>","keyId":"<key_id>"}
//! ```
//!
//! The key order is alphabetical and fixed: `context`, then `keyId`. No
//! whitespace. The encoder writes the pairs in that order by hand instead of
//! handing a map to a serializer, because a map's iteration order is not
//! part of any serializer's contract.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{DerivationError, Result};

/// An authorization record `{ key_id, context }`.
///
/// Both fields are non-empty; [`AuthMessage::new`] enforces it. The JSON
/// field names match the wallet (`keyId`, `context`) so stored records stay
/// interchangeable with what the browser side persists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuthMessage {
    #[serde(rename = "keyId")]
    key_id: String,
    context: String,
}

impl AuthMessage {
    /// Build a message, rejecting empty fields with
    /// [`DerivationError::InvalidInput`].
    pub fn new(key_id: impl Into<String>, context: impl Into<String>) -> Result<Self> {
        let key_id = key_id.into();
        let context = context.into();
        if key_id.is_empty() {
            return Err(DerivationError::InvalidInput("key_id must not be empty".into()));
        }
        if context.is_empty() {
            return Err(DerivationError::InvalidInput("context must not be empty".into()));
        }
        Ok(Self { key_id, context })
    }

    /// The `keyId` field.
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// The `context` field.
    pub fn context(&self) -> &str {
        &self.context
    }

    /// Re-check the non-empty invariant.
    ///
    /// Deserialization bypasses [`AuthMessage::new`], so anything loaded from
    /// storage goes through here before it is used.
    pub fn validate(&self) -> Result<()> {
        Self::new(self.key_id.as_str(), self.context.as_str()).map(|_| ())
    }

    /// Ordered `(name, value)` pairs, in canonical order.
    pub fn fields(&self) -> [(&'static str, &str); 2] {
        [("context", &self.context), ("keyId", &self.key_id)]
    }

    /// Canonical byte encoding, see the module docs.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        encode_pairs(&self.fields()).into_bytes()
    }
}

impl fmt::Display for AuthMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode_pairs(&self.fields()))
    }
}

/// Encode a message into its canonical bytes.
pub fn encode(message: &AuthMessage) -> Vec<u8> {
    message.canonical_bytes()
}

/// Serialize an ordered list of string pairs as a compact JSON object.
///
/// Values are escaped by `serde_json` so the output is byte-identical to a
/// JSON serializer on the other side; only the ordering is ours.
fn encode_pairs(pairs: &[(&str, &str)]) -> String {
    let mut out = String::from("{");
    for (i, (name, value)) in pairs.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&json_string(name));
        out.push(':');
        out.push_str(&json_string(value));
    }
    out.push('}');
    out
}

fn json_string(s: &str) -> String {
    // Serializing a &str to JSON cannot fail.
    serde_json::Value::String(s.to_owned()).to_string()
}
