//! # `did:nil` Identifiers
//!
//! The method-specific identifier is the lowercase hex of the 33-byte
//! compressed secp256k1 public key:
//!
//! ```text
//! did:nil:<66 lowercase hex chars>
//! ```
//!
//! Example: `did:nil:03ecd47816bb8f475734b77aa9a3f4cc19a6075f3f603de0eebe6e11a784bb2e2d`
//!
//! Unlike address-based methods, the DID embeds the full key, so the
//! uncompressed key can be recovered from the string alone.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use super::keypair::decompress;
use crate::config::{COMPRESSED_PUBLIC_KEY_LENGTH, DID_LENGTH, DID_PREFIX, UNCOMPRESSED_PUBLIC_KEY_LENGTH};
use crate::error::{DerivationError, Result};

/// A parsed `did:nil` identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NilDid {
    public_key: [u8; COMPRESSED_PUBLIC_KEY_LENGTH],
}

impl NilDid {
    /// Build the DID for a compressed public key.
    ///
    /// No curve check: the key is assumed to come out of
    /// [`NilKeypair`](super::keypair::NilKeypair).
    pub fn from_compressed(public_key: &[u8; COMPRESSED_PUBLIC_KEY_LENGTH]) -> Self {
        Self {
            public_key: *public_key,
        }
    }

    /// Parse and validate a DID string.
    ///
    /// Checks the prefix, the total length, that the identifier is lowercase
    /// hex, and that it decodes to a point on secp256k1.
    ///
    /// # Errors
    ///
    /// [`DerivationError::EncodingError`] describing the first failed check.
    pub fn parse(did: &str) -> Result<Self> {
        let Some(identifier) = did.strip_prefix(DID_PREFIX) else {
            return Err(DerivationError::EncodingError(format!(
                "DID must start with '{DID_PREFIX}'"
            )));
        };

        if did.len() != DID_LENGTH {
            return Err(DerivationError::EncodingError(format!(
                "DID must be {DID_LENGTH} characters, got {}",
                did.len()
            )));
        }

        if !identifier
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        {
            return Err(DerivationError::EncodingError(
                "DID identifier must be lowercase hex".into(),
            ));
        }

        let mut public_key = [0u8; COMPRESSED_PUBLIC_KEY_LENGTH];
        hex::decode_to_slice(identifier, &mut public_key)?;

        // Rejects bad prefixes and x-coordinates with no point behind them.
        decompress(&public_key)?;

        Ok(Self { public_key })
    }

    /// The compressed public key embedded in the DID.
    pub fn public_key_compressed(&self) -> &[u8; COMPRESSED_PUBLIC_KEY_LENGTH] {
        &self.public_key
    }

    /// The uncompressed `x || y` public key.
    pub fn public_key_uncompressed(&self) -> Result<[u8; UNCOMPRESSED_PUBLIC_KEY_LENGTH]> {
        decompress(&self.public_key)
    }

    /// The full DID string.
    pub fn to_did_string(&self) -> String {
        format!("{DID_PREFIX}{}", hex::encode(self.public_key))
    }
}

impl fmt::Display for NilDid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_did_string())
    }
}

impl fmt::Debug for NilDid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NilDid({})", self.to_did_string())
    }
}

impl FromStr for NilDid {
    type Err = DerivationError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for NilDid {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_did_string())
    }
}

impl<'de> Deserialize<'de> for NilDid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Validate a DID string without keeping the parsed result.
pub fn validate(did: &str) -> bool {
    NilDid::parse(did).is_ok()
}
