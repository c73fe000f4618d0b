//! # Stored Keypair Records
//!
//! The hex/JSON form in which a derived keypair is persisted or handed to
//! another implementation for conformance checks:
//!
//! ```json
//! {
//!   "did": "did:nil:03ec...",
//!   "private_key": "fc7d...",
//!   "public_key_compressed": "03ec...",
//!   "public_key_uncompressed": "ecd4...",
//!   "ethereum_address": "0xf39F...",
//!   "auth_message": { "keyId": "1", "context": "nillion" },
//!   "eip712_signature": "43f8..."
//! }
//! ```
//!
//! Writing a record is an explicit act (it contains the private key). Loading
//! one checks every field's encoding and length; a record that decodes but
//! was tampered with is caught by [`verify_stored`], not here.

use serde::{Deserialize, Serialize};

use crate::auth::AuthMessage;
use crate::config::{COMPRESSED_PUBLIC_KEY_LENGTH, PRIVATE_KEY_LENGTH, UNCOMPRESSED_PUBLIC_KEY_LENGTH};
use crate::crypto::keys::SourceKey;
use crate::crypto::signatures::BindingSignature;
use crate::derivation::{verify_with_config, DerivedKeypair};
use crate::config::DerivationConfig;
use crate::error::{DerivationError, Result};
use crate::identity::{NilDid, NilKeypair};

/// Serializable, hex-encoded form of a [`DerivedKeypair`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredKeypair {
    pub did: String,
    pub private_key: String,
    pub public_key_compressed: String,
    pub public_key_uncompressed: String,
    pub ethereum_address: String,
    pub auth_message: AuthMessage,
    pub eip712_signature: String,
}

impl From<&DerivedKeypair> for StoredKeypair {
    fn from(derived: &DerivedKeypair) -> Self {
        Self {
            did: derived.did.to_string(),
            private_key: hex::encode(derived.keypair.private_key()),
            public_key_compressed: hex::encode(derived.keypair.public_key_compressed()),
            public_key_uncompressed: hex::encode(derived.keypair.public_key_uncompressed()),
            ethereum_address: derived.ethereum_address.clone(),
            auth_message: derived.auth_message.clone(),
            eip712_signature: derived.signature.to_hex(),
        }
    }
}

impl StoredKeypair {
    /// Decode every field back into typed form.
    ///
    /// # Errors
    ///
    /// [`DerivationError::EncodingError`] for bad hex, wrong lengths or a
    /// malformed DID; [`DerivationError::InvalidInput`] for an auth message
    /// with an empty field.
    pub fn to_derived(&self) -> Result<DerivedKeypair> {
        self.auth_message.validate()?;

        let private_key: [u8; PRIVATE_KEY_LENGTH] = decode_fixed("private_key", &self.private_key)?;
        let public_key_compressed: [u8; COMPRESSED_PUBLIC_KEY_LENGTH] =
            decode_fixed("public_key_compressed", &self.public_key_compressed)?;
        let public_key_uncompressed: [u8; UNCOMPRESSED_PUBLIC_KEY_LENGTH] =
            decode_fixed("public_key_uncompressed", &self.public_key_uncompressed)?;

        Ok(DerivedKeypair {
            did: NilDid::parse(&self.did)?,
            keypair: NilKeypair::from_parts(private_key, public_key_uncompressed, public_key_compressed),
            ethereum_address: self.ethereum_address.clone(),
            auth_message: self.auth_message.clone(),
            signature: BindingSignature::from_hex(&self.eip712_signature)?,
        })
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| DerivationError::EncodingError(e.to_string()))
    }

    /// Parse from JSON. Field encodings are checked later, by
    /// [`StoredKeypair::to_derived`].
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| DerivationError::EncodingError(e.to_string()))
    }
}

/// Decode `record` and run the round-trip verifier against it.
///
/// Besides the derived fields, the stored Ethereum address has to match the
/// supplied source key.
///
/// # Errors
///
/// Only decoding failures are errors. A well-formed record that does not
/// match yields `Ok(false)`.
pub fn verify_stored(record: &StoredKeypair, source: &SourceKey, app_secret: &str) -> Result<bool> {
    verify_stored_with_config(record, source, app_secret, &DerivationConfig::default())
}

/// [`verify_stored`] with explicit configuration.
pub fn verify_stored_with_config(
    record: &StoredKeypair,
    source: &SourceKey,
    app_secret: &str,
    config: &DerivationConfig,
) -> Result<bool> {
    let derived = record.to_derived()?;
    if derived.ethereum_address != source.ethereum_address() {
        tracing::debug!("stored record belongs to a different source account");
        return Ok(false);
    }
    Ok(verify_with_config(&derived, source, app_secret, config))
}

fn decode_fixed<const N: usize>(field: &str, value: &str) -> Result<[u8; N]> {
    let bytes = hex::decode(value)
        .map_err(|e| DerivationError::EncodingError(format!("{field}: {e}")))?;
    bytes.as_slice().try_into().map_err(|_| {
        DerivationError::EncodingError(format!("{field}: expected {N} bytes, got {}", bytes.len()))
    })
}
