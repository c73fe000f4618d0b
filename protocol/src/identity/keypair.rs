//! # Derived secp256k1 Keypair
//!
//! Turns a validated scalar into the three byte strings a `did:nil` holder
//! needs: the private key, the 64-byte uncompressed public key (`x || y`,
//! no SEC1 tag) and the 33-byte compressed key.
//!
//! Point multiplication is done by `k256`. The compressed form is assembled
//! from the uncompressed one by the parity rule (`0x02` for even `y`, `0x03`
//! for odd) so the rule is visible here and testable against `k256`'s own
//! SEC1 encoder.

use k256::ecdsa::SigningKey;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::elliptic_curve::subtle::ConstantTimeEq;
use k256::{PublicKey, SecretKey};
use std::fmt;

use crate::config::{COMPRESSED_PUBLIC_KEY_LENGTH, UNCOMPRESSED_PUBLIC_KEY_LENGTH};
use crate::error::{DerivationError, Result};

/// A derived keypair in the byte layouts the storage client expects.
///
/// Like the source key, this deliberately has no `Serialize` impl; see
/// [`crate::record::StoredKeypair`] for the explicit, hex-encoded form.
#[derive(Clone)]
pub struct NilKeypair {
    private_key: [u8; 32],
    public_key_uncompressed: [u8; UNCOMPRESSED_PUBLIC_KEY_LENGTH],
    public_key_compressed: [u8; COMPRESSED_PUBLIC_KEY_LENGTH],
}

impl NilKeypair {
    /// Materialize the keypair for a scalar in `(0, n)`.
    ///
    /// # Errors
    ///
    /// [`DerivationError::InvalidInput`] if the scalar is zero or not below
    /// the group order. Callers are expected to have run the validity loop.
    pub fn from_scalar(scalar: &[u8; 32]) -> Result<Self> {
        let secret = SecretKey::from_slice(scalar).map_err(|_| {
            DerivationError::InvalidInput("scalar is not a valid secp256k1 private key".into())
        })?;

        let point = secret.public_key().to_encoded_point(false);
        let mut public_key_uncompressed = [0u8; UNCOMPRESSED_PUBLIC_KEY_LENGTH];
        public_key_uncompressed.copy_from_slice(&point.as_bytes()[1..]);

        Ok(Self {
            private_key: *scalar,
            public_key_compressed: compress(&public_key_uncompressed),
            public_key_uncompressed,
        })
    }

    /// Reassemble a keypair from stored parts without cross-checking them.
    ///
    /// Consistency is the verifier's job: it re-derives and compares every
    /// field, so a tampered part shows up as a failed verification.
    pub fn from_parts(
        private_key: [u8; 32],
        public_key_uncompressed: [u8; UNCOMPRESSED_PUBLIC_KEY_LENGTH],
        public_key_compressed: [u8; COMPRESSED_PUBLIC_KEY_LENGTH],
    ) -> Self {
        Self {
            private_key,
            public_key_uncompressed,
            public_key_compressed,
        }
    }

    /// Raw private key. Handle as a secret.
    pub fn private_key(&self) -> &[u8; 32] {
        &self.private_key
    }

    /// `x || y`, 64 bytes.
    pub fn public_key_uncompressed(&self) -> &[u8; UNCOMPRESSED_PUBLIC_KEY_LENGTH] {
        &self.public_key_uncompressed
    }

    /// Parity prefix plus `x`, 33 bytes.
    pub fn public_key_compressed(&self) -> &[u8; COMPRESSED_PUBLIC_KEY_LENGTH] {
        &self.public_key_compressed
    }

    /// ECDSA signing key for authenticating against the storage service.
    pub fn signing_key(&self) -> Result<SigningKey> {
        SigningKey::from_slice(&self.private_key)
            .map_err(|_| DerivationError::EncodingError("stored private key is not a valid scalar".into()))
    }
}

impl PartialEq for NilKeypair {
    /// Field-by-field equality; the private key is compared in constant time.
    fn eq(&self, other: &Self) -> bool {
        bool::from(self.private_key[..].ct_eq(&other.private_key[..]))
            && self.public_key_uncompressed == other.public_key_uncompressed
            && self.public_key_compressed == other.public_key_compressed
    }
}

impl Eq for NilKeypair {}

impl fmt::Debug for NilKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NilKeypair(pub={})", hex::encode(self.public_key_compressed))
    }
}

/// Compress an `x || y` public key by the parity of `y`.
pub fn compress(
    uncompressed: &[u8; UNCOMPRESSED_PUBLIC_KEY_LENGTH],
) -> [u8; COMPRESSED_PUBLIC_KEY_LENGTH] {
    let mut out = [0u8; COMPRESSED_PUBLIC_KEY_LENGTH];
    out[0] = if uncompressed[63] & 1 == 1 { 0x03 } else { 0x02 };
    out[1..].copy_from_slice(&uncompressed[..32]);
    out
}

/// Recover `x || y` from a compressed key.
///
/// # Errors
///
/// [`DerivationError::EncodingError`] if the bytes are not a compressed
/// point on secp256k1.
pub fn decompress(
    compressed: &[u8; COMPRESSED_PUBLIC_KEY_LENGTH],
) -> Result<[u8; UNCOMPRESSED_PUBLIC_KEY_LENGTH]> {
    if compressed[0] != 0x02 && compressed[0] != 0x03 {
        return Err(DerivationError::EncodingError(format!(
            "compressed key prefix must be 0x02 or 0x03, got 0x{:02x}",
            compressed[0]
        )));
    }
    let key = PublicKey::from_sec1_bytes(compressed)
        .map_err(|_| DerivationError::EncodingError("compressed key is not on secp256k1".into()))?;
    let point = key.to_encoded_point(false);
    let mut out = [0u8; UNCOMPRESSED_PUBLIC_KEY_LENGTH];
    out.copy_from_slice(&point.as_bytes()[1..]);
    Ok(out)
}
