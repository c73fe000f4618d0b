//! # Source Account Keys
//!
//! The Ethereum account whose signature seeds the derivation. We only ever
//! need three things from it: a deterministic ECDSA signature, its public
//! key, and its checksummed address (carried along as metadata so a stored
//! record says which account it belongs to).
//!
//! ## Security considerations
//!
//! - The wrapped `k256::ecdsa::SigningKey` zeroizes itself on drop.
//! - `Debug` prints the address, never the key.
//! - HD-wallet handling (mnemonics, BIP-32 paths) is someone else's job. This
//!   type starts from 32 raw bytes.

use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use std::fmt;

use crate::config::PRIVATE_KEY_LENGTH;
use crate::eip712::keccak256;
use crate::error::{DerivationError, Result};

/// A secp256k1 private key belonging to an Ethereum externally-owned account.
#[derive(Clone)]
pub struct SourceKey {
    signing_key: SigningKey,
}

impl SourceKey {
    /// Wrap 32 raw key bytes.
    ///
    /// # Errors
    ///
    /// - [`DerivationError::InvalidInput`] if `bytes` is not 32 bytes long.
    /// - [`DerivationError::SigningFailure`] if the bytes are zero or not
    ///   below the group order.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != PRIVATE_KEY_LENGTH {
            return Err(DerivationError::InvalidInput(format!(
                "source private key must be {PRIVATE_KEY_LENGTH} bytes, got {}",
                bytes.len()
            )));
        }
        let signing_key = SigningKey::from_slice(bytes).map_err(|_| {
            DerivationError::SigningFailure("source private key is not a valid secp256k1 scalar".into())
        })?;
        Ok(Self { signing_key })
    }

    /// Parse a hex-encoded key, with or without a `0x` prefix.
    ///
    /// Malformed hex is an [`DerivationError::InvalidInput`]: this is how
    /// keys arrive from environment variables and CLI flags.
    pub fn from_hex(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        let bytes = hex::decode(digits)
            .map_err(|e| DerivationError::InvalidInput(format!("source private key hex: {e}")))?;
        Self::from_bytes(&bytes)
    }

    /// Raw key bytes. Treat the result as a secret.
    pub fn to_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out.copy_from_slice(&self.signing_key.to_bytes());
        out
    }

    /// The account's verifying key.
    pub fn verifying_key(&self) -> &VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Sign a 32-byte prehash with RFC 6979 nonces, returning a low-S
    /// signature and its recovery id.
    pub(crate) fn sign_prehash(&self, digest: &[u8; 32]) -> Result<(Signature, RecoveryId)> {
        let (signature, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(digest)
            .map_err(|e| DerivationError::SigningFailure(e.to_string()))?;

        // Ethereum rejects high-S signatures. Normalizing flips R's parity,
        // so the recovery id flips with it.
        Ok(match signature.normalize_s() {
            Some(low_s) => (
                low_s,
                RecoveryId::new(!recovery_id.is_y_odd(), recovery_id.is_x_reduced()),
            ),
            None => (signature, recovery_id),
        })
    }

    /// EIP-55 checksummed address of this account.
    pub fn ethereum_address(&self) -> String {
        address_from_verifying_key(self.verifying_key())
    }
}

impl fmt::Debug for SourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SourceKey({})", self.ethereum_address())
    }
}

/// Ethereum address of a public key: last 20 bytes of
/// `keccak256(x || y)`, rendered with the EIP-55 checksum.
pub fn address_from_verifying_key(key: &VerifyingKey) -> String {
    let point = key.to_encoded_point(false);
    // Skip the SEC1 0x04 tag.
    let hash = keccak256(&point.as_bytes()[1..]);
    to_checksum_address(&hash[12..])
}

/// EIP-55 mixed-case encoding of a 20-byte address.
///
/// A hex letter is upper-cased when the matching nibble of
/// `keccak256(lowercase_hex)` is 8 or more.
pub fn to_checksum_address(address: &[u8]) -> String {
    let lower = hex::encode(address);
    let hash = keccak256(lower.as_bytes());

    let mut out = String::with_capacity(2 + lower.len());
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        let byte = hash[i / 2];
        let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };
        if c.is_ascii_alphabetic() && nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}
