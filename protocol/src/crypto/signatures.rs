//! # Binding Signatures
//!
//! The EIP-712 signature that binds a derived identity to its source
//! account. It is the entropy of the whole derivation, so its exact bytes
//! matter as much as its validity:
//!
//! - Nonces are RFC 6979 deterministic. A random nonce would give a
//!   different signature, hence a different identity, on every call.
//! - `s` is normalized to the lower half of the order (what every Ethereum
//!   wallet produces).
//! - `v` is `27 + recovery_id`, Ethereum style, not the raw 0/1.
//!
//! Layout on the wire and in storage: `r (32) || s (32) || v (1)`.

use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use std::fmt;

use super::keys::{address_from_verifying_key, SourceKey};
use crate::auth::AuthMessage;
use crate::config::{RECOVERY_ID_OFFSET, SIGNATURE_LENGTH};
use crate::eip712::{signing_digest, Eip712Domain};
use crate::error::{DerivationError, Result};

/// A 65-byte recoverable ECDSA signature over an EIP-712 digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingSignature {
    bytes: [u8; SIGNATURE_LENGTH],
}

impl BindingSignature {
    /// Wrap raw `r || s || v` bytes without checking them.
    pub fn from_bytes(bytes: [u8; SIGNATURE_LENGTH]) -> Self {
        Self { bytes }
    }

    /// Parse from a slice, enforcing the 65-byte length.
    pub fn try_from_slice(slice: &[u8]) -> Result<Self> {
        let bytes: [u8; SIGNATURE_LENGTH] = slice.try_into().map_err(|_| {
            DerivationError::EncodingError(format!(
                "signature must be {SIGNATURE_LENGTH} bytes, got {}",
                slice.len()
            ))
        })?;
        Ok(Self { bytes })
    }

    /// Parse a hex-encoded signature (optional `0x` prefix).
    pub fn from_hex(s: &str) -> Result<Self> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        Self::try_from_slice(&hex::decode(digits)?)
    }

    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LENGTH] {
        &self.bytes
    }

    /// The `r` component.
    pub fn r(&self) -> &[u8] {
        &self.bytes[..32]
    }

    /// The `s` component.
    pub fn s(&self) -> &[u8] {
        &self.bytes[32..64]
    }

    /// The recovery byte, 27 or 28 for signatures produced here.
    pub fn v(&self) -> u8 {
        self.bytes[64]
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Recover the signer's checksummed address for `message` under `domain`.
    ///
    /// Returns `None` if the bytes do not form a valid recoverable signature.
    pub fn recover_address(&self, domain: &Eip712Domain, message: &AuthMessage) -> Option<String> {
        let signature = Signature::from_slice(&self.bytes[..64]).ok()?;
        let recovery_id = RecoveryId::from_byte(self.v().checked_sub(RECOVERY_ID_OFFSET)?)?;
        let digest = signing_digest(domain, message);
        let key = VerifyingKey::recover_from_prehash(&digest, &signature, recovery_id).ok()?;
        Some(address_from_verifying_key(&key))
    }
}

impl fmt::Display for BindingSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for BindingSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The signature is derivation entropy; show just enough to tell two apart.
        let hex_str = self.to_hex();
        write!(f, "BindingSignature({}...)", &hex_str[..8])
    }
}

/// Sign `message` under `domain` with the source account.
///
/// # Errors
///
/// [`DerivationError::SigningFailure`] if the underlying ECDSA operation
/// fails.
pub fn sign_authorization(
    source: &SourceKey,
    domain: &Eip712Domain,
    message: &AuthMessage,
) -> Result<BindingSignature> {
    let digest = signing_digest(domain, message);
    let (signature, recovery_id) = source.sign_prehash(&digest)?;

    let mut bytes = [0u8; SIGNATURE_LENGTH];
    bytes[..64].copy_from_slice(&signature.to_bytes());
    bytes[64] = recovery_id.to_byte() + RECOVERY_ID_OFFSET;
    Ok(BindingSignature { bytes })
}

/// Sign with raw source-key bytes and the default Welshare domain.
///
/// # Errors
///
/// [`DerivationError::InvalidInput`] for a key that is not 32 bytes,
/// [`DerivationError::SigningFailure`] for one that is not a valid scalar.
pub fn sign(source_private_key: &[u8], message: &AuthMessage) -> Result<BindingSignature> {
    let source = SourceKey::from_bytes(source_private_key)?;
    sign_authorization(&source, &Eip712Domain::default(), message)
}
