//! Error types for the derivation pipeline.
//!
//! Every fallible operation in this crate returns a [`DerivationError`].
//! Messages describe *what* was wrong with an input, never its value: key
//! material, signatures and application secrets must not end up in logs by
//! way of an error string.

use thiserror::Error;

/// Errors that can occur while deriving or verifying a `did:nil` keypair.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DerivationError {
    /// A caller-supplied argument violates the contract (empty auth field,
    /// wrong source key length, impossible HKDF output length).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The source private key is not a usable secp256k1 scalar, or ECDSA
    /// signing failed for another reason.
    #[error("signing failed: {0}")]
    SigningFailure(String),

    /// The curve-validity loop ran out of attempts. Points at a broken
    /// entropy source or implementation, not at bad luck.
    #[error("no valid secp256k1 scalar after {attempts} attempts")]
    DerivationExhausted {
        /// Number of candidate checks performed.
        attempts: u32,
    },

    /// Stored key material could not be decoded (bad hex, wrong length,
    /// malformed DID, point not on the curve).
    #[error("encoding error: {0}")]
    EncodingError(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DerivationError>;

impl From<hex::FromHexError> for DerivationError {
    fn from(err: hex::FromHexError) -> Self {
        DerivationError::EncodingError(err.to_string())
    }
}
