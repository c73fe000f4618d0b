//! # Protocol Configuration & Constants
//!
//! Every byte string that feeds the derivation lives here. Changing any of
//! them changes every derived identity in existence, silently. The wallet,
//! the issuer and the verifier all have to agree on these to the last byte,
//! so treat this file as frozen once identities exist in the wild.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Key Derivation
// ---------------------------------------------------------------------------

/// Default HKDF salt shared by every caller of the first derivation step.
pub const KDF_SALT: &[u8] = b"SIGNATURE_INTEGRATED_KDF_v1";

/// HKDF `info` used when a candidate scalar falls outside `(0, n)` and has to
/// be re-derived.
pub const RETRY_INFO: &[u8] = b"SECP256K1_RETRY";

/// Upper bound on candidate checks in the curve-validity loop.
///
/// A uniformly random 256-bit value is out of range with probability
/// roughly 2^-128, so hitting this bound means something is broken upstream.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 1000;

/// Output length of the HKDF step, one secp256k1 scalar.
pub const DERIVED_KEY_LENGTH: usize = 32;

/// HMAC-SHA-256 output length. HKDF can expand at most 255 blocks of this.
pub const HASH_LENGTH: usize = 32;

/// Application secret used by the reference wallet when none is configured.
pub const DEFAULT_APP_SECRET: &str = "user@secret.com";

// ---------------------------------------------------------------------------
// EIP-712 Domain
// ---------------------------------------------------------------------------

/// `name` field of the EIP-712 domain.
pub const EIP712_DOMAIN_NAME: &str = "Welshare Health Wallet";

/// `version` field of the EIP-712 domain.
pub const EIP712_DOMAIN_VERSION: &str = "1.0";

/// Primary type name of the signed struct.
pub const PRIMARY_TYPE: &str = "SessionKeyAuthorization";

// ---------------------------------------------------------------------------
// Key & Signature Sizes
// ---------------------------------------------------------------------------

/// secp256k1 secret scalar length.
pub const PRIVATE_KEY_LENGTH: usize = 32;

/// Uncompressed public key without the SEC1 `0x04` tag: `x || y`.
pub const UNCOMPRESSED_PUBLIC_KEY_LENGTH: usize = 64;

/// SEC1 compressed public key: parity prefix plus `x`.
pub const COMPRESSED_PUBLIC_KEY_LENGTH: usize = 33;

/// Recoverable ECDSA signature: `r || s || v`.
pub const SIGNATURE_LENGTH: usize = 65;

/// Offset added to the raw recovery id to form `v`.
///
/// Ethereum wallets emit `v ∈ {27, 28}` for typed-data signatures, and the
/// derived key depends on that byte. Pinned by the known-vector tests.
pub const RECOVERY_ID_OFFSET: u8 = 27;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// DID method prefix, including the trailing colon.
pub const DID_PREFIX: &str = "did:nil:";

/// Full length of a `did:nil` string: prefix plus 66 hex characters.
pub const DID_LENGTH: usize = DID_PREFIX.len() + COMPRESSED_PUBLIC_KEY_LENGTH * 2;

// ---------------------------------------------------------------------------
// DerivationConfig
// ---------------------------------------------------------------------------

/// The knobs of the derivation that an integrator may legitimately override.
///
/// Defaults reproduce the Welshare wallet exactly. Anything else yields a
/// different (but still deterministic) identity space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DerivationConfig {
    /// EIP-712 domain name.
    pub domain_name: String,
    /// EIP-712 domain version.
    pub domain_version: String,
    /// Salt for the first HKDF step.
    pub kdf_salt: Vec<u8>,
    /// Candidate checks allowed in the curve-validity loop.
    pub max_attempts: u32,
}

impl Default for DerivationConfig {
    fn default() -> Self {
        Self {
            domain_name: EIP712_DOMAIN_NAME.to_string(),
            domain_version: EIP712_DOMAIN_VERSION.to_string(),
            kdf_salt: KDF_SALT.to_vec(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl DerivationConfig {
    /// Override the retry bound.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Override the EIP-712 domain.
    pub fn with_domain(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.domain_name = name.into();
        self.domain_version = version.into();
        self
    }
}
