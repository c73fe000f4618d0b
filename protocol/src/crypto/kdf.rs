//! HKDF-SHA-256 (RFC 5869), extract-then-expand.
//!
//! ```text
//! PRK  = HMAC(salt, IKM)
//! T(i) = HMAC(PRK, T(i-1) || info || i)      T(0) = ""
//! OKM  = first L bytes of T(1) || T(2) || ...
//! ```
//!
//! The construction is exposed through the [`KeyDeriver`] trait so the
//! scalar-validity loop can be driven by something other than real HKDF in
//! tests (a stub that never yields a valid scalar, for instance).

use hkdf::Hkdf;
use sha2::Sha256;

use crate::config::{DERIVED_KEY_LENGTH, HASH_LENGTH, KDF_SALT};
use crate::error::{DerivationError, Result};

/// Largest output HKDF-SHA-256 can produce: 255 blocks.
pub const MAX_OUTPUT_LENGTH: usize = 255 * HASH_LENGTH;

/// HKDF with an explicit salt and output length.
///
/// # Errors
///
/// [`DerivationError::InvalidInput`] if `output_len` exceeds
/// [`MAX_OUTPUT_LENGTH`].
pub fn hkdf(ikm: &[u8], info: &[u8], salt: &[u8], output_len: usize) -> Result<Vec<u8>> {
    if output_len > MAX_OUTPUT_LENGTH {
        return Err(DerivationError::InvalidInput(format!(
            "HKDF output length {output_len} exceeds {MAX_OUTPUT_LENGTH}"
        )));
    }
    let hk = Hkdf::<Sha256>::new(Some(salt), ikm);
    let mut okm = vec![0u8; output_len];
    hk.expand(info, &mut okm)
        .map_err(|e| DerivationError::InvalidInput(format!("HKDF expand: {e}")))?;
    Ok(okm)
}

/// HKDF with the default salt and a 32-byte output.
pub fn hkdf_default(ikm: &[u8], info: &[u8]) -> [u8; DERIVED_KEY_LENGTH] {
    let hk = Hkdf::<Sha256>::new(Some(KDF_SALT), ikm);
    let mut okm = [0u8; DERIVED_KEY_LENGTH];
    // 32 bytes is a single HKDF block; expand cannot fail.
    let _ = hk.expand(info, &mut okm);
    okm
}

/// Source of candidate key material for the scalar-validity loop.
pub trait KeyDeriver {
    /// Derive `output_len` bytes from `ikm`, bound to `info` and `salt`.
    fn derive(&self, ikm: &[u8], info: &[u8], salt: &[u8], output_len: usize) -> Result<Vec<u8>>;
}

/// The production deriver: plain HKDF-SHA-256.
#[derive(Debug, Clone, Copy, Default)]
pub struct HkdfSha256;

impl KeyDeriver for HkdfSha256 {
    fn derive(&self, ikm: &[u8], info: &[u8], salt: &[u8], output_len: usize) -> Result<Vec<u8>> {
        hkdf(ikm, info, salt, output_len)
    }
}
