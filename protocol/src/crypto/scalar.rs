//! Curve-validity loop.
//!
//! A secp256k1 private key is an integer in `(0, n)`. HKDF output is a
//! uniform 256-bit string, so roughly one in 2^128 candidates lands at zero
//! or at/above `n`. When that happens the candidate is re-derived:
//!
//! ```text
//! counter   = 1, 2, 3, ...                      (u32, big-endian)
//! candidate = HKDF(ikm  = candidate || counter,
//!                  info = "SECP256K1_RETRY",
//!                  salt = derivation context,
//!                  L    = 32)
//! ```
//!
//! The loop performs at most `max_attempts` range checks. Every failed check
//! is followed by one re-derivation, so exhaustion always means exactly
//! `max_attempts` calls into the deriver.

use k256::{FieldBytes, NonZeroScalar};

use super::kdf::{HkdfSha256, KeyDeriver};
use crate::config::{DERIVED_KEY_LENGTH, RETRY_INFO};
use crate::error::{DerivationError, Result};

/// Outcome of a successful search.
#[derive(Clone, PartialEq, Eq)]
pub struct ScalarSearch {
    /// Big-endian scalar, guaranteed `0 < scalar < n`.
    pub scalar: [u8; 32],
    /// How many re-derivations were needed (0 on the common path).
    pub retries: u32,
}

impl std::fmt::Debug for ScalarSearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScalarSearch")
            .field("scalar", &"<redacted>")
            .field("retries", &self.retries)
            .finish()
    }
}

/// `true` iff `bytes`, read big-endian, lies strictly between 0 and the
/// secp256k1 group order.
pub fn is_valid_scalar(bytes: &[u8; 32]) -> bool {
    let repr = FieldBytes::clone_from_slice(bytes);
    bool::from(NonZeroScalar::from_repr(repr).is_some())
}

/// Return `initial` if it is a valid scalar, otherwise re-derive with real
/// HKDF until one is found.
///
/// # Errors
///
/// [`DerivationError::DerivationExhausted`] after `max_attempts` failed
/// checks.
pub fn ensure_valid_scalar(
    initial: &[u8; 32],
    derivation_context: &[u8],
    max_attempts: u32,
) -> Result<[u8; 32]> {
    ensure_valid_scalar_with(&HkdfSha256, initial, derivation_context, max_attempts)
        .map(|found| found.scalar)
}

/// Same as [`ensure_valid_scalar`] with a caller-supplied deriver.
pub fn ensure_valid_scalar_with<D: KeyDeriver + ?Sized>(
    deriver: &D,
    initial: &[u8; 32],
    derivation_context: &[u8],
    max_attempts: u32,
) -> Result<ScalarSearch> {
    let mut candidate = *initial;
    let mut counter: u32 = 0;

    while counter < max_attempts {
        if is_valid_scalar(&candidate) {
            return Ok(ScalarSearch {
                scalar: candidate,
                retries: counter,
            });
        }

        counter += 1;
        tracing::warn!(attempt = counter, "candidate scalar out of range, re-deriving");

        let mut ikm = Vec::with_capacity(candidate.len() + 4);
        ikm.extend_from_slice(&candidate);
        ikm.extend_from_slice(&counter.to_be_bytes());

        let next = deriver.derive(&ikm, RETRY_INFO, derivation_context, DERIVED_KEY_LENGTH)?;
        candidate = next.as_slice().try_into().map_err(|_| {
            DerivationError::InvalidInput(format!(
                "key deriver returned {} bytes, expected {DERIVED_KEY_LENGTH}",
                next.len()
            ))
        })?;
    }

    tracing::error!(
        max_attempts,
        "curve-validity loop exhausted; entropy source or implementation is broken"
    );
    Err(DerivationError::DerivationExhausted {
        attempts: max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    const ORDER_HEX: &str = "fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364141";
    const CONTEXT: &[u8] = br#"{"context":"nillion","keyId":"1"}"#;

    fn order() -> [u8; 32] {
        hex::decode(ORDER_HEX).unwrap().try_into().unwrap()
    }

    /// Always hands back the same out-of-range value and counts calls.
    struct StuckDeriver {
        output: [u8; 32],
        calls: Cell<u32>,
    }

    impl KeyDeriver for StuckDeriver {
        fn derive(&self, _: &[u8], _: &[u8], _: &[u8], len: usize) -> Result<Vec<u8>> {
            self.calls.set(self.calls.get() + 1);
            assert_eq!(len, 32);
            Ok(self.output.to_vec())
        }
    }

    #[test]
    fn range_boundaries() {
        let n = order();
        let mut n_minus_one = n;
        n_minus_one[31] -= 1;
        let mut one = [0u8; 32];
        one[31] = 1;

        assert!(!is_valid_scalar(&[0u8; 32]));
        assert!(!is_valid_scalar(&n));
        assert!(!is_valid_scalar(&[0xff; 32]));
        assert!(is_valid_scalar(&one));
        assert!(is_valid_scalar(&n_minus_one));
    }

    #[test]
    fn valid_candidate_returned_unchanged() {
        let candidate = [0x42u8; 32];
        let out = ensure_valid_scalar(&candidate, CONTEXT, 1000).unwrap();
        assert_eq!(out, candidate);
    }

    #[test]
    fn order_is_rederived_with_counter() {
        let found = ensure_valid_scalar_with(&HkdfSha256, &order(), CONTEXT, 1000).unwrap();
        assert_eq!(found.retries, 1);
        assert_eq!(
            hex::encode(found.scalar),
            "5087c2284219dd147b9b90ebbcb5c3ef2d080fd764637bb8400c3026eb25871e"
        );
    }

    #[test]
    fn zero_is_rederived_with_counter() {
        let out = ensure_valid_scalar(&[0u8; 32], CONTEXT, 1000).unwrap();
        assert_eq!(
            hex::encode(out),
            "afa78e83eec1a544e21b95ab69fa7d85ade4dc6dfeb97df2c993007092357b8f"
        );
    }

    #[test]
    fn zero_stub_exhausts_after_exactly_max_attempts() {
        let stub = StuckDeriver {
            output: [0u8; 32],
            calls: Cell::new(0),
        };
        let err = ensure_valid_scalar_with(&stub, &[0u8; 32], CONTEXT, 1000).unwrap_err();
        assert_eq!(err, DerivationError::DerivationExhausted { attempts: 1000 });
        assert_eq!(stub.calls.get(), 1000);
    }

    #[test]
    fn order_stub_exhausts_after_exactly_max_attempts() {
        let stub = StuckDeriver {
            output: order(),
            calls: Cell::new(0),
        };
        let err = ensure_valid_scalar_with(&stub, &order(), CONTEXT, 7).unwrap_err();
        assert_eq!(err, DerivationError::DerivationExhausted { attempts: 7 });
        assert_eq!(stub.calls.get(), 7);
    }

    #[test]
    fn zero_attempts_never_checks() {
        let err = ensure_valid_scalar(&[0x42u8; 32], CONTEXT, 0).unwrap_err();
        assert_eq!(err, DerivationError::DerivationExhausted { attempts: 0 });
    }

    #[test]
    fn short_deriver_output_is_an_error() {
        struct Short;
        impl KeyDeriver for Short {
            fn derive(&self, _: &[u8], _: &[u8], _: &[u8], _: usize) -> Result<Vec<u8>> {
                Ok(vec![1u8; 16])
            }
        }
        let err = ensure_valid_scalar_with(&Short, &[0u8; 32], CONTEXT, 10).unwrap_err();
        assert!(matches!(err, DerivationError::InvalidInput(_)));
    }

    #[test]
    fn debug_output_hides_scalar() {
        let found = ensure_valid_scalar_with(&HkdfSha256, &[0x42u8; 32], CONTEXT, 1).unwrap();
        let dbg = format!("{found:?}");
        assert!(!dbg.contains("66, 66"));
        assert!(dbg.contains("redacted"));
    }
}
