//! # Derivation Pipeline
//!
//! ```text
//! AuthMessage ──encode──▶ canonical bytes ─────────────────────────────┐
//!      │                                                                │
//!      └──EIP-712──▶ digest ──ECDSA(source)──▶ signature (65 B)         │
//!                                                  │                    │
//!                     app secret || signature ──HKDF(info = canonical)──┤
//!                                                  ▼                    │
//!                                         candidate scalar ──validity loop(salt = canonical)
//!                                                  ▼
//!                                   private key ──▶ public key ──▶ did:nil
//! ```
//!
//! Every step is a pure function of its inputs, so the same
//! `(source key, message, secret)` triple always yields the same identity,
//! and [`verify`] can prove it by running the pipeline again.
//!
//! Nothing secret is logged: the debug event at the end carries the DID and
//! the retry count, nothing else.

use serde::Serialize;

use crate::auth::AuthMessage;
use crate::config::{DerivationConfig, DERIVED_KEY_LENGTH};
use crate::crypto::kdf::{HkdfSha256, KeyDeriver};
use crate::crypto::keys::SourceKey;
use crate::crypto::scalar::ensure_valid_scalar_with;
use crate::crypto::signatures::{sign_authorization, BindingSignature};
use crate::eip712::{signing_digest, struct_hash, Eip712Domain};
use crate::error::{DerivationError, Result};
use crate::identity::{NilDid, NilKeypair};

// ---------------------------------------------------------------------------
// Result Types
// ---------------------------------------------------------------------------

/// Everything a derivation produces, plus the inputs needed to repeat it
/// (minus the two secrets).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedKeypair {
    pub did: NilDid,
    pub keypair: NilKeypair,
    /// Checksummed address of the source account.
    pub ethereum_address: String,
    pub auth_message: AuthMessage,
    /// The binding signature the key was derived from.
    pub signature: BindingSignature,
}

/// Every intermediate value of one derivation, hex-encoded.
///
/// Meant for comparing against another implementation step by step. It
/// contains the signature and the derived private key, so it must only be
/// shown on explicit request and never logged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DerivationTrace {
    pub domain_separator: String,
    pub struct_hash: String,
    pub signing_digest: String,
    pub signature: String,
    pub signature_r: String,
    pub signature_s: String,
    pub signature_v: u8,
    pub derivation_data: String,
    pub input_key_material_len: usize,
    pub derived_key_material: String,
    pub retries: u32,
    pub private_key: String,
    pub public_key_uncompressed: String,
    pub public_key_x: String,
    pub public_key_y: String,
    pub y_is_odd: bool,
    pub public_key_compressed: String,
    pub did: String,
    pub ethereum_address: String,
}

// ---------------------------------------------------------------------------
// Derivation
// ---------------------------------------------------------------------------

/// Derive the `did:nil` keypair for `(source, message, app_secret)` with the
/// Welshare defaults.
///
/// # Errors
///
/// - [`DerivationError::SigningFailure`] if the source key cannot sign.
/// - [`DerivationError::DerivationExhausted`] if no valid scalar turns up
///   within the retry bound.
pub fn derive(source: &SourceKey, message: &AuthMessage, app_secret: &str) -> Result<DerivedKeypair> {
    derive_with_config(source, message, app_secret, &DerivationConfig::default())
}

/// [`derive`] with explicit configuration.
pub fn derive_with_config(
    source: &SourceKey,
    message: &AuthMessage,
    app_secret: &str,
    config: &DerivationConfig,
) -> Result<DerivedKeypair> {
    run(source, message, app_secret, config, &HkdfSha256).map(|(derived, _)| derived)
}

/// [`derive_with_config`] that also returns every intermediate value.
pub fn derive_traced(
    source: &SourceKey,
    message: &AuthMessage,
    app_secret: &str,
    config: &DerivationConfig,
) -> Result<(DerivedKeypair, DerivationTrace)> {
    run(source, message, app_secret, config, &HkdfSha256)
}

/// The pipeline, parameterized over the HKDF implementation used by the
/// validity loop.
pub fn derive_with_deriver<D: KeyDeriver + ?Sized>(
    source: &SourceKey,
    message: &AuthMessage,
    app_secret: &str,
    config: &DerivationConfig,
    deriver: &D,
) -> Result<DerivedKeypair> {
    run(source, message, app_secret, config, deriver).map(|(derived, _)| derived)
}

/// Turn a validated scalar into its keypair and `did:nil`.
///
/// # Errors
///
/// [`DerivationError::InvalidInput`] if the scalar is zero or not below the
/// group order.
pub fn materialize(scalar: &[u8; DERIVED_KEY_LENGTH]) -> Result<(NilKeypair, NilDid)> {
    let keypair = NilKeypair::from_scalar(scalar)?;
    let did = NilDid::from_compressed(keypair.public_key_compressed());
    Ok((keypair, did))
}

fn run<D: KeyDeriver + ?Sized>(
    source: &SourceKey,
    message: &AuthMessage,
    app_secret: &str,
    config: &DerivationConfig,
    deriver: &D,
) -> Result<(DerivedKeypair, DerivationTrace)> {
    message.validate()?;

    let domain = Eip712Domain::new(&config.domain_name, &config.domain_version);
    let signature = sign_authorization(source, &domain, message)?;

    let derivation_data = message.canonical_bytes();

    let mut ikm = Vec::with_capacity(app_secret.len() + signature.as_bytes().len());
    ikm.extend_from_slice(app_secret.as_bytes());
    ikm.extend_from_slice(signature.as_bytes());

    let material = deriver.derive(&ikm, &derivation_data, &config.kdf_salt, DERIVED_KEY_LENGTH)?;
    let material: [u8; DERIVED_KEY_LENGTH] = material.as_slice().try_into().map_err(|_| {
        DerivationError::InvalidInput(format!(
            "key deriver returned {} bytes, expected {DERIVED_KEY_LENGTH}",
            material.len()
        ))
    })?;

    let found = ensure_valid_scalar_with(deriver, &material, &derivation_data, config.max_attempts)?;
    let (keypair, did) = materialize(&found.scalar)?;
    let ethereum_address = source.ethereum_address();

    tracing::debug!(did = %did, retries = found.retries, "derived did:nil keypair");

    let uncompressed = keypair.public_key_uncompressed();
    let trace = DerivationTrace {
        domain_separator: hex::encode(domain.separator()),
        struct_hash: hex::encode(struct_hash(message)),
        signing_digest: hex::encode(signing_digest(&domain, message)),
        signature: signature.to_hex(),
        signature_r: hex::encode(signature.r()),
        signature_s: hex::encode(signature.s()),
        signature_v: signature.v(),
        derivation_data: message.to_string(),
        input_key_material_len: ikm.len(),
        derived_key_material: hex::encode(material),
        retries: found.retries,
        private_key: hex::encode(keypair.private_key()),
        public_key_uncompressed: hex::encode(uncompressed),
        public_key_x: hex::encode(&uncompressed[..32]),
        public_key_y: hex::encode(&uncompressed[32..]),
        y_is_odd: uncompressed[63] & 1 == 1,
        public_key_compressed: hex::encode(keypair.public_key_compressed()),
        did: did.to_string(),
        ethereum_address: ethereum_address.clone(),
    };

    let derived = DerivedKeypair {
        did,
        keypair,
        ethereum_address,
        auth_message: message.clone(),
        signature,
    };
    Ok((derived, trace))
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

/// Re-derive from `source` and `app_secret` and check that every field of
/// `derived` matches: DID, private key, both public keys and the signature.
///
/// Any derivation error counts as a mismatch.
pub fn verify(derived: &DerivedKeypair, source: &SourceKey, app_secret: &str) -> bool {
    verify_with_config(derived, source, app_secret, &DerivationConfig::default())
}

/// [`verify`] with explicit configuration.
pub fn verify_with_config(
    derived: &DerivedKeypair,
    source: &SourceKey,
    app_secret: &str,
    config: &DerivationConfig,
) -> bool {
    match derive_with_config(source, &derived.auth_message, app_secret, config) {
        Ok(fresh) => {
            let matches = fresh.did == derived.did
                && fresh.keypair == derived.keypair
                && fresh.signature == derived.signature;
            if !matches {
                tracing::debug!(did = %derived.did, "re-derived keypair does not match");
            }
            matches
        }
        Err(err) => {
            tracing::debug!(error = %err, "re-derivation failed during verification");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    const HARDHAT_0: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const HARDHAT_1: &str = "59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";
    const SECRET: &str = "user@secret.com";

    fn source() -> SourceKey {
        SourceKey::from_hex(HARDHAT_0).unwrap()
    }

    fn message() -> AuthMessage {
        AuthMessage::new("1", "nillion").unwrap()
    }

    #[test]
    fn reference_vector() {
        let derived = derive(&source(), &message(), SECRET).unwrap();
        assert_eq!(
            derived.did.to_string(),
            "did:nil:03ecd47816bb8f475734b77aa9a3f4cc19a6075f3f603de0eebe6e11a784bb2e2d"
        );
        assert_eq!(
            hex::encode(derived.keypair.private_key()),
            "fc7d9e63f27d06c1d69c090f86a7f15a91464f8c5de6ee14be7c3dff6f70f9f1"
        );
        assert_eq!(derived.ethereum_address, "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
    }

    #[test]
    fn second_account_vector() {
        let src = SourceKey::from_hex(HARDHAT_1).unwrap();
        let msg = AuthMessage::new("2", "nillion").unwrap();
        let derived = derive(&src, &msg, SECRET).unwrap();
        assert_eq!(
            derived.did.to_string(),
            "did:nil:034629c0bc90776302cc65586b6b1f3f52648ffb9d32342ad3d38ab0bf48f3b35f"
        );
    }

    #[test]
    fn trace_matches_result() {
        let (derived, trace) =
            derive_traced(&source(), &message(), SECRET, &DerivationConfig::default()).unwrap();
        assert_eq!(trace.did, derived.did.to_string());
        assert_eq!(trace.derivation_data, r#"{"context":"nillion","keyId":"1"}"#);
        assert_eq!(trace.input_key_material_len, SECRET.len() + 65);
        assert_eq!(trace.retries, 0);
        assert_eq!(trace.derived_key_material, trace.private_key);
        assert_eq!(trace.signature_v, 28);
        assert!(trace.y_is_odd);
        assert_eq!(
            trace.signing_digest,
            "73cdfd97a5b2d35faaa46b0f00ecb30432a53664bb2c2e96183f22df771e9a35"
        );
        assert_eq!(
            trace.domain_separator,
            "afd2fdedd21a501a791dd8b11b31a23d630fb61d33b6a6c0545e02caf6b0bbaf"
        );
    }

    #[test]
    fn each_input_changes_the_identity() {
        let base = derive(&source(), &message(), SECRET).unwrap().did;
        let other_secret = derive(&source(), &message(), "other@secret.com").unwrap().did;
        let other_key = derive(&source(), &AuthMessage::new("2", "nillion").unwrap(), SECRET)
            .unwrap()
            .did;
        let other_domain = derive_with_config(
            &source(),
            &message(),
            SECRET,
            &DerivationConfig::default().with_domain("Another Wallet", "1.0"),
        )
        .unwrap()
        .did;
        assert_ne!(base, other_secret);
        assert_ne!(base, other_key);
        assert_ne!(base, other_domain);
    }

    #[test]
    fn materialize_known_scalar() {
        let scalar: [u8; 32] =
            hex::decode("fc7d9e63f27d06c1d69c090f86a7f15a91464f8c5de6ee14be7c3dff6f70f9f1")
                .unwrap()
                .try_into()
                .unwrap();
        let (keypair, did) = materialize(&scalar).unwrap();
        assert_eq!(did.public_key_compressed(), keypair.public_key_compressed());
        assert_eq!(
            did.to_string(),
            "did:nil:03ecd47816bb8f475734b77aa9a3f4cc19a6075f3f603de0eebe6e11a784bb2e2d"
        );
        assert!(materialize(&[0u8; 32]).is_err());
    }

    #[test]
    fn empty_secret_is_allowed() {
        let derived = derive(&source(), &message(), "").unwrap();
        assert!(verify(&derived, &source(), ""));
    }

    #[test]
    fn verify_accepts_fresh_derivation() {
        let derived = derive(&source(), &message(), SECRET).unwrap();
        assert!(verify(&derived, &source(), SECRET));
    }

    #[test]
    fn verify_rejects_wrong_secret_or_source() {
        let derived = derive(&source(), &message(), SECRET).unwrap();
        assert!(!verify(&derived, &source(), "nope"));
        let other = SourceKey::from_hex(HARDHAT_1).unwrap();
        assert!(!verify(&derived, &other, SECRET));
    }

    #[test]
    fn verify_rejects_any_flipped_private_key_byte() {
        let derived = derive(&source(), &message(), SECRET).unwrap();
        for i in 0..32 {
            let mut tampered = derived.clone();
            let mut sk = *derived.keypair.private_key();
            sk[i] ^= 0x01;
            tampered.keypair = NilKeypair::from_parts(
                sk,
                *derived.keypair.public_key_uncompressed(),
                *derived.keypair.public_key_compressed(),
            );
            assert!(!verify(&tampered, &source(), SECRET), "byte {i}");
        }
    }

    #[test]
    fn verify_rejects_tampered_signature() {
        let derived = derive(&source(), &message(), SECRET).unwrap();
        let mut bytes = *derived.signature.as_bytes();
        bytes[64] ^= 0x03;
        let mut tampered = derived.clone();
        tampered.signature = BindingSignature::from_bytes(bytes);
        assert!(!verify(&tampered, &source(), SECRET));
    }

    #[test]
    fn exhaustion_propagates_from_pipeline() {
        struct Zero(Cell<u32>);
        impl KeyDeriver for Zero {
            fn derive(&self, _: &[u8], _: &[u8], _: &[u8], len: usize) -> Result<Vec<u8>> {
                self.0.set(self.0.get() + 1);
                Ok(vec![0u8; len])
            }
        }
        let stub = Zero(Cell::new(0));
        let cfg = DerivationConfig::default().with_max_attempts(25);
        let err = derive_with_deriver(&source(), &message(), SECRET, &cfg, &stub).unwrap_err();
        assert_eq!(err, DerivationError::DerivationExhausted { attempts: 25 });
        // One call for the initial material, then one per failed check.
        assert_eq!(stub.0.get(), 26);
    }
}
