//! End-to-end tests for `did:nil` derivation.
//!
//! These drive the public API only: source key in, DID and keypair out,
//! persisted to disk and verified again from the file. Each test stands
//! alone with its own temporary directory.

use std::sync::Arc;
use std::thread;

use rand::RngCore;

use nildid_protocol::auth::AuthMessage;
use nildid_protocol::config::{DerivationConfig, DID_LENGTH};
use nildid_protocol::crypto::keys::SourceKey;
use nildid_protocol::crypto::scalar::is_valid_scalar;
use nildid_protocol::derivation::{derive, derive_traced, verify};
use nildid_protocol::eip712::{signing_digest, Eip712Domain};
use nildid_protocol::identity::{decompress, NilDid};
use nildid_protocol::record::{verify_stored, StoredKeypair};

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

const HARDHAT_0: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
const APP_SECRET: &str = "user@secret.com";
const REFERENCE_DID: &str =
    "did:nil:03ecd47816bb8f475734b77aa9a3f4cc19a6075f3f603de0eebe6e11a784bb2e2d";

fn hardhat_source() -> SourceKey {
    SourceKey::from_hex(HARDHAT_0).expect("hardhat key")
}

/// A random source key; retried in the (practically impossible) case the
/// bytes are not a valid scalar.
fn random_source() -> SourceKey {
    let mut rng = rand::thread_rng();
    loop {
        let mut bytes = [0u8; 32];
        rng.fill_bytes(&mut bytes);
        if let Ok(key) = SourceKey::from_bytes(&bytes) {
            return key;
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

#[test]
fn reference_account_yields_reference_did() {
    let msg = AuthMessage::new("1", "nillion").unwrap();
    let derived = derive(&hardhat_source(), &msg, APP_SECRET).unwrap();

    assert_eq!(derived.did.to_string(), REFERENCE_DID);
    assert_eq!(derived.ethereum_address, "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
    assert!(verify(&derived, &hardhat_source(), APP_SECRET));
}

#[test]
fn binding_signature_recovers_source_address() {
    let source = hardhat_source();
    let msg = AuthMessage::new("1", "nillion").unwrap();
    let derived = derive(&source, &msg, APP_SECRET).unwrap();

    let domain = Eip712Domain::default();
    assert_eq!(
        derived.signature.recover_address(&domain, &msg).as_deref(),
        Some(source.ethereum_address().as_str())
    );
    assert_eq!(
        hex::encode(signing_digest(&domain, &msg)),
        "73cdfd97a5b2d35faaa46b0f00ecb30432a53664bb2c2e96183f22df771e9a35"
    );
}

#[test]
fn random_sources_produce_consistent_identities() {
    let msg = AuthMessage::new("session-7", "welshare").unwrap();
    for _ in 0..8 {
        let source = random_source();
        let derived = derive(&source, &msg, APP_SECRET).unwrap();

        let did = derived.did.to_string();
        assert_eq!(did.len(), DID_LENGTH);
        assert_eq!(NilDid::parse(&did).unwrap(), derived.did);

        assert!(is_valid_scalar(derived.keypair.private_key()));
        assert_eq!(
            &decompress(derived.keypair.public_key_compressed()).unwrap(),
            derived.keypair.public_key_uncompressed()
        );
        assert!(verify(&derived, &source, APP_SECRET));
    }
}

#[test]
fn unicode_fields_are_supported() {
    let msg = AuthMessage::new("ключ-1", "nillion \"prod\"").unwrap();
    let (derived, trace) =
        derive_traced(&hardhat_source(), &msg, APP_SECRET, &DerivationConfig::default()).unwrap();
    assert_eq!(trace.derivation_data, r#"{"context":"nillion \"prod\"","keyId":"ключ-1"}"#);
    assert!(verify(&derived, &hardhat_source(), APP_SECRET));
}

#[test]
fn empty_message_fields_are_rejected() {
    assert!(AuthMessage::new("", "nillion").is_err());
    assert!(AuthMessage::new("1", "").is_err());
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

#[test]
fn stored_record_survives_a_round_trip_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("keypair.json");

    let source = hardhat_source();
    let msg = AuthMessage::new("1", "nillion").unwrap();
    let derived = derive(&source, &msg, APP_SECRET).unwrap();

    let record = StoredKeypair::from(&derived);
    std::fs::write(&path, record.to_json().unwrap()).unwrap();

    let loaded = StoredKeypair::from_json(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(loaded.did, REFERENCE_DID);
    assert!(verify_stored(&loaded, &source, APP_SECRET).unwrap());
    assert!(!verify_stored(&loaded, &source, "wrong secret").unwrap());
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[test]
fn parallel_derivations_agree() {
    let source = Arc::new(hardhat_source());
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let source = Arc::clone(&source);
            thread::spawn(move || {
                let msg = AuthMessage::new("1", "nillion").unwrap();
                derive(&source, &msg, APP_SECRET).unwrap().did.to_string()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), REFERENCE_DID);
    }
}
