// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # nildid: Deterministic `did:nil` Keypairs
//!
//! Derives a secp256k1 keypair and a `did:nil` identifier from an existing
//! Ethereum key, without ever storing anything. The source key signs an
//! EIP-712 `SessionKeyAuthorization`, that signature plus an application
//! secret is fed through HKDF-SHA256, and the output becomes the new private
//! key. Same inputs, same identity, on any machine.
//!
//! ## Architecture
//!
//! - **auth**: The authorization message and its canonical byte encoding.
//! - **eip712**: Typed-data hashing for the binding signature.
//! - **crypto**: HKDF, the curve-validity loop, source keys and signatures.
//! - **identity**: The derived keypair and the `did:nil` string.
//! - **derivation**: The pipeline end to end, plus the round-trip verifier.
//! - **record**: Hex/JSON form for persisting or exchanging derived keys.
//! - **config**: Protocol constants and the derivation parameters.
//!
//! ## Ground Rules
//!
//! 1. Every function is deterministic; there is no randomness anywhere.
//! 2. No secret (source key, app secret, signature, derived key) is logged.
//! 3. Nothing holds global state, so any of it may run on many threads.

pub mod auth;
pub mod config;
pub mod crypto;
pub mod derivation;
pub mod eip712;
pub mod error;
pub mod identity;
pub mod record;

pub use auth::AuthMessage;
pub use config::DerivationConfig;
pub use crypto::{BindingSignature, SourceKey};
pub use derivation::{
    derive, derive_traced, derive_with_config, materialize, verify, verify_with_config,
    DerivationTrace, DerivedKeypair,
};
pub use error::{DerivationError, Result};
pub use identity::{NilDid, NilKeypair};
pub use record::{verify_stored, StoredKeypair};
