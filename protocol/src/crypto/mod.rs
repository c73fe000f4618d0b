//! # Cryptographic Primitives
//!
//! Everything below the pipeline: the source account key, the EIP-712
//! binding signature, HKDF, and the scalar-validity loop.
//!
//! - **secp256k1 / ECDSA** come from `k256`. We never touch curve arithmetic
//!   ourselves; point multiplication, compression and RFC 6979 nonces are the
//!   library's job.
//! - **HKDF-SHA-256** comes from `hkdf` + `sha2`.
//! - **Keccak-256** (Ethereum's, not NIST SHA3) comes from `sha3`.
//!
//! What is written here is glue: byte layouts, the retry counter, and the
//! Ethereum-specific conventions (`v` offset, EIP-55 addresses).

pub mod kdf;
pub mod keys;
pub mod scalar;
pub mod signatures;

pub use kdf::{hkdf, HkdfSha256, KeyDeriver};
pub use keys::SourceKey;
pub use scalar::{ensure_valid_scalar, ensure_valid_scalar_with, is_valid_scalar, ScalarSearch};
pub use signatures::{sign_authorization, BindingSignature};
