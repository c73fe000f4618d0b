//! # Identity Module
//!
//! The derived side of the system: a secp256k1 keypair and the `did:nil`
//! identifier built from it.
//!
//! 1. **Keypair**: private key, uncompressed public key (`x || y`) and
//!    compressed public key, materialized from a validated scalar.
//! 2. **DID**: `did:nil:` followed by the hex of the compressed key. This
//!    is what the storage network sees and what credentials are issued to.

pub mod did;
pub mod keypair;

pub use did::NilDid;
pub use keypair::{compress, decompress, NilKeypair};
