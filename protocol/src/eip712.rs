//! # EIP-712 Typed-Data Hashing
//!
//! Just enough of EIP-712 to hash a `SessionKeyAuthorization` under the
//! wallet's domain. The schema is fixed:
//!
//! ```text
//! EIP712Domain(string name,string version)
//! SessionKeyAuthorization(string context,string keyId)
//! ```
//!
//! Only `string` members appear, so `encodeData` is the concatenation of
//! `keccak256(utf8(value))` for each member in declaration order. The
//! signing digest is `keccak256(0x19 || 0x01 || domainSeparator || hashStruct)`.

use sha3::{Digest, Keccak256};

use crate::auth::AuthMessage;
use crate::config::{EIP712_DOMAIN_NAME, EIP712_DOMAIN_VERSION};

/// Encoded type of the domain struct.
pub const DOMAIN_TYPE: &str = "EIP712Domain(string name,string version)";

/// Encoded type of the authorization struct. Member order is part of the hash.
pub const SESSION_KEY_AUTHORIZATION_TYPE: &str =
    "SessionKeyAuthorization(string context,string keyId)";

/// Compute the Keccak-256 digest of the input.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// The EIP-712 domain: name and version, nothing else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eip712Domain {
    pub name: String,
    pub version: String,
}

impl Default for Eip712Domain {
    fn default() -> Self {
        Self::new(EIP712_DOMAIN_NAME, EIP712_DOMAIN_VERSION)
    }
}

impl Eip712Domain {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// `hashStruct(domain)`.
    pub fn separator(&self) -> [u8; 32] {
        hash_string_struct(DOMAIN_TYPE, &[&self.name, &self.version])
    }
}

/// `hashStruct(SessionKeyAuthorization{context, keyId})`.
pub fn struct_hash(message: &AuthMessage) -> [u8; 32] {
    let [(_, context), (_, key_id)] = message.fields();
    hash_string_struct(SESSION_KEY_AUTHORIZATION_TYPE, &[context, key_id])
}

/// The 32-byte digest a wallet signs for `message` under `domain`.
pub fn signing_digest(domain: &Eip712Domain, message: &AuthMessage) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update([0x19, 0x01]);
    hasher.update(domain.separator());
    hasher.update(struct_hash(message));
    hasher.finalize().into()
}

/// `keccak256(typeHash || keccak256(v_1) || ... || keccak256(v_n))` for a
/// struct whose members are all `string`.
fn hash_string_struct(encoded_type: &str, values: &[&str]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(keccak256(encoded_type.as_bytes()));
    for value in values {
        hasher.update(keccak256(value.as_bytes()));
    }
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keccak_of_empty_input() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn domain_type_hash_matches_reference() {
        // Well-known hash of the name+version-only domain type.
        assert_eq!(
            hex::encode(keccak256(DOMAIN_TYPE.as_bytes())),
            "b03948446334eb9b2196d5eb166f69b9d49403eb4a12f36de8d3f9f3cb8e15c3"
        );
    }

    #[test]
    fn separator_depends_on_domain_fields() {
        let default = Eip712Domain::default();
        let other_version = Eip712Domain::new(EIP712_DOMAIN_NAME, "2.0");
        assert_ne!(default.separator(), other_version.separator());
    }

    #[test]
    fn digest_binds_message_fields() {
        let domain = Eip712Domain::default();
        let a = AuthMessage::new("1", "nillion").unwrap();
        let b = AuthMessage::new("2", "nillion").unwrap();
        let swapped = AuthMessage::new("nillion", "1").unwrap();
        let da = signing_digest(&domain, &a);
        assert_ne!(da, signing_digest(&domain, &b));
        assert_ne!(da, signing_digest(&domain, &swapped));
        assert_eq!(da, signing_digest(&domain, &a));
    }
}
