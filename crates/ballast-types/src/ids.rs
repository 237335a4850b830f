use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Identifier for a signing key: the BLAKE3 hash of an ed25519 public key.
///
/// A `KeyId` names a writer — the holder of the private half controls one
/// mutable pointer in the storage network. The same id also names an owner
/// (the billing identity at the root of a user's ownership tree), since an
/// owner is just the writer key a user registered under.
///
/// Derivation is domain-separated so a key hash can never collide with a
/// content hash of the same bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KeyId {
    hash: [u8; 32],
}

impl KeyId {
    /// Derive a `KeyId` from raw ed25519 public key bytes.
    pub fn derive(public_key: &[u8; 32]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"ballast-key-v1:");
        hasher.update(public_key);
        Self {
            hash: *hasher.finalize().as_bytes(),
        }
    }

    /// The raw 32-byte hash.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.hash
    }

    /// Full hex-encoded string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.hash)
    }

    /// Short identifier (first 8 hex characters).
    pub fn short_id(&self) -> String {
        format!("key:{}", hex::encode(&self.hash[..4]))
    }

    /// Parse from a hex string (64 hex characters, optional `key:` prefix).
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let s = s.strip_prefix("key:").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != 32 {
            return Err(TypeError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self { hash: arr })
    }

    /// Create from a raw 32-byte hash. Use `derive()` for production code.
    pub fn from_raw(hash: [u8; 32]) -> Self {
        Self { hash }
    }
}

impl fmt::Debug for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyId({})", self.short_id())
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_id())
    }
}

/// Content-addressed block identifier: the BLAKE3 hash of a serialized block.
///
/// A writer's mutable pointer targets a `BlockId`, the root of that writer's
/// current subtree in the content-addressed store.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockId {
    hash: [u8; 32],
}

impl BlockId {
    /// Hash serialized block bytes into a `BlockId`.
    pub fn derive(block_bytes: &[u8]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"ballast-block-v1:");
        hasher.update(block_bytes);
        Self {
            hash: *hasher.finalize().as_bytes(),
        }
    }

    /// The raw 32-byte hash.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.hash
    }

    /// Full hex-encoded string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.hash)
    }

    /// Short identifier (first 8 hex characters).
    pub fn short_id(&self) -> String {
        format!("blk:{}", hex::encode(&self.hash[..4]))
    }

    /// Parse from a hex string (64 hex characters, optional `blk:` prefix).
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let s = s.strip_prefix("blk:").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != 32 {
            return Err(TypeError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self { hash: arr })
    }

    /// Create from a raw 32-byte hash. Use `derive()` for production code.
    pub fn from_raw(hash: [u8; 32]) -> Self {
        Self { hash }
    }
}

impl fmt::Debug for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockId({})", self.short_id())
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_derive_is_deterministic() {
        let pk = [42u8; 32];
        assert_eq!(KeyId::derive(&pk), KeyId::derive(&pk));
    }

    #[test]
    fn different_public_keys_produce_different_ids() {
        assert_ne!(KeyId::derive(&[1u8; 32]), KeyId::derive(&[2u8; 32]));
    }

    #[test]
    fn key_and_block_domains_are_separated() {
        let bytes = [7u8; 32];
        let key = KeyId::derive(&bytes);
        let block = BlockId::derive(&bytes);
        assert_ne!(key.as_bytes(), block.as_bytes());
    }

    #[test]
    fn key_short_id_format() {
        let id = KeyId::derive(&[0u8; 32]);
        let short = id.short_id();
        assert!(short.starts_with("key:"));
        assert_eq!(short.len(), 12); // "key:" + 8 hex chars
    }

    #[test]
    fn key_hex_roundtrip() {
        let id = KeyId::derive(&[99u8; 32]);
        let parsed = KeyId::from_hex(&id.to_hex()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn key_hex_roundtrip_with_prefix() {
        let id = KeyId::derive(&[99u8; 32]);
        let parsed = KeyId::from_hex(&format!("key:{}", id.to_hex())).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn block_hex_rejects_bad_length() {
        let err = BlockId::from_hex("abcd").unwrap_err();
        assert!(matches!(err, TypeError::InvalidLength { expected: 32, actual: 2 }));
    }

    #[test]
    fn serde_roundtrip() {
        let id = KeyId::derive(&[10u8; 32]);
        let json = serde_json::to_string(&id).unwrap();
        let parsed: KeyId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn ordering_is_consistent() {
        let a = BlockId::from_raw([0u8; 32]);
        let b = BlockId::from_raw([1u8; 32]);
        assert!(a < b);
    }
}
