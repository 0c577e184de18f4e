//! Hash identifiers and the hashing helpers built on them.

use ripemd::Ripemd160;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error parsing a hash from hex.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HexError {
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// 32-byte identifier used for transaction ids, block hashes and asset ids.
#[derive(
    Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Hash256([u8; 32]);

impl Hash256 {
    /// All-zero hash.
    pub const ZERO: Self = Self([0u8; 32]);

    /// Length in bytes.
    pub const LEN: usize = 32;

    /// Wrap raw hash bytes.
    pub const fn from_hash_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Double SHA-256 of arbitrary data.
    pub fn of(data: &[u8]) -> Self {
        Self(hash256(data))
    }

    /// Build from a slice, which must be exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, HexError> {
        let array: [u8; 32] = bytes.try_into().map_err(|_| HexError::InvalidLength {
            expected: Self::LEN,
            actual: bytes.len(),
        })?;
        Ok(Self(array))
    }

    /// Parse from a hex string.
    pub fn from_hex(s: &str) -> Result<Self, HexError> {
        let bytes = hex::decode(s).map_err(|e| HexError::InvalidHex(e.to_string()))?;
        Self::from_slice(&bytes)
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Whether this is the zero hash.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Lowercase hex encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form keeps log lines readable
        write!(f, "Hash256({}..)", &self.to_hex()[..16])
    }
}

impl FromStr for Hash256 {
    type Err = HexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

/// 20-byte account identifier: `RIPEMD160(SHA256(script))`.
#[derive(
    Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ProgramHash([u8; 20]);

impl ProgramHash {
    /// Length in bytes.
    pub const LEN: usize = 20;

    /// Wrap raw bytes.
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Build from a slice, which must be exactly 20 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, HexError> {
        let array: [u8; 20] = bytes.try_into().map_err(|_| HexError::InvalidLength {
            expected: Self::LEN,
            actual: bytes.len(),
        })?;
        Ok(Self(array))
    }

    /// Parse from a hex string.
    pub fn from_hex(s: &str) -> Result<Self, HexError> {
        let bytes = hex::decode(s).map_err(|e| HexError::InvalidHex(e.to_string()))?;
        Self::from_slice(&bytes)
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Lowercase hex encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ProgramHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for ProgramHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProgramHash({})", self.to_hex())
    }
}

/// Single SHA-256.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Double SHA-256.
pub fn hash256(data: &[u8]) -> [u8; 32] {
    sha256(&sha256(data))
}

/// `RIPEMD160(SHA256(data))`.
pub fn hash160(data: &[u8]) -> [u8; 20] {
    Ripemd160::digest(sha256(data)).into()
}

/// Program hash of a script. Deterministic for a given byte sequence.
pub fn to_code_hash(code: &[u8]) -> ProgramHash {
    ProgramHash(hash160(code))
}

/// Merkle root over a list of hashes.
///
/// Pairs are combined with double SHA-256; an odd node at any level is paired
/// with itself. An empty list yields [`Hash256::ZERO`].
pub fn compute_merkle_root(hashes: &[Hash256]) -> Hash256 {
    if hashes.is_empty() {
        return Hash256::ZERO;
    }

    let mut level: Vec<Hash256> = hashes.to_vec();
    while level.len() > 1 {
        let mut next = Vec::with_capacity(level.len().div_ceil(2));
        for pair in level.chunks(2) {
            let left = pair[0];
            let right = pair.get(1).copied().unwrap_or(left);
            let mut buf = [0u8; 64];
            buf[..32].copy_from_slice(left.as_bytes());
            buf[32..].copy_from_slice(right.as_bytes());
            next.push(Hash256::of(&buf));
        }
        level = next;
    }
    level[0]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_roundtrip() {
        let hash = Hash256::of(b"meridian");
        let parsed: Hash256 = hash.to_hex().parse().unwrap();
        assert_eq!(hash, parsed);
    }

    #[test]
    fn test_serde_json_roundtrip() {
        let hash = Hash256::of(b"config");
        let json = serde_json::to_string(&hash).unwrap();
        let back: Hash256 = serde_json::from_str(&json).unwrap();
        assert_eq!(hash, back);
    }

    #[test]
    fn test_from_slice_rejects_wrong_length() {
        let err = Hash256::from_slice(&[1u8; 31]).unwrap_err();
        assert_eq!(
            err,
            HexError::InvalidLength {
                expected: 32,
                actual: 31
            }
        );
        assert!(ProgramHash::from_slice(&[0u8; 21]).is_err());
    }

    #[test]
    fn test_code_hash_is_deterministic() {
        let a = to_code_hash(&[0x51]);
        let b = to_code_hash(&[0x51]);
        let c = to_code_hash(&[0x52]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_sha256_known_vector() {
        // SHA-256("abc")
        assert_eq!(
            hex::encode(sha256(b"abc")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_merkle_root_single_and_empty() {
        let h = Hash256::of(b"tx");
        assert_eq!(compute_merkle_root(&[h]), h);
        assert_eq!(compute_merkle_root(&[]), Hash256::ZERO);
    }

    #[test]
    fn test_merkle_root_odd_duplicates_last() {
        let a = Hash256::of(b"a");
        let b = Hash256::of(b"b");
        let c = Hash256::of(b"c");
        let three = compute_merkle_root(&[a, b, c]);
        let four = compute_merkle_root(&[a, b, c, c]);
        assert_eq!(three, four);
    }
}
