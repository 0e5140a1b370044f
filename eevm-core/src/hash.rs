//! Keccak-256 digests for content addressing of code.

use std::fmt;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::Digest as _;

/// Keccak-256 digest length in bytes.
pub const HASH_LEN: usize = 32;

/// A hashing capability producing fixed-size digests.
pub trait Hasher {
    type Digest: Eq + fmt::Debug;

    fn hash(&self, data: &[u8]) -> Self::Digest;
}

/// The original Keccak-256 used by Ethereum (not the NIST SHA3-256 padding).
#[derive(Debug, Clone, Copy, Default)]
pub struct Keccak256Hasher;

impl Hasher for Keccak256Hasher {
    type Digest = Keccak256;

    fn hash(&self, data: &[u8]) -> Keccak256 {
        Keccak256::digest(data)
    }
}

/// Fixed-size 32-byte Keccak-256 digest. The default value is all zeros.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Hash, Ord, PartialOrd)]
pub struct Keccak256(pub [u8; HASH_LEN]);

impl Keccak256 {
    pub fn zero() -> Self {
        Self([0u8; HASH_LEN])
    }

    pub fn digest(data: &[u8]) -> Self {
        Self(sha3::Keccak256::digest(data).into())
    }

    /// Hash of `data` with the first `skip` bytes dropped.
    pub fn from_skip(data: &[u8], skip: usize) -> Self {
        Self::digest(&data[skip.min(data.len())..])
    }

    /// Copies up to [`HASH_LEN`] bytes into an otherwise zeroed digest.
    pub fn from_slice(bytes: &[u8]) -> Self {
        let mut hash = [0u8; HASH_LEN];
        let n = bytes.len().min(HASH_LEN);
        hash[..n].copy_from_slice(&bytes[..n]);
        Self(hash)
    }

    /// Parse 64 hex digits, with or without a `0x` prefix.
    ///
    /// An empty string is the zero digest.
    pub fn from_hex(s: &str) -> Result<Self> {
        let s = s.trim();
        let s = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        if s.is_empty() {
            return Ok(Self::zero());
        }
        if s.len() != HASH_LEN * 2 {
            bail!(
                "digest must be {} hex digits, got {}",
                HASH_LEN * 2,
                s.len()
            );
        }
        let mut hash = [0u8; HASH_LEN];
        hex::decode_to_slice(s, &mut hash).with_context(|| format!("invalid digest {:?}", s))?;
        Ok(Self(hash))
    }

    /// Lowercase hex without prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }
}

impl fmt::Display for Keccak256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl AsRef<[u8]> for Keccak256 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for Keccak256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Keccak256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Keccak256::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPTY: &str = "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470";

    #[test]
    fn empty_input() {
        assert_eq!(Keccak256Hasher.hash(&[]).to_hex(), EMPTY);
    }

    #[test]
    fn hex_is_lowercase_and_fixed_width() {
        let hex = Keccak256::digest(b"hello").to_hex();
        assert_eq!(hex.len(), HASH_LEN * 2);
        assert_eq!(hex, hex.to_lowercase());
        assert_eq!(
            hex,
            "1c8aff950685c2ed4bc3174f3472287b56d9517b9c948127319a09a7a36deac8"
        );
    }

    #[test]
    fn hex_round_trip() {
        let h = Keccak256::digest(b"\x60\x01\x60\x02\x01");
        assert_eq!(Keccak256::from_hex(&h.to_hex()).unwrap(), h);
        assert_eq!(Keccak256::from_hex(&h.to_string()).unwrap(), h);
        assert_eq!(Keccak256::from_hex(&format!("  {}\n", h)).unwrap(), h);
    }

    #[test]
    fn empty_hex_is_zero() {
        let h = Keccak256::from_hex("").unwrap();
        assert_eq!(h, Keccak256::default());
        assert!(h.is_zero());
        assert!(Keccak256::from_hex("0x").unwrap().is_zero());
    }

    #[test]
    fn bad_hex() {
        assert!(Keccak256::from_hex("abc").is_err());
        assert!(Keccak256::from_hex(&"zz".repeat(HASH_LEN)).is_err());
    }

    #[test]
    fn skip_and_slice() {
        assert_eq!(Keccak256::from_skip(b"xxabc", 2), Keccak256::digest(b"abc"));
        assert_eq!(Keccak256::from_skip(b"abc", 10).to_hex(), EMPTY);

        let h = Keccak256::from_slice(&[1, 2, 3]);
        assert_eq!(&h.0[..3], &[1, 2, 3]);
        assert!(h.0[3..].iter().all(|b| *b == 0));
    }

    #[test]
    fn serde_as_hex_string() {
        let h = Keccak256::digest(&[]);
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json, format!("\"0x{}\"", EMPTY));
        let back: Keccak256 = serde_json::from_str(&json).unwrap();
        assert_eq!(back, h);
    }
}
