//! Content-addressed 20-byte identifier for commits, trees, and blobs (spec §3.1).

use std::fmt;

/// A 20-byte content identifier. Compares by bytes; the all-zero value is
/// the sentinel "no hash" used by callers that need an `Option`-free
/// default (e.g. a `Change::Insert` entry has no `from` hash).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Hash([u8; 20]);

impl Hash {
    pub const ZERO: Hash = Hash([0u8; 20]);

    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Hash(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Parses a 40-character lowercase hex string.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Hash(bytes))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self.to_hex())
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl serde::Serialize for Hash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> serde::Deserialize<'de> for Hash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Hash::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_sentinel() {
        assert!(Hash::ZERO.is_zero());
        assert!(Hash::default().is_zero());
    }

    #[test]
    fn hex_round_trips() {
        let h = Hash::from_bytes([7u8; 20]);
        let s = h.to_hex();
        assert_eq!(Hash::from_hex(&s).unwrap(), h);
    }

    #[test]
    fn orders_lexicographically_by_bytes() {
        let a = Hash::from_bytes([1u8; 20]);
        let b = Hash::from_bytes([2u8; 20]);
        assert!(a < b);
    }

    #[test]
    fn json_round_trip() {
        let h = Hash::from_bytes([9u8; 20]);
        let json = serde_json::to_string(&h).unwrap();
        let back: Hash = serde_json::from_str(&json).unwrap();
        assert_eq!(h, back);
    }
}
