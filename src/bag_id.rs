use std::fmt;
use std::str::FromStr;

/// A canonical, lowercase, 64-hex-character bag identifier.
///
/// Cache keys, single-flight keys and log lines all go through this type so
/// that the same bag is never tracked under two different casings.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BagId([u8; 32]);

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid bag id: expected 64 hex characters, got {0:?}")]
pub struct InvalidBagId(String);

impl BagId {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl FromStr for BagId {
    type Err = InvalidBagId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 64 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(InvalidBagId(s.to_string()));
        }
        let mut out = [0u8; 32];
        hex::decode_to_slice(s.to_ascii_lowercase(), &mut out)
            .map_err(|_| InvalidBagId(s.to_string()))?;
        Ok(BagId(out))
    }
}

impl fmt::Display for BagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for BagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BagId({})", self)
    }
}
