//! Immutable script text with content-addressed identity

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;

/// A 32-byte content hash (Blake3) of script text
///
/// Used for log correlation and duplicate detection across regeneration
/// attempts. Immutable and cheap to clone (Copy).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScriptHash([u8; 32]);

impl ScriptHash {
    /// Compute the Blake3 hash of arbitrary data
    #[inline]
    #[must_use]
    pub fn compute(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Get reference to the underlying bytes
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Short string representation (first 16 hex chars)
    #[inline]
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl Display for ScriptHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for ScriptHash {
    type Err = ScriptHashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 32 {
            return Err(ScriptHashError::InvalidLength(bytes.len()));
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl serde::Serialize for ScriptHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for ScriptHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Errors when parsing a script hash from its hex form
#[derive(Debug, thiserror::Error)]
pub enum ScriptHashError {
    /// Hex decoding failed
    #[error("hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),

    /// Decoded byte length is not 32
    #[error("invalid hash length: expected 32, got {0}")]
    InvalidLength(usize),
}

/// Immutable script text, the candidate model description
///
/// A `Script` is never mutated; each regeneration attempt produces a new
/// value. Equality is content equality (compared by hash).
#[derive(Debug, Clone)]
pub struct Script {
    text: Arc<str>,
    hash: ScriptHash,
}

impl Script {
    /// Create a script from source text
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        let text: Arc<str> = Arc::from(text.into());
        let hash = ScriptHash::compute(text.as_bytes());
        Self { text, hash }
    }

    /// The script source text
    #[inline]
    #[must_use]
    pub fn source(&self) -> &str {
        &self.text
    }

    /// Content hash of the source text
    #[inline]
    #[must_use]
    pub fn hash(&self) -> ScriptHash {
        self.hash
    }

    /// Source length in bytes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Whether the script is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

impl PartialEq for Script {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for Script {}

impl Display for Script {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl From<&str> for Script {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl serde::Serialize for Script {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.text)
    }
}

impl<'de> serde::Deserialize<'de> for Script {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::new(s))
    }
}
