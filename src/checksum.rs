//! Fingerprints of resolved schemas
//!
//! The registry uses these to tell an identical re-declaration (accepted, the
//! existing schema is returned) from an attempt to redefine a type.

use sha2::{Digest, Sha256};
use std::fmt;

/// SHA256 digest of a schema's canonical description
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Checksum(String);

impl Checksum {
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        Self(format!("{:x}", hash))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Self {
        Self::from_bytes(content.as_bytes())
    }

    /// Hex string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex digits, for log lines and listings
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }

    pub fn verify(&self, content: &str) -> bool {
        Self::from_str(content) == *self
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_consistency() {
        let a = Checksum::from_str("Point\n  x: int = 0\n");
        let b = Checksum::from_str("Point\n  x: int = 0\n");
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
        assert_eq!(a.short().len(), 12);
    }

    #[test]
    fn test_checksum_different_content() {
        let a = Checksum::from_str("Point\n  x: int = 0\n");
        let b = Checksum::from_str("Point\n  x: int = 1\n");
        assert_ne!(a, b);
        assert!(a.verify("Point\n  x: int = 0\n"));
        assert!(!a.verify("Point\n"));
    }
}
