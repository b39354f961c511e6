use std::fmt;

use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 digest identifying a content snapshot by value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FingerprintError {
    #[error("expected {expected} hex characters, found {actual}")]
    Length { expected: usize, actual: usize },
    #[error("invalid hex character {0:?}")]
    NotHex(char),
}

impl Fingerprint {
    /// Length of the hex encoding of a SHA-256 digest.
    pub const HEX_LEN: usize = 64;

    /// Parse a persisted fingerprint. Surrounding whitespace is ignored and
    /// uppercase hex is normalised to lowercase.
    pub fn parse(raw: &str) -> Result<Self, FingerprintError> {
        let trimmed = raw.trim();
        if trimmed.len() != Self::HEX_LEN {
            return Err(FingerprintError::Length {
                expected: Self::HEX_LEN,
                actual: trimmed.len(),
            });
        }
        if let Some(bad) = trimmed.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(FingerprintError::NotHex(bad));
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First eight hex characters, for log lines.
    pub fn short(&self) -> &str {
        &self.0[..8]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Digest a content snapshot. Empty content is a valid snapshot.
pub fn digest(content: &[u8]) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(content);
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(Fingerprint::HEX_LEN);
    for byte in digest.iter() {
        use std::fmt::Write;
        let _ = write!(&mut hex, "{byte:02x}");
    }
    Fingerprint(hex)
}
