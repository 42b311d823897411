//! Content hashing for store keys

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};

/// Digest algorithm used to key image bytes in the content store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HashAlgorithm {
    #[default]
    Sha512,
    #[cfg(feature = "blake3")]
    Blake3,
}

impl HashAlgorithm {
    pub fn name(self) -> &'static str {
        match self {
            HashAlgorithm::Sha512 => "sha512",
            #[cfg(feature = "blake3")]
            HashAlgorithm::Blake3 => "blake3",
        }
    }

    /// Markup attribute that carries digests of this algorithm
    pub fn attr_name(self) -> &'static str {
        match self {
            HashAlgorithm::Sha512 => "data-sha512",
            #[cfg(feature = "blake3")]
            HashAlgorithm::Blake3 => "data-blake3",
        }
    }

    /// Length of a hex-encoded digest
    pub fn hex_len(self) -> usize {
        match self {
            HashAlgorithm::Sha512 => 128,
            #[cfg(feature = "blake3")]
            HashAlgorithm::Blake3 => 64,
        }
    }

    /// Hex digest of `bytes`
    pub fn digest(self, bytes: &[u8]) -> String {
        match self {
            HashAlgorithm::Sha512 => hex::encode(Sha512::digest(bytes)),
            #[cfg(feature = "blake3")]
            HashAlgorithm::Blake3 => blake3::hash(bytes).to_hex().to_string(),
        }
    }

    /// Whether `hash` is a well-formed lowercase hex digest for this algorithm
    pub fn is_valid_digest(self, hash: &str) -> bool {
        hash.len() == self.hex_len()
            && hash
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    }
}
