//! SHA-256 address anonymizer.

use sha2::{Digest, Sha256};

use crate::domain::MacAddress;
use crate::port::Anonymizer;

/// Hashes the six address bytes with SHA-256 and keeps the first 16 digest
/// bytes as 32 lowercase hex characters.
///
/// Unsalted, so the same device maps to the same identifier on every node
/// and across restarts.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Anonymizer;

impl Sha256Anonymizer {
    /// Number of digest bytes kept.
    pub const DIGEST_BYTES: usize = 16;

    /// Create a new anonymizer.
    pub fn new() -> Self {
        Self
    }
}

impl Anonymizer for Sha256Anonymizer {
    fn anonymize(&self, address: &MacAddress) -> String {
        let digest = Sha256::digest(address.as_bytes());
        hex::encode(&digest[..Self::DIGEST_BYTES])
    }
}
