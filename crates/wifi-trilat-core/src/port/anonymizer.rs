//! Port that turns a raw hardware address into a stable opaque identifier.

use crate::domain::MacAddress;

/// Maps a device address to the identifier published off-device.
///
/// Only called at emission time. The tables always key on the raw address.
///
/// Implementations include:
/// - [`crate::adapter::Sha256Anonymizer`] -- truncated SHA-256, 32 hex chars.
pub trait Anonymizer: Send + Sync {
    /// Return the opaque identifier for `address`.
    ///
    /// Must be deterministic and return the same length for every input.
    fn anonymize(&self, address: &MacAddress) -> String;
}
