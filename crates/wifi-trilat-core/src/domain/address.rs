//! Hardware address value object.
//!
//! Tables key on the raw 6 bytes so lookups are a plain array compare. The
//! anonymized form only exists at emission time.

use std::fmt;

use crate::error::AddressError;

/// A 6-byte IEEE 802 hardware address observed over the air.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Default)]
pub struct MacAddress(pub [u8; 6]);

impl MacAddress {
    /// Create a `MacAddress` from a byte slice.
    ///
    /// Returns an error if the slice is not exactly 6 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AddressError> {
        let arr: [u8; 6] = bytes
            .try_into()
            .map_err(|_| AddressError::InvalidLength { len: bytes.len() })?;
        Ok(Self(arr))
    }

    /// Parse a colon-separated hex string such as `"aa:bb:cc:dd:ee:ff"`.
    pub fn parse(s: &str) -> Result<Self, AddressError> {
        let parts: Vec<&str> = s.trim().split(':').collect();
        if parts.len() != 6 {
            return Err(AddressError::ParseFailed {
                input: s.to_owned(),
            });
        }

        let mut bytes = [0u8; 6];
        for (i, part) in parts.iter().enumerate() {
            if part.len() != 2 {
                return Err(AddressError::ParseFailed {
                    input: s.to_owned(),
                });
            }
            bytes[i] = u8::from_str_radix(part, 16).map_err(|_| AddressError::ParseFailed {
                input: s.to_owned(),
            })?;
        }
        Ok(Self(bytes))
    }

    /// Return the raw 6-byte address.
    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }

    /// Whether bit 0 of the first octet (the group bit) is set.
    ///
    /// Group-addressed and randomized frames do not identify a single
    /// device, so both tables refuse them.
    pub fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 != 0
    }

    /// Whether this address can be tracked.
    pub fn is_trackable(&self) -> bool {
        !self.is_multicast()
    }
}

impl From<[u8; 6]> for MacAddress {
    fn from(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MacAddress({self})")
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl std::str::FromStr for MacAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
