// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::str::FromStr;

/// The sentinel value reserved to mean "unparseable/invalid address"
/// (spec.md §3: "A MAC marked `error` is never inserted").
const ERROR_MAC: [u8; 6] = [0xFF; 6];

/// A 48-bit MAC address with an optional mask for OUI-style matching
/// (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub struct Mac {
    bytes: [u8; 6],
    mask: Option<[u8; 6]>,
}

impl Mac {
    pub const fn new(bytes: [u8; 6]) -> Self {
        Mac { bytes, mask: None }
    }

    pub const fn with_mask(bytes: [u8; 6], mask: [u8; 6]) -> Self {
        Mac {
            bytes,
            mask: Some(mask),
        }
    }

    /// The sentinel "error" MAC that `DeviceKey::new` rejects.
    pub const fn error() -> Self {
        Mac::new(ERROR_MAC)
    }

    pub fn is_error(&self) -> bool {
        self.bytes == ERROR_MAC
    }

    pub fn octets(&self) -> [u8; 6] {
        self.bytes
    }

    pub fn mask(&self) -> Option<[u8; 6]> {
        self.mask
    }

    /// OUI-style containment: `self` (used as a masked pattern) contains
    /// `other` if every bit set in `self.mask` agrees between the two
    /// addresses. An unmasked `self` only contains an exact match.
    pub fn contains(&self, other: &Mac) -> bool {
        match self.mask {
            None => self.bytes == other.bytes,
            Some(mask) => (0..6).all(|i| self.bytes[i] & mask[i] == other.bytes[i] & mask[i]),
        }
    }
}

impl fmt::Display for Mac {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = self.bytes;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid MAC address: {0}")]
pub struct MacParseError(String);

impl FromStr for Mac {
    type Err = MacParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 6];
        let parts: Vec<&str> = s.split([':', '-']).collect();
        if parts.len() != 6 {
            return Err(MacParseError(s.to_string()));
        }
        for (i, part) in parts.iter().enumerate() {
            bytes[i] = u8::from_str_radix(part, 16).map_err(|_| MacParseError(s.to_string()))?;
        }
        Ok(Mac::new(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_colon_separated() {
        let mac: Mac = "02:11:22:33:44:55".parse().unwrap();
        assert_eq!(mac.octets(), [0x02, 0x11, 0x22, 0x33, 0x44, 0x55]);
    }

    #[test]
    fn rejects_short_addresses() {
        assert!("02:11:22".parse::<Mac>().is_err());
    }

    #[test]
    fn error_mac_is_flagged() {
        assert!(Mac::error().is_error());
        assert!(!Mac::new([1, 2, 3, 4, 5, 6]).is_error());
    }

    #[test]
    fn oui_mask_contains() {
        let pattern = Mac::with_mask([0x00, 0x11, 0x22, 0, 0, 0], [0xFF, 0xFF, 0xFF, 0, 0, 0]);
        let host: Mac = "00:11:22:AA:BB:CC".parse().unwrap();
        let other: Mac = "00:11:23:AA:BB:CC".parse().unwrap();
        assert!(pattern.contains(&host));
        assert!(!pattern.contains(&other));
    }

    #[test]
    fn unmasked_contains_is_exact_equality() {
        let a: Mac = "00:11:22:33:44:55".parse().unwrap();
        let b: Mac = "00:11:22:33:44:56".parse().unwrap();
        assert!(a.contains(&a));
        assert!(!a.contains(&b));
    }
}
