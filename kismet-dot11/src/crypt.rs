// SPDX-License-Identifier: Apache-2.0

//! `Cryptset`: a bitmask summarizing every encryption mechanism observed
//! for a device or SSID (spec.md §4.7). The string form is a presentation
//! concern left to the API layer (`kismet-api`), not this crate.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cryptset(u32);

impl Cryptset {
    pub const NONE: Cryptset = Cryptset(0);
    pub const WEP: Cryptset = Cryptset(1 << 0);
    pub const WEP40: Cryptset = Cryptset(1 << 1);
    pub const WEP104: Cryptset = Cryptset(1 << 2);
    pub const WPA: Cryptset = Cryptset(1 << 3);
    pub const WPA_PSK: Cryptset = Cryptset(1 << 4);
    pub const WPA_EAP: Cryptset = Cryptset(1 << 5);
    pub const WPA_PEAP: Cryptset = Cryptset(1 << 6);
    pub const WPA_LEAP: Cryptset = Cryptset(1 << 7);
    pub const WPA_TTLS: Cryptset = Cryptset(1 << 8);
    pub const WPA_TLS: Cryptset = Cryptset(1 << 9);
    pub const WPA_MIGMODE: Cryptset = Cryptset(1 << 10);
    pub const TKIP: Cryptset = Cryptset(1 << 11);
    pub const AES_OCB: Cryptset = Cryptset(1 << 12);
    pub const AES_CCM: Cryptset = Cryptset(1 << 13);
    pub const WPS: Cryptset = Cryptset(1 << 14);
    pub const ISAKMP: Cryptset = Cryptset(1 << 15);
    pub const PPTP: Cryptset = Cryptset(1 << 16);
    pub const FORTRESS: Cryptset = Cryptset(1 << 17);
    pub const KEYGUARD: Cryptset = Cryptset(1 << 18);
    pub const UNKNOWN: Cryptset = Cryptset(1 << 19);

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn from_bits(bits: u32) -> Self {
        Cryptset(bits)
    }

    pub fn union(self, other: Cryptset) -> Cryptset {
        Cryptset(self.0 | other.0)
    }

    pub fn contains(self, flag: Cryptset) -> bool {
        self.0 & flag.0 == flag.0
    }

    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for Cryptset {
    type Output = Cryptset;
    fn bitor(self, rhs: Cryptset) -> Cryptset {
        self.union(rhs)
    }
}

impl std::ops::BitOrAssign for Cryptset {
    fn bitor_assign(&mut self, rhs: Cryptset) {
        *self = self.union(rhs);
    }
}

/// RSN/WPA cipher suite selector bytes, last octet of the IEEE OUI
/// `00-0F-AC` suite (802.11-2020 Table 9-149), used to fold an RSN IE's
/// pairwise/group cipher list into a `Cryptset`.
pub fn cryptset_from_rsn_cipher_suite(suite_type: u8) -> Cryptset {
    match suite_type {
        1 => Cryptset::WEP40,
        2 => Cryptset::TKIP,
        4 => Cryptset::AES_CCM,
        5 => Cryptset::WEP104,
        _ => Cryptset::UNKNOWN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_combines_independent_bits() {
        let c = Cryptset::WPA | Cryptset::TKIP;
        assert!(c.contains(Cryptset::WPA));
        assert!(c.contains(Cryptset::TKIP));
        assert!(!c.contains(Cryptset::WEP));
    }

    #[test]
    fn default_is_none() {
        assert!(Cryptset::default().is_none());
    }

    #[test]
    fn rsn_suite_type_maps_known_ciphers() {
        assert_eq!(cryptset_from_rsn_cipher_suite(4), Cryptset::AES_CCM);
        assert_eq!(cryptset_from_rsn_cipher_suite(2), Cryptset::TKIP);
        assert_eq!(cryptset_from_rsn_cipher_suite(200), Cryptset::UNKNOWN);
    }
}
