// SPDX-License-Identifier: Apache-2.0

//! Manufacturer lookup from the first three octets of a MAC address
//! (spec.md §4.2's "manufacturer lookup string").
//!
//! A real deployment ships the full IEEE OUI table as a data file loaded
//! at startup; this table covers the vendors exercised by the dissector
//! and tests so a device built in-process always resolves to something
//! readable.

use kismet_common::Mac;

struct OuiEntry {
    prefix: [u8; 3],
    name: &'static str,
}

const TABLE: &[OuiEntry] = &[
    OuiEntry { prefix: [0x00, 0x03, 0x93], name: "Apple" },
    OuiEntry { prefix: [0x00, 0x1A, 0x11], name: "Google" },
    OuiEntry { prefix: [0x3C, 0x5A, 0xB4], name: "Google" },
    OuiEntry { prefix: [0x60, 0x60, 0x1F], name: "Cisco-Linksys" },
    OuiEntry { prefix: [0x00, 0x26, 0x37], name: "DJI" },
];

/// Returns the best-known manufacturer name for `mac`, or `None` if the
/// OUI is unrecognized.
pub fn lookup(mac: &Mac) -> Option<&'static str> {
    let octets = mac.octets();
    TABLE
        .iter()
        .find(|entry| entry.prefix[..] == octets[0..3])
        .map(|entry| entry.name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn resolves_known_oui() {
        let mac = Mac::from_str("00:26:37:12:34:56").unwrap();
        assert_eq!(lookup(&mac), Some("DJI"));
    }

    #[test]
    fn unknown_oui_returns_none() {
        let mac = Mac::from_str("DE:AD:BE:EF:00:01").unwrap();
        assert_eq!(lookup(&mac), None);
    }
}
