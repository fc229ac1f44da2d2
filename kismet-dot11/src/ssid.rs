// SPDX-License-Identifier: Apache-2.0

//! The SSID record (spec.md §3, §4.7): keyed inside its parent device by a
//! CRC32 of the SSID bytes plus the advertising frame type, so the same
//! network name advertised by beacon and by probe-response gets distinct
//! entries (a cloaked beacon and its later-revealed probe-response are not
//! conflated).

use crate::crypt::Cryptset;
use crate::ie::CountryRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SsidType {
    Beacon,
    ProbeResponse,
    ProbeRequest,
}

impl SsidType {
    fn discriminant(self) -> u8 {
        match self {
            SsidType::Beacon => 0,
            SsidType::ProbeResponse => 1,
            SsidType::ProbeRequest => 2,
        }
    }
}

/// `crc32(ssid_bytes, ssid_type)` (spec.md invariant 5): the SSID bytes
/// followed by the type discriminant, folded through one CRC32 run so the
/// same name under a different advertising type checksums differently.
pub fn ssid_checksum(ssid: &[u8], ssid_type: SsidType) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(ssid);
    hasher.update(&[ssid_type.discriminant()]);
    hasher.finalize()
}

#[derive(Debug, Clone, PartialEq)]
pub struct SsidRecord {
    pub checksum: u32,
    pub ssid: Vec<u8>,
    pub ssid_type: SsidType,
    pub cloaked: bool,
    pub cryptset: Cryptset,
    pub first_time: u64,
    pub last_time: u64,
    pub beacon_count: u64,
    pub beacon_rate: Option<u32>,
    pub channel: Option<u8>,
    pub country_code: Option<[u8; 2]>,
    pub country_ranges: Vec<CountryRange>,
}

impl SsidRecord {
    pub fn new(ssid: &[u8], ssid_type: SsidType, cryptset: Cryptset, now: u64) -> Self {
        SsidRecord {
            checksum: ssid_checksum(ssid, ssid_type),
            ssid: ssid.to_vec(),
            ssid_type,
            cloaked: ssid.is_empty(),
            cryptset,
            first_time: now,
            last_time: now,
            beacon_count: 0,
            beacon_rate: None,
            channel: None,
            country_code: None,
            country_ranges: Vec::new(),
        }
    }

    /// Folds in another observation of the same (ssid, type) pair: bumps
    /// the beacon counter, extends `last_time`, and refreshes channel and
    /// beacon rate. `beacon_rate` is left unchanged when `None` (not every
    /// frame carries a supported-rates IE).
    pub fn observe_beacon(&mut self, now: u64, channel: u8, beacon_rate: Option<u32>) {
        self.beacon_count += 1;
        self.last_time = now;
        self.channel = Some(channel);
        if beacon_rate.is_some() {
            self.beacon_rate = beacon_rate;
        }
    }

    pub fn set_country(&mut self, code: [u8; 2], ranges: Vec<CountryRange>) {
        self.country_code = Some(code);
        self.country_ranges = ranges;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_differs_by_advertising_type() {
        let beacon = ssid_checksum(b"kismet", SsidType::Beacon);
        let probe = ssid_checksum(b"kismet", SsidType::ProbeResponse);
        assert_ne!(beacon, probe);
    }

    #[test]
    fn checksum_is_deterministic() {
        let a = ssid_checksum(b"kismet", SsidType::Beacon);
        let b = ssid_checksum(b"kismet", SsidType::Beacon);
        assert_eq!(a, b);
    }

    #[test]
    fn empty_ssid_is_marked_cloaked() {
        let rec = SsidRecord::new(b"", SsidType::Beacon, Cryptset::NONE, 0);
        assert!(rec.cloaked);
    }

    #[test]
    fn observe_beacon_increments_counter_and_updates_channel() {
        let mut rec = SsidRecord::new(b"kismet", SsidType::Beacon, Cryptset::NONE, 10);
        rec.observe_beacon(11, 6, None);
        rec.observe_beacon(12, 6, None);
        assert_eq!(rec.beacon_count, 2);
        assert_eq!(rec.last_time, 12);
        assert_eq!(rec.channel, Some(6));
    }

    #[test]
    fn observe_beacon_updates_beacon_rate_and_keeps_it_on_later_omission() {
        let mut rec = SsidRecord::new(b"kismet", SsidType::Beacon, Cryptset::NONE, 10);
        rec.observe_beacon(11, 6, Some(1000));
        assert_eq!(rec.beacon_rate, Some(1000));
        rec.observe_beacon(12, 6, None);
        assert_eq!(rec.beacon_rate, Some(1000));
    }
}
