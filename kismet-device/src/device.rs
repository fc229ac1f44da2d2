// SPDX-License-Identifier: Apache-2.0

//! A single tracked device and the fields common to every PHY (spec.md
//! §4.2's "Device" type).

use std::any::Any;
use std::collections::HashSet;

use kismet_common::{DeviceKey, Mac, Phy};
use kismet_rrd::{Extreme, Fix, LocationAggregator, Rrd};
use uuid::Uuid;

#[derive(Debug, Default, Clone, Copy)]
pub struct PacketCounters {
    pub total: u64,
    pub data: u64,
    pub crypt: u64,
    pub error: u64,
}

/// A PHY-specific extension is attached through this opaque slot rather
/// than a typed field, so `kismet-device` never depends on `kismet-dot11`
/// (a dependency cycle would otherwise form, since dot11 looks devices up
/// in the registry it would need to know the concrete type of).
pub type PhyExtension = Box<dyn Any + Send>;

pub struct Device {
    pub key: DeviceKey,
    pub first_seen: u64,
    pub last_seen: u64,
    pub packets: PacketCounters,
    pub data_bytes: u64,
    pub seenby: HashSet<Uuid>,
    pub signal: Rrd<Extreme>,
    pub geo: LocationAggregator,
    pub channel: Option<String>,
    pub frequency_khz: Option<u64>,
    pub manuf: Option<String>,
    pub tags: Vec<(String, String)>,
    pub dirty: bool,
    pub phy_ext: Option<PhyExtension>,
}

impl Device {
    pub fn new(key: DeviceKey, now: u64) -> Self {
        Device {
            key,
            first_seen: now,
            last_seen: now,
            packets: PacketCounters::default(),
            data_bytes: 0,
            seenby: HashSet::new(),
            signal: Rrd::new(),
            geo: LocationAggregator::new(),
            channel: None,
            frequency_khz: None,
            manuf: crate::oui::lookup(&key.mac).map(String::from),
            tags: Vec::new(),
            dirty: true,
            phy_ext: None,
        }
    }

    pub fn mac(&self) -> Mac {
        self.key.mac
    }

    pub fn phy(&self) -> Phy {
        self.key.phy
    }

    pub fn observe_packet(&mut self, now: u64, source: Uuid, is_data: bool, is_crypt: bool) {
        self.last_seen = now;
        self.packets.total += 1;
        if is_data {
            self.packets.data += 1;
        }
        if is_crypt {
            self.packets.crypt += 1;
        }
        self.seenby.insert(source);
        self.dirty = true;
    }

    pub fn observe_error(&mut self, now: u64) {
        self.last_seen = now;
        self.packets.error += 1;
        self.dirty = true;
    }

    pub fn observe_data_bytes(&mut self, bytes: u64) {
        self.data_bytes += bytes;
        self.dirty = true;
    }

    pub fn observe_signal(&mut self, now: u64, dbm: f64) {
        self.signal.update(now, dbm);
        self.dirty = true;
    }

    pub fn observe_location(&mut self, fix: Fix) {
        self.geo.observe(fix);
        self.dirty = true;
    }

    pub fn observe_channel(&mut self, channel: String, frequency_khz: u64) {
        self.channel = Some(channel);
        self.frequency_khz = Some(frequency_khz);
        self.dirty = true;
    }

    pub fn set_tag(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        if let Some(existing) = self.tags.iter_mut().find(|(k, _)| *k == key) {
            existing.1 = value.into();
        } else {
            self.tags.push((key, value.into()));
        }
        self.dirty = true;
    }

    pub fn is_reapable(&self, now: u64, max_age_secs: u64, keep_threshold: u64) -> bool {
        let age_limit = now.saturating_sub(max_age_secs);
        self.last_seen < age_limit && self.packets.total < keep_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn key() -> DeviceKey {
        DeviceKey::new(Mac::from_str("AA:BB:CC:DD:EE:FF").unwrap(), Phy::Dot11).unwrap()
    }

    #[test]
    fn new_device_starts_dirty_and_self_consistent_timestamps() {
        let d = Device::new(key(), 100);
        assert!(d.dirty);
        assert_eq!(d.first_seen, 100);
        assert_eq!(d.last_seen, 100);
    }

    #[test]
    fn observe_packet_tracks_counters_and_seenby() {
        let mut d = Device::new(key(), 0);
        let src = Uuid::nil();
        d.observe_packet(5, src, true, false);
        d.observe_packet(6, src, false, true);
        assert_eq!(d.packets.total, 2);
        assert_eq!(d.packets.data, 1);
        assert_eq!(d.packets.crypt, 1);
        assert_eq!(d.last_seen, 6);
        assert_eq!(d.seenby.len(), 1);
    }

    #[test]
    fn reap_policy_requires_both_age_and_low_traffic() {
        let mut d = Device::new(key(), 0);
        d.last_seen = 0;
        d.packets.total = 0;
        assert!(d.is_reapable(10_000, 3600, 0));
        d.packets.total = 1_000_000;
        assert!(!d.is_reapable(10_000, 3600, 0));
    }

    #[test]
    fn set_tag_updates_existing_key_in_place() {
        let mut d = Device::new(key(), 0);
        d.set_tag("note", "first");
        d.set_tag("note", "second");
        assert_eq!(d.tags.len(), 1);
        assert_eq!(d.tags[0].1, "second");
    }
}
