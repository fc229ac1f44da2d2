// SPDX-License-Identifier: Apache-2.0

//! The concurrent device store (spec.md §4.6).
//!
//! Design Notes §9 flags that the legacy implementation reaches for a
//! recursive mutex because the same call both updates a device and marks
//! it dirty as one logical operation. We avoid needing recursion at all:
//! [`DeviceRegistry::mutate`] takes the lock exactly once and performs the
//! update and the dirty-set insertion inside that single critical section,
//! so there is never a nested acquisition to begin with. Reads use
//! [`DeviceRegistry::snapshot`], which copies the fields it needs out from
//! under the lock and releases it before the caller does anything with
//! them — a long-running API response never holds the registry lock.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crossbeam_channel::{Receiver, Sender};
use kismet_common::{DeviceKey, MutexExt, Phy};

use crate::device::{Device, PacketCounters};

/// A point-in-time copy of the externally visible fields of a [`Device`],
/// safe to hold and serialize without the registry lock.
#[derive(Debug, Clone)]
pub struct DeviceSnapshot {
    pub key: DeviceKey,
    pub first_seen: u64,
    pub last_seen: u64,
    pub packets: PacketCounters,
    pub data_bytes: u64,
    pub seenby_count: usize,
    pub channel: Option<String>,
    pub frequency_khz: Option<u64>,
    pub manuf: Option<String>,
}

impl From<&Device> for DeviceSnapshot {
    fn from(d: &Device) -> Self {
        DeviceSnapshot {
            key: d.key,
            first_seen: d.first_seen,
            last_seen: d.last_seen,
            packets: d.packets,
            data_bytes: d.data_bytes,
            seenby_count: d.seenby.len(),
            channel: d.channel.clone(),
            frequency_khz: d.frequency_khz,
            manuf: d.manuf.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum DeviceEvent {
    Removed(DeviceKey),
}

/// Per-phy packet and dissector-error totals, summed across every tracked
/// device under that phy (spec.md `original_source/` supplement: the
/// legacy devicetracker's error accounting, preserved as a summary rather
/// than the original's full per-phy class hierarchy).
#[derive(Debug, Clone, Copy, Default)]
pub struct PhyStats {
    pub devices: u64,
    pub packets: u64,
    pub dissector_errors: u64,
}

#[derive(Debug, Clone, Default)]
pub struct TrackerStats {
    pub packets_by_phy: HashMap<Phy, PhyStats>,
}

impl TrackerStats {
    pub fn dissector_errors_by_phy(&self, phy: Phy) -> u64 {
        self.packets_by_phy.get(&phy).map_or(0, |s| s.dissector_errors)
    }
}

struct Inner {
    devices: HashMap<DeviceKey, Device>,
    dirty: HashSet<DeviceKey>,
    by_phy: HashMap<Phy, HashSet<DeviceKey>>,
}

pub struct DeviceRegistry {
    inner: Mutex<Inner>,
    subscribers: Mutex<Vec<Sender<DeviceEvent>>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        DeviceRegistry {
            inner: Mutex::new(Inner {
                devices: HashMap::new(),
                dirty: HashSet::new(),
                by_phy: HashMap::new(),
            }),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Applies `f` to the device for `key`, creating it first (seeded with
    /// `now`) if this is the first observation, then marks it dirty. The
    /// update and the dirty-bit insertion happen under one lock
    /// acquisition.
    pub fn mutate(&self, key: DeviceKey, now: u64, f: impl FnOnce(&mut Device)) {
        let mut inner = self.inner.lock_or_panic();
        let device = inner
            .devices
            .entry(key)
            .or_insert_with(|| Device::new(key, now));
        f(device);
        inner.dirty.insert(key);
        inner.by_phy.entry(key.phy).or_default().insert(key);
    }

    pub fn snapshot(&self, key: &DeviceKey) -> Option<DeviceSnapshot> {
        let inner = self.inner.lock_or_panic();
        inner.devices.get(key).map(DeviceSnapshot::from)
    }

    pub fn snapshot_by_phy(&self, phy: Phy) -> Vec<DeviceSnapshot> {
        let inner = self.inner.lock_or_panic();
        inner
            .by_phy
            .get(&phy)
            .into_iter()
            .flatten()
            .filter_map(|key| inner.devices.get(key).map(DeviceSnapshot::from))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock_or_panic().devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drains the dirty set, returning the keys that changed since the
    /// last call. Called by the periodic view-publish task (spec.md §4.6).
    pub fn take_dirty(&self) -> Vec<DeviceKey> {
        let mut inner = self.inner.lock_or_panic();
        inner.dirty.drain().collect()
    }

    /// Removes every device whose `is_reapable` holds, publishing
    /// `DeviceEvent::Removed` for each to subscribers.
    pub fn reap(&self, now: u64, max_age_secs: u64, keep_threshold: u64) -> Vec<DeviceKey> {
        let removed: Vec<DeviceKey> = {
            let mut inner = self.inner.lock_or_panic();
            let stale: Vec<DeviceKey> = inner
                .devices
                .iter()
                .filter(|(_, d)| d.is_reapable(now, max_age_secs, keep_threshold))
                .map(|(k, _)| *k)
                .collect();
            for key in &stale {
                inner.devices.remove(key);
                inner.dirty.remove(key);
                if let Some(set) = inner.by_phy.get_mut(&key.phy) {
                    set.remove(key);
                }
            }
            stale
        };
        if !removed.is_empty() {
            let subscribers = self.subscribers.lock_or_panic();
            for key in &removed {
                for tx in subscribers.iter() {
                    let _ = tx.send(DeviceEvent::Removed(*key));
                }
            }
        }
        removed
    }

    /// Summarizes packet and dissector-error counts per phy across every
    /// tracked device, for the device tracker summary surfaced by the API.
    pub fn stats(&self) -> TrackerStats {
        let inner = self.inner.lock_or_panic();
        let mut stats = TrackerStats::default();
        for device in inner.devices.values() {
            let entry = stats.packets_by_phy.entry(device.phy()).or_default();
            entry.devices += 1;
            entry.packets += device.packets.total;
            entry.dissector_errors += device.packets.error;
        }
        stats
    }

    pub fn subscribe(&self) -> Receiver<DeviceEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers.lock_or_panic().push(tx);
        rx
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kismet_common::Mac;
    use std::str::FromStr;
    use uuid::Uuid;

    fn key(octet: u8) -> DeviceKey {
        DeviceKey::new(
            Mac::from_str(&format!("AA:BB:CC:DD:EE:{octet:02X}")).unwrap(),
            Phy::Dot11,
        )
        .unwrap()
    }

    #[test]
    fn mutate_creates_and_dirties_device() {
        let reg = DeviceRegistry::new();
        let k = key(1);
        reg.mutate(k, 10, |d| d.observe_packet(10, Uuid::nil(), true, false));
        let snap = reg.snapshot(&k).unwrap();
        assert_eq!(snap.packets.total, 1);
        assert_eq!(reg.take_dirty(), vec![k]);
        assert!(reg.take_dirty().is_empty());
    }

    #[test]
    fn reap_removes_stale_devices_and_notifies_subscribers() {
        let reg = DeviceRegistry::new();
        let rx = reg.subscribe();
        let k = key(2);
        reg.mutate(k, 0, |_| {});
        let removed = reg.reap(100_000, 3600, 0);
        assert_eq!(removed, vec![k]);
        assert_eq!(reg.len(), 0);
        match rx.try_recv().unwrap() {
            DeviceEvent::Removed(removed_key) => assert_eq!(removed_key, k),
        }
    }

    #[test]
    fn snapshot_by_phy_only_returns_matching_phy() {
        let reg = DeviceRegistry::new();
        reg.mutate(key(3), 0, |_| {});
        assert_eq!(reg.snapshot_by_phy(Phy::Dot11).len(), 1);
        assert_eq!(reg.snapshot_by_phy(Phy::Bluetooth).len(), 0);
    }

    #[test]
    fn stats_summarize_packets_and_errors_per_phy() {
        let reg = DeviceRegistry::new();
        let k = key(4);
        reg.mutate(k, 0, |d| d.observe_packet(0, Uuid::nil(), true, false));
        reg.mutate(k, 1, |d| d.observe_error(1));
        let stats = reg.stats();
        let dot11 = stats.packets_by_phy[&Phy::Dot11];
        assert_eq!(dot11.devices, 1);
        assert_eq!(dot11.packets, 1);
        assert_eq!(dot11.dissector_errors, 1);
        assert_eq!(stats.dissector_errors_by_phy(Phy::Bluetooth), 0);
    }
}
