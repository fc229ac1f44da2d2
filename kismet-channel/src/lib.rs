// SPDX-License-Identifier: Apache-2.0

//! Cross-PHY channel/frequency activity aggregation (spec.md §4.9).
//!
//! The chain registers a packet-stage handler that feeds layer-1 info
//! (channel token, frequency, signal, source MAC) into a [`ChannelTracker`]
//! entry per channel. Device-count RRDs are populated by a distinct-MAC
//! counter rather than a plain sum, since a channel with one chatty device
//! and a channel with fifty quiet ones should not read the same.

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

use std::collections::HashMap;
use std::sync::Mutex;

use kismet_common::{Mac, MutexExt};
use kismet_rrd::{DistinctPerSecond, Extreme, Rrd, Sum};

/// One channel's or frequency's accumulated activity.
pub struct ChannelEntry {
    pub packets: Rrd<Sum>,
    pub bytes: Rrd<Sum>,
    pub signal: Rrd<Extreme>,
    devices: DistinctPerSecond<Mac>,
}

impl ChannelEntry {
    fn new() -> Self {
        ChannelEntry {
            packets: Rrd::new(),
            bytes: Rrd::new(),
            signal: Rrd::new(),
            devices: DistinctPerSecond::new(),
        }
    }

    pub fn active_devices(&self) -> &Rrd<Sum> {
        self.devices.rrd()
    }
}

struct Inner {
    by_token: HashMap<String, ChannelEntry>,
    by_frequency: HashMap<u64, ChannelEntry>,
}

/// One observation of a packet on a channel, as reported by layer-1 info.
pub struct ChannelObservation<'a> {
    pub timestamp: u64,
    pub channel: &'a str,
    pub frequency_khz: u64,
    pub signal_dbm: f64,
    pub bytes: u64,
    pub source: Mac,
}

/// Dual-indexed registry of channel activity: by opaque channel token
/// (e.g. `"6HT40-"`) and by numeric frequency, since some PHYs (BLE) only
/// ever report the latter.
pub struct ChannelTracker {
    inner: Mutex<Inner>,
}

impl ChannelTracker {
    pub fn new() -> Self {
        ChannelTracker {
            inner: Mutex::new(Inner {
                by_token: HashMap::new(),
                by_frequency: HashMap::new(),
            }),
        }
    }

    pub fn observe(&self, obs: &ChannelObservation<'_>) {
        let mut inner = self.inner.lock_or_panic();
        let token_entry = inner
            .by_token
            .entry(obs.channel.to_string())
            .or_insert_with(ChannelEntry::new);
        token_entry.packets.update(obs.timestamp, 1.0);
        token_entry.bytes.update(obs.timestamp, obs.bytes as f64);
        token_entry.signal.update(obs.timestamp, obs.signal_dbm);
        token_entry.devices.observe(obs.timestamp, obs.source);

        let freq_entry = inner
            .by_frequency
            .entry(obs.frequency_khz)
            .or_insert_with(ChannelEntry::new);
        freq_entry.packets.update(obs.timestamp, 1.0);
        freq_entry.bytes.update(obs.timestamp, obs.bytes as f64);
        freq_entry.signal.update(obs.timestamp, obs.signal_dbm);
        freq_entry.devices.observe(obs.timestamp, obs.source);
    }

    /// Forces the distinct-device counters to flush their in-flight second;
    /// called by the dirty-publish task before a snapshot is served.
    pub fn flush(&self) {
        let mut inner = self.inner.lock_or_panic();
        for entry in inner.by_token.values_mut() {
            entry.devices.flush_current();
        }
        for entry in inner.by_frequency.values_mut() {
            entry.devices.flush_current();
        }
    }

    pub fn with_token<R>(&self, token: &str, f: impl FnOnce(&ChannelEntry) -> R) -> Option<R> {
        self.inner.lock_or_panic().by_token.get(token).map(f)
    }

    pub fn with_frequency<R>(&self, freq: u64, f: impl FnOnce(&ChannelEntry) -> R) -> Option<R> {
        self.inner.lock_or_panic().by_frequency.get(&freq).map(f)
    }

    pub fn token_count(&self) -> usize {
        self.inner.lock_or_panic().by_token.len()
    }
}

impl Default for ChannelTracker {
    fn default() -> Self {
        Self::new()
    }
}
