// SPDX-License-Identifier: Apache-2.0

//! `kismet.channelrec.*` JSON projection (spec.md §6: `/channels/channels.json`).

use kismet_channel::ChannelEntry;

use crate::value::{rrd_element, TrackedElement};

pub fn channel_json(token: &str, entry: &ChannelEntry) -> serde_json::Value {
    let mut map = TrackedElement::map();
    map.insert("kismet.channelrec.channel".to_string(), TrackedElement::String(token.to_string()));
    map.insert("kismet.channelrec.packets_rrd".to_string(), rrd_element(&entry.packets));
    map.insert("kismet.channelrec.bytes_rrd".to_string(), rrd_element(&entry.bytes));
    map.insert("kismet.channelrec.signal_rrd".to_string(), rrd_element(&entry.signal));
    map.insert("kismet.channelrec.device_rrd".to_string(), rrd_element(entry.active_devices()));
    TrackedElement::Map(map).to_json()
}

/// `/channels/channels.json`: every tracked channel token, keyed by token.
pub fn channels_json<'a>(entries: impl Iterator<Item = (&'a str, &'a ChannelEntry)>) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    for (token, entry) in entries {
        map.insert(token.to_string(), channel_json(token, entry));
    }
    serde_json::Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kismet_channel::{ChannelObservation, ChannelTracker};
    use kismet_common::Mac;
    use std::str::FromStr;

    #[test]
    fn channels_json_keys_by_token() {
        let tracker = ChannelTracker::new();
        tracker.observe(&ChannelObservation {
            timestamp: 0,
            channel: "6",
            frequency_khz: 2_437_000,
            signal_dbm: -40.0,
            bytes: 100,
            source: Mac::from_str("AA:BB:CC:DD:EE:01").unwrap(),
        });
        let json = tracker.with_token("6", |entry| channels_json(std::iter::once(("6", entry)))).unwrap();
        assert!(json["6"]["kismet.channelrec.packets_rrd"].is_object());
    }
}
