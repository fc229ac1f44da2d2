// SPDX-License-Identifier: Apache-2.0

//! `kismet.device.base.*` / `kismet.dot11.*` JSON projections (spec.md §6:
//! `/devices/views/phydot11/devices.json`, `/devices/by-key/{key}/device.json`).

use kismet_device::DeviceSnapshot;
use kismet_dot11::{Dot11DeviceState, TypeSet};

use crate::value::{rrd_element, TrackedElement};

/// Projects a device snapshot (plus its 802.11 sub-state, if any) into the
/// dotted-namespace shape `kis_net_microhttpd_handlers.cc` uses for
/// `kismet.device.base.*` fields.
pub fn device_json(snapshot: &DeviceSnapshot, dot11: Option<&Dot11DeviceState>, signal: &kismet_rrd::Rrd<kismet_rrd::Extreme>) -> serde_json::Value {
    let mut map = TrackedElement::map();
    map.insert("kismet.device.base.macaddr".to_string(), snapshot.key.mac.into());
    map.insert(
        "kismet.device.base.phyname".to_string(),
        TrackedElement::String(snapshot.key.phy.to_string()),
    );
    map.insert("kismet.device.base.first_time".to_string(), TrackedElement::U64(snapshot.first_seen));
    map.insert("kismet.device.base.last_time".to_string(), TrackedElement::U64(snapshot.last_seen));
    map.insert("kismet.device.base.packets.total".to_string(), TrackedElement::U64(snapshot.packets.total));
    map.insert("kismet.device.base.packets.data".to_string(), TrackedElement::U64(snapshot.packets.data));
    map.insert("kismet.device.base.packets.crypt".to_string(), TrackedElement::U64(snapshot.packets.crypt));
    map.insert("kismet.device.base.packets.error".to_string(), TrackedElement::U64(snapshot.packets.error));
    map.insert("kismet.device.base.datasize".to_string(), TrackedElement::U64(snapshot.data_bytes));
    map.insert("kismet.device.base.seenby_count".to_string(), TrackedElement::U64(snapshot.seenby_count as u64));
    map.insert("kismet.device.base.channel".to_string(), snapshot.channel.clone().into());
    map.insert("kismet.device.base.freq_khz".to_string(), snapshot.frequency_khz.into());
    map.insert("kismet.device.base.manuf".to_string(), snapshot.manuf.clone().into());
    map.insert("kismet.common.signal.signal_rrd".to_string(), rrd_element(signal));

    if let Some(dot11) = dot11 {
        map.insert("kismet.device.base.type".to_string(), TrackedElement::String(
            if dot11.type_set.contains(TypeSet::AP) { "AP".to_string() } else { "client".to_string() },
        ));
        map.insert(
            "kismet.dot11.device.cryptset".to_string(),
            TrackedElement::String(crate::crypt::cryptset_to_string(
                dot11.tx_cryptset.union(dot11.rx_cryptset),
            )),
        );
        map.insert(
            "kismet.dot11.device.num_ssids".to_string(),
            TrackedElement::U64(dot11.ssid_map.len() as u64),
        );
        map.insert(
            "kismet.dot11.device.num_client".to_string(),
            TrackedElement::U64(dot11.client_map.len() as u64),
        );
    }

    TrackedElement::Map(map).to_json()
}

/// `/devices/views/phydot11/devices.json`.
pub fn devices_view_json(snapshots: &[DeviceSnapshot]) -> serde_json::Value {
    serde_json::Value::Array(
        snapshots
            .iter()
            .map(|s| device_json(s, None, &Default::default()))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use kismet_common::{DeviceKey, Mac, Phy};
    use kismet_device::PacketCounters;
    use std::str::FromStr;

    fn snapshot() -> DeviceSnapshot {
        DeviceSnapshot {
            key: DeviceKey::new(Mac::from_str("02:11:22:33:44:55").unwrap(), Phy::Dot11).unwrap(),
            first_seen: 10,
            last_seen: 20,
            packets: PacketCounters { total: 5, data: 2, crypt: 0, error: 0 },
            data_bytes: 1024,
            seenby_count: 1,
            channel: Some("6".to_string()),
            frequency_khz: Some(2_437_000),
            manuf: None,
        }
    }

    #[test]
    fn device_json_carries_dotted_field_names() {
        let json = device_json(&snapshot(), None, &Default::default());
        assert_eq!(json["kismet.device.base.macaddr"], "02:11:22:33:44:55");
        assert_eq!(json["kismet.device.base.packets.total"], 5);
        assert_eq!(json["kismet.device.base.channel"], "6");
    }
}
