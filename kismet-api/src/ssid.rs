// SPDX-License-Identifier: Apache-2.0

//! `kismet.dot11.advertisedssid.*` JSON projection (spec.md §6:
//! `/phy/phy80211/ssids/views.json`).

use kismet_dot11::SsidRecord;

use crate::value::TrackedElement;

pub fn ssid_json(record: &SsidRecord) -> serde_json::Value {
    let mut map = TrackedElement::map();
    map.insert("kismet.dot11.advertisedssid.ssid".to_string(), TrackedElement::String(
        String::from_utf8_lossy(&record.ssid).into_owned(),
    ));
    map.insert("kismet.dot11.advertisedssid.crypt_string".to_string(), TrackedElement::String(
        crate::crypt::cryptset_to_string(record.cryptset),
    ));
    map.insert("kismet.dot11.advertisedssid.cloaked".to_string(), TrackedElement::Bool(record.cloaked));
    map.insert("kismet.dot11.advertisedssid.first_time".to_string(), TrackedElement::U64(record.first_time));
    map.insert("kismet.dot11.advertisedssid.last_time".to_string(), TrackedElement::U64(record.last_time));
    map.insert("kismet.dot11.advertisedssid.beacon_count".to_string(), TrackedElement::U64(record.beacon_count));
    map.insert("kismet.dot11.advertisedssid.beacon_rate".to_string(), record.beacon_rate.map(|r| r as u64).into());
    map.insert("kismet.dot11.advertisedssid.channel".to_string(), record.channel.map(|c| c as u64).into());
    map.insert(
        "kismet.dot11.advertisedssid.country".to_string(),
        record
            .country_code
            .map(|c| String::from_utf8_lossy(&c).into_owned())
            .into(),
    );
    TrackedElement::Map(map).to_json()
}

/// `/phy/phy80211/ssids/views.json`.
pub fn ssids_view_json(records: &[&SsidRecord]) -> serde_json::Value {
    serde_json::Value::Array(records.iter().map(|r| ssid_json(r)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kismet_dot11::{Cryptset, SsidType};

    #[test]
    fn ssid_json_renders_readable_ssid_and_crypt_string() {
        let record = SsidRecord::new(b"kismet", SsidType::Beacon, Cryptset::WPA, 0);
        let json = ssid_json(&record);
        assert_eq!(json["kismet.dot11.advertisedssid.ssid"], "kismet");
        assert_eq!(json["kismet.dot11.advertisedssid.crypt_string"], "WPA");
    }
}
