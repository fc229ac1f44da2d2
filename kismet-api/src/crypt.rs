// SPDX-License-Identifier: Apache-2.0

//! `Cryptset` string rendering — spec.md §4.7: "The string form is derived
//! by the API layer."

use kismet_dot11::Cryptset;

const NAMED_BITS: &[(Cryptset, &str)] = &[
    (Cryptset::WEP, "WEP"),
    (Cryptset::WEP40, "WEP40"),
    (Cryptset::WEP104, "WEP104"),
    (Cryptset::WPA, "WPA"),
    (Cryptset::WPA_PSK, "WPA-PSK"),
    (Cryptset::WPA_EAP, "WPA-EAP"),
    (Cryptset::WPA_PEAP, "WPA-PEAP"),
    (Cryptset::WPA_LEAP, "WPA-LEAP"),
    (Cryptset::WPA_TTLS, "WPA-TTLS"),
    (Cryptset::WPA_TLS, "WPA-TLS"),
    (Cryptset::WPA_MIGMODE, "WPA-MIGMODE"),
    (Cryptset::TKIP, "TKIP"),
    (Cryptset::AES_OCB, "AES-OCB"),
    (Cryptset::AES_CCM, "AES-CCM"),
    (Cryptset::WPS, "WPS"),
    (Cryptset::ISAKMP, "ISAKMP"),
    (Cryptset::PPTP, "PPTP"),
    (Cryptset::FORTRESS, "Fortress"),
    (Cryptset::KEYGUARD, "Keyguard"),
    (Cryptset::UNKNOWN, "Unknown"),
];

/// Renders a cryptset as the comma-joined list of its named bits, `"None"`
/// if no bit is set.
pub fn cryptset_to_string(cryptset: Cryptset) -> String {
    if cryptset.is_none() {
        return "None".to_string();
    }
    let names: Vec<&str> = NAMED_BITS
        .iter()
        .filter(|(bit, _)| cryptset.contains(*bit))
        .map(|(_, name)| *name)
        .collect();
    names.join(",")
}
