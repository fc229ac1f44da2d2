// SPDX-License-Identifier: Apache-2.0

//! Wires frame parsing, the IE walker, and SSID/handshake tracking into
//! the packet chain and the device registry (spec.md §4.7 "Tracker
//! updates").

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crossbeam_channel::{Receiver, Sender};
use kismet_chain::{ComponentId, Packet};
use kismet_common::{DeviceKey, Mac, MutexExt, Phy};
use kismet_device::DeviceRegistry;

use crate::crypt::Cryptset;
use crate::eapol::{EapolMessage, EapolTracker, HandshakeEvent};
use crate::frame::{self, Dot11PackInfo, FrameClass};
use crate::ie::{self, CountryRange, InformationElement};
use crate::ssid::{SsidRecord, SsidType};
use crate::type_set::TypeSet;

/// Fixed-field length preceding the IE section in beacon and
/// probe-response frames: timestamp(8) + beacon interval(2) +
/// capability info(2).
const MGMT_FIXED_FIELDS_LEN: usize = 12;

/// Capability-info privacy bit (802.11-2020 §9.4.1.4): set when the BSS
/// requires WEP or an RSN cipher to associate.
const CAPABILITY_PRIVACY_BIT: u16 = 0x0010;

/// The per-device 802.11 sub-state, attached through `Device::phy_ext` so
/// `kismet-device` never needs to know this type exists.
#[derive(Default)]
pub struct Dot11DeviceState {
    pub type_set: TypeSet,
    pub ssid_map: HashMap<u32, SsidRecord>,
    pub client_map: HashSet<DeviceKey>,
    pub tx_cryptset: Cryptset,
    pub rx_cryptset: Cryptset,
    pub fragments: u64,
    pub retries: u64,
    pub last_bssid: Option<Mac>,
    /// DHCP/CDP/EAP identity fields are carried here per spec.md §3 but
    /// never populated: no DHCP/CDP/EAP-identity dissector exists in this
    /// tracker (spec.md's payload-interpretation Non-goal), only whatever
    /// an external collaborator feeding those in would assign.
    pub dhcp_host: Option<String>,
    pub dhcp_vendor: Option<String>,
    pub cdp_device: Option<String>,
    pub cdp_port: Option<String>,
    pub eap_identity: Option<String>,
    pub eapol: EapolTracker,
}

/// The owned per-packet summary attached as a chain component.
#[derive(Debug, Clone)]
pub struct Dot11Info {
    pub header: Dot11PackInfo,
    pub ssid: Option<Vec<u8>>,
    pub ie_error: Option<String>,
}

/// Everything pulled out of a single frame that `update_device` needs,
/// bundled so the dissection step (`handle_packet`) and the
/// device-mutation step (`update_device`) stay decoupled from each
/// other's argument lists.
#[derive(Default)]
struct FrameDetails {
    ssid: Option<Vec<u8>>,
    channel: Option<u8>,
    beacon_rate: Option<u32>,
    country: Option<([u8; 2], Vec<CountryRange>)>,
    cryptset: Cryptset,
    eapol_message: Option<EapolMessage>,
    client_key: Option<DeviceKey>,
}

pub struct Dot11Tracker {
    raw_component: ComponentId,
    info_component: ComponentId,
    scan_index: Mutex<HashMap<u32, HashSet<DeviceKey>>>,
    handshake_subscribers: Mutex<Vec<Sender<HandshakeEvent>>>,
}

impl Dot11Tracker {
    pub fn new() -> Self {
        let registry = kismet_chain::packet::registry();
        Dot11Tracker {
            raw_component: registry.register("dot11.raw_chunk"),
            info_component: registry.register("dot11.info"),
            scan_index: Mutex::new(HashMap::new()),
            handshake_subscribers: Mutex::new(Vec::new()),
        }
    }

    /// The component id a datasource/dissector stage writes the raw
    /// link-layer chunk under for this tracker to consume.
    pub fn raw_component(&self) -> ComponentId {
        self.raw_component
    }

    pub fn info_component(&self) -> ComponentId {
        self.info_component
    }

    pub fn subscribe_handshake_events(&self) -> Receiver<HandshakeEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.handshake_subscribers.lock_or_panic().push(tx);
        rx
    }

    fn publish_handshake(&self, event: HandshakeEvent) {
        let subs = self.handshake_subscribers.lock_or_panic();
        for tx in subs.iter() {
            let _ = tx.send(event);
        }
    }

    /// Dissects the raw chunk attached to `packet`, updates `devices`, and
    /// attaches a [`Dot11Info`] component. Malformed frames/IEs mark the
    /// packet's error flag but are never dropped.
    pub fn handle_packet(&self, packet: &mut Packet, devices: &DeviceRegistry, now: u64) {
        let raw = match packet.fetch::<Vec<u8>>(self.raw_component) {
            Some(bytes) => bytes.clone(),
            None => return,
        };

        let header = match frame::parse_header(&raw) {
            Ok(h) => h,
            Err(_) => {
                packet.mark_error();
                return;
            }
        };

        let mut details = FrameDetails::default();
        let mut ie_error = None;

        if header.class == FrameClass::Management {
            let body = &raw[header.body_offset.min(raw.len())..];
            if body.len() >= MGMT_FIXED_FIELDS_LEN {
                let capability = u16::from_le_bytes([body[10], body[11]]);
                if capability & CAPABILITY_PRIVACY_BIT != 0 {
                    details.cryptset |= Cryptset::WEP;
                }
            }
            let ie_start = body.len().min(MGMT_FIXED_FIELDS_LEN);
            let (elements, err) = ie::walk(&body[ie_start..]);
            if let Some(e) = err {
                packet.mark_error();
                ie_error = Some(e.to_string());
            }
            for element in &elements {
                match element {
                    InformationElement::Ssid(bytes) => details.ssid = Some(bytes.to_vec()),
                    InformationElement::DsChannel(channel) => details.channel = Some(*channel),
                    InformationElement::Country { code, ranges } => {
                        details.country = Some((*code, ranges.clone()));
                    }
                    InformationElement::SupportedRates(rates) => {
                        // The high bit marks a basic (mandatory) rate; low 7
                        // bits are the rate in 500kbps units.
                        if let Some(&first) = rates.first() {
                            details.beacon_rate = Some((first & 0x7F) as u32 * 500);
                        }
                    }
                    InformationElement::Rsn { group_cipher, pairwise_ciphers } => {
                        details.cryptset |= crate::crypt::cryptset_from_rsn_cipher_suite(*group_cipher);
                        for suite in pairwise_ciphers {
                            details.cryptset |= crate::crypt::cryptset_from_rsn_cipher_suite(*suite);
                        }
                    }
                    _ => {}
                }
            }
        }

        if header.class == FrameClass::Data {
            let payload = &raw[header.body_offset.min(raw.len())..];
            details.eapol_message = crate::eapol::detect_key_frame(payload);

            let client_mac = match (header.flags.to_ds, header.flags.from_ds) {
                (true, false) => Some(header.addresses.source),
                (false, true) => Some(header.addresses.destination),
                // WDS/IBSS frames carry no single attributable client.
                _ => None,
            };
            details.client_key = client_mac.and_then(|mac| DeviceKey::new(mac, Phy::Dot11));
        }

        if let Some(key) = DeviceKey::new(header.addresses.bssid, Phy::Dot11) {
            self.update_device(key, &header, &details, devices, now, packet.source_uuid);
        } else {
            packet.mark_error();
        }

        packet.insert(
            self.info_component,
            Dot11Info {
                header,
                ssid: details.ssid,
                ie_error,
            },
        );
    }

    fn update_device(
        &self,
        key: DeviceKey,
        header: &Dot11PackInfo,
        details: &FrameDetails,
        devices: &DeviceRegistry,
        now: u64,
        source_uuid: uuid::Uuid,
    ) {
        let is_beacon_or_probe_resp =
            header.subtype == frame::subtype::BEACON || header.subtype == frame::subtype::PROBE_RESPONSE;
        let mut checksum_for_scan_index = None;
        let mut handshake_event = None;

        devices.mutate(key, now, |device| {
            device.observe_packet(
                now,
                source_uuid,
                header.class == FrameClass::Data,
                header.flags.protected,
            );

            let state_box = device
                .phy_ext
                .get_or_insert_with(|| Box::new(Dot11DeviceState::default()) as Box<dyn Any + Send>);
            let Some(state) = state_box.downcast_mut::<Dot11DeviceState>() else {
                return;
            };

            if header.sequence.fragment != 0 {
                state.fragments += 1;
            }
            if header.flags.retry {
                state.retries += 1;
            }
            state.last_bssid = Some(header.addresses.bssid);

            if is_beacon_or_probe_resp {
                state.type_set |= TypeSet::AP;
                state.rx_cryptset |= details.cryptset;
                if let Some(ssid_bytes) = details.ssid.as_deref() {
                    let ssid_type = if header.subtype == frame::subtype::BEACON {
                        SsidType::Beacon
                    } else {
                        SsidType::ProbeResponse
                    };
                    let checksum = crate::ssid::ssid_checksum(ssid_bytes, ssid_type);
                    let record = state
                        .ssid_map
                        .entry(checksum)
                        .or_insert_with(|| SsidRecord::new(ssid_bytes, ssid_type, details.cryptset, now));
                    record.cryptset |= details.cryptset;
                    record.observe_beacon(now, details.channel.unwrap_or(0), details.beacon_rate);
                    if let Some((code, ranges)) = &details.country {
                        record.set_country(*code, ranges.clone());
                    }
                    checksum_for_scan_index = Some(checksum);
                }
            } else if header.class == FrameClass::Data {
                if !state.type_set.contains(TypeSet::AP) {
                    state.type_set |= TypeSet::INFERRED;
                }
                match (header.flags.to_ds, header.flags.from_ds) {
                    (false, false) => state.type_set |= TypeSet::ADHOC,
                    (true, true) => state.type_set |= TypeSet::WDS,
                    _ => {}
                }
                if let Some(client) = details.client_key {
                    state.client_map.insert(client);
                }
                if let Some(msg) = details.eapol_message {
                    handshake_event = Some(state.eapol.observe(msg));
                }
            }
        });

        if let Some(client_key) = details.client_key {
            devices.mutate(client_key, now, |device| {
                device.observe_packet(now, source_uuid, true, header.flags.protected);
                let state_box = device
                    .phy_ext
                    .get_or_insert_with(|| Box::new(Dot11DeviceState::default()) as Box<dyn Any + Send>);
                if let Some(state) = state_box.downcast_mut::<Dot11DeviceState>() {
                    state.type_set |= TypeSet::CLIENT;
                    state.last_bssid = Some(header.addresses.bssid);
                }
            });
        }

        if let Some(checksum) = checksum_for_scan_index {
            self.scan_index
                .lock_or_panic()
                .entry(checksum)
                .or_default()
                .insert(key);
        }

        if let Some(event) = handshake_event {
            self.publish_handshake(event);
        }
    }

    /// The SSID/scan sub-tracker (spec.md §4.7): every device whose SSID
    /// checksum equals `checksum` has ever advertised that network name,
    /// regardless of BSSID.
    pub fn devices_advertising(&self, checksum: u32) -> Vec<DeviceKey> {
        self.scan_index
            .lock_or_panic()
            .get(&checksum)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn unique_ssid_count(&self) -> usize {
        self.scan_index.lock_or_panic().len()
    }
}

impl Default for Dot11Tracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kismet_chain::CaptureTime;

    fn beacon_frame(bssid: [u8; 6], ssid: &[u8], channel: u8) -> Vec<u8> {
        let mut buf = vec![0u8; 24];
        buf[0] = 0b1000_0000; // management, subtype beacon
        buf[4..10].copy_from_slice(&[0xFF; 6]);
        buf[10..16].copy_from_slice(&bssid);
        buf[16..22].copy_from_slice(&bssid);
        buf.extend_from_slice(&[0u8; 8]); // timestamp
        buf.extend_from_slice(&[0u8; 2]); // beacon interval
        buf.extend_from_slice(&[0u8; 2]); // capability info
        buf.push(0); // SSID tag
        buf.push(ssid.len() as u8);
        buf.extend_from_slice(ssid);
        buf.push(3); // DS channel tag
        buf.push(1);
        buf.push(channel);
        buf
    }

    fn packet_with_raw(raw: Vec<u8>, raw_component: ComponentId) -> Packet {
        let mut packet = Packet::new(CaptureTime { secs: 1, micros: 0 }, uuid::Uuid::nil());
        packet.insert(raw_component, raw);
        packet
    }

    fn dot11_state(devices: &DeviceRegistry, key: DeviceKey, now: u64) -> Dot11DeviceState {
        let mut out = None;
        devices.mutate(key, now, |device| {
            if let Some(state) = device
                .phy_ext
                .as_ref()
                .and_then(|ext| ext.downcast_ref::<Dot11DeviceState>())
            {
                out = Some(Dot11DeviceState {
                    type_set: state.type_set,
                    ssid_map: state.ssid_map.clone(),
                    client_map: state.client_map.clone(),
                    tx_cryptset: state.tx_cryptset,
                    rx_cryptset: state.rx_cryptset,
                    fragments: state.fragments,
                    retries: state.retries,
                    last_bssid: state.last_bssid,
                    dhcp_host: state.dhcp_host.clone(),
                    dhcp_vendor: state.dhcp_vendor.clone(),
                    cdp_device: state.cdp_device.clone(),
                    cdp_port: state.cdp_port.clone(),
                    eap_identity: state.eap_identity.clone(),
                    eapol: state.eapol,
                });
            }
        });
        out.unwrap_or_default()
    }

    #[test]
    fn beacon_track_creates_exactly_one_device_with_ssid_record() {
        let tracker = Dot11Tracker::new();
        let devices = DeviceRegistry::new();
        let bssid = [0x02, 0x11, 0x22, 0x33, 0x44, 0x55];
        let raw = beacon_frame(bssid, b"kismet", 6);
        let mut packet = packet_with_raw(raw, tracker.raw_component());

        tracker.handle_packet(&mut packet, &devices, 1000);

        assert_eq!(devices.len(), 1);
        assert!(!packet.error);
        let info = packet.fetch::<Dot11Info>(tracker.info_component()).unwrap();
        assert_eq!(info.ssid.as_deref(), Some(b"kismet".as_slice()));
        assert_eq!(tracker.unique_ssid_count(), 1);
    }

    #[test]
    fn beacon_channel_is_read_from_the_ds_channel_ie_not_hardcoded() {
        let tracker = Dot11Tracker::new();
        let devices = DeviceRegistry::new();
        let bssid = [0x02, 0x11, 0x22, 0x33, 0x44, 0x55];
        let key = DeviceKey::new(Mac::new(bssid), Phy::Dot11).unwrap();
        let raw = beacon_frame(bssid, b"kismet", 6);
        let mut packet = packet_with_raw(raw, tracker.raw_component());

        tracker.handle_packet(&mut packet, &devices, 1000);

        let state = dot11_state(&devices, key, 1000);
        assert!(state.type_set.contains(TypeSet::AP));
        let record = state.ssid_map.values().next().unwrap();
        assert_eq!(record.channel, Some(6));
    }

    #[test]
    fn country_ie_populates_ssid_record_country() {
        let tracker = Dot11Tracker::new();
        let devices = DeviceRegistry::new();
        let bssid = [0x02, 0x11, 0x22, 0x33, 0x44, 0x55];
        let key = DeviceKey::new(Mac::new(bssid), Phy::Dot11).unwrap();
        let mut raw = beacon_frame(bssid, b"kismet", 6);
        raw.push(7); // country tag
        raw.push(5); // length
        raw.extend_from_slice(b"US"); // code
        raw.extend_from_slice(&[1, 11, 30]); // one (start, count, tx power) triplet
        let mut packet = packet_with_raw(raw, tracker.raw_component());

        tracker.handle_packet(&mut packet, &devices, 1000);

        let state = dot11_state(&devices, key, 1000);
        let record = state.ssid_map.values().next().unwrap();
        assert_eq!(record.country_code, Some(*b"US"));
        assert_eq!(record.country_ranges.len(), 1);
    }

    #[test]
    fn malformed_ssid_ie_marks_error_but_still_creates_device() {
        let tracker = Dot11Tracker::new();
        let devices = DeviceRegistry::new();
        let bssid = [0x02, 0x11, 0x22, 0x33, 0x44, 0x55];
        let mut raw = vec![0u8; 24];
        raw[0] = 0b1000_0000;
        raw[4..10].copy_from_slice(&[0xFF; 6]);
        raw[10..16].copy_from_slice(&bssid);
        raw[16..22].copy_from_slice(&bssid);
        raw.extend_from_slice(&[0u8; 12]); // fixed fields
        raw.push(0); // SSID tag
        raw.push(33); // declares 33 bytes, but nothing follows
        let mut packet = packet_with_raw(raw, tracker.raw_component());

        tracker.handle_packet(&mut packet, &devices, 500);

        assert!(packet.error);
        assert_eq!(devices.len(), 1);
        let info = packet.fetch::<Dot11Info>(tracker.info_component()).unwrap();
        assert!(info.ie_error.is_some());
        assert!(info.ssid.is_none());
        assert_eq!(tracker.unique_ssid_count(), 0);
    }

    #[test]
    fn too_short_frame_marks_error_without_creating_a_device() {
        let tracker = Dot11Tracker::new();
        let devices = DeviceRegistry::new();
        let mut packet = packet_with_raw(vec![0u8; 4], tracker.raw_component());
        tracker.handle_packet(&mut packet, &devices, 0);
        assert!(packet.error);
        assert_eq!(devices.len(), 0);
    }

    fn data_frame(bssid: [u8; 6], client: [u8; 6], from_ds: bool, payload: &[u8]) -> Vec<u8> {
        let mut buf = vec![0u8; 24];
        buf[0] = 0b0000_1000; // data, subtype 0
        buf[1] = if from_ds { 0b0000_0010 } else { 0b0000_0001 };
        if from_ds {
            buf[4..10].copy_from_slice(&client); // destination
            buf[10..16].copy_from_slice(&bssid); // bssid
            buf[16..22].copy_from_slice(&bssid); // source (AP)
        } else {
            buf[4..10].copy_from_slice(&bssid); // bssid (destination for ToDS)
            buf[10..16].copy_from_slice(&client); // source
            buf[16..22].copy_from_slice(&bssid); // destination
        }
        buf.extend_from_slice(payload);
        buf
    }

    #[test]
    fn data_frame_upserts_client_into_aps_client_map() {
        let tracker = Dot11Tracker::new();
        let devices = DeviceRegistry::new();
        let bssid = [0x02, 0x11, 0x22, 0x33, 0x44, 0x55];
        let client = [0x02, 0xAA, 0xBB, 0xCC, 0xDD, 0xEE];
        let ap_key = DeviceKey::new(Mac::new(bssid), Phy::Dot11).unwrap();
        let client_key = DeviceKey::new(Mac::new(client), Phy::Dot11).unwrap();
        let raw = data_frame(bssid, client, true, &[0u8; 4]);
        let mut packet = packet_with_raw(raw, tracker.raw_component());

        tracker.handle_packet(&mut packet, &devices, 2000);

        assert_eq!(devices.len(), 2);
        let ap_state = dot11_state(&devices, ap_key, 2000);
        assert!(ap_state.client_map.contains(&client_key));
        assert!(ap_state.type_set.contains(TypeSet::INFERRED));
        let client_state = dot11_state(&devices, client_key, 2000);
        assert!(client_state.type_set.contains(TypeSet::CLIENT));
    }

    #[test]
    fn eapol_key_frame_drives_handshake_state() {
        let tracker = Dot11Tracker::new();
        let devices = DeviceRegistry::new();
        let bssid = [0x02, 0x11, 0x22, 0x33, 0x44, 0x55];
        let client = [0x02, 0xAA, 0xBB, 0xCC, 0xDD, 0xEE];
        let ap_key = DeviceKey::new(Mac::new(bssid), Phy::Dot11).unwrap();

        let mut eapol_payload = vec![0xAA, 0xAA, 0x03, 0x00, 0x00, 0x00];
        eapol_payload.extend_from_slice(&0x888Eu16.to_be_bytes());
        eapol_payload.push(1); // version
        eapol_payload.push(3); // EAPOL-Key
        eapol_payload.extend_from_slice(&0u16.to_be_bytes());
        eapol_payload.push(2); // descriptor type
        eapol_payload.extend_from_slice(&(1u16 << 7).to_be_bytes()); // Ack only: Msg1

        let raw = data_frame(bssid, client, true, &eapol_payload);
        let mut packet = packet_with_raw(raw, tracker.raw_component());

        tracker.handle_packet(&mut packet, &devices, 3000);

        let ap_state = dot11_state(&devices, ap_key, 3000);
        assert_eq!(ap_state.eapol.state(), crate::eapol::HandshakeState::GotMsg1);
    }
}
