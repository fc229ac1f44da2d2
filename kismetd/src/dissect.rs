// SPDX-License-Identifier: Apache-2.0

//! Wires the 802.11 dissector and the channel tracker onto the packet
//! chain (spec.md §4.5 CLASSIFIER/TRACKER stages, §4.9 "the chain
//! registers a packet-stage handler that updates the appropriate entry
//! from layer-1 info").

use std::sync::Arc;

use kismet_chain::{PacketChain, Stage};
use kismet_channel::{ChannelObservation, ChannelTracker};
use kismet_device::DeviceRegistry;
use kismet_dot11::{Dot11Info, Dot11Tracker};

/// Leading-digit channel token to a rough 2.4/5 GHz center frequency. Real
/// channel/frequency pairing normally comes from the capture driver's
/// layer-1 info (radiotap, HW metadata); `pcapfile` replay has none, so
/// this is the best-effort fallback used when a source has a configured
/// channel but no reported frequency.
pub fn channel_token_to_freq_khz(token: &str) -> u64 {
    let digits: String = token.chars().take_while(|c| c.is_ascii_digit()).collect();
    let Ok(channel) = digits.parse::<u32>() else { return 0 };
    match channel {
        1..=13 => 2_407_000 + u64::from(channel) * 5_000,
        14 => 2_484_000,
        36..=196 => 5_000_000 + u64::from(channel) * 5_000,
        _ => 0,
    }
}

/// Registers the CLASSIFIER-stage 802.11 dissector and the TRACKER-stage
/// channel activity handler. `current_channel` resolves a source UUID to
/// its currently configured channel token, if any.
pub fn register_handlers(
    chain: &PacketChain,
    dot11: Arc<Dot11Tracker>,
    devices: Arc<DeviceRegistry>,
    channels: Arc<ChannelTracker>,
    current_channel: Arc<dyn Fn(uuid::Uuid) -> Option<String> + Send + Sync>,
) {
    let dissect_dot11 = dot11.clone();
    let dissect_devices = devices.clone();
    chain.register(
        Stage::Classifier,
        0,
        Box::new(move |packet| {
            let now = packet.capture_time.secs;
            dissect_dot11.handle_packet(packet, &dissect_devices, now);
        }),
    );

    let info_component = dot11.info_component();
    let raw_component = dot11.raw_component();
    chain.register(
        Stage::Tracker,
        0,
        Box::new(move |packet| {
            let Some(info) = packet.fetch::<Dot11Info>(info_component) else { return };
            let bssid = info.header.addresses.bssid;
            let bytes = packet.fetch::<Vec<u8>>(raw_component).map_or(0, |raw| raw.len() as u64);
            let Some(channel) = current_channel(packet.source_uuid) else { return };
            let frequency_khz = channel_token_to_freq_khz(&channel);
            channels.observe(&ChannelObservation {
                timestamp: packet.capture_time.secs,
                channel: &channel,
                frequency_khz,
                signal_dbm: 0.0,
                bytes,
                source: bssid,
            });
        }),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_token_resolves_2ghz_and_5ghz_frequencies() {
        assert_eq!(channel_token_to_freq_khz("6"), 2_437_000);
        assert_eq!(channel_token_to_freq_khz("14"), 2_484_000);
        assert_eq!(channel_token_to_freq_khz("36"), 5_180_000);
        assert_eq!(channel_token_to_freq_khz("6HT40-"), 2_437_000);
        assert_eq!(channel_token_to_freq_khz("bogus"), 0);
    }
}
