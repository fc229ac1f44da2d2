// SPDX-License-Identifier: Apache-2.0

//! The EAPOL 4-way handshake state machine (spec.md §4.7 point 4):
//! "transitions produce events consumed by optional WEP/WPA cracking
//! plugins (external collaborators)". This crate only tracks handshake
//! progress and emits the transition events; cracking itself is out of
//! scope and lives in an external collaborator subscribed to
//! [`HandshakeEvent`]s.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EapolMessage {
    Msg1,
    Msg2,
    Msg3,
    Msg4,
}

/// 802.2 LLC/SNAP header length (DSAP+SSAP+control, then OUI+ethertype)
/// preceding an EAPOL frame carried in a data frame's payload.
const LLC_SNAP_LEN: usize = 8;
/// EAPOL header length: protocol version(1) + packet type(1) + body length(2).
const EAPOL_HEADER_LEN: usize = 4;
/// Ethertype identifying EAPOL inside the SNAP header (IEEE 802.1X).
const EAPOL_ETHERTYPE: u16 = 0x888E;
/// EAPOL packet type identifying an EAPOL-Key frame.
const EAPOL_TYPE_KEY: u8 = 3;

const KEY_INFO_INSTALL: u16 = 1 << 6;
const KEY_INFO_ACK: u16 = 1 << 7;
const KEY_INFO_MIC: u16 = 1 << 8;
const KEY_INFO_SECURE: u16 = 1 << 9;

/// Classifies an EAPOL-Key frame's `key_info` field into one of the four
/// 4-way-handshake messages by its Ack/MIC/Secure/Install bit combination
/// (802.11-2020 §12.7.2), or `None` if the combination matches none of
/// them (e.g. group-key handshake or GTK rekey frames).
fn classify_key_frame(key_info: u16) -> Option<EapolMessage> {
    let install = key_info & KEY_INFO_INSTALL != 0;
    let ack = key_info & KEY_INFO_ACK != 0;
    let mic = key_info & KEY_INFO_MIC != 0;
    let secure = key_info & KEY_INFO_SECURE != 0;
    match (ack, mic, secure, install) {
        (true, false, false, false) => Some(EapolMessage::Msg1),
        (false, true, false, false) => Some(EapolMessage::Msg2),
        (true, true, true, true) => Some(EapolMessage::Msg3),
        (false, true, true, false) => Some(EapolMessage::Msg4),
        _ => None,
    }
}

/// Detects an EAPOL-Key frame inside a data frame's payload (LLC/SNAP
/// header, then EAPOL header, then the key descriptor) and classifies it
/// into a handshake message, or `None` if this payload isn't an
/// EAPOL-Key frame at all.
pub fn detect_key_frame(payload: &[u8]) -> Option<EapolMessage> {
    if payload.len() < LLC_SNAP_LEN + EAPOL_HEADER_LEN + 3 {
        return None;
    }
    let ethertype = u16::from_be_bytes([payload[6], payload[7]]);
    if ethertype != EAPOL_ETHERTYPE {
        return None;
    }
    let eapol_type = payload[LLC_SNAP_LEN + 1];
    if eapol_type != EAPOL_TYPE_KEY {
        return None;
    }
    let key_info_offset = LLC_SNAP_LEN + EAPOL_HEADER_LEN + 1;
    let key_info = u16::from_be_bytes([payload[key_info_offset], payload[key_info_offset + 1]]);
    classify_key_frame(key_info)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HandshakeState {
    #[default]
    Idle,
    GotMsg1,
    GotMsg2,
    GotMsg3,
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeEvent {
    Started,
    Progressed(HandshakeState),
    Completed,
    /// A message arrived out of the expected order; the state machine
    /// resets to `Idle` rather than guessing.
    Reset,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EapolTracker {
    state: HandshakeState,
}

impl EapolTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Folds one observed EAPOL message into the state machine, returning
    /// the event to publish to subscribers (if any).
    pub fn observe(&mut self, msg: EapolMessage) -> HandshakeEvent {
        use HandshakeState::*;
        let (next, event) = match (self.state, msg) {
            (Idle, EapolMessage::Msg1) => (GotMsg1, HandshakeEvent::Started),
            (GotMsg1, EapolMessage::Msg2) => {
                (GotMsg2, HandshakeEvent::Progressed(GotMsg2))
            }
            (GotMsg2, EapolMessage::Msg3) => {
                (GotMsg3, HandshakeEvent::Progressed(GotMsg3))
            }
            (GotMsg3, EapolMessage::Msg4) => (Complete, HandshakeEvent::Completed),
            // A fresh Msg1 restarts the handshake (e.g. a retried association).
            (_, EapolMessage::Msg1) => (GotMsg1, HandshakeEvent::Started),
            _ => (Idle, HandshakeEvent::Reset),
        };
        self.state = next;
        event
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_handshake_completes_in_order() {
        let mut t = EapolTracker::new();
        assert_eq!(t.observe(EapolMessage::Msg1), HandshakeEvent::Started);
        assert_eq!(
            t.observe(EapolMessage::Msg2),
            HandshakeEvent::Progressed(HandshakeState::GotMsg2)
        );
        assert_eq!(
            t.observe(EapolMessage::Msg3),
            HandshakeEvent::Progressed(HandshakeState::GotMsg3)
        );
        assert_eq!(t.observe(EapolMessage::Msg4), HandshakeEvent::Completed);
        assert_eq!(t.state(), HandshakeState::Complete);
    }

    #[test]
    fn out_of_order_message_resets_to_idle() {
        let mut t = EapolTracker::new();
        t.observe(EapolMessage::Msg1);
        assert_eq!(t.observe(EapolMessage::Msg4), HandshakeEvent::Reset);
        assert_eq!(t.state(), HandshakeState::Idle);
    }

    #[test]
    fn a_fresh_msg1_restarts_an_in_progress_handshake() {
        let mut t = EapolTracker::new();
        t.observe(EapolMessage::Msg1);
        t.observe(EapolMessage::Msg2);
        assert_eq!(t.observe(EapolMessage::Msg1), HandshakeEvent::Started);
        assert_eq!(t.state(), HandshakeState::GotMsg1);
    }

    fn key_frame(key_info: u16) -> Vec<u8> {
        let mut buf = vec![0xAA, 0xAA, 0x03, 0x00, 0x00, 0x00]; // LLC/SNAP, OUI 00:00:00
        buf.extend_from_slice(&EAPOL_ETHERTYPE.to_be_bytes());
        buf.push(1); // EAPOL protocol version
        buf.push(EAPOL_TYPE_KEY);
        buf.extend_from_slice(&0u16.to_be_bytes()); // body length, unused here
        buf.push(2); // descriptor type (RSN)
        buf.extend_from_slice(&key_info.to_be_bytes());
        buf
    }

    #[test]
    fn detects_message_one_by_ack_bit_alone() {
        let buf = key_frame(KEY_INFO_ACK);
        assert_eq!(detect_key_frame(&buf), Some(EapolMessage::Msg1));
    }

    #[test]
    fn detects_message_three_by_ack_mic_secure_install() {
        let buf = key_frame(KEY_INFO_ACK | KEY_INFO_MIC | KEY_INFO_SECURE | KEY_INFO_INSTALL);
        assert_eq!(detect_key_frame(&buf), Some(EapolMessage::Msg3));
    }

    #[test]
    fn non_eapol_ethertype_is_not_a_key_frame() {
        let mut buf = key_frame(KEY_INFO_ACK);
        buf[6] = 0x08;
        buf[7] = 0x00; // IPv4, not EAPOL
        assert_eq!(detect_key_frame(&buf), None);
    }

    #[test]
    fn short_payload_is_not_a_key_frame() {
        assert_eq!(detect_key_frame(&[0u8; 4]), None);
    }
}
