// SPDX-License-Identifier: Apache-2.0

//! Decodes the 802.11 MAC header into a `dot11_packinfo`-equivalent
//! (spec.md §4.7): version/type/subtype, the address set appropriate to
//! FromDS/ToDS, sequence/fragment, and the retry/more-fragment/protected
//! flag set.

use kismet_common::Mac;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FrameParseError {
    #[error("frame too short: {0} bytes, need at least {1}")]
    TooShort(usize, usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameClass {
    Management,
    Control,
    Data,
    Reserved,
}

impl FrameClass {
    fn from_type_bits(bits: u8) -> Self {
        match bits {
            0 => FrameClass::Management,
            1 => FrameClass::Control,
            2 => FrameClass::Data,
            _ => FrameClass::Reserved,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameFlags {
    pub to_ds: bool,
    pub from_ds: bool,
    pub more_fragments: bool,
    pub retry: bool,
    pub protected: bool,
    pub order: bool,
}

/// The address roles actually present depend on ToDS/FromDS (802.11-2020
/// Table 9-26); WDS (ToDS=1, FromDS=1) additionally carries a fourth
/// address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressSet {
    pub bssid: Mac,
    pub source: Mac,
    pub destination: Mac,
    pub transmitter: Option<Mac>,
    pub receiver: Option<Mac>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceControl {
    pub fragment: u8,
    pub sequence: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dot11PackInfo {
    pub version: u8,
    pub class: FrameClass,
    pub subtype: u8,
    pub flags: FrameFlags,
    pub addresses: AddressSet,
    pub sequence: SequenceControl,
    /// Offset into the original buffer where the frame body (management
    /// frame fixed fields + IEs, or the data payload) begins.
    pub body_offset: usize,
}

const HEADER_MIN_LEN: usize = 24;

fn read_mac(buf: &[u8], offset: usize) -> Mac {
    let mut bytes = [0u8; 6];
    bytes.copy_from_slice(&buf[offset..offset + 6]);
    Mac::new(bytes)
}

/// Parses the fixed 24-byte 802.11 header (addr4 and QoS control, when
/// present, extend `body_offset` but are not separately modeled here).
pub fn parse_header(buf: &[u8]) -> Result<Dot11PackInfo, FrameParseError> {
    if buf.len() < HEADER_MIN_LEN {
        return Err(FrameParseError::TooShort(buf.len(), HEADER_MIN_LEN));
    }
    let fc0 = buf[0];
    let fc1 = buf[1];
    let version = fc0 & 0b11;
    let type_bits = (fc0 >> 2) & 0b11;
    let subtype = (fc0 >> 4) & 0b1111;
    let class = FrameClass::from_type_bits(type_bits);

    let flags = FrameFlags {
        to_ds: fc1 & 0b0000_0001 != 0,
        from_ds: fc1 & 0b0000_0010 != 0,
        more_fragments: fc1 & 0b0000_0100 != 0,
        retry: fc1 & 0b0000_1000 != 0,
        protected: fc1 & 0b0100_0000 != 0,
        order: fc1 & 0b1000_0000 != 0,
    };

    let addr1 = read_mac(buf, 4);
    let addr2 = read_mac(buf, 10);
    let addr3 = read_mac(buf, 16);

    let mut body_offset = HEADER_MIN_LEN;
    let addresses = match (flags.to_ds, flags.from_ds) {
        (false, false) => AddressSet {
            destination: addr1,
            source: addr2,
            bssid: addr3,
            transmitter: None,
            receiver: None,
        },
        (false, true) => AddressSet {
            destination: addr1,
            bssid: addr2,
            source: addr3,
            transmitter: None,
            receiver: None,
        },
        (true, false) => AddressSet {
            bssid: addr1,
            source: addr2,
            destination: addr3,
            transmitter: None,
            receiver: None,
        },
        (true, true) => {
            let addr4 = if buf.len() >= HEADER_MIN_LEN + 6 {
                body_offset += 6;
                Some(read_mac(buf, 24))
            } else {
                None
            };
            AddressSet {
                receiver: Some(addr1),
                transmitter: Some(addr2),
                destination: addr3,
                source: addr4.unwrap_or_else(Mac::error),
                bssid: Mac::error(),
            }
        }
    };

    let seq_raw = u16::from_le_bytes([buf[22], buf[23]]);
    let sequence = SequenceControl {
        fragment: (seq_raw & 0x0F) as u8,
        sequence: seq_raw >> 4,
    };

    Ok(Dot11PackInfo {
        version,
        class,
        subtype,
        flags,
        addresses,
        sequence,
        body_offset,
    })
}

/// Management-frame subtypes relevant to the tracker.
pub mod subtype {
    pub const ASSOC_REQUEST: u8 = 0x0;
    pub const ASSOC_RESPONSE: u8 = 0x1;
    pub const PROBE_REQUEST: u8 = 0x4;
    pub const PROBE_RESPONSE: u8 = 0x5;
    pub const BEACON: u8 = 0x8;
    pub const DISASSOCIATION: u8 = 0xA;
    pub const AUTHENTICATION: u8 = 0xB;
    pub const DEAUTHENTICATION: u8 = 0xC;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn beacon_header(bssid: [u8; 6]) -> Vec<u8> {
        let mut buf = vec![0u8; 24];
        buf[0] = 0b1000_0000; // subtype=BEACON(8), type=management(0)
        buf[1] = 0x00; // no ToDS/FromDS for a beacon
        buf[4..10].copy_from_slice(&[0xFF; 6]); // addr1 = broadcast destination
        buf[10..16].copy_from_slice(&bssid); // addr2 = source = bssid for an AP
        buf[16..22].copy_from_slice(&bssid); // addr3 = bssid
        buf
    }

    #[test]
    fn parses_beacon_addressing_with_no_ds_flags() {
        let bssid = [0x02, 0x11, 0x22, 0x33, 0x44, 0x55];
        let info = parse_header(&beacon_header(bssid)).unwrap();
        assert_eq!(info.class, FrameClass::Management);
        assert_eq!(info.subtype, subtype::BEACON);
        assert_eq!(info.addresses.bssid.octets(), bssid);
        assert!(!info.flags.to_ds);
        assert!(!info.flags.from_ds);
    }

    #[test]
    fn rejects_header_shorter_than_minimum() {
        let buf = vec![0u8; 10];
        assert_eq!(
            parse_header(&buf),
            Err(FrameParseError::TooShort(10, HEADER_MIN_LEN))
        );
    }

    #[test]
    fn from_ds_assigns_bssid_to_addr2() {
        let mut buf = beacon_header([0; 6]);
        buf[1] = 0b0000_0010; // FromDS
        let ap = [0xAA; 6];
        buf[10..16].copy_from_slice(&ap);
        let info = parse_header(&buf).unwrap();
        assert_eq!(info.addresses.bssid.octets(), ap);
    }

    #[test]
    fn sequence_control_splits_fragment_and_sequence_number() {
        let mut buf = beacon_header([0; 6]);
        // fragment=3, sequence=100 -> raw = (100<<4)|3
        let raw: u16 = (100u16 << 4) | 3;
        buf[22..24].copy_from_slice(&raw.to_le_bytes());
        let info = parse_header(&buf).unwrap();
        assert_eq!(info.sequence.fragment, 3);
        assert_eq!(info.sequence.sequence, 100);
    }
}
