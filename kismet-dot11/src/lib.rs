// SPDX-License-Identifier: Apache-2.0

//! 802.11 frame dissection, IE walking, cryptset classification, and
//! SSID/client/handshake tracking (spec.md §4.7).

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

pub mod crypt;
pub mod eapol;
pub mod frame;
pub mod ie;
pub mod ssid;
pub mod tracker;
pub mod type_set;

pub use crypt::Cryptset;
pub use eapol::{EapolMessage, EapolTracker, HandshakeEvent, HandshakeState};
pub use frame::{AddressSet, Dot11PackInfo, FrameClass, FrameFlags, FrameParseError};
pub use ie::{IEParseError, InformationElement};
pub use ssid::{ssid_checksum, SsidRecord, SsidType};
pub use tracker::{Dot11DeviceState, Dot11Info, Dot11Tracker};
pub use type_set::TypeSet;
