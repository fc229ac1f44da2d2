// SPDX-License-Identifier: Apache-2.0

//! The device registry: a long-lived, concurrently accessed mapping of
//! `(MAC, PHY)` to tracked device state (spec.md §4.6).

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

pub mod device;
pub mod oui;
pub mod registry;

pub use device::{Device, PacketCounters, PhyExtension};
pub use registry::{DeviceEvent, DeviceRegistry, DeviceSnapshot, PhyStats, TrackerStats};
