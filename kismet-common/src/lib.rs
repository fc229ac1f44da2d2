// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

pub mod config;
pub mod error;
pub mod mac;
pub mod phy;
pub mod rate_limiter;
pub mod uuid;

pub use config::Config;
pub use error::KismetError;
pub use mac::Mac;
pub use phy::Phy;

use std::sync::{Mutex, MutexGuard};

/// Extension trait mirroring the upstream convention of acquiring a `Mutex`
/// without scattering `#[allow(clippy::unwrap_used)]` at every call site.
///
/// # Panics
///
/// Panics if the mutex is poisoned. Every lock in this workspace is held
/// only for the short, panic-free critical sections documented per crate
/// (spec.md §5), so poisoning indicates a bug elsewhere that should surface
/// loudly rather than be papered over.
pub trait MutexExt<T> {
    fn lock_or_panic(&self) -> MutexGuard<'_, T>;
}

impl<T> MutexExt<T> for Mutex<T> {
    #[inline(always)]
    #[track_caller]
    fn lock_or_panic(&self) -> MutexGuard<'_, T> {
        #[allow(clippy::unwrap_used)]
        self.lock().unwrap()
    }
}

/// The identity key for every tracked device: a MAC address plus the PHY it
/// was observed under (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub struct DeviceKey {
    pub mac: Mac,
    pub phy: Phy,
}

impl DeviceKey {
    /// Returns `None` if `mac` is the error sentinel (spec.md §3: "A MAC
    /// marked `error` is never inserted").
    pub fn new(mac: Mac, phy: Phy) -> Option<Self> {
        if mac.is_error() {
            return None;
        }
        Some(DeviceKey { mac, phy })
    }
}

impl std::fmt::Display for DeviceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.mac, self.phy)
    }
}
