// SPDX-License-Identifier: Apache-2.0

//! Wall-clock helpers, following the same `SystemTime`-since-epoch pattern
//! as `kismet_common::rate_limiter`.

use std::time::{SystemTime, UNIX_EPOCH};

pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
