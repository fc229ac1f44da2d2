// SPDX-License-Identifier: Apache-2.0

//! Fixed-horizon round-robin time series and location aggregation.
//!
//! Every tracked quantity (per-device packet counts, per-channel signal,
//! per-source active-device counts) is kept at three resolutions so a
//! long-running capture never needs unbounded history: 60 one-second
//! buckets, 60 one-minute buckets, and 24 one-hour buckets. Skipped
//! buckets are back-filled rather than left stale, so a client reading a
//! quiet device's RRD sees explicit zeros instead of a multi-minute-old
//! number in the slot.

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

pub mod aggregator;
pub mod distinct;
pub mod location;
pub mod ring;
pub mod rrd;

pub use aggregator::{Aggregator, Extreme, Sum};
pub use distinct::DistinctPerSecond;
pub use location::{Fix, HistoricLocation, LocationAggregator, RunningLocation};
pub use ring::Ring;
pub use rrd::Rrd;
