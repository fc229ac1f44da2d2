// SPDX-License-Identifier: Apache-2.0

//! Out-of-process capture driver framework (spec.md C3/C4): per-source
//! lifecycle and retry state machine, fleet channel hop scheduling, the
//! prototype/registry tracker, and the remote TCP listener.

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

pub mod hop;
pub mod remote;
pub mod source;
pub mod tracker;

pub use hop::{compute_fleet_hop_assignment, HoppingSource};
pub use remote::{serve, RemoteError, DEFAULT_REMOTE_PORT};
pub use source::{HopEntry, Source, SourceError, SourceState};
pub use tracker::{DatasourceError, SourceBuilder, SourceTracker};
