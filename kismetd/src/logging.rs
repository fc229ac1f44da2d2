// SPDX-License-Identifier: Apache-2.0

//! Logging setup (SPEC_FULL.md §2.1): `RUST_LOG`-driven `EnvFilter`,
//! defaulting to `info` for `kismet_*` targets, raised to `debug` by
//! `--debug`.

use tracing_subscriber::EnvFilter;

pub fn init(debug: bool) {
    let default_directive = if debug { "kismet=debug,kismetd=debug" } else { "kismet=info,kismetd=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).init();
}
