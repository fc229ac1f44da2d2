// SPDX-License-Identifier: Apache-2.0

//! kismetd: wireless sniffer/IDS core daemon (spec.md §6). Parses the CLI,
//! loads config, wires every subsystem together via [`core::Core`], and
//! runs the main timer loop until a signal or a fatal error ends it.

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

mod cli;
mod clock;
mod core;
mod dissect;
mod logging;
mod pcapfile;

use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use kismet_common::{Config, KismetError};
use tracing::{error, info};

use crate::core::Core;

/// Period of the main timer loop (spec.md §5 "main thread runs the event
/// loop"). Every tick recomputes hop assignments, flushes channel
/// counters, reaps stale devices, and retries errored sources.
const MAIN_LOOP_TICK: Duration = Duration::from_millis(250);

/// Top-level boundary: every subsystem error is collected behind
/// `anyhow::Result` (spec.md §7, "only the main thread translates fatal
/// errors to process exit"); the `KismetError` kind underneath, when
/// present, still decides the exit code.
fn main() -> ExitCode {
    let args = cli::Args::parse();
    logging::init(args.debug);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "kismetd exiting");
            let code = err
                .downcast_ref::<KismetError>()
                .map_or(2, KismetError::fatal_exit_code);
            ExitCode::from(code as u8)
        }
    }
}

fn run(args: &cli::Args) -> anyhow::Result<()> {
    let overrides = args.parsed_overrides()?;
    let mut config = Config::load(args.config.as_deref(), &overrides)?;
    if let Some(log_prefix) = &args.log_prefix {
        config.log_prefix = log_prefix.clone();
    }

    let core = Core::new(config);
    core.spawn_remote_listener()
        .map_err(|err| KismetError::Resource(err.to_string()))?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        info!("shutdown signal received");
        handler_flag.store(true, Ordering::Relaxed);
    })
    .map_err(|err| KismetError::Resource(err.to_string()))?;

    core.run_until_shutdown(&shutdown);
    core.shutdown();
    Ok(())
}
