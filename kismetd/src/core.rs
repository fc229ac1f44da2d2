// SPDX-License-Identifier: Apache-2.0

//! Subsystem wiring and the main timer loop (spec.md §5: "Main thread
//! runs the event loop (timers, select over pollables)").

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use kismet_chain::{ChainWorker, PacketChain};
use kismet_channel::ChannelTracker;
use kismet_common::{Config, KismetError, MutexExt};
use kismet_datasource::{SourceState, SourceTracker};
use kismet_device::DeviceRegistry;
use kismet_dot11::Dot11Tracker;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::clock::{now_millis, now_secs};
use crate::dissect;
use crate::pcapfile::{self, CaptureContext, PcapfileBuilder};
use crate::MAIN_LOOP_TICK;

/// Everything the daemon wires together at startup, per SPEC_FULL.md §2's
/// "ambient/crosscutting crates" table.
pub struct Core {
    pub config: Config,
    pub chain: Arc<PacketChain>,
    pub devices: Arc<DeviceRegistry>,
    pub channels: Arc<ChannelTracker>,
    pub dot11: Arc<Dot11Tracker>,
    pub sources: Arc<SourceTracker>,
    capture_ctx: CaptureContext,
    chain_worker: Option<ChainWorker>,
    next_retry_at: Mutex<HashMap<Uuid, u64>>,
}

impl Core {
    pub fn new(config: Config) -> Self {
        let chain = Arc::new(PacketChain::new());
        let devices = Arc::new(DeviceRegistry::new());
        let channels = Arc::new(ChannelTracker::new());
        let dot11 = Arc::new(Dot11Tracker::new());
        let sources = Arc::new(SourceTracker::new(config.split_same_sources, config.random_channel_order));
        sources.register_prototype(Arc::new(PcapfileBuilder));

        let (chain_tx, chain_rx) = kismet_chain::input_queue(1024);
        let chain_worker = ChainWorker::spawn(Arc::clone(&chain), chain_rx);

        let lookup_sources = Arc::clone(&sources);
        let current_channel: Arc<dyn Fn(Uuid) -> Option<String> + Send + Sync> =
            Arc::new(move |uuid| lookup_sources.with_source(uuid, |s| s.channel.clone()).flatten());
        dissect::register_handlers(
            &chain,
            Arc::clone(&dot11),
            Arc::clone(&devices),
            Arc::clone(&channels),
            current_channel,
        );

        let capture_ctx = CaptureContext {
            tracker: Arc::clone(&sources),
            dot11: Arc::clone(&dot11),
            chain_tx,
        };

        Core {
            config,
            chain,
            devices,
            channels,
            dot11,
            sources,
            capture_ctx,
            chain_worker: Some(chain_worker),
            next_retry_at: Mutex::new(HashMap::new()),
        }
    }

    /// Opens a local `pcapfile:source=<path>` definition and spawns the
    /// replay thread immediately, standing in for the real driver's "spawn
    /// the capture helper process" step (spec.md §4.4 `open`).
    pub fn open_pcapfile(&self, definition: &str) -> Result<Uuid, KismetError> {
        let uuid = self
            .sources
            .open(definition, false)
            .map_err(|err| KismetError::Driver(err.to_string()))?;
        let ctx = self.capture_ctx.clone();
        let path = pcapfile::source_path(definition)
            .ok_or_else(|| KismetError::Config(format!("{definition}: missing source= path")))?;
        std::thread::Builder::new()
            .name(format!("pcapfile-{uuid}"))
            .spawn(move || pcapfile::replay(uuid, &path, &ctx))
            .map_err(|err| KismetError::Resource(err.to_string()))?;
        Ok(uuid)
    }

    /// Binds the remote capture listener (spec.md §4.4 "remote listener")
    /// on a narrow, dedicated tokio runtime (SPEC_FULL.md §5), and runs it
    /// on its own thread for the life of the process.
    pub fn spawn_remote_listener(&self) -> std::io::Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.remote_listen_port));
        let sources = Arc::clone(&self.sources);
        let std_listener = std::net::TcpListener::bind(addr)?;
        std_listener.set_nonblocking(true)?;
        std::thread::Builder::new()
            .name("kismet-remote".into())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
                    Ok(rt) => rt,
                    Err(err) => {
                        warn!(%err, "failed to start remote listener runtime");
                        return;
                    }
                };
                runtime.block_on(async move {
                    let listener = match tokio::net::TcpListener::from_std(std_listener) {
                        Ok(l) => l,
                        Err(err) => {
                            warn!(%err, "failed to adopt remote listener socket");
                            return;
                        }
                    };
                    kismet_datasource::serve(listener, sources).await;
                });
            })?;
        info!(port = self.config.remote_listen_port, "remote capture listener started");
        Ok(())
    }

    /// One timer tick's worth of periodic maintenance: fleet hop
    /// recomputation, channel-counter flush, device reap, dirty publish,
    /// and error-backoff retry (spec.md §4.4, §4.6, §4.9).
    fn tick(&self, epoch_ms: u64) {
        // The channel-list-setting command lives on the HTTP surface
        // (spec.md §1 Non-goal); with none configured yet, this only
        // re-paces sources that already carry their own hop schedule.
        self.sources.recompute_hop_assignments(epoch_ms, self.config.default_hop_rate_hz, &[]);
        self.channels.flush();

        let now = now_secs();
        let removed = self.devices.reap(now, self.config.device_max_age.as_secs(), self.config.device_keep_threshold);
        if !removed.is_empty() {
            debug!(count = removed.len(), "reaped stale devices");
        }

        let dirty = self.devices.take_dirty();
        if !dirty.is_empty() {
            debug!(count = dirty.len(), "devices dirty since last publish");
        }

        self.retry_errored_sources(now);
    }

    fn retry_errored_sources(&self, now: u64) {
        let mut next_retry_at = self.next_retry_at.lock_or_panic();
        let errored: Vec<Uuid> = self.sources.iterate(|s| {
            (s.uuid, s.state(), s.is_fatal())
        }).into_iter().filter(|(_, state, fatal)| *state == SourceState::Error && !*fatal).map(|(uuid, ..)| uuid).collect();

        for uuid in errored {
            let eligible = next_retry_at.get(&uuid).map_or(true, |&at| now >= at);
            if !eligible {
                continue;
            }
            let backoff = self.sources.with_source(uuid, |s| {
                let _ = s.retry();
                s.backoff_secs()
            });
            if let Some(backoff) = backoff {
                next_retry_at.insert(uuid, now + backoff);
            }
        }
        next_retry_at.retain(|uuid, _| self.sources.with_source(*uuid, |_| ()).is_some());
    }

    /// Runs the main timer loop until `shutdown` is set, per spec.md §6
    /// exit-code 0 on clean shutdown.
    pub fn run_until_shutdown(&self, shutdown: &AtomicBool) {
        info!("kismetd main loop started");
        while !shutdown.load(Ordering::Relaxed) {
            self.tick(now_millis());
            std::thread::sleep(MAIN_LOOP_TICK);
        }
        info!("shutdown requested, draining chain");
    }

    pub fn shutdown(mut self) {
        if let Some(worker) = self.chain_worker.take() {
            // Dropping self drops the capture context's chain sender; once
            // every replay thread's clone is gone too, the worker's recv
            // loop sees disconnection and returns.
            drop(self);
            worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::thread;
    use std::time::Duration as StdDuration;

    fn write_beacon_pcap(path: &std::path::Path) {
        let mut frame = vec![0x80u8, 0, 0, 0];
        frame.extend_from_slice(&[0xff; 6]); // addr1
        frame.extend_from_slice(&[0x02, 0x11, 0x22, 0x33, 0x44, 0x55]); // addr2
        frame.extend_from_slice(&[0x02, 0x11, 0x22, 0x33, 0x44, 0x55]); // addr3 (bssid)
        frame.extend_from_slice(&[0, 0]); // seq ctrl
        frame.extend_from_slice(&[0u8; 12]); // fixed fields

        let mut file = std::fs::File::create(path).unwrap();
        file.write_all(&0xa1b2_c3d4u32.to_le_bytes()).unwrap();
        file.write_all(&2u16.to_le_bytes()).unwrap();
        file.write_all(&4u16.to_le_bytes()).unwrap();
        file.write_all(&0i32.to_le_bytes()).unwrap();
        file.write_all(&0u32.to_le_bytes()).unwrap();
        file.write_all(&65535u32.to_le_bytes()).unwrap();
        file.write_all(&105u32.to_le_bytes()).unwrap();
        file.write_all(&0u32.to_le_bytes()).unwrap();
        file.write_all(&0u32.to_le_bytes()).unwrap();
        file.write_all(&(frame.len() as u32).to_le_bytes()).unwrap();
        file.write_all(&(frame.len() as u32).to_le_bytes()).unwrap();
        file.write_all(&frame).unwrap();
    }

    #[test]
    fn replaying_a_pcapfile_populates_the_device_registry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("beacon.pcap");
        write_beacon_pcap(&path);

        let core = Core::new(Config::default());
        core.open_pcapfile(&format!("pcapfile:source={}", path.display())).unwrap();

        let mut saw_device = false;
        for _ in 0..50 {
            thread::sleep(StdDuration::from_millis(20));
            if core.devices.len() > 0 {
                saw_device = true;
                break;
            }
        }
        assert!(saw_device, "expected the replayed beacon to create a tracked device");
        core.shutdown();
    }

    #[test]
    fn retry_errored_sources_transitions_error_sources_into_backoff() {
        let core = Core::new(Config::default());
        let uuid = core.open_pcapfile("pcapfile:source=/nonexistent/path.pcap").unwrap();

        let mut reached_error = false;
        for _ in 0..50 {
            thread::sleep(StdDuration::from_millis(20));
            if core.sources.with_source(uuid, |s| s.state()) == Some(SourceState::Error) {
                reached_error = true;
                break;
            }
        }
        assert!(reached_error, "expected the missing file to drive the source into Error");

        core.retry_errored_sources(now_secs());
        assert_eq!(core.sources.with_source(uuid, |s| s.state()), Some(SourceState::Opening));
        assert_eq!(core.next_retry_at.lock_or_panic().len(), 1);
        core.shutdown();
    }
}
