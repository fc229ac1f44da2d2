// SPDX-License-Identifier: Apache-2.0

//! The dedicated chain worker thread. Exactly one instance drains the
//! packet input queue and runs the chain; it never suspends mid-handler
//! (spec.md §5) — the only suspension point is the blocking receive on an
//! empty queue.

use crate::chain::PacketChain;
use crate::packet::Packet;
use crossbeam_channel::{Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;

pub fn input_queue(capacity: usize) -> (Sender<Packet>, Receiver<Packet>) {
    crossbeam_channel::bounded(capacity)
}

pub struct ChainWorker {
    handle: Option<JoinHandle<()>>,
}

impl ChainWorker {
    /// Spawns the single chain worker thread, which loops `chain.run(..)`
    /// over packets received on `rx` until the channel disconnects (every
    /// sender dropped) — the orderly shutdown path.
    pub fn spawn(chain: Arc<PacketChain>, rx: Receiver<Packet>) -> Self {
        let handle = std::thread::Builder::new()
            .name("kismet-chain".into())
            .spawn(move || {
                while let Ok(mut packet) = rx.recv() {
                    chain.run(&mut packet);
                }
                tracing::info!("chain worker exiting: input queue closed");
            })
            .expect("failed to spawn chain worker thread");
        ChainWorker {
            handle: Some(handle),
        }
    }

    pub fn join(mut self) {
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::Stage;
    use crate::packet::CaptureTime;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn drains_packets_in_order_then_exits_on_disconnect() {
        let chain = Arc::new(PacketChain::new());
        let counter = Arc::new(AtomicU32::new(0));
        let c = counter.clone();
        chain.register(
            Stage::Tracker,
            0,
            Box::new(move |_| {
                c.fetch_add(1, Ordering::SeqCst);
            }),
        );

        let (tx, rx) = input_queue(8);
        let worker = ChainWorker::spawn(chain, rx);
        for _ in 0..5 {
            tx.send(Packet::new(CaptureTime { secs: 0, micros: 0 }, uuid::Uuid::nil()))
                .unwrap();
        }
        drop(tx);
        worker.join();
        assert_eq!(counter.load(Ordering::SeqCst), 5);
    }
}
