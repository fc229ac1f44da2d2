// SPDX-License-Identifier: Apache-2.0

//! The staged packet chain (spec.md §4.5). Exactly one chain worker thread
//! drains the packet input queue and runs every handler in fixed stage
//! order; registration/deregistration is allowed from other threads and
//! takes a writer lock on the affected stage's handler vector.

use crate::packet::Packet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    Genesis,
    PostCapture,
    LlcDissect,
    Decrypt,
    DataDissect,
    Classifier,
    Tracker,
    Logging,
    Destroy,
}

/// Fixed dispatch order (spec.md §4.5).
pub const STAGES: [Stage; 9] = [
    Stage::Genesis,
    Stage::PostCapture,
    Stage::LlcDissect,
    Stage::Decrypt,
    Stage::DataDissect,
    Stage::Classifier,
    Stage::Tracker,
    Stage::Logging,
    Stage::Destroy,
];

pub type Handler = Box<dyn Fn(&mut Packet) + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

struct Registration {
    id: HandlerId,
    priority: i32,
    insertion_order: u64,
    handler: Handler,
}

struct StageSlot {
    handlers: RwLock<Vec<Registration>>,
}

impl Default for StageSlot {
    fn default() -> Self {
        StageSlot {
            handlers: RwLock::new(Vec::new()),
        }
    }
}

/// The packet chain. Handlers never block (spec.md §5); anything that must
/// await external state defers by scheduling a follow-up task and marking
/// the packet processed in place.
pub struct PacketChain {
    stages: [StageSlot; 9],
    next_handler_id: AtomicU64,
    next_insertion_order: AtomicU64,
}

impl Default for PacketChain {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketChain {
    pub fn new() -> Self {
        PacketChain {
            stages: Default::default(),
            next_handler_id: AtomicU64::new(1),
            next_insertion_order: AtomicU64::new(0),
        }
    }

    fn slot(&self, stage: Stage) -> &StageSlot {
        &self.stages[STAGES.iter().position(|s| *s == stage).expect("stage in STAGES")]
    }

    /// Registers a handler at `stage` with the given `priority` (ascending
    /// priority runs first; ties broken by insertion order).
    pub fn register(&self, stage: Stage, priority: i32, handler: Handler) -> HandlerId {
        let id = HandlerId(self.next_handler_id.fetch_add(1, Ordering::Relaxed));
        let insertion_order = self.next_insertion_order.fetch_add(1, Ordering::Relaxed);
        let mut handlers = self
            .slot(stage)
            .handlers
            .write()
            .expect("stage lock poisoned");
        handlers.push(Registration {
            id,
            priority,
            insertion_order,
            handler,
        });
        handlers.sort_by_key(|r| (r.priority, r.insertion_order));
        id
    }

    pub fn deregister(&self, stage: Stage, id: HandlerId) {
        let mut handlers = self
            .slot(stage)
            .handlers
            .write()
            .expect("stage lock poisoned");
        handlers.retain(|r| r.id != id);
    }

    /// Walks `packet` through every stage in order. A handler marking the
    /// packet `error` or `filtered` informs later stages but never
    /// terminates the walk — DESTROY always runs (spec.md §4.5).
    pub fn run(&self, packet: &mut Packet) {
        for stage in STAGES {
            let handlers = self.slot(stage).handlers.read().expect("stage lock poisoned");
            for reg in handlers.iter() {
                (reg.handler)(packet);
            }
            if stage == Stage::Destroy {
                packet.destroy();
            }
        }
    }
}
