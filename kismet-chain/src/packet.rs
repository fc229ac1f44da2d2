// SPDX-License-Identifier: Apache-2.0

//! `Packet`: a container carrying a capture timestamp, source identifier,
//! error/filtered flags, and a sparse map from component-id to an owned
//! component payload (spec.md §3, §4.5).

use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, OnceLock};

/// Small integer assigned to a component name at registration time
/// (spec.md §4.5: "components are identified by small integers assigned at
/// startup via `register_component(name) -> id`").
pub type ComponentId = u32;

/// Explicit, process-wide component name table. Modeled as a typed entry
/// in a service map rather than ad hoc globals (Design Notes §9: "Global
/// registry collapses to an explicit `CoreContext` value... lifetime
/// globals become entries in its typed service map").
#[derive(Default)]
pub struct ComponentRegistry {
    next_id: AtomicU32,
    names: Mutex<HashMap<String, ComponentId>>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        ComponentRegistry {
            next_id: AtomicU32::new(0),
            names: Mutex::new(HashMap::new()),
        }
    }

    /// Idempotent: registering the same name twice returns the same id.
    pub fn register(&self, name: &str) -> ComponentId {
        use kismet_common::MutexExt;
        let mut names = self.names.lock_or_panic();
        if let Some(id) = names.get(name) {
            return *id;
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        names.insert(name.to_string(), id);
        id
    }

    pub fn lookup(&self, name: &str) -> Option<ComponentId> {
        use kismet_common::MutexExt;
        self.names.lock_or_panic().get(name).copied()
    }
}

/// The chain-wide component registry. A single process has exactly one,
/// populated at startup before any packet is constructed.
pub fn registry() -> &'static ComponentRegistry {
    static REGISTRY: OnceLock<ComponentRegistry> = OnceLock::new();
    REGISTRY.get_or_init(ComponentRegistry::new)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureTime {
    pub secs: u64,
    pub micros: u32,
}

pub struct Packet {
    pub capture_time: CaptureTime,
    pub source_uuid: uuid::Uuid,
    pub error: bool,
    pub filtered: bool,
    components: HashMap<ComponentId, Box<dyn Any + Send>>,
}

impl Packet {
    pub fn new(capture_time: CaptureTime, source_uuid: uuid::Uuid) -> Self {
        Packet {
            capture_time,
            source_uuid,
            error: false,
            filtered: false,
            components: HashMap::new(),
        }
    }

    /// Stores an owned component value, replacing any previous value under
    /// the same id.
    pub fn insert<T: Send + 'static>(&mut self, id: ComponentId, value: T) {
        self.components.insert(id, Box::new(value));
    }

    pub fn fetch<T: Send + 'static>(&self, id: ComponentId) -> Option<&T> {
        self.components.get(&id).and_then(|b| b.downcast_ref())
    }

    pub fn fetch_mut<T: Send + 'static>(&mut self, id: ComponentId) -> Option<&mut T> {
        self.components.get_mut(&id).and_then(|b| b.downcast_mut())
    }

    pub fn remove(&mut self, id: ComponentId) {
        self.components.remove(&id);
    }

    pub fn mark_error(&mut self) {
        self.error = true;
    }

    pub fn mark_filtered(&mut self) {
        self.filtered = true;
    }

    /// Frees all attached components; called by the DESTROY stage
    /// (spec.md §4.5).
    pub fn destroy(&mut self) {
        self.components.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registering_same_name_twice_is_idempotent() {
        let reg = ComponentRegistry::new();
        let a = reg.register("gps");
        let b = reg.register("gps");
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_names_get_distinct_ids() {
        let reg = ComponentRegistry::new();
        let a = reg.register("gps");
        let b = reg.register("signal");
        assert_ne!(a, b);
    }

    #[test]
    fn insert_fetch_roundtrip_and_destroy_clears() {
        let reg = ComponentRegistry::new();
        let id = reg.register("signal");
        let mut packet = Packet::new(CaptureTime { secs: 1, micros: 0 }, uuid::Uuid::nil());
        packet.insert(id, 42i32);
        assert_eq!(packet.fetch::<i32>(id), Some(&42));
        packet.destroy();
        assert_eq!(packet.fetch::<i32>(id), None);
    }
}
