// SPDX-License-Identifier: Apache-2.0

//! The datasource tracker (C4): prototype registry, probing, open/list
//! orchestration, and fleet hop scheduling (spec.md §4.4).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use kismet_common::{uuid::source_uuid, MutexExt};
use uuid::Uuid;

use crate::hop::{compute_fleet_hop_assignment, HoppingSource};
use crate::source::{Source, SourceState};

#[derive(Debug, thiserror::Error)]
pub enum DatasourceError {
    #[error("no prototype could claim definition {0:?}")]
    NoProto(String),
    #[error("unknown source {0}")]
    UnknownSource(Uuid),
    #[error("definition {0:?} names unregistered driver {1:?}")]
    UnknownDriver(String, String),
}

/// What a registered capture driver prototype can do, standing in for the
/// external helper binary itself.
pub trait SourceBuilder: Send + Sync {
    fn driver_name(&self) -> &str;
    /// Whether this driver can answer a passive (no-subprocess) probe.
    fn supports_passive_probe(&self) -> bool {
        false
    }
    /// Returns `true` if this driver claims `definition`.
    fn probe(&self, definition: &str) -> bool;
}

fn driver_tag(definition: &str) -> &str {
    definition.split(':').next().unwrap_or(definition)
}

struct Inner {
    prototypes: HashMap<String, Arc<dyn SourceBuilder>>,
    sources: HashMap<Uuid, Source>,
    /// Insertion order, preserved for hop-scheduling stability (spec.md
    /// §3: "`sources`... with insertion-order stable iteration").
    order: Vec<Uuid>,
}

pub struct SourceTracker {
    inner: Mutex<Inner>,
    next_source_number: AtomicU64,
    pub split_same_sources: bool,
    pub random_channel_order: bool,
}

impl SourceTracker {
    pub fn new(split_same_sources: bool, random_channel_order: bool) -> Self {
        SourceTracker {
            inner: Mutex::new(Inner {
                prototypes: HashMap::new(),
                sources: HashMap::new(),
                order: Vec::new(),
            }),
            next_source_number: AtomicU64::new(0),
            split_same_sources,
            random_channel_order,
        }
    }

    pub fn register_prototype(&self, builder: Arc<dyn SourceBuilder>) {
        let mut inner = self.inner.lock_or_panic();
        inner.prototypes.insert(builder.driver_name().to_string(), builder);
    }

    /// Fans out to every prototype capable of a passive probe first; the
    /// first affirmative answer wins (spec.md §4.4). If `definition` names
    /// an explicit driver (not auto-detected), only that prototype is
    /// consulted.
    pub fn probe(&self, definition: &str) -> Result<String, DatasourceError> {
        let inner = self.inner.lock_or_panic();
        let tag = driver_tag(definition);

        if let Some(builder) = inner.prototypes.get(tag) {
            if builder.probe(definition) {
                return Ok(tag.to_string());
            }
            return Err(DatasourceError::NoProto(definition.to_string()));
        }

        let mut passive: Vec<&Arc<dyn SourceBuilder>> = inner
            .prototypes
            .values()
            .filter(|b| b.supports_passive_probe())
            .collect();
        passive.sort_by_key(|b| b.driver_name().to_string());
        for builder in passive {
            if builder.probe(definition) {
                return Ok(builder.driver_name().to_string());
            }
        }
        for builder in inner.prototypes.values() {
            if !builder.supports_passive_probe() && builder.probe(definition) {
                return Ok(builder.driver_name().to_string());
            }
        }
        Err(DatasourceError::NoProto(definition.to_string()))
    }

    /// Opens a source for `definition`, probing first if the driver tag
    /// isn't a registered prototype name. Reopening a UUID that already
    /// exists (closed) preserves its source number (spec.md §3).
    pub fn open(&self, definition: &str, remote: bool) -> Result<Uuid, DatasourceError> {
        let mut inner = self.inner.lock_or_panic();
        let tag = driver_tag(definition).to_string();
        if !inner.prototypes.contains_key(&tag) {
            return Err(DatasourceError::UnknownDriver(definition.to_string(), tag));
        }

        let uuid = source_uuid(&tag, definition);
        if let Some(existing) = inner.sources.get_mut(&uuid) {
            existing.close();
            let _ = existing.begin_open();
            return Ok(uuid);
        }

        let number = self.next_source_number.fetch_add(1, Ordering::SeqCst);
        let mut source = Source::new(uuid, &tag, definition, number, remote);
        let _ = source.begin_open();
        inner.sources.insert(uuid, source);
        inner.order.push(uuid);
        Ok(uuid)
    }

    pub fn close(&self, uuid: Uuid) -> Result<(), DatasourceError> {
        let mut inner = self.inner.lock_or_panic();
        inner
            .sources
            .get_mut(&uuid)
            .map(Source::close)
            .ok_or(DatasourceError::UnknownSource(uuid))
    }

    pub fn remove(&self, uuid: Uuid) -> Result<(), DatasourceError> {
        let mut inner = self.inner.lock_or_panic();
        if inner.sources.remove(&uuid).is_none() {
            return Err(DatasourceError::UnknownSource(uuid));
        }
        inner.order.retain(|u| *u != uuid);
        Ok(())
    }

    pub fn with_source<R>(&self, uuid: Uuid, f: impl FnOnce(&mut Source) -> R) -> Option<R> {
        let mut inner = self.inner.lock_or_panic();
        inner.sources.get_mut(&uuid).map(f)
    }

    pub fn source_count(&self) -> usize {
        self.inner.lock_or_panic().sources.len()
    }

    /// Snapshot iteration in insertion order (spec.md §4.4: "visitor may
    /// not mutate the tracker").
    pub fn iterate<R>(&self, mut visitor: impl FnMut(&Source) -> R) -> Vec<R> {
        let inner = self.inner.lock_or_panic();
        inner
            .order
            .iter()
            .filter_map(|uuid| inner.sources.get(uuid))
            .map(&mut visitor)
            .collect()
    }

    /// Recomputes and pushes channel assignments to every hopping source,
    /// skipping locked (non-hopping) sources (spec.md §4.4).
    pub fn recompute_hop_assignments(&self, elapsed_ms: u64, hop_rate_hz: f64, schedule: &[String]) {
        let mut inner = self.inner.lock_or_panic();
        let hopping: Vec<HoppingSource> = inner
            .sources
            .values()
            .filter(|s| matches!(s.state(), SourceState::Open | SourceState::Hopping))
            .filter(|s| s.hop_schedule.len() > 1 || schedule.len() > 1)
            .map(|s| HoppingSource {
                uuid: s.uuid,
                driver: s.driver.clone(),
                source_number: s.source_number,
            })
            .collect();

        let assignment = compute_fleet_hop_assignment(
            &hopping,
            schedule,
            hop_rate_hz,
            elapsed_ms,
            self.split_same_sources,
            self.random_channel_order,
        );

        for (uuid, token) in assignment {
            if let Some(source) = inner.sources.get_mut(&uuid) {
                let _ = source.configure_channel(token);
            }
        }
    }
}

impl Default for SourceTracker {
    fn default() -> Self {
        Self::new(true, false)
    }
}
