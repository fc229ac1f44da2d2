// SPDX-License-Identifier: Apache-2.0

//! `TrackedElement`: the tagged-union value every endpoint projection is
//! built from (spec.md Design Notes §9: "behavior is selected by variant
//! tag, not by vtable. Serialization is a total function over the
//! variant").
//!
//! Map keys that are not naturally strings (MAC, numeric frequency,
//! device-key) are rendered to their string form before insertion, since
//! the wire format is JSON and JSON object keys are always strings; the
//! variant tag (`MacMap`, `U64Map`, `KeyMap`) still records what the key
//! space conceptually was.

use std::collections::BTreeMap;

use kismet_common::{DeviceKey, Mac};
use kismet_rrd::{Aggregator, Rrd};
use uuid::Uuid;

#[derive(Debug, Clone, serde::Serialize)]
#[serde(untagged)]
pub enum TrackedElement {
    Bool(bool),
    I64(i64),
    U64(u64),
    Double(f64),
    String(String),
    Vector(Vec<TrackedElement>),
    Map(BTreeMap<String, TrackedElement>),
    /// `map<mac, ·>` — keys are rendered `Mac::to_string()`.
    MacMap(BTreeMap<String, TrackedElement>),
    /// `map<u64, ·>` — keys are rendered via `to_string()`.
    U64Map(BTreeMap<String, TrackedElement>),
    /// `map<devkey, ·>` — keys are rendered `DeviceKey::to_string()`.
    KeyMap(BTreeMap<String, TrackedElement>),
    /// An already-serialized escape hatch for values with no dedicated
    /// variant (spec.md Design Notes §9's `custom`).
    Custom(serde_json::Value),
}

impl TrackedElement {
    pub fn map() -> BTreeMap<String, TrackedElement> {
        BTreeMap::new()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl From<bool> for TrackedElement {
    fn from(v: bool) -> Self {
        TrackedElement::Bool(v)
    }
}

impl From<u64> for TrackedElement {
    fn from(v: u64) -> Self {
        TrackedElement::U64(v)
    }
}

impl From<i64> for TrackedElement {
    fn from(v: i64) -> Self {
        TrackedElement::I64(v)
    }
}

impl From<f64> for TrackedElement {
    fn from(v: f64) -> Self {
        TrackedElement::Double(v)
    }
}

impl From<String> for TrackedElement {
    fn from(v: String) -> Self {
        TrackedElement::String(v)
    }
}

impl From<&str> for TrackedElement {
    fn from(v: &str) -> Self {
        TrackedElement::String(v.to_string())
    }
}

impl From<Mac> for TrackedElement {
    fn from(v: Mac) -> Self {
        TrackedElement::String(v.to_string())
    }
}

impl From<Uuid> for TrackedElement {
    fn from(v: Uuid) -> Self {
        TrackedElement::String(v.to_string())
    }
}

impl From<DeviceKey> for TrackedElement {
    fn from(v: DeviceKey) -> Self {
        TrackedElement::String(v.to_string())
    }
}

impl<T: Into<TrackedElement>> From<Option<T>> for TrackedElement {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => TrackedElement::Custom(serde_json::Value::Null),
        }
    }
}

/// Projects an [`Rrd`] into `kismet.common.rrd.*` fields: the three
/// resolution vectors plus the most recent value, matching the real
/// server's `tracked_rrd` serialization shape.
pub fn rrd_element<A: Aggregator>(rrd: &Rrd<A>) -> TrackedElement {
    let mut map = TrackedElement::map();
    map.insert(
        "kismet.common.rrd.last_time".to_string(),
        TrackedElement::U64(0),
    );
    map.insert(
        "kismet.common.rrd.minute_vec".to_string(),
        TrackedElement::Vector(rrd.seconds().buckets().iter().map(|b| TrackedElement::Double(b.value())).collect()),
    );
    map.insert(
        "kismet.common.rrd.hour_vec".to_string(),
        TrackedElement::Vector(rrd.minutes().buckets().iter().map(|b| TrackedElement::Double(b.value())).collect()),
    );
    map.insert(
        "kismet.common.rrd.day_vec".to_string(),
        TrackedElement::Vector(rrd.hours().buckets().iter().map(|b| TrackedElement::Double(b.value())).collect()),
    );
    TrackedElement::Map(map)
}
