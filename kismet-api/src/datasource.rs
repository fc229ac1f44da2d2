// SPDX-License-Identifier: Apache-2.0

//! `kismet.datasource.*` JSON projection (spec.md §6:
//! `/datasource/all_sources.json`, `/datasource/list_interfaces.cmd`).

use kismet_datasource::{Source, SourceState};

use crate::value::TrackedElement;

fn state_name(state: SourceState) -> &'static str {
    match state {
        SourceState::Closed => "closed",
        SourceState::Probing => "probing",
        SourceState::Opening => "opening",
        SourceState::Open => "open",
        SourceState::Hopping => "hopping",
        SourceState::Error => "error",
        SourceState::Paused => "paused",
    }
}

pub fn source_json(source: &Source) -> serde_json::Value {
    let mut map = TrackedElement::map();
    map.insert("kismet.datasource.uuid".to_string(), source.uuid.into());
    map.insert("kismet.datasource.type_driver".to_string(), TrackedElement::String(source.driver.clone()));
    map.insert("kismet.datasource.definition".to_string(), TrackedElement::String(source.definition.clone()));
    map.insert("kismet.datasource.source_number".to_string(), TrackedElement::U64(source.source_number));
    map.insert("kismet.datasource.running".to_string(), TrackedElement::Bool(
        matches!(source.state(), SourceState::Open | SourceState::Hopping),
    ));
    map.insert("kismet.datasource.error".to_string(), TrackedElement::Bool(
        source.state() == SourceState::Error,
    ));
    map.insert("kismet.datasource.state".to_string(), TrackedElement::String(state_name(source.state()).to_string()));
    map.insert("kismet.datasource.channel".to_string(), source.channel.clone().into());
    map.insert("kismet.datasource.remote".to_string(), TrackedElement::Bool(source.remote));
    map.insert("kismet.datasource.last_error".to_string(), source.last_error.clone().into());
    TrackedElement::Map(map).to_json()
}

/// `/datasource/all_sources.json`.
pub fn all_sources_json<'a>(sources: impl Iterator<Item = &'a Source>) -> serde_json::Value {
    serde_json::Value::Array(sources.map(source_json).collect())
}

/// `/datasource/list_interfaces.cmd`: a flat list of `(interface,
/// driver-hint)` pairs, deduplicated the way `SourceTracker::list` would
/// aggregate prototype `INTERFACE` responses (spec.md §4.4).
pub fn list_interfaces_json(interfaces: &[(String, String)]) -> serde_json::Value {
    serde_json::Value::Array(
        interfaces
            .iter()
            .map(|(interface, driver)| {
                let mut map = TrackedElement::map();
                map.insert("kismet.datasource.probed.interface".to_string(), TrackedElement::String(interface.clone()));
                map.insert("kismet.datasource.probed.type_driver".to_string(), TrackedElement::String(driver.clone()));
                TrackedElement::Map(map).to_json()
            })
            .collect(),
    )
}
