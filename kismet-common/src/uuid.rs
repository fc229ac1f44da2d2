// SPDX-License-Identifier: Apache-2.0

//! Source identity UUIDs (spec.md §3: "UUID (deterministic hash of driver
//! name + interface definition)").

/// Namespace used to derive deterministic per-source UUIDs. Arbitrary but
/// fixed so that the same `(driver, definition)` pair always yields the
/// same UUID across process restarts, which is what lets a reopened source
/// recover its previous source-number (spec.md §4.4 invariants).
const SOURCE_NAMESPACE: uuid::Uuid = uuid::Uuid::from_bytes([
    0x4b, 0x69, 0x73, 0x6d, 0x65, 0x74, 0x2d, 0x73, 0x72, 0x63, 0x2d, 0x6e, 0x73, 0x00, 0x00, 0x00,
]);

pub fn source_uuid(driver: &str, definition: &str) -> uuid::Uuid {
    let name = format!("{driver}\u{0}{definition}");
    uuid::Uuid::new_v5(&SOURCE_NAMESPACE, name.as_bytes())
}
