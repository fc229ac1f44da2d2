// SPDX-License-Identifier: Apache-2.0

//! Fleet-level channel hop scheduling (spec.md §4.4).
//!
//! Each hopping source is assigned a phase (its index among same-driver
//! sources when `split_same_sources` is set, else zero) so that
//! same-driver sources interleave distinct channels rather than dwelling
//! on the same one in lockstep. The current index into the shared channel
//! list is `(elapsed dwell-periods + phase) mod schedule length`.

use std::collections::HashMap;

use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct HoppingSource {
    pub uuid: Uuid,
    pub driver: String,
    pub source_number: u64,
}

/// A deterministic, source-number-keyed permutation of `0..len`, used when
/// `random_channel_order` is set. Not cryptographic; only needs to be
/// stable and roughly decorrelated between adjacent source numbers.
fn permute(len: usize, seed: u64) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..len).collect();
    let mut state = seed.wrapping_mul(0x9E3779B97F4A7C15).wrapping_add(1);
    for i in (1..len).rev() {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        let j = (state as usize) % (i + 1);
        indices.swap(i, j);
    }
    indices
}

/// Computes the current channel token for every hopping source in
/// `sources`, given a shared `schedule` (token list; dwell is
/// `1000.0 / hop_rate_hz` milliseconds) and `elapsed_ms` since some fixed
/// epoch (the tracker uses process-monotonic milliseconds).
pub fn compute_fleet_hop_assignment(
    sources: &[HoppingSource],
    schedule: &[String],
    hop_rate_hz: f64,
    elapsed_ms: u64,
    split_same_sources: bool,
    random_channel_order: bool,
) -> HashMap<Uuid, String> {
    let mut assignment = HashMap::new();
    if schedule.is_empty() || hop_rate_hz <= 0.0 {
        return assignment;
    }
    let dwell_ms = (1000.0 / hop_rate_hz).round().max(1.0) as u64;
    let elapsed_periods = elapsed_ms / dwell_ms;

    let mut per_driver_counter: HashMap<&str, u64> = HashMap::new();
    let mut ordered = sources.to_vec();
    ordered.sort_by_key(|s| s.source_number);

    for source in &ordered {
        let phase = if split_same_sources {
            let counter = per_driver_counter.entry(source.driver.as_str()).or_insert(0);
            let phase = *counter;
            *counter += 1;
            phase
        } else {
            0
        };

        let base_index = ((elapsed_periods + phase) % schedule.len() as u64) as usize;
        let index = if random_channel_order {
            let perm = permute(schedule.len(), source.source_number);
            perm[base_index]
        } else {
            base_index
        };

        assignment.insert(source.uuid, schedule[index].clone());
    }
    assignment
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(n: u64) -> HoppingSource {
        HoppingSource {
            uuid: Uuid::from_u128(n as u128),
            driver: "wext".to_string(),
            source_number: n,
        }
    }

    #[test]
    fn hop_split_matches_scenario() {
        let schedule = vec!["1".to_string(), "6".to_string(), "11".to_string()];
        let sources = vec![source(0), source(1)];

        let at_t0 = compute_fleet_hop_assignment(&sources, &schedule, 5.0, 0, true, false);
        assert_eq!(at_t0[&sources[0].uuid], "1");
        assert_eq!(at_t0[&sources[1].uuid], "6");

        let at_t200 = compute_fleet_hop_assignment(&sources, &schedule, 5.0, 200, true, false);
        assert_eq!(at_t200[&sources[0].uuid], "6");
        assert_eq!(at_t200[&sources[1].uuid], "11");
    }

    #[test]
    fn without_split_all_same_driver_sources_share_a_channel() {
        let schedule = vec!["1".to_string(), "6".to_string()];
        let sources = vec![source(0), source(1)];
        let assignment = compute_fleet_hop_assignment(&sources, &schedule, 5.0, 0, false, false);
        assert_eq!(assignment[&sources[0].uuid], assignment[&sources[1].uuid]);
    }

    #[test]
    fn empty_schedule_produces_no_assignment() {
        let sources = vec![source(0)];
        let assignment = compute_fleet_hop_assignment(&sources, &[], 5.0, 0, true, false);
        assert!(assignment.is_empty());
    }

    #[test]
    fn random_order_still_only_picks_tokens_from_the_schedule() {
        let schedule = vec!["1".to_string(), "6".to_string(), "11".to_string()];
        let sources = vec![source(7)];
        let assignment = compute_fleet_hop_assignment(&sources, &schedule, 5.0, 400, true, true);
        assert!(schedule.contains(&assignment[&sources[0].uuid]));
    }
}
