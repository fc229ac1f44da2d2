// SPDX-License-Identifier: Apache-2.0

//! A single fixed-size round-robin ring of buckets at one resolution.

use crate::aggregator::Aggregator;

#[derive(Debug, Clone)]
pub struct Ring<A: Aggregator> {
    slot_secs: u64,
    slots: Vec<A>,
    /// Slot index (since the epoch, in units of `slot_secs`) most recently
    /// written to, or `None` before the first update.
    last_slot: Option<u64>,
}

impl<A: Aggregator> Ring<A> {
    pub fn new(num_slots: usize, slot_secs: u64) -> Self {
        Ring {
            slot_secs,
            slots: vec![A::default(); num_slots],
            last_slot: None,
        }
    }

    fn index_of(&self, slot: u64) -> usize {
        (slot % self.slots.len() as u64) as usize
    }

    /// Records `value` at `timestamp`, back-filling any skipped buckets
    /// with `A::default_fill()` (spec.md §4.8).
    pub fn update(&mut self, timestamp: u64, value: f64) {
        let slot = timestamp / self.slot_secs.max(1);
        match self.last_slot {
            None => {
                let idx = self.index_of(slot);
                self.slots[idx] = A::default();
                self.slots[idx].combine(value);
            }
            Some(last) if slot >= last => {
                let gap = slot - last;
                // Back-fill every bucket strictly between `last` and `slot`.
                let fill_count = gap.saturating_sub(1).min(self.slots.len() as u64);
                for step in 1..=fill_count {
                    let idx = self.index_of(last + step);
                    self.slots[idx] = A::default_fill();
                }
                let idx = self.index_of(slot);
                if gap >= self.slots.len() as u64 || gap > 0 {
                    self.slots[idx] = A::default();
                }
                self.slots[idx].combine(value);
            }
            Some(_) => {
                // timestamp moved backwards; fold into the current bucket
                // without disturbing cursor bookkeeping.
                let idx = self.index_of(slot);
                self.slots[idx].combine(value);
                return;
            }
        }
        self.last_slot = Some(slot);
    }

    pub fn buckets(&self) -> &[A] {
        &self.slots
    }

    pub fn latest(&self) -> Option<&A> {
        self.last_slot.map(|s| &self.slots[self.index_of(s)])
    }
}
