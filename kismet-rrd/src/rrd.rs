// SPDX-License-Identifier: Apache-2.0

//! A device or channel signal keeps three [`Ring`]s at different
//! resolutions so a client can ask for "the last minute", "the last hour",
//! or "the last day" without the server retaining raw samples forever
//! (spec.md §4.8).

use crate::aggregator::Aggregator;
use crate::ring::Ring;

const SECOND_SLOTS: usize = 60;
const MINUTE_SLOTS: usize = 60;
const HOUR_SLOTS: usize = 24;

#[derive(Debug, Clone)]
pub struct Rrd<A: Aggregator> {
    seconds: Ring<A>,
    minutes: Ring<A>,
    hours: Ring<A>,
}

impl<A: Aggregator> Rrd<A> {
    pub fn new() -> Self {
        Rrd {
            seconds: Ring::new(SECOND_SLOTS, 1),
            minutes: Ring::new(MINUTE_SLOTS, 60),
            hours: Ring::new(HOUR_SLOTS, 3600),
        }
    }

    /// Folds one sample, observed at `timestamp` (unix seconds), into all
    /// three rings simultaneously.
    pub fn update(&mut self, timestamp: u64, value: f64) {
        self.seconds.update(timestamp, value);
        self.minutes.update(timestamp, value);
        self.hours.update(timestamp, value);
    }

    pub fn seconds(&self) -> &Ring<A> {
        &self.seconds
    }

    pub fn minutes(&self) -> &Ring<A> {
        &self.minutes
    }

    pub fn hours(&self) -> &Ring<A> {
        &self.hours
    }

    pub fn latest_value(&self) -> f64 {
        self.seconds.latest().map(A::value).unwrap_or(0.0)
    }
}

impl<A: Aggregator> Default for Rrd<A> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::{Extreme, Sum};

    #[test]
    fn updates_all_three_resolutions() {
        let mut rrd: Rrd<Sum> = Rrd::new();
        rrd.update(0, 3.0);
        rrd.update(1, 4.0);
        assert_eq!(rrd.seconds().buckets()[1].value(), 4.0);
        assert_eq!(rrd.minutes().buckets()[0].value(), 7.0);
        assert_eq!(rrd.hours().buckets()[0].value(), 7.0);
    }

    #[test]
    fn latest_value_tracks_most_recent_sample() {
        let mut rrd: Rrd<Extreme> = Rrd::new();
        rrd.update(10, -40.0);
        rrd.update(11, -55.0);
        assert_eq!(rrd.latest_value(), -55.0);
    }

    #[test]
    fn minute_ring_does_not_advance_within_same_minute() {
        let mut rrd: Rrd<Sum> = Rrd::new();
        rrd.update(0, 1.0);
        rrd.update(59, 1.0);
        assert_eq!(rrd.minutes().buckets()[0].value(), 2.0);
    }
}
