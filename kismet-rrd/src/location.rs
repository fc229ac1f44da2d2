// SPDX-License-Identifier: Apache-2.0

//! Running and historic GPS location aggregation (spec.md §4.8).
//!
//! Coordinates are scaled to fixed-point integers before accumulation so
//! that a long-lived device's running average never drifts the way a
//! float sum/count pair would after millions of updates.

const COORD_SCALE: f64 = 10_000.0;

/// A single fix, as reported by a GPS-bearing datasource.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Fix {
    pub lat: f64,
    pub lon: f64,
    pub alt: f64,
}

fn scale(v: f64) -> i64 {
    (v * COORD_SCALE).round() as i64
}

fn unscale(v: i64) -> f64 {
    v as f64 / COORD_SCALE
}

/// Running min/max/avg accumulator over scaled integer coordinates.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct RunningLocation {
    count: u64,
    sum_lat: i64,
    sum_lon: i64,
    sum_alt: i64,
    min_lat: i64,
    max_lat: i64,
    min_lon: i64,
    max_lon: i64,
}

impl RunningLocation {
    pub fn observe(&mut self, fix: Fix) {
        let (lat, lon, alt) = (scale(fix.lat), scale(fix.lon), scale(fix.alt));
        if self.count == 0 {
            self.min_lat = lat;
            self.max_lat = lat;
            self.min_lon = lon;
            self.max_lon = lon;
        } else {
            self.min_lat = self.min_lat.min(lat);
            self.max_lat = self.max_lat.max(lat);
            self.min_lon = self.min_lon.min(lon);
            self.max_lon = self.max_lon.max(lon);
        }
        self.sum_lat += lat;
        self.sum_lon += lon;
        self.sum_alt += alt;
        self.count += 1;
    }

    pub fn average(&self) -> Option<Fix> {
        if self.count == 0 {
            return None;
        }
        let n = self.count as i64;
        Some(Fix {
            lat: unscale(self.sum_lat / n),
            lon: unscale(self.sum_lon / n),
            alt: unscale(self.sum_alt / n),
        })
    }

    pub fn bounds(&self) -> Option<(Fix, Fix)> {
        if self.count == 0 {
            return None;
        }
        Some((
            Fix {
                lat: unscale(self.min_lat),
                lon: unscale(self.min_lon),
                alt: 0.0,
            },
            Fix {
                lat: unscale(self.max_lat),
                lon: unscale(self.max_lon),
                alt: 0.0,
            },
        ))
    }

    pub fn count(&self) -> u64 {
        self.count
    }
}

/// Fixed-capacity ring of the most recent fixes. When full, insertion
/// evicts the oldest fix in-place.
#[derive(Debug, Clone)]
struct HistoryRing {
    capacity: usize,
    points: Vec<Fix>,
    next: usize,
}

impl HistoryRing {
    fn new(capacity: usize) -> Self {
        HistoryRing {
            capacity,
            points: Vec::with_capacity(capacity),
            next: 0,
        }
    }

    fn push(&mut self, fix: Fix) {
        if self.points.len() < self.capacity {
            self.points.push(fix);
        } else {
            self.points[self.next] = fix;
            self.next = (self.next + 1) % self.capacity;
        }
    }

    fn average(&self) -> Option<Fix> {
        if self.points.is_empty() {
            return None;
        }
        let n = self.points.len() as f64;
        let (mut lat, mut lon, mut alt) = (0.0, 0.0, 0.0);
        for p in &self.points {
            lat += p.lat;
            lon += p.lon;
            alt += p.alt;
        }
        Some(Fix {
            lat: lat / n,
            lon: lon / n,
            alt: alt / n,
        })
    }
}

/// Three cascading history windows: the 100 most recent fixes verbatim,
/// folding into a coarser average every 10,000 fixes, folding that into a
/// coarser-still average every 1,000,000 fixes (spec.md §4.8).
#[derive(Debug, Clone)]
pub struct HistoricLocation {
    recent: HistoryRing,
    medium: HistoryRing,
    coarse: HistoryRing,
    total_observations: u64,
}

const RECENT_CAP: usize = 100;
const MEDIUM_CAP: usize = 10_000;
const COARSE_CAP: usize = 1_000_000;
const MEDIUM_FOLD_EVERY: u64 = 100;
const COARSE_FOLD_EVERY: u64 = 10_000;

impl HistoricLocation {
    pub fn new() -> Self {
        HistoricLocation {
            recent: HistoryRing::new(RECENT_CAP),
            medium: HistoryRing::new(MEDIUM_CAP / MEDIUM_FOLD_EVERY as usize),
            coarse: HistoryRing::new(COARSE_CAP / COARSE_FOLD_EVERY as usize),
            total_observations: 0,
        }
    }

    pub fn observe(&mut self, fix: Fix) {
        self.recent.push(fix);
        self.total_observations += 1;
        if self.total_observations % MEDIUM_FOLD_EVERY == 0 {
            if let Some(avg) = self.recent.average() {
                self.medium.push(avg);
            }
        }
        if self.total_observations % COARSE_FOLD_EVERY == 0 {
            if let Some(avg) = self.medium.average() {
                self.coarse.push(avg);
            }
        }
    }

    pub fn recent_points(&self) -> &[Fix] {
        &self.recent.points
    }

    pub fn medium_points(&self) -> &[Fix] {
        &self.medium.points
    }

    pub fn coarse_points(&self) -> &[Fix] {
        &self.coarse.points
    }

    pub fn total_observations(&self) -> u64 {
        self.total_observations
    }
}

impl Default for HistoricLocation {
    fn default() -> Self {
        Self::new()
    }
}

/// Combines the running accumulator with the cascading history, matching
/// the pair Kismet keeps per-device: "where is it on average" plus "where
/// has it been."
#[derive(Debug, Clone, Default)]
pub struct LocationAggregator {
    pub running: RunningLocation,
    pub history: HistoricLocation,
}

impl LocationAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, fix: Fix) {
        self.running.observe(fix);
        self.history.observe(fix);
    }
}
