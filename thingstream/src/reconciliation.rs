// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Folding externally fetched history back into the live buffers.
//!
//! A [`MissingDataRequest`] lists every gap the buffers currently record. The caller hands
//! it to whatever fetches history, and the answer comes back as a [`MissingDataResult`]
//! that the [`ReconciliationEngine`] merges per sensor. Live readings always win a
//! timestamp collision, and re-applying a result that was already merged changes nothing.

use crate::logging::{debug, warn};
use crate::stats::IngestStats;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use thingstream_buffer::BufferSet;
use thingstream_core::{Reading, Sample, SensorId, StreamError, ThingId, TimeRange, TimestampMillis};

/// One half-open range `[start, end)` of one sensor. `end == None` means "up to now".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MissingRange {
    pub sensor_id: SensorId,
    pub start: TimestampMillis,
    pub end: Option<TimestampMillis>,
}

impl MissingRange {
    pub fn new(sensor_id: impl Into<SensorId>, start: TimestampMillis, end: Option<TimestampMillis>) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            start,
            end,
        }
    }

    #[must_use]
    pub const fn time_range(&self) -> TimeRange {
        TimeRange {
            start: self.start,
            end: self.end,
        }
    }
}

/// What a Thing stream believes it is missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingDataRequest {
    pub thing_id: ThingId,
    pub ranges: Vec<MissingRange>,
}

impl MissingDataRequest {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn for_sensor<'a>(&'a self, sensor_id: &'a str) -> impl Iterator<Item = &'a MissingRange> + 'a {
        self.ranges
            .iter()
            .filter(move |range| range.sensor_id.as_str() == sensor_id)
    }
}

/// A fetched batch: samples in any order, for any sensors.
///
/// `covered` states which ranges the fetch answered. Leave it empty to let coverage be
/// inferred from the samples themselves.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MissingDataResult {
    pub samples: Vec<Sample>,
    #[serde(default)]
    pub covered: Vec<MissingRange>,
}

impl MissingDataResult {
    #[must_use]
    pub const fn new(samples: Vec<Sample>) -> Self {
        Self {
            samples,
            covered: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_covered(mut self, covered: Vec<MissingRange>) -> Self {
        self.covered = covered;
        self
    }
}

/// Totals of one reconciliation across all sensors of the Thing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconciliationReport {
    pub inserted: usize,
    pub duplicates: usize,
    pub expired: usize,
    pub unknown_sensor: usize,
    /// Fetched samples carrying a non-finite value.
    pub non_finite: usize,
    /// Conflicts found, each resolved in favour of the live reading.
    pub conflicts: Vec<Conflict>,
    /// Sensors whose gap set changed.
    pub gaps_changed: usize,
}

impl ReconciliationReport {
    #[must_use]
    pub const fn changed(&self) -> bool {
        self.inserted > 0 || self.gaps_changed > 0
    }
}

/// A resolved live/fetched disagreement.
#[derive(Debug, Clone, PartialEq)]
pub struct Conflict {
    pub sensor_id: SensorId,
    pub timestamp: TimestampMillis,
    pub live: f64,
    pub fetched: f64,
}

impl From<Conflict> for StreamError {
    fn from(conflict: Conflict) -> Self {
        Self::ReconciliationConflict {
            sensor_id: conflict.sensor_id,
            timestamp: conflict.timestamp,
            live: conflict.live,
            fetched: conflict.fetched,
        }
    }
}

#[derive(Default)]
struct SensorBatch {
    readings: Vec<Reading>,
    covered: Vec<TimeRange>,
}

/// Merges fetched batches into a [`BufferSet`].
pub struct ReconciliationEngine {
    stats: Arc<IngestStats>,
}

impl ReconciliationEngine {
    pub const fn new(stats: Arc<IngestStats>) -> Self {
        Self { stats }
    }

    /// Lists every gap recorded by `buffers`, in sensor order then time order.
    #[must_use]
    pub fn missing_data_request(&self, thing_id: &ThingId, buffers: &BufferSet) -> MissingDataRequest {
        let ranges = buffers
            .iter()
            .flat_map(|buffer| {
                buffer.gaps().iter().map(|gap| MissingRange {
                    sensor_id: buffer.sensor_id().clone(),
                    start: gap.start,
                    end: gap.end,
                })
            })
            .collect();
        MissingDataRequest {
            thing_id: thing_id.clone(),
            ranges,
        }
    }

    /// Merges `result` into `buffers` and publishes every buffer that changed.
    pub fn reconcile(&self, buffers: &mut BufferSet, result: MissingDataResult) -> ReconciliationReport {
        let mut report = ReconciliationReport::default();
        let mut batches: BTreeMap<SensorId, SensorBatch> = BTreeMap::new();

        for sample in result.samples {
            if !buffers.contains(sample.sensor_id.as_str()) {
                report.unknown_sensor += 1;
                continue;
            }
            if !sample.value.is_finite() {
                report.non_finite += 1;
                continue;
            }
            let reading = sample.reading();
            batches.entry(sample.sensor_id).or_default().readings.push(reading);
        }
        for range in result.covered {
            if buffers.contains(range.sensor_id.as_str()) {
                let cover = range.time_range();
                batches.entry(range.sensor_id).or_default().covered.push(cover);
            }
        }

        if report.unknown_sensor > 0 {
            debug!("ignored {} fetched samples for unknown sensors", report.unknown_sensor);
        }

        for (sensor_id, batch) in batches {
            let Some(buffer) = buffers.get_mut(sensor_id.as_str()) else {
                continue;
            };
            let merged = buffer.merge_backfill(batch.readings, &batch.covered);

            for conflict in merged.conflicts {
                let conflict = Conflict {
                    sensor_id: sensor_id.clone(),
                    timestamp: conflict.timestamp,
                    live: conflict.live,
                    fetched: conflict.fetched,
                };
                warn!("{}", StreamError::from(conflict.clone()));
                report.conflicts.push(conflict);
            }

            report.inserted += merged.inserted;
            report.duplicates += merged.duplicates;
            report.expired += merged.expired;
            report.gaps_changed += usize::from(merged.gaps_changed);
        }

        buffers.publish();
        self.stats.record_reconciled(report.inserted as u64);
        self.stats.record_conflicts(report.conflicts.len() as u64);
        report
    }
}
