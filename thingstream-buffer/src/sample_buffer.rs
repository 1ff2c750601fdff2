// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::logging::debug;
use crate::ordered_merge::{LiveWinsMerge, MergeStep};
use crate::retention::RetentionPolicy;
use crate::snapshot::{BufferReader, BufferSnapshot};
use arc_swap::ArcSwap;
use std::collections::VecDeque;
use std::sync::Arc;
use thingstream_core::{GapSet, Reading, SensorId, TimeRange, TimestampMillis};

/// What happened to one live reading offered to [`SampleBuffer::ingest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Newer than the watermark. The watermark advanced.
    Appended,
    /// Older than the watermark but inside the tolerance window, inserted in place.
    Reordered,
    /// Too far behind the watermark. Dropped as a replay.
    Stale,
    /// The buffer already holds a reading at this timestamp. Dropped.
    Duplicate,
}

impl IngestOutcome {
    #[must_use]
    pub const fn is_accepted(self) -> bool {
        matches!(self, Self::Appended | Self::Reordered)
    }
}

/// A fetched reading that disagreed with the live one at the same timestamp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergeConflict {
    pub timestamp: TimestampMillis,
    pub live: f64,
    pub fetched: f64,
}

/// Outcome of folding a historical batch into one buffer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeReport {
    pub inserted: usize,
    /// Fetched readings identical to ones already held.
    pub duplicates: usize,
    /// Fetched readings older than the retention horizon, or too old to fit under the
    /// sample cap.
    pub expired: usize,
    pub conflicts: Vec<MergeConflict>,
    pub gaps_changed: bool,
}

impl MergeReport {
    /// Whether the merge modified the buffer at all.
    #[must_use]
    pub const fn changed(&self) -> bool {
        self.inserted > 0 || self.gaps_changed
    }
}

/// Ordered store of the readings of one sensor.
///
/// Invariant: `readings` is strictly ascending by timestamp. Every mutation goes through
/// `&mut self`; readers only ever see published [`BufferSnapshot`]s.
pub struct SampleBuffer {
    sensor_id: SensorId,
    readings: VecDeque<Reading>,
    watermark: Option<TimestampMillis>,
    gaps: GapSet,
    retention: RetentionPolicy,
    version: u64,
    dirty: bool,
    published: Arc<ArcSwap<BufferSnapshot>>,
}

impl SampleBuffer {
    pub fn new(sensor_id: impl Into<SensorId>, retention: RetentionPolicy) -> Self {
        let sensor_id = sensor_id.into();
        let published = Arc::new(ArcSwap::from_pointee(BufferSnapshot::empty(
            sensor_id.clone(),
        )));
        Self {
            sensor_id,
            readings: VecDeque::new(),
            watermark: None,
            gaps: GapSet::new(),
            retention,
            version: 0,
            dirty: false,
            published,
        }
    }

    #[must_use]
    pub const fn sensor_id(&self) -> &SensorId {
        &self.sensor_id
    }

    #[must_use]
    pub const fn watermark(&self) -> Option<TimestampMillis> {
        self.watermark
    }

    #[must_use]
    pub const fn gaps(&self) -> &GapSet {
        &self.gaps
    }

    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Reading> {
        self.readings.iter()
    }

    /// Offers one live reading.
    ///
    /// A reading is stale when `timestamp <= watermark - tolerance_ms`. Anything newer is
    /// stored in sorted position unless its timestamp is already held. Advancing the
    /// watermark bounds the open gap, if any, at the new timestamp.
    pub fn ingest(&mut self, reading: Reading, tolerance_ms: u64) -> IngestOutcome {
        let timestamp = reading.timestamp;
        if self
            .watermark
            .is_some_and(|watermark| timestamp.saturating_add(tolerance_ms) <= watermark)
        {
            return IngestOutcome::Stale;
        }

        match self.readings.back() {
            Some(last) if last.timestamp >= timestamp => {
                match self
                    .readings
                    .binary_search_by_key(&timestamp, |held| held.timestamp)
                {
                    Ok(_) => return IngestOutcome::Duplicate,
                    Err(index) => self.readings.insert(index, reading),
                }
            }
            _ => self.readings.push_back(reading),
        }

        let advanced = self.watermark.is_none_or(|watermark| timestamp > watermark);
        if advanced {
            self.watermark = Some(timestamp);
            if self.gaps.close_open(timestamp) {
                debug!("sensor {} resumed at {}", self.sensor_id, timestamp);
            }
        }
        self.apply_retention();
        self.touch();

        if advanced {
            IngestOutcome::Appended
        } else {
            IngestOutcome::Reordered
        }
    }

    /// Opens the gap `[watermark, ∞)` after the live connection dropped.
    ///
    /// A buffer that never received live data has no watermark and records nothing.
    pub fn mark_disconnected(&mut self) -> bool {
        let Some(watermark) = self.watermark else {
            return false;
        };
        let opened = self.gaps.open_at(watermark);
        if opened {
            debug!("sensor {} gap opened at {}", self.sensor_id, watermark);
            self.touch();
        }
        opened
    }

    /// Folds a batch of fetched readings into the buffer.
    ///
    /// Live readings win every timestamp collision. `covered` lists the ranges the fetch
    /// answered; when it is empty, coverage is inferred from the fetched readings the buffer
    /// does not hold yet: a bounded gap holding one of them is considered answered, an open
    /// gap is narrowed to start right after the newest one inside it. Applying the same batch twice leaves the
    /// buffer as the first application left it.
    pub fn merge_backfill(
        &mut self,
        mut fetched: Vec<Reading>,
        covered: &[TimeRange],
    ) -> MergeReport {
        let mut report = MergeReport::default();

        fetched.sort_by_key(|reading| reading.timestamp);
        fetched.dedup_by_key(|reading| reading.timestamp);
        if let Some(horizon) = self.retention.horizon(self.watermark) {
            let before = fetched.len();
            fetched.retain(|reading| reading.timestamp >= horizon);
            report.expired = before - fetched.len();
        }

        let inferred;
        let covered = if covered.is_empty() {
            inferred = infer_coverage(&self.gaps, &self.readings, &fetched);
            inferred.as_slice()
        } else {
            covered
        };
        for cover in covered {
            report.gaps_changed |= self.gaps.subtract(cover);
        }

        if !fetched.is_empty() {
            let held = core::mem::take(&mut self.readings);
            let mut merged = Vec::with_capacity(held.len() + fetched.len());
            for step in LiveWinsMerge::new(held, fetched) {
                match step {
                    MergeStep::Held(_) => {}
                    MergeStep::Inserted(_) => report.inserted += 1,
                    MergeStep::Collision { held, fetched } if held.value != fetched.value => {
                        report.conflicts.push(MergeConflict {
                            timestamp: held.timestamp,
                            live: held.value,
                            fetched: fetched.value,
                        });
                    }
                    MergeStep::Collision { .. } => report.duplicates += 1,
                }
                merged.push(step);
            }

            // Fetched readings the sample cap would evict right away are never stored.
            let overflow = self
                .retention
                .max_samples
                .map_or(0, |max_samples| merged.len().saturating_sub(max_samples));
            let evicted = merged[..overflow]
                .iter()
                .filter(|step| matches!(step, MergeStep::Inserted(_)))
                .count();
            report.inserted -= evicted;
            report.expired += evicted;
            self.readings = merged
                .iter()
                .enumerate()
                .filter(|(index, step)| {
                    *index >= overflow || !matches!(step, MergeStep::Inserted(_))
                })
                .map(|(_, step)| step.reading())
                .collect();
        }

        if report.changed() {
            self.apply_retention();
            self.touch();
        }
        report
    }

    /// Stores a fresh snapshot for readers if anything changed since the last one.
    pub fn publish(&mut self) -> bool {
        if !self.dirty {
            return false;
        }
        self.published.store(Arc::new(self.snapshot()));
        self.dirty = false;
        true
    }

    /// Builds a snapshot of the current state, published or not.
    #[must_use]
    pub fn snapshot(&self) -> BufferSnapshot {
        BufferSnapshot {
            sensor_id: self.sensor_id.clone(),
            version: self.version,
            readings: self.readings.iter().copied().collect(),
            watermark: self.watermark,
            gaps: self.gaps.clone(),
        }
    }

    #[must_use]
    pub fn reader(&self) -> BufferReader {
        BufferReader::new(Arc::clone(&self.published))
    }

    fn touch(&mut self) {
        self.version += 1;
        self.dirty = true;
    }

    fn apply_retention(&mut self) {
        if let Some(max_samples) = self.retention.max_samples {
            let excess = self.readings.len().saturating_sub(max_samples);
            if excess > 0 {
                self.readings.drain(..excess);
                if let Some(oldest) = self.readings.front() {
                    self.gaps.trim_before(oldest.timestamp);
                }
            }
        }

        if let Some(horizon) = self.retention.horizon(self.watermark) {
            let expired = self
                .readings
                .partition_point(|reading| reading.timestamp < horizon);
            self.readings.drain(..expired);
            self.gaps.trim_before(horizon);
        }
    }
}

impl core::fmt::Debug for SampleBuffer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SampleBuffer")
            .field("sensor_id", &self.sensor_id)
            .field("len", &self.readings.len())
            .field("watermark", &self.watermark)
            .field("gaps", &self.gaps)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

fn infer_coverage(gaps: &GapSet, held: &VecDeque<Reading>, fetched: &[Reading]) -> Vec<TimeRange> {
    let is_new = |reading: &&Reading| {
        held.binary_search_by_key(&reading.timestamp, |held| held.timestamp)
            .is_err()
    };
    gaps.iter()
        .filter_map(|gap| {
            let newest = fetched
                .iter()
                .rev()
                .filter(is_new)
                .find(|reading| gap.contains(reading.timestamp))?;
            Some(if gap.is_open() {
                TimeRange::bounded(gap.start, newest.timestamp.saturating_add(1))
            } else {
                *gap
            })
        })
        .collect()
}
