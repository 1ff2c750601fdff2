// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Immutable buffer views for readers.
//!
//! The writer swaps a fresh [`BufferSnapshot`] into an [`ArcSwap`] cell after each change.
//! Loading one is wait-free, and a loaded snapshot stays valid however long the reader
//! keeps it, independent of ingestion or reconciliation running in the meantime.

use arc_swap::ArcSwap;
use std::sync::Arc;
use thingstream_core::{GapSet, Reading, Sample, SensorId, TimestampMillis};

/// Point-in-time copy of one sensor buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferSnapshot {
    pub sensor_id: SensorId,
    /// Increases every time the buffer content or its gaps change.
    pub version: u64,
    /// Sorted ascending by timestamp, no duplicate timestamps.
    pub readings: Vec<Reading>,
    pub watermark: Option<TimestampMillis>,
    pub gaps: GapSet,
}

impl BufferSnapshot {
    #[must_use]
    pub const fn empty(sensor_id: SensorId) -> Self {
        Self {
            sensor_id,
            version: 0,
            readings: Vec::new(),
            watermark: None,
            gaps: GapSet::new(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    #[must_use]
    pub fn latest(&self) -> Option<Reading> {
        self.readings.last().copied()
    }

    /// Readings with `start <= timestamp < end`.
    #[must_use]
    pub fn range(&self, start: TimestampMillis, end: TimestampMillis) -> &[Reading] {
        let from = self.readings.partition_point(|reading| reading.timestamp < start);
        let to = self.readings.partition_point(|reading| reading.timestamp < end);
        &self.readings[from..to.max(from)]
    }

    /// The readings as full samples, tagged with this buffer's sensor.
    pub fn samples(&self) -> impl Iterator<Item = Sample> + '_ {
        self.readings
            .iter()
            .map(|reading| reading.into_sample(self.sensor_id.clone()))
    }
}

/// Long-lived read handle on one buffer.
#[derive(Clone)]
pub struct BufferReader {
    cell: Arc<ArcSwap<BufferSnapshot>>,
}

impl BufferReader {
    pub(crate) const fn new(cell: Arc<ArcSwap<BufferSnapshot>>) -> Self {
        Self { cell }
    }

    /// Most recently published snapshot.
    #[must_use]
    pub fn load(&self) -> Arc<BufferSnapshot> {
        self.cell.load_full()
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.cell.load().version
    }

    #[must_use]
    pub fn latest(&self) -> Option<Reading> {
        self.cell.load().latest()
    }
}

impl core::fmt::Debug for BufferReader {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let snapshot = self.cell.load();
        f.debug_struct("BufferReader")
            .field("sensor_id", &snapshot.sensor_id)
            .field("version", &snapshot.version)
            .finish()
    }
}
