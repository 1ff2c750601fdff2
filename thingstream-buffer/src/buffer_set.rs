// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::retention::RetentionPolicy;
use crate::sample_buffer::SampleBuffer;
use crate::snapshot::BufferReader;
use std::collections::BTreeMap;
use thingstream_core::SensorId;

/// All buffers of one Thing, one per known sensor, keyed and iterated in sensor order.
///
/// The sensor set is fixed at construction. Lookups take `&str` so decoded sensor names
/// can be routed without allocating.
#[derive(Debug)]
pub struct BufferSet {
    buffers: BTreeMap<SensorId, SampleBuffer>,
}

impl BufferSet {
    pub fn new(sensors: impl IntoIterator<Item = SensorId>, retention: RetentionPolicy) -> Self {
        let buffers = sensors
            .into_iter()
            .map(|sensor_id| {
                let buffer = SampleBuffer::new(sensor_id.clone(), retention);
                (sensor_id, buffer)
            })
            .collect();
        Self { buffers }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    #[must_use]
    pub fn contains(&self, sensor_id: &str) -> bool {
        self.buffers.contains_key(sensor_id)
    }

    #[must_use]
    pub fn get(&self, sensor_id: &str) -> Option<&SampleBuffer> {
        self.buffers.get(sensor_id)
    }

    pub fn get_mut(&mut self, sensor_id: &str) -> Option<&mut SampleBuffer> {
        self.buffers.get_mut(sensor_id)
    }

    pub fn sensor_ids(&self) -> impl Iterator<Item = &SensorId> {
        self.buffers.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SampleBuffer> {
        self.buffers.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut SampleBuffer> {
        self.buffers.values_mut()
    }

    #[must_use]
    pub fn reader(&self, sensor_id: &str) -> Option<BufferReader> {
        self.get(sensor_id).map(SampleBuffer::reader)
    }

    /// Opens a gap at the watermark of every buffer that has one. Returns how many opened.
    pub fn mark_disconnected(&mut self) -> usize {
        self.iter_mut()
            .map(SampleBuffer::mark_disconnected)
            .filter(|opened| *opened)
            .count()
    }

    /// Publishes every changed buffer. Returns how many snapshots were swapped in.
    pub fn publish(&mut self) -> usize {
        self.iter_mut()
            .map(SampleBuffer::publish)
            .filter(|published| *published)
            .count()
    }

    #[must_use]
    pub fn has_gaps(&self) -> bool {
        self.iter().any(|buffer| !buffer.gaps().is_empty())
    }

    #[must_use]
    pub fn has_open_gaps(&self) -> bool {
        self.iter().any(|buffer| buffer.gaps().has_open())
    }
}
