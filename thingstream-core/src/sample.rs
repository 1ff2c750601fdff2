// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::{HasTimestamp, SensorId};
use serde::{Deserialize, Serialize};

/// Milliseconds since the Unix epoch, as reported by the Thing.
pub type TimestampMillis = u64;

/// One time-stamped value inside a single sensor's buffer.
///
/// The sensor is implied by the buffer holding the reading, which keeps buffers compact.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub timestamp: TimestampMillis,
    pub value: f64,
}

impl Reading {
    #[must_use]
    pub const fn new(timestamp: TimestampMillis, value: f64) -> Self {
        Self { timestamp, value }
    }

    /// Attaches the sensor identity back onto the reading.
    #[must_use]
    pub fn into_sample(self, sensor_id: SensorId) -> Sample {
        Sample {
            sensor_id,
            timestamp: self.timestamp,
            value: self.value,
        }
    }
}

impl HasTimestamp for Reading {
    type Timestamp = TimestampMillis;

    fn timestamp(&self) -> TimestampMillis {
        self.timestamp
    }
}

/// A single `(sensor, timestamp, value)` reading.
///
/// `(sensor_id, timestamp)` is the de-duplication key across every ingestion source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub sensor_id: SensorId,
    pub timestamp: TimestampMillis,
    pub value: f64,
}

impl Sample {
    pub fn new(sensor_id: impl Into<SensorId>, timestamp: TimestampMillis, value: f64) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            timestamp,
            value,
        }
    }

    /// The de-duplication key of this sample.
    #[must_use]
    pub fn key(&self) -> (&SensorId, TimestampMillis) {
        (&self.sensor_id, self.timestamp)
    }

    #[must_use]
    pub const fn reading(&self) -> Reading {
        Reading::new(self.timestamp, self.value)
    }
}

impl HasTimestamp for Sample {
    type Timestamp = TimestampMillis;

    fn timestamp(&self) -> TimestampMillis {
        self.timestamp
    }
}

impl From<Sample> for Reading {
    fn from(sample: Sample) -> Self {
        sample.reading()
    }
}
