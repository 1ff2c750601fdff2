// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Inbound payload decoding.
//!
//! The default [`JsonDecoder`] accepts two frame shapes:
//!
//! ```json
//! {"samples": [{"sensor_id": "speed", "timestamp": 10, "value": 1.0}]}
//! {"ts": 10, "values": {"speed": 1.0, "rpm": 900.0}}
//! ```
//!
//! Sensor ids of a `samples` frame are borrowed straight from the payload whenever they
//! carry no escapes. Row frames are routed in sensor-id order.

use serde::Deserialize;
use std::borrow::Cow;
use std::collections::BTreeMap;
use thingstream_core::{IngestDecodeError, Reading, TimestampMillis};

/// One decoded `(sensor, timestamp, value)` triple, possibly borrowing from the payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WireSample<'a> {
    #[serde(borrow)]
    pub sensor_id: Cow<'a, str>,
    pub timestamp: TimestampMillis,
    pub value: f64,
}

impl WireSample<'_> {
    #[must_use]
    pub const fn reading(&self) -> Reading {
        Reading::new(self.timestamp, self.value)
    }
}

/// Turns a raw payload into triples.
pub trait MessageDecoder: Send + Sync + 'static {
    /// # Errors
    ///
    /// Returns an [`IngestDecodeError`] when the payload as a whole cannot be decoded.
    fn decode<'a>(&self, payload: &'a [u8]) -> Result<Vec<WireSample<'a>>, IngestDecodeError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecoder;

impl MessageDecoder for JsonDecoder {
    fn decode<'a>(&self, payload: &'a [u8]) -> Result<Vec<WireSample<'a>>, IngestDecodeError> {
        let frame: InboundFrame<'a> = serde_json::from_slice(payload)
            .map_err(|err| IngestDecodeError::malformed(err.to_string()))?;

        let samples = match frame {
            InboundFrame {
                samples: Some(samples),
                ts: None,
                values: None,
            } => samples,
            InboundFrame {
                samples: None,
                ts: Some(timestamp),
                values: Some(values),
            } => values
                .into_iter()
                .map(|(sensor_id, value)| WireSample {
                    sensor_id,
                    timestamp,
                    value,
                })
                .collect(),
            _ => {
                return Err(IngestDecodeError::malformed(
                    "expected either `samples` or `ts` together with `values`",
                ))
            }
        };

        if samples.is_empty() {
            return Err(IngestDecodeError::Empty);
        }
        Ok(samples)
    }
}

#[derive(Deserialize)]
struct InboundFrame<'a> {
    #[serde(default, borrow)]
    samples: Option<Vec<WireSample<'a>>>,
    #[serde(default)]
    ts: Option<TimestampMillis>,
    #[serde(default, borrow)]
    values: Option<BTreeMap<Cow<'a, str>, f64>>,
}
