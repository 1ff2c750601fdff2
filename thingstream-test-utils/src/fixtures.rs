// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use serde_json::{json, Map, Value};
use thingstream::ThingProfile;
use thingstream_core::{Sample, SensorId, ThingId};

#[must_use]
pub fn thing_alpha() -> ThingId {
    ThingId::new("thing-alpha")
}

#[must_use]
pub fn sensor_a() -> SensorId {
    SensorId::new("sensorA")
}

#[must_use]
pub fn sensor_b() -> SensorId {
    SensorId::new("sensorB")
}

/// `thing-alpha` carrying `sensorA` and `sensorB`.
#[must_use]
pub fn profile() -> ThingProfile {
    ThingProfile {
        thing_id: thing_alpha(),
        sensors: vec![sensor_a(), sensor_b()],
    }
}

/// `{"samples": [...]}` frame.
#[must_use]
pub fn sample_frame(samples: &[(&str, u64, f64)]) -> Value {
    let samples: Vec<Value> = samples
        .iter()
        .map(|(sensor_id, timestamp, value)| {
            json!({ "sensor_id": sensor_id, "timestamp": timestamp, "value": value })
        })
        .collect();
    json!({ "samples": samples })
}

/// `{"ts": .., "values": {..}}` frame.
#[must_use]
pub fn row_frame(timestamp: u64, values: &[(&str, f64)]) -> Value {
    let values: Map<String, Value> = values
        .iter()
        .map(|(sensor_id, value)| ((*sensor_id).to_string(), json!(value)))
        .collect();
    json!({ "ts": timestamp, "values": values })
}

#[must_use]
pub fn samples(sensor_id: &str, readings: &[(u64, f64)]) -> Vec<Sample> {
    readings
        .iter()
        .map(|&(timestamp, value)| Sample::new(sensor_id, timestamp, value))
        .collect()
}
